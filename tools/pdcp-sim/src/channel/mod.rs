use std::mem;

use anyhow::{ensure, Result};
use bytes::Bytes;
use pdcp_rs_types::unit::Unit;
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub loss_rate: f64,
    pub reordering_rate: f64,
    pub duplication_rate: f64,
    pub corruption_rate: f64,
    /// Flip a payload bit without marking the unit corrupted
    pub tamper_rate: f64,
    /// A reordered unit is held back for up to this many transmissions
    pub reorder_depth: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loss_rate: 0.01,
            reordering_rate: 0.02,
            duplication_rate: 0.01,
            corruption_rate: 0.005,
            tamper_rate: 0.0,
            reorder_depth: 10,
        }
    }
}

impl Config {
    /// Channel that delivers everything once and in order
    pub fn lossless() -> Self {
        Self {
            loss_rate: 0.0,
            reordering_rate: 0.0,
            duplication_rate: 0.0,
            corruption_rate: 0.0,
            tamper_rate: 0.0,
            reorder_depth: 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("loss_rate", self.loss_rate),
            ("reordering_rate", self.reordering_rate),
            ("duplication_rate", self.duplication_rate),
            ("corruption_rate", self.corruption_rate),
            ("tamper_rate", self.tamper_rate),
        ] {
            ensure!(
                (0.0..=1.0).contains(&rate),
                "{} must be between 0 and 1, got {}",
                name,
                rate
            );
        }
        ensure!(self.reorder_depth > 0, "reorder_depth must be at least 1");
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ChannelStats {
    pub passed: u64,
    pub lost: u64,
    pub duplicated: u64,
    pub corrupted: u64,
    pub tampered: u64,
    pub reorder_events: u64,
}

struct DelayedUnit {
    unit: Unit,
    release_at: u64,
}

/// Lossy channel between transmitter and receiver. Drops, corrupts, tampers with,
/// duplicates and delays units.
pub struct ImpairedChannel {
    cfg: Config,
    rng: StdRng,
    /// number of transmit calls so far
    clock: u64,
    held: Vec<DelayedUnit>,
    stats: ChannelStats,
}

impl ImpairedChannel {
    pub fn new(cfg: Config, rng: StdRng) -> Self {
        tracing::info!(?cfg, "channel initialized");
        Self {
            cfg,
            rng,
            clock: 0,
            held: Default::default(),
            stats: Default::default(),
        }
    }

    /// Pass a batch of units through the channel. Returns what arrives at the receiver during
    /// this transmission, units held back earlier are released after the current ones.
    pub fn transmit(&mut self, units: impl IntoIterator<Item = Unit>) -> Vec<Unit> {
        self.clock += 1;
        let mut out = vec![];
        for unit in units {
            if self.rng.gen_bool(self.cfg.loss_rate) {
                tracing::debug!(payload_id = unit.payload_id, sn = unit.sn, "lost");
                self.stats.lost += 1;
                continue;
            }
            let unit = self.impair(unit);
            if self.rng.gen_bool(self.cfg.duplication_rate) {
                tracing::debug!(payload_id = unit.payload_id, sn = unit.sn, "duplicated");
                self.stats.duplicated += 1;
                self.forward(unit.clone(), &mut out);
            }
            self.forward(unit, &mut out);
        }
        let (due, held): (Vec<_>, Vec<_>) = mem::take(&mut self.held)
            .into_iter()
            .partition(|d| d.release_at <= self.clock);
        self.held = held;
        out.extend(due.into_iter().map(|d| d.unit));
        self.stats.passed += out.len() as u64;
        out
    }

    /// Release everything still held back, in release order
    pub fn drain(&mut self) -> Vec<Unit> {
        let mut held = mem::take(&mut self.held);
        held.sort_by_key(|d| d.release_at);
        self.stats.passed += held.len() as u64;
        held.into_iter().map(|d| d.unit).collect()
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    fn impair(&mut self, mut unit: Unit) -> Unit {
        if self.rng.gen_bool(self.cfg.corruption_rate) {
            tracing::debug!(payload_id = unit.payload_id, sn = unit.sn, "corrupted");
            self.stats.corrupted += 1;
            unit.corrupted = true;
        }
        if !unit.payload.is_empty() && self.rng.gen_bool(self.cfg.tamper_rate) {
            let mut payload = unit.payload.to_vec();
            let idx = self.rng.gen_range(0..payload.len());
            payload[idx] ^= 0x01;
            tracing::debug!(payload_id = unit.payload_id, idx, "payload bit flipped");
            unit.payload = Bytes::from(payload);
            self.stats.tampered += 1;
        }
        unit
    }

    fn forward(&mut self, unit: Unit, out: &mut Vec<Unit>) {
        if self.rng.gen_bool(self.cfg.reordering_rate) {
            let delay = self.rng.gen_range(1..=self.cfg.reorder_depth);
            tracing::debug!(payload_id = unit.payload_id, delay, "held back");
            self.stats.reorder_events += 1;
            self.held.push(DelayedUnit {
                unit,
                release_at: self.clock + delay,
            });
        } else {
            out.push(unit)
        }
    }
}

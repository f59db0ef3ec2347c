use std::time::Instant;

use anyhow::{Context, Result};
use pdcp_rs_types::{
    traits::queue::{ReorderQueueEvent, ReorderQueueOutput},
    unit::Unit,
};
use pdcp_rs_util::{
    integrity::AesCmac,
    reorder::receiver::{Receiver, ReceiverConfig, Status},
    tx::Transmitter,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::{
    channel::{ChannelStats, ImpairedChannel},
    config::Config,
};

/// Cursor positions sampled during a run
#[derive(Debug, Default, Serialize)]
pub struct Trace {
    pub time: Vec<u64>,
    pub tx_count: Vec<u32>,
    pub rx_deliv: Vec<u32>,
    pub rx_next: Vec<u32>,
    pub buffer_size: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub parameters: Config,
    pub duration_seconds: f64,
    pub total_sent: u64,
    pub tx_next_final: u32,
    pub rx_status: Status,
    pub channel_stats: ChannelStats,
    /// Sent payloads that never reached the upper layer
    pub undelivered: u64,
    /// Units left in the reordering buffer after the final flush
    pub residual: usize,
    /// Counts skipped by reordering timeouts
    pub abandoned: u64,
    pub delivery_order: Vec<u64>,
    pub trace: Trace,
}

impl Report {
    pub fn log_summary(&self) {
        tracing::info!("total payloads sent: {}", self.total_sent);
        tracing::info!("transmitter next count: {}", self.tx_next_final);
        tracing::info!(
            "receiver delivered: {}, rx_deliv: {}, rx_next: {}, buffered: {}",
            self.rx_status.delivered,
            self.rx_status.rx_deliv,
            self.rx_status.rx_next,
            self.rx_status.buffered
        );
        tracing::info!("receiver metrics: {:?}", self.rx_status.metrics);
        tracing::info!("channel stats: {:?}", self.channel_stats);
        tracing::info!(
            "undelivered: {}, abandoned counts: {}",
            self.undelivered,
            self.abandoned
        );
    }
}

/// Drives one session: transmitter, channel and receiver in lock step
pub struct Simulation {
    cfg: Config,
    tx: Transmitter,
    rx: Receiver,
    channel: ImpairedChannel,
    delivery_order: Vec<u64>,
    abandoned: u64,
    trace: Trace,
}

impl Simulation {
    pub fn try_new(cfg: &Config) -> Result<Self> {
        let mut rng = match cfg.session.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut tx = Transmitter::new(cfg.session.sn_width);
        let mut rx = Receiver::try_new(ReceiverConfig {
            sn_width: cfg.session.sn_width,
            reordering_threshold: cfg.session.reordering_threshold,
            max_outstanding: cfg.session.max_outstanding,
        })
        .context("failed to build receiver")?;
        if let Some(integrity) = &cfg.integrity {
            let key = integrity.key.unwrap_or_else(|| rng.gen());
            let algorithm = AesCmac::new(key, integrity.bearer, integrity.direction);
            tx = tx.with_integrity(algorithm.clone());
            rx = rx.with_integrity(algorithm);
        }
        let channel = ImpairedChannel::new(cfg.channel.clone(), StdRng::from_rng(&mut rng)?);
        Ok(Self {
            cfg: cfg.clone(),
            tx,
            rx,
            channel,
            delivery_order: vec![],
            abandoned: 0,
            trace: Trace::default(),
        })
    }

    pub fn run(mut self) -> Report {
        tracing::info!(packets = self.cfg.session.packets, "starting simulation");
        let start = Instant::now();
        let packets = self.cfg.session.packets;
        for i in 0..packets {
            let unit = self.tx.submit(i, format!("SDU_data_{}", i));
            let arrived = self.channel.transmit([unit]);
            self.receive(arrived);
            if i % self.cfg.session.trace_granularity == 0 || i + 1 == packets {
                self.sample(i);
            }
        }
        let late = self.channel.drain();
        self.receive(late);
        let residual = self.rx.flush();
        self.collect();
        let duration_seconds = start.elapsed().as_secs_f64();
        tracing::info!("simulation finished in {:.2} seconds", duration_seconds);

        let rx_status = self.rx.status();
        Report {
            parameters: self.cfg,
            duration_seconds,
            total_sent: packets,
            tx_next_final: self.tx.tx_next(),
            undelivered: packets.saturating_sub(rx_status.delivered),
            rx_status,
            channel_stats: self.channel.stats().clone(),
            residual,
            abandoned: self.abandoned,
            delivery_order: self.delivery_order,
            trace: self.trace,
        }
    }

    fn receive(&mut self, units: Vec<Unit>) {
        for unit in units {
            self.rx.receive(unit);
        }
        self.collect();
    }

    /// Move released units from the receiver to the delivery log
    fn collect(&mut self) {
        loop {
            match self.rx.next_event() {
                ReorderQueueEvent::Packet { packet, .. } => {
                    self.delivery_order.push(packet.payload_id)
                }
                ReorderQueueEvent::Missing { from, to } => {
                    self.abandoned += u64::from(to.wrapping_sub(from))
                }
                ReorderQueueEvent::NeedMore => break,
            }
        }
    }

    fn sample(&mut self, i: u64) {
        self.trace.time.push(i);
        self.trace.tx_count.push(self.tx.tx_next());
        self.trace.rx_deliv.push(self.rx.rx_deliv());
        self.trace.rx_next.push(self.rx.rx_next());
        self.trace.buffer_size.push(self.rx.buffered());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{channel, config::IntegrityConfig};
    use pdcp_rs_types::count::SnWidth;

    fn config(packets: u64, channel: channel::Config) -> Config {
        let mut cfg = Config {
            channel,
            ..Config::default()
        };
        cfg.session.packets = packets;
        cfg.session.seed = Some(1234);
        cfg
    }

    #[test]
    fn normal_flow_without_impairments() {
        let report = Simulation::try_new(&config(100, channel::Config::lossless()))
            .unwrap()
            .run();
        assert_eq!(report.rx_status.delivered, 100);
        assert_eq!(report.tx_next_final, report.rx_status.rx_deliv);
        assert_eq!(report.delivery_order, (0..100).collect::<Vec<_>>());
        assert_eq!(report.undelivered, 0);
        assert_eq!(report.residual, 0);
        assert_eq!(report.rx_status.metrics.out_of_order_deliveries, 0);
        // samples every 50 packets and the last one
        assert_eq!(report.trace.time, vec![0, 50, 99]);
    }

    #[test]
    fn lossless_wraparound() {
        let report = Simulation::try_new(&config(5000, channel::Config::lossless()))
            .unwrap()
            .run();
        assert_eq!(report.rx_status.delivered, 5000);
        assert_eq!(report.rx_status.rx_deliv, 5000);
        assert!(report.rx_status.rx_deliv > 1 << 12);
    }

    #[test]
    fn impaired_channel_accounting() {
        let mut cfg = config(
            5000,
            channel::Config {
                loss_rate: 0.02,
                reordering_rate: 0.05,
                duplication_rate: 0.02,
                corruption_rate: 0.01,
                tamper_rate: 0.0,
                reorder_depth: 10,
            },
        );
        cfg.session.sn_width = SnWidth::Bits18;
        let report = Simulation::try_new(&cfg).unwrap().run();
        let status = &report.rx_status;
        let stats = &report.channel_stats;

        assert!(stats.lost > 0 && stats.duplicated > 0 && stats.reorder_events > 0);
        // a corrupted unit may also have been duplicated
        assert!(status.metrics.discarded_corrupt >= stats.corrupted);
        assert_eq!(status.delivered, report.delivery_order.len() as u64);
        assert!(status.delivered <= 5000 - stats.lost);
        assert!(status.metrics.discarded_duplicate > 0);
        assert_eq!(report.undelivered, 5000 - status.delivered);
        // every received unit is either delivered, discarded or left in the buffer
        let m = &status.metrics;
        assert_eq!(
            stats.passed,
            status.delivered
                + status.buffered as u64
                + m.discarded_corrupt
                + m.discarded_duplicate
                + m.discarded_stale
                + m.discarded_integrity
                + m.discarded_malformed
                + m.discarded_out_of_window
        );
    }

    #[test]
    fn deterministic_with_seed() {
        let cfg = config(2000, channel::Config::default());
        let a = Simulation::try_new(&cfg).unwrap().run();
        let b = Simulation::try_new(&cfg).unwrap().run();
        assert_eq!(a.rx_status, b.rx_status);
        assert_eq!(a.delivery_order, b.delivery_order);
    }

    #[test]
    fn tampering_caught_by_integrity() {
        let mut cfg = config(
            500,
            channel::Config {
                tamper_rate: 0.1,
                ..channel::Config::lossless()
            },
        );
        cfg.integrity = Some(IntegrityConfig::default());
        let report = Simulation::try_new(&cfg).unwrap().run();
        assert!(report.channel_stats.tampered > 0);
        assert_eq!(
            report.rx_status.metrics.discarded_integrity,
            report.channel_stats.tampered
        );
        // units behind the last forged one may still sit in the buffer
        assert_eq!(
            report.rx_status.delivered + report.channel_stats.tampered + report.residual as u64,
            500
        );
    }

    #[test]
    fn report_serializes() {
        let report = Simulation::try_new(&config(10, channel::Config::lossless()))
            .unwrap()
            .run();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rx_status"]["delivered"], 10);
        assert_eq!(json["rx_status"]["discarded_duplicate"], 0);
        assert_eq!(json["parameters"]["session"]["sn_width"], 12);
    }
}

use std::fs;

use anyhow::{ensure, Context, Result};
use pdcp_rs_types::count::SnWidth;
use pdcp_rs_util::integrity::Direction;
use serde::{Deserialize, Serialize};

use crate::channel;

#[derive(clap::Parser)]
pub struct CmdLine {
    /// Simulation config file, built-in defaults are used without one
    #[clap(short, long)]
    pub config: Option<String>,

    #[clap(long, short)]
    pub log_level: Option<tracing::Level>,

    /// Number of payloads to send, overrides the config file
    #[clap(short, long)]
    pub packets: Option<u64>,

    /// Seed for the channel impairments, overrides the config file
    #[clap(short, long)]
    pub seed: Option<u64>,

    /// Write the json report to this file instead of stdout
    #[clap(short, long)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub packets: u64,
    pub sn_width: SnWidth,
    pub reordering_threshold: u32,
    pub max_outstanding: Option<u32>,
    /// Sample the cursors every n packets
    pub trace_granularity: u64,
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            packets: 1000,
            sn_width: SnWidth::Bits12,
            reordering_threshold: 20,
            max_outstanding: None,
            trace_granularity: 50,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrityConfig {
    pub bearer: u8,
    pub direction: Direction,
    /// Random per run if not set
    pub key: Option<[u8; 16]>,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            bearer: 5,
            direction: Direction::Uplink,
            key: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub session: SessionConfig,
    pub channel: channel::Config,
    pub integrity: Option<IntegrityConfig>,
}

impl Config {
    pub fn load(cmd_line: &CmdLine) -> Result<Self> {
        let mut cfg = match &cmd_line.config {
            Some(path) => Self::parse(
                &fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file from: {}", path))?,
            )
            .with_context(|| format!("failed to parse config file from: {}", path))?,
            None => Config::default(),
        };
        if let Some(packets) = cmd_line.packets {
            cfg.session.packets = packets
        }
        if let Some(seed) = cmd_line.seed {
            cfg.session.seed = Some(seed)
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.session.trace_granularity > 0,
            "trace granularity must be at least 1"
        );
        self.channel
            .validate()
            .context("invalid channel configuration")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.session.packets, 1000);
        assert_eq!(cfg.session.sn_width, SnWidth::Bits12);
        assert_eq!(cfg.session.reordering_threshold, 20);
        assert!(cfg.integrity.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_full() {
        let cfg = Config::parse(
            r#"
            [session]
            packets = 5000
            sn_width = 18
            reordering_threshold = 8
            seed = 7

            [channel]
            loss_rate = 0.1
            reorder_depth = 4

            [integrity]
            bearer = 3
            direction = "downlink"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.session.packets, 5000);
        assert_eq!(cfg.session.sn_width, SnWidth::Bits18);
        assert_eq!(cfg.session.seed, Some(7));
        assert_eq!(cfg.channel.loss_rate, 0.1);
        assert_eq!(cfg.channel.reorder_depth, 4);
        let integrity = cfg.integrity.unwrap();
        assert_eq!(integrity.bearer, 3);
        assert_eq!(integrity.direction, Direction::Downlink);
        assert!(integrity.key.is_none());
    }

    #[test]
    fn reject_unsupported_width() {
        let err = Config::parse("[session]\nsn_width = 16\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Unsupported sequence number width"));
    }

    #[test]
    fn reject_invalid_rates() {
        let cfg = Config::parse("[channel]\nloss_rate = 1.5\n").unwrap();
        assert!(cfg.validate().is_err());
        let cfg = Config::parse("[session]\ntrace_granularity = 0\n").unwrap();
        assert!(cfg.validate().is_err());
    }
}

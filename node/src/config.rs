use crate::Error;
use finality_bundle::pipeline::Mode;
use finality_types::bundle;
use serde::{Deserialize, Serialize};
use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};
use tracing::Level;

/// Configuration of the `filter` binary, read from YAML.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding the unfiltered bundles.
    pub source: PathBuf,
    /// Directory receiving the filtered bundles.
    pub destination: PathBuf,

    /// Comma-separated `account` or `account::action` terms to keep. Empty keeps everything.
    #[serde(default)]
    pub include: String,
    /// Comma-separated `account` or `account::action` terms to drop.
    #[serde(default)]
    pub exclude: String,

    /// How far behind the head (in blocks) to look for already filtered bundles when resuming.
    /// Zero is unbounded.
    #[serde(default)]
    pub truncation_window: u64,
    /// Process a fixed range of bundles instead of following the source.
    #[serde(default)]
    pub batch: Option<Batch>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_attempts")]
    pub attempts: usize,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_rate")]
    pub log_rate: u32,
    #[serde(default)]
    pub json_logs: bool,
}

/// Range of bundles processed in batch mode: `[start, stop)`.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Batch {
    pub start: u64,
    pub stop: u64,
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_attempts() -> usize {
    5
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

fn default_flush_threshold() -> usize {
    64 * 1024
}

fn default_max_block_size() -> usize {
    8 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_rate() -> u32 {
    2
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn parse(yaml: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate the YAML file at `path`.
    pub fn load(path: &str) -> Result<Self, Error> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.source == self.destination {
            return Err(Error::Invalid(
                "source and destination must differ".to_string(),
            ));
        }
        if self.attempts == 0 {
            return Err(Error::Invalid("attempts must be at least 1".to_string()));
        }
        if let Some(batch) = &self.batch {
            if batch.start % bundle::SIZE != 0 || batch.stop % bundle::SIZE != 0 {
                return Err(Error::Invalid(format!(
                    "batch bounds must be multiples of {}",
                    bundle::SIZE
                )));
            }
            if batch.start > batch.stop {
                return Err(Error::Invalid("batch start after stop".to_string()));
            }
        }
        self.level()?;
        self.log_rate()?;
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        match self.batch {
            Some(Batch { start, stop }) => Mode::Batch { start, stop },
            None => Mode::Live {
                truncation_window: self.truncation_window,
            },
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn level(&self) -> Result<Level, Error> {
        Level::from_str(&self.log_level)
            .map_err(|_| Error::Invalid(format!("unknown log level: {}", self.log_level)))
    }

    pub fn log_rate(&self) -> Result<NonZeroU32, Error> {
        NonZeroU32::new(self.log_rate)
            .ok_or_else(|| Error::Invalid("log_rate must be at least 1".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let config = Config::parse("source: /a\ndestination: /b\n").unwrap();
        assert_eq!(config.source, PathBuf::from("/a"));
        assert_eq!(config.destination, PathBuf::from("/b"));
        assert_eq!(config.include, "");
        assert_eq!(config.exclude, "");
        assert_eq!(
            config.mode(),
            Mode::Live {
                truncation_window: 0
            }
        );
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.attempts, 5);
        assert_eq!(config.retry_backoff(), Duration::from_secs(1));
        assert_eq!(config.level().unwrap(), Level::INFO);
        assert_eq!(config.log_rate().unwrap().get(), 2);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_full() {
        let yaml = r#"
source: /data/bundles
destination: /data/filtered
include: "eosio.token, eosio::onblock"
exclude: spam
truncation_window: 10000
batch:
  start: 1000
  stop: 2000
poll_interval_ms: 250
attempts: 3
log_level: debug
json_logs: true
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.include, "eosio.token, eosio::onblock");
        assert_eq!(config.exclude, "spam");
        assert_eq!(
            config.mode(),
            Mode::Batch {
                start: 1_000,
                stop: 2_000
            }
        );
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.attempts, 3);
        assert_eq!(config.level().unwrap(), Level::DEBUG);
        assert!(config.json_logs);

        let encoded = serde_yaml::to_string(&config).unwrap();
        assert_eq!(Config::parse(&encoded).unwrap(), config);
    }

    #[test_case("source: /a\ndestination: /a\n"; "same directories")]
    #[test_case("source: /a\ndestination: /b\nattempts: 0\n"; "no attempts")]
    #[test_case("source: /a\ndestination: /b\nbatch: {start: 150, stop: 300}\n"; "unaligned batch")]
    #[test_case("source: /a\ndestination: /b\nbatch: {start: 300, stop: 100}\n"; "reversed batch")]
    #[test_case("source: /a\ndestination: /b\nlog_level: loud\n"; "unknown level")]
    #[test_case("source: /a\ndestination: /b\nlog_rate: 0\n"; "no log rate")]
    fn test_invalid(yaml: &str) {
        assert!(matches!(Config::parse(yaml), Err(Error::Invalid(_))));
    }

    #[test_case("destination: /b\n"; "missing source")]
    #[test_case("source: /a\ndestination: /b\nunknown: 1\n"; "unknown field")]
    fn test_malformed(yaml: &str) {
        assert!(matches!(Config::parse(yaml), Err(Error::Yaml(_))));
    }
}

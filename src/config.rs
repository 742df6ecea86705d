use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::queue::SourceKind;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_true")]
    pub youtube: bool,
    #[serde(default = "default_true")]
    pub spotify: bool,
    pub youtube_api_key: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            youtube: true,
            spotify: true,
            youtube_api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    /// Provider used when a query does not name one.
    #[serde(default)]
    pub default_source: SourceKind,
    /// Refill the queue with genre recommendations after each track.
    #[serde(default)]
    pub smart_play: bool,
    /// Streaming attempts per track for real sources.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Base unit for the linear retry backoff.
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Duration of the synthetic silence placeholder stream.
    #[serde(default = "default_placeholder_ms")]
    pub placeholder_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_source: SourceKind::default(),
            smart_play: false,
            retry_limit: default_retry_limit(),
            retry_backoff_ms: default_backoff_ms(),
            placeholder_ms: default_placeholder_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PresenceConfig {
    /// Delay before the final presence recheck absorbs an in-flight event.
    #[serde(default = "default_recheck_ms")]
    pub recheck_delay_ms: u64,
    /// Ask the gateway for a snapshot before consulting the event-sourced
    /// store. Off by default: the snapshot endpoint is the less reliable of
    /// the two and is demoted to a recovery mechanism.
    #[serde(default)]
    pub snapshot_first: bool,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            recheck_delay_ms: default_recheck_ms(),
            snapshot_first: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub filters: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_retry_limit() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_placeholder_ms() -> u64 {
    3000
}

fn default_recheck_ms() -> u64 {
    100
}

impl Config {
    pub fn load(path: &str) -> crate::common::AnyResult<Self> {
        let config_str = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&config_str)?;
        Ok(config)
    }
}

/// Settings the command layer may flip at runtime.
pub struct PlayerSettings {
    default_source: RwLock<SourceKind>,
    smart_play: AtomicBool,
}

impl PlayerSettings {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            default_source: RwLock::new(config.default_source),
            smart_play: AtomicBool::new(config.smart_play),
        }
    }

    pub fn default_source(&self) -> SourceKind {
        *self.default_source.read()
    }

    pub fn set_default_source(&self, kind: SourceKind) {
        *self.default_source.write() = kind;
    }

    pub fn smart_play(&self) -> bool {
        self.smart_play.load(Ordering::Relaxed)
    }

    pub fn set_smart_play(&self, enabled: bool) {
        self.smart_play.store(enabled, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_on_empty_config() {
        let config: Config = toml::from_str("").expect("empty config should parse");
        assert!(config.sources.youtube);
        assert_eq!(config.player.retry_limit, 3);
        assert_eq!(config.player.retry_backoff_ms, 1000);
        assert_eq!(config.presence.recheck_delay_ms, 100);
        assert!(!config.presence.snapshot_first);
    }

    #[test]
    fn partial_tables_parse() {
        let config: Config = toml::from_str(
            r#"
            [player]
            default_source = "sp"
            smart_play = true

            [logging]
            level = "debug"
            "#,
        )
        .expect("config should parse");
        assert_eq!(config.player.default_source, SourceKind::Spotify);
        assert!(config.player.smart_play);
        assert_eq!(config.logging.unwrap().level.as_deref(), Some("debug"));
    }
}

//! Configuration loading and the reader-lock realization of spec.md §5
//! ("shared configuration... read under a separate reader-lock").
//!
//! The core crate deliberately stays free of a config-loading dependency
//! (`mme_s1ap_core::config` note); this crate is the one place in the
//! workspace that reaches for `serde`, mirroring how `powerlink-rs-monitor`
//! is the only crate in the teacher's workspace that pulls in `serde` +
//! JSON. Here the outer format is TOML rather than JSON, since this struct
//! is meant to be hand-edited as a service config file rather than shipped
//! over a WebSocket.

use mme_s1ap_core::ids::{Gummei, PlmnId, Tai};
use mme_s1ap_core::McConfig;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// The on-disk shape of `McConfig`. Durations are spelled out in
/// milliseconds since TOML has no native duration type, and PLMN IDs as
/// three raw octets (BCD-encoded MCC/MNC), matching the wire encoding
/// `mme_s1ap_core::ids::PlmnId` wraps.
#[derive(Debug, Deserialize)]
pub struct McConfigFile {
    max_connected_enbs: usize,
    #[serde(default)]
    served_tais: Vec<TaiFile>,
    #[serde(default)]
    served_gummeis: Vec<GummeiFile>,
    relative_mme_capacity: u8,
    release_timer_ms: u64,
    handover_completion_timer_ms: u64,
    esm_deactivate_timer_ms: u64,
    esm_deactivate_max_retries: u8,
    disconnect_batch_size: usize,
    setup_failure_time_to_wait_ms: u64,
}

#[derive(Debug, Deserialize)]
struct TaiFile {
    plmn: [u8; 3],
    tac: u16,
}

#[derive(Debug, Deserialize)]
struct GummeiFile {
    plmn: [u8; 3],
    mme_group_id: u16,
    mme_code: u8,
}

/// Errors surfaced while loading or parsing a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read configuration file: {e}"),
            Self::Parse(e) => write!(f, "failed to parse configuration file: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl McConfigFile {
    fn into_config(self) -> McConfig {
        McConfig {
            max_connected_enbs: self.max_connected_enbs,
            served_tais: self.served_tais.into_iter().map(|t| Tai { plmn: PlmnId::new(t.plmn), tac: t.tac }).collect(),
            served_gummeis: self
                .served_gummeis
                .into_iter()
                .map(|g| Gummei { plmn: PlmnId::new(g.plmn), mme_group_id: g.mme_group_id, mme_code: g.mme_code })
                .collect(),
            relative_mme_capacity: self.relative_mme_capacity,
            release_timer: Duration::from_millis(self.release_timer_ms),
            handover_completion_timer: Duration::from_millis(self.handover_completion_timer_ms),
            esm_deactivate_timer: Duration::from_millis(self.esm_deactivate_timer_ms),
            esm_deactivate_max_retries: self.esm_deactivate_max_retries,
            disconnect_batch_size: self.disconnect_batch_size,
            setup_failure_time_to_wait: Duration::from_millis(self.setup_failure_time_to_wait_ms),
        }
    }
}

/// Reads and parses a TOML configuration file into an `McConfig`.
pub fn load_from_toml(path: &Path) -> Result<McConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let file: McConfigFile = toml::from_str(&text).map_err(ConfigError::Parse)?;
    Ok(file.into_config())
}

/// The reader-lock realization of spec.md §5: an `ArcSwap<McConfig>` that
/// the S1AP task reads without blocking on every operation, and that a
/// control-plane reload command replaces wholesale (never mutated in
/// place).
#[derive(Clone)]
pub struct ConfigHandle(Arc<arc_swap::ArcSwap<McConfig>>);

impl ConfigHandle {
    pub fn new(config: McConfig) -> Self {
        Self(Arc::new(arc_swap::ArcSwap::from_pointee(config)))
    }

    /// A cheap, lock-free snapshot of the current configuration.
    pub fn load(&self) -> arc_swap::Guard<Arc<McConfig>> {
        self.0.load()
    }

    /// Swaps in a freshly loaded configuration, e.g. in response to a
    /// SIGHUP or an admin reload command.
    pub fn reload(&self, config: McConfig) {
        self.0.store(Arc::new(config));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config_file() {
        let toml_text = r#"
            max_connected_enbs = 512
            relative_mme_capacity = 200
            release_timer_ms = 1000
            handover_completion_timer_ms = 2000
            esm_deactivate_timer_ms = 8000
            esm_deactivate_max_retries = 5
            disconnect_batch_size = 256
            setup_failure_time_to_wait_ms = 20000

            [[served_tais]]
            plmn = [0x00, 0xF1, 0x10]
            tac = 1

            [[served_gummeis]]
            plmn = [0x00, 0xF1, 0x10]
            mme_group_id = 1
            mme_code = 1
        "#;
        let file: McConfigFile = toml::from_str(toml_text).unwrap();
        let config = file.into_config();
        assert_eq!(config.max_connected_enbs, 512);
        assert_eq!(config.served_tais.len(), 1);
        assert_eq!(config.served_gummeis.len(), 1);
        assert_eq!(config.release_timer, Duration::from_secs(1));
    }

    #[test]
    fn config_handle_reload_replaces_snapshot() {
        let handle = ConfigHandle::new(McConfig::default());
        assert_eq!(handle.load().max_connected_enbs, 1024);
        let mut next = McConfig::default();
        next.max_connected_enbs = 2048;
        handle.reload(next);
        assert_eq!(handle.load().max_connected_enbs, 2048);
    }
}

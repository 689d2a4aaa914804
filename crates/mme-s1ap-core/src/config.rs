//! Configuration recognized by the core (spec.md §6), expressed as a plain
//! struct in the style of `hal::Identity` rather than a config-loading
//! crate — the teacher keeps configuration as plain data + a narrow trait
//! (`ConfigurationInterface`) and leaves loading it to the application; we do
//! the same, with the runtime crate owning the actual TOML/env loading.

use crate::ids::{Gummei, Tai};
use std::time::Duration;

/// Static and slow-changing configuration the engine consults. Read under a
/// reader-lock per spec.md §5; see `mme-s1ap-runtime` for the `ArcSwap`
/// realization of that lock.
#[derive(Debug, Clone, PartialEq)]
pub struct McConfig {
    /// Reject further S1SetupRequests once this many eNodeBs are connected.
    pub max_connected_enbs: usize,
    /// Tracking areas this MME serves; a setup request's Supported-TAs list
    /// must overlap this set or the setup is rejected.
    pub served_tais: Vec<Tai>,
    /// GUMMEIs advertised in S1SetupResponse.
    pub served_gummeis: Vec<Gummei>,
    /// Relative MME capacity (0-255), advertised in S1SetupResponse.
    pub relative_mme_capacity: u8,
    /// UE-context-release timer (default 1s).
    pub release_timer: Duration,
    /// Handover-completion timer (no fixed spec default; site-configured).
    pub handover_completion_timer: Duration,
    /// ESM deactivate-request retransmission timer, T3495 by role (default
    /// 8s) — see DESIGN.md for the T3492/T3495 naming ambiguity.
    pub esm_deactivate_timer: Duration,
    /// Maximum ESM deactivate retransmissions before giving up locally.
    pub esm_deactivate_max_retries: u8,
    /// Batch size for deregistration events emitted on peer disconnect.
    pub disconnect_batch_size: usize,
    /// `time-to-wait` advertised in overload/unknown-PLMN S1SetupFailure.
    pub setup_failure_time_to_wait: Duration,
}

impl Default for McConfig {
    fn default() -> Self {
        Self {
            max_connected_enbs: 1024,
            served_tais: Vec::new(),
            served_gummeis: Vec::new(),
            relative_mme_capacity: 255,
            release_timer: Duration::from_secs(1),
            handover_completion_timer: Duration::from_secs(2),
            esm_deactivate_timer: Duration::from_secs(8),
            esm_deactivate_max_retries: 5,
            disconnect_batch_size: 256,
            setup_failure_time_to_wait: Duration::from_secs(20),
        }
    }
}

impl McConfig {
    /// Whether `candidate` TAI is among the served set (used by
    /// `on-s1-setup-request`'s PLMN/TA overlap check).
    pub fn serves_tai(&self, candidate: &Tai) -> bool {
        self.served_tais.iter().any(|t| t == candidate)
    }
}

//! The per-UE S1AP reference (spec.md §3, §4.2).

use crate::action::TimerHandle;
use crate::cause::ReleaseCause;
use crate::ids::{AssocId, EnbUeS1apId, MmeUeS1apId};

/// S1AP-visible state of a UE reference (spec.md §3, §4.3 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S1apState {
    Idle,
    Connected,
    WaitingReleaseComplete,
    HandoverInProgress,
}

/// A single UE's S1AP-layer state.
///
/// Holds the owning eNodeB's association identifier rather than a pointer
/// or index into the registry (spec.md §9 re-architecture note): lookups
/// always go back through `PeerRegistry` by that stable key.
#[derive(Debug)]
pub struct UeReference {
    pub owning_assoc: AssocId,
    /// `None` until the MME-app binds an ID — used for the window between a
    /// target-side HandoverRequestAcknowledge and the following
    /// HandoverNotify (spec.md §9 dual-identity note).
    pub mme_ue_id: Option<MmeUeS1apId>,
    pub enb_ue_id: EnbUeS1apId,
    pub inbound_stream: u16,
    pub outbound_stream: u16,
    pub state: S1apState,
    pub release_timer: Option<TimerHandle>,
    pub handover_timer: Option<TimerHandle>,
    pub last_release_cause: Option<ReleaseCause>,
}

impl UeReference {
    pub fn new(
        owning_assoc: AssocId,
        enb_ue_id: EnbUeS1apId,
        mme_ue_id: Option<MmeUeS1apId>,
        inbound_stream: u16,
        outbound_stream: u16,
    ) -> Self {
        Self {
            owning_assoc,
            mme_ue_id,
            enb_ue_id,
            inbound_stream,
            outbound_stream,
            state: S1apState::Idle,
            release_timer: None,
            handover_timer: None,
            last_release_cause: None,
        }
    }

    /// Invariant check used by property tests (spec.md §8): a UE in
    /// WAITING-RELEASE-COMPLETE must have a live release timer.
    pub fn release_timer_consistent(&self) -> bool {
        (self.state == S1apState::WaitingReleaseComplete) == self.release_timer.is_some()
    }
}

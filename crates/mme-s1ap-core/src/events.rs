//! Northbound events delivered to the MME-app / NAS collaborator
//! (spec.md §6). Each decoded and validated S1AP event becomes one of these.

use crate::cause::WireCause;
use crate::ids::{AssocId, EnbId, EnbUeS1apId, MmeUeS1apId, Tai};
use crate::pdu::{AdmittedErab, BearerStatusTransferItem, Ecgi};

/// Abstract cause category surfaced upward for peer-reported or
/// timer-driven failures (spec.md §4.3, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpwardCause {
    Wire(WireCauseCategory),
    HandoverFailed,
    SystemFailure,
}

/// A coarse view of `WireCause` for upward reporting, since MME-app doesn't
/// need the full group/code distinction the wire protocol does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireCauseCategory {
    RadioNetwork,
    Transport,
    Nas,
    Protocol,
    Misc,
}

impl From<WireCause> for WireCauseCategory {
    fn from(c: WireCause) -> Self {
        match c {
            WireCause::RadioNetwork(_) => Self::RadioNetwork,
            WireCause::Transport(_) => Self::Transport,
            WireCause::Nas(_) => Self::Nas,
            WireCause::Protocol(_) => Self::Protocol,
            WireCause::Misc(_) => Self::Misc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpwardEvent {
    /// A batch of UE references were torn down because their eNodeB
    /// disconnected (spec.md §4.1 `on-peer-disconnect`).
    Deregistered {
        assoc: AssocId,
        ue_ids: Vec<MmeUeS1apId>,
    },
    /// The peer asked for a reset of the listed (MME-UE-ID, eNB-UE-ID)
    /// pairs (full reset lists every UE currently under this eNodeB). The
    /// MME-app decides what to tear down and answers with
    /// `Engine::on_reset_ack`; the UE references are not removed here.
    ResetRequested {
        assoc: AssocId,
        ue_pairs: Vec<(MmeUeS1apId, EnbUeS1apId)>,
    },
    /// A UE context was released, whether by peer ReleaseComplete or by
    /// release-timer expiry.
    ReleaseComplete {
        mme_ue_id: MmeUeS1apId,
        cause: Option<WireCause>,
    },
    /// InitialContextSetupResponse admitted E-RABs, forwarded upward.
    InitialContextAdmitted {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        admitted_erabs: Vec<AdmittedErab>,
    },
    /// InitialContextSetupFailure, surfaced without deleting the UE
    /// reference (the upper layer decides).
    InitialContextFailed {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        cause: WireCause,
    },
    /// Source-side HandoverRequired, forwarded with the opaque
    /// source-to-target transparent container.
    HandoverRequired {
        assoc: AssocId,
        mme_ue_id: MmeUeS1apId,
        target_enb_id: EnbId,
        selected_tai: Tai,
        cause: WireCause,
        source_to_target_container: Vec<u8>,
    },
    HandoverCancelRequested {
        assoc: AssocId,
        mme_ue_id: MmeUeS1apId,
    },
    EnbStatusTransferReceived {
        mme_ue_id: MmeUeS1apId,
        bearers: Vec<BearerStatusTransferItem>,
    },
    /// Target-side HandoverRequestAcknowledge, forwarded with the
    /// target-to-source container and admitted resources.
    HandoverRequestAcknowledged {
        target_assoc: AssocId,
        source_mme_ue_id: MmeUeS1apId,
        target_enb_ue_id: EnbUeS1apId,
        admitted_erabs: Vec<AdmittedErab>,
        target_to_source_container: Vec<u8>,
    },
    /// Target allocation failed, or the target itself reported
    /// HandoverFailure.
    HandoverFailure {
        source_mme_ue_id: MmeUeS1apId,
        cause: UpwardCause,
    },
    HandoverNotify {
        target_assoc: AssocId,
        target_enb_ue_id: EnbUeS1apId,
        tai: Tai,
        ecgi: Ecgi,
    },
    /// PathSwitchRequest succeeded: the old UE reference is gone, the new
    /// one lives under `new_assoc`/`new_stream`.
    PathSwitchAdmitted {
        new_assoc: AssocId,
        new_stream: u16,
        mme_ue_id: MmeUeS1apId,
        erabs_to_switch: Vec<AdmittedErab>,
    },
    /// ErrorIndication for a known UE, tagged as a handover-failed cause
    /// category for MME-app adjudication (spec.md §4.3).
    ErrorIndicationReceived {
        mme_ue_id: MmeUeS1apId,
        cause: WireCause,
    },
    /// Peer-initiated UeContextReleaseRequest, forwarded unchanged for
    /// MME-app to decide whether and how to release (spec.md §4.3).
    UeContextReleaseRequested {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        cause: WireCause,
    },
    /// A decoded PDU whose (procedure code, direction) key has no handler.
    /// State is untouched; this is purely informational.
    Ignored { reason: &'static str },
    /// The ESM deactivation procedure gave up after the fifth retry and
    /// locally released the bearer (spec.md §4.4).
    DedicatedBearerDeactivationComplete {
        mme_ue_id: MmeUeS1apId,
        eps_bearer_id: u8,
    },
    /// The ESM deactivation procedure could not even start: the named PDN
    /// connection does not exist (spec.md §4.4 step 1, cause =
    /// PDN-connection-does-not-exist). No transaction was created.
    BearerDeactivationRejected {
        mme_ue_id: MmeUeS1apId,
        eps_bearer_id: u8,
    },
    /// A new UE reference was created from InitialUeMessage, carrying the
    /// freshly allocated MME-UE-ID and the uplink NAS PDU attached to it
    /// (spec.md §4.2 `new-ue`). Everything past the NAS container itself is
    /// out of scope; this is the one NAS-bearing event the core surfaces.
    UeAttached {
        assoc: AssocId,
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        nas_pdu: Vec<u8>,
    },
}

/// Sink for upward events, implemented by the runtime's mailbox adapter.
/// Kept as a trait so the core crate never depends on a concrete channel
/// type.
pub trait MmeAppSink {
    fn notify(&mut self, event: UpwardEvent);

    /// Synchronous allocation of a fresh MME-assigned UE ID for a newly
    /// observed UE. Modeled as a direct call rather than a round trip
    /// through a mailbox — see DESIGN.md for the Open Question this
    /// resolves.
    fn allocate_mme_ue_id(&mut self) -> MmeUeS1apId;
}

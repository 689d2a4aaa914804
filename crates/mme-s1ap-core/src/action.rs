//! The effect types the engine emits instead of performing I/O itself.
//!
//! Every core operation is a pure function of its inputs and current state
//! that returns a list of `EngineAction`s — generalizing the teacher's single
//! `NodeAction` return (`node::NodeAction::{SendFrame, SendUdp, NoAction}`) to
//! a `Vec`, since a single S1AP procedure routinely produces more than one
//! effect (e.g. an outbound PDU *and* an upward event, or a timer cancel
//! *and* an upward event). The runtime crate is the only place that performs
//! the actual send/arm/cancel.

use crate::events::UpwardEvent;
use crate::ids::{AssocId, MmeUeS1apId};
use crate::pdu::OutboundPdu;
use std::time::Duration;

/// Opaque, sentinel-style timer handle. `0` is never issued — callers can
/// use it as an "inactive" sentinel in the style of the source's in-struct
/// timer IDs, per the REDESIGN FLAGS in spec.md §9.
pub type TimerHandle = u64;

/// What a timer, once armed, is for. The runtime uses this only for
/// logging/metrics; the handle alone is enough to route an expiry back to
/// the right entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// UE-context release timer (spec.md §4.3).
    Release,
    /// Handover-completion timer (spec.md §4.3 target-side handover).
    HandoverCompletion,
    /// ESM deactivate-request retransmission timer, T3495 by role.
    EsmDeactivate,
}

/// A side effect the engine wants performed. Returned in order; the runtime
/// executes them in the order given (an `ArmTimer` after a `CancelTimer` for
/// the same logical purpose means "re-arm", per spec.md §5's "rescheduling
/// requires explicit cancel-then-arm").
#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    /// Encode and send `pdu` to `assoc` on `stream`.
    SendPdu {
        assoc: AssocId,
        stream: u16,
        pdu: OutboundPdu,
    },
    /// Deliver a decoded, validated event to the MME-app/NAS collaborator.
    Upward(UpwardEvent),
    /// Deliver an already-encoded NAS PDU to `mme_ue_id`, piggybacked on S1AP
    /// by the runtime (DownlinkNASTransport or a UE-associated procedure).
    /// The ESM deactivation procedure is the one NAS exchange the core
    /// drives itself; everything else about NAS transport is out of scope.
    SendNasPdu {
        mme_ue_id: MmeUeS1apId,
        nas_pdu: Vec<u8>,
    },
    /// Arm a new one-shot timer.
    ArmTimer {
        handle: TimerHandle,
        kind: TimerKind,
        duration: Duration,
    },
    /// Cancel a previously armed timer. A no-op if it already fired.
    CancelTimer { handle: TimerHandle },
}

/// Convenience alias for the common case of "state change with a handful of
/// effects, no failure".
pub type Actions = Vec<EngineAction>;

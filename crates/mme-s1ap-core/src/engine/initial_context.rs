//! Initial UE Message and Initial Context Setup (spec.md §4.2, §4.3).

use crate::action::{Actions, EngineAction};
use crate::cause::WireCause;
use crate::events::{MmeAppSink, UpwardEvent};
use crate::ids::{AssocId, EnbUeS1apId};
use crate::pdu::AdmittedErab;
use crate::registry::PeerRegistry;
use crate::ue::S1apState;

/// `new-ue` at the point an eNodeB first reports a UE: allocates an MME-UE-ID
/// through `sink` and creates the reference (spec.md §4.2).
pub fn on_initial_ue_message(
    registry: &mut PeerRegistry,
    sink: &mut dyn MmeAppSink,
    assoc: AssocId,
    enb_ue_id: EnbUeS1apId,
    inbound_stream: u16,
    nas_pdu: Vec<u8>,
) -> Actions {
    let mme_ue_id = sink.allocate_mme_ue_id();
    match registry.new_ue(assoc, enb_ue_id, Some(mme_ue_id), inbound_stream) {
        Ok(ue) => {
            ue.state = S1apState::Connected;
            vec![EngineAction::Upward(UpwardEvent::UeAttached { assoc, mme_ue_id, enb_ue_id, nas_pdu })]
        }
        Err(e) => {
            log::warn!("rejecting InitialUeMessage on {assoc:?}: {e}");
            vec![EngineAction::Upward(UpwardEvent::Ignored { reason: "InitialUeMessage on non-READY descriptor" })]
        }
    }
}

/// `InitialContextSetupResponse` (spec.md §4.3): cross-checks the carried
/// (MME-UE-ID, eNB-UE-ID) pair against the stored reference before
/// admitting the E-RAB list. An empty admitted list is a protocol failure,
/// not a successful empty context.
pub fn on_initial_context_setup_response(
    registry: &mut PeerRegistry,
    mme_ue_id: crate::ids::MmeUeS1apId,
    enb_ue_id: EnbUeS1apId,
    admitted_erabs: Vec<AdmittedErab>,
) -> Actions {
    let Some(ue) = registry.lookup_by_mme_id_mut(mme_ue_id) else {
        log::warn!("InitialContextSetupResponse for unknown MME-UE-ID {mme_ue_id}");
        return vec![EngineAction::Upward(UpwardEvent::Ignored {
            reason: "InitialContextSetupResponse for an unknown UE reference",
        })];
    };
    if ue.enb_ue_id != enb_ue_id {
        log::warn!(
            "InitialContextSetupResponse eNB-UE-ID mismatch for MME-UE-ID {mme_ue_id}: stored {}, received {enb_ue_id}",
            ue.enb_ue_id
        );
        return vec![EngineAction::Upward(UpwardEvent::Ignored {
            reason: "InitialContextSetupResponse eNB-UE-ID mismatch",
        })];
    }
    if admitted_erabs.is_empty() {
        log::warn!("InitialContextSetupResponse for MME-UE-ID {mme_ue_id} admitted zero E-RABs");
        return vec![EngineAction::Upward(UpwardEvent::Ignored {
            reason: "InitialContextSetupResponse admitted an empty E-RAB list",
        })];
    }
    ue.state = S1apState::Connected;
    vec![EngineAction::Upward(UpwardEvent::InitialContextAdmitted { mme_ue_id, enb_ue_id, admitted_erabs })]
}

pub fn on_initial_context_setup_failure(
    mme_ue_id: crate::ids::MmeUeS1apId,
    enb_ue_id: EnbUeS1apId,
    cause: WireCause,
) -> Actions {
    vec![EngineAction::Upward(UpwardEvent::InitialContextFailed { mme_ue_id, enb_ue_id, cause })]
}

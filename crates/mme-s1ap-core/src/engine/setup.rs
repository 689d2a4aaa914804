//! The S1 Setup and Reset procedures (spec.md §4.1, §4.3).

use crate::action::{Actions, EngineAction};
use crate::cause::{MiscCause, WireCause};
use crate::config::McConfig;
use crate::events::UpwardEvent;
use crate::ids::{AssocId, EnbId, EnbUeS1apId, MmeUeS1apId, Tai};
use crate::pdu::{OutboundPdu, ResetKind};
use crate::registry::PeerRegistry;
use crate::registry::enb::EnbState;

/// `on-s1-setup-request` (spec.md §4.1): admits or rejects a new eNodeB
/// based on capacity and served-TA overlap, replying on the same
/// association's stream 0.
pub fn on_s1_setup_request(
    registry: &mut PeerRegistry,
    config: &McConfig,
    assoc: AssocId,
    stream: u16,
    enb_id: EnbId,
    enb_name: Option<String>,
    default_paging_drx: u8,
    supported_tas: Vec<Tai>,
) -> Actions {
    let mut actions = Vec::new();

    if stream != 0 {
        log::warn!("S1SetupRequest on association {assoc:?} arrived on stream {stream}, not 0");
        actions.push(reject(assoc, WireCause::Protocol(crate::cause::ProtocolCause::Unspecified), None));
        return actions;
    }

    if registry.enb_id_in_use_by_other(assoc, enb_id) {
        actions.push(reject(assoc, WireCause::Misc(MiscCause::Unspecified), Some(config.setup_failure_time_to_wait)));
        return actions;
    }

    if registry.connected_count() >= config.max_connected_enbs {
        actions.push(reject(
            assoc,
            WireCause::Misc(MiscCause::ControlProcessingOverload),
            Some(config.setup_failure_time_to_wait),
        ));
        return actions;
    }

    let overlaps = supported_tas.iter().any(|t| config.serves_tai(t));
    if !overlaps {
        actions.push(reject(assoc, WireCause::Misc(MiscCause::UnknownPlmn), None));
        return actions;
    }

    let Some(enb) = registry.get_mut(assoc) else {
        log::warn!("S1SetupRequest on association {assoc:?} with no prior descriptor");
        actions.push(reject(assoc, WireCause::Misc(MiscCause::Unspecified), None));
        return actions;
    };
    enb.enb_id = Some(enb_id);
    enb.name = enb_name;
    enb.default_paging_drx = Some(default_paging_drx);
    enb.supported_tas = supported_tas;
    // INIT -> RESETTING while the response is being built, then RESETTING ->
    // READY once it is actually encoded and queued to send (spec.md §4.1,
    // §4.3 state machine; scenario 1).
    enb.state = EnbState::Resetting;

    actions.push(EngineAction::SendPdu {
        assoc,
        stream: 0,
        pdu: OutboundPdu::S1SetupResponse {
            served_gummeis: config.served_gummeis.clone(),
            relative_mme_capacity: config.relative_mme_capacity,
        },
    });

    // The response PDU is now encoded and queued; the descriptor is READY.
    registry
        .get_mut(assoc)
        .expect("descriptor looked up above still exists")
        .state = EnbState::Ready;

    actions
}

fn reject(
    assoc: AssocId,
    cause: WireCause,
    time_to_wait: Option<std::time::Duration>,
) -> EngineAction {
    EngineAction::SendPdu {
        assoc,
        stream: 0,
        pdu: OutboundPdu::S1SetupFailure { cause, time_to_wait },
    }
}

/// `on-reset` (spec.md §4.1): a peer-initiated Reset, full or partial.
/// Accepted only while the descriptor is READY. The UE references named
/// are not torn down here — the request is surfaced upward as
/// `ResetRequested` and the MME-app answers via `on_reset_ack` once it has
/// decided what to release, per spec.md §4.1's "on receipt of a reset-ack
/// from the upward layer, encode ResetAcknowledge".
pub fn on_reset(registry: &PeerRegistry, assoc: AssocId, kind: ResetKind) -> Actions {
    let Some(enb) = registry.get(assoc) else {
        log::warn!("Reset on association {assoc:?} with no descriptor, dropping");
        return Vec::new();
    };
    if !enb.is_ready() {
        log::warn!("Reset on association {assoc:?} rejected: descriptor not READY");
        return Vec::new();
    }

    let ue_pairs: Vec<(MmeUeS1apId, EnbUeS1apId)> = match kind {
        ResetKind::Full => enb
            .ues
            .values()
            .filter_map(|ue| ue.mme_ue_id.map(|mme_ue_id| (mme_ue_id, ue.enb_ue_id)))
            .collect(),
        ResetKind::Partial(ids) => {
            if ids.len() > enb.ues.len() {
                log::warn!(
                    "partial Reset on {assoc:?} names {} UEs but only {} are connected, protocol error",
                    ids.len(),
                    enb.ues.len()
                );
                return Vec::new();
            }
            ids
        }
    };

    vec![EngineAction::Upward(UpwardEvent::ResetRequested { assoc, ue_pairs })]
}

/// Completes a Reset once the MME-app has acknowledged which UEs to tear
/// down: removes the corresponding UE references and replies
/// ResetAcknowledge on stream 0 (spec.md §4.1).
pub fn on_reset_ack(
    registry: &mut PeerRegistry,
    assoc: AssocId,
    acknowledged: Vec<(MmeUeS1apId, EnbUeS1apId)>,
) -> Actions {
    let mut actions = Vec::new();
    for (_, enb_ue_id) in &acknowledged {
        if let Some((_, cancels)) = registry.remove_ue(assoc, *enb_ue_id) {
            actions.extend(cancels);
        }
    }
    actions.push(EngineAction::SendPdu {
        assoc,
        stream: 0,
        pdu: OutboundPdu::ResetAcknowledge { acknowledged },
    });
    actions
}

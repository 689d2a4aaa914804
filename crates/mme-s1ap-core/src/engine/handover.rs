//! S1-based handover (source and target side), path switch, and error
//! indication (spec.md §4.3).

use crate::action::{Actions, EngineAction, TimerKind};
use crate::cause::WireCause;
use crate::config::McConfig;
use crate::events::{UpwardCause, UpwardEvent, WireCauseCategory};
use crate::ids::{AssocId, EnbId, EnbUeS1apId, MmeUeS1apId, Tai};
use crate::pdu::{AdmittedErab, BearerStatusTransferItem, Ecgi, OutboundPdu};
use crate::registry::PeerRegistry;
use crate::ue::S1apState;

/// Source-side HandoverRequired: forwarded upward untouched. Requires the
/// UE reference to exist and be CONNECTED (spec.md §4.3); anything else is
/// a protocol violation and is dropped rather than forwarded.
pub fn on_handover_required(
    registry: &mut PeerRegistry,
    assoc: AssocId,
    mme_ue_id: MmeUeS1apId,
    enb_ue_id: EnbUeS1apId,
    target_enb_id: EnbId,
    selected_tai: Tai,
    cause: WireCause,
    source_to_target_container: Vec<u8>,
) -> Actions {
    let Some(ue) = registry.lookup_by_enb_id_mut(assoc, enb_ue_id) else {
        log::warn!("HandoverRequired for unknown UE reference on {assoc:?}/{enb_ue_id}");
        return vec![EngineAction::Upward(UpwardEvent::Ignored { reason: "HandoverRequired for unknown UE reference" })];
    };
    if ue.state != S1apState::Connected {
        log::warn!("HandoverRequired for UE {mme_ue_id} not in CONNECTED state");
        return vec![EngineAction::Upward(UpwardEvent::Ignored { reason: "HandoverRequired while not CONNECTED" })];
    }
    ue.state = S1apState::HandoverInProgress;
    vec![EngineAction::Upward(UpwardEvent::HandoverRequired {
        assoc,
        mme_ue_id,
        target_enb_id,
        selected_tai,
        cause,
        source_to_target_container,
    })]
}

/// Source-side HandoverCancel: the source eNodeB withdrew its own request.
/// Requires the UE reference to exist and be CONNECTED, same as
/// HandoverRequired (spec.md §4.3).
pub fn on_handover_cancel(
    registry: &mut PeerRegistry,
    assoc: AssocId,
    mme_ue_id: MmeUeS1apId,
    enb_ue_id: EnbUeS1apId,
) -> Actions {
    let Some(ue) = registry.lookup_by_enb_id_mut(assoc, enb_ue_id) else {
        log::warn!("HandoverCancel for unknown UE reference on {assoc:?}/{enb_ue_id}");
        return vec![EngineAction::Upward(UpwardEvent::Ignored { reason: "HandoverCancel for unknown UE reference" })];
    };
    if ue.state != S1apState::Connected {
        log::warn!("HandoverCancel for UE {mme_ue_id} not in CONNECTED state");
        return vec![EngineAction::Upward(UpwardEvent::Ignored { reason: "HandoverCancel while not CONNECTED" })];
    }
    ue.state = S1apState::Connected;
    vec![EngineAction::Upward(UpwardEvent::HandoverCancelRequested { assoc, mme_ue_id })]
}

pub fn on_enb_status_transfer(
    mme_ue_id: MmeUeS1apId,
    bearers: Vec<BearerStatusTransferItem>,
) -> Actions {
    vec![EngineAction::Upward(UpwardEvent::EnbStatusTransferReceived { mme_ue_id, bearers })]
}

/// Target-side HandoverRequestAcknowledge: creates the target UE reference,
/// staged unbound until HandoverNotify (spec.md §9), and arms the
/// handover-completion timer. Per spec.md §4.3, a missing descriptor, a
/// failed allocation, or an empty admitted-E-RAB list all synthesize an
/// upward HandoverFailure(system-failure); the last case additionally
/// issues a fire-and-forget UEContextReleaseCommand since a UE reference
/// was already created before the list was found empty.
pub fn on_handover_request_acknowledge(
    registry: &mut PeerRegistry,
    config: &McConfig,
    target_assoc: AssocId,
    source_mme_ue_id: MmeUeS1apId,
    target_enb_ue_id: EnbUeS1apId,
    inbound_stream: u16,
    admitted_erabs: Vec<AdmittedErab>,
    target_to_source_container: Vec<u8>,
) -> Actions {
    let Ok(ue) = registry.new_ue(target_assoc, target_enb_ue_id, None, inbound_stream) else {
        return vec![EngineAction::Upward(UpwardEvent::HandoverFailure {
            source_mme_ue_id,
            cause: UpwardCause::SystemFailure,
        })];
    };

    if admitted_erabs.is_empty() {
        log::warn!("HandoverRequestAcknowledge on {target_assoc:?} admitted zero E-RABs, aborting");
        let outbound_stream = ue.outbound_stream;
        let mut actions = vec![EngineAction::SendPdu {
            assoc: target_assoc,
            stream: outbound_stream,
            pdu: OutboundPdu::UeContextReleaseCommand {
                mme_ue_id: source_mme_ue_id,
                enb_ue_id: target_enb_ue_id,
                cause: WireCause::Transport(crate::cause::TransportCause::Unspecified),
            },
        }];
        if let Some((_, cancels)) = registry.remove_ue(target_assoc, target_enb_ue_id) {
            actions.extend(cancels);
        }
        actions.push(EngineAction::Upward(UpwardEvent::HandoverFailure {
            source_mme_ue_id,
            cause: UpwardCause::SystemFailure,
        }));
        return actions;
    }

    ue.state = S1apState::HandoverInProgress;
    registry.stage_handover_target(target_assoc, target_enb_ue_id, source_mme_ue_id);
    let handle = registry.next_timer_handle();
    if let Some(ue) = registry.lookup_by_enb_id_mut(target_assoc, target_enb_ue_id) {
        ue.handover_timer = Some(handle);
    }

    vec![
        EngineAction::ArmTimer { handle, kind: TimerKind::HandoverCompletion, duration: config.handover_completion_timer },
        EngineAction::Upward(UpwardEvent::HandoverRequestAcknowledged {
            target_assoc,
            source_mme_ue_id,
            target_enb_ue_id,
            admitted_erabs,
            target_to_source_container,
        }),
    ]
}

pub fn on_handover_failure(source_mme_ue_id: MmeUeS1apId, cause: WireCause) -> Actions {
    vec![EngineAction::Upward(UpwardEvent::HandoverFailure {
        source_mme_ue_id,
        cause: UpwardCause::Wire(WireCauseCategory::from(cause)),
    })]
}

/// HandoverNotify: the UE has actually moved. Binds the staged target
/// reference to its MME-UE-ID and tears down the old source-side reference.
pub fn on_handover_notify(
    registry: &mut PeerRegistry,
    target_assoc: AssocId,
    target_enb_ue_id: EnbUeS1apId,
    tai: Tai,
    ecgi: Ecgi,
) -> Actions {
    let Some(mme_ue_id) = registry.complete_handover_target(target_assoc, target_enb_ue_id) else {
        return vec![EngineAction::Upward(UpwardEvent::Ignored {
            reason: "HandoverNotify for an unstaged target reference",
        })];
    };

    let mut actions = Vec::new();
    if let Some(ue) = registry.lookup_by_enb_id_mut(target_assoc, target_enb_ue_id) {
        if let Some(handle) = ue.handover_timer.take() {
            actions.push(EngineAction::CancelTimer { handle });
        }
        ue.state = S1apState::Connected;
    }

    // Re-binding `mme_ue_id` above redirected the `mme_index` entry to the
    // target reference; look up the now-stale source reference by scanning
    // descriptors, since the index no longer points to it.
    let stale_source = registry
        .enb_descriptors()
        .find(|(assoc, enb)| **assoc != target_assoc && enb.ues.values().any(|ue| ue.mme_ue_id == Some(mme_ue_id)))
        .map(|(assoc, enb)| {
            let enb_ue_id = enb
                .ues
                .values()
                .find(|ue| ue.mme_ue_id == Some(mme_ue_id))
                .expect("just matched")
                .enb_ue_id;
            (*assoc, enb_ue_id)
        });
    if let Some((source_assoc, source_enb_ue_id)) = stale_source {
        if let Some((_, cancels)) = registry.remove_ue(source_assoc, source_enb_ue_id) {
            actions.extend(cancels);
        }
    }

    actions.push(EngineAction::Upward(UpwardEvent::HandoverNotify { target_assoc, target_enb_ue_id, tai, ecgi }));
    actions
}

/// PathSwitchRequest (spec.md §4.3): the UE moved to a new eNodeB without a
/// prior S1AP handover procedure (X2 handover completing at the S1
/// boundary). The old reference is dropped and a new one created under the
/// new association, keeping the same MME-UE-ID.
pub fn on_path_switch_request(
    registry: &mut PeerRegistry,
    new_assoc: AssocId,
    new_enb_ue_id: EnbUeS1apId,
    new_inbound_stream: u16,
    source_mme_ue_id: MmeUeS1apId,
    erabs_to_switch: Vec<AdmittedErab>,
) -> Actions {
    let Some(old_ue) = registry.lookup_by_mme_id(source_mme_ue_id) else {
        return vec![EngineAction::SendPdu {
            assoc: new_assoc,
            stream: 0,
            pdu: OutboundPdu::PathSwitchRequestFailure {
                source_mme_ue_id,
                cause: WireCause::Misc(crate::cause::MiscCause::Unspecified),
            },
        }];
    };
    let old_assoc = old_ue.owning_assoc;
    let old_enb_ue_id = old_ue.enb_ue_id;

    let mut actions = Vec::new();
    if let Some((_, cancels)) = registry.remove_ue(old_assoc, old_enb_ue_id) {
        actions.extend(cancels);
    }

    let Ok(ue) = registry.new_ue(new_assoc, new_enb_ue_id, Some(source_mme_ue_id), new_inbound_stream) else {
        actions.push(EngineAction::SendPdu {
            assoc: new_assoc,
            stream: 0,
            pdu: OutboundPdu::PathSwitchRequestFailure {
                source_mme_ue_id,
                cause: WireCause::Misc(crate::cause::MiscCause::Unspecified),
            },
        });
        return actions;
    };
    ue.state = S1apState::Connected;
    let new_stream = ue.outbound_stream;

    actions.push(EngineAction::SendPdu {
        assoc: new_assoc,
        stream: new_stream,
        pdu: OutboundPdu::PathSwitchRequestAcknowledge {
            mme_ue_id: source_mme_ue_id,
            enb_ue_id: new_enb_ue_id,
            switched_erabs: erabs_to_switch.clone(),
        },
    });
    actions.push(EngineAction::Upward(UpwardEvent::PathSwitchAdmitted {
        new_assoc,
        new_stream,
        mme_ue_id: source_mme_ue_id,
        erabs_to_switch,
    }));
    actions
}

/// ErrorIndication (spec.md §4.3 edge case): forwarded upward, tagged as a
/// handover-failed cause category for MME-app adjudication, only when it
/// can be tied to a known UE reference; otherwise dropped, per the source's
/// lenient handling of unmatched indications.
pub fn on_error_indication(
    registry: &PeerRegistry,
    mme_ue_id: Option<MmeUeS1apId>,
    enb_ue_id: Option<EnbUeS1apId>,
    cause: WireCause,
) -> Actions {
    match mme_ue_id.filter(|id| registry.lookup_by_mme_id(*id).is_some()) {
        Some(mme_ue_id) => vec![EngineAction::Upward(UpwardEvent::ErrorIndicationReceived { mme_ue_id, cause })],
        None => {
            log::info!("ErrorIndication for no known UE reference (enb_ue_id={enb_ue_id:?}, cause={cause:?})");
            vec![EngineAction::Upward(UpwardEvent::Ignored { reason: "ErrorIndication for an unknown UE reference" })]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cause::MiscCause;

    #[test]
    fn path_switch_for_unknown_mme_ue_id_fails_with_misc_unspecified() {
        let mut registry = PeerRegistry::new();
        let new_assoc = AssocId(1);
        let new_enb_ue_id = EnbUeS1apId::new(1).unwrap();
        let unknown_mme_ue_id = MmeUeS1apId::new(99).unwrap();

        let actions = on_path_switch_request(&mut registry, new_assoc, new_enb_ue_id, 1, unknown_mme_ue_id, vec![]);

        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            EngineAction::SendPdu {
                pdu: OutboundPdu::PathSwitchRequestFailure { cause: WireCause::Misc(MiscCause::Unspecified), .. },
                ..
            }
        ));
    }
}

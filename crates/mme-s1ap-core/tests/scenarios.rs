//! End-to-end procedure scenarios run directly against `Engine`, without a
//! transport or timer runtime: every operation here is synchronous, so the
//! test drives the state machine the same way the real runtime's mailbox
//! loop would, minus the I/O.

use mme_s1ap_core::cause::{NasCause, ReleaseCause, WireCause};
use mme_s1ap_core::config::McConfig;
use mme_s1ap_core::engine::Engine;
use mme_s1ap_core::events::{MmeAppSink, UpwardEvent};
use mme_s1ap_core::ids::{AssocId, EnbId, EnbUeS1apId, MmeUeS1apId, PlmnId, Tai};
use mme_s1ap_core::pdu::InboundPdu;
use mme_s1ap_core::EngineAction;

#[derive(Default)]
struct FakeSink {
    next_mme_ue_id: u32,
    events: Vec<UpwardEvent>,
}

impl MmeAppSink for FakeSink {
    fn notify(&mut self, event: UpwardEvent) {
        self.events.push(event);
    }

    fn allocate_mme_ue_id(&mut self) -> MmeUeS1apId {
        self.next_mme_ue_id += 1;
        MmeUeS1apId::new(self.next_mme_ue_id).unwrap()
    }
}

fn tai() -> Tai {
    Tai { plmn: PlmnId::new([0x00, 0xF1, 0x10]), tac: 0x0001 }
}

fn attached_mme_ue_id(engine: &mut Engine, sink: &mut FakeSink, assoc: AssocId, enb_ue_id: EnbUeS1apId) -> MmeUeS1apId {
    let actions = engine.on_pdu(assoc, 1, InboundPdu::InitialUeMessage { enb_ue_id, nas_pdu: vec![] }, sink);
    match actions.into_iter().find_map(|a| match a {
        EngineAction::Upward(UpwardEvent::UeAttached { mme_ue_id, .. }) => Some(mme_ue_id),
        _ => None,
    }) {
        Some(id) => id,
        None => panic!("expected UeAttached event"),
    }
}

fn engine_with_served_tai() -> Engine {
    let mut config = McConfig::default();
    config.served_tais.push(tai());
    config.served_gummeis.push(mme_s1ap_core::ids::Gummei {
        plmn: tai().plmn,
        mme_group_id: 1,
        mme_code: 1,
    });
    Engine::new(config)
}

#[test]
fn setup_attach_and_implicit_release_flow() {
    let mut engine = engine_with_served_tai();
    let mut sink = FakeSink::default();
    let assoc = AssocId(1);

    engine.on_new_peer(assoc, 8, 8).unwrap();
    let setup_actions = engine.on_pdu(
        assoc,
        0,
        InboundPdu::S1SetupRequest {
            enb_id: EnbId::macro_id(0x1234),
            enb_name: Some("enb-1".to_string()),
            default_paging_drx: 0,
            supported_tas: vec![tai()],
        },
        &mut sink,
    );
    assert!(setup_actions
        .iter()
        .any(|a| matches!(a, EngineAction::SendPdu { pdu: mme_s1ap_core::OutboundPdu::S1SetupResponse { .. }, .. })));

    let enb_ue_id = EnbUeS1apId::new(1).unwrap();
    let mme_ue_id = attached_mme_ue_id(&mut engine, &mut sink, assoc, enb_ue_id);

    let release_actions = engine.request_release(mme_ue_id, ReleaseCause::ImplicitRelease).unwrap();
    assert!(release_actions.iter().all(|a| !matches!(a, EngineAction::SendPdu { .. })));
    assert!(engine.registry.lookup_by_mme_id(mme_ue_id).is_none());
}

#[test]
fn setup_rejected_when_no_tracking_area_overlap() {
    let mut engine = Engine::new(McConfig::default());
    let mut sink = FakeSink::default();
    let assoc = AssocId(1);
    engine.on_new_peer(assoc, 8, 8).unwrap();

    let actions = engine.on_pdu(
        assoc,
        0,
        InboundPdu::S1SetupRequest {
            enb_id: EnbId::macro_id(1),
            enb_name: None,
            default_paging_drx: 0,
            supported_tas: vec![tai()],
        },
        &mut sink,
    );
    assert!(actions
        .iter()
        .any(|a| matches!(a, EngineAction::SendPdu { pdu: mme_s1ap_core::OutboundPdu::S1SetupFailure { .. }, .. })));
}

#[test]
fn normal_release_requires_peer_complete_before_removal() {
    let mut engine = engine_with_served_tai();
    let mut sink = FakeSink::default();
    let assoc = AssocId(1);
    engine.on_new_peer(assoc, 8, 8).unwrap();
    engine.on_pdu(
        assoc,
        0,
        InboundPdu::S1SetupRequest {
            enb_id: EnbId::macro_id(1),
            enb_name: None,
            default_paging_drx: 0,
            supported_tas: vec![tai()],
        },
        &mut sink,
    );
    let enb_ue_id = EnbUeS1apId::new(1).unwrap();
    let mme_ue_id = attached_mme_ue_id(&mut engine, &mut sink, assoc, enb_ue_id);

    let actions = engine.request_release(mme_ue_id, ReleaseCause::NasDetach).unwrap();
    assert!(actions.iter().any(|a| matches!(a, EngineAction::ArmTimer { .. })));
    assert!(engine.registry.lookup_by_mme_id(mme_ue_id).is_some());

    let complete_actions = engine.on_pdu(
        assoc,
        1,
        InboundPdu::UeContextReleaseComplete { mme_ue_id, enb_ue_id },
        &mut sink,
    );
    assert!(complete_actions.iter().any(|a| matches!(a, EngineAction::CancelTimer { .. })));
    assert!(engine.registry.lookup_by_mme_id(mme_ue_id).is_none());

    // Release-timer expiry after the peer already answered would be a no-op.
    let late_expiry = engine.on_release_timer_expiry(mme_ue_id);
    assert!(late_expiry.is_empty());
}

#[test]
fn peer_disconnect_deregisters_every_attached_ue() {
    let mut engine = engine_with_served_tai();
    let mut sink = FakeSink::default();
    let assoc = AssocId(7);
    engine.on_new_peer(assoc, 8, 8).unwrap();
    engine.on_pdu(
        assoc,
        0,
        InboundPdu::S1SetupRequest {
            enb_id: EnbId::macro_id(2),
            enb_name: None,
            default_paging_drx: 0,
            supported_tas: vec![tai()],
        },
        &mut sink,
    );
    for i in 1..=3u32 {
        let enb_ue_id = EnbUeS1apId::new(i).unwrap();
        engine.on_pdu(assoc, i as u16, InboundPdu::InitialUeMessage { enb_ue_id, nas_pdu: vec![] }, &mut sink);
    }

    let actions = engine.on_peer_disconnect(assoc);
    let deregistered: Vec<_> = actions
        .iter()
        .filter_map(|a| match a {
            EngineAction::Upward(UpwardEvent::Deregistered { ue_ids, .. }) => Some(ue_ids.len()),
            _ => None,
        })
        .collect();
    assert_eq!(deregistered.iter().sum::<usize>(), 3);
    assert!(engine.registry.get(assoc).is_none());
}

#[test]
fn handover_acknowledge_then_notify_binds_target_and_drops_source() {
    let mut engine = engine_with_served_tai();
    let mut sink = FakeSink::default();
    let source_assoc = AssocId(1);
    let target_assoc = AssocId(2);

    for (assoc, enb_id) in [(source_assoc, 1u32), (target_assoc, 2u32)] {
        engine.on_new_peer(assoc, 8, 8).unwrap();
        engine.on_pdu(
            assoc,
            0,
            InboundPdu::S1SetupRequest {
                enb_id: EnbId::macro_id(enb_id),
                enb_name: None,
                default_paging_drx: 0,
                supported_tas: vec![tai()],
            },
            &mut sink,
        );
    }

    let source_enb_ue_id = EnbUeS1apId::new(1).unwrap();
    let mme_ue_id = attached_mme_ue_id(&mut engine, &mut sink, source_assoc, source_enb_ue_id);

    let target_enb_ue_id = EnbUeS1apId::new(99).unwrap();
    let ack_actions = engine.on_pdu(
        target_assoc,
        2,
        InboundPdu::HandoverRequestAcknowledge {
            source_mme_ue_id: mme_ue_id,
            target_enb_ue_id,
            admitted_erabs: vec![],
            target_to_source_container: vec![],
        },
        &mut sink,
    );
    assert!(ack_actions.iter().any(|a| matches!(a, EngineAction::ArmTimer { .. })));
    // The MME-UE-ID is not yet re-bound to the target reference.
    assert!(engine.registry.lookup_by_enb_id(target_assoc, target_enb_ue_id).unwrap().mme_ue_id.is_none());

    let notify_actions = engine.on_pdu(
        target_assoc,
        2,
        InboundPdu::HandoverNotify {
            target_enb_ue_id,
            tai: tai(),
            ecgi: mme_s1ap_core::pdu::Ecgi { plmn: tai().plmn, cell_id: 7 },
        },
        &mut sink,
    );
    assert!(notify_actions.iter().any(|a| matches!(a, EngineAction::CancelTimer { .. })));
    assert!(engine.registry.lookup_by_mme_id(mme_ue_id).unwrap().owning_assoc == target_assoc);
    assert!(engine.registry.lookup_by_enb_id(source_assoc, source_enb_ue_id).is_none());
}

#[test]
fn esm_deactivation_gives_up_after_configured_retries() {
    let mut config = McConfig::default();
    config.esm_deactivate_max_retries = 2;
    let mut engine = Engine::new(config);
    let mme_ue_id = MmeUeS1apId::new(5).unwrap();

    let initial = engine.initiate_bearer_deactivation(mme_ue_id, 3, 6, 5, 1, true, vec![0xAB]);
    assert!(initial.iter().any(|a| matches!(a, EngineAction::SendNasPdu { .. })));

    // max=2: first expiry retransmits (counter -> 1), second expiry reaches
    // the bound (counter -> 2) and gives up.
    let retry = engine.on_bearer_deactivation_timeout(mme_ue_id, 6);
    assert!(retry.iter().any(|a| matches!(a, EngineAction::SendNasPdu { .. })));

    let give_up = engine.on_bearer_deactivation_timeout(mme_ue_id, 6);
    assert!(give_up
        .iter()
        .any(|a| matches!(a, EngineAction::Upward(UpwardEvent::DedicatedBearerDeactivationComplete { .. }))));
}

#[test]
fn error_indication_without_mme_ue_id_is_logged_not_forwarded() {
    let reg = mme_s1ap_core::registry::PeerRegistry::new();
    let actions = mme_s1ap_core::engine::handover::on_error_indication(
        &reg,
        None,
        None,
        WireCause::Nas(NasCause::Unspecified),
    );
    assert_eq!(actions.len(), 1);
    assert!(matches!(actions[0], EngineAction::Upward(UpwardEvent::Ignored { .. })));
}

#[test]
fn error_indication_for_unknown_mme_ue_id_is_dropped() {
    let reg = mme_s1ap_core::registry::PeerRegistry::new();
    let unknown = MmeUeS1apId::new(42).unwrap();
    let actions = mme_s1ap_core::engine::handover::on_error_indication(
        &reg,
        Some(unknown),
        None,
        WireCause::Nas(NasCause::Unspecified),
    );
    assert_eq!(actions.len(), 1);
    assert!(matches!(actions[0], EngineAction::Upward(UpwardEvent::Ignored { .. })));
}

#[test]
fn error_indication_for_known_ue_is_forwarded() {
    let mut engine = engine_with_served_tai();
    let mut sink = FakeSink::default();
    let assoc = AssocId(1);

    engine.on_new_peer(assoc, 8, 8).unwrap();
    engine.on_pdu(
        assoc,
        0,
        InboundPdu::S1SetupRequest {
            enb_id: EnbId::macro_id(0x1234),
            enb_name: Some("enb-1".to_string()),
            default_paging_drx: 0,
            supported_tas: vec![tai()],
        },
        &mut sink,
    );
    let enb_ue_id = EnbUeS1apId::new(1).unwrap();
    let mme_ue_id = attached_mme_ue_id(&mut engine, &mut sink, assoc, enb_ue_id);

    let actions = mme_s1ap_core::engine::handover::on_error_indication(
        &engine.registry,
        Some(mme_ue_id),
        Some(enb_ue_id),
        WireCause::Nas(NasCause::Unspecified),
    );
    assert!(actions.iter().any(
        |a| matches!(a, EngineAction::Upward(UpwardEvent::ErrorIndicationReceived { mme_ue_id: id, .. }) if *id == mme_ue_id)
    ));
}

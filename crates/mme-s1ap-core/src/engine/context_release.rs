//! UE Context Release procedure, MME- and peer-initiated (spec.md §4.3).

use crate::action::{Actions, EngineAction, TimerKind};
use crate::cause::ReleaseCause;
use crate::config::McConfig;
use crate::error::{McError, McResult};
use crate::events::UpwardEvent;
use crate::ids::{AssocId, EnbUeS1apId, MmeUeS1apId};
use crate::pdu::OutboundPdu;
use crate::registry::PeerRegistry;
use crate::ue::S1apState;

/// MME-app asks to release a UE context. Three outcomes depending on
/// `cause` (spec.md §4.3):
///
/// - `ImplicitRelease`: the reference is removed immediately, no PDU sent.
/// - fire-and-forget causes (`SystemFailure`, `NetworkError`): the Command
///   is sent but the reference is removed immediately, not held pending
///   ReleaseComplete.
/// - everything else: the Command is sent, the reference moves to
///   WAITING-RELEASE-COMPLETE, and a release timer is armed.
pub fn request_release(
    registry: &mut PeerRegistry,
    config: &McConfig,
    mme_ue_id: MmeUeS1apId,
    cause: ReleaseCause,
) -> McResult<Actions> {
    let ue = registry
        .lookup_by_mme_id(mme_ue_id)
        .ok_or(McError::IdentityMismatch("no UE reference for this MME-UE-ID"))?;
    let assoc = ue.owning_assoc;
    let enb_ue_id = ue.enb_ue_id;
    let outbound_stream = ue.outbound_stream;

    if cause.is_immediate() {
        let mut actions = Vec::new();
        if let Some((_, cancels)) = registry.remove_ue(assoc, enb_ue_id) {
            actions.extend(cancels);
        }
        actions.push(EngineAction::Upward(UpwardEvent::ReleaseComplete { mme_ue_id, cause: None }));
        return Ok(actions);
    }

    let wire_cause = cause.to_wire();
    let mut actions = vec![EngineAction::SendPdu {
        assoc,
        stream: outbound_stream,
        pdu: OutboundPdu::UeContextReleaseCommand { mme_ue_id, enb_ue_id, cause: wire_cause },
    }];

    if cause.is_fire_and_forget() {
        if let Some((_, cancels)) = registry.remove_ue(assoc, enb_ue_id) {
            actions.extend(cancels);
        }
        actions.push(EngineAction::Upward(UpwardEvent::ReleaseComplete {
            mme_ue_id,
            cause: Some(wire_cause),
        }));
        return Ok(actions);
    }

    let handle = registry.next_timer_handle();
    if let Some(ue) = registry.lookup_by_mme_id_mut(mme_ue_id) {
        ue.state = S1apState::WaitingReleaseComplete;
        ue.release_timer = Some(handle);
        ue.last_release_cause = Some(cause);
    }
    actions.push(EngineAction::ArmTimer { handle, kind: TimerKind::Release, duration: config.release_timer });
    Ok(actions)
}

/// Peer-initiated UeContextReleaseRequest: MME-app decides whether and how
/// to release; the engine just forwards it upward unchanged (spec.md §4.3).
pub fn on_ue_context_release_request(
    mme_ue_id: MmeUeS1apId,
    enb_ue_id: EnbUeS1apId,
    cause: crate::cause::WireCause,
) -> Actions {
    vec![EngineAction::Upward(UpwardEvent::UeContextReleaseRequested { mme_ue_id, enb_ue_id, cause })]
}

/// Peer's UeContextReleaseComplete: completes the three-way handshake
/// started by `request_release`.
pub fn on_ue_context_release_complete(
    registry: &mut PeerRegistry,
    assoc: AssocId,
    mme_ue_id: MmeUeS1apId,
    enb_ue_id: EnbUeS1apId,
) -> Actions {
    let Some((ue, cancels)) = registry.remove_ue(assoc, enb_ue_id) else {
        return vec![EngineAction::Upward(UpwardEvent::Ignored {
            reason: "UeContextReleaseComplete for unknown UE reference",
        })];
    };
    let cause = ue.last_release_cause.map(ReleaseCause::to_wire);
    let mut actions = cancels;
    actions.push(EngineAction::Upward(UpwardEvent::ReleaseComplete { mme_ue_id, cause }));
    actions
}

/// Release-timer expiry (spec.md §4.3 edge case): the peer never answered.
/// The reference is dropped locally and MME-app is told regardless.
pub fn on_release_timer_expiry(registry: &mut PeerRegistry, mme_ue_id: MmeUeS1apId) -> Actions {
    let Some((ue, mut cancels)) = registry.remove_ue_by_mme_id(mme_ue_id) else {
        return Vec::new();
    };
    cancels.push(EngineAction::Upward(UpwardEvent::ReleaseComplete {
        mme_ue_id,
        cause: ue.last_release_cause.map(ReleaseCause::to_wire),
    }));
    cancels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::enb::EnbState;

    fn setup() -> (PeerRegistry, McConfig, AssocId, MmeUeS1apId, EnbUeS1apId) {
        let mut reg = PeerRegistry::new();
        let assoc = AssocId(1);
        reg.on_new_peer(assoc, 4, 4).unwrap();
        reg.get_mut(assoc).unwrap().state = EnbState::Ready;
        let enb_ue_id = EnbUeS1apId::new(1).unwrap();
        let mme_ue_id = MmeUeS1apId::new(1).unwrap();
        reg.new_ue(assoc, enb_ue_id, Some(mme_ue_id), 1).unwrap();
        (reg, McConfig::default(), assoc, mme_ue_id, enb_ue_id)
    }

    #[test]
    fn implicit_release_removes_without_sending() {
        let (mut reg, config, _assoc, mme_ue_id, _enb_ue_id) = setup();
        let actions = request_release(&mut reg, &config, mme_ue_id, ReleaseCause::ImplicitRelease).unwrap();
        assert!(actions.iter().all(|a| !matches!(a, EngineAction::SendPdu { .. })));
        assert!(reg.lookup_by_mme_id(mme_ue_id).is_none());
    }

    #[test]
    fn normal_release_waits_for_complete() {
        let (mut reg, config, _assoc, mme_ue_id, _enb_ue_id) = setup();
        let actions = request_release(&mut reg, &config, mme_ue_id, ReleaseCause::NasDetach).unwrap();
        assert!(actions.iter().any(|a| matches!(a, EngineAction::SendPdu { .. })));
        assert!(actions.iter().any(|a| matches!(a, EngineAction::ArmTimer { .. })));
        assert_eq!(reg.lookup_by_mme_id(mme_ue_id).unwrap().state, S1apState::WaitingReleaseComplete);
    }

    #[test]
    fn fire_and_forget_release_removes_immediately() {
        let (mut reg, config, _assoc, mme_ue_id, _enb_ue_id) = setup();
        let actions = request_release(&mut reg, &config, mme_ue_id, ReleaseCause::SystemFailure).unwrap();
        assert!(actions.iter().any(|a| matches!(a, EngineAction::SendPdu { .. })));
        assert!(reg.lookup_by_mme_id(mme_ue_id).is_none());
    }

    #[test]
    fn release_complete_cancels_timer_and_removes() {
        let (mut reg, config, assoc, mme_ue_id, enb_ue_id) = setup();
        request_release(&mut reg, &config, mme_ue_id, ReleaseCause::NasDetach).unwrap();
        let actions = on_ue_context_release_complete(&mut reg, assoc, mme_ue_id, enb_ue_id);
        assert!(actions.iter().any(|a| matches!(a, EngineAction::CancelTimer { .. })));
        assert!(reg.lookup_by_mme_id(mme_ue_id).is_none());
    }
}

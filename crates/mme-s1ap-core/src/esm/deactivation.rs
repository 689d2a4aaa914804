//! The ESM Dedicated Bearer Deactivation procedure (spec.md §4.4): a
//! retransmission-bounded request/accept exchange run over NAS, piggybacked
//! on S1AP transport rather than carried by it.
//!
//! Every other NAS procedure is out of scope; this one is kept in the core
//! because its retry/give-up state machine is exactly the kind of bounded,
//! testable logic the rest of the engine already models as pure state
//! transitions plus `Actions`.

use crate::action::{Actions, EngineAction, TimerHandle, TimerKind};
use crate::config::McConfig;
use crate::events::UpwardEvent;
use crate::ids::MmeUeS1apId;
use crate::registry::PeerRegistry;
use std::collections::HashMap;

#[derive(Debug)]
struct EsmTransaction {
    /// Procedure Transaction Identifier, carried on every retransmission.
    pti: u8,
    linked_bearer_id: u8,
    pdn_connection_id: u8,
    retry_count: u8,
    timer: TimerHandle,
    /// The encoded Deactivate EPS Bearer Context Request, kept verbatim so a
    /// retransmission never needs to re-derive it.
    last_request: Vec<u8>,
}

/// Per-(UE, bearer) deactivation transactions in flight. Keyed by
/// `(mme_ue_id, eps_bearer_id)` since EPS bearer IDs are only unique within
/// a UE.
#[derive(Debug, Default)]
pub struct EsmDeactivationTable {
    transactions: HashMap<(MmeUeS1apId, u8), EsmTransaction>,
}

impl EsmDeactivationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_progress(&self, mme_ue_id: MmeUeS1apId, eps_bearer_id: u8) -> bool {
        self.transactions.contains_key(&(mme_ue_id, eps_bearer_id))
    }

    /// Starts a deactivation (spec.md §4.4 step 1). Two guards run before a
    /// transaction is created: the idempotency guard (spec.md §4.4
    /// supplement) drops a second request for a bearer already being
    /// deactivated rather than restarting the retry counter or sending a
    /// duplicate; the PDN-existence guard fails the procedure immediately,
    /// without ever arming a timer, when the caller reports no such PDN
    /// connection (the PDN/bearer-context store itself is an external
    /// collaborator — see `pdn_connection_exists`).
    #[allow(clippy::too_many_arguments)]
    pub fn initiate(
        &mut self,
        registry: &mut PeerRegistry,
        config: &McConfig,
        mme_ue_id: MmeUeS1apId,
        pti: u8,
        eps_bearer_id: u8,
        linked_bearer_id: u8,
        pdn_connection_id: u8,
        pdn_connection_exists: bool,
        nas_pdu: Vec<u8>,
    ) -> Actions {
        if self.is_in_progress(mme_ue_id, eps_bearer_id) {
            log::debug!(
                "deactivation already in progress for UE {mme_ue_id} bearer {eps_bearer_id}, ignoring re-initiation"
            );
            return Vec::new();
        }

        if !pdn_connection_exists {
            log::warn!(
                "deactivation for UE {mme_ue_id} bearer {eps_bearer_id} rejected: PDN connection {pdn_connection_id} does not exist"
            );
            return vec![EngineAction::Upward(UpwardEvent::BearerDeactivationRejected { mme_ue_id, eps_bearer_id })];
        }

        let handle = registry.next_timer_handle();
        self.transactions.insert(
            (mme_ue_id, eps_bearer_id),
            EsmTransaction {
                pti,
                linked_bearer_id,
                pdn_connection_id,
                retry_count: 0,
                timer: handle,
                last_request: nas_pdu.clone(),
            },
        );
        vec![
            EngineAction::SendNasPdu { mme_ue_id, nas_pdu },
            EngineAction::ArmTimer { handle, kind: TimerKind::EsmDeactivate, duration: config.esm_deactivate_timer },
        ]
    }

    /// Deactivate EPS Bearer Context Accept arrived: the transaction is
    /// closed successfully.
    pub fn on_accept(&mut self, mme_ue_id: MmeUeS1apId, eps_bearer_id: u8) -> Actions {
        let Some(txn) = self.transactions.remove(&(mme_ue_id, eps_bearer_id)) else {
            return vec![EngineAction::Upward(UpwardEvent::Ignored {
                reason: "Deactivate EPS Bearer Context Accept for no in-progress transaction",
            })];
        };
        vec![
            EngineAction::CancelTimer { handle: txn.timer },
            EngineAction::Upward(UpwardEvent::DedicatedBearerDeactivationComplete { mme_ue_id, eps_bearer_id }),
        ]
    }

    /// T3495 expiry: retransmit up to `esm_deactivate_max_retries` times,
    /// then give up and release the bearer locally (spec.md §4.4).
    pub fn on_timer_expiry(
        &mut self,
        registry: &mut PeerRegistry,
        config: &McConfig,
        mme_ue_id: MmeUeS1apId,
        eps_bearer_id: u8,
    ) -> Actions {
        let Some(txn) = self.transactions.get_mut(&(mme_ue_id, eps_bearer_id)) else {
            return Vec::new();
        };

        txn.retry_count += 1;
        if txn.retry_count >= config.esm_deactivate_max_retries {
            self.transactions.remove(&(mme_ue_id, eps_bearer_id));
            return vec![EngineAction::Upward(UpwardEvent::DedicatedBearerDeactivationComplete {
                mme_ue_id,
                eps_bearer_id,
            })];
        }

        let handle = registry.next_timer_handle();
        let nas_pdu = txn.last_request.clone();
        txn.timer = handle;
        vec![
            EngineAction::SendNasPdu { mme_ue_id, nas_pdu },
            EngineAction::ArmTimer { handle, kind: TimerKind::EsmDeactivate, duration: config.esm_deactivate_timer },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ue_id(v: u32) -> MmeUeS1apId {
        MmeUeS1apId::new(v).unwrap()
    }

    #[test]
    fn reinitiation_while_in_progress_is_ignored() {
        let mut table = EsmDeactivationTable::new();
        let mut registry = PeerRegistry::new();
        let config = McConfig::default();
        let first = table.initiate(&mut registry, &config, ue_id(1), 3, 5, 4, 1, true, vec![0x01]);
        assert_eq!(first.len(), 2);
        let second = table.initiate(&mut registry, &config, ue_id(1), 3, 5, 4, 1, true, vec![0x02]);
        assert!(second.is_empty());
    }

    #[test]
    fn initiation_with_no_such_pdn_is_rejected_without_arming_a_timer() {
        let mut table = EsmDeactivationTable::new();
        let mut registry = PeerRegistry::new();
        let config = McConfig::default();
        let actions = table.initiate(&mut registry, &config, ue_id(1), 3, 5, 4, 1, false, vec![0x01]);
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            actions[0],
            EngineAction::Upward(UpwardEvent::BearerDeactivationRejected { .. })
        ));
        assert!(!table.is_in_progress(ue_id(1), 5));
    }

    #[test]
    fn accept_cancels_timer_and_completes() {
        let mut table = EsmDeactivationTable::new();
        let mut registry = PeerRegistry::new();
        let config = McConfig::default();
        table.initiate(&mut registry, &config, ue_id(1), 3, 5, 4, 1, true, vec![0x01]);
        let actions = table.on_accept(ue_id(1), 5);
        assert!(actions.iter().any(|a| matches!(a, EngineAction::CancelTimer { .. })));
        assert!(actions
            .iter()
            .any(|a| matches!(a, EngineAction::Upward(UpwardEvent::DedicatedBearerDeactivationComplete { .. }))));
        assert!(!table.is_in_progress(ue_id(1), 5));
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut table = EsmDeactivationTable::new();
        let mut registry = PeerRegistry::new();
        let mut config = McConfig::default();
        config.esm_deactivate_max_retries = 2;
        table.initiate(&mut registry, &config, ue_id(1), 3, 5, 4, 1, true, vec![0x01]);

        // max=2: the first expiry retransmits (counter -> 1); the second
        // expiry reaches the bound (counter -> 2) and gives up without a
        // further retransmission.
        let first_retry = table.on_timer_expiry(&mut registry, &config, ue_id(1), 5);
        assert!(first_retry.iter().any(|a| matches!(a, EngineAction::SendNasPdu { .. })));

        let give_up = table.on_timer_expiry(&mut registry, &config, ue_id(1), 5);
        assert_eq!(give_up.len(), 1);
        assert!(matches!(
            give_up[0],
            EngineAction::Upward(UpwardEvent::DedicatedBearerDeactivationComplete { .. })
        ));
        assert!(!table.is_in_progress(ue_id(1), 5));
    }

    /// Pins the default `esm_deactivate_max_retries = 5` path (spec.md §4.4,
    /// §8 scenario 6): exactly four retransmissions (counter 1..4), then the
    /// fifth expiry gives up without retransmitting again.
    #[test]
    fn default_config_retransmits_exactly_four_times_then_gives_up_on_fifth_expiry() {
        let mut table = EsmDeactivationTable::new();
        let mut registry = PeerRegistry::new();
        let config = McConfig::default();
        assert_eq!(config.esm_deactivate_max_retries, 5);
        table.initiate(&mut registry, &config, ue_id(1), 3, 6, 5, 1, true, vec![0xAB]);

        for attempt in 1..=4 {
            let retry = table.on_timer_expiry(&mut registry, &config, ue_id(1), 6);
            assert!(
                retry.iter().any(|a| matches!(a, EngineAction::SendNasPdu { .. })),
                "expected a retransmission on expiry {attempt}"
            );
            assert!(table.is_in_progress(ue_id(1), 6));
        }

        let fifth_expiry = table.on_timer_expiry(&mut registry, &config, ue_id(1), 6);
        assert!(fifth_expiry.iter().all(|a| !matches!(a, EngineAction::SendNasPdu { .. })));
        assert_eq!(fifth_expiry.len(), 1);
        assert!(matches!(
            fifth_expiry[0],
            EngineAction::Upward(UpwardEvent::DedicatedBearerDeactivationComplete { .. })
        ));
        assert!(!table.is_in_progress(ue_id(1), 6));
    }
}

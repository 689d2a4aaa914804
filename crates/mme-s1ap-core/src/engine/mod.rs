//! The S1AP procedure engine: dispatches decoded PDUs and timer expiries to
//! the per-procedure handlers in the sibling modules, against the shared
//! `PeerRegistry` state (spec.md §4).

pub mod context_release;
pub mod handover;
pub mod initial_context;
pub mod setup;

use crate::action::Actions;
use crate::cause::ReleaseCause;
use crate::config::McConfig;
use crate::error::McResult;
use crate::esm::EsmDeactivationTable;
use crate::events::MmeAppSink;
use crate::ids::{AssocId, MmeUeS1apId};
use crate::pdu::InboundPdu;
use crate::registry::PeerRegistry;

/// Everything the S1AP side of the MME control plane needs: the peer/UE
/// state, the ESM deactivation transaction table, and the configuration
/// it is validated against. Owns no I/O of its own — every operation
/// returns `Actions` for the runtime to carry out.
#[derive(Debug, Default)]
pub struct Engine {
    pub registry: PeerRegistry,
    pub esm: EsmDeactivationTable,
    pub config: McConfig,
}

impl Engine {
    pub fn new(config: McConfig) -> Self {
        Self { registry: PeerRegistry::new(), esm: EsmDeactivationTable::new(), config }
    }

    pub fn on_new_peer(&mut self, assoc: AssocId, in_streams: u16, out_streams: u16) -> McResult<()> {
        self.registry.on_new_peer(assoc, in_streams, out_streams)
    }

    pub fn on_peer_disconnect(&mut self, assoc: AssocId) -> Actions {
        self.registry
            .on_peer_disconnect(assoc, false, self.config.disconnect_batch_size)
    }

    /// Dispatches one decoded inbound PDU (spec.md §4: the per-procedure
    /// match below is the dispatch table keyed by message identity, since
    /// `InboundPdu`'s variants already encode procedure code and direction).
    pub fn on_pdu(
        &mut self,
        assoc: AssocId,
        stream: u16,
        pdu: InboundPdu,
        sink: &mut dyn MmeAppSink,
    ) -> Actions {
        match pdu {
            InboundPdu::S1SetupRequest { enb_id, enb_name, default_paging_drx, supported_tas } => {
                setup::on_s1_setup_request(
                    &mut self.registry,
                    &self.config,
                    assoc,
                    stream,
                    enb_id,
                    enb_name,
                    default_paging_drx,
                    supported_tas,
                )
            }
            InboundPdu::Reset { kind } => setup::on_reset(&self.registry, assoc, kind),
            InboundPdu::ErrorIndication { mme_ue_id, enb_ue_id, cause } => {
                handover::on_error_indication(&self.registry, mme_ue_id, enb_ue_id, cause)
            }
            InboundPdu::InitialUeMessage { enb_ue_id, nas_pdu } => {
                initial_context::on_initial_ue_message(&mut self.registry, sink, assoc, enb_ue_id, stream, nas_pdu)
            }
            InboundPdu::UeContextReleaseRequest { mme_ue_id, enb_ue_id, cause } => {
                context_release::on_ue_context_release_request(mme_ue_id, enb_ue_id, cause)
            }
            InboundPdu::UeContextReleaseComplete { mme_ue_id, enb_ue_id } => {
                context_release::on_ue_context_release_complete(&mut self.registry, assoc, mme_ue_id, enb_ue_id)
            }
            InboundPdu::InitialContextSetupResponse { mme_ue_id, enb_ue_id, admitted_erabs } => {
                initial_context::on_initial_context_setup_response(&mut self.registry, mme_ue_id, enb_ue_id, admitted_erabs)
            }
            InboundPdu::InitialContextSetupFailure { mme_ue_id, enb_ue_id, cause } => {
                initial_context::on_initial_context_setup_failure(mme_ue_id, enb_ue_id, cause)
            }
            InboundPdu::PathSwitchRequest { source_mme_ue_id, enb_ue_id, erabs_to_switch } => {
                handover::on_path_switch_request(&mut self.registry, assoc, enb_ue_id, stream, source_mme_ue_id, erabs_to_switch)
            }
            InboundPdu::HandoverRequired {
                mme_ue_id,
                enb_ue_id,
                target_enb_id,
                selected_tai,
                cause,
                source_to_target_container,
            } => handover::on_handover_required(
                &mut self.registry,
                assoc,
                mme_ue_id,
                enb_ue_id,
                target_enb_id,
                selected_tai,
                cause,
                source_to_target_container,
            ),
            InboundPdu::HandoverCancel { mme_ue_id, enb_ue_id } => {
                handover::on_handover_cancel(&mut self.registry, assoc, mme_ue_id, enb_ue_id)
            }
            InboundPdu::EnbStatusTransfer { mme_ue_id, bearers, .. } => {
                handover::on_enb_status_transfer(mme_ue_id, bearers)
            }
            InboundPdu::HandoverRequestAcknowledge {
                source_mme_ue_id,
                target_enb_ue_id,
                admitted_erabs,
                target_to_source_container,
            } => handover::on_handover_request_acknowledge(
                &mut self.registry,
                &self.config,
                assoc,
                source_mme_ue_id,
                target_enb_ue_id,
                stream,
                admitted_erabs,
                target_to_source_container,
            ),
            InboundPdu::HandoverFailure { source_mme_ue_id, cause } => {
                handover::on_handover_failure(source_mme_ue_id, cause)
            }
            InboundPdu::HandoverNotify { target_enb_ue_id, tai, ecgi } => {
                handover::on_handover_notify(&mut self.registry, assoc, target_enb_ue_id, tai, ecgi)
            }
        }
    }

    /// MME-app answers a `ResetRequested` event: tears down the
    /// acknowledged UEs and replies ResetAcknowledge (spec.md §4.1).
    pub fn on_reset_ack(
        &mut self,
        assoc: AssocId,
        acknowledged: Vec<(MmeUeS1apId, crate::ids::EnbUeS1apId)>,
    ) -> Actions {
        setup::on_reset_ack(&mut self.registry, assoc, acknowledged)
    }

    /// MME-app-initiated UE context release (spec.md §4.3).
    pub fn request_release(&mut self, mme_ue_id: MmeUeS1apId, cause: ReleaseCause) -> McResult<Actions> {
        context_release::request_release(&mut self.registry, &self.config, mme_ue_id, cause)
    }

    /// Release-timer expiry. The runtime routes an expired `TimerHandle`
    /// back to this call once it knows the handle was armed as `Release`.
    pub fn on_release_timer_expiry(&mut self, mme_ue_id: MmeUeS1apId) -> Actions {
        context_release::on_release_timer_expiry(&mut self.registry, mme_ue_id)
    }

    /// Handover-completion timer expiry: HandoverNotify never arrived.
    pub fn on_handover_completion_timeout(&mut self, mme_ue_id: MmeUeS1apId) -> Actions {
        use crate::events::{UpwardCause, UpwardEvent};
        if let Some((assoc, enb_ue_id)) = self.registry.find_staged_handover_by_mme_id(mme_ue_id) {
            self.registry.discard_staged_handover(assoc, enb_ue_id);
            self.registry.remove_ue(assoc, enb_ue_id);
        }
        vec![crate::action::EngineAction::Upward(UpwardEvent::HandoverFailure {
            source_mme_ue_id: mme_ue_id,
            cause: UpwardCause::HandoverFailed,
        })]
    }

    /// Starts the ESM Dedicated Bearer Deactivation procedure for one
    /// bearer (spec.md §4.4). `nas_pdu` is the already-encoded Deactivate
    /// EPS Bearer Context Request; NAS encoding is out of scope here just
    /// as S1AP encoding is (see `crate::pdu::PduEncoder`). Whether the named
    /// PDN connection still exists is likewise decided by the MME-app's
    /// bearer-context store, not by this crate; it is passed in as
    /// `pdn_connection_exists`.
    #[allow(clippy::too_many_arguments)]
    pub fn initiate_bearer_deactivation(
        &mut self,
        mme_ue_id: MmeUeS1apId,
        pti: u8,
        eps_bearer_id: u8,
        linked_bearer_id: u8,
        pdn_connection_id: u8,
        pdn_connection_exists: bool,
        nas_pdu: Vec<u8>,
    ) -> Actions {
        self.esm.initiate(
            &mut self.registry,
            &self.config,
            mme_ue_id,
            pti,
            eps_bearer_id,
            linked_bearer_id,
            pdn_connection_id,
            pdn_connection_exists,
            nas_pdu,
        )
    }

    /// Deactivate EPS Bearer Context Accept arrived from the UE.
    pub fn on_bearer_deactivation_accept(&mut self, mme_ue_id: MmeUeS1apId, eps_bearer_id: u8) -> Actions {
        self.esm.on_accept(mme_ue_id, eps_bearer_id)
    }

    /// T3495 expiry for an in-progress bearer deactivation.
    pub fn on_bearer_deactivation_timeout(&mut self, mme_ue_id: MmeUeS1apId, eps_bearer_id: u8) -> Actions {
        self.esm.on_timer_expiry(&mut self.registry, &self.config, mme_ue_id, eps_bearer_id)
    }
}

//! The S1AP task: a `tokio::task::spawn`ed loop built around
//! `tokio::select!`, owning one `Engine`, one inbound mailbox from the
//! transport, one command mailbox from the MME-app, and the `TimerWheel`.
//!
//! Grounded on `powerlink_rs_monitor::server::handle_socket`
//! (`crates/powerlink-rs-monitor/src/server.rs`) — the one place in the
//! teacher's workspace with a `tokio::select!` loop juggling an inbound
//! channel, an outbound channel, and a termination condition. Generalized
//! here to three branches (transport events, MME-app commands, timer
//! expiries) instead of two.

use crate::config::ConfigHandle;
use crate::timer::TimerWheel;
use crate::transport::{NasChannel, PduDecoder, Transport, TransportEvent};
use mme_s1ap_core::cause::ReleaseCause;
use mme_s1ap_core::ids::{AssocId, MmeUeS1apId};
use mme_s1ap_core::{Engine, EngineAction, MmeAppSink, OutboundPdu, PduEncoder, TimerHandle, TimerKind, UpwardEvent};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Cross-task requests from the MME-app into the S1AP task (spec.md §5's
/// "cross-task requests"), the command-side counterpart to the `Transport`
/// inbox.
#[derive(Debug)]
pub enum EngineCommand {
    RequestRelease {
        mme_ue_id: MmeUeS1apId,
        cause: ReleaseCause,
    },
    ResetAck {
        assoc: AssocId,
        acknowledged: Vec<(MmeUeS1apId, mme_s1ap_core::ids::EnbUeS1apId)>,
    },
    InitiateBearerDeactivation {
        mme_ue_id: MmeUeS1apId,
        pti: u8,
        eps_bearer_id: u8,
        linked_bearer_id: u8,
        pdn_connection_id: u8,
        pdn_connection_exists: bool,
        nas_pdu: Vec<u8>,
    },
    BearerDeactivationAccept {
        mme_ue_id: MmeUeS1apId,
        eps_bearer_id: u8,
    },
}

/// Which entity an armed `TimerHandle` belongs to, so its expiry can be
/// routed back into the right `Engine` method. The core hands back only the
/// bare handle on expiry ("the handle alone is enough to route an expiry
/// back to the right entity" per `action.rs`); this table is how the runtime
/// keeps that promise, built from the same call context that produced the
/// `ArmTimer` action in the first place.
#[derive(Debug, Clone, Copy)]
enum TimerContext {
    Release { mme_ue_id: MmeUeS1apId },
    HandoverCompletion { mme_ue_id: MmeUeS1apId },
    EsmDeactivate { mme_ue_id: MmeUeS1apId, eps_bearer_id: u8 },
}

/// The upward sink handed to `Engine::on_pdu`: forwards every `UpwardEvent`
/// to the MME-app's mailbox and allocates fresh MME-UE-IDs from a wrapping
/// counter. Grounded on `SdoClientManager::get_next_tid`
/// (`crates/powerlink-rs/src/sdo/client_manager.rs`) for the
/// wrap-and-skip-zero counter idiom, and on the "synchronous call, not a
/// mailbox round trip" Open Question resolution recorded in
/// `mme_s1ap_core::events::MmeAppSink`.
pub struct MailboxSink {
    upward_tx: mpsc::Sender<UpwardEvent>,
    next_mme_ue_id: u32,
}

impl MailboxSink {
    pub fn new(upward_tx: mpsc::Sender<UpwardEvent>) -> Self {
        Self { upward_tx, next_mme_ue_id: 0 }
    }
}

impl MmeAppSink for MailboxSink {
    fn notify(&mut self, event: UpwardEvent) {
        if let Err(e) = self.upward_tx.try_send(event) {
            log::warn!("upward mailbox full or closed, dropping event: {e}");
        }
    }

    fn allocate_mme_ue_id(&mut self) -> MmeUeS1apId {
        loop {
            self.next_mme_ue_id = self.next_mme_ue_id.wrapping_add(1);
            if self.next_mme_ue_id == 0 {
                continue;
            }
            if let Ok(id) = MmeUeS1apId::new(self.next_mme_ue_id) {
                return id;
            }
            // 24-bit overflow: wrap back to 1 rather than panic.
            self.next_mme_ue_id = 0;
        }
    }
}

/// Owns the `Engine` and the side tables (`TimerWheel`, timer-context map)
/// the runtime needs to turn `EngineAction`s into real effects.
pub struct S1apTask<T, D, N, E> {
    engine: Engine,
    config: ConfigHandle,
    transport: T,
    decoder: D,
    nas: N,
    encoder: E,
    timers: TimerWheel,
    timer_contexts: HashMap<TimerHandle, TimerContext>,
    sink: MailboxSink,
}

impl<T, D, N, E> S1apTask<T, D, N, E>
where
    T: Transport,
    D: PduDecoder,
    N: NasChannel,
    E: PduEncoder,
    E::Error: std::fmt::Display,
{
    pub fn new(config: ConfigHandle, transport: T, decoder: D, nas: N, encoder: E, sink: MailboxSink) -> Self {
        let engine = Engine::new(config.load().as_ref().clone());
        Self {
            engine,
            config,
            transport,
            decoder,
            nas,
            encoder,
            timers: TimerWheel::new(),
            timer_contexts: HashMap::new(),
            sink,
        }
    }

    /// The main loop: drains the transport inbox, the MME-app command
    /// inbox, and the timer wheel, feeding each into `Engine` and executing
    /// the resulting `Actions`. Runs until both inboxes close.
    pub async fn run(
        mut self,
        mut transport_rx: mpsc::Receiver<TransportEvent>,
        mut command_rx: mpsc::Receiver<EngineCommand>,
    ) {
        loop {
            tokio::select! {
                event = transport_rx.recv() => {
                    match event {
                        Some(event) => self.handle_transport_event(event),
                        None => {
                            log::info!("transport inbox closed, shutting down S1AP task");
                            break;
                        }
                    }
                }
                command = command_rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => {
                            log::info!("command inbox closed, shutting down S1AP task");
                            break;
                        }
                    }
                }
                handle = self.timers.next_expired() => {
                    self.handle_timer_expiry(handle);
                }
            }
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::NewAssociation { assoc, in_streams, out_streams } => {
                if let Err(e) = self.engine.on_new_peer(assoc, in_streams, out_streams) {
                    log::warn!("rejecting new association {assoc:?}: {e}");
                }
            }
            TransportEvent::AssociationClosed { assoc } => {
                let actions = self.engine.on_peer_disconnect(assoc);
                self.run_actions(actions, None);
            }
            TransportEvent::Inbound { assoc, stream, bytes } => match self.decoder.decode(&bytes) {
                Ok(pdu) => {
                    // HandoverRequestAcknowledge is the one inbound PDU that
                    // arms a timer (the handover-completion timer) directly
                    // from `Engine::on_pdu` rather than from a command; every
                    // other `ArmTimer` action originates from `handle_command`
                    // below, which already knows its own context.
                    let ctx = match &pdu {
                        mme_s1ap_core::InboundPdu::HandoverRequestAcknowledge { source_mme_ue_id, .. } => {
                            Some(TimerContext::HandoverCompletion { mme_ue_id: *source_mme_ue_id })
                        }
                        _ => None,
                    };
                    let actions = self.engine.on_pdu(assoc, stream, pdu, &mut self.sink);
                    self.run_actions(actions, ctx);
                }
                Err(e) => log::warn!("dropping undecodable PDU from {assoc:?}/{stream}: {e}"),
            },
        }
    }

    fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::RequestRelease { mme_ue_id, cause } => match self.engine.request_release(mme_ue_id, cause)
            {
                Ok(actions) => self.run_actions(actions, Some(TimerContext::Release { mme_ue_id })),
                Err(e) => log::warn!("release request for {mme_ue_id} rejected: {e}"),
            },
            EngineCommand::ResetAck { assoc, acknowledged } => {
                let actions = self.engine.on_reset_ack(assoc, acknowledged);
                self.run_actions(actions, None);
            }
            EngineCommand::InitiateBearerDeactivation {
                mme_ue_id,
                pti,
                eps_bearer_id,
                linked_bearer_id,
                pdn_connection_id,
                pdn_connection_exists,
                nas_pdu,
            } => {
                let actions = self.engine.initiate_bearer_deactivation(
                    mme_ue_id,
                    pti,
                    eps_bearer_id,
                    linked_bearer_id,
                    pdn_connection_id,
                    pdn_connection_exists,
                    nas_pdu,
                );
                self.run_actions(actions, Some(TimerContext::EsmDeactivate { mme_ue_id, eps_bearer_id }));
            }
            EngineCommand::BearerDeactivationAccept { mme_ue_id, eps_bearer_id } => {
                let actions = self.engine.on_bearer_deactivation_accept(mme_ue_id, eps_bearer_id);
                self.run_actions(actions, None);
            }
        }
    }

    fn handle_timer_expiry(&mut self, handle: TimerHandle) {
        let Some(ctx) = self.timer_contexts.remove(&handle) else {
            log::debug!("timer {handle} expired with no recorded context, ignoring (already handled)");
            return;
        };
        let actions = match ctx {
            TimerContext::Release { mme_ue_id } => self.engine.on_release_timer_expiry(mme_ue_id),
            TimerContext::HandoverCompletion { mme_ue_id } => self.engine.on_handover_completion_timeout(mme_ue_id),
            TimerContext::EsmDeactivate { mme_ue_id, eps_bearer_id } => {
                let config = self.config.load();
                let actions = self.engine.on_bearer_deactivation_timeout(mme_ue_id, eps_bearer_id);
                drop(config);
                // A retry re-arms under the same (mme_ue_id, eps_bearer_id)
                // context; record it again below via run_actions.
                self.run_actions(actions, Some(TimerContext::EsmDeactivate { mme_ue_id, eps_bearer_id }));
                return;
            }
        };
        self.run_actions(actions, None);
    }

    /// Executes a batch of `Actions` against the transport, NAS channel, and
    /// timer wheel. `ctx` is the entity context to attach to any `ArmTimer`
    /// action in this batch — every caller already knows which UE/procedure
    /// it just invoked the engine for (spec.md §5's "timer setup returns a
    /// handle without blocking" realized concretely here).
    fn run_actions(&mut self, actions: Vec<EngineAction>, ctx: Option<TimerContext>) {
        for action in actions {
            match action {
                EngineAction::SendPdu { assoc, stream, pdu } => self.send_pdu(assoc, stream, pdu),
                EngineAction::Upward(event) => self.sink.notify(event),
                EngineAction::SendNasPdu { mme_ue_id, nas_pdu } => {
                    if let Err(e) = self.nas.send_nas(mme_ue_id, nas_pdu) {
                        log::warn!("failed to send NAS PDU to {mme_ue_id}: {e}");
                    }
                }
                EngineAction::ArmTimer { handle, kind, duration } => {
                    self.timers.arm(handle, duration);
                    if let Some(ctx) = ctx {
                        debug_assert!(matches!(
                            (kind, ctx),
                            (TimerKind::Release, TimerContext::Release { .. })
                                | (TimerKind::HandoverCompletion, TimerContext::HandoverCompletion { .. })
                                | (TimerKind::EsmDeactivate, TimerContext::EsmDeactivate { .. })
                        ));
                        self.timer_contexts.insert(handle, ctx);
                    } else {
                        log::warn!("armed timer {handle} ({kind:?}) with no recorded context, expiry will be dropped");
                    }
                }
                EngineAction::CancelTimer { handle } => {
                    self.timers.cancel(handle);
                    self.timer_contexts.remove(&handle);
                }
            }
        }
    }

    fn send_pdu(&mut self, assoc: AssocId, stream: u16, pdu: OutboundPdu) {
        match self.encoder.encode(&pdu) {
            Ok(bytes) => {
                if let Err(e) = self.transport.send(assoc, stream, bytes) {
                    log::warn!("failed to send PDU to {assoc:?}/{stream}: {e}");
                }
            }
            Err(e) => log::error!("failed to encode outbound PDU for {assoc:?}/{stream}: {e}"),
        }
    }
}

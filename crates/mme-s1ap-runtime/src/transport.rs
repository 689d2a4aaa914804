//! The external collaborators named but not implemented by spec.md §6: the
//! reliable multi-stream transport (SCTP), the ASN.1 PDU decoder, and the
//! NAS delivery channel used by the ESM deactivation procedure.
//!
//! Narrow trait boundaries, grounded on `powerlink_rs::NetworkInterface`
//! (`crates/powerlink-rs/src/hal.rs`) — the teacher's HAL keeps the concrete
//! I/O (raw Ethernet frames over `pnet`, in `powerlink-io-linux`) behind a
//! `send_frame`/`receive_frame` trait the core never sees. Here the concrete
//! SCTP/ASN.1/NAS implementations are themselves out of scope (spec.md §1);
//! only the trait boundaries are implemented by this crate.

use mme_s1ap_core::ids::{AssocId, MmeUeS1apId};

/// The reliable, multi-stream, ordered transport to a peer eNodeB (SCTP in
/// production). `send` is fire-and-forget from the engine's point of view:
/// the engine never awaits delivery, matching spec.md §5's "the core never
/// blocks on user-code except for mailbox enqueue".
pub trait Transport: Send + Sync {
    fn send(&self, assoc: AssocId, stream: u16, bytes: Vec<u8>) -> Result<(), TransportError>;
}

#[derive(Debug)]
pub enum TransportError {
    UnknownAssociation(AssocId),
    Closed,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAssociation(assoc) => write!(f, "no live association {assoc:?}"),
            Self::Closed => write!(f, "transport is closed"),
        }
    }
}

impl std::error::Error for TransportError {}

/// An event surfaced by the transport: a new association, one closing, or
/// raw bytes arriving on one of its streams. The S1AP task translates the
/// last case into a decoded `InboundPdu` via `PduDecoder` before handing it
/// to `Engine::on_pdu`.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    NewAssociation { assoc: AssocId, in_streams: u16, out_streams: u16 },
    AssociationClosed { assoc: AssocId },
    Inbound { assoc: AssocId, stream: u16, bytes: Vec<u8> },
}

/// The ASN.1 S1AP decoder, external per spec.md §6 (the encoder-side
/// counterpart, `PduEncoder`, lives in `mme_s1ap_core::pdu` since it is
/// invoked directly from procedure logic rather than from the task loop).
pub trait PduDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<mme_s1ap_core::InboundPdu, DecodeError>;
}

#[derive(Debug)]
pub struct DecodeError(pub String);

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDU decode error: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}

/// NAS message delivery to/from the UE, used only by the ESM deactivation
/// procedure (spec.md §1: NAS security and the rest of NAS signalling are
/// out of scope). PDUs are already decoded/encoded; this crate never parses
/// NAS itself.
pub trait NasChannel: Send + Sync {
    fn send_nas(&self, mme_ue_id: MmeUeS1apId, nas_pdu: Vec<u8>) -> Result<(), NasChannelError>;
}

#[derive(Debug)]
pub enum NasChannelError {
    UnknownUe(MmeUeS1apId),
}

impl std::fmt::Display for NasChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUe(id) => write!(f, "no NAS path for MME-UE-ID {id}"),
        }
    }
}

impl std::error::Error for NasChannelError {}

//! Platform-agnostic S1AP peer/UE state management and ESM dedicated-bearer
//! deactivation for an LTE MME control plane.
//!
//! This crate owns no sockets, no timers, and no ASN.1 codec: every
//! operation is a pure function from decoded input plus current state to a
//! list of [`action::EngineAction`]s, mirroring the platform-agnostic
//! core/HAL split used throughout this stack. The runtime crate is where
//! those actions turn into SCTP sends, armed `tokio` timers, and encoded
//! bytes.

// --- Foundation modules ---
pub mod cause;
pub mod config;
pub mod error;
pub mod ids;

// --- State ---
pub mod registry;
pub mod ue;

// --- Boundary types ---
pub mod action;
pub mod events;
pub mod pdu;

// --- Procedure logic ---
pub mod engine;
pub mod esm;

// --- Top-level exports ---
pub use action::{Actions, EngineAction, TimerHandle, TimerKind};
pub use cause::{ReleaseCause, WireCause};
pub use config::McConfig;
pub use engine::Engine;
pub use error::{McError, McResult};
pub use events::{MmeAppSink, UpwardEvent};
pub use ids::{AssocId, EnbId, EnbUeS1apId, Gummei, MmeUeS1apId, PlmnId, Tai};
pub use pdu::{InboundPdu, OutboundPdu, PduEncoder};

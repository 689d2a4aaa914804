//! Tokio task/mailbox fabric binding `mme_s1ap_core::Engine` to a concrete
//! SCTP transport, ASN.1 codec, and NAS channel.
//!
//! The core crate is deliberately platform-agnostic (no sockets, no
//! `tokio::time`, no `serde`); this crate is the one place in the workspace
//! that owns those concerns, the way `powerlink-io-linux` is the one place
//! the teacher's workspace owns the raw `pnet` Ethernet channel behind
//! `powerlink_rs::NetworkInterface`.

pub mod config;
pub mod task;
pub mod timer;
pub mod transport;

pub use config::{ConfigHandle, ConfigError};
pub use task::{EngineCommand, MailboxSink, S1apTask};
pub use transport::{DecodeError, NasChannel, NasChannelError, PduDecoder, Transport, TransportError, TransportEvent};

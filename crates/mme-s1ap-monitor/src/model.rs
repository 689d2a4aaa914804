//! The serializable snapshot types passed from the S1AP task to the
//! monitor's broadcast channel and on to connected WebSocket clients.

use serde::Serialize;

/// A serializable snapshot of a single eNodeB's state, as seen by the
/// Peer Registry.
#[derive(Serialize, Clone, Debug)]
pub struct EnbSnapshot {
    pub assoc_id: u32,
    pub enb_name: Option<String>,
    pub state: String,
    pub connected_ue_count: usize,
}

/// A serializable snapshot of a single UE reference, mirroring the fields
/// the UE Reference Store tracks per attached UE.
#[derive(Serialize, Clone, Debug)]
pub struct UeSnapshot {
    pub mme_ue_id: u32,
    pub enb_ue_id: u32,
    pub assoc_id: u32,
    pub state: String,
}

/// A serializable snapshot of one in-progress ESM dedicated bearer
/// deactivation transaction.
#[derive(Serialize, Clone, Debug)]
pub struct EsmSnapshot {
    pub mme_ue_id: u32,
    pub eps_bearer_id: u8,
    pub pti: u8,
    pub retry_count: u8,
}

/// Counters mirroring the statistics block the Peer Registry keeps for the
/// S1 Setup overload check, surfaced here purely for observability.
#[derive(Serialize, Clone, Debug, Default)]
pub struct RegistryCounters {
    pub connected_enb_count: usize,
    pub max_connected_enbs: usize,
    pub attached_ue_count: usize,
}

/// The full data packet broadcast from the S1AP task to the monitor: a
/// complete snapshot of the control plane's state for a given tick.
#[derive(Serialize, Clone, Debug)]
pub struct DiagnosticSnapshot {
    /// All known eNodeBs and their current states.
    pub enbs: Vec<EnbSnapshot>,
    /// All attached UEs and their current S1AP states.
    pub ues: Vec<UeSnapshot>,
    /// All in-progress ESM dedicated bearer deactivation transactions.
    pub esm_transactions: Vec<EsmSnapshot>,
    /// Registry-wide counters (overload/admission bookkeeping).
    pub counters: RegistryCounters,
}

//! Typed, already-decoded S1AP PDU payloads.
//!
//! The ASN.1 grammar itself is out of scope (spec.md §1): by the time a PDU
//! reaches the engine it has already been through the external decoder, and
//! by the time the engine is done the result goes back out through the
//! external `PduEncoder`. These types are the narrow boundary between the
//! two: plain Rust data, no bit-packing beyond the identity sub-fields in
//! `crate::ids` that the spec calls out as core business.

use crate::cause::WireCause;
use crate::ids::{EnbId, EnbUeS1apId, Gummei, MmeUeS1apId, Tai};

/// E-RAB admitted by the eNodeB (InitialContextSetupResponse,
/// HandoverRequestAcknowledge admitted list, PathSwitchRequest list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedErab {
    pub erab_id: u8,
    /// GTP TEID, already in network byte order as received.
    pub gtp_teid: u32,
    pub transport_layer_address: Vec<u8>,
}

/// PDCP COUNT value: Hyper Frame Number + PDCP Sequence Number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdcpCount {
    pub hfn: u32,
    pub sn: u32,
}

/// One entry of the Bearers-Subject-To-Status-Transfer list carried on
/// ENBStatusTransfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerStatusTransferItem {
    pub erab_id: u8,
    pub uplink_count: PdcpCount,
    pub downlink_count: PdcpCount,
    pub uplink_receive_status: Option<Vec<u8>>,
}

/// E-UTRAN Cell Global Identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ecgi {
    pub plmn: crate::ids::PlmnId,
    pub cell_id: u32,
}

/// Full vs. partial NMT-style reset scope (spec.md §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetKind {
    Full,
    Partial(Vec<(MmeUeS1apId, EnbUeS1apId)>),
}

/// Inbound, already-decoded PDUs the engine dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPdu {
    S1SetupRequest {
        enb_id: EnbId,
        enb_name: Option<String>,
        default_paging_drx: u8,
        supported_tas: Vec<Tai>,
    },
    Reset {
        kind: ResetKind,
    },
    ErrorIndication {
        mme_ue_id: Option<MmeUeS1apId>,
        enb_ue_id: Option<EnbUeS1apId>,
        cause: WireCause,
    },
    InitialUeMessage {
        enb_ue_id: EnbUeS1apId,
        nas_pdu: Vec<u8>,
    },
    UeContextReleaseRequest {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        cause: WireCause,
    },
    UeContextReleaseComplete {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
    },
    InitialContextSetupResponse {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        admitted_erabs: Vec<AdmittedErab>,
    },
    InitialContextSetupFailure {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        cause: WireCause,
    },
    PathSwitchRequest {
        source_mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        erabs_to_switch: Vec<AdmittedErab>,
    },
    HandoverRequired {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        target_enb_id: EnbId,
        selected_tai: Tai,
        cause: WireCause,
        source_to_target_container: Vec<u8>,
    },
    HandoverCancel {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
    },
    EnbStatusTransfer {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        bearers: Vec<BearerStatusTransferItem>,
    },
    HandoverRequestAcknowledge {
        source_mme_ue_id: MmeUeS1apId,
        target_enb_ue_id: EnbUeS1apId,
        admitted_erabs: Vec<AdmittedErab>,
        target_to_source_container: Vec<u8>,
    },
    HandoverFailure {
        source_mme_ue_id: MmeUeS1apId,
        cause: WireCause,
    },
    HandoverNotify {
        target_enb_ue_id: EnbUeS1apId,
        tai: Tai,
        ecgi: Ecgi,
    },
}

/// Outbound PDUs the engine asks the runtime to encode and send.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundPdu {
    S1SetupResponse {
        served_gummeis: Vec<Gummei>,
        relative_mme_capacity: u8,
    },
    S1SetupFailure {
        cause: WireCause,
        time_to_wait: Option<std::time::Duration>,
    },
    ResetAcknowledge {
        acknowledged: Vec<(MmeUeS1apId, EnbUeS1apId)>,
    },
    UeContextReleaseCommand {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        cause: WireCause,
    },
    PathSwitchRequestFailure {
        source_mme_ue_id: MmeUeS1apId,
        cause: WireCause,
    },
    PathSwitchRequestAcknowledge {
        mme_ue_id: MmeUeS1apId,
        enb_ue_id: EnbUeS1apId,
        switched_erabs: Vec<AdmittedErab>,
    },
}

/// The external ASN.1 encoder, consumed through this narrow interface
/// (spec.md §1, §6). The core never touches bytes itself.
pub trait PduEncoder {
    type Error;

    fn encode(&self, pdu: &OutboundPdu) -> Result<Vec<u8>, Self::Error>;
}

//! The eNodeB descriptor (spec.md §3) and its UE table.

use crate::ids::{EnbId, EnbUeS1apId, Tai};
use crate::ue::UeReference;
use std::collections::BTreeMap;

/// Lifecycle state of an eNodeB descriptor (spec.md §3, §4.3 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnbState {
    Init,
    Resetting,
    Ready,
    Shutdown,
}

/// One connected (or connecting) eNodeB.
///
/// Per the re-architecture note in spec.md §9, the UE table is owned here
/// by value — keyed by the stable eNB-assigned UE ID — rather than the
/// source's pointer-heavy cyclic list. A `UeReference` never holds a
/// pointer back to this struct; it only remembers the owning association
/// identifier, which the engine uses to look the descriptor back up.
#[derive(Debug)]
pub struct EnbDescriptor {
    pub enb_id: Option<EnbId>,
    pub name: Option<String>,
    pub default_paging_drx: Option<u8>,
    pub supported_tas: Vec<Tai>,
    pub in_streams: u16,
    pub out_streams: u16,
    /// Next outbound stream to assign to a newly attached UE; wraps to 1
    /// (never 0 — that stream is reserved for non-UE-associated signalling)
    /// when it reaches `in_streams`.
    pub next_outbound_stream: u16,
    pub state: EnbState,
    pub ues: BTreeMap<EnbUeS1apId, UeReference>,
}

impl EnbDescriptor {
    pub fn new(in_streams: u16, out_streams: u16) -> Self {
        Self {
            enb_id: None,
            name: None,
            default_paging_drx: None,
            supported_tas: Vec::new(),
            in_streams,
            out_streams,
            next_outbound_stream: 1,
            state: EnbState::Init,
            ues: BTreeMap::new(),
        }
    }

    /// Assigns and advances the outbound-stream cursor (spec.md §4.2): each
    /// attach consumes `next_outbound_stream`, then the cursor advances,
    /// wrapping from `in_streams - 1` back to `1`, never to `0`.
    pub fn assign_outbound_stream(&mut self) -> u16 {
        let assigned = self.next_outbound_stream;
        self.next_outbound_stream = if self.next_outbound_stream + 1 >= self.in_streams {
            1
        } else {
            self.next_outbound_stream + 1
        };
        assigned
    }

    pub fn is_ready(&self) -> bool {
        self.state == EnbState::Ready
    }

    /// A descriptor with no UEs left under SHUTDOWN/RESETTING can be
    /// released immediately (spec.md §3 invariant).
    pub fn is_releasable(&self) -> bool {
        matches!(self.state, EnbState::Shutdown | EnbState::Resetting) && self.ues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_stream_wraps_to_one_never_zero() {
        let mut enb = EnbDescriptor::new(3, 3);
        assert_eq!(enb.assign_outbound_stream(), 1);
        assert_eq!(enb.assign_outbound_stream(), 2);
        // in_streams == 3, so the cursor wraps back to 1 instead of reaching 3.
        assert_eq!(enb.assign_outbound_stream(), 1);
    }

    #[test]
    fn releasable_only_when_empty_and_terminal() {
        let mut enb = EnbDescriptor::new(8, 8);
        enb.state = EnbState::Shutdown;
        assert!(enb.is_releasable());
        enb.state = EnbState::Ready;
        assert!(!enb.is_releasable());
    }
}

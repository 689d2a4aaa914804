pub mod enb;

use crate::action::{EngineAction, TimerHandle};
use crate::error::{McError, McResult};
use crate::ids::{AssocId, EnbUeS1apId, MmeUeS1apId};
use crate::ue::{S1apState, UeReference};
use enb::{EnbDescriptor, EnbState};
use std::collections::{BTreeMap, HashMap};

/// Owns every connected eNodeB's descriptor (spec.md §4.1 Peer Registry) and
/// the cross-eNodeB MME-UE-ID index needed by the UE Reference Store
/// (spec.md §4.2) — the two components share one struct because the UE
/// table each descriptor owns by value is where the "store" actually lives.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    enbs: BTreeMap<AssocId, EnbDescriptor>,
    mme_index: HashMap<MmeUeS1apId, (AssocId, EnbUeS1apId)>,
    /// Target-side UE references created from a HandoverRequestAcknowledge
    /// are left unbound (spec.md §9 dual-identity note) until the matching
    /// HandoverNotify arrives; this is where the already-known MME-UE-ID
    /// waits in the meantime.
    pending_handovers: HashMap<(AssocId, EnbUeS1apId), MmeUeS1apId>,
    next_timer_handle: TimerHandle,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            enbs: BTreeMap::new(),
            mme_index: HashMap::new(),
            pending_handovers: HashMap::new(),
            next_timer_handle: 1,
        }
    }

    /// Stages the known MME-UE-ID for a freshly created target-side UE
    /// reference, without yet publishing it in the `mme_index`.
    pub fn stage_handover_target(
        &mut self,
        target_assoc: AssocId,
        target_enb_ue_id: EnbUeS1apId,
        mme_ue_id: MmeUeS1apId,
    ) {
        self.pending_handovers
            .insert((target_assoc, target_enb_ue_id), mme_ue_id);
    }

    /// HandoverNotify confirmation: promotes a staged target-side reference
    /// to fully bound, returning the MME-UE-ID it was staged with.
    pub fn complete_handover_target(
        &mut self,
        target_assoc: AssocId,
        target_enb_ue_id: EnbUeS1apId,
    ) -> Option<MmeUeS1apId> {
        let mme_ue_id = self
            .pending_handovers
            .remove(&(target_assoc, target_enb_ue_id))?;
        self.bind_mme_ue_id(target_assoc, target_enb_ue_id, mme_ue_id).ok()?;
        Some(mme_ue_id)
    }

    /// Drops a staged target-side reference without binding it (handover
    /// cancelled or failed before Notify arrived).
    pub fn discard_staged_handover(&mut self, target_assoc: AssocId, target_enb_ue_id: EnbUeS1apId) {
        self.pending_handovers.remove(&(target_assoc, target_enb_ue_id));
    }

    /// Finds the staged target reference for an already-known MME-UE-ID —
    /// used when the handover-completion timer expires, since the runtime
    /// always knows the source MME-UE-ID but not the target's eNB-UE-ID.
    pub fn find_staged_handover_by_mme_id(&self, mme_ue_id: MmeUeS1apId) -> Option<(AssocId, EnbUeS1apId)> {
        self.pending_handovers
            .iter()
            .find(|(_, staged)| **staged == mme_ue_id)
            .map(|(key, _)| *key)
    }

    /// Hands out a fresh timer handle (sentinel-style, never `0`), per the
    /// in-struct timer-handle idiom kept abstract by spec.md §9.
    pub fn next_timer_handle(&mut self) -> TimerHandle {
        let handle = self.next_timer_handle;
        self.next_timer_handle += 1;
        handle
    }

    pub fn get(&self, assoc: AssocId) -> Option<&EnbDescriptor> {
        self.enbs.get(&assoc)
    }

    pub fn get_mut(&mut self, assoc: AssocId) -> Option<&mut EnbDescriptor> {
        self.enbs.get_mut(&assoc)
    }

    pub fn enb_descriptors(&self) -> impl Iterator<Item = (&AssocId, &EnbDescriptor)> {
        self.enbs.iter()
    }

    /// Number of descriptors not already shut down — used for the
    /// max-connected-eNodeBs overload check (spec.md §4.1).
    pub fn connected_count(&self) -> usize {
        self.enbs
            .values()
            .filter(|e| e.state != EnbState::Shutdown)
            .count()
    }

    pub fn enb_id_in_use_by_other(&self, assoc: AssocId, enb_id: crate::ids::EnbId) -> bool {
        self.enbs
            .iter()
            .any(|(a, e)| *a != assoc && e.enb_id == Some(enb_id))
    }

    /// `on-new-peer` (spec.md §4.1): creates a fresh descriptor for a new
    /// transport association, rejecting re-use of an association still in
    /// RESETTING or SHUTDOWN.
    pub fn on_new_peer(
        &mut self,
        assoc: AssocId,
        in_streams: u16,
        out_streams: u16,
    ) -> McResult<()> {
        if let Some(existing) = self.enbs.get(&assoc) {
            if matches!(existing.state, EnbState::Shutdown | EnbState::Resetting) {
                return Err(McError::ProtocolViolation(
                    "association already has a descriptor in RESETTING or SHUTDOWN",
                ));
            }
        }
        self.enbs.insert(assoc, EnbDescriptor::new(in_streams, out_streams));
        Ok(())
    }

    /// `on-peer-disconnect` (spec.md §4.1). Returns the deregistration
    /// actions the engine should emit upward, one per batch of UEs.
    pub fn on_peer_disconnect(
        &mut self,
        assoc: AssocId,
        is_reset: bool,
        batch_size: usize,
    ) -> Vec<EngineAction> {
        let Some(enb) = self.enbs.get_mut(&assoc) else {
            return Vec::new();
        };

        if enb.ues.is_empty() {
            if is_reset {
                enb.state = EnbState::Resetting;
            } else {
                self.enbs.remove(&assoc);
            }
            return Vec::new();
        }

        let mut actions = Vec::new();
        let ue_ids: Vec<MmeUeS1apId> = enb
            .ues
            .values()
            .filter_map(|ue| ue.mme_ue_id)
            .collect();
        for batch in ue_ids.chunks(batch_size.max(1)) {
            actions.push(EngineAction::Upward(crate::events::UpwardEvent::Deregistered {
                assoc,
                ue_ids: batch.to_vec(),
            }));
        }
        for id in &ue_ids {
            self.mme_index.remove(id);
        }
        self.enbs.remove(&assoc);
        actions
    }

    // --- UE Reference Store (spec.md §4.2) ---

    pub fn lookup_by_mme_id(&self, id: MmeUeS1apId) -> Option<&UeReference> {
        let (assoc, enb_ue_id) = self.mme_index.get(&id)?;
        self.enbs.get(assoc)?.ues.get(enb_ue_id)
    }

    pub fn lookup_by_mme_id_mut(&mut self, id: MmeUeS1apId) -> Option<&mut UeReference> {
        let (assoc, enb_ue_id) = *self.mme_index.get(&id)?;
        self.enbs.get_mut(&assoc)?.ues.get_mut(&enb_ue_id)
    }

    pub fn lookup_by_enb_id(&self, assoc: AssocId, enb_ue_id: EnbUeS1apId) -> Option<&UeReference> {
        self.enbs.get(&assoc)?.ues.get(&enb_ue_id)
    }

    pub fn lookup_by_enb_id_mut(
        &mut self,
        assoc: AssocId,
        enb_ue_id: EnbUeS1apId,
    ) -> Option<&mut UeReference> {
        self.enbs.get_mut(&assoc)?.ues.get_mut(&enb_ue_id)
    }

    /// `new-ue` (spec.md §4.2): allocates a UE reference under `assoc`,
    /// assigning stream counters from the descriptor's cursor. Rejects if
    /// the descriptor is missing or not READY.
    pub fn new_ue(
        &mut self,
        assoc: AssocId,
        enb_ue_id: EnbUeS1apId,
        mme_ue_id: Option<MmeUeS1apId>,
        inbound_stream: u16,
    ) -> McResult<&mut UeReference> {
        let enb = self
            .enbs
            .get_mut(&assoc)
            .ok_or(McError::ResourceExhausted("no descriptor for association"))?;
        if !enb.is_ready() {
            return Err(McError::ResourceExhausted("descriptor is not READY"));
        }
        let outbound_stream = enb.assign_outbound_stream();
        let ue = UeReference::new(assoc, enb_ue_id, mme_ue_id, inbound_stream, outbound_stream);
        enb.ues.insert(enb_ue_id, ue);
        if let Some(id) = mme_ue_id {
            self.mme_index.insert(id, (assoc, enb_ue_id));
        }
        Ok(enb.ues.get_mut(&enb_ue_id).expect("just inserted"))
    }

    /// Binds a previously unbound UE reference to an MME-UE-ID — the
    /// HandoverNotify-time adoption the dual-identity design note requires
    /// (spec.md §9).
    pub fn bind_mme_ue_id(
        &mut self,
        assoc: AssocId,
        enb_ue_id: EnbUeS1apId,
        mme_ue_id: MmeUeS1apId,
    ) -> McResult<()> {
        let ue = self
            .enbs
            .get_mut(&assoc)
            .and_then(|e| e.ues.get_mut(&enb_ue_id))
            .ok_or(McError::IdentityMismatch("no such UE reference to bind"))?;
        ue.mme_ue_id = Some(mme_ue_id);
        self.mme_index.insert(mme_ue_id, (assoc, enb_ue_id));
        Ok(())
    }

    /// `remove` (spec.md §4.2): detaches and returns the UE reference,
    /// along with the actions needed to cancel any timers it still held.
    pub fn remove_ue(
        &mut self,
        assoc: AssocId,
        enb_ue_id: EnbUeS1apId,
    ) -> Option<(UeReference, Vec<EngineAction>)> {
        let enb = self.enbs.get_mut(&assoc)?;
        let ue = enb.ues.remove(&enb_ue_id)?;
        if let Some(id) = ue.mme_ue_id {
            self.mme_index.remove(&id);
        }
        let mut actions = Vec::new();
        if let Some(handle) = ue.release_timer {
            actions.push(EngineAction::CancelTimer { handle });
        }
        if let Some(handle) = ue.handover_timer {
            actions.push(EngineAction::CancelTimer { handle });
        }
        Some((ue, actions))
    }

    pub fn remove_ue_by_mme_id(
        &mut self,
        id: MmeUeS1apId,
    ) -> Option<(UeReference, Vec<EngineAction>)> {
        let (assoc, enb_ue_id) = *self.mme_index.get(&id)?;
        self.remove_ue(assoc, enb_ue_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_descriptor(reg: &mut PeerRegistry, assoc: AssocId) {
        reg.on_new_peer(assoc, 8, 8).unwrap();
        reg.get_mut(assoc).unwrap().state = EnbState::Ready;
    }

    #[test]
    fn lookup_by_mme_id_and_enb_id_agree() {
        let mut reg = PeerRegistry::new();
        let assoc = AssocId(1);
        ready_descriptor(&mut reg, assoc);
        let enb_ue_id = EnbUeS1apId::new(0x11).unwrap();
        let mme_ue_id = MmeUeS1apId::new(42).unwrap();
        reg.new_ue(assoc, enb_ue_id, Some(mme_ue_id), 3).unwrap();

        let by_mme = reg.lookup_by_mme_id(mme_ue_id).unwrap();
        let by_enb = reg.lookup_by_enb_id(assoc, enb_ue_id).unwrap();
        assert_eq!(by_mme.enb_ue_id, by_enb.enb_ue_id);
        assert_eq!(by_mme.mme_ue_id, by_enb.mme_ue_id);
    }

    #[test]
    fn new_ue_rejected_when_descriptor_not_ready() {
        let mut reg = PeerRegistry::new();
        let assoc = AssocId(1);
        reg.on_new_peer(assoc, 8, 8).unwrap();
        let enb_ue_id = EnbUeS1apId::new(1).unwrap();
        assert!(reg.new_ue(assoc, enb_ue_id, None, 1).is_err());
    }

    #[test]
    fn remove_ue_drops_mme_index_entry() {
        let mut reg = PeerRegistry::new();
        let assoc = AssocId(1);
        ready_descriptor(&mut reg, assoc);
        let enb_ue_id = EnbUeS1apId::new(1).unwrap();
        let mme_ue_id = MmeUeS1apId::new(7).unwrap();
        reg.new_ue(assoc, enb_ue_id, Some(mme_ue_id), 1).unwrap();
        reg.remove_ue(assoc, enb_ue_id);
        assert!(reg.lookup_by_mme_id(mme_ue_id).is_none());
    }

    #[test]
    fn disconnect_with_no_ues_removes_descriptor() {
        let mut reg = PeerRegistry::new();
        let assoc = AssocId(1);
        ready_descriptor(&mut reg, assoc);
        let actions = reg.on_peer_disconnect(assoc, false, 256);
        assert!(actions.is_empty());
        assert!(reg.get(assoc).is_none());
    }

    #[test]
    fn disconnect_batches_deregistration_events() {
        let mut reg = PeerRegistry::new();
        let assoc = AssocId(1);
        ready_descriptor(&mut reg, assoc);
        for i in 0..5u32 {
            let enb_ue_id = EnbUeS1apId::new(i).unwrap();
            let mme_ue_id = MmeUeS1apId::new(i).unwrap();
            reg.new_ue(assoc, enb_ue_id, Some(mme_ue_id), 1).unwrap();
        }
        let actions = reg.on_peer_disconnect(assoc, false, 2);
        // 5 UEs batched by 2 => 3 deregistration events (2, 2, 1).
        assert_eq!(actions.len(), 3);
        assert!(reg.get(assoc).is_none());
    }
}

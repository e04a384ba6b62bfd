//! Graph nodes and their slot-declaration state machine.

use std::collections::HashMap;

use log::trace;

use super::error::{GenError, GenResult};
use super::node_compiler::{NodeEmitter, NodeKind};
use super::slots::{Slot, SlotSet, reconcile_slots};

/// Lifecycle of a node within the generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    Uninitialized,
    SlotsDeclared,
    CodeEmitted,
}

#[derive(Clone, Debug)]
pub struct MaterialNode {
    id: String,
    kind: NodeKind,
    params: HashMap<String, serde_json::Value>,
    slots: SlotSet,
    state: NodeState,
}

impl MaterialNode {
    pub fn new(
        id: impl Into<String>,
        kind: NodeKind,
        params: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            params,
            slots: SlotSet::new(),
            state: NodeState::Uninitialized,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn emitter(&self) -> &'static dyn NodeEmitter {
        self.kind.emitter()
    }

    pub fn params(&self) -> &HashMap<String, serde_json::Value> {
        &self.params
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    pub fn slots(&self) -> &SlotSet {
        &self.slots
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Declare (or rebuild) the node's slot set.
    ///
    /// Re-declaring is idempotent: the set is reconciled against the
    /// emitter's slots, dropping ids it no longer declares. Code emitted
    /// before a rebuild is stale, so the node goes back to `SlotsDeclared`.
    pub fn declare_slots(&mut self) {
        let desired: Vec<Slot> = self.emitter().slots();
        self.slots = reconcile_slots(&self.slots, &desired);
        self.state = NodeState::SlotsDeclared;
        trace!("node {} declared slots {:?}", self.id, self.slots.ids());
    }

    /// Override the constant default of an input slot.
    pub fn set_slot_value(&mut self, slot_id: u32, values: Vec<f32>) -> GenResult<()> {
        if self.slots.set_constant(slot_id, values) {
            Ok(())
        } else {
            Err(GenError::InvalidParam {
                node_id: self.id.clone(),
                param: format!("slotValues.{slot_id}"),
                reason: "no constant slot with that id and length".to_string(),
            })
        }
    }

    /// Look up a slot referenced by generated code.
    pub fn slot(&self, slot_id: u32) -> GenResult<&Slot> {
        self.slots.get(slot_id).ok_or_else(|| GenError::DanglingSlot {
            node_id: self.id.clone(),
            slot_id,
        })
    }

    pub(crate) fn ensure_declared(&self) -> GenResult<()> {
        if self.state == NodeState::Uninitialized {
            return Err(GenError::SlotsNotDeclared {
                node_id: self.id.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn mark_emitted(&mut self) {
        self.state = NodeState::CodeEmitted;
    }
}

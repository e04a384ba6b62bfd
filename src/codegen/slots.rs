//! Node slots and slot-set reconciliation.

use super::types::{CoordinateSpace, MeshAttribute, ShaderStageCapability, ValueType};
use super::utils::{constant_literal, sanitize_ident};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotDirection {
    Input,
    Output,
}

/// Value an input slot takes when nothing is connected to it.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotDefault {
    Constant(Vec<f32>),
    /// Read a mesh attribute from the stage input struct, e.g. `IN.ObjectSpacePosition`.
    Attribute {
        attribute: MeshAttribute,
        space: CoordinateSpace,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub id: u32,
    pub name: String,
    pub direction: SlotDirection,
    pub value_type: ValueType,
    pub default: SlotDefault,
    pub stage: ShaderStageCapability,
}

impl Slot {
    pub fn input(id: u32, name: &str, value_type: ValueType, default: SlotDefault) -> Self {
        Self {
            id,
            name: name.to_string(),
            direction: SlotDirection::Input,
            value_type,
            default,
            stage: ShaderStageCapability::All,
        }
    }

    /// Output slot defaulting to zero.
    pub fn output(id: u32, name: &str, value_type: ValueType) -> Self {
        Self {
            id,
            name: name.to_string(),
            direction: SlotDirection::Output,
            value_type,
            default: SlotDefault::Constant(vec![0.0; value_type.value_len()]),
            stage: ShaderStageCapability::All,
        }
    }

    pub fn with_stage(mut self, stage: ShaderStageCapability) -> Self {
        self.stage = stage;
        self
    }

    pub fn is_input(&self) -> bool {
        self.direction == SlotDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == SlotDirection::Output
    }

    /// Name used inside generated variable names.
    pub fn shader_output_name(&self) -> String {
        sanitize_ident(&self.name)
    }

    /// Expression used when the slot is unconnected.
    pub fn default_expr(&self) -> String {
        match &self.default {
            SlotDefault::Constant(values) => constant_literal(self.value_type, values),
            SlotDefault::Attribute { attribute, space } => {
                format!("IN.{}{}", space.input_prefix(), attribute.input_suffix())
            }
        }
    }

    fn same_shape(&self, other: &Slot) -> bool {
        self.direction == other.direction && self.value_type == other.value_type
    }
}

/// Ordered set of slots, unique by id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SlotSet {
    slots: Vec<Slot>,
}

impl SlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u32) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.is_output())
    }

    pub fn ids(&self) -> Vec<u32> {
        self.slots.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Replace the constant default of slot `id`. Values of the wrong length
    /// or for attribute-backed slots are rejected.
    pub fn set_constant(&mut self, id: u32, values: Vec<f32>) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        if !matches!(slot.default, SlotDefault::Constant(_)) || values.len() != slot.value_type.value_len() {
            return false;
        }
        slot.default = SlotDefault::Constant(values);
        true
    }
}

/// Build the slot set for `desired`, diffing against `previous`.
///
/// The result holds exactly the desired slots in desired order (first
/// occurrence wins for duplicate ids), so slots whose ids are no longer
/// declared are dropped. A slot that survives with the same direction and
/// type keeps its previous constant value.
pub fn reconcile_slots(previous: &SlotSet, desired: &[Slot]) -> SlotSet {
    let mut slots: Vec<Slot> = Vec::with_capacity(desired.len());
    for want in desired {
        if slots.iter().any(|s| s.id == want.id) {
            continue;
        }
        let mut slot = want.clone();
        if let Some(prev) = previous.get(want.id) {
            let both_constant = matches!(prev.default, SlotDefault::Constant(_))
                && matches!(want.default, SlotDefault::Constant(_));
            if prev.same_shape(want) && both_constant {
                slot.default = prev.default.clone();
            }
        }
        slots.push(slot);
    }
    SlotSet { slots }
}

//! Validated, topologically ordered node graph ready for generation.

use std::collections::HashMap;

use log::debug;

use super::error::{GenError, GenResult};
use super::node::MaterialNode;
use super::node_compiler::NodeKind;
use super::utils::can_convert;
use crate::dsl::GraphDSL;
use crate::graph::topo_sort;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotConnection {
    pub id: String,
    pub from_node: String,
    pub from_slot: u32,
    pub to_node: String,
    pub to_slot: u32,
}

#[derive(Clone, Debug, Default)]
pub struct ShaderGraph {
    /// Dependencies before dependents.
    nodes: Vec<MaterialNode>,
    index_by_id: HashMap<String, usize>,
    connections: Vec<SlotConnection>,
}

impl ShaderGraph {
    /// Build nodes, declare their slots, apply user slot values, check
    /// every connection and order the nodes.
    pub fn from_dsl(dsl: &GraphDSL) -> GenResult<Self> {
        let mut by_id: HashMap<&str, MaterialNode> = HashMap::new();
        for n in &dsl.nodes {
            let kind = NodeKind::from_type_name(&n.node_type)
                .ok_or_else(|| GenError::UnsupportedNodeType(n.node_type.clone()))?;
            let mut node = MaterialNode::new(n.id.clone(), kind, n.params.clone());
            node.declare_slots();
            for (slot_id, values) in &n.slot_values {
                node.set_slot_value(*slot_id, values.clone())?;
            }
            kind.emitter().validate_params(&node)?;
            if by_id.insert(n.id.as_str(), node).is_some() {
                return Err(GenError::DuplicateNode(n.id.clone()));
            }
        }

        let order = topo_sort(dsl)?;

        let mut nodes = Vec::with_capacity(order.len());
        for id in &order {
            let node = by_id
                .remove(id.as_str())
                .ok_or_else(|| GenError::MissingNode(id.clone()))?;
            nodes.push(node);
        }
        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id().to_string(), i))
            .collect();

        let connections = dsl
            .connections
            .iter()
            .map(|c| SlotConnection {
                id: c.id.clone(),
                from_node: c.from.node_id.clone(),
                from_slot: c.from.slot_id,
                to_node: c.to.node_id.clone(),
                to_slot: c.to.slot_id,
            })
            .collect();

        let graph = Self {
            nodes,
            index_by_id,
            connections,
        };
        graph.validate()?;
        debug!(
            "graph '{}': {} nodes, {} connections",
            dsl.metadata.name,
            graph.nodes.len(),
            graph.connections.len()
        );
        Ok(graph)
    }

    /// Check that every connection joins an existing output slot to an
    /// existing, singly-connected input slot of a compatible type.
    pub fn validate(&self) -> GenResult<()> {
        let mut connected_inputs: HashMap<(&str, u32), &str> = HashMap::new();
        for c in &self.connections {
            let invalid = |reason: String| GenError::InvalidConnection {
                connection_id: c.id.clone(),
                reason,
            };
            let from = self
                .node(&c.from_node)
                .ok_or_else(|| GenError::MissingNode(c.from_node.clone()))?;
            let to = self
                .node(&c.to_node)
                .ok_or_else(|| GenError::MissingNode(c.to_node.clone()))?;
            let from_slot = from.slots().get(c.from_slot).ok_or_else(|| {
                invalid(format!("node {} has no slot {}", c.from_node, c.from_slot))
            })?;
            let to_slot = to.slots().get(c.to_slot).ok_or_else(|| {
                invalid(format!("node {} has no slot {}", c.to_node, c.to_slot))
            })?;
            if !from_slot.is_output() {
                return Err(invalid(format!("slot {} of {} is not an output", c.from_slot, c.from_node)));
            }
            if !to_slot.is_input() {
                return Err(invalid(format!("slot {} of {} is not an input", c.to_slot, c.to_node)));
            }
            if !can_convert(from_slot.value_type, to_slot.value_type) {
                return Err(GenError::IncompatibleConnection {
                    connection_id: c.id.clone(),
                    from: from_slot.value_type,
                    to: to_slot.value_type,
                });
            }
            if let Some(other) = connected_inputs.insert((c.to_node.as_str(), c.to_slot), c.id.as_str()) {
                return Err(invalid(format!(
                    "slot {} of {} is already connected by {other}",
                    c.to_slot, c.to_node
                )));
            }
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&MaterialNode> {
        self.index_by_id.get(id).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[MaterialNode] {
        &self.nodes
    }

    pub fn incoming(&self, node_id: &str, slot_id: u32) -> Option<&SlotConnection> {
        self.connections
            .iter()
            .find(|c| c.to_node == node_id && c.to_slot == slot_id)
    }

    pub fn is_connected(&self, node_id: &str, slot_id: u32) -> bool {
        self.incoming(node_id, slot_id).is_some()
    }

    /// Re-declare every node's slots and re-check connections against the
    /// rebuilt slot sets.
    pub fn rebuild_slots(&mut self) -> GenResult<()> {
        for node in &mut self.nodes {
            node.declare_slots();
        }
        self.validate()
    }

    pub(crate) fn mark_emitted(&mut self, index: usize) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.mark_emitted();
        }
    }
}

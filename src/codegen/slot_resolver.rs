//! Maps slot ids to generated variable names and input expressions.

use std::collections::{HashMap, HashSet};

use super::error::{GenError, GenResult};
use super::node::MaterialNode;
use super::shader_graph::ShaderGraph;
use super::slots::SlotDefault;
use super::types::{GenerationMode, TypedExpr};
use super::utils::{convert_expr, sanitize_ident};

/// How an input slot was resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// Output variable of the connected upstream node, converted to the input type.
    Connected(TypedExpr),
    /// Unconnected; the slot's default expression.
    Default(TypedExpr),
    /// Unconnected constant in preview mode; reads a generated property so
    /// the value can change without regenerating.
    PreviewProperty(TypedExpr),
    /// Connected to a node that emitted nothing; the slot default is used.
    UpstreamSkipped {
        upstream_id: String,
        fallback: TypedExpr,
    },
}

impl Resolution {
    pub fn expr(&self) -> &TypedExpr {
        match self {
            Resolution::Connected(e) | Resolution::Default(e) | Resolution::PreviewProperty(e) => e,
            Resolution::UpstreamSkipped { fallback, .. } => fallback,
        }
    }
}

/// Naming state for one generation pass. Never shared between passes.
#[derive(Debug, Default)]
pub struct SlotResolver {
    namespace: Option<String>,
    counter: usize,
    node_names: HashMap<String, String>,
    skipped: HashSet<String>,
}

impl SlotResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver whose variable names start with `_{namespace}_`.
    pub fn with_namespace(namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.map(sanitize_ident),
            ..Self::default()
        }
    }

    /// Variable prefix of a node, e.g. `_LinearBlendSkinning_0`. Assigned the
    /// first time the node is named in this pass.
    pub fn node_variable_name(&mut self, node: &MaterialNode) -> String {
        if let Some(name) = self.node_names.get(node.id()) {
            return name.clone();
        }
        let name = match &self.namespace {
            Some(ns) => format!("_{ns}_{}_{}", node.kind().name(), self.counter),
            None => format!("_{}_{}", node.kind().name(), self.counter),
        };
        self.counter += 1;
        self.node_names.insert(node.id().to_string(), name.clone());
        name
    }

    pub fn variable_name_for_slot(&mut self, node: &MaterialNode, slot_id: u32) -> GenResult<String> {
        let slot_name = node.slot(slot_id)?.shader_output_name();
        let prefix = self.node_variable_name(node);
        Ok(format!("{prefix}_{slot_name}_{slot_id}"))
    }

    /// Record that `node_id` emitted nothing in this pass.
    pub fn mark_skipped(&mut self, node_id: &str) {
        self.skipped.insert(node_id.to_string());
    }

    pub fn is_skipped(&self, node_id: &str) -> bool {
        self.skipped.contains(node_id)
    }

    /// Resolve the expression feeding input `slot_id` of `node`.
    pub fn resolve(
        &mut self,
        graph: &ShaderGraph,
        node: &MaterialNode,
        slot_id: u32,
        mode: GenerationMode,
    ) -> GenResult<Resolution> {
        let slot = node.slot(slot_id)?;
        let default = TypedExpr::new(slot.default_expr(), slot.value_type);

        let Some(conn) = graph.incoming(node.id(), slot_id) else {
            let is_constant = matches!(slot.default, SlotDefault::Constant(_));
            if mode == GenerationMode::Preview && is_constant && slot.value_type.components().is_some() {
                let name = self.variable_name_for_slot(node, slot_id)?;
                return Ok(Resolution::PreviewProperty(TypedExpr::new(name, slot.value_type)));
            }
            return Ok(Resolution::Default(default));
        };

        if self.is_skipped(&conn.from_node) {
            return Ok(Resolution::UpstreamSkipped {
                upstream_id: conn.from_node.clone(),
                fallback: default,
            });
        }

        let upstream = graph
            .node(&conn.from_node)
            .ok_or_else(|| GenError::MissingNode(conn.from_node.clone()))?;
        let upstream_ty = upstream.slot(conn.from_slot)?.value_type;
        let var = self.variable_name_for_slot(upstream, conn.from_slot)?;
        let converted = convert_expr(&TypedExpr::new(var, upstream_ty), slot.value_type).ok_or_else(|| {
            GenError::IncompatibleConnection {
                connection_id: conn.id.clone(),
                from: upstream_ty,
                to: slot.value_type,
            }
        })?;
        Ok(Resolution::Connected(converted))
    }
}

//! Node emitter trait, kind table and the context emitters generate against.

pub mod input_nodes;
pub mod matrix_nodes;
pub mod skinning_nodes;

use super::code_builder::ShaderStringBuilder;
use super::diagnostics::{Diagnostic, DiagnosticCollector};
use super::error::GenResult;
use super::function_registry::FunctionRegistry;
use super::node::MaterialNode;
use super::properties::PropertyCollector;
use super::shader_graph::ShaderGraph;
use super::slot_resolver::{Resolution, SlotResolver};
use super::slots::Slot;
use super::types::{Capability, GenerationMode, GeneratorOptions, ShaderStage};

/// Supported node types. The discriminant indexes [`EMITTERS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    LinearBlendSkinning = 0,
    Vector1 = 1,
    Vector3 = 2,
    MatrixCommon = 3,
}

static EMITTERS: [&dyn NodeEmitter; 4] = [
    &skinning_nodes::LinearBlendSkinningNode,
    &input_nodes::Vector1Node,
    &input_nodes::Vector3Node,
    &matrix_nodes::MatrixCommonNode,
];

impl NodeKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "LinearBlendSkinning" => Some(NodeKind::LinearBlendSkinning),
            "Vector1" => Some(NodeKind::Vector1),
            "Vector3" => Some(NodeKind::Vector3),
            "MatrixCommon" => Some(NodeKind::MatrixCommon),
            _ => None,
        }
    }

    /// Type name, also used as the generated variable prefix.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::LinearBlendSkinning => "LinearBlendSkinning",
            NodeKind::Vector1 => "Vector1",
            NodeKind::Vector3 => "Vector3",
            NodeKind::MatrixCommon => "MatrixCommon",
        }
    }

    pub fn emitter(self) -> &'static dyn NodeEmitter {
        EMITTERS[self as usize]
    }
}

/// Per-kind code generation.
pub trait NodeEmitter: Sync {
    /// The full slot set; declared once and re-declared on rebuild.
    fn slots(&self) -> Vec<Slot>;

    fn validate_params(&self, _node: &MaterialNode) -> GenResult<()> {
        Ok(())
    }

    /// Context features needed beyond what the node's slots imply.
    fn requirements(&self, _node: &MaterialNode, _stage: ShaderStage) -> Vec<Capability> {
        Vec::new()
    }

    fn collect_properties(
        &self,
        _node: &MaterialNode,
        _properties: &mut PropertyCollector,
        _options: &GeneratorOptions,
    ) {
    }

    fn generate_code(
        &self,
        node: &MaterialNode,
        ctx: &mut EmitContext<'_>,
        sb: &mut ShaderStringBuilder,
    ) -> GenResult<()>;

    fn generate_functions(
        &self,
        _node: &MaterialNode,
        _registry: &mut FunctionRegistry,
        _options: &GeneratorOptions,
    ) -> GenResult<()> {
        Ok(())
    }
}

/// What an emitter sees while generating one node's body.
pub struct EmitContext<'a> {
    pub options: &'a GeneratorOptions,
    pub graph: &'a ShaderGraph,
    pub resolver: &'a mut SlotResolver,
    pub diagnostics: &'a mut DiagnosticCollector,
}

impl EmitContext<'_> {
    pub fn mode(&self) -> GenerationMode {
        self.options.mode
    }

    pub fn variable_name_for_slot(&mut self, node: &MaterialNode, slot_id: u32) -> GenResult<String> {
        self.resolver.variable_name_for_slot(node, slot_id)
    }

    /// Expression for input `slot_id`, reporting a diagnostic when its
    /// upstream node was skipped.
    pub fn slot_value(&mut self, node: &MaterialNode, slot_id: u32) -> GenResult<String> {
        let resolution = self
            .resolver
            .resolve(self.graph, node, slot_id, self.options.mode)?;
        if let Resolution::UpstreamSkipped { upstream_id, .. } = &resolution {
            self.diagnostics.report(Diagnostic::UpstreamSkipped {
                node_id: node.id().to_string(),
                slot_id,
                upstream_id: upstream_id.clone(),
            });
        }
        Ok(resolution.expr().expr.clone())
    }
}

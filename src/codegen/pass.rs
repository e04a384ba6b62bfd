//! One generation pass over a shader graph.
//!
//! A pass owns all of its mutable state (function registry, slot naming,
//! properties and diagnostics) so independent passes can run on separate
//! threads. Dropping a pass between nodes abandons it.

use log::{debug, error, trace};

use super::code_builder::ShaderStringBuilder;
use super::diagnostics::{Diagnostic, DiagnosticCollector};
use super::error::{GenError, GenResult};
use super::function_registry::{FunctionRegistry, GeneratedFunction};
use super::node::MaterialNode;
use super::node_compiler::EmitContext;
use super::properties::{PropertyCollector, ShaderProperty};
use super::shader_graph::ShaderGraph;
use super::slot_resolver::SlotResolver;
use super::slots::SlotDefault;
use super::types::{
    Capability, GenerationMode, GeneratorOptions, Requirements, ShaderStage, ShaderStageCapability,
};

/// Token standing in for the float type until the pass finishes.
pub const PRECISION_TOKEN: &str = "$precision";

/// A variable the pass declares at shader scope or reads as a preview property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub node_id: String,
    pub name: String,
}

/// Output of a finished pass.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedFragment {
    /// Helper functions in dependency order.
    pub functions: String,
    /// The same helpers, one entry per name.
    pub helpers: Vec<GeneratedFunction>,
    /// Per-node code in graph order.
    pub body: String,
    pub properties: Vec<ShaderProperty>,
    /// Variable names in declaration order.
    pub declarations: Vec<Declaration>,
    pub diagnostics: Vec<Diagnostic>,
    pub requirements: Requirements,
}

impl GeneratedFragment {
    /// Helpers followed by the body.
    pub fn source(&self) -> String {
        let mut out = String::with_capacity(self.functions.len() + self.body.len());
        out.push_str(&self.functions);
        out.push_str(&self.body);
        out
    }

    /// A fragment with diagnostics must not be handed to the shader compiler.
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub struct GenerationPass {
    options: GeneratorOptions,
    registry: FunctionRegistry,
    resolver: SlotResolver,
    properties: PropertyCollector,
    declarations: Vec<Declaration>,
    diagnostics: DiagnosticCollector,
    body: ShaderStringBuilder,
    requirements: Requirements,
}

impl GenerationPass {
    pub fn new(options: GeneratorOptions) -> Self {
        debug!(
            "generation pass: mode={:?} precision={:?} stage={}",
            options.mode, options.precision, options.stage
        );
        Self {
            registry: FunctionRegistry::new(),
            resolver: SlotResolver::with_namespace(options.namespace.as_deref()),
            options,
            properties: PropertyCollector::new(),
            declarations: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
            body: ShaderStringBuilder::new(),
            requirements: Requirements::default(),
        }
    }

    /// Emit the node at `index` of `graph`. Returns `false` when the node
    /// was skipped because the pass cannot meet its requirements.
    pub fn emit_node(&mut self, graph: &ShaderGraph, index: usize) -> GenResult<bool> {
        let node = graph
            .nodes()
            .get(index)
            .ok_or_else(|| GenError::MissingNode(format!("#{index}")))?;
        node.ensure_declared()?;
        trace!("emitting node {} ({})", node.id(), node.kind().name());

        let (needed, unmet) = self.node_requirements(graph, node);
        if !unmet.is_empty() {
            for capability in unmet {
                self.diagnostics.report(Diagnostic::UnmetRequirement {
                    node_id: node.id().to_string(),
                    capability,
                });
            }
            self.resolver.mark_skipped(node.id());
            return Ok(false);
        }
        for capability in needed {
            self.requirements.insert(capability);
        }

        let emitter = node.emitter();
        emitter.collect_properties(node, &mut self.properties, &self.options);
        {
            let mut ctx = EmitContext {
                options: &self.options,
                graph,
                resolver: &mut self.resolver,
                diagnostics: &mut self.diagnostics,
            };
            emitter
                .generate_code(node, &mut ctx, &mut self.body)
                .inspect_err(|e| log_contract_violation(node, e))?;
        }
        for slot in node.slots().outputs() {
            let name = self.resolver.variable_name_for_slot(node, slot.id)?;
            self.declare(node, name);
        }
        if self.options.mode == GenerationMode::Preview {
            self.collect_preview_properties(graph, node)
                .inspect_err(|e| log_contract_violation(node, e))?;
        }
        emitter.generate_functions(node, &mut self.registry, &self.options)?;
        Ok(true)
    }

    /// Capabilities `node` needs, and those of them this pass cannot provide.
    fn node_requirements(&self, graph: &ShaderGraph, node: &MaterialNode) -> (Vec<Capability>, Vec<Capability>) {
        let stage = self.options.stage;
        let mut needed = node.emitter().requirements(node, stage);

        let mut unmet = Vec::new();
        for slot in node.slots().iter() {
            if !slot.stage.supports(stage) {
                let supported = match slot.stage {
                    ShaderStageCapability::Fragment => ShaderStage::Fragment,
                    _ => ShaderStage::Vertex,
                };
                let capability = Capability::Stage(supported);
                if !unmet.contains(&capability) {
                    unmet.push(capability);
                }
            }
        }

        // Inputs fed by a skipped node read their attribute default too.
        for slot in node.slots().inputs() {
            if let SlotDefault::Attribute { attribute, space } = &slot.default {
                let reads_default = graph
                    .incoming(node.id(), slot.id)
                    .is_none_or(|conn| self.resolver.is_skipped(&conn.from_node));
                if reads_default {
                    needed.push(Capability::Attribute(*attribute, *space));
                }
            }
        }

        let capabilities = &self.options.capabilities;
        for capability in &needed {
            if !capabilities.provides(*capability) && !unmet.contains(capability) {
                unmet.push(*capability);
            }
        }
        (needed, unmet)
    }

    /// In preview, unconnected constant inputs read properties named after
    /// their slot variable so values can change without regenerating.
    fn collect_preview_properties(&mut self, graph: &ShaderGraph, node: &MaterialNode) -> GenResult<()> {
        for slot in node.slots().inputs() {
            let SlotDefault::Constant(values) = &slot.default else {
                continue;
            };
            if graph.is_connected(node.id(), slot.id) || slot.value_type.components().is_none() {
                continue;
            }
            let name = self.resolver.variable_name_for_slot(node, slot.id)?;
            self.properties.add_shader_property(
                ShaderProperty::new(name.clone(), slot.value_type, values.clone()).with_display_name(&slot.name),
            );
            self.declare(node, name);
        }
        Ok(())
    }

    fn declare(&mut self, node: &MaterialNode, name: String) {
        self.declarations.push(Declaration {
            node_id: node.id().to_string(),
            name,
        });
    }

    /// Generate the registered helpers and substitute the precision token.
    pub fn finish(self) -> GenResult<GeneratedFragment> {
        let precision = self.options.precision.hlsl();
        let helpers: Vec<GeneratedFunction> = self
            .registry
            .finish_functions()?
            .into_iter()
            .map(|f| GeneratedFunction {
                text: f.text.replace(PRECISION_TOKEN, precision),
                name: f.name.replace(PRECISION_TOKEN, precision),
            })
            .collect();
        let fragment = GeneratedFragment {
            functions: helpers.iter().map(|f| f.text.as_str()).collect(),
            helpers,
            body: self.body.build().replace(PRECISION_TOKEN, precision),
            properties: self.properties.into_vec(),
            declarations: self.declarations,
            diagnostics: self.diagnostics.into_vec(),
            requirements: self.requirements,
        };
        debug!(
            "pass finished: {} bytes of functions, {} bytes of body, {} properties, {} diagnostics",
            fragment.functions.len(),
            fragment.body.len(),
            fragment.properties.len(),
            fragment.diagnostics.len()
        );
        Ok(fragment)
    }
}

fn log_contract_violation(node: &MaterialNode, e: &GenError) {
    if let GenError::DanglingSlot { .. } = e {
        error!("node {} ({}): {e}", node.id(), node.kind().name());
    }
}

/// Run a full pass over `graph`, marking every emitted node.
pub fn generate_fragment(graph: &mut ShaderGraph, options: &GeneratorOptions) -> GenResult<GeneratedFragment> {
    let mut pass = GenerationPass::new(options.clone());
    for index in 0..graph.nodes().len() {
        if pass.emit_node(graph, index)? {
            graph.mark_emitted(index);
        }
    }
    pass.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::node::NodeState;
    use crate::codegen::node_compiler::test_utils::{test_dsl, test_graph};
    use crate::codegen::properties::HlslDeclaration;
    use crate::codegen::types::{CoordinateSpace, DotsInstancing, Precision};
    use proptest::prelude::*;

    fn final_options() -> GeneratorOptions {
        GeneratorOptions::default()
    }

    fn preview_options() -> GeneratorOptions {
        GeneratorOptions {
            mode: GenerationMode::Preview,
            ..Default::default()
        }
    }

    fn single_skin() -> ShaderGraph {
        test_graph(&[("skin", "LinearBlendSkinning")], &[])
    }

    #[test]
    fn final_scenario() {
        let mut graph = single_skin();
        let fragment = generate_fragment(&mut graph, &final_options()).unwrap();

        assert!(fragment.is_valid());
        assert!(fragment.body.contains(
            "Unity_LinearBlendSkinning_float(IN.BoneIndices, IN.BoneWeights, IN.ObjectSpacePosition, IN.ObjectSpaceNormal, IN.ObjectSpaceTangent, \
             _LinearBlendSkinning_0_SkinnedPosition_3, _LinearBlendSkinning_0_SkinnedNormal_4, _LinearBlendSkinning_0_SkinnedTangent_5);"
        ));
        assert!(fragment.functions.contains("void Unity_LinearBlendSkinning_float(uint4 indices, float4 weights,"));
        assert!(fragment.functions.contains("for (int i = 0; i < 4; ++i)"));
        assert!(!fragment.source().contains(PRECISION_TOKEN));
        assert_eq!(graph.node("skin").unwrap().state(), NodeState::CodeEmitted);

        let req = &fragment.requirements;
        assert!(req.vertex_skinning);
        assert!(req.position_spaces.contains(&CoordinateSpace::Object));
        assert!(req.normal_spaces.contains(&CoordinateSpace::Object));
        assert!(req.tangent_spaces.contains(&CoordinateSpace::Object));

        assert_eq!(fragment.properties.len(), 1);
        let prop = &fragment.properties[0];
        assert_eq!(prop.reference_name, "_SkinMatrixIndex");
        assert_eq!(prop.display_name.as_deref(), Some("Skin Matrix Index Offset"));
        assert_eq!(prop.declaration, HlslDeclaration::HybridPerInstance);
        assert!(prop.hidden);
    }

    #[test]
    fn preview_scenario_still_registers_helper() {
        let mut graph = single_skin();
        let fragment = generate_fragment(&mut graph, &preview_options()).unwrap();

        assert!(fragment.is_valid());
        assert!(!fragment.body.contains("Unity_LinearBlendSkinning_float("));
        assert!(fragment.body.contains("float3 _LinearBlendSkinning_0_SkinnedPosition_3 = IN.ObjectSpacePosition;"));
        assert!(fragment.functions.contains("void Unity_LinearBlendSkinning_float("));
    }

    #[test]
    fn guard_appears_once_per_node() {
        let mut graph = test_graph(
            &[("a", "LinearBlendSkinning"), ("b", "LinearBlendSkinning")],
            &[],
        );
        let fragment = generate_fragment(&mut graph, &final_options()).unwrap();
        let body = &fragment.body;
        assert_eq!(body.matches("#if defined(UNITY_DOTS_INSTANCING_ENABLED)").count(), 2);
        assert_eq!(body.matches("#else").count(), 2);
        assert_eq!(body.matches("#endif").count(), 2);
    }

    #[test]
    fn shared_helpers_are_emitted_once() {
        let mut one = single_skin();
        let single = generate_fragment(&mut one, &final_options()).unwrap();

        let mut two = test_graph(
            &[("a", "LinearBlendSkinning"), ("b", "LinearBlendSkinning")],
            &[],
        );
        let double = generate_fragment(&mut two, &final_options()).unwrap();

        assert_eq!(double.functions, single.functions);
        assert_eq!(double.functions.matches("StructuredBuffer<float3x4> _SkinMatrices;").count(), 1);
        assert_eq!(double.functions.matches("void Unity_LinearBlendSkinning_float(").count(), 1);
        assert_eq!(double.properties.len(), 1);
    }

    #[test]
    fn half_precision_substitutes_every_token() {
        let mut graph = single_skin();
        let options = GeneratorOptions {
            precision: Precision::Half,
            ..Default::default()
        };
        let fragment = generate_fragment(&mut graph, &options).unwrap();
        assert!(fragment.functions.contains("void Unity_LinearBlendSkinning_half("));
        assert!(fragment.functions.contains("half3x4 skinMatrix"));
        assert!(fragment.functions.contains("StructuredBuffer<float3x4>"));
        assert!(fragment.body.contains("half3 _LinearBlendSkinning_0_SkinnedPosition_3 = 0;"));
    }

    #[test]
    fn fragment_stage_skips_skinning() {
        let mut graph = test_graph(
            &[("pos", "Vector3"), ("skin", "LinearBlendSkinning"), ("v", "Vector3")],
            &[("skin", 3, "v", 1)],
        );
        let options = GeneratorOptions {
            stage: ShaderStage::Fragment,
            ..Default::default()
        };
        let fragment = generate_fragment(&mut graph, &options).unwrap();

        assert!(!fragment.is_valid());
        assert!(fragment.diagnostics.contains(&Diagnostic::UnmetRequirement {
            node_id: "skin".to_string(),
            capability: Capability::Stage(ShaderStage::Vertex),
        }));
        assert!(fragment.diagnostics.contains(&Diagnostic::UpstreamSkipped {
            node_id: "v".to_string(),
            slot_id: 1,
            upstream_id: "skin".to_string(),
        }));
        assert!(!fragment.body.contains("LinearBlendSkinning"));
        assert!(fragment.functions.is_empty());
        assert!(fragment.body.contains("float3 _Vector3_1_Out_0 = float3(0, 0, 0);"));
        assert_eq!(graph.node("skin").unwrap().state(), NodeState::SlotsDeclared);
        assert_eq!(graph.node("v").unwrap().state(), NodeState::CodeEmitted);
    }

    #[test]
    fn missing_capabilities_are_reported() {
        let mut graph = single_skin();
        let mut options = final_options();
        options.capabilities.vertex_skinning = false;
        options.capabilities.normal_spaces.remove(&CoordinateSpace::Object);
        let fragment = generate_fragment(&mut graph, &options).unwrap();

        assert_eq!(
            fragment.diagnostics,
            vec![
                Diagnostic::UnmetRequirement {
                    node_id: "skin".to_string(),
                    capability: Capability::VertexSkinning,
                },
                Diagnostic::UnmetRequirement {
                    node_id: "skin".to_string(),
                    capability: Capability::Attribute(
                        crate::codegen::types::MeshAttribute::Normal,
                        CoordinateSpace::Object
                    ),
                },
            ]
        );
        assert!(fragment.body.is_empty());
        assert!(fragment.properties.is_empty());
    }

    #[test]
    fn connected_inputs_need_no_attributes() {
        let mut graph = test_graph(
            &[("pos", "Vector3"), ("skin", "LinearBlendSkinning")],
            &[("pos", 0, "skin", 0)],
        );
        let mut options = final_options();
        options.capabilities.position_spaces.clear();
        let fragment = generate_fragment(&mut graph, &options).unwrap();

        assert!(fragment.is_valid());
        assert!(fragment.requirements.position_spaces.is_empty());
        assert!(fragment.body.contains("_Vector3_0_Out_0, IN.ObjectSpaceNormal"));
    }

    #[test]
    fn skipped_upstream_inputs_need_their_attributes() {
        let mut graph = test_graph(
            &[("n", "Vector3"), ("a", "LinearBlendSkinning"), ("b", "LinearBlendSkinning")],
            &[("a", 3, "b", 0), ("n", 0, "b", 1)],
        );
        let mut options = final_options();
        options.capabilities.normal_spaces.remove(&CoordinateSpace::Object);
        let fragment = generate_fragment(&mut graph, &options).unwrap();

        assert_eq!(graph.node("a").unwrap().state(), NodeState::SlotsDeclared);
        assert_eq!(graph.node("b").unwrap().state(), NodeState::CodeEmitted);
        assert!(fragment.diagnostics.contains(&Diagnostic::UpstreamSkipped {
            node_id: "b".to_string(),
            slot_id: 0,
            upstream_id: "a".to_string(),
        }));
        assert!(fragment.body.contains("IN.BoneWeights, IN.ObjectSpacePosition, _Vector3_0_Out_0, IN.ObjectSpaceTangent"));

        let req = &fragment.requirements;
        assert!(req.position_spaces.contains(&CoordinateSpace::Object));
        assert!(req.tangent_spaces.contains(&CoordinateSpace::Object));
        assert!(req.normal_spaces.is_empty());
    }

    #[test]
    fn skipped_upstream_reports_missing_attribute() {
        let mut graph = test_graph(
            &[("a", "LinearBlendSkinning"), ("b", "LinearBlendSkinning")],
            &[("a", 3, "b", 0)],
        );
        let mut options = final_options();
        options.capabilities.normal_spaces.remove(&CoordinateSpace::Object);
        options.capabilities.position_spaces.clear();
        let fragment = generate_fragment(&mut graph, &options).unwrap();

        let b_unmet: Vec<&Diagnostic> = fragment.diagnostics.iter().filter(|d| d.node_id() == "b").collect();
        assert!(b_unmet.contains(&&Diagnostic::UnmetRequirement {
            node_id: "b".to_string(),
            capability: Capability::Attribute(crate::codegen::types::MeshAttribute::Position, CoordinateSpace::Object),
        }));
        assert!(fragment.body.is_empty());
    }

    #[test]
    fn declarations_follow_emission_order() {
        let mut graph = test_graph(&[("v", "Vector1"), ("pos", "Vector3")], &[("v", 0, "pos", 2)]);
        let fragment = generate_fragment(&mut graph, &preview_options()).unwrap();

        let names: Vec<(&str, &str)> = fragment
            .declarations
            .iter()
            .map(|d| (d.node_id.as_str(), d.name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("v", "_Vector1_0_Out_0"),
                ("v", "_Vector1_0_X_1"),
                ("pos", "_Vector3_1_Out_0"),
                ("pos", "_Vector3_1_X_1"),
                ("pos", "_Vector3_1_Z_3"),
            ]
        );
    }

    #[test]
    fn namespace_prefixes_declarations_and_properties() {
        let mut graph = test_graph(&[("v", "Vector1")], &[]);
        let options = GeneratorOptions {
            namespace: Some("shadow".to_string()),
            ..preview_options()
        };
        let fragment = generate_fragment(&mut graph, &options).unwrap();

        assert_eq!(fragment.body, "float _shadow_Vector1_0_Out_0 = _shadow_Vector1_0_X_1;\n");
        assert_eq!(fragment.properties[0].reference_name, "_shadow_Vector1_0_X_1");
    }

    #[test]
    fn unsupported_instancing_still_emits_fallback() {
        let mut graph = single_skin();
        let mut options = final_options();
        options.capabilities.dots_instancing = DotsInstancing::Unsupported;
        let fragment = generate_fragment(&mut graph, &options).unwrap();
        assert!(!fragment.body.contains('#'));
        assert_eq!(fragment.body.lines().count(), 3);
    }

    #[test]
    fn preview_constants_become_properties() {
        let mut dsl = test_dsl(&[("v", "Vector3")], &[]);
        dsl.nodes[0].slot_values.insert(2, vec![0.25]);
        let mut graph = ShaderGraph::from_dsl(&dsl).unwrap();
        let fragment = generate_fragment(&mut graph, &preview_options()).unwrap();

        assert_eq!(
            fragment.body,
            "float3 _Vector3_0_Out_0 = float3(_Vector3_0_X_1, _Vector3_0_Y_2, _Vector3_0_Z_3);\n"
        );
        let names: Vec<&str> = fragment.properties.iter().map(|p| p.reference_name.as_str()).collect();
        assert_eq!(names, vec!["_Vector3_0_X_1", "_Vector3_0_Y_2", "_Vector3_0_Z_3"]);
        assert_eq!(fragment.properties[1].default, vec![0.25]);
        assert_eq!(fragment.properties[1].display_name.as_deref(), Some("Y"));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let graph = single_skin();
        let mut pass = GenerationPass::new(final_options());
        assert!(pass.emit_node(&graph, 5).is_err());
        let fragment = pass.finish().unwrap();
        assert!(fragment.source().is_empty());
    }

    #[test]
    fn passes_run_on_separate_threads() {
        let graph = test_graph(
            &[("pos", "Vector3"), ("skin", "LinearBlendSkinning")],
            &[("pos", 0, "skin", 0)],
        );
        let mut expected = graph.clone();
        let expected = generate_fragment(&mut expected, &final_options()).unwrap();

        let results: Vec<GeneratedFragment> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let mut g = graph.clone();
                    s.spawn(move || generate_fragment(&mut g, &final_options()).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for fragment in results {
            assert_eq!(fragment, expected);
        }
    }

    fn assert_send<T: Send>() {}

    #[test]
    fn pass_is_send() {
        assert_send::<GenerationPass>();
    }

    proptest! {
        #[test]
        fn regeneration_is_byte_identical(
            skins in 1usize..4,
            preview in any::<bool>(),
            half in any::<bool>(),
            value in -10.0f32..10.0,
        ) {
            let mut nodes: Vec<(String, &str)> = vec![("pos".to_string(), "Vector3")];
            let mut conns: Vec<(String, u32, String, u32)> = Vec::new();
            for i in 0..skins {
                let id = format!("skin{i}");
                conns.push(("pos".to_string(), 0, id.clone(), 0));
                nodes.push((id, "LinearBlendSkinning"));
            }
            let node_refs: Vec<(&str, &str)> = nodes.iter().map(|(id, ty)| (id.as_str(), *ty)).collect();
            let conn_refs: Vec<(&str, u32, &str, u32)> = conns
                .iter()
                .map(|(f, fs, t, ts)| (f.as_str(), *fs, t.as_str(), *ts))
                .collect();
            let mut dsl = test_dsl(&node_refs, &conn_refs);
            dsl.nodes[0].slot_values.insert(1, vec![value]);

            let options = GeneratorOptions {
                mode: if preview { GenerationMode::Preview } else { GenerationMode::Final },
                precision: if half { Precision::Half } else { Precision::Float },
                ..Default::default()
            };
            let mut a = ShaderGraph::from_dsl(&dsl).unwrap();
            let mut b = ShaderGraph::from_dsl(&dsl).unwrap();
            let first = generate_fragment(&mut a, &options).unwrap();
            let second = generate_fragment(&mut b, &options).unwrap();
            prop_assert_eq!(first.source(), second.source());
            prop_assert_eq!(first.properties, second.properties);
            prop_assert_eq!(
                first.body.matches("#endif").count(),
                skins
            );
        }
    }
}

//! Linear blend skinning of position, normal and tangent.
//!
//! With DOTS instancing enabled the node calls a generated helper that
//! blends the skin matrices of up to four bones. Otherwise the inputs pass
//! through unchanged.
//!
//! # Example (final mode)
//! ```hlsl
//! #if defined(UNITY_DOTS_INSTANCING_ENABLED)
//! $precision3 out_pos = 0;
//! ...
//! Unity_LinearBlendSkinning_$precision(IN.BoneIndices, IN.BoneWeights, in_pos, ..., out_pos, ...);
//! #else
//! $precision3 out_pos = in_pos;
//! ...
//! #endif
//! ```

use super::super::code_builder::ShaderStringBuilder;
use super::super::error::GenResult;
use super::super::function_registry::FunctionRegistry;
use super::super::node::MaterialNode;
use super::super::properties::{HlslDeclaration, PropertyCollector, ShaderProperty};
use super::super::slots::{Slot, SlotDefault};
use super::super::types::{
    Capability, CoordinateSpace, DotsInstancing, GenerationMode, GeneratorOptions, MeshAttribute,
    ShaderStage, ShaderStageCapability, SkinMatrixLayout, ValueType,
};
use super::{EmitContext, NodeEmitter};

pub const POSITION_SLOT_ID: u32 = 0;
pub const NORMAL_SLOT_ID: u32 = 1;
pub const TANGENT_SLOT_ID: u32 = 2;
pub const POSITION_OUTPUT_SLOT_ID: u32 = 3;
pub const NORMAL_OUTPUT_SLOT_ID: u32 = 4;
pub const TANGENT_OUTPUT_SLOT_ID: u32 = 5;

/// Bones influencing each vertex.
pub const INFLUENCE_COUNT: usize = 4;

pub const SKIN_MATRICES_FUNCTION: &str = "SkinMatrices";
pub const SKINNING_FUNCTION: &str = "Unity_LinearBlendSkinning_$precision";

const DOTS_GUARD: &str = "#if defined(UNITY_DOTS_INSTANCING_ENABLED)";

/// (input, output) slot pairs in call order.
const SLOT_PAIRS: [(u32, u32); 3] = [
    (POSITION_SLOT_ID, POSITION_OUTPUT_SLOT_ID),
    (NORMAL_SLOT_ID, NORMAL_OUTPUT_SLOT_ID),
    (TANGENT_SLOT_ID, TANGENT_OUTPUT_SLOT_ID),
];

pub struct LinearBlendSkinningNode;

fn attribute_input(id: u32, name: &str, attribute: MeshAttribute) -> Slot {
    Slot::input(
        id,
        name,
        ValueType::Vec3,
        SlotDefault::Attribute {
            attribute,
            space: CoordinateSpace::Object,
        },
    )
    .with_stage(ShaderStageCapability::Vertex)
}

impl NodeEmitter for LinearBlendSkinningNode {
    fn slots(&self) -> Vec<Slot> {
        vec![
            attribute_input(POSITION_SLOT_ID, "Vertex Position", MeshAttribute::Position),
            attribute_input(NORMAL_SLOT_ID, "Vertex Normal", MeshAttribute::Normal),
            attribute_input(TANGENT_SLOT_ID, "Vertex Tangent", MeshAttribute::Tangent),
            Slot::output(POSITION_OUTPUT_SLOT_ID, "Skinned Position", ValueType::Vec3)
                .with_stage(ShaderStageCapability::Vertex),
            Slot::output(NORMAL_OUTPUT_SLOT_ID, "Skinned Normal", ValueType::Vec3)
                .with_stage(ShaderStageCapability::Vertex),
            Slot::output(TANGENT_OUTPUT_SLOT_ID, "Skinned Tangent", ValueType::Vec3)
                .with_stage(ShaderStageCapability::Vertex),
        ]
    }

    fn requirements(&self, _node: &MaterialNode, _stage: ShaderStage) -> Vec<Capability> {
        vec![Capability::VertexSkinning]
    }

    fn collect_properties(
        &self,
        _node: &MaterialNode,
        properties: &mut PropertyCollector,
        options: &GeneratorOptions,
    ) {
        let layout = options.skin_matrix_layout;
        let mut property = ShaderProperty::new(layout.property_name(), ValueType::Float, vec![0.0])
            .with_declaration(HlslDeclaration::HybridPerInstance)
            .hidden();
        if layout == SkinMatrixLayout::EntitiesGraphics {
            property = property.with_display_name("Skin Matrix Index Offset");
        }
        properties.add_shader_property(property);
    }

    fn generate_code(
        &self,
        node: &MaterialNode,
        ctx: &mut EmitContext<'_>,
        sb: &mut ShaderStringBuilder,
    ) -> GenResult<()> {
        let mut pairs: Vec<(String, String)> = Vec::with_capacity(SLOT_PAIRS.len());
        for (input, output) in SLOT_PAIRS {
            let out_var = ctx.variable_name_for_slot(node, output)?;
            let in_expr = ctx.slot_value(node, input)?;
            pairs.push((in_expr, out_var));
        }

        let guarded = ctx.options.capabilities.dots_instancing == DotsInstancing::Guarded;
        if guarded {
            sb.append_line(DOTS_GUARD);
            for (_, out_var) in &pairs {
                sb.append_line(format!("$precision3 {out_var} = 0;"));
            }
            if ctx.mode() == GenerationMode::Final {
                let inputs: Vec<&str> = pairs.iter().map(|(i, _)| i.as_str()).collect();
                let outputs: Vec<&str> = pairs.iter().map(|(_, o)| o.as_str()).collect();
                sb.append_line(format!(
                    "{SKINNING_FUNCTION}(IN.BoneIndices, IN.BoneWeights, {}, {});",
                    inputs.join(", "),
                    outputs.join(", ")
                ));
            }
            sb.append_line("#else");
        }
        for (in_expr, out_var) in &pairs {
            sb.append_line(format!("$precision3 {out_var} = {in_expr};"));
        }
        if guarded {
            sb.append_line("#endif");
        }
        Ok(())
    }

    fn generate_functions(
        &self,
        _node: &MaterialNode,
        registry: &mut FunctionRegistry,
        options: &GeneratorOptions,
    ) -> GenResult<()> {
        registry.provide_function(SKIN_MATRICES_FUNCTION, write_skin_matrices)?;

        let offset_property = options.skin_matrix_layout.property_name();
        registry.provide_function(SKINNING_FUNCTION, move |sb, registry| {
            registry.provide_function(SKIN_MATRICES_FUNCTION, write_skin_matrices)?;
            write_skinning_function(sb, offset_property);
            Ok(())
        })
    }
}

fn write_skin_matrices(sb: &mut ShaderStringBuilder, _: &mut FunctionRegistry) -> GenResult<()> {
    sb.append_line("uniform StructuredBuffer<float3x4> _SkinMatrices;");
    sb.append_new_line();
    Ok(())
}

fn write_skinning_function(sb: &mut ShaderStringBuilder, offset_property: &str) {
    sb.append_line(format!(
        "void {SKINNING_FUNCTION}(uint4 indices, $precision4 weights, \
         $precision3 positionIn, $precision3 normalIn, $precision3 tangentIn, \
         out $precision3 positionOut, out $precision3 normalOut, out $precision3 tangentOut)"
    ));
    {
        let mut body = sb.block_scope("{", "}");
        body.append_lines(&["positionOut = 0;", "normalOut = 0;", "tangentOut = 0;"]);
        body.append_line(format!("for (int i = 0; i < {INFLUENCE_COUNT}; ++i)"));
        let mut bones = body.block_scope("{", "}");
        bones.append_line(format!(
            "$precision3x4 skinMatrix = _SkinMatrices[indices[i] + asint(UNITY_ACCESS_HYBRID_INSTANCED_PROP({offset_property}, float))];"
        ));
        bones.append_lines(&[
            "$precision3 vtransformed = mul(skinMatrix, $precision4(positionIn, 1));",
            "$precision3 ntransformed = mul(skinMatrix, $precision4(normalIn, 0));",
            "$precision3 ttransformed = mul(skinMatrix, $precision4(tangentIn, 0));",
            "",
            "positionOut += vtransformed * weights[i];",
            "normalOut += ntransformed * weights[i];",
            "tangentOut += ttransformed * weights[i];",
        ]);
    }
    sb.append_new_line();
}

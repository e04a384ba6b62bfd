//! Built-in transformation matrices.

use super::super::code_builder::ShaderStringBuilder;
use super::super::error::{GenError, GenResult};
use super::super::node::MaterialNode;
use super::super::slots::Slot;
use super::super::types::ValueType;
use super::{EmitContext, NodeEmitter};

pub const OUTPUT_SLOT_ID: u32 = 0;

pub const MATRIX_PARAM: &str = "matrix";
const DEFAULT_MATRIX: &str = "ModelView";

/// `matrix` param value to the engine's built-in name.
const MATRICES: [(&str, &str); 8] = [
    ("ModelView", "UNITY_MATRIX_MV"),
    ("View", "UNITY_MATRIX_V"),
    ("Projection", "UNITY_MATRIX_P"),
    ("ViewProjection", "UNITY_MATRIX_VP"),
    ("TransposeModelView", "UNITY_MATRIX_T_MV"),
    ("InverseTransposeModelView", "UNITY_MATRIX_IT_MV"),
    ("ObjectToWorld", "unity_ObjectToWorld"),
    ("WorldToObject", "unity_WorldToObject"),
];

fn builtin_for(name: &str) -> Option<&'static str> {
    MATRICES
        .iter()
        .find(|(param, _)| *param == name)
        .map(|(_, builtin)| *builtin)
}

pub struct MatrixCommonNode;

impl MatrixCommonNode {
    fn builtin(node: &MaterialNode) -> GenResult<&'static str> {
        if let Some(value) = node.params().get(MATRIX_PARAM) {
            if !value.is_string() {
                return Err(GenError::InvalidParam {
                    node_id: node.id().to_string(),
                    param: MATRIX_PARAM.to_string(),
                    reason: format!("expected a string, got {value}"),
                });
            }
        }
        let name = node.param_str(MATRIX_PARAM).unwrap_or(DEFAULT_MATRIX);
        builtin_for(name).ok_or_else(|| GenError::InvalidParam {
            node_id: node.id().to_string(),
            param: MATRIX_PARAM.to_string(),
            reason: format!("unknown matrix '{name}'"),
        })
    }
}

impl NodeEmitter for MatrixCommonNode {
    fn slots(&self) -> Vec<Slot> {
        vec![Slot::output(OUTPUT_SLOT_ID, "Output", ValueType::Matrix4)]
    }

    fn validate_params(&self, node: &MaterialNode) -> GenResult<()> {
        Self::builtin(node).map(|_| ())
    }

    fn generate_code(
        &self,
        node: &MaterialNode,
        ctx: &mut EmitContext<'_>,
        sb: &mut ShaderStringBuilder,
    ) -> GenResult<()> {
        let builtin = Self::builtin(node)?;
        let out = ctx.variable_name_for_slot(node, OUTPUT_SLOT_ID)?;
        sb.append_line(format!("{} {out} = {builtin};", ValueType::Matrix4.hlsl()));
        Ok(())
    }
}

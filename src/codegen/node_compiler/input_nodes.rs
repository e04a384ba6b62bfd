//! Constant source nodes (Vector1, Vector3).

use super::super::code_builder::ShaderStringBuilder;
use super::super::error::GenResult;
use super::super::node::MaterialNode;
use super::super::slots::{Slot, SlotDefault};
use super::super::types::ValueType;
use super::{EmitContext, NodeEmitter};

pub const OUTPUT_SLOT_ID: u32 = 0;
pub const X_SLOT_ID: u32 = 1;
pub const Y_SLOT_ID: u32 = 2;
pub const Z_SLOT_ID: u32 = 3;

fn scalar_input(id: u32, name: &str) -> Slot {
    Slot::input(id, name, ValueType::Float, SlotDefault::Constant(vec![0.0]))
}

/// `$precision out = x;`
pub struct Vector1Node;

impl NodeEmitter for Vector1Node {
    fn slots(&self) -> Vec<Slot> {
        vec![
            scalar_input(X_SLOT_ID, "X"),
            Slot::output(OUTPUT_SLOT_ID, "Out", ValueType::Float),
        ]
    }

    fn generate_code(
        &self,
        node: &MaterialNode,
        ctx: &mut EmitContext<'_>,
        sb: &mut ShaderStringBuilder,
    ) -> GenResult<()> {
        let out = ctx.variable_name_for_slot(node, OUTPUT_SLOT_ID)?;
        let x = ctx.slot_value(node, X_SLOT_ID)?;
        sb.append_line(format!("{} {out} = {x};", ValueType::Float.hlsl()));
        Ok(())
    }
}

/// `$precision3 out = $precision3(x, y, z);`
pub struct Vector3Node;

impl NodeEmitter for Vector3Node {
    fn slots(&self) -> Vec<Slot> {
        vec![
            scalar_input(X_SLOT_ID, "X"),
            scalar_input(Y_SLOT_ID, "Y"),
            scalar_input(Z_SLOT_ID, "Z"),
            Slot::output(OUTPUT_SLOT_ID, "Out", ValueType::Vec3),
        ]
    }

    fn generate_code(
        &self,
        node: &MaterialNode,
        ctx: &mut EmitContext<'_>,
        sb: &mut ShaderStringBuilder,
    ) -> GenResult<()> {
        let out = ctx.variable_name_for_slot(node, OUTPUT_SLOT_ID)?;
        let x = ctx.slot_value(node, X_SLOT_ID)?;
        let y = ctx.slot_value(node, Y_SLOT_ID)?;
        let z = ctx.slot_value(node, Z_SLOT_ID)?;
        let ty = ValueType::Vec3.hlsl();
        sb.append_line(format!("{ty} {out} = {ty}({x}, {y}, {z});"));
        Ok(())
    }
}

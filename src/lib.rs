//! Shader-fragment code generation for node graphs.
//!
//! - `dsl`: JSON graph model and loading helpers
//! - `graph`: connection validation and topological ordering
//! - `codegen`: code builder, function registry, slot resolution and node emitters

pub mod codegen;
pub mod dsl;
pub mod graph;

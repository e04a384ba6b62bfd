//! Shader-fragment generator for node graphs.
//!
//! This module is organized into several submodules:
//! - `types`: Core type definitions (ValueType, GeneratorOptions, capabilities)
//! - `utils`: Float formatting, identifier sanitizing and type conversion
//! - `code_builder`: Indentation-aware line builder
//! - `function_registry`: Deduplicated helper functions
//! - `slots` / `node`: Slot sets and the node slot-declaration state machine
//! - `shader_graph`: Validated, ordered graph built from the DSL
//! - `slot_resolver`: Variable naming and input expressions
//! - `node_compiler`: Per-kind emitters
//! - `pass`: One generation pass and its output fragment
//! - `assembly`: Graph source and shader assembler seams
//!
//! The main entry points are:
//! - `generate_fragment`: Run a pass over a `ShaderGraph`
//! - `generate_from_source`: Build the graph from a `GraphSource` first

pub mod assembly;
pub mod code_builder;
pub mod diagnostics;
pub mod error;
pub mod function_registry;
pub mod node;
pub mod node_compiler;
pub mod pass;
pub mod properties;
pub mod shader_graph;
pub mod slot_resolver;
pub mod slots;
pub mod types;
pub mod utils;

pub use assembly::{
    AssembledShader, ConcatAssembler, GraphSource, ShaderAssembler, generate_from_source,
};
pub use diagnostics::Diagnostic;
pub use error::{GenError, GenResult};
pub use pass::{Declaration, GeneratedFragment, GenerationPass, generate_fragment};
pub use properties::{HlslDeclaration, ShaderProperty};
pub use shader_graph::ShaderGraph;
pub use types::{
    GenerationMode, GeneratorOptions, Precision, ShaderStage, SkinMatrixLayout,
};

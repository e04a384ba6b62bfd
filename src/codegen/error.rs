use thiserror::Error;

use super::types::ValueType;

/// Fatal generation errors. Non-fatal problems are reported as
/// [`Diagnostic`](super::diagnostics::Diagnostic)s instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    #[error("cyclic function dependency: `{name}` was requested while it was being generated")]
    CyclicFunctionDependency { name: String },
    #[error("node {node_id} referenced slot {slot_id}, which is not in its slot set")]
    DanglingSlot { node_id: String, slot_id: u32 },
    #[error("node {node_id} emitted code before declaring its slots")]
    SlotsNotDeclared { node_id: String },
    #[error("node not found: {0}")]
    MissingNode(String),
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),
    #[error("unsupported node type: {0}")]
    UnsupportedNodeType(String),
    #[error("invalid param `{param}` on node {node_id}: {reason}")]
    InvalidParam {
        node_id: String,
        param: String,
        reason: String,
    },
    #[error("connection {connection_id}: {reason}")]
    InvalidConnection {
        connection_id: String,
        reason: String,
    },
    #[error("connection {connection_id}: cannot convert {from:?} to {to:?}")]
    IncompatibleConnection {
        connection_id: String,
        from: ValueType,
        to: ValueType,
    },
    #[error("cycle detected in graph (cannot topologically sort)")]
    GraphCycle,
}

pub type GenResult<T> = Result<T, GenError>;

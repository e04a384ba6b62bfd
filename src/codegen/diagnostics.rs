//! Per-node diagnostics accumulated over a generation pass.

use std::fmt;

use log::warn;

use super::types::Capability;

/// Non-fatal problems. Any diagnostic marks the generated shader invalid,
/// but the pass still completes so the caller can decide what to surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// The node needs a context feature this pass does not provide; it emitted nothing.
    UnmetRequirement {
        node_id: String,
        capability: Capability,
    },
    /// An input is connected to a node that emitted nothing; its default was used.
    UpstreamSkipped {
        node_id: String,
        slot_id: u32,
        upstream_id: String,
    },
    /// Two assembled passes declare the same variable; the later one is reported.
    DuplicateDeclaration {
        node_id: String,
        name: String,
    },
}

impl Diagnostic {
    pub fn node_id(&self) -> &str {
        match self {
            Diagnostic::UnmetRequirement { node_id, .. } => node_id,
            Diagnostic::UpstreamSkipped { node_id, .. } => node_id,
            Diagnostic::DuplicateDeclaration { node_id, .. } => node_id,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnmetRequirement {
                node_id,
                capability,
            } => write!(f, "node {node_id}: requirement unmet: {capability}"),
            Diagnostic::UpstreamSkipped {
                node_id,
                slot_id,
                upstream_id,
            } => write!(
                f,
                "node {node_id}: slot {slot_id} uses its default because upstream node {upstream_id} was skipped"
            ),
            Diagnostic::DuplicateDeclaration { node_id, name } => {
                write!(f, "node {node_id}: {name} is already declared by another pass")
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

//! Seams to the graph model and to shader assembly.
//!
//! The generator reads graphs through [`GraphSource`] and hands fragments to
//! a [`ShaderAssembler`]. [`ConcatAssembler`] is the minimal assembler used
//! by the CLI: property declarations, then helpers (each name once), then
//! every fragment body in order. Fragments share one variable scope, so a
//! name declared by two fragments is reported as a diagnostic.

use std::collections::HashSet;

use log::{debug, warn};

use super::code_builder::ShaderStringBuilder;
use super::diagnostics::Diagnostic;
use super::error::GenResult;
use super::pass::{GeneratedFragment, generate_fragment};
use super::properties::{HlslDeclaration, PropertyCollector, ShaderProperty};
use super::shader_graph::ShaderGraph;
use super::types::GeneratorOptions;
use crate::dsl::GraphDSL;

/// Anything that can produce a validated shader graph.
pub trait GraphSource {
    fn graph_name(&self) -> &str;

    fn build_graph(&self) -> GenResult<ShaderGraph>;
}

impl GraphSource for GraphDSL {
    fn graph_name(&self) -> &str {
        &self.metadata.name
    }

    fn build_graph(&self) -> GenResult<ShaderGraph> {
        ShaderGraph::from_dsl(self)
    }
}

/// Build the graph from `source` and run one pass over it.
pub fn generate_from_source<S: GraphSource + ?Sized>(
    source: &S,
    options: &GeneratorOptions,
) -> GenResult<GeneratedFragment> {
    debug!("generating '{}'", source.graph_name());
    let mut graph = source.build_graph()?;
    generate_fragment(&mut graph, options)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssembledShader {
    pub source: String,
    pub properties: Vec<ShaderProperty>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AssembledShader {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub trait ShaderAssembler {
    fn assemble(&self, fragments: &[GeneratedFragment]) -> AssembledShader;
}

const DOTS_GUARD: &str = "#if defined(UNITY_DOTS_INSTANCING_ENABLED)";

#[derive(Clone, Copy, Debug, Default)]
pub struct ConcatAssembler;

impl ConcatAssembler {
    fn write_declarations(sb: &mut ShaderStringBuilder, properties: &[ShaderProperty]) {
        let declared = |decl: HlslDeclaration| properties.iter().filter(move |p| p.declaration == decl);

        for p in declared(HlslDeclaration::Global) {
            sb.append_line(format!("{} {};", p.declaration_type(), p.reference_name));
        }

        let per_material: Vec<&ShaderProperty> = properties
            .iter()
            .filter(|p| {
                matches!(
                    p.declaration,
                    HlslDeclaration::UnityPerMaterial | HlslDeclaration::HybridPerInstance
                )
            })
            .collect();
        if !per_material.is_empty() {
            sb.append_line("CBUFFER_START(UnityPerMaterial)");
            for p in &per_material {
                sb.append_line(format!("{} {};", p.declaration_type(), p.reference_name));
            }
            sb.append_line("CBUFFER_END");
        }

        let mut per_instance = declared(HlslDeclaration::HybridPerInstance).peekable();
        if per_instance.peek().is_some() {
            sb.append_line(DOTS_GUARD);
            sb.append_line("UNITY_DOTS_INSTANCING_START(MaterialPropertyMetadata)");
            {
                let mut block = sb.indent_scope();
                for p in per_instance {
                    block.append_line(format!(
                        "UNITY_DOTS_INSTANCED_PROP({}, {})",
                        p.declaration_type(),
                        p.reference_name
                    ));
                }
            }
            sb.append_line("UNITY_DOTS_INSTANCING_END(MaterialPropertyMetadata)");
            sb.append_line("#endif");
        }

        if !sb.is_empty() {
            sb.append_new_line();
        }
    }
}

impl ConcatAssembler {
    fn duplicate_declarations(fragments: &[GeneratedFragment]) -> Vec<Diagnostic> {
        let mut declared: HashSet<&str> = HashSet::new();
        let mut duplicates = Vec::new();
        for fragment in fragments {
            for decl in &fragment.declarations {
                if !declared.insert(decl.name.as_str()) {
                    warn!("{} declared by more than one fragment", decl.name);
                    duplicates.push(Diagnostic::DuplicateDeclaration {
                        node_id: decl.node_id.clone(),
                        name: decl.name.clone(),
                    });
                }
            }
        }
        duplicates
    }
}

impl ShaderAssembler for ConcatAssembler {
    fn assemble(&self, fragments: &[GeneratedFragment]) -> AssembledShader {
        let mut properties = PropertyCollector::new();
        for p in fragments.iter().flat_map(|f| f.properties.iter()) {
            properties.add_shader_property(p.clone());
        }
        let properties = properties.into_vec();

        let mut sb = ShaderStringBuilder::new();
        Self::write_declarations(&mut sb, &properties);
        let mut source = sb.build();

        let mut seen: HashSet<&str> = HashSet::new();
        for helper in fragments.iter().flat_map(|f| f.helpers.iter()) {
            if seen.insert(helper.name.as_str()) {
                source.push_str(&helper.text);
            }
        }
        for fragment in fragments {
            source.push_str(&fragment.body);
        }

        let mut diagnostics: Vec<Diagnostic> = fragments
            .iter()
            .flat_map(|f| f.diagnostics.iter().cloned())
            .collect();
        diagnostics.extend(Self::duplicate_declarations(fragments));

        AssembledShader {
            source,
            properties,
            diagnostics,
        }
    }
}

//! Core type definitions for the code generator.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Shader value type of a slot or expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Matrix4,
}

impl ValueType {
    /// Returns the precision-generic HLSL type name. `$precision` is
    /// substituted once the pass is finished.
    pub fn hlsl(self) -> &'static str {
        match self {
            ValueType::Float => "$precision",
            ValueType::Vec2 => "$precision2",
            ValueType::Vec3 => "$precision3",
            ValueType::Vec4 => "$precision4",
            ValueType::Matrix4 => "$precision4x4",
        }
    }

    /// Number of scalar components for vector types, `None` for matrices.
    pub fn components(self) -> Option<usize> {
        match self {
            ValueType::Float => Some(1),
            ValueType::Vec2 => Some(2),
            ValueType::Vec3 => Some(3),
            ValueType::Vec4 => Some(4),
            ValueType::Matrix4 => None,
        }
    }

    /// Number of floats a constant default of this type holds.
    pub fn value_len(self) -> usize {
        self.components().unwrap_or(16)
    }
}

/// A typed shader expression.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedExpr {
    pub ty: ValueType,
    pub expr: String,
}

impl TypedExpr {
    pub fn new(expr: impl Into<String>, ty: ValueType) -> Self {
        Self {
            ty,
            expr: expr.into(),
        }
    }
}

/// Selects whether emitted code targets cheap preview evaluation or final output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Preview,
    #[default]
    Final,
}

/// Floating point precision substituted for `$precision`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Float,
    Half,
}

impl Precision {
    pub fn hlsl(self) -> &'static str {
        match self {
            Precision::Float => "float",
            Precision::Half => "half",
        }
    }
}

/// Shader stage a pass generates code for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    #[default]
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Stages in which a slot may be evaluated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShaderStageCapability {
    #[default]
    All,
    Vertex,
    Fragment,
}

impl ShaderStageCapability {
    pub fn supports(self, stage: ShaderStage) -> bool {
        match self {
            ShaderStageCapability::All => true,
            ShaderStageCapability::Vertex => stage == ShaderStage::Vertex,
            ShaderStageCapability::Fragment => stage == ShaderStage::Fragment,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    Object,
    View,
    World,
    Tangent,
}

impl CoordinateSpace {
    /// Prefix used by the vertex/fragment input struct fields, e.g. `ObjectSpacePosition`.
    pub fn input_prefix(self) -> &'static str {
        match self {
            CoordinateSpace::Object => "ObjectSpace",
            CoordinateSpace::View => "ViewSpace",
            CoordinateSpace::World => "WorldSpace",
            CoordinateSpace::Tangent => "TangentSpace",
        }
    }
}

impl fmt::Display for CoordinateSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateSpace::Object => f.write_str("object"),
            CoordinateSpace::View => f.write_str("view"),
            CoordinateSpace::World => f.write_str("world"),
            CoordinateSpace::Tangent => f.write_str("tangent"),
        }
    }
}

/// Mesh vertex attributes a slot default may read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshAttribute {
    Position,
    Normal,
    Tangent,
}

impl MeshAttribute {
    pub fn input_suffix(self) -> &'static str {
        match self {
            MeshAttribute::Position => "Position",
            MeshAttribute::Normal => "Normal",
            MeshAttribute::Tangent => "Tangent",
        }
    }
}

/// How the current pass handles DOTS instancing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DotsInstancing {
    /// Emit accelerated and fallback paths behind `#if defined(UNITY_DOTS_INSTANCING_ENABLED)`.
    #[default]
    Guarded,
    /// The target never enables DOTS instancing; emit only the fallback path.
    Unsupported,
}

/// Context features a pass can provide to its nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Bone indices and weights are present in the vertex input.
    pub vertex_skinning: bool,
    pub dots_instancing: DotsInstancing,
    pub position_spaces: BTreeSet<CoordinateSpace>,
    pub normal_spaces: BTreeSet<CoordinateSpace>,
    pub tangent_spaces: BTreeSet<CoordinateSpace>,
}

impl Default for Capabilities {
    fn default() -> Self {
        let all: BTreeSet<CoordinateSpace> = [
            CoordinateSpace::Object,
            CoordinateSpace::View,
            CoordinateSpace::World,
            CoordinateSpace::Tangent,
        ]
        .into_iter()
        .collect();
        Self {
            vertex_skinning: true,
            dots_instancing: DotsInstancing::Guarded,
            position_spaces: all.clone(),
            normal_spaces: all.clone(),
            tangent_spaces: all,
        }
    }
}

/// A single capability a node may need from its context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    VertexSkinning,
    Stage(ShaderStage),
    Attribute(MeshAttribute, CoordinateSpace),
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::VertexSkinning => f.write_str("vertex skinning"),
            Capability::Stage(stage) => write!(f, "{stage} stage"),
            Capability::Attribute(attr, space) => {
                write!(f, "{space}-space {}", attr.input_suffix().to_lowercase())
            }
        }
    }
}

impl Capabilities {
    pub fn provides(&self, capability: Capability) -> bool {
        match capability {
            Capability::VertexSkinning => self.vertex_skinning,
            // Stage support is checked against the pass stage, not the capability set.
            Capability::Stage(_) => true,
            Capability::Attribute(MeshAttribute::Position, space) => {
                self.position_spaces.contains(&space)
            }
            Capability::Attribute(MeshAttribute::Normal, space) => {
                self.normal_spaces.contains(&space)
            }
            Capability::Attribute(MeshAttribute::Tangent, space) => {
                self.tangent_spaces.contains(&space)
            }
        }
    }
}

/// Aggregate of what the generated fragment needs from the surrounding shader.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Requirements {
    pub vertex_skinning: bool,
    pub position_spaces: BTreeSet<CoordinateSpace>,
    pub normal_spaces: BTreeSet<CoordinateSpace>,
    pub tangent_spaces: BTreeSet<CoordinateSpace>,
}

impl Requirements {
    pub fn insert(&mut self, capability: Capability) {
        match capability {
            Capability::VertexSkinning => self.vertex_skinning = true,
            Capability::Stage(_) => {}
            Capability::Attribute(MeshAttribute::Position, space) => {
                self.position_spaces.insert(space);
            }
            Capability::Attribute(MeshAttribute::Normal, space) => {
                self.normal_spaces.insert(space);
            }
            Capability::Attribute(MeshAttribute::Tangent, space) => {
                self.tangent_spaces.insert(space);
            }
        }
    }
}

/// Options for a single generation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    pub mode: GenerationMode,
    pub precision: Precision,
    pub stage: ShaderStage,
    pub capabilities: Capabilities,
    pub skin_matrix_layout: SkinMatrixLayout,
    /// Prefix for generated variable names. Passes that are assembled into
    /// one shader need distinct namespaces.
    pub namespace: Option<String>,
}

/// Which per-instance property carries the skin matrix offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinMatrixLayout {
    /// `_SkinMatrixIndex`, used by entities graphics.
    #[default]
    EntitiesGraphics,
    /// `_SkinMatricesOffset`, used by older hybrid renderers.
    LegacyHybrid,
}

impl SkinMatrixLayout {
    pub fn property_name(self) -> &'static str {
        match self {
            SkinMatrixLayout::EntitiesGraphics => "_SkinMatrixIndex",
            SkinMatrixLayout::LegacyHybrid => "_SkinMatricesOffset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_fill_missing_fields_with_defaults() {
        let opts: GeneratorOptions =
            serde_json::from_str(r#"{ "mode": "preview", "capabilities": { "vertex_skinning": false } }"#)
                .unwrap();
        assert_eq!(opts.mode, GenerationMode::Preview);
        assert_eq!(opts.precision, Precision::Float);
        assert!(!opts.capabilities.vertex_skinning);
        assert!(opts.capabilities.position_spaces.contains(&CoordinateSpace::Object));
        assert_eq!(opts.namespace, None);

        let opts: GeneratorOptions = serde_json::from_str(r#"{ "namespace": "shadow" }"#).unwrap();
        assert_eq!(opts.namespace.as_deref(), Some("shadow"));
    }

    #[test]
    fn stage_capability_support() {
        assert!(ShaderStageCapability::All.supports(ShaderStage::Fragment));
        assert!(ShaderStageCapability::Vertex.supports(ShaderStage::Vertex));
        assert!(!ShaderStageCapability::Vertex.supports(ShaderStage::Fragment));
    }

    #[test]
    fn capabilities_are_hashable() {
        let set: std::collections::HashSet<Capability> = [
            Capability::Stage(ShaderStage::Vertex),
            Capability::Stage(ShaderStage::Fragment),
            Capability::Stage(ShaderStage::Vertex),
            Capability::VertexSkinning,
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 3);
        assert!(set.contains(&Capability::Stage(ShaderStage::Fragment)));
    }

    #[test]
    fn capability_display() {
        assert_eq!(
            Capability::Attribute(MeshAttribute::Normal, CoordinateSpace::Object).to_string(),
            "object-space normal"
        );
        assert_eq!(Capability::Stage(ShaderStage::Vertex).to_string(), "vertex stage");
    }
}

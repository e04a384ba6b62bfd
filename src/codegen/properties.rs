//! Shader property descriptors collected alongside generated code.

use log::debug;
use serde::Serialize;

use super::types::ValueType;

/// Where a property is declared in the assembled shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HlslDeclaration {
    DoNotDeclare,
    Global,
    UnityPerMaterial,
    HybridPerInstance,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShaderProperty {
    pub reference_name: String,
    pub display_name: Option<String>,
    pub value_type: ValueType,
    /// The property names its own declaration instead of the default per-material one.
    pub override_declaration: bool,
    pub declaration: HlslDeclaration,
    pub hidden: bool,
    pub default: Vec<f32>,
}

impl ShaderProperty {
    /// A visible per-material property.
    pub fn new(reference_name: impl Into<String>, value_type: ValueType, default: Vec<f32>) -> Self {
        Self {
            reference_name: reference_name.into(),
            display_name: None,
            value_type,
            override_declaration: false,
            declaration: HlslDeclaration::UnityPerMaterial,
            hidden: false,
            default,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_declaration(mut self, declaration: HlslDeclaration) -> Self {
        self.override_declaration = true;
        self.declaration = declaration;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Full-precision type used in property declarations.
    pub fn declaration_type(&self) -> &'static str {
        match self.value_type {
            ValueType::Float => "float",
            ValueType::Vec2 => "float2",
            ValueType::Vec3 => "float3",
            ValueType::Vec4 => "float4",
            ValueType::Matrix4 => "float4x4",
        }
    }
}

/// Collects properties for one pass. The first property with a given
/// reference name wins.
#[derive(Clone, Debug, Default)]
pub struct PropertyCollector {
    properties: Vec<ShaderProperty>,
}

impl PropertyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shader_property(&mut self, property: ShaderProperty) {
        if self
            .properties
            .iter()
            .any(|p| p.reference_name == property.reference_name)
        {
            debug!("property {} already collected", property.reference_name);
            return;
        }
        self.properties.push(property);
    }

    pub fn get(&self, reference_name: &str) -> Option<&ShaderProperty> {
        self.properties
            .iter()
            .find(|p| p.reference_name == reference_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderProperty> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn into_vec(self) -> Vec<ShaderProperty> {
        self.properties
    }
}

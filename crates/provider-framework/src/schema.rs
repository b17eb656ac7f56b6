//! # Resource Schemas
//!
//! A deliberately small, typed rendition of a resource's schema: enough for input
//! validation, diffing, and for exporting a package document that downstream code
//! generators consume.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The shape a property value must have.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Boolean,
    /// A number with no fractional part.
    Integer,
    Number,
    String,
    Array(Box<TypeSpec>),
    /// An object whose values all share one shape.
    Map(Box<TypeSpec>),
    /// An object with a fixed set of named, optional properties.
    Object(BTreeMap<String, TypeSpec>),
    /// Accepts any value.
    Any,
}

impl TypeSpec {
    pub fn array_of(items: TypeSpec) -> Self {
        TypeSpec::Array(Box::new(items))
    }

    pub fn map_of(values: TypeSpec) -> Self {
        TypeSpec::Map(Box::new(values))
    }

    /// Short human-readable name, e.g. `array<string>`.
    pub fn describe(&self) -> String {
        match self {
            TypeSpec::Boolean => "boolean".into(),
            TypeSpec::Integer => "integer".into(),
            TypeSpec::Number => "number".into(),
            TypeSpec::String => "string".into(),
            TypeSpec::Array(items) => format!("array<{}>", items.describe()),
            TypeSpec::Map(values) => format!("map<{}>", values.describe()),
            TypeSpec::Object(_) => "object".into(),
            TypeSpec::Any => "any".into(),
        }
    }

    fn to_schema_json(&self) -> Value {
        match self {
            TypeSpec::Boolean => json!({ "type": "boolean" }),
            TypeSpec::Integer => json!({ "type": "integer" }),
            TypeSpec::Number => json!({ "type": "number" }),
            TypeSpec::String => json!({ "type": "string" }),
            TypeSpec::Array(items) => json!({ "type": "array", "items": items.to_schema_json() }),
            TypeSpec::Map(values) => {
                json!({ "type": "object", "additionalProperties": values.to_schema_json() })
            }
            TypeSpec::Object(props) => {
                let props: serde_json::Map<String, Value> = props
                    .iter()
                    .map(|(name, spec)| (name.clone(), spec.to_schema_json()))
                    .collect();
                json!({ "type": "object", "properties": props })
            }
            TypeSpec::Any => json!({ "$ref": "pulumi.json#/Any" }),
        }
    }
}

impl Serialize for TypeSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_schema_json().serialize(serializer)
    }
}

/// A single named property in a schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySpec {
    #[serde(flatten)]
    pub type_spec: TypeSpec,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Values of this property are always treated as secret.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub secret: bool,
}

impl PropertySpec {
    pub fn new(type_spec: TypeSpec, description: impl Into<String>) -> Self {
        Self {
            type_spec,
            description: description.into(),
            secret: false,
        }
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(TypeSpec::Boolean, description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::new(TypeSpec::Integer, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(TypeSpec::Number, description)
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(TypeSpec::String, description)
    }

    /// Marks the property as secret.
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// Input and output schema of one resource type.
///
/// Built with the `with_*` methods; the registry checks its invariants when the
/// owning definition is registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSchema {
    pub description: String,
    pub inputs: BTreeMap<String, PropertySpec>,
    pub required_inputs: BTreeSet<String>,
    pub outputs: BTreeMap<String, PropertySpec>,
    pub required_outputs: BTreeSet<String>,
    /// Inputs that force replacement when they change, even if the resource can
    /// be updated in place.
    pub replace_on_changes: BTreeSet<String>,
    /// Replacement deletes the old instance before creating the new one.
    pub delete_before_replace: bool,
}

impl ResourceSchema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.inputs.insert(name.into(), spec);
        self
    }

    pub fn with_required_input(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        let name = name.into();
        self.required_inputs.insert(name.clone());
        self.inputs.insert(name, spec);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.outputs.insert(name.into(), spec);
        self
    }

    pub fn with_required_output(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        let name = name.into();
        self.required_outputs.insert(name.clone());
        self.outputs.insert(name, spec);
        self
    }

    pub fn replace_on_change(mut self, name: impl Into<String>) -> Self {
        self.replace_on_changes.insert(name.into());
        self
    }

    pub fn delete_before_replace(mut self, enabled: bool) -> Self {
        self.delete_before_replace = enabled;
        self
    }

    /// Whether `name` is declared secret as an input or an output.
    pub fn is_secret(&self, name: &str) -> bool {
        self.inputs.get(name).is_some_and(|p| p.secret)
            || self.outputs.get(name).is_some_and(|p| p.secret)
    }

    /// Renders the schema in the exported package-document shape.
    pub fn to_resource_spec(&self) -> ResourceSpec {
        ResourceSpec {
            description: self.description.clone(),
            properties: self.outputs.clone(),
            required: self.required_outputs.iter().cloned().collect(),
            input_properties: self.inputs.clone(),
            required_inputs: self.required_inputs.iter().cloned().collect(),
            replace_on_changes: self.replace_on_changes.iter().cloned().collect(),
            delete_before_replace: self.delete_before_replace,
        }
    }
}

/// Exported schema of one resource type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    pub description: String,
    pub properties: BTreeMap<String, PropertySpec>,
    pub required: Vec<String>,
    pub input_properties: BTreeMap<String, PropertySpec>,
    pub required_inputs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replace_on_changes: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub delete_before_replace: bool,
}

/// Exported schema of a whole provider package, keyed by resource type token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    pub resources: BTreeMap<String, ResourceSpec>,
}

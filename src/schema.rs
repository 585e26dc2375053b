//! Tool call-specification generation.
//!
//! A tool's native signature is the [`JsonSchema`] of its argument struct:
//! every field is a parameter, fields that are `Option` or carry
//! `#[serde(default)]` are optional, and the struct's doc comment is the
//! tool's documentation.
//!
//! ```rust
//! use agent_swarm::schema::{generate, ParamType};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! /// Price should be in USD.
//! #[derive(Deserialize, JsonSchema)]
//! struct ExecuteOrder {
//!     product: String,
//!     price: i64,
//! }
//!
//! let spec = generate::<ExecuteOrder>("execute_order").unwrap();
//! assert_eq!(spec.description, "Price should be in USD.");
//! assert_eq!(spec.parameter("price"), Some(ParamType::Integer));
//! assert_eq!(spec.required, vec!["product", "price"]);
//! ```

use schemars::schema::{InstanceType, Schema, SchemaObject, SingleOrVec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Result, SwarmError};

/// Primitive parameter type tag advertised to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

/// Tag used for any parameter whose schema carries no recognised type
/// (nested structs, enums, `serde_json::Value`, unions).
pub const FALLBACK_TYPE: ParamType = ParamType::String;

const TYPE_MAP: [(InstanceType, ParamType); 7] = [
    (InstanceType::String, ParamType::String),
    (InstanceType::Integer, ParamType::Integer),
    (InstanceType::Number, ParamType::Number),
    (InstanceType::Boolean, ParamType::Boolean),
    (InstanceType::Array, ParamType::Array),
    (InstanceType::Object, ParamType::Object),
    (InstanceType::Null, ParamType::Null),
];

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Null => "null",
        }
    }

    fn from_instance_type(instance: &InstanceType) -> Self {
        TYPE_MAP
            .iter()
            .find(|(i, _)| i == instance)
            .map(|(_, p)| *p)
            .unwrap_or(FALLBACK_TYPE)
    }

    fn from_schema(schema: &Schema) -> Self {
        let Schema::Object(obj) = schema else {
            return FALLBACK_TYPE;
        };
        match &obj.instance_type {
            Some(SingleOrVec::Single(t)) => Self::from_instance_type(t),
            // `Option<T>` renders as `[T, "null"]`; the non-null member wins.
            Some(SingleOrVec::Vec(types)) => types
                .iter()
                .find(|t| **t != InstanceType::Null)
                .or_else(|| types.first())
                .map(Self::from_instance_type)
                .unwrap_or(FALLBACK_TYPE),
            None => FALLBACK_TYPE,
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named parameter of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
}

/// Structured description of a tool as advertised to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSpecification {
    pub name: String,
    /// Trimmed documentation; empty when the tool has none.
    pub description: String,
    /// Parameters in declaration order.
    pub parameters: Vec<Parameter>,
    /// Names of the parameters without a default, in declaration order.
    pub required: Vec<String>,
}

impl CallSpecification {
    pub fn parameter(&self, name: &str) -> Option<ParamType> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.kind)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Replace the documentation-derived description.
    pub fn with_description(mut self, description: impl AsRef<str>) -> Self {
        self.description = description.as_ref().trim().to_string();
        self
    }

    /// JSON-schema object describing the parameters.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), json!({ "type": p.kind.as_str() })))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }

    /// The converse `toolSpec` entry for this tool.
    pub fn to_tool_spec(&self) -> Value {
        json!({
            "toolSpec": {
                "name": self.name,
                "description": self.description,
                "inputSchema": { "json": self.input_schema() },
            }
        })
    }
}

/// Derive the call specification of a tool named `name` whose arguments deserialize into `A`.
///
/// Fails with [`SwarmError::Introspection`] when `A` does not describe a
/// set of named parameters (its schema is not an object).
pub fn generate<A: JsonSchema>(name: impl Into<String>) -> Result<CallSpecification> {
    let name = name.into();
    let root = schemars::schema_for!(A);
    let obj: &SchemaObject = &root.schema;

    let is_object = matches!(
        &obj.instance_type,
        Some(SingleOrVec::Single(t)) if **t == InstanceType::Object
    );
    if !is_object {
        return Err(SwarmError::Introspection {
            tool: name,
            reason: format!(
                "argument type `{}` has no named parameters (schema is not an object)",
                A::schema_name()
            ),
        });
    }

    let description = obj
        .metadata
        .as_ref()
        .and_then(|m| m.description.as_deref())
        .unwrap_or("")
        .trim()
        .to_string();

    let (parameters, required) = match obj.object.as_deref() {
        Some(validation) => {
            let parameters: Vec<Parameter> = validation
                .properties
                .iter()
                .map(|(param, schema)| Parameter {
                    name: param.clone(),
                    kind: ParamType::from_schema(schema),
                })
                .collect();
            let required = parameters
                .iter()
                .filter(|p| validation.required.contains(&p.name))
                .map(|p| p.name.clone())
                .collect();
            (parameters, required)
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(CallSpecification {
        name,
        description,
        parameters,
        required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Primitives {
        s: String,
        i: i64,
        u: u32,
        f: f64,
        b: bool,
        list: Vec<String>,
        map: HashMap<String, i32>,
        nothing: (),
    }

    #[test]
    fn test_primitive_type_mapping() {
        let spec = generate::<Primitives>("primitives").unwrap();
        let kinds: Vec<(&str, ParamType)> = spec
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("s", ParamType::String),
                ("i", ParamType::Integer),
                ("u", ParamType::Integer),
                ("f", ParamType::Number),
                ("b", ParamType::Boolean),
                ("list", ParamType::Array),
                ("map", ParamType::Object),
                ("nothing", ParamType::Null),
            ]
        );
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct WithOptional {
        a: String,
        maybe: Option<i64>,
    }

    #[test]
    fn test_option_is_optional_and_keeps_inner_type() {
        let spec = generate::<WithOptional>("opt").unwrap();
        assert_eq!(spec.parameter("maybe"), Some(ParamType::Integer));
        assert_eq!(spec.required, vec!["a".to_string()]);
    }

    #[test]
    fn test_unknown_schema_falls_back_to_string() {
        #[allow(dead_code)]
        #[derive(Deserialize, JsonSchema)]
        struct Inner {
            x: i32,
        }
        #[allow(dead_code)]
        #[derive(Deserialize, JsonSchema)]
        struct Outer {
            inner: Inner,
            raw: serde_json::Value,
        }

        let spec = generate::<Outer>("outer").unwrap();
        assert_eq!(spec.parameter("inner"), Some(ParamType::String));
        assert_eq!(spec.parameter("raw"), Some(ParamType::String));
    }

    #[test]
    fn test_non_object_is_introspection_error() {
        let err = generate::<String>("bad").unwrap_err();
        assert!(matches!(err, SwarmError::Introspection { ref tool, .. } if tool == "bad"));

        let err = generate::<Vec<i32>>("also_bad").unwrap_err();
        assert!(matches!(err, SwarmError::Introspection { .. }));
    }

    #[test]
    fn test_missing_docs_yield_empty_description() {
        let spec = generate::<WithOptional>("opt").unwrap();
        assert_eq!(spec.description, "");

        let spec = spec.with_description("  Look things up.\n");
        assert_eq!(spec.description, "Look things up.");
    }

    #[test]
    fn test_input_schema_shape() {
        let spec = generate::<WithOptional>("opt").unwrap();
        assert_eq!(
            spec.input_schema(),
            json!({
                "type": "object",
                "properties": {
                    "a": {"type": "string"},
                    "maybe": {"type": "integer"}
                },
                "required": ["a"]
            })
        );
        assert_eq!(spec.to_tool_spec()["toolSpec"]["name"], "opt");
        assert_eq!(
            spec.to_tool_spec()["toolSpec"]["inputSchema"]["json"],
            spec.input_schema()
        );
    }
}

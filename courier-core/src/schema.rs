//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type,
//! enabling type validation before any remote call is made.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (base type plus a validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested configuration block, given as a `Map` or a `List` of at most one `Map`
    Block {
        name: String,
        attributes: Vec<AttributeSchema>,
    },
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                // Extract variant from "Type.variant" format
                let variant = s.split('.').next_back().unwrap_or(s);
                if variants.iter().any(|v| v == variant || s == v) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block { name, attributes }, Value::Map(fields)) => {
                validate_block(name, attributes, fields)
            }

            (AttributeType::Block { name, attributes }, Value::List(items)) => {
                match items.as_slice() {
                    [] => Ok(()),
                    [Value::Map(fields)] => validate_block(name, attributes, fields),
                    [_] => Err(TypeError::TypeMismatch {
                        expected: self.type_name(),
                        got: value.type_name(),
                    }),
                    _ => Err(TypeError::TooManyBlocks {
                        name: name.clone(),
                        count: items.len(),
                    }),
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block { name, .. } => format!("Block({})", name),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

fn validate_block(
    block: &str,
    attributes: &[AttributeSchema],
    fields: &HashMap<String, Value>,
) -> Result<(), TypeError> {
    let wrap = |inner: TypeError| TypeError::BlockError {
        block: block.to_string(),
        inner: Box::new(inner),
    };

    for schema in attributes {
        match fields.get(&schema.name) {
            Some(value) => schema.attr_type.validate(value).map_err(wrap)?,
            None if schema.required => {
                return Err(wrap(TypeError::MissingRequired {
                    name: schema.name.clone(),
                }));
            }
            None => {}
        }
    }

    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();
    for key in keys {
        if !attributes.iter().any(|a| &a.name == key) {
            return Err(wrap(TypeError::UnknownAttribute { name: key.clone() }));
        }
    }

    Ok(())
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Exactly one of {} must be set, found {found}", names.join(", "))]
    ExactlyOneOf { names: Vec<String>, found: usize },

    #[error("Block '{name}' allows at most one item, got {count}")]
    TooManyBlocks { name: String, count: usize },

    #[error("In block '{block}': {inner}")]
    BlockError { block: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }

    /// Whether this value counts as "set" (empty lists do not)
    fn is_set(&self) -> bool {
        !matches!(self, Value::List(items) if items.is_empty())
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the provider only; configuring it is an error
    pub computed: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Provider-side property name (e.g., "ConfirmationUrl")
    pub provider_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            default: None,
            description: None,
            provider_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
    /// Groups of attributes of which exactly one must be set
    pub exactly_one_of: Vec<Vec<String>>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
            exactly_one_of: Vec::new(),
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_exactly_one_of(mut self, names: &[&str]) -> Self {
        self.exactly_one_of
            .push(names.iter().map(|n| n.to_string()).collect());
        self
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        let mut names: Vec<&String> = self.attributes.keys().collect();
        names.sort();

        // Check required attributes
        for name in names {
            let schema = &self.attributes[name];
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        // Type check each attribute
        let mut keys: Vec<&String> = attributes.keys().collect();
        keys.sort();
        for name in keys {
            let value = &attributes[name];
            match self.attributes.get(name) {
                Some(schema) if schema.computed => {
                    errors.push(TypeError::ComputedAttribute { name: name.clone() });
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(e);
                    }
                }
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            }
        }

        for group in &self.exactly_one_of {
            let found = group
                .iter()
                .filter(|name| attributes.get(*name).is_some_and(Value::is_set))
                .count();
            if found != 1 {
                errors.push(TypeError::ExactlyOneOf {
                    names: group.clone(),
                    found,
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// List of strings
    pub fn string_list() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::String))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint_block() -> AttributeType {
        AttributeType::Block {
            name: "endpoint".to_string(),
            attributes: vec![
                AttributeSchema::new("url", AttributeType::String).required(),
                AttributeSchema::new("ports", types::string_list()),
            ],
        }
    }

    fn endpoint(url: &str) -> HashMap<String, Value> {
        [("url".to_string(), Value::String(url.to_string()))]
            .into_iter()
            .collect()
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::Enum(vec!["a".to_string(), "b".to_string()]);
        assert!(t.validate(&Value::String("a".to_string())).is_ok());
        assert!(t.validate(&Value::String("Type.a".to_string())).is_ok());
        assert!(t.validate(&Value::String("c".to_string())).is_err());
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(100)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
    }

    #[test]
    fn custom_type_checks_base_first() {
        let t = types::positive_int();
        let err = t.validate(&Value::String("1".to_string())).unwrap_err();
        assert!(matches!(err, TypeError::TypeMismatch { .. }));
    }

    #[test]
    fn block_accepts_map_or_single_item_list() {
        let t = endpoint_block();
        assert!(t.validate(&Value::Map(endpoint("https://a"))).is_ok());
        assert!(t.validate(&Value::block(endpoint("https://a"))).is_ok());
        assert!(t.validate(&Value::List(vec![])).is_ok());
    }

    #[test]
    fn block_rejects_more_than_one_item() {
        let t = endpoint_block();
        let value = Value::List(vec![
            Value::Map(endpoint("https://a")),
            Value::Map(endpoint("https://b")),
        ]);
        let err = t.validate(&value).unwrap_err();
        assert!(matches!(err, TypeError::TooManyBlocks { count: 2, .. }));
    }

    #[test]
    fn block_reports_missing_nested_attribute() {
        let t = endpoint_block();
        let err = t.validate(&Value::Map(HashMap::new())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "In block 'endpoint': Required attribute 'url' is missing"
        );
    }

    #[test]
    fn block_rejects_unknown_nested_attribute() {
        let t = endpoint_block();
        let mut fields = endpoint("https://a");
        fields.insert("path".to_string(), Value::String("/".to_string()));
        let err = t.validate(&Value::Map(fields)).unwrap_err();
        assert_eq!(err.to_string(), "In block 'endpoint': Unknown attribute 'path'");
    }

    #[test]
    fn block_checks_nested_types() {
        let t = endpoint_block();
        let mut fields = endpoint("https://a");
        fields.insert(
            "ports".to_string(),
            Value::List(vec![Value::String("80".to_string()), Value::Int(443)]),
        );
        let err = t.validate(&Value::Map(fields)).unwrap_err();
        assert!(err.to_string().contains("List item at index 1"));
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("count", types::positive_int()))
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("my-resource".to_string()));
        attrs.insert("count".to_string(), Value::Int(5));
        attrs.insert("enabled".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("bucket")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let attrs = HashMap::new();
        let result = schema.validate(&attrs);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_and_computed_attributes_are_rejected() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("arn", AttributeType::String).computed());

        let mut attrs = HashMap::new();
        attrs.insert("arn".to_string(), Value::String("arn:aws:x".to_string()));
        attrs.insert("colour".to_string(), Value::String("red".to_string()));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], TypeError::ComputedAttribute { name } if name == "arn"));
        assert!(matches!(&errors[1], TypeError::UnknownAttribute { name } if name == "colour"));
    }

    #[test]
    fn exactly_one_of_group() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("a", endpoint_block()))
            .attribute(AttributeSchema::new("b", endpoint_block()))
            .with_exactly_one_of(&["a", "b"]);

        let none = HashMap::new();
        let errors = schema.validate(&none).unwrap_err();
        assert!(matches!(errors[0], TypeError::ExactlyOneOf { found: 0, .. }));

        let mut one = HashMap::new();
        one.insert("a".to_string(), Value::block(endpoint("https://a")));
        one.insert("b".to_string(), Value::List(vec![]));
        assert!(schema.validate(&one).is_ok());

        let mut both = one.clone();
        both.insert("b".to_string(), Value::block(endpoint("https://b")));
        let errors = schema.validate(&both).unwrap_err();
        assert_eq!(errors[0].to_string(), "Exactly one of a, b must be set, found 2");
    }
}

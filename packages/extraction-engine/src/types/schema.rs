//! Declared output shape for extractions.
//!
//! A [`SchemaSpec`] is an ordered mapping of field name to expected type,
//! required flag and default. Order matters: it is preserved through
//! validation and into the prompt rendering.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expected JSON type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    /// JSON-schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Declaration for a single schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Expected type; values of other types are coerced when possible
    pub field_type: FieldType,

    /// Required fields with no default fail validation when absent
    #[serde(default)]
    pub required: bool,

    /// Value inserted when the field is absent from the parsed payload
    #[serde(default)]
    pub default: Option<Value>,
}

impl FieldSpec {
    /// Declare a field of the given type, optional, no default.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn array() -> Self {
        Self::new(FieldType::Array)
    }

    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default used when the field is absent.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Ordered mapping of field declarations.
///
/// # Example
///
/// ```rust,ignore
/// let schema = SchemaSpec::new()
///     .field("product_name", FieldSpec::string().required())
///     .field("price", FieldSpec::number().required())
///     .field("currency", FieldSpec::string().with_default("USD"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    fields: IndexMap<String, FieldSpec>,
}

impl SchemaSpec {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field declaration (builder-style).
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Look up a field declaration by name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Iterate declarations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldSpec)> {
        self.fields.iter()
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of required fields, in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &String> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name)
    }

    /// Render the schema as prompt text.
    ///
    /// One line per field: name, type, and whether it is required or has a
    /// default. This is what gets embedded in the provider instruction.
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|(name, spec)| {
                let mut line = format!("- {} ({})", name, spec.field_type.as_str());
                if spec.required {
                    line.push_str(", required");
                }
                if let Some(default) = &spec.default {
                    line.push_str(&format!(", default: {}", default));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render as a JSON-schema object for providers with structured output.
    pub fn json_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    serde_json::json!({ "type": spec.field_type.as_str() }),
                )
            })
            .collect();

        let required: Vec<&String> = self.required_fields().collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": true,
        })
    }
}

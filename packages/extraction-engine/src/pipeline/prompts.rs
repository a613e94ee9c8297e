//! Provider prompts for schema-driven extraction.
//!
//! Templates use `{placeholder}` substitution via the `format_*` helpers.
//! Specialized strategy presets get their instruction text and default
//! schemas from here.

use crate::types::schema::{FieldSpec, SchemaSpec};

/// System prompt embedding the caller's instruction and schema description.
pub const EXTRACT_SYSTEM_PROMPT: &str = r#"You are a structured data extraction assistant.

Task: {instruction}

Return a single JSON object with exactly these fields:
{schema}

Rules:
- Use only information explicitly present in the content
- Use null for any field the content does not state
- Numbers must be bare JSON numbers, not quoted strings
- Return the JSON object only, with no prose before or after it"#;

/// User message wrapping the source identifier and bounded content.
pub const EXTRACT_USER_PROMPT: &str = r#"Source: {source}

Content:
{content}"#;

/// Fill the system prompt template.
pub fn format_extract_prompt(instruction: &str, schema_description: &str) -> String {
    let instruction = if instruction.is_empty() {
        "Extract the requested fields from the content."
    } else {
        instruction
    };
    EXTRACT_SYSTEM_PROMPT
        .replace("{instruction}", instruction)
        .replace("{schema}", schema_description)
}

/// Fill the user prompt template.
pub fn format_user_prompt(source: &str, content: &str) -> String {
    EXTRACT_USER_PROMPT
        .replace("{source}", source)
        .replace("{content}", content)
}

// =============================================================================
// Specialized strategy presets
// =============================================================================

/// Instruction for the named-entity preset.
pub const ENTITY_INSTRUCTION: &str = "Identify the named entities in the content. \
List every person, organization and location mentioned, along with any dates \
and contact details (emails, phone numbers). Do not invent entities that are \
not explicitly named.";

/// Instruction for the product/pricing preset.
pub const PRICING_INSTRUCTION: &str = "Extract the product offer described in the \
content: the product name, its price as a bare number, the currency, and the \
stated availability. If several offers appear, extract the most prominent one.";

/// Default schema for the named-entity preset.
pub fn entity_schema() -> SchemaSpec {
    SchemaSpec::new()
        .field("people", FieldSpec::array().with_default(serde_json::json!([])))
        .field(
            "organizations",
            FieldSpec::array().required().with_default(serde_json::json!([])),
        )
        .field("locations", FieldSpec::array().with_default(serde_json::json!([])))
        .field("dates", FieldSpec::array().with_default(serde_json::json!([])))
        .field("contacts", FieldSpec::array().with_default(serde_json::json!([])))
}

/// Default schema for the product/pricing preset.
pub fn pricing_schema() -> SchemaSpec {
    SchemaSpec::new()
        .field("product_name", FieldSpec::string().required())
        .field("price", FieldSpec::number().required())
        .field("currency", FieldSpec::string().with_default("USD"))
        .field("availability", FieldSpec::string().with_default("unknown"))
        .field("sku", FieldSpec::string())
}

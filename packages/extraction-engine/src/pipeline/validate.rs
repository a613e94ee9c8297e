//! Schema validation and repair of parsed provider output.
//!
//! Every field declared in the schema appears in the output: coerced when
//! present, defaulted when absent. Un-coercible values fail fast naming the
//! offending field. Fields the schema does not declare pass through
//! unchanged.

use serde_json::{Map, Value};

use crate::error::{ExtractionError, Result};
use crate::types::schema::{FieldType, SchemaSpec};

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    /// Declared fields first (in schema order), pass-through fields after
    pub fields: Map<String, Value>,

    /// Fraction of required fields present without falling back to defaults;
    /// 1.0 when the schema requires nothing
    pub confidence: f32,
}

/// Validate `parsed` against `schema`.
///
/// JSON `null` counts as absent, so repeated validation is a fixed point:
/// optional fields without defaults settle at `null`.
pub fn validate(schema: &SchemaSpec, parsed: &Map<String, Value>) -> Result<Validated> {
    let mut fields = Map::new();
    let mut required_total = 0u32;
    let mut required_present = 0u32;

    for (name, spec) in schema.iter() {
        if spec.required {
            required_total += 1;
        }

        match parsed.get(name).filter(|value| !value.is_null()) {
            Some(value) => {
                let coerced = coerce(value, spec.field_type)
                    .map_err(|reason| ExtractionError::validation(name.clone(), reason))?;
                fields.insert(name.clone(), coerced);
                if spec.required {
                    required_present += 1;
                }
            }
            None => match &spec.default {
                Some(default) => {
                    fields.insert(name.clone(), default.clone());
                }
                None if spec.required => {
                    return Err(ExtractionError::validation(
                        name.clone(),
                        "required field missing with no default",
                    ));
                }
                None => {
                    fields.insert(name.clone(), Value::Null);
                }
            },
        }
    }

    // Permissive policy: undeclared provider output is preserved, not dropped
    for (name, value) in parsed {
        if schema.get(name).is_none() {
            fields.insert(name.clone(), value.clone());
        }
    }

    let confidence = if required_total == 0 {
        1.0
    } else {
        required_present as f32 / required_total as f32
    };

    Ok(Validated { fields, confidence })
}

/// Coerce `value` to `target`, or explain why it cannot be done.
///
/// Coercions are idempotent: a coerced value coerces to itself.
fn coerce(value: &Value, target: FieldType) -> std::result::Result<Value, String> {
    match target {
        FieldType::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(mismatch("string", value)),
        },
        FieldType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("expected number, got non-numeric string `{s}`")),
            _ => Err(mismatch("number", value)),
        },
        FieldType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| Value::from(f as i64))
                .ok_or_else(|| format!("expected integer, got fractional number `{n}`")),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("expected integer, got non-integer string `{s}`")),
            _ => Err(mismatch("integer", value)),
        },
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(format!("expected boolean, got string `{s}`")),
            },
            _ => Err(mismatch("boolean", value)),
        },
        FieldType::Array => {
            if value.is_array() {
                Ok(value.clone())
            } else {
                Err(mismatch("array", value))
            }
        }
        FieldType::Object => {
            if value.is_object() {
                Ok(value.clone())
            } else {
                Err(mismatch("object", value))
            }
        }
    }
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, got {}", type_name(value))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::schema::FieldSpec;
    use proptest::prelude::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn offer_schema() -> SchemaSpec {
        SchemaSpec::new()
            .field("product_name", FieldSpec::string().required())
            .field("price", FieldSpec::number().required())
            .field("currency", FieldSpec::string().with_default("USD"))
            .field("notes", FieldSpec::string())
    }

    #[test]
    fn test_every_declared_field_present_even_for_empty_input() {
        let schema = SchemaSpec::new()
            .field("currency", FieldSpec::string().with_default("USD"))
            .field("notes", FieldSpec::string());

        let validated = validate(&schema, &Map::new()).unwrap();
        assert_eq!(validated.fields["currency"], "USD");
        assert_eq!(validated.fields["notes"], Value::Null);
        assert_eq!(validated.fields.len(), 2);
    }

    #[test]
    fn test_string_price_coerced_to_number() {
        let validated = validate(
            &offer_schema(),
            &map(json!({"product_name": "Widget", "price": "19.99"})),
        )
        .unwrap();

        assert_eq!(validated.fields["price"], json!(19.99));
        assert!((validated.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_uncoercible_value_fails_naming_field() {
        let err = validate(
            &offer_schema(),
            &map(json!({"product_name": "Widget", "price": "call us"})),
        )
        .unwrap_err();

        match err {
            ExtractionError::Validation { ref field, .. } => assert_eq!(field, "price"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_without_default_fails_naming_field() {
        let schema = SchemaSpec::new().field("symbol", FieldSpec::string().required());
        let err = validate(&schema, &Map::new()).unwrap_err();

        assert!(matches!(err, ExtractionError::Validation { ref field, .. } if field == "symbol"));
        assert!(err.to_string().contains("symbol"));
    }

    #[test]
    fn test_null_counts_as_absent() {
        let schema = SchemaSpec::new()
            .field("currency", FieldSpec::string().with_default("USD"))
            .field("symbol", FieldSpec::string().required());

        let err = validate(&schema, &map(json!({"currency": null, "symbol": null}))).unwrap_err();
        assert!(matches!(err, ExtractionError::Validation { ref field, .. } if field == "symbol"));

        let ok = validate(
            &SchemaSpec::new().field("currency", FieldSpec::string().with_default("USD")),
            &map(json!({"currency": null})),
        )
        .unwrap();
        assert_eq!(ok.fields["currency"], "USD");
    }

    #[test]
    fn test_undeclared_fields_pass_through() {
        let validated = validate(
            &offer_schema(),
            &map(json!({
                "product_name": "Widget",
                "price": 5,
                "brand": "Acme",
                "tags": ["a", "b"]
            })),
        )
        .unwrap();

        assert_eq!(validated.fields["brand"], "Acme");
        assert_eq!(validated.fields["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_confidence_counts_defaulted_required_fields_as_missing() {
        let schema = SchemaSpec::new()
            .field("a", FieldSpec::string().required().with_default("x"))
            .field("b", FieldSpec::string().required());

        let validated = validate(&schema, &map(json!({"b": "present"}))).unwrap();
        assert_eq!(validated.fields["a"], "x");
        assert!((validated.confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_confidence_is_one_without_required_fields() {
        let schema = SchemaSpec::new().field("a", FieldSpec::string());
        let validated = validate(&schema, &Map::new()).unwrap();
        assert!((validated.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let parsed = map(json!({
            "product_name": "Widget",
            "price": "19.99",
            "extra": {"nested": true}
        }));

        let first = validate(&offer_schema(), &parsed).unwrap();
        let second = validate(&offer_schema(), &first.fields).unwrap();
        assert_eq!(second.fields, first.fields);
    }

    #[test]
    fn test_coercions() {
        assert_eq!(coerce(&json!(42), FieldType::String).unwrap(), json!("42"));
        assert_eq!(coerce(&json!(true), FieldType::String).unwrap(), json!("true"));
        assert_eq!(coerce(&json!("7"), FieldType::Integer).unwrap(), json!(7));
        assert_eq!(coerce(&json!(7.0), FieldType::Integer).unwrap(), json!(7));
        assert_eq!(
            coerce(&json!("TRUE"), FieldType::Boolean).unwrap(),
            json!(true)
        );
        assert!(coerce(&json!(7.5), FieldType::Integer).is_err());
        assert!(coerce(&json!("yes"), FieldType::Boolean).is_err());
        assert!(coerce(&json!("[]"), FieldType::Array).is_err());
        assert!(coerce(&json!(1), FieldType::Object).is_err());
    }

    fn field_type_strategy() -> impl Strategy<Value = FieldType> {
        prop_oneof![
            Just(FieldType::String),
            Just(FieldType::Number),
            Just(FieldType::Integer),
            Just(FieldType::Boolean),
            Just(FieldType::Array),
            Just(FieldType::Object),
        ]
    }

    fn typed_default(field_type: FieldType) -> Value {
        match field_type {
            FieldType::String => json!("default"),
            FieldType::Number => json!(1.5),
            FieldType::Integer => json!(7),
            FieldType::Boolean => json!(false),
            FieldType::Array => json!([]),
            FieldType::Object => json!({}),
        }
    }

    fn schema_strategy() -> impl Strategy<Value = SchemaSpec> {
        proptest::collection::vec(
            ("[a-e]", field_type_strategy(), any::<bool>(), any::<bool>()),
            0..6,
        )
        .prop_map(|entries| {
            let mut schema = SchemaSpec::new();
            for (name, field_type, required, has_default) in entries {
                let mut spec = FieldSpec::new(field_type);
                if required {
                    spec = spec.required();
                }
                if has_default {
                    spec = spec.with_default(typed_default(field_type));
                }
                schema = schema.field(name, spec);
            }
            schema
        })
    }

    fn parsed_strategy() -> impl Strategy<Value = Map<String, Value>> {
        proptest::collection::vec(
            (
                "[a-g]",
                prop_oneof![
                    Just(json!(null)),
                    Just(json!("text")),
                    Just(json!("19.99")),
                    Just(json!(42)),
                    Just(json!(2.5)),
                    Just(json!(true)),
                    Just(json!([1, 2])),
                    Just(json!({"k": "v"})),
                ],
            ),
            0..8,
        )
        .prop_map(|entries| entries.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_output_contains_every_declared_field(
            schema in schema_strategy(),
            parsed in parsed_strategy(),
        ) {
            if let Ok(validated) = validate(&schema, &parsed) {
                for (name, _) in schema.iter() {
                    prop_assert!(validated.fields.contains_key(name));
                }
            }
        }

        #[test]
        fn prop_validate_is_idempotent(
            schema in schema_strategy(),
            parsed in parsed_strategy(),
        ) {
            if let Ok(first) = validate(&schema, &parsed) {
                let second = validate(&schema, &first.fields).unwrap();
                prop_assert_eq!(second.fields, first.fields);
            }
        }

        #[test]
        fn prop_confidence_in_unit_interval(
            schema in schema_strategy(),
            parsed in parsed_strategy(),
        ) {
            if let Ok(validated) = validate(&schema, &parsed) {
                prop_assert!((0.0..=1.0).contains(&validated.confidence));
            }
        }
    }
}

//! Schema validation helpers.
//!
//! Checks a `serde_json::Value` against a [`Schema`] and reports problems as
//! diagnostics, one per offending attribute.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_instatus::schema::{Attribute, Schema};
//! use hemmer_provider_instatus::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("order", Attribute::optional_computed_int64());
//!
//! let diagnostics = validate(&schema, &json!({"name": "API", "order": 2}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "API", "order": "first"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("order".to_string()));
//! ```

use crate::schema::{Attribute, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per offending attribute, ordered by attribute name.
/// Required attributes must be present and non-null, present values must have
/// the declared type, and computed-only attributes are not checked. A null
/// value is valid; any other non-object is not.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return Vec::new(),
        _ => {
            return vec![Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(value)))];
        },
    };

    let mut attributes: Vec<(&String, &Attribute)> = schema.block.attributes.iter().collect();
    attributes.sort_by(|a, b| a.0.cmp(b.0));

    attributes
        .into_iter()
        .filter(|(_, attr)| !attr.flags.is_computed_only())
        .filter_map(|(name, attr)| check_attribute(name, attr, obj.get(name.as_str())))
        .collect()
}

fn check_attribute(name: &str, attr: &Attribute, value: Option<&Value>) -> Option<Diagnostic> {
    match value.filter(|v| !v.is_null()) {
        None if attr.flags.required => Some(
            Diagnostic::error(format!("Missing required attribute '{}'", name))
                .with_detail("This attribute is required and must be provided")
                .with_attribute(name),
        ),
        Some(v) if !attr.attr_type.matches(v) => Some(
            Diagnostic::error(format!("Invalid type for attribute '{}'", name))
                .with_detail(format!(
                    "Expected {}, got {}",
                    attr.attr_type.name(),
                    value_type_name(v)
                ))
                .with_attribute(name),
        ),
        _ => None,
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
    use serde_json::json;

    fn component_like() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("show_uptime", Attribute::optional_bool())
            .with_attribute("order", Attribute::optional_computed_int64())
    }

    #[test]
    fn test_validate_required_string() {
        let schema = component_like();

        assert!(validate(&schema, &json!({"name": "API"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Missing required"));
    }

    #[test]
    fn test_validate_types() {
        let diagnostics = validate(
            &component_like(),
            &json!({"name": 42, "show_uptime": "yes", "order": 1.5}),
        );

        assert_eq!(diagnostics.len(), 3);
        let attrs: Vec<_> = diagnostics
            .iter()
            .map(|d| d.attribute.clone().unwrap_or_default())
            .collect();
        assert_eq!(attrs, vec!["name", "order", "show_uptime"]);
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("Expected string, got number")
        );
    }

    #[test]
    fn test_computed_only_skipped() {
        let diagnostics = validate(&component_like(), &json!({"name": "API", "id": 12}));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_optional_computed_checked() {
        let schema = Schema::v0().with_attribute(
            "order",
            Attribute::new(AttributeType::Int64, AttributeFlags::OPTIONAL_COMPUTED),
        );
        assert!(validate(&schema, &json!({"order": 3})).is_empty());
        assert_eq!(validate(&schema, &json!({"order": "3"})).len(), 1);
    }

    #[test]
    fn test_null_and_non_object() {
        let schema = component_like();
        assert!(validate(&schema, &Value::Null).is_empty());

        let diagnostics = validate(&schema, &json!(["not", "an", "object"]));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected object");
        assert_eq!(diagnostics[0].detail.as_deref(), Some("Got array"));
    }
}

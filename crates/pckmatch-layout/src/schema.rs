use jsonschema::Validator;
use serde_json::Value;

use crate::error::{LayoutError, Result};

/// JSON Schema (2020-12) every layout document must satisfy.
pub const LAYOUT_SCHEMA: &str = include_str!("../schema/layout.schema.json");

pub(crate) fn compile() -> Result<Validator> {
    let schema: Value = serde_json::from_str(LAYOUT_SCHEMA)?;
    jsonschema::validator_for(&schema).map_err(|err| LayoutError::CompileFailed(err.to_string()))
}

/// Check `document` against the layout schema.
///
/// The first few violations are joined into one message.
pub(crate) fn validate_document(document: &Value) -> Result<()> {
    let validator = compile()?;

    let mut errors = validator.iter_errors(document);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(3) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(LayoutError::ValidationFailed(message));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn embedded_schema_compiles() {
        assert!(compile().is_ok());
    }

    #[test]
    fn accepts_token_and_fixed_framing() {
        let tokens = json!({
            "framing": { "start": "$", "end": "\r\n" },
            "fields": [{ "name": "head", "kind": "string", "size": 3 }]
        });
        assert!(validate_document(&tokens).is_ok());

        let fixed = json!({
            "framing": { "size": 16, "interval_ms": 250 },
            "fields": []
        });
        assert!(validate_document(&fixed).is_ok());
    }

    #[test]
    fn rejects_mixed_framing() {
        let doc = json!({
            "framing": { "end": "\n", "size": 4 },
            "fields": []
        });
        assert!(matches!(
            validate_document(&doc),
            Err(LayoutError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_incomplete_fields() {
        let no_size = json!({
            "framing": { "end": "\n" },
            "fields": [{ "name": "id", "kind": "uint" }]
        });
        assert!(validate_document(&no_size).is_err());

        let no_name = json!({
            "framing": { "end": "\n" },
            "fields": [{ "kind": "byte" }]
        });
        assert!(validate_document(&no_name).is_err());

        let unknown_kind = json!({
            "framing": { "end": "\n" },
            "fields": [{ "name": "x", "kind": "float", "size": 4 }]
        });
        assert!(validate_document(&unknown_kind).is_err());

        let anonymous_span = json!({
            "framing": { "end": "\n" },
            "fields": [{ "kind": "span", "size": 2 }]
        });
        assert!(validate_document(&anonymous_span).is_ok());
    }
}

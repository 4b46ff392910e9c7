use folio_core::FolioError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// String formats accepted by strict structured outputs.
const STRICT_FORMATS: &[&str] = &[
    "date-time", "time", "date", "duration", "email", "hostname", "ipv4", "ipv6", "uuid",
];

/// Build a strict OpenAI `response_format` constraining the reply to `T`'s JSON schema.
pub fn json_schema_format<T: JsonSchema>(name: &str) -> Value {
    let schema = schemars::schema_for!(T);
    let mut schema = serde_json::to_value(&schema).unwrap_or_else(|_| json!({}));
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    make_strict(&mut schema);
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": name,
            "strict": true,
            "schema": schema,
        }
    })
}

/// Rewrite a schema for strict mode: every object closed with all of its
/// properties required, and unsupported `format` annotations removed.
fn make_strict(schema: &mut Value) {
    match schema {
        Value::Object(obj) => {
            let unsupported_format = matches!(
                obj.get("format"),
                Some(Value::String(f)) if !STRICT_FORMATS.contains(&f.as_str())
            );
            if unsupported_format {
                obj.remove("format");
            }

            let required = obj
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| props.keys().cloned().map(Value::String).collect::<Vec<_>>());
            if let Some(required) = required {
                obj.insert("required".to_string(), Value::Array(required));
                obj.insert("additionalProperties".to_string(), Value::Bool(false));
            }

            for (key, child) in obj.iter_mut() {
                match (key.as_str(), child) {
                    // maps from names to schemas; the names themselves are not keywords
                    ("properties" | "$defs" | "definitions", Value::Object(named)) => {
                        named.values_mut().for_each(make_strict);
                    }
                    (_, child) => make_strict(child),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(make_strict),
        _ => {}
    }
}

/// Decode a model's text reply into `T`. An empty reply is a parsing failure.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, FolioError> {
    let json_str = extract_json(text);
    if json_str.is_empty() {
        return Err(FolioError::Parsing("model returned no structured result".to_string()));
    }
    serde_json::from_str::<T>(json_str)
        .map_err(|e| FolioError::Parsing(format!("failed to parse structured output: {e}")))
}

/// Extract JSON from text, handling optional markdown code blocks.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    // Check for ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }
    if let Some(start) = trimmed.find("```") {
        let json_start = start + 3;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }
    trimmed
}

//! Tolerant, schema-driven repair of LLM output.
//!
//! The sanitizer walks a payload alongside its schema document and repairs the
//! drift LLMs routinely produce: synonym or mis-cased enum values, numbers out
//! of range or sent as strings, and commentary fields the schema does not
//! declare. It never fails; anything it cannot repair is left for the
//! validator to reject.
//!
//! Content that already conforms passes through unchanged, including the
//! `is_fallback` marker on static fallback content. Markers in raw model
//! text are removed earlier, by [`crate::normalize::extract`].

use serde_json::{Map, Number, Value};

use super::registry::schema_document;
use super::synonyms::SynonymTables;
use super::{SchemaKind, ValidationError};
use crate::content::ValidatedContent;
use crate::normalize::patterns::normalize_token;
use crate::normalize::NormalizedPayload;

/// Repairs payloads against the embedded schemas.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    synonyms: SynonymTables,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(SynonymTables::builtin())
    }
}

impl Sanitizer {
    /// Create a sanitizer backed by the given synonym tables.
    pub fn new(synonyms: SynonymTables) -> Self {
        Self { synonyms }
    }

    /// The synonym tables in use.
    pub fn synonyms(&self) -> &SynonymTables {
        &self.synonyms
    }

    /// Repair a value against a schema.
    ///
    /// Pure: the same input always yields the same output, and sanitizing an
    /// already sanitized value changes nothing.
    pub fn sanitize_value(&self, value: Value, schema: SchemaKind) -> Value {
        match schema_document(schema) {
            Ok(document) => self.sanitize_node(value, document, schema, None),
            Err(e) => {
                tracing::error!(schema = %schema, error = %e, "Cannot sanitize without schema");
                value
            }
        }
    }

    /// Sanitize a normalized payload, then validate it strictly.
    ///
    /// # Arguments
    ///
    /// * `payload` - Output of the Response Normalizer
    /// * `schema` - Schema the content must satisfy
    ///
    /// # Returns
    ///
    /// * `Ok(ValidatedContent)` - Canonical content, ready for use
    /// * `Err(ValidationError)` - Violations that survived sanitization
    pub fn sanitize_and_validate(
        &self,
        payload: NormalizedPayload,
        schema: SchemaKind,
    ) -> Result<ValidatedContent, ValidationError> {
        let sanitized = self.sanitize_value(payload.into_value(), schema);
        ValidatedContent::validate(schema, sanitized)
    }

    fn sanitize_node(
        &self,
        value: Value,
        node: &Value,
        schema: SchemaKind,
        field: Option<&str>,
    ) -> Value {
        if let Some(allowed) = node.get("enum").and_then(Value::as_array) {
            return self.canonicalize_enum(value, allowed, node.get("default"), schema, field);
        }

        match node.get("type").and_then(Value::as_str) {
            Some("integer") => coerce_number(value, node, true),
            Some("number") => coerce_number(value, node, false),
            Some("string") => match value {
                Value::String(s) => Value::String(s.trim().to_string()),
                other => other,
            },
            Some("array") => match (value, node.get("items")) {
                (Value::Array(items), Some(item_node)) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| self.sanitize_node(item, item_node, schema, field))
                        .collect(),
                ),
                (other, _) => other,
            },
            Some("object") => match value {
                Value::Object(map) => Value::Object(self.sanitize_object(map, node, schema)),
                other => other,
            },
            _ => value,
        }
    }

    fn sanitize_object(&self, map: Map<String, Value>, node: &Value, schema: SchemaKind) -> Map<String, Value> {
        let properties = node.get("properties").and_then(Value::as_object);
        let closed = node.get("additionalProperties") == Some(&Value::Bool(false));
        let required = |key: &str| {
            node.get("required")
                .and_then(Value::as_array)
                .is_some_and(|r| r.iter().any(|k| k.as_str() == Some(key)))
        };

        let mut out = Map::new();
        for (key, value) in map {
            // An explicit null for an optional field means "absent".
            if value.is_null() && !required(&key) {
                tracing::debug!(schema = %schema, field = %key, "Dropping null optional field");
                continue;
            }
            match properties.and_then(|p| p.get(&key)) {
                Some(property) => {
                    let repaired = self.sanitize_node(value, property, schema, Some(&key));
                    out.insert(key, repaired);
                }
                None if closed => {
                    tracing::debug!(schema = %schema, field = %key, "Dropping undeclared field");
                }
                None => {
                    out.insert(key, value);
                }
            }
        }
        out
    }

    fn canonicalize_enum(
        &self,
        value: Value,
        allowed: &[Value],
        default: Option<&Value>,
        schema: SchemaKind,
        field: Option<&str>,
    ) -> Value {
        if let Value::String(raw) = &value {
            let token = normalize_token(raw);

            let direct = allowed
                .iter()
                .filter_map(Value::as_str)
                .find(|canonical| normalize_token(canonical) == token);
            if let Some(canonical) = direct {
                return Value::String(canonical.to_string());
            }

            let synonym = field
                .and_then(|f| self.synonyms.lookup(schema.name(), f, raw))
                .filter(|canonical| allowed.iter().any(|a| a.as_str() == Some(*canonical)));
            if let Some(canonical) = synonym {
                return Value::String(canonical.to_string());
            }
        }

        let fallback = default
            .filter(|d| allowed.contains(d))
            .or_else(|| allowed.first())
            .cloned()
            .unwrap_or(value.clone());

        tracing::debug!(
            schema = %schema,
            field = field.unwrap_or("<root>"),
            original = %value,
            replacement = %fallback,
            "Unrecognized enum value replaced with default"
        );
        fallback
    }
}

/// Read a number or numeric string, round integers, clamp into the declared
/// range. Anything unreadable is returned untouched.
fn coerce_number(value: Value, node: &Value, integer: bool) -> Value {
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(mut number) = parsed.filter(|n| n.is_finite()) else {
        return value;
    };

    if integer {
        number = number.round();
    }
    if let Some(min) = node.get("minimum").and_then(Value::as_f64) {
        number = number.max(min);
    }
    if let Some(max) = node.get("maximum").and_then(Value::as_f64) {
        number = number.min(max);
    }

    if integer {
        Value::from(number as i64)
    } else {
        Number::from_f64(number).map(Value::Number).unwrap_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn module(difficulty: &str, order: Value, hours: Value) -> Value {
        json!({
            "title": "Module",
            "description": "Learn",
            "difficulty": difficulty,
            "order": order,
            "estimated_hours": hours,
            "topics": ["a"]
        })
    }

    /// Every enum field that carries a synonym table.
    const ENUM_FIELDS: [(SchemaKind, &str); 4] = [
        (SchemaKind::RoadmapModules, "difficulty"),
        (SchemaKind::RoadmapModules, "status"),
        (SchemaKind::QuizQuestions, "difficulty"),
        (SchemaKind::Lesson, "content_type"),
    ];

    /// Sanitize one enum field set to `raw` and return its repaired value.
    fn sanitize_field(sanitizer: &Sanitizer, schema: SchemaKind, field: &str, raw: &str) -> Value {
        let mut object = Map::new();
        object.insert(field.to_string(), json!(raw));
        match schema {
            SchemaKind::Lesson => {
                let out = sanitizer.sanitize_value(Value::Object(object), schema);
                out[field].clone()
            }
            _ => {
                let out = sanitizer.sanitize_value(json!([object]), schema);
                out[0][field].clone()
            }
        }
    }

    fn sanitize_module(module: Value) -> Value {
        let sanitizer = Sanitizer::default();
        let out = sanitizer.sanitize_value(json!([module]), SchemaKind::RoadmapModules);
        out[0].clone()
    }

    #[test]
    fn test_synonyms_map_to_canonical() {
        for (raw, canonical) in [
            ("medium", "Med"),
            ("MED", "Med"),
            ("  Intermediate ", "Med"),
            ("beginner", "Low"),
            ("low_medium", "Low-Med"),
            ("Upper Intermediate", "Med-High"),
            ("advanced", "High"),
        ] {
            let out = sanitize_module(module(raw, json!(1), json!(1)));
            assert_eq!(out["difficulty"], canonical, "raw value {:?}", raw);
        }
    }

    #[test]
    fn test_unknown_enum_uses_schema_default() {
        let out = sanitize_module(module("legendary", json!(1), json!(1)));
        assert_eq!(out["difficulty"], "Med");

        let mut non_string = module("Med", json!(1), json!(1));
        non_string["difficulty"] = json!(3);
        assert_eq!(sanitize_module(non_string)["difficulty"], "Med");
    }

    #[test]
    fn test_status_tokens_normalized() {
        for raw in ["In Progress", "in_progress", "in-progress", "ongoing"] {
            let mut m = module("Med", json!(1), json!(1));
            m["status"] = json!(raw);
            assert_eq!(sanitize_module(m)["status"], "in_progress");
        }
    }

    #[test]
    fn test_numbers_clamped_and_coerced() {
        let out = sanitize_module(module("Med", json!(0), json!(400)));
        assert_eq!(out["order"], 1);
        assert_eq!(out["estimated_hours"], 200);

        let out = sanitize_module(module("Med", json!("7"), json!(12.6)));
        assert_eq!(out["order"], 7);
        assert_eq!(out["estimated_hours"], 13);
    }

    #[test]
    fn test_unreadable_number_left_for_validator() {
        let out = sanitize_module(module("Med", json!("first"), json!(5)));
        assert_eq!(out["order"], "first");
    }

    #[test]
    fn test_undeclared_fields_dropped() {
        let mut m = module("Med", json!(1), json!(1));
        m["commentary"] = json!("Hope this helps!");
        let out = sanitize_module(m);
        assert!(out.get("commentary").is_none());
        assert_eq!(out["title"], "Module");
    }

    #[test]
    fn test_null_optional_fields_dropped() {
        let mut m = module("Med", json!(1), json!(1));
        m["resources"] = Value::Null;
        m["status"] = Value::Null;
        let out = sanitize_module(m);
        assert!(out.get("resources").is_none());
        assert!(out.get("status").is_none());

        let lesson = json!({
            "title": "Joins",
            "summary": "Combining tables",
            "content_type": "reading",
            "duration_minutes": 30,
            "sections": [{"heading": "Inner", "body": "Matching rows."}],
            "key_takeaways": null
        });
        let payload = NormalizedPayload::new(crate::normalize::ContainerKind::Object, lesson).unwrap();
        let content = Sanitizer::default()
            .sanitize_and_validate(payload, SchemaKind::Lesson)
            .unwrap();
        assert!(content.value().get("key_takeaways").is_none());
    }

    #[test]
    fn test_null_required_field_still_rejected() {
        let mut m = module("Med", json!(1), json!(1));
        m["title"] = Value::Null;
        let items = json!([m.clone(), m.clone(), m]);
        let payload = NormalizedPayload::new(crate::normalize::ContainerKind::Array, items).unwrap();
        let result = Sanitizer::default().sanitize_and_validate(payload, SchemaKind::RoadmapModules);
        assert!(result.is_err());
    }

    #[test]
    fn test_fallback_content_survives_resanitizing() {
        let sanitizer = Sanitizer::default();
        let context = crate::fallback::FallbackContext::new("Marine biology");
        for schema in SchemaKind::ALL {
            let fallback = crate::fallback::FallbackProvider::new().fallback(schema, &context);
            assert!(fallback.is_fallback());

            let payload = NormalizedPayload::new(schema.container_kind(), fallback.value().clone()).unwrap();
            let again = sanitizer.sanitize_and_validate(payload, schema).unwrap();
            assert!(again.is_fallback(), "{} lost its fallback marker", schema);
            assert_eq!(again.value(), fallback.value());
        }
    }

    #[test]
    fn test_validated_content_revalidates_unchanged() {
        let sanitizer = Sanitizer::default();
        let raw = json!([
            module("beginner", json!("1"), json!(30.4)),
            module("Medium", json!(2), json!(500)),
            module("expert", json!(40), json!(0)),
        ]);
        let payload = NormalizedPayload::new(crate::normalize::ContainerKind::Array, raw).unwrap();
        let first = sanitizer.sanitize_and_validate(payload, SchemaKind::RoadmapModules).unwrap();
        assert!(!first.is_fallback());

        let payload = NormalizedPayload::new(crate::normalize::ContainerKind::Array, first.value().clone()).unwrap();
        let second = sanitizer.sanitize_and_validate(payload, SchemaKind::RoadmapModules).unwrap();
        assert_eq!(second.value(), first.value());
        assert!(!second.is_fallback());
    }

    #[test]
    fn test_nested_lesson_sections_sanitized() {
        let sanitizer = Sanitizer::default();
        let lesson = json!({
            "title": " Ownership ",
            "summary": "Memory",
            "content_type": "Hands-On",
            "duration_minutes": 1,
            "sections": [{"heading": "Moves", "body": "Values move.", "note": "extra"}]
        });
        let out = sanitizer.sanitize_value(lesson, SchemaKind::Lesson);
        assert_eq!(out["title"], "Ownership");
        assert_eq!(out["content_type"], "exercise");
        assert_eq!(out["duration_minutes"], 5);
        assert!(out["sections"][0].get("note").is_none());
    }

    #[test]
    fn test_sanitize_and_validate_rejects_missing_fields() {
        let payload = NormalizedPayload::new(
            crate::normalize::ContainerKind::Array,
            json!([{"title": "Only a title"}]),
        )
        .unwrap();
        let err = Sanitizer::default()
            .sanitize_and_validate(payload, SchemaKind::RoadmapModules)
            .unwrap_err();
        assert_eq!(err.code(), "schema_violation");
    }

    #[test]
    fn test_custom_tables_used() {
        let tables =
            SynonymTables::from_yaml("quiz_questions:\n  difficulty:\n    hard: [spicy]\n").unwrap();
        let sanitizer = Sanitizer::new(tables);
        let question = json!([{
            "question": "q",
            "options": ["a", "b", "c", "d"],
            "correct_answer": 9,
            "explanation": "e",
            "difficulty": "Spicy"
        }]);
        let out = sanitizer.sanitize_value(question, SchemaKind::QuizQuestions);
        assert_eq!(out[0]["difficulty"], "hard");
        assert_eq!(out[0]["correct_answer"], 3);
    }

    proptest! {
        #[test]
        fn prop_declared_synonym_maps_to_canonical(table in 0usize..ENUM_FIELDS.len(), index in 0usize..256) {
            let sanitizer = Sanitizer::default();
            let (schema, field) = ENUM_FIELDS[table];
            let pairs = sanitizer.synonyms().pairs(schema.name(), field);
            prop_assert!(!pairs.is_empty(), "no synonyms declared for {}.{}", schema, field);

            let (synonym, canonical) = &pairs[index % pairs.len()];
            let out = sanitize_field(&sanitizer, schema, field, synonym);
            prop_assert_eq!(out.as_str(), Some(canonical.as_str()));
        }

        #[test]
        fn prop_order_always_in_range(order in -1_000_000i64..1_000_000) {
            let out = sanitize_module(module("Med", json!(order), json!(10)));
            let sanitized = out["order"].as_i64().unwrap();
            prop_assert!((1..=20).contains(&sanitized));
        }

        #[test]
        fn prop_sanitize_is_idempotent(
            difficulty in "[A-Za-z _-]{0,16}",
            order in -50i64..50,
            hours in -10.0f64..500.0,
        ) {
            let sanitizer = Sanitizer::default();
            let input = json!([module(&difficulty, json!(order), json!(hours))]);
            let once = sanitizer.sanitize_value(input, SchemaKind::RoadmapModules);
            let twice = sanitizer.sanitize_value(once.clone(), SchemaKind::RoadmapModules);
            prop_assert_eq!(once, twice);
        }
    }
}

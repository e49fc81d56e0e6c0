use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::schema::{FieldFormat, Schema, ValidationMode};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// A submission that passed validation: one trimmed value per schema field,
/// in schema order. Absent optional fields are empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<(String, String)>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(_, v)| v.as_str())
    }
}

/// Check `raw` against `schema`. Either every field passes and a `Record`
/// comes back, or nothing does and all violations come back.
pub fn validate(
    raw: &Value,
    schema: &Schema,
    mode: ValidationMode,
) -> Result<Record, Vec<FieldViolation>> {
    let Some(obj) = raw.as_object() else {
        return Err(vec![FieldViolation::new(
            "_body",
            "Submission must be an object",
        )]);
    };

    let mut values = Vec::with_capacity(schema.fields().len());
    let mut violations = Vec::new();

    for spec in schema.fields() {
        let name = spec.name.as_str();

        let value = match obj.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
            Some(Value::Array(_) | Value::Object(_)) => {
                violations.push(FieldViolation::new(name, "must be a string"));
                continue;
            }
        };

        if value.is_empty() {
            if spec.required {
                violations.push(FieldViolation::new(name, "is required"));
            } else {
                values.push((spec.name.clone(), value));
            }
            continue;
        }

        if mode == ValidationMode::Strict {
            if let Some(message) = check_format(&value, &spec.format) {
                violations.push(FieldViolation::new(name, message));
                continue;
            }
        }

        values.push((spec.name.clone(), value));
    }

    if violations.is_empty() {
        Ok(Record { values })
    } else {
        Err(violations)
    }
}

fn check_format(value: &str, format: &FieldFormat) -> Option<String> {
    match format {
        FieldFormat::Text => None,
        FieldFormat::Email if !EMAIL_RE.is_match(value) => {
            Some("must be a valid email address".to_string())
        }
        FieldFormat::Email => None,
        FieldFormat::UrlPrefix(prefix) => {
            let ok = value.len() > prefix.len() && value.starts_with(prefix.as_str());
            (!ok).then(|| format!("must start with {prefix}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enrollment_body() -> Value {
        json!({
            "surname": "Petrov",
            "name": "Ivan",
            "patronymic": "Sergeevich",
            "vkLink": "https://vk.com/ivan",
            "phone": "+79001234567",
            "email": "ivan@example.com",
            "faculty": "Physics",
        })
    }

    #[test]
    fn accepts_complete_contact_submission() {
        let record = validate(
            &json!({"name": " Ann ", "email": "ann@example.com", "message": "Hi"}),
            &Schema::contact(),
            ValidationMode::Strict,
        )
        .unwrap();
        assert_eq!(record.values().collect::<Vec<_>>(), ["Ann", "ann@example.com", "Hi"]);
        assert_eq!(record.get("name"), Some("Ann"));
    }

    #[test]
    fn collects_every_missing_field() {
        let err = validate(
            &json!({"name": "", "message": "   "}),
            &Schema::contact(),
            ValidationMode::Basic,
        )
        .unwrap_err();
        let fields: Vec<_> = err.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["name", "email", "message"]);
        assert!(err.iter().all(|v| v.message == "is required"));
    }

    #[test]
    fn strict_mode_checks_email_shape() {
        let body = json!({"name": "Ann", "email": "not-an-email", "message": "Hi"});
        let err = validate(&body, &Schema::contact(), ValidationMode::Strict).unwrap_err();
        assert_eq!(err, vec![FieldViolation::new("email", "must be a valid email address")]);

        // basic mode only checks presence
        assert!(validate(&body, &Schema::contact(), ValidationMode::Basic).is_ok());
    }

    #[test]
    fn strict_mode_checks_vk_prefix() {
        let schema = Schema::enrollment();
        assert!(validate(&enrollment_body(), &schema, ValidationMode::Strict).is_ok());

        let mut body = enrollment_body();
        body["vkLink"] = json!("http://vk.com/ivan");
        let err = validate(&body, &schema, ValidationMode::Strict).unwrap_err();
        assert_eq!(err[0].field, "vkLink");

        body["vkLink"] = json!("https://vk.com/");
        assert!(validate(&body, &schema, ValidationMode::Strict).is_err());
    }

    #[test]
    fn optional_email_may_be_absent_but_not_malformed() {
        let schema = Schema::enrollment();
        let mut body = enrollment_body();
        body.as_object_mut().unwrap().remove("email");
        let record = validate(&body, &schema, ValidationMode::Strict).unwrap();
        assert_eq!(record.get("email"), Some(""));

        body["email"] = json!("ivan-at-example");
        assert!(validate(&body, &schema, ValidationMode::Strict).is_err());
    }

    #[test]
    fn scalars_are_stringified_and_structures_rejected() {
        let mut body = enrollment_body();
        body["phone"] = json!(79001234567u64);
        let record = validate(&body, &Schema::enrollment(), ValidationMode::Strict).unwrap();
        assert_eq!(record.get("phone"), Some("79001234567"));

        body["faculty"] = json!(["Physics"]);
        let err = validate(&body, &Schema::enrollment(), ValidationMode::Strict).unwrap_err();
        assert_eq!(err, vec![FieldViolation::new("faculty", "must be a string")]);
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = validate(&json!(["a"]), &Schema::contact(), ValidationMode::Basic).unwrap_err();
        assert_eq!(err[0].field, "_body");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let record = validate(
            &json!({"name": "Ann", "email": "a@b.co", "message": "m", "extra": "x"}),
            &Schema::contact(),
            ValidationMode::Strict,
        )
        .unwrap();
        assert_eq!(record.values().count(), 3);
        assert_eq!(record.get("extra"), None);
    }
}

use serde::Deserialize;

use crate::error::ConfigError;

pub const VK_PREFIX: &str = "https://vk.com/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFormat {
    Text,
    Email,
    /// Value must start with the prefix and carry something after it.
    UrlPrefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub required: bool,
    pub format: FieldFormat,
}

impl FieldSpec {
    fn required(name: &str, format: FieldFormat) -> Self {
        Self {
            name: name.to_string(),
            required: true,
            format,
        }
    }

    fn optional(name: &str, format: FieldFormat) -> Self {
        Self {
            name: name.to_string(),
            required: false,
            format,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Presence checks only.
    Basic,
    /// Presence plus format checks.
    Strict,
}

/// Ordered field list. Column order in the sheet follows this order, after
/// the timestamp column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFieldSpec {
    name: String,
    #[serde(default = "default_required")]
    required: bool,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
}

fn default_required() -> bool {
    true
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, ConfigError> {
        if fields.is_empty() {
            return Err(ConfigError::Invalid("Form schema has no fields".to_string()));
        }
        for (i, field) in fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Form schema field #{i} has an empty name"
                )));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(ConfigError::Invalid(format!(
                    "Form schema field '{}' is declared twice",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    /// `contact`: name, email, message (timestamp + 3 columns, A:D).
    pub fn contact() -> Self {
        Self {
            fields: vec![
                FieldSpec::required("name", FieldFormat::Text),
                FieldSpec::required("email", FieldFormat::Email),
                FieldSpec::required("message", FieldFormat::Text),
            ],
        }
    }

    /// `enrollment`: student sign-up form (timestamp + 7 columns, A:H).
    /// `email` stays in the column layout but is not required.
    pub fn enrollment() -> Self {
        Self {
            fields: vec![
                FieldSpec::required("surname", FieldFormat::Text),
                FieldSpec::required("name", FieldFormat::Text),
                FieldSpec::required("patronymic", FieldFormat::Text),
                FieldSpec::required("vkLink", FieldFormat::UrlPrefix(VK_PREFIX.to_string())),
                FieldSpec::required("phone", FieldFormat::Text),
                FieldSpec::optional("email", FieldFormat::Email),
                FieldSpec::required("faculty", FieldFormat::Text),
            ],
        }
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "contact" => Some(Self::contact()),
            "enrollment" => Some(Self::enrollment()),
            _ => None,
        }
    }

    /// Parse a custom schema, e.g.
    /// `[{"name":"site","format":"url","prefix":"https://"}]`.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let raw: Vec<RawFieldSpec> = serde_json::from_str(input)
            .map_err(|e| ConfigError::Invalid(format!("Invalid FORMSHEET_FIELDS: {e}")))?;

        let fields = raw
            .into_iter()
            .map(|f| {
                let format = match (f.format.as_deref().unwrap_or("text"), f.prefix) {
                    ("text", None) => FieldFormat::Text,
                    ("email", None) => FieldFormat::Email,
                    ("url", Some(prefix)) if !prefix.is_empty() => FieldFormat::UrlPrefix(prefix),
                    ("text" | "email", Some(_)) => {
                        return Err(ConfigError::Invalid(format!(
                            "FORMSHEET_FIELDS: field '{}' has a prefix but is not a url field",
                            f.name
                        )));
                    }
                    ("url", _) => {
                        return Err(ConfigError::Invalid(format!(
                            "FORMSHEET_FIELDS: url field '{}' needs a non-empty prefix",
                            f.name
                        )));
                    }
                    (other, _) => {
                        return Err(ConfigError::Invalid(format!(
                            "FORMSHEET_FIELDS: field '{}' has unsupported format '{other}'",
                            f.name
                        )));
                    }
                };
                Ok(FieldSpec {
                    name: f.name,
                    required: f.required,
                    format,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(fields)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Columns written per row, timestamp included.
    pub fn column_count(&self) -> usize {
        self.fields.len() + 1
    }
}

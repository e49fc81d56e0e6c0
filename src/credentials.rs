use std::path::Path;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;

use crate::error::ConfigError;

pub const CREDENTIALS_BASE64_VAR: &str = "GOOGLE_CREDENTIALS_BASE64";
pub const CREDENTIALS_FILE_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Standard alphabet, trailing `=` optional. Blobs pasted into dashboards
/// frequently lose their padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Google service-account key, as downloaded from the cloud console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .finish()
    }
}

impl ServiceAccount {
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let account: ServiceAccount = serde_json::from_str(input)
            .map_err(|e| ConfigError::Invalid(format!("Invalid service account JSON: {e}")))?;

        if account.client_email.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Service account client_email is empty".to_string(),
            ));
        }
        if account.private_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Service account private_key is empty".to_string(),
            ));
        }

        Ok(account)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = LENIENT_BASE64.decode(compact.as_bytes()).map_err(|e| {
            ConfigError::Invalid(format!("Invalid base64 in {CREDENTIALS_BASE64_VAR}: {e}"))
        })?;
        let json = String::from_utf8(bytes).map_err(|e| {
            ConfigError::Invalid(format!("Decoded {CREDENTIALS_BASE64_VAR} is not UTF-8: {e}"))
        })?;
        Self::from_json(&json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Invalid(format!(
                "Cannot read credentials file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }
}

/// Load the service account from the environment. The base64 variable wins
/// over the key file path. `Ok(None)` means neither is set.
pub fn load_from_env() -> Result<Option<ServiceAccount>, ConfigError> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Same as [`load_from_env`], reading variables through `get`.
pub fn load_from_lookup(
    get: impl Fn(&str) -> Option<String>,
) -> Result<Option<ServiceAccount>, ConfigError> {
    let encoded = get(CREDENTIALS_BASE64_VAR).filter(|s| !s.trim().is_empty());
    let file = get(CREDENTIALS_FILE_VAR).filter(|s| !s.trim().is_empty());

    match (encoded, file) {
        (Some(encoded), _) => ServiceAccount::from_base64(&encoded).map(Some),
        (None, Some(path)) => ServiceAccount::from_file(Path::new(path.trim())).map(Some),
        (None, None) => Ok(None),
    }
}

//! Backend configuration read from the environment.

use super::BackendError;

/// Environment variable names, in reporting order.
pub const ENV_KEYS: [&str; 6] = [
    "PULSE_BACKEND_API_KEY",
    "PULSE_BACKEND_AUTH_DOMAIN",
    "PULSE_BACKEND_PROJECT_ID",
    "PULSE_BACKEND_STORAGE_BUCKET",
    "PULSE_BACKEND_MESSAGING_SENDER_ID",
    "PULSE_BACKEND_APP_ID",
];

/// A complete backend configuration. All fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

impl BackendConfig {
    /// Read the process environment. `.env` is loaded once at startup by `app::run`.
    pub fn from_env() -> Result<Self, BackendError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BackendError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let values: Vec<Option<String>> = ENV_KEYS
            .iter()
            .map(|key| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
            .collect();

        let missing: Vec<&str> = ENV_KEYS
            .iter()
            .zip(&values)
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(BackendError::Unconfigured(format!(
                "missing {} in environment (.env)",
                missing.join(", ")
            )));
        }

        let mut it = values.into_iter().flatten();
        let mut next = || it.next().unwrap_or_default();
        Ok(Self {
            api_key: next(),
            auth_domain: next(),
            project_id: next(),
            storage_bucket: next(),
            messaging_sender_id: next(),
            app_id: next(),
        })
    }
}

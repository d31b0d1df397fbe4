//! Environment-based application settings.
//!
//! Resolution order, later wins:
//! 1. Per-environment defaults selected by `APP_ENV` (`local`, `e2e`, `prod`)
//! 2. `openai-api-key` from the secrets file (`SECRETS_PATH`, default `./secrets.json`)
//! 3. `LLM_API_KEY`, `LLM_BASE_URL`, `LLM_MODEL` and `LOG_LEVEL` environment variables

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SettingsError;

/// Default location of the secrets file.
pub const DEFAULT_SECRETS_PATH: &str = "secrets.json";

/// Key in the secrets file holding the model API key.
const SECRETS_API_KEY: &str = "openai-api-key";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    E2e,
    Prod,
}

impl Environment {
    /// Parse an environment name; unknown names fall back to `Local`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "local" => Environment::Local,
            "e2e" => Environment::E2e,
            "prod" => Environment::Prod,
            other => {
                warn!(environment = other, "Unknown environment, falling back to local settings");
                Environment::Local
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::E2e => "e2e",
            Environment::Prod => "prod",
        }
    }
}

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub environment: Environment,
    /// API key for the model endpoint; `None` sends no auth header.
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub log_level: String,
}

impl Default for Settings {
    /// Environment-independent base settings, pointing at a local Ollama.
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            llm_api_key: Some("ollama".to_string()),
            llm_base_url: "http://localhost:11434/v1".to_string(),
            llm_model: "gpt-oss:20b".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Defaults for the given environment.
    pub fn for_environment(environment: Environment) -> Self {
        let base = Self {
            environment,
            llm_api_key: None,
            llm_base_url: "https://api.openai.com/v1".to_string(),
            ..Self::default()
        };
        match environment {
            Environment::Local => Self {
                llm_model: "gpt-5.2".to_string(),
                ..base
            },
            Environment::E2e | Environment::Prod => base,
        }
    }

    /// Resolve settings from the process environment and the secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the secrets file exists but cannot be read or
    /// parsed. A missing secrets file is only logged.
    pub fn load() -> Result<Self, SettingsError> {
        let environment =
            Environment::from_name(&env::var("APP_ENV").unwrap_or_else(|_| "local".to_string()));
        let secrets_path = env::var("SECRETS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SECRETS_PATH));

        let mut settings = Self::for_environment(environment);
        settings.apply_secrets(&secrets_path)?;
        settings.apply_overrides(|key| env::var(key).ok());
        Ok(settings)
    }

    /// Take the API key from a secrets file, if one exists.
    pub fn apply_secrets(&mut self, path: &Path) -> Result<(), SettingsError> {
        if !path.exists() {
            warn!(path = %path.display(), "Secrets file not found");
            return Ok(());
        }

        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::SecretsRead {
            path: display.clone(),
            source,
        })?;
        let secrets: HashMap<String, serde_json::Value> =
            serde_json::from_str(&content).map_err(|source| SettingsError::SecretsParse {
                path: display,
                source,
            })?;

        let api_key = secrets.get(SECRETS_API_KEY).and_then(|v| v.as_str());
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.llm_api_key = Some(key.to_string());
        }
        Ok(())
    }

    /// Apply variable overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(key) = get("LLM_API_KEY") {
            self.llm_api_key = Some(key);
        }
        if let Some(url) = get("LLM_BASE_URL") {
            self.llm_base_url = url;
        }
        if let Some(model) = get("LLM_MODEL") {
            self.llm_model = model;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_environment_defaults() {
        let local = Settings::for_environment(Environment::Local);
        assert_eq!(local.llm_model, "gpt-5.2");
        assert_eq!(local.llm_base_url, "https://api.openai.com/v1");
        assert_eq!(local.llm_api_key, None);

        let prod = Settings::for_environment(Environment::Prod);
        assert_eq!(prod.llm_model, "gpt-oss:20b");
        assert_eq!(prod.environment, Environment::Prod);
    }

    #[test]
    fn test_unknown_environment_falls_back_to_local() {
        assert_eq!(Environment::from_name("staging"), Environment::Local);
        assert_eq!(Environment::from_name("E2E"), Environment::E2e);
    }

    #[test]
    fn test_secrets_file_sets_api_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"openai-api-key": "sk-test"}}"#).unwrap();

        let mut settings = Settings::for_environment(Environment::Local);
        settings.apply_secrets(file.path()).unwrap();
        assert_eq!(settings.llm_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_missing_secrets_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings
            .apply_secrets(&dir.path().join("secrets.json"))
            .unwrap();
        assert_eq!(settings.llm_api_key.as_deref(), Some("ollama"));
    }

    #[test]
    fn test_malformed_secrets_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Settings::default().apply_secrets(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::SecretsParse { .. }));
    }

    #[test]
    fn test_overrides_win_and_blank_values_are_ignored() {
        let mut settings = Settings::for_environment(Environment::Local);
        settings.apply_overrides(|key| match key {
            "LLM_MODEL" => Some("llama3".to_string()),
            "LLM_BASE_URL" => Some(String::new()),
            "LOG_LEVEL" => Some("DEBUG".to_string()),
            _ => None,
        });

        assert_eq!(settings.llm_model, "llama3");
        assert_eq!(settings.llm_base_url, "https://api.openai.com/v1");
        assert_eq!(settings.log_level, "debug");
    }
}

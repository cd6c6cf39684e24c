//! Configuration for a fill run
//!
//! Values come from three layers, later ones winning: an optional TOML file,
//! environment variables (read once), and whatever the caller sets through the
//! `with_*` builders (the CLI maps its flags onto those).
//!
//! ```toml
//! database_url = "duckdb:///var/data/app.duckdb"
//! exclude_tables = ["schema_migrations"]
//!
//! [llm]
//! model = "gpt-4o-mini"
//! timeout_seconds = 60
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FillError, FillResult};
use crate::generator::GeneratorSettings;

/// Environment variable holding the completion API key
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable overriding the model identifier
pub const ENV_MODEL: &str = "FILLME_MODEL";
/// Environment variable overriding the completion API base URL
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
/// Environment variable holding the database URL
pub const ENV_DATABASE_URL: &str = "FILLME_DATABASE_URL";

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Chat-completion service settings
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key for the completion service
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Sampling temperature; the service default applies when unset
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            temperature: None,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Configuration for one fill run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillConfig {
    /// Database URL (`duckdb:///path`, `duckdb::memory:` or a file path)
    #[serde(default)]
    pub database_url: Option<String>,

    /// Schema to reflect; backend default when unset
    #[serde(default)]
    pub schema: Option<String>,

    /// Tables left out of reflection, matched by exact name
    #[serde(default)]
    pub exclude_tables: BTreeSet<String>,

    /// Completion service settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Remove a surrounding Markdown code fence from the generated SQL
    #[serde(default)]
    pub strip_code_fences: bool,

    /// Generate SQL without executing it
    #[serde(default)]
    pub dry_run: bool,
}

impl FillConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> FillResult<Self> {
        toml::from_str(text)
            .map_err(|e| FillError::Configuration(format!("invalid config file: {e}")))
    }

    /// Load a TOML config file
    pub fn load(path: impl AsRef<Path>) -> FillResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FillError::Configuration(format!("could not read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// Empty values are ignored.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = get(ENV_MODEL) {
            self.llm.model = model;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.llm.base_url = url;
        }
        if let Some(url) = get(ENV_DATABASE_URL) {
            self.database_url = Some(url);
        }
        self
    }

    /// Set the database URL
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Set the schema to reflect
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add tables to the exclusion set
    pub fn with_excluded_tables<S: Into<String>>(mut self, tables: impl IntoIterator<Item = S>) -> Self {
        self.exclude_tables.extend(tables.into_iter().map(Into::into));
        self
    }

    /// Set the completion API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.llm.api_key = Some(api_key.into());
        self
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.model = model.into();
        self
    }

    /// Set the completion API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.llm.base_url = base_url.into();
        self
    }

    /// Set timeout in seconds
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.llm.timeout_seconds = seconds;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.llm.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    /// Enable code fence stripping
    pub fn with_strip_code_fences(mut self, strip: bool) -> Self {
        self.strip_code_fences = strip;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Database URL, or a configuration error when none was given
    pub fn require_database_url(&self) -> FillResult<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                FillError::Configuration(
                    "no database URL given (use --db-url or FILLME_DATABASE_URL)".to_string(),
                )
            })
    }

    /// Settings for the dummy-data generator
    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            api_key: self.llm.api_key.clone(),
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            strip_code_fences: self.strip_code_fences,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = FillConfig::default();
        assert!(config.database_url.is_none());
        assert!(config.exclude_tables.is_empty());
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.timeout_seconds, 120);
        assert!(!config.dry_run);
        assert!(!config.strip_code_fences);
    }

    #[test]
    fn test_config_from_toml() {
        let config = FillConfig::from_toml_str(
            r#"
            database_url = "duckdb:///tmp/app.duckdb"
            schema = "sales"
            exclude_tables = ["schema_migrations", "audit_log"]
            dry_run = true

            [llm]
            model = "gpt-4o-mini"
            timeout_seconds = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("duckdb:///tmp/app.duckdb"));
        assert_eq!(config.schema.as_deref(), Some("sales"));
        assert!(config.exclude_tables.contains("audit_log"));
        assert!(config.dry_run);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.timeout_seconds, 30);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_config_invalid_toml() {
        let err = FillConfig::from_toml_str("exclude_tables = 3").unwrap_err();
        assert!(matches!(err, FillError::Configuration(_)));
    }

    #[test]
    fn test_config_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fillme.toml");
        std::fs::write(&path, "[llm]\napi_key = \"sk-file\"\n").unwrap();

        let config = FillConfig::load(&path).unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-file"));

        let missing = FillConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(FillError::Configuration(_))));
    }

    #[test]
    fn test_apply_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_KEY, "sk-env"),
            (ENV_MODEL, "gpt-4o"),
            (ENV_BASE_URL, ""),
            (ENV_DATABASE_URL, "duckdb::memory:"),
        ]);

        let config = FillConfig::default()
            .with_base_url("http://localhost:8080/v1")
            .apply_env_with(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.base_url, "http://localhost:8080/v1");
        assert_eq!(config.database_url.as_deref(), Some("duckdb::memory:"));
    }

    #[test]
    fn test_builders() {
        let config = FillConfig::default()
            .with_excluded_tables(["a", "b"])
            .with_excluded_tables(vec!["a".to_string()])
            .with_temperature(9.0)
            .with_dry_run(true);
        assert_eq!(config.exclude_tables.len(), 2);
        assert_eq!(config.llm.temperature, Some(2.0));

        let settings = config.generator_settings();
        assert!(settings.dry_run);
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_require_database_url() {
        assert!(FillConfig::default().require_database_url().is_err());
        let config = FillConfig::default().with_database_url("app.duckdb");
        assert_eq!(config.require_database_url().unwrap(), "app.duckdb");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = FillConfig::default().with_api_key("sk-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}

//! Dummy-data generation
//!
//! [`DummyDataGenerator`] asks a chat-completion service for INSERT statements
//! matching a [`SchemaSnapshot`] and runs the answer against the database.
//! A generator only exists after its credential was validated and the service
//! passed a liveness round-trip.

use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::database::Database;
use crate::error::{FillError, FillResult};
use crate::llm::{ChatClient, ChatRequest, Message};
use crate::schema::SchemaSnapshot;

pub const LIVENESS_PROMPT: &str = "Say 'ok' lower case.";
pub const LIVENESS_TOKEN: &str = "ok";

pub const SYSTEM_PROMPT: &str = "You are a SQL programmer, write SQL \
     to Fill tables with dummy values. plain SQL \
     statements with no explanation";

pub const USER_PROMPT_PREFIX: &str = "create dummy data for this table: \n";

static CODE_FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)```\s*$").unwrap());

/// Settings the generator is constructed with
#[derive(Clone, Default)]
pub struct GeneratorSettings {
    /// Credential for the completion service
    pub api_key: Option<String>,
    /// Model identifier sent with every request
    pub model: String,
    /// Sampling temperature; service default when unset
    pub temperature: Option<f32>,
    /// Remove a surrounding Markdown code fence from the answer
    pub strip_code_fences: bool,
    /// Return the SQL without executing it
    pub dry_run: bool,
}

impl std::fmt::Debug for GeneratorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("strip_code_fences", &self.strip_code_fences)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl GeneratorSettings {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Check the settings before any network use
    pub fn validate(&self) -> FillResult<()> {
        match self.api_key.as_deref().map(str::trim) {
            None | Some("") => Err(FillError::Configuration(
                "completion API key is not set (OPENAI_API_KEY)".to_string(),
            )),
            Some(_) if self.model.trim().is_empty() => Err(FillError::Configuration(
                "model identifier is empty".to_string(),
            )),
            Some(_) => Ok(()),
        }
    }
}

/// Outcome of one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// SQL returned by the model (after optional fence stripping)
    pub sql: String,
    /// Whether the SQL was executed and committed
    pub executed: bool,
    /// Tables that were sent to the model
    pub tables: Vec<String>,
    /// Time taken by the completion request in milliseconds
    pub duration_ms: u64,
}

/// Generates and inserts dummy data through a chat-completion service
pub struct DummyDataGenerator<C: ChatClient> {
    client: C,
    settings: GeneratorSettings,
}

impl<C: ChatClient> std::fmt::Debug for DummyDataGenerator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DummyDataGenerator")
            .field("backend", &self.client.backend_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl<C: ChatClient> DummyDataGenerator<C> {
    /// Validate the settings and check that the service answers
    ///
    /// Fails with [`FillError::Configuration`] before touching `client` when
    /// the credential is missing, and with [`FillError::ServiceUnavailable`]
    /// when the liveness round-trip fails.
    pub fn new(client: C, settings: GeneratorSettings) -> FillResult<Self> {
        settings.validate()?;
        let generator = Self { client, settings };
        generator.check_liveness()?;
        Ok(generator)
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    fn request(&self, messages: Vec<Message>) -> ChatRequest {
        let request = ChatRequest::new(self.settings.model.clone(), messages);
        match self.settings.temperature {
            Some(t) => request.with_temperature(t),
            None => request,
        }
    }

    #[tracing::instrument(skip(self), fields(backend = self.client.backend_name(), model = %self.settings.model))]
    fn check_liveness(&self) -> FillResult<()> {
        let request = self.request(vec![Message::user(LIVENESS_PROMPT)]);

        let response = self
            .client
            .complete(&request)
            .map_err(|e| {
                if e.is_auth_error() {
                    tracing::warn!("completion service rejected the API key");
                }
                FillError::ServiceUnavailable(e.to_string())
            })?;

        let answer = response.first_choice().ok_or_else(|| {
            FillError::ServiceUnavailable("liveness check returned no choices".to_string())
        })?;

        if !answer.to_lowercase().contains(LIVENESS_TOKEN) {
            return Err(FillError::ServiceUnavailable(format!(
                "liveness check returned unexpected content: {:?}",
                truncate(answer, 80)
            )));
        }

        tracing::info!("completion service passed liveness check");
        Ok(())
    }

    /// Ask the model for dummy data and execute it against `db`
    ///
    /// The first choice's text is run verbatim as one script and committed.
    /// In dry-run mode the SQL is only returned.
    #[tracing::instrument(skip_all, fields(tables = snapshot.tables.len()))]
    pub fn generate<D: Database + ?Sized>(
        &self,
        snapshot: &SchemaSnapshot,
        db: &mut D,
    ) -> FillResult<GenerationReport> {
        let start = Instant::now();
        let request = self.request(build_messages(&snapshot.ddl));
        tracing::debug!("generation prompt:\n{}", request.messages[1].content);

        let response = self
            .client
            .complete(&request)
            .map_err(|e| FillError::GenerationFailed(e.to_string()))?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let sql = response.first_choice().ok_or_else(|| {
            FillError::GenerationFailed("completion service returned no choices".to_string())
        })?;
        let sql = if self.settings.strip_code_fences {
            strip_code_fences(sql)
        } else {
            sql
        };
        tracing::debug!("generated SQL:\n{}", sql);

        let mut report = GenerationReport {
            sql: sql.to_string(),
            executed: false,
            tables: snapshot.table_names(),
            duration_ms,
        };

        if self.settings.dry_run {
            tracing::info!("dry run, generated SQL was not executed");
            return Ok(report);
        }

        db.execute_script(&report.sql)
            .map_err(|e| FillError::ExecutionFailed(e.to_string()))?;
        report.executed = true;

        tracing::info!(duration_ms, "generated data committed");
        Ok(report)
    }
}

#[cfg(feature = "api-backend")]
impl DummyDataGenerator<crate::llm::OpenAiClient> {
    /// Build a generator backed by the OpenAI-compatible HTTP client
    pub fn from_config(config: &crate::config::FillConfig) -> FillResult<Self> {
        let settings = config.generator_settings();
        settings.validate()?;

        let api_key = settings.api_key.clone().unwrap_or_default();
        let client = crate::llm::OpenAiClient::new(api_key)
            .with_base_url(config.llm.base_url.clone())
            .with_timeout(config.llm.timeout_seconds);

        Self::new(client, settings)
    }
}

/// Messages for the main generation request
pub fn build_messages(schema_ddl: &str) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(format!("{USER_PROMPT_PREFIX}{schema_ddl}")),
    ]
}

/// Remove one surrounding Markdown code fence, if present
pub fn strip_code_fences(text: &str) -> &str {
    CODE_FENCE_REGEX
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

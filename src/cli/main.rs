//! fillme command line interface

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fillme::config::{ENV_API_KEY, ENV_DATABASE_URL, ENV_MODEL};
use fillme::{DummyDataGenerator, FillConfig, FillError, FillMe, FillOptions, database};

#[derive(Parser)]
#[command(name = "fillme")]
#[command(about = "Fill database tables with LLM-generated dummy data", long_about = None)]
struct Cli {
    /// Database URL (duckdb:///path/to.db, duckdb::memory: or a file path)
    #[arg(long, env = ENV_DATABASE_URL)]
    db_url: Option<String>,

    /// Schema to reflect
    #[arg(long)]
    schema: Option<String>,

    /// Completion API key
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    openai_token: Option<String>,

    /// Chat model identifier
    #[arg(long, env = ENV_MODEL)]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Table to leave out (repeatable)
    #[arg(long = "exclude", value_name = "TABLE")]
    exclude: Vec<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remove a Markdown code fence around the generated SQL
    #[arg(long, default_value = "false")]
    strip_code_fences: bool,

    /// Print the generated SQL instead of executing it
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

impl Cli {
    /// Merge file, environment and flags into one config
    fn into_config(self) -> Result<FillConfig, FillError> {
        let mut config = match &self.config {
            Some(path) => FillConfig::load(path)?,
            None => FillConfig::default(),
        }
        .apply_env();

        if let Some(url) = self.db_url {
            config = config.with_database_url(url);
        }
        if let Some(schema) = self.schema {
            config = config.with_schema(schema);
        }
        if let Some(token) = self.openai_token {
            config = config.with_api_key(token);
        }
        if let Some(model) = self.model {
            config = config.with_model(model);
        }
        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config = config.with_excluded_tables(self.exclude);
        if self.strip_code_fences {
            config = config.with_strip_code_fences(true);
        }
        if self.dry_run {
            config = config.with_dry_run(true);
        }

        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(config: FillConfig) -> Result<(), FillError> {
    let db_url = config.require_database_url()?;
    let db = database::connect(db_url).map_err(|e| match e {
        database::DatabaseError::UnsupportedUrl(msg) => FillError::Configuration(msg),
        other => FillError::Connection(other.to_string()),
    })?;

    let options = FillOptions {
        schema: config.schema.clone(),
        exclude_tables: config.exclude_tables.clone(),
    };
    let mut fill = FillMe::new(db, options)?;
    let generator = DummyDataGenerator::from_config(&config)?;

    let snapshot = fill.reflect()?;
    println!("detected tables from provided database: {:?}", snapshot.table_names());

    let report = fill.fill(&snapshot, &generator)?;

    if report.executed {
        println!();
        println!("Dummy data inserted:");
        println!("  Tables:   {}", report.tables.join(", "));
        println!("  Duration: {} ms", report.duration_ms);
    } else {
        println!();
        println!("-- dry run: generated SQL was not executed");
        println!("{}", report.sql);
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = cli.into_config().and_then(run);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(kind = err.kind(), "{}", err);
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "fillme",
            "--db-url",
            "duckdb::memory:",
            "--openai-token",
            "sk-flag",
            "--model",
            "gpt-4o-mini",
            "--exclude",
            "audit_log",
            "--exclude",
            "schema_migrations",
            "--dry-run",
        ]);

        let config = cli.into_config().unwrap();
        assert_eq!(config.database_url.as_deref(), Some("duckdb::memory:"));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-flag"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        let expected: BTreeSet<String> =
            ["audit_log".to_string(), "schema_migrations".to_string()].into();
        assert_eq!(config.exclude_tables, expected);
        assert!(config.dry_run);
    }

    #[test]
    fn test_unsupported_url_is_configuration_error() {
        let config = FillConfig::default().with_database_url("postgres://localhost/app");
        let err = run(config).unwrap_err();
        assert!(matches!(err, FillError::Configuration(_)));
    }
}

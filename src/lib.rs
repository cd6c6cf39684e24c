//! FillMe - fill database tables with LLM-generated dummy data
//!
//! Provides:
//! - Schema reflection in foreign-key dependency order (`schema`)
//! - Database access (`database`, DuckDB backend)
//! - Chat-completion access (`llm`, OpenAI-compatible backend)
//! - Dummy-data generation and execution (`generator`)
//! - The run orchestrator (`pipeline`)
//!
//! # Example
//!
//! ```ignore
//! use fillme::{DuckDbDatabase, DummyDataGenerator, FillConfig, FillMe, FillOptions};
//!
//! let config = FillConfig::default().with_api_key("sk-...").apply_env();
//! let generator = DummyDataGenerator::from_config(&config)?;
//!
//! let db = DuckDbDatabase::open("app.duckdb")?;
//! let fill = FillMe::new(db, FillOptions::default().exclude(["schema_migrations"]))?;
//! let report = fill.run(&generator)?;
//! println!("{}", report.sql);
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod generator;
pub mod llm;
pub mod pipeline;
pub mod schema;

// Re-export commonly used types
pub use config::{FillConfig, LlmConfig};
#[cfg(feature = "duckdb-backend")]
pub use database::DuckDbDatabase;
pub use database::{Database, DatabaseError, DatabaseUrl};
pub use error::{FillError, FillResult};
pub use generator::{DummyDataGenerator, GenerationReport, GeneratorSettings};
#[cfg(feature = "api-backend")]
pub use llm::OpenAiClient;
pub use llm::{ChatClient, ChatRequest, CompletionResponse, LlmError, Message};
pub use pipeline::{FillMe, FillOptions};
pub use schema::{SchemaSnapshot, SqlDialect, TableDefinition};

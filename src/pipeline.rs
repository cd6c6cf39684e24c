//! Fill pipeline
//!
//! [`FillMe`] owns the database handle for one run and sequences the two
//! steps: reflect the schema, then hand the snapshot to a
//! [`DummyDataGenerator`].

use std::collections::BTreeSet;

use crate::database::Database;
use crate::error::{FillError, FillResult};
use crate::generator::{DummyDataGenerator, GenerationReport};
use crate::llm::ChatClient;
use crate::schema::{self, SchemaSnapshot};

/// What to reflect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillOptions {
    /// Schema to reflect; backend default when unset
    pub schema: Option<String>,
    /// Tables left out, matched by exact name
    pub exclude_tables: BTreeSet<String>,
}

impl FillOptions {
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn exclude<S: Into<String>>(mut self, tables: impl IntoIterator<Item = S>) -> Self {
        self.exclude_tables.extend(tables.into_iter().map(Into::into));
        self
    }
}

/// One fill run against a database
pub struct FillMe<D: Database> {
    db: D,
    options: FillOptions,
}

impl<D: Database> FillMe<D> {
    /// Take ownership of `db` for the run
    ///
    /// Fails with [`FillError::Connection`] when the database does not answer.
    pub fn new(db: D, options: FillOptions) -> FillResult<Self> {
        db.ping()
            .map_err(|e| FillError::Connection(e.to_string()))?;
        Ok(Self { db, options })
    }

    pub fn options(&self) -> &FillOptions {
        &self.options
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    /// Reflect the current schema
    pub fn reflect(&self) -> FillResult<SchemaSnapshot> {
        schema::reflect(
            &self.db,
            self.options.schema.as_deref(),
            &self.options.exclude_tables,
        )
    }

    /// Generate and insert dummy data for a snapshot taken earlier
    pub fn fill<C: ChatClient>(
        &mut self,
        snapshot: &SchemaSnapshot,
        generator: &DummyDataGenerator<C>,
    ) -> FillResult<GenerationReport> {
        if snapshot.is_empty() {
            return Err(FillError::GenerationFailed(
                "no tables left to fill after exclusions".to_string(),
            ));
        }
        generator.generate(snapshot, &mut self.db)
    }

    /// Reflect, generate and insert, then close the connection
    pub fn run<C: ChatClient>(
        mut self,
        generator: &DummyDataGenerator<C>,
    ) -> FillResult<GenerationReport> {
        let snapshot = self.reflect()?;
        self.fill(&snapshot, generator)
    }

    /// Give the database handle back
    pub fn into_database(self) -> D {
        self.db
    }
}

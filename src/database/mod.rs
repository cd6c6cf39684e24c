//! Database access used by the fill pipeline
//!
//! The pipeline needs four things from a database: a connectivity check,
//! catalog reflection, a dialect for DDL rendering, and a way to run a raw SQL
//! script and commit it. [`Database`] captures exactly that so other backends
//! can be added next to the DuckDB one.

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::{SqlDialect, TableDefinition};

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDbDatabase;

/// Errors raised by database backends
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Opening the database failed
    #[error("Failed to open database: {0}")]
    Open(String),

    /// Catalog or ad-hoc query failed
    #[error("Query error: {0}")]
    Query(String),

    /// Script execution or commit failed
    #[error("Execution error: {0}")]
    Execute(String),

    /// URL scheme has no backend
    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}

/// Connection handle the pipeline borrows for one run
pub trait Database {
    /// Check that the database answers queries
    fn ping(&self) -> Result<(), DatabaseError>;

    /// Read every base table of `schema` (backend default when `None`)
    fn reflect_tables(&self, schema: Option<&str>) -> Result<Vec<TableDefinition>, DatabaseError>;

    /// Run `sql` as one script in a single transaction and commit it
    ///
    /// Nothing is committed when any statement fails.
    fn execute_script(&mut self, sql: &str) -> Result<(), DatabaseError>;

    /// Dialect used to render this database's DDL
    fn dialect(&self) -> SqlDialect;
}

/// Parsed database location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// DuckDB database file
    DuckDbFile(PathBuf),
    /// In-memory DuckDB database
    DuckDbMemory,
}

impl DatabaseUrl {
    /// Parse a database URL
    ///
    /// Supported formats:
    /// - `duckdb:///path/to/file.db` or `duckdb://relative.db`
    /// - `duckdb::memory:` or `:memory:`
    /// - a bare file path
    pub fn parse(url: &str) -> Result<Self, DatabaseError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DatabaseError::UnsupportedUrl("empty URL".to_string()));
        }

        if url == ":memory:" || url == "duckdb::memory:" || url == "duckdb://:memory:" {
            return Ok(DatabaseUrl::DuckDbMemory);
        }

        if let Some(path) = url.strip_prefix("duckdb://") {
            if path.is_empty() {
                return Err(DatabaseError::UnsupportedUrl(url.to_string()));
            }
            return Ok(DatabaseUrl::DuckDbFile(PathBuf::from(path)));
        }

        if let Some((scheme, _)) = url.split_once("://") {
            return Err(DatabaseError::UnsupportedUrl(format!(
                "no backend for scheme '{scheme}'"
            )));
        }

        Ok(DatabaseUrl::DuckDbFile(PathBuf::from(url)))
    }
}

/// Open the database a URL points to
#[cfg(feature = "duckdb-backend")]
pub fn connect(url: &str) -> Result<Box<dyn Database>, DatabaseError> {
    let db = match DatabaseUrl::parse(url)? {
        DatabaseUrl::DuckDbFile(path) => DuckDbDatabase::open(path)?,
        DatabaseUrl::DuckDbMemory => DuckDbDatabase::memory()?,
    };
    Ok(Box::new(db))
}

impl<D: Database + ?Sized> Database for Box<D> {
    fn ping(&self) -> Result<(), DatabaseError> {
        (**self).ping()
    }

    fn reflect_tables(&self, schema: Option<&str>) -> Result<Vec<TableDefinition>, DatabaseError> {
        (**self).reflect_tables(schema)
    }

    fn execute_script(&mut self, sql: &str) -> Result<(), DatabaseError> {
        (**self).execute_script(sql)
    }

    fn dialect(&self) -> SqlDialect {
        (**self).dialect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duckdb_urls() {
        assert_eq!(
            DatabaseUrl::parse("duckdb:///var/data/app.db").unwrap(),
            DatabaseUrl::DuckDbFile(PathBuf::from("/var/data/app.db"))
        );
        assert_eq!(
            DatabaseUrl::parse("duckdb://local.duckdb").unwrap(),
            DatabaseUrl::DuckDbFile(PathBuf::from("local.duckdb"))
        );
        assert_eq!(
            DatabaseUrl::parse("duckdb::memory:").unwrap(),
            DatabaseUrl::DuckDbMemory
        );
        assert_eq!(DatabaseUrl::parse(":memory:").unwrap(), DatabaseUrl::DuckDbMemory);
        assert_eq!(
            DatabaseUrl::parse("./dev.db").unwrap(),
            DatabaseUrl::DuckDbFile(PathBuf::from("./dev.db"))
        );
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        let err = DatabaseUrl::parse("postgres://user@localhost/app").unwrap_err();
        assert!(matches!(err, DatabaseError::UnsupportedUrl(_)));
        assert!(err.to_string().contains("postgres"));

        assert!(DatabaseUrl::parse("   ").is_err());
        assert!(DatabaseUrl::parse("duckdb://").is_err());
    }
}

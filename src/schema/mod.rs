//! Schema reflection
//!
//! Reads table structure from a live database, orders it by foreign-key
//! dependencies and renders it as one CREATE TABLE document that is handed to
//! the dummy-data generator.

pub mod ddl;
pub mod order;
pub mod table;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::{FillError, FillResult};

pub use ddl::{SqlDialect, render_schema, render_table};
pub use order::sort_by_dependencies;
pub use table::{ColumnDefinition, ForeignKeyDefinition, TableDefinition};

/// Tables found in the database, in dependency order, with their DDL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Reflected tables, parents before children
    pub tables: Vec<TableDefinition>,
    /// Concatenated CREATE TABLE statements, same order as `tables`
    pub ddl: String,
}

impl SchemaSnapshot {
    /// Build a snapshot from unordered tables
    pub fn from_tables(
        tables: Vec<TableDefinition>,
        excluded: &BTreeSet<String>,
        dialect: SqlDialect,
    ) -> Self {
        let tables: Vec<TableDefinition> = sort_by_dependencies(tables)
            .into_iter()
            .filter(|t| !excluded.contains(&t.name))
            .collect();
        let ddl = render_schema(&tables, dialect);
        Self { tables, ddl }
    }

    /// Table names in dependency order
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Reflect the tables of `schema` (backend default when `None`)
///
/// Tables named in `excluded` are dropped after ordering. Catalog failures are
/// reported as [`FillError::Connection`].
pub fn reflect<D: Database + ?Sized>(
    db: &D,
    schema: Option<&str>,
    excluded: &BTreeSet<String>,
) -> FillResult<SchemaSnapshot> {
    let tables = db
        .reflect_tables(schema)
        .map_err(|e| FillError::Connection(e.to_string()))?;

    let snapshot = SchemaSnapshot::from_tables(tables, excluded, db.dialect());

    tracing::info!(
        tables = ?snapshot.table_names(),
        "detected tables from provided database"
    );

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent_child() -> Vec<TableDefinition> {
        vec![
            TableDefinition::new(
                "child",
                vec![
                    ColumnDefinition::new("id", "INTEGER"),
                    ColumnDefinition::new("parent_id", "INTEGER"),
                ],
            )
            .with_foreign_key(["parent_id"], "parent", ["id"]),
            TableDefinition::new("parent", vec![ColumnDefinition::new("id", "INTEGER")]),
        ]
    }

    #[test]
    fn test_snapshot_orders_and_renders() {
        let snapshot =
            SchemaSnapshot::from_tables(parent_child(), &BTreeSet::new(), SqlDialect::DuckDb);
        assert_eq!(snapshot.table_names(), vec!["parent", "child"]);
        let parent_pos = snapshot.ddl.find("\"parent\" (").unwrap();
        let child_pos = snapshot.ddl.find("\"child\" (").unwrap();
        assert!(parent_pos < child_pos);
    }

    #[test]
    fn test_snapshot_excludes_by_exact_name() {
        let excluded: BTreeSet<String> = ["child".to_string(), "PARENT".to_string()].into();
        let snapshot = SchemaSnapshot::from_tables(parent_child(), &excluded, SqlDialect::DuckDb);
        assert_eq!(snapshot.table_names(), vec!["parent"]);
        assert!(!snapshot.ddl.contains("\"child\""));
    }

    #[test]
    fn test_snapshot_never_contains_excluded_tables() {
        let all: Vec<String> = vec!["parent".into(), "child".into()];
        for mask in 0..4u8 {
            let excluded: BTreeSet<String> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, n)| n.clone())
                .collect();
            let snapshot =
                SchemaSnapshot::from_tables(parent_child(), &excluded, SqlDialect::Standard);
            for name in snapshot.table_names() {
                assert!(!excluded.contains(&name));
            }
            assert_eq!(snapshot.tables.len(), 2 - excluded.len());
        }
    }
}

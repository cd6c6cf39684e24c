//! DuckDB database backend

use std::path::{Path, PathBuf};

use super::{Database, DatabaseError};
use crate::schema::{ColumnDefinition, ForeignKeyDefinition, SqlDialect, TableDefinition};

const DEFAULT_SCHEMA: &str = "main";

/// Separator for list columns flattened with `array_to_string`
const LIST_SEPARATOR: char = '\u{1f}';

const SELECT_TABLES: &str = "SELECT table_name FROM duckdb_tables()
     WHERE database_name = current_database() AND schema_name = ?1
       AND NOT internal AND NOT temporary
     ORDER BY table_name";

const SELECT_COLUMNS: &str = "SELECT column_name, data_type, is_nullable, column_default
     FROM duckdb_columns()
     WHERE database_name = current_database() AND schema_name = ?1 AND table_name = ?2
     ORDER BY column_index";

const SELECT_CONSTRAINTS: &str = "SELECT constraint_type,
            COALESCE(array_to_string(constraint_column_names, chr(31)), ''),
            COALESCE(referenced_table, ''),
            COALESCE(array_to_string(referenced_column_names, chr(31)), ''),
            COALESCE(expression, '')
     FROM duckdb_constraints()
     WHERE database_name = current_database() AND schema_name = ?1 AND table_name = ?2
     ORDER BY constraint_index";

/// DuckDB connection used as a fill target
pub struct DuckDbDatabase {
    conn: duckdb::Connection,
    path: Option<PathBuf>,
}

impl DuckDbDatabase {
    /// Open or create a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let conn = duckdb::Connection::open(path)
            .map_err(|e| DatabaseError::Open(format!("{}: {e}", path.display())))?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn memory() -> Result<Self, DatabaseError> {
        let conn =
            duckdb::Connection::open_in_memory().map_err(|e| DatabaseError::Open(e.to_string()))?;
        Ok(Self { conn, path: None })
    }

    /// Get the database path (if not in-memory)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Underlying connection, for callers that need to query directly
    pub fn connection(&self) -> &duckdb::Connection {
        &self.conn
    }

    fn table_names(&self, schema: &str) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self.conn.prepare(SELECT_TABLES)?;
        let rows = stmt.query_map([schema], |row| row.get::<_, String>(0))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    fn columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDefinition>, DatabaseError> {
        let mut stmt = self.conn.prepare(SELECT_COLUMNS)?;
        let rows = stmt.query_map(duckdb::params![schema, table], |row| {
            Ok(ColumnDefinition {
                name: row.get(0)?,
                data_type: row.get(1)?,
                nullable: row.get(2)?,
                default: row.get(3)?,
            })
        })?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    fn apply_constraints(&self, schema: &str, table: &mut TableDefinition) -> Result<(), DatabaseError> {
        let mut stmt = self.conn.prepare(SELECT_CONSTRAINTS)?;
        let rows = stmt.query_map(duckdb::params![schema, table.name.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        for row in rows {
            let (constraint_type, columns, referenced_table, referenced_columns, expression) = row?;
            let columns = split_list(&columns);

            match constraint_type.as_str() {
                "PRIMARY KEY" => table.primary_key = columns,
                "UNIQUE" => {
                    if columns != table.primary_key && !table.unique_constraints.contains(&columns) {
                        table.unique_constraints.push(columns);
                    }
                }
                "FOREIGN KEY" if !referenced_table.is_empty() => {
                    table.foreign_keys.push(ForeignKeyDefinition {
                        columns,
                        referenced_table,
                        referenced_columns: split_list(&referenced_columns),
                    });
                }
                "CHECK" if !expression.is_empty() => {
                    if !table.check_constraints.contains(&expression) {
                        table.check_constraints.push(expression);
                    }
                }
                _ => {}
            }
        }

        // PRIMARY KEY may be listed after a UNIQUE entry on the same columns
        let primary_key = table.primary_key.clone();
        table.unique_constraints.retain(|u| *u != primary_key);

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(LIST_SEPARATOR).map(str::to_string).collect()
}

impl Database for DuckDbDatabase {
    fn ping(&self) -> Result<(), DatabaseError> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
            .map_err(|e| DatabaseError::Open(e.to_string()))?;
        Ok(())
    }

    fn reflect_tables(&self, schema: Option<&str>) -> Result<Vec<TableDefinition>, DatabaseError> {
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);
        let mut tables = Vec::new();

        for name in self.table_names(schema)? {
            let columns = self.columns(schema, &name)?;
            let mut table = TableDefinition::new(name, columns);
            if schema != DEFAULT_SCHEMA {
                table.schema = Some(schema.to_string());
            }
            self.apply_constraints(schema, &mut table)?;
            tables.push(table);
        }

        tracing::debug!(schema, count = tables.len(), "reflected duckdb catalog");
        Ok(tables)
    }

    fn execute_script(&mut self, sql: &str) -> Result<(), DatabaseError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| DatabaseError::Execute(e.to_string()))?;

        // Dropping an uncommitted transaction rolls it back
        tx.execute_batch(sql)
            .map_err(|e| DatabaseError::Execute(e.to_string()))?;
        tx.commit()
            .map_err(|e| DatabaseError::Execute(e.to_string()))?;

        Ok(())
    }

    fn dialect(&self) -> SqlDialect {
        SqlDialect::DuckDb
    }
}

impl From<duckdb::Error> for DatabaseError {
    fn from(err: duckdb::Error) -> Self {
        DatabaseError::Query(err.to_string())
    }
}

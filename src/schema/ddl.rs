//! CREATE TABLE rendering for reflected tables.
//!
//! # Security
//!
//! All identifiers (table, column and schema names) are quoted and internal
//! quote characters are escaped by doubling them. Column types and defaults are
//! taken from the catalog as-is.

use serde::{Deserialize, Serialize};

use super::table::{ForeignKeyDefinition, TableDefinition};

/// SQL dialect used for identifier quoting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Standard,
    DuckDb,
    Postgres,
}

impl SqlDialect {
    /// Quote and escape an identifier for this dialect
    pub fn quote_identifier(&self, identifier: &str) -> String {
        match self {
            SqlDialect::Standard | SqlDialect::DuckDb | SqlDialect::Postgres => {
                format!("\"{}\"", identifier.replace('"', "\"\""))
            }
        }
    }

    fn quote_list(&self, identifiers: &[String]) -> String {
        identifiers
            .iter()
            .map(|ident| self.quote_identifier(ident))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Render a table as a CREATE TABLE statement
///
/// A single-column primary key is rendered inline on its column; composite
/// keys, unique constraints, foreign keys and checks become table constraints.
///
/// # Example
///
/// ```rust
/// use fillme::schema::{ColumnDefinition, SqlDialect, TableDefinition, render_table};
///
/// let table = TableDefinition::new("users", vec![ColumnDefinition::new("id", "INTEGER")])
///     .with_primary_key(["id"]);
///
/// let sql = render_table(&table, SqlDialect::Postgres);
/// assert_eq!(sql, "CREATE TABLE \"users\" (\n  \"id\" INTEGER NOT NULL PRIMARY KEY\n);\n");
/// ```
pub fn render_table(table: &TableDefinition, dialect: SqlDialect) -> String {
    let table_name = match &table.schema {
        Some(schema) => format!(
            "{}.{}",
            dialect.quote_identifier(schema),
            dialect.quote_identifier(&table.name)
        ),
        None => dialect.quote_identifier(&table.name),
    };

    let inline_pk = match table.primary_key.as_slice() {
        [single] => Some(single.as_str()),
        _ => None,
    };

    let mut definitions = Vec::new();
    for column in &table.columns {
        let mut def = format!(
            "  {} {}",
            dialect.quote_identifier(&column.name),
            column.data_type
        );

        let is_pk = inline_pk == Some(column.name.as_str())
            || table.primary_key.iter().any(|c| c == &column.name);
        if !column.nullable || is_pk {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        if inline_pk == Some(column.name.as_str()) {
            def.push_str(" PRIMARY KEY");
        }

        definitions.push(def);
    }

    if table.primary_key.len() > 1 {
        definitions.push(format!(
            "  PRIMARY KEY ({})",
            dialect.quote_list(&table.primary_key)
        ));
    }

    for unique in &table.unique_constraints {
        definitions.push(format!("  UNIQUE ({})", dialect.quote_list(unique)));
    }

    for fk in &table.foreign_keys {
        definitions.push(render_foreign_key(fk, dialect));
    }

    for check in &table.check_constraints {
        definitions.push(format!("  CHECK ({check})"));
    }

    format!(
        "CREATE TABLE {} (\n{}\n);\n",
        table_name,
        definitions.join(",\n")
    )
}

fn render_foreign_key(fk: &ForeignKeyDefinition, dialect: SqlDialect) -> String {
    let mut def = format!(
        "  FOREIGN KEY ({}) REFERENCES {}",
        dialect.quote_list(&fk.columns),
        dialect.quote_identifier(&fk.referenced_table)
    );
    if !fk.referenced_columns.is_empty() {
        def.push_str(&format!(" ({})", dialect.quote_list(&fk.referenced_columns)));
    }
    def
}

/// Render tables in the given order and concatenate them into one document
pub fn render_schema(tables: &[TableDefinition], dialect: SqlDialect) -> String {
    tables
        .iter()
        .map(|table| render_table(table, dialect))
        .collect::<Vec<_>>()
        .join("\n")
}

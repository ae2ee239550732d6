//! Database schema types for hearthbook.
//!
//! This crate contains the schema model shared by the bootstrapper and the CLI:
//! owned table definitions ([`Table`], [`Column`], [`ForeignKey`]), the static
//! descriptors the household catalog is written in ([`TableDef`], [`ColumnDef`]),
//! and the DDL rendering for both.
//!
//! Every table lives in a namespace (a Postgres schema), and every name the
//! crate renders is namespace-qualified.

use indexmap::IndexMap;
use std::fmt;

mod ident;
mod sql;

pub use ident::{Ident, InvalidIdent, PG_IDENT_MAX, quote_ident, validate_ident};
pub use sql::{create_namespace_sql, create_table_sql, foreign_key_constraint_name};

/// Postgres column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PgType {
    /// INTEGER (4 bytes)
    Integer,
    /// NUMERIC (arbitrary precision)
    Numeric,
    /// TEXT
    Text,
    /// DATE (calendar date, no time of day)
    Date,
}

impl fmt::Display for PgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgType::Integer => write!(f, "INTEGER"),
            PgType::Numeric => write!(f, "NUMERIC"),
            PgType::Text => write!(f, "TEXT"),
            PgType::Date => write!(f, "DATE"),
        }
    }
}

/// A validated namespace (Postgres schema) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Validate `name` and wrap it.
    pub fn parse(name: &str) -> Result<Self, InvalidIdent> {
        validate_ident(name)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A namespace-qualified table name, e.g. `income.paystub`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub namespace: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The quoted, qualified form used in SQL: `"income"."paystub"`.
    pub fn to_sql(&self) -> String {
        format!("{}.{}", Ident(&self.namespace), Ident(&self.name))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// A database column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Postgres type
    pub pg_type: PgType,
    /// Whether the column allows NULL
    pub nullable: bool,
    /// Whether this is (part of) the primary key
    pub primary_key: bool,
    /// Whether the store assigns the value (identity column)
    pub identity: bool,
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKey {
    /// Column(s) in this table
    pub columns: Vec<String>,
    /// Referenced table
    pub references_table: QualifiedName,
    /// Referenced column(s)
    pub references_columns: Vec<String>,
}

/// A table CHECK constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckConstraint {
    pub name: String,
    pub expr: String,
}

/// A database table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Qualified table name
    pub name: QualifiedName,
    /// Columns, in declaration order
    pub columns: Vec<Column>,
    /// Foreign keys
    pub foreign_keys: Vec<ForeignKey>,
    /// CHECK constraints
    pub check_constraints: Vec<CheckConstraint>,
    /// One-line description of what a row represents
    pub doc: Option<String>,
}

impl Table {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key columns, in declaration order.
    pub fn primary_key(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Tables this one references, excluding itself.
    pub fn dependencies(&self) -> impl Iterator<Item = &QualifiedName> {
        self.foreign_keys
            .iter()
            .map(|fk| &fk.references_table)
            .filter(move |target| **target != self.name)
    }
}

/// A complete set of table definitions, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Tables, indexed by qualified name
    pub tables: IndexMap<QualifiedName, Table>,
}

impl Catalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower static descriptors into a catalog.
    ///
    /// Fails on a malformed foreign-key reference or a table declared twice.
    pub fn from_defs(defs: &[TableDef]) -> Result<Self, SchemaError> {
        let mut catalog = Self::new();
        for def in defs {
            let table = def.to_table()?;
            if catalog.tables.contains_key(&table.name) {
                return Err(SchemaError::DuplicateTable { table: table.name });
            }
            catalog.tables.insert(table.name.clone(), table);
        }
        Ok(catalog)
    }

    /// Get a table by name.
    pub fn get_table(&self, name: &QualifiedName) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Iterate over all tables.
    pub fn iter_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Remove a table, keeping the order of the others.
    pub fn remove(&mut self, name: &QualifiedName) -> Option<Table> {
        self.tables.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Namespaces used by the catalog, in order of first appearance.
    pub fn namespaces(&self) -> Vec<&str> {
        let mut namespaces: Vec<&str> = Vec::new();
        for table in self.tables.values() {
            if !namespaces.contains(&table.name.namespace.as_str()) {
                namespaces.push(&table.name.namespace);
            }
        }
        namespaces
    }
}

/// Errors raised while lowering static descriptors.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// A foreign-key reference that is not `namespace.table.column`.
    MalformedForeignKey {
        table: QualifiedName,
        column: String,
        reference: String,
    },
    /// Two descriptors declare the same qualified table.
    DuplicateTable { table: QualifiedName },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::MalformedForeignKey {
                table,
                column,
                reference,
            } => write!(
                f,
                "invalid FK format '{}' for column '{}' in table '{}' - expected 'namespace.table.column' or 'namespace.table(column)'",
                reference, column, table
            ),
            SchemaError::DuplicateTable { table } => {
                write!(f, "table '{}' is declared more than once", table)
            }
        }
    }
}

impl std::error::Error for SchemaError {}

// =============================================================================
// Static descriptors
// =============================================================================

/// A column as written in a static catalog.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub pg_type: PgType,
    pub primary_key: bool,
    /// Foreign-key target, `namespace.table.column`
    pub references: Option<&'static str>,
}

impl ColumnDef {
    /// A store-assigned integer primary key.
    pub const fn id(name: &'static str) -> Self {
        Self {
            name,
            pg_type: PgType::Integer,
            primary_key: true,
            references: None,
        }
    }

    /// A plain nullable column.
    pub const fn new(name: &'static str, pg_type: PgType) -> Self {
        Self {
            name,
            pg_type,
            primary_key: false,
            references: None,
        }
    }

    /// A nullable column referencing another table.
    pub const fn fk(name: &'static str, pg_type: PgType, references: &'static str) -> Self {
        Self {
            name,
            pg_type,
            primary_key: false,
            references: Some(references),
        }
    }
}

/// A CHECK constraint as written in a static catalog.
#[derive(Debug, Clone, Copy)]
pub struct CheckDef {
    pub name: &'static str,
    pub expr: &'static str,
}

/// A table as written in a static catalog.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub namespace: &'static str,
    pub name: &'static str,
    pub doc: &'static str,
    pub columns: &'static [ColumnDef],
    pub checks: &'static [CheckDef],
}

impl TableDef {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(self.namespace, self.name)
    }

    /// Convert this descriptor to an owned [`Table`].
    pub fn to_table(&self) -> Result<Table, SchemaError> {
        let name = self.qualified_name();
        let mut columns = Vec::with_capacity(self.columns.len());
        let mut foreign_keys = Vec::new();

        for col in self.columns {
            columns.push(Column {
                name: col.name.to_string(),
                pg_type: col.pg_type,
                nullable: !col.primary_key,
                primary_key: col.primary_key,
                identity: col.primary_key && col.pg_type == PgType::Integer,
            });

            if let Some(reference) = col.references {
                let Some((namespace, table, column)) = parse_fk_reference(reference) else {
                    return Err(SchemaError::MalformedForeignKey {
                        table: name,
                        column: col.name.to_string(),
                        reference: reference.to_string(),
                    });
                };
                foreign_keys.push(ForeignKey {
                    columns: vec![col.name.to_string()],
                    references_table: QualifiedName::new(namespace, table),
                    references_columns: vec![column.to_string()],
                });
            }
        }

        let check_constraints = self
            .checks
            .iter()
            .map(|check| CheckConstraint {
                name: check.name.to_string(),
                expr: check.expr.to_string(),
            })
            .collect();

        Ok(Table {
            name,
            columns,
            foreign_keys,
            check_constraints,
            doc: (!self.doc.is_empty()).then(|| self.doc.to_string()),
        })
    }
}

/// Parse a foreign key reference string.
///
/// Supports two formats:
/// - `namespace.table.column` (dot-separated)
/// - `namespace.table(column)` (parentheses)
///
/// Returns `Some((namespace, table, column))` on success, `None` on parse failure.
pub fn parse_fk_reference(fk_ref: &str) -> Option<(&str, &str, &str)> {
    let (namespace, rest) = fk_ref.split_once('.')?;
    if namespace.is_empty() {
        return None;
    }

    // Try "table(column)" format first, so a dot inside parens isn't split on
    if let Some(paren_idx) = rest.find('(') {
        if !rest.ends_with(')') {
            return None;
        }
        let table = &rest[..paren_idx];
        let col = &rest[paren_idx + 1..rest.len() - 1];
        if table.is_empty() || col.is_empty() || table.contains('.') {
            return None;
        }
        return Some((namespace, table, col));
    }

    let (table, col) = rest.split_once('.')?;
    if table.is_empty() || col.is_empty() || col.contains('.') {
        return None;
    }
    Some((namespace, table, col))
}

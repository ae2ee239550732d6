//! Creation-order solver - validates a catalog and orders its tables.
//!
//! Foreign keys are declared inline in `CREATE TABLE`, so a table can only be
//! created once every table it references exists:
//!
//! ```text
//! -- This fails:
//! CREATE TABLE "income"."paystub" (... REFERENCES "income"."employer" ("id"));  -- "employer" doesn't exist!
//! CREATE TABLE "income"."employer" (...);
//!
//! -- This works:
//! CREATE TABLE "income"."employer" (...);
//! CREATE TABLE "income"."paystub" (... REFERENCES "income"."employer" ("id"));
//! ```
//!
//! The solver simulates creation against a virtual schema, which both orders
//! the tables and proves the order is executable. Everything here is pure: a
//! catalog that cannot be created is rejected before any store is touched.

use hearthbook_schema::{
    Catalog, InvalidIdent, Namespace, QualifiedName, Table, create_namespace_sql,
    create_table_sql, foreign_key_constraint_name, validate_ident,
};
use std::collections::HashSet;

/// Error when a catalog cannot be created.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// A namespace, table or column name is not a valid identifier.
    InvalidIdentifier { object: String, error: InvalidIdent },
    /// A table declares the same column twice.
    DuplicateColumn { table: String, column: String },
    /// A table has no primary key column.
    MissingPrimaryKey { table: String },
    /// A foreign key uses columns the table doesn't have.
    ForeignKeyColumnsNotFound { table: String, columns: Vec<String> },
    /// A foreign key references a table that isn't in the catalog.
    ForeignKeyTargetNotFound {
        source_table: String,
        target_table: String,
    },
    /// A foreign key references columns the target table doesn't have.
    ForeignKeyTargetColumnsNotFound {
        source_table: String,
        target_table: String,
        columns: Vec<String>,
    },
    /// Source and target column counts differ.
    ForeignKeyArity {
        table: String,
        columns: usize,
        references: usize,
    },
    /// Tables reference each other in a loop and cannot be ordered.
    CycleDetected { tables: Vec<String> },
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::InvalidIdentifier { object, error } => {
                write!(f, "{}: {}", object, error)
            }
            SolverError::DuplicateColumn { table, column } => {
                write!(f, "column '{}.{}' is declared more than once", table, column)
            }
            SolverError::MissingPrimaryKey { table } => {
                write!(f, "table '{}' has no primary key", table)
            }
            SolverError::ForeignKeyColumnsNotFound { table, columns } => {
                write!(
                    f,
                    "foreign key columns {} not found in table '{}'",
                    columns.join(", "),
                    table
                )
            }
            SolverError::ForeignKeyTargetNotFound {
                source_table,
                target_table,
            } => {
                write!(
                    f,
                    "foreign key from '{}' references non-existent table '{}'",
                    source_table, target_table
                )
            }
            SolverError::ForeignKeyTargetColumnsNotFound {
                source_table,
                target_table,
                columns,
            } => {
                write!(
                    f,
                    "foreign key from '{}' references columns {} not found in table '{}'",
                    source_table,
                    columns.join(", "),
                    target_table
                )
            }
            SolverError::ForeignKeyArity {
                table,
                columns,
                references,
            } => {
                write!(
                    f,
                    "foreign key in '{}' maps {} column(s) onto {} column(s)",
                    table, columns, references
                )
            }
            SolverError::CycleDetected { tables } => {
                write!(
                    f,
                    "dependency cycle detected, cannot order: {}",
                    tables.join(" -> ")
                )
            }
        }
    }
}

impl std::error::Error for SolverError {}

/// Virtual schema state for simulating table creation.
#[derive(Debug, Clone, Default)]
pub struct VirtualSchema {
    tables: HashSet<QualifiedName>,
}

impl VirtualSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_exists(&self, name: &QualifiedName) -> bool {
        self.tables.contains(name)
    }

    /// Whether every table `table` references exists already.
    pub fn can_create(&self, table: &Table) -> bool {
        !self.table_exists(&table.name) && table.dependencies().all(|dep| self.table_exists(dep))
    }

    pub fn create(&mut self, table: &Table) {
        self.tables.insert(table.name.clone());
    }
}

/// A validated catalog in executable order.
#[derive(Debug, Clone)]
pub struct CreationPlan<'a> {
    /// Namespaces in order of first appearance in the catalog.
    pub namespaces: Vec<Namespace>,
    /// Tables in creation order.
    pub tables: Vec<&'a Table>,
}

impl CreationPlan<'_> {
    /// The whole plan as one SQL script: namespaces, then tables.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for namespace in &self.namespaces {
            sql.push_str(&create_namespace_sql(namespace));
            sql.push('\n');
        }
        for table in &self.tables {
            sql.push('\n');
            sql.push_str(&format!("-- Table: {}\n", table.name));
            sql.push_str(&create_table_sql(table));
            sql.push('\n');
        }
        sql
    }
}

fn check_ident(object: impl FnOnce() -> String, name: &str) -> Result<(), SolverError> {
    validate_ident(name).map_err(|error| SolverError::InvalidIdentifier {
        object: object(),
        error,
    })
}

/// Check everything about a catalog that can be checked without a store.
///
/// Does not check for cycles; [`plan`] does that while ordering.
pub fn validate(catalog: &Catalog) -> Result<(), SolverError> {
    for table in catalog.iter_tables() {
        let table_name = table.name.to_string();

        check_ident(|| format!("namespace of '{}'", table_name), &table.name.namespace)?;
        check_ident(|| format!("table '{}'", table_name), &table.name.name)?;

        let mut seen = HashSet::new();
        for column in &table.columns {
            check_ident(|| format!("column '{}.{}'", table_name, column.name), &column.name)?;
            if !seen.insert(column.name.as_str()) {
                return Err(SolverError::DuplicateColumn {
                    table: table_name,
                    column: column.name.clone(),
                });
            }
        }

        if table.primary_key().next().is_none() {
            return Err(SolverError::MissingPrimaryKey { table: table_name });
        }

        for check in &table.check_constraints {
            check_ident(|| format!("check constraint on '{}'", table_name), &check.name)?;
        }

        for fk in &table.foreign_keys {
            // Postgres truncates long names, so two of them could collide
            check_ident(
                || format!("foreign key constraint on '{}'", table_name),
                &foreign_key_constraint_name(table, fk),
            )?;

            let missing: Vec<String> = fk
                .columns
                .iter()
                .filter(|c| table.column(c).is_none())
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(SolverError::ForeignKeyColumnsNotFound {
                    table: table_name,
                    columns: missing,
                });
            }

            let Some(target) = catalog.get_table(&fk.references_table) else {
                return Err(SolverError::ForeignKeyTargetNotFound {
                    source_table: table_name,
                    target_table: fk.references_table.to_string(),
                });
            };

            let missing: Vec<String> = fk
                .references_columns
                .iter()
                .filter(|c| target.column(c).is_none())
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(SolverError::ForeignKeyTargetColumnsNotFound {
                    source_table: table_name,
                    target_table: target.name.to_string(),
                    columns: missing,
                });
            }

            if fk.columns.len() != fk.references_columns.len() {
                return Err(SolverError::ForeignKeyArity {
                    table: table_name,
                    columns: fk.columns.len(),
                    references: fk.references_columns.len(),
                });
            }
        }
    }

    Ok(())
}

/// Validate a catalog and order its tables so every foreign-key target is
/// created before the tables referencing it.
///
/// Tables that don't depend on each other keep their catalog order.
pub fn plan(catalog: &Catalog) -> Result<CreationPlan<'_>, SolverError> {
    validate(catalog)?;

    let namespaces = catalog
        .namespaces()
        .into_iter()
        .map(|ns| {
            Namespace::parse(ns).map_err(|error| SolverError::InvalidIdentifier {
                object: format!("namespace '{}'", ns),
                error,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let tables: Vec<&Table> = catalog.iter_tables().collect();
    let mut schema = VirtualSchema::new();
    let mut ordered: Vec<&Table> = Vec::with_capacity(tables.len());
    let mut scheduled = vec![false; tables.len()];

    // Keep sweeping until everything is scheduled or a sweep makes no progress
    while ordered.len() < tables.len() {
        let mut made_progress = false;

        for (i, table) in tables.iter().enumerate() {
            if scheduled[i] || !schema.can_create(table) {
                continue;
            }
            schema.create(table);
            ordered.push(table);
            scheduled[i] = true;
            made_progress = true;
        }

        if !made_progress {
            let pending: Vec<&Table> = tables
                .iter()
                .zip(&scheduled)
                .filter(|(_, done)| !**done)
                .map(|(t, _)| *t)
                .collect();
            return Err(SolverError::CycleDetected {
                tables: find_cycle(&pending, &schema),
            });
        }
    }

    Ok(CreationPlan {
        namespaces,
        tables: ordered,
    })
}

/// Walk unscheduled dependencies from the first pending table until a table
/// repeats. Every pending table has at least one pending dependency, so the
/// walk always closes a loop.
fn find_cycle(pending: &[&Table], schema: &VirtualSchema) -> Vec<String> {
    let mut path: Vec<&QualifiedName> = Vec::new();
    let Some(mut current) = pending.first().copied() else {
        return Vec::new();
    };

    loop {
        if let Some(start) = path.iter().position(|name| **name == current.name) {
            let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
            cycle.push(current.name.to_string());
            return cycle;
        }
        path.push(&current.name);

        let next = current
            .dependencies()
            .filter(|dep| !schema.table_exists(dep))
            .find_map(|dep| pending.iter().copied().find(|t| t.name == *dep));
        match next {
            Some(table) => current = table,
            None => return path.iter().map(|n| n.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearthbook_schema::{CheckDef, ColumnDef, ForeignKey, PgType, TableDef};

    const ID_ONLY: &[ColumnDef] = &[ColumnDef::id("id")];

    const EMPLOYER_FK: &[ColumnDef] = &[
        ColumnDef::id("id"),
        ColumnDef::fk("employer_id", PgType::Integer, "income.employer.id"),
    ];

    fn make_def(
        namespace: &'static str,
        name: &'static str,
        columns: &'static [ColumnDef],
    ) -> TableDef {
        TableDef {
            namespace,
            name,
            doc: "",
            columns,
            checks: &[],
        }
    }

    fn names(plan: &CreationPlan<'_>) -> Vec<String> {
        plan.tables.iter().map(|t| t.name.to_string()).collect()
    }

    // ==================== Virtual Schema Tests ====================

    #[test]
    fn test_virtual_schema_create() {
        let employer = make_def("income", "employer", ID_ONLY).to_table().unwrap();
        let mut schema = VirtualSchema::new();

        assert!(schema.can_create(&employer));
        schema.create(&employer);
        assert!(schema.table_exists(&employer.name));
        assert!(!schema.can_create(&employer));
    }

    #[test]
    fn test_virtual_schema_fk_target_missing() {
        let paystub = make_def("income", "paystub", EMPLOYER_FK).to_table().unwrap();
        let employer = make_def("income", "employer", ID_ONLY).to_table().unwrap();
        let mut schema = VirtualSchema::new();

        assert!(!schema.can_create(&paystub));
        schema.create(&employer);
        assert!(schema.can_create(&paystub));
    }

    // ==================== Ordering Tests ====================

    #[test]
    fn test_parent_declared_after_child() {
        const CAPITAL_GAIN: &[ColumnDef] = &[
            ColumnDef::id("id"),
            ColumnDef::fk("stock_bond_id", PgType::Integer, "equity.stock.id"),
        ];
        let catalog = Catalog::from_defs(&[
            make_def("equity", "capital_gain_tax", CAPITAL_GAIN),
            make_def("equity", "savings", ID_ONLY),
            make_def("equity", "stock", ID_ONLY),
        ])
        .unwrap();

        let plan = plan(&catalog).unwrap();
        assert_eq!(
            names(&plan),
            vec!["equity.savings", "equity.stock", "equity.capital_gain_tax"]
        );
    }

    #[test]
    fn test_independent_tables_keep_catalog_order() {
        let catalog = Catalog::from_defs(&[
            make_def("equity", "roth", ID_ONLY),
            make_def("income", "employer", ID_ONLY),
            make_def("equity", "bond", ID_ONLY),
        ])
        .unwrap();

        let plan = plan(&catalog).unwrap();
        assert_eq!(
            names(&plan),
            vec!["equity.roth", "income.employer", "equity.bond"]
        );
        let namespaces: Vec<&str> = plan.namespaces.iter().map(|n| n.as_str()).collect();
        assert_eq!(namespaces, vec!["equity", "income"]);
    }

    #[test]
    fn test_self_reference_does_not_block() {
        const SELF_REF: &[ColumnDef] = &[
            ColumnDef::id("id"),
            ColumnDef::fk("parent_id", PgType::Integer, "income.employer.id"),
        ];
        let catalog = Catalog::from_defs(&[make_def("income", "employer", SELF_REF)]).unwrap();

        let plan = plan(&catalog).unwrap();
        assert_eq!(names(&plan), vec!["income.employer"]);
    }

    #[test]
    fn test_cycle_detected() {
        const A: &[ColumnDef] = &[
            ColumnDef::id("id"),
            ColumnDef::fk("b_id", PgType::Integer, "income.b.id"),
        ];
        const B: &[ColumnDef] = &[
            ColumnDef::id("id"),
            ColumnDef::fk("a_id", PgType::Integer, "income.a.id"),
        ];
        let catalog = Catalog::from_defs(&[
            make_def("income", "employer", ID_ONLY),
            make_def("income", "a", A),
            make_def("income", "b", B),
        ])
        .unwrap();

        let err = plan(&catalog).unwrap_err();
        assert_eq!(
            err,
            SolverError::CycleDetected {
                tables: vec![
                    "income.a".to_string(),
                    "income.b".to_string(),
                    "income.a".to_string()
                ]
            }
        );
        assert_eq!(
            err.to_string(),
            "dependency cycle detected, cannot order: income.a -> income.b -> income.a"
        );
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_error_fk_to_table_not_in_catalog() {
        let catalog = Catalog::from_defs(&[make_def("income", "paystub", EMPLOYER_FK)]).unwrap();

        let err = plan(&catalog).unwrap_err();
        assert_eq!(
            err,
            SolverError::ForeignKeyTargetNotFound {
                source_table: "income.paystub".to_string(),
                target_table: "income.employer".to_string(),
            }
        );
    }

    #[test]
    fn test_error_fk_target_column_missing() {
        const WRONG_COLUMN: &[ColumnDef] = &[
            ColumnDef::id("id"),
            ColumnDef::fk("employer_id", PgType::Integer, "income.employer.employer_id"),
        ];
        let catalog = Catalog::from_defs(&[
            make_def("income", "employer", ID_ONLY),
            make_def("income", "paystub", WRONG_COLUMN),
        ])
        .unwrap();

        let err = validate(&catalog).unwrap_err();
        assert!(matches!(
            err,
            SolverError::ForeignKeyTargetColumnsNotFound { ref columns, .. } if columns == &["employer_id"]
        ));
    }

    #[test]
    fn test_error_invalid_identifiers() {
        let catalog = Catalog::from_defs(&[make_def("Income", "employer", ID_ONLY)]).unwrap();
        let err = validate(&catalog).unwrap_err();
        assert!(matches!(err, SolverError::InvalidIdentifier { .. }));

        const SPACED: &[ColumnDef] = &[ColumnDef::id("id"), ColumnDef::new("zip code", PgType::Text)];
        let catalog = Catalog::from_defs(&[make_def("income", "employer", SPACED)]).unwrap();
        let err = validate(&catalog).unwrap_err();
        assert!(err.to_string().starts_with("column 'income.employer.zip code'"));
    }

    #[test]
    fn test_error_long_foreign_key_name() {
        const CONTRIBUTION: &[ColumnDef] = &[
            ColumnDef::id("id"),
            ColumnDef::fk(
                "retirement_account_employer_id",
                PgType::Integer,
                "income.employer.id",
            ),
        ];
        let catalog = Catalog::from_defs(&[
            make_def("income", "employer", ID_ONLY),
            make_def("equity", "household_contribution_record", CONTRIBUTION),
        ])
        .unwrap();

        // Every identifier fits on its own; the derived constraint name doesn't
        let err = validate(&catalog).unwrap_err();
        match err {
            SolverError::InvalidIdentifier { object, error } => {
                assert_eq!(
                    object,
                    "foreign key constraint on 'equity.household_contribution_record'"
                );
                assert_eq!(
                    error.name,
                    "household_contribution_record_retirement_account_employer_id_fkey"
                );
                assert!(error.name.len() > hearthbook_schema::PG_IDENT_MAX);
            }
            other => panic!("expected InvalidIdentifier, got {other:?}"),
        }
    }

    #[test]
    fn test_error_duplicate_column() {
        const DUPLICATED: &[ColumnDef] = &[
            ColumnDef::id("id"),
            ColumnDef::new("balance", PgType::Numeric),
            ColumnDef::new("balance", PgType::Numeric),
        ];
        let catalog = Catalog::from_defs(&[make_def("equity", "roth", DUPLICATED)]).unwrap();

        assert_eq!(
            validate(&catalog).unwrap_err(),
            SolverError::DuplicateColumn {
                table: "equity.roth".to_string(),
                column: "balance".to_string(),
            }
        );
    }

    #[test]
    fn test_error_missing_primary_key() {
        const NO_KEY: &[ColumnDef] = &[ColumnDef::new("balance", PgType::Numeric)];
        let catalog = Catalog::from_defs(&[make_def("equity", "roth", NO_KEY)]).unwrap();

        assert_eq!(
            validate(&catalog).unwrap_err(),
            SolverError::MissingPrimaryKey {
                table: "equity.roth".to_string()
            }
        );
    }

    #[test]
    fn test_error_fk_arity_and_source_columns() {
        const PLAIN: &[ColumnDef] = &[
            ColumnDef::id("id"),
            ColumnDef::new("employer_id", PgType::Integer),
        ];
        let mut catalog = Catalog::from_defs(&[
            make_def("income", "employer", ID_ONLY),
            make_def("income", "paystub", PLAIN),
        ])
        .unwrap();

        let paystub = QualifiedName::new("income", "paystub");
        let table = catalog.tables.get_mut(&paystub).unwrap();
        table.foreign_keys.push(ForeignKey {
            columns: vec!["employer_id".to_string(), "id".to_string()],
            references_table: QualifiedName::new("income", "employer"),
            references_columns: vec!["id".to_string()],
        });
        assert!(matches!(
            validate(&catalog).unwrap_err(),
            SolverError::ForeignKeyArity {
                columns: 2,
                references: 1,
                ..
            }
        ));

        let table = catalog.tables.get_mut(&paystub).unwrap();
        table.foreign_keys[0].columns = vec!["missing_id".to_string()];
        assert!(matches!(
            validate(&catalog).unwrap_err(),
            SolverError::ForeignKeyColumnsNotFound { ref columns, .. } if columns == &["missing_id"]
        ));
    }

    #[test]
    fn test_plan_sql_output() {
        let catalog = Catalog::from_defs(&[
            make_def("income", "paystub", EMPLOYER_FK),
            TableDef {
                namespace: "income",
                name: "employer",
                doc: "",
                columns: ID_ONLY,
                checks: &[CheckDef {
                    name: "employer_id_positive",
                    expr: "id > 0",
                }],
            },
        ])
        .unwrap();

        let plan = plan(&catalog).unwrap();
        insta::assert_snapshot!(plan.to_sql(), @r#"
        CREATE SCHEMA "income";

        -- Table: income.employer
        CREATE TABLE "income"."employer" (
            "id" INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
            CONSTRAINT "employer_id_positive" CHECK (id > 0)
        );

        -- Table: income.paystub
        CREATE TABLE "income"."paystub" (
            "id" INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
            "employer_id" INTEGER,
            CONSTRAINT "paystub_employer_id_fkey" FOREIGN KEY ("employer_id") REFERENCES "income"."employer" ("id")
        );
        "#);
    }
}

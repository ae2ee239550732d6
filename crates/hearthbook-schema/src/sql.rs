//! DDL generation.

use crate::{ForeignKey, Namespace, Table, quote_ident};

/// Generate CREATE SCHEMA SQL for a namespace.
///
/// No `IF NOT EXISTS`: callers check for the namespace first, so a duplicate
/// here is a real conflict the store should report.
pub fn create_namespace_sql(namespace: &Namespace) -> String {
    format!("CREATE SCHEMA {};", quote_ident(namespace.as_str()))
}

/// Postgres' default name for a single-table foreign key constraint.
pub fn foreign_key_constraint_name(table: &Table, fk: &ForeignKey) -> String {
    format!("{}_{}_fkey", table.name.name, fk.columns.join("_"))
}

/// Generate CREATE TABLE SQL statement.
///
/// Foreign keys are declared inline, so every referenced table must already
/// exist when this runs.
pub fn create_table_sql(table: &Table) -> String {
    let mut sql = format!("CREATE TABLE {} (\n", table.name.to_sql());

    // Collect primary key columns
    let pk_columns: Vec<&str> = table.primary_key().map(|c| c.name.as_str()).collect();

    // If there's more than one PK column, we need a table constraint
    let use_table_pk_constraint = pk_columns.len() > 1;

    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|col| {
            let mut def = format!("    {} {}", quote_ident(&col.name), col.pg_type);

            if col.identity {
                def.push_str(" GENERATED ALWAYS AS IDENTITY");
            }

            // Only add inline PRIMARY KEY for single-column PKs
            if col.primary_key && !use_table_pk_constraint {
                def.push_str(" PRIMARY KEY");
            }

            // PK columns are implicitly NOT NULL, composite ones need it spelled out
            if !col.nullable && (!col.primary_key || use_table_pk_constraint) {
                def.push_str(" NOT NULL");
            }

            def
        })
        .collect();

    if use_table_pk_constraint {
        let quoted_pk_cols: Vec<_> = pk_columns.iter().map(|c| quote_ident(c)).collect();
        parts.push(format!("    PRIMARY KEY ({})", quoted_pk_cols.join(", ")));
    }

    for fk in &table.foreign_keys {
        let quoted_cols: Vec<_> = fk.columns.iter().map(|c| quote_ident(c)).collect();
        let quoted_ref_cols: Vec<_> = fk
            .references_columns
            .iter()
            .map(|c| quote_ident(c))
            .collect();
        parts.push(format!(
            "    CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_ident(&foreign_key_constraint_name(table, fk)),
            quoted_cols.join(", "),
            fk.references_table.to_sql(),
            quoted_ref_cols.join(", ")
        ));
    }

    for check in &table.check_constraints {
        parts.push(format!(
            "    CONSTRAINT {} CHECK ({})",
            quote_ident(&check.name),
            check.expr
        ));
    }

    sql.push_str(&parts.join(",\n"));
    sql.push_str("\n);");

    sql
}

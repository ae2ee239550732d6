//! In-process store.
//!
//! Behaves like Postgres for the DDL the bootstrap issues: a table can only be
//! created inside an existing namespace, every foreign-key target must already
//! exist, and creating an existing object is a duplicate error. Every DDL
//! statement is journaled as the SQL the Postgres store would have run.

use crate::store::{SchemaStore, StoreError, StoreFuture};
use hearthbook_schema::{Namespace, QualifiedName, Table, create_namespace_sql, create_table_sql};
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: IndexSet<String>,
    tables: IndexMap<QualifiedName, Table>,
    journal: Vec<String>,
    lookups: usize,
    /// Table creations left before the store starts failing.
    failure_budget: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every table creation after the first `successes` fail as if the
    /// connection had dropped.
    pub fn fail_after_tables(&mut self, successes: usize) {
        self.failure_budget = Some(successes);
    }

    /// Stop injecting failures.
    pub fn heal(&mut self) {
        self.failure_budget = None;
    }

    /// Add a namespace without journaling it, as if a previous run made it.
    pub fn seed_namespace(&mut self, namespace: &str) {
        self.namespaces.insert(namespace.to_string());
    }

    /// Add a table without journaling it, as if a previous run made it.
    pub fn seed_table(&mut self, table: Table) {
        self.namespaces.insert(table.name.namespace.clone());
        self.tables.insert(table.name.clone(), table);
    }

    /// DDL statements executed so far, in order.
    pub fn journal(&self) -> &[String] {
        &self.journal
    }

    /// Return and clear the journal.
    pub fn take_journal(&mut self) -> Vec<String> {
        std::mem::take(&mut self.journal)
    }

    /// Number of existence checks answered so far.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    pub fn has_table(&self, name: &QualifiedName) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table(&self, name: &QualifiedName) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Tables in the order they were created.
    pub fn table_names(&self) -> impl Iterator<Item = &QualifiedName> {
        self.tables.keys()
    }

    fn check_table(&self, table: &Table) -> Result<(), StoreError> {
        if let Some(budget) = self.failure_budget
            && budget == 0
        {
            return Err(StoreError::Unavailable(format!(
                "connection lost while creating {}",
                table.name
            )));
        }

        if !self.namespaces.contains(&table.name.namespace) {
            return Err(StoreError::Rejected(format!(
                "schema \"{}\" does not exist",
                table.name.namespace
            )));
        }

        if self.tables.contains_key(&table.name) {
            return Err(StoreError::AlreadyExists {
                object: table.name.to_string(),
            });
        }

        for target in table.dependencies() {
            let Some(parent) = self.tables.get(target) else {
                return Err(StoreError::Rejected(format!(
                    "relation \"{}\" does not exist",
                    target
                )));
            };
            let fk = table
                .foreign_keys
                .iter()
                .find(|fk| fk.references_table == *target);
            if let Some(fk) = fk {
                for column in &fk.references_columns {
                    if parent.column(column).is_none() {
                        return Err(StoreError::Rejected(format!(
                            "column \"{}\" referenced in foreign key constraint does not exist",
                            column
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

impl SchemaStore for MemoryStore {
    fn namespace_exists<'a>(&'a mut self, namespace: &'a Namespace) -> StoreFuture<'a, bool> {
        self.lookups += 1;
        let exists = self.namespaces.contains(namespace.as_str());
        Box::pin(async move { Ok(exists) })
    }

    fn create_namespace<'a>(&'a mut self, namespace: &'a Namespace) -> StoreFuture<'a, ()> {
        let result = if self.namespaces.contains(namespace.as_str()) {
            Err(StoreError::AlreadyExists {
                object: namespace.to_string(),
            })
        } else {
            self.journal.push(create_namespace_sql(namespace));
            self.namespaces.insert(namespace.to_string());
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn table_exists<'a>(&'a mut self, table: &'a QualifiedName) -> StoreFuture<'a, bool> {
        self.lookups += 1;
        let exists = self.tables.contains_key(table);
        Box::pin(async move { Ok(exists) })
    }

    fn create_table<'a>(&'a mut self, table: &'a Table) -> StoreFuture<'a, ()> {
        let result = self.check_table(table).map(|()| {
            if let Some(budget) = self.failure_budget.as_mut() {
                *budget -= 1;
            }
            self.journal.push(create_table_sql(table));
            self.tables.insert(table.name.clone(), table.clone());
        });
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearthbook_schema::{ColumnDef, PgType, TableDef};

    const EMPLOYER: TableDef = TableDef {
        namespace: "income",
        name: "employer",
        doc: "",
        columns: &[ColumnDef::id("id")],
        checks: &[],
    };

    const PAYSTUB: TableDef = TableDef {
        namespace: "income",
        name: "paystub",
        doc: "",
        columns: &[
            ColumnDef::id("id"),
            ColumnDef::fk("employer_id", PgType::Integer, "income.employer.id"),
        ],
        checks: &[],
    };

    #[tokio::test]
    async fn test_table_requires_namespace() {
        let mut store = MemoryStore::new();
        let employer = EMPLOYER.to_table().unwrap();

        let result = store.create_table(&employer).await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));
        assert!(store.journal().is_empty());
    }

    #[tokio::test]
    async fn test_table_requires_fk_target() {
        let mut store = MemoryStore::new();
        store.seed_namespace("income");
        let paystub = PAYSTUB.to_table().unwrap();

        let result = store.create_table(&paystub).await;
        assert!(matches!(result, Err(StoreError::Rejected(msg)) if msg.contains("income.employer")));

        store.create_table(&EMPLOYER.to_table().unwrap()).await.unwrap();
        store.create_table(&paystub).await.unwrap();
        assert_eq!(store.journal().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicates_are_classified() {
        let mut store = MemoryStore::new();
        let income = Namespace::parse("income").unwrap();
        store.create_namespace(&income).await.unwrap();

        let result = store.create_namespace(&income).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));

        let employer = EMPLOYER.to_table().unwrap();
        store.create_table(&employer).await.unwrap();
        let result = store.create_table(&employer).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mut store = MemoryStore::new();
        store.seed_namespace("income");
        store.fail_after_tables(1);

        store.create_table(&EMPLOYER.to_table().unwrap()).await.unwrap();
        let result = store.create_table(&PAYSTUB.to_table().unwrap()).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        store.heal();
        store.create_table(&PAYSTUB.to_table().unwrap()).await.unwrap();
        assert_eq!(store.table_names().count(), 2);
    }
}

//! Postgres-backed store.
//!
//! Wraps a single tokio-postgres connection and logs every statement via
//! tracing.

use crate::store::{SchemaStore, StoreError, StoreFuture};
use hearthbook_schema::{Namespace, QualifiedName, Table, create_namespace_sql, create_table_sql};
use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::Instrument;

const NAMESPACE_EXISTS_SQL: &str =
    "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1)";

const TABLE_EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_tables WHERE schemaname = $1 AND tablename = $2)";

/// A store that owns one Postgres connection for the duration of a bootstrap.
///
/// Dropping the store closes the connection; [`PgStore::close`] does the same
/// and also waits for the connection task to finish.
///
/// # Example
///
/// ```ignore
/// let mut store = PgStore::connect(&config).await?;
/// let report = Bootstrapper::new(&catalog).run(&mut store).await;
/// store.close().await;
/// ```
pub struct PgStore {
    client: Client,
    driver: JoinHandle<()>,
}

impl PgStore {
    /// Open a connection and spawn its driver task.
    pub async fn connect(config: &tokio_postgres::Config) -> Result<Self, tokio_postgres::Error> {
        let (client, connection) = config.connect(NoTls).await?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "database connection error");
            }
        });

        Ok(Self { client, driver })
    }

    /// Close the connection and wait for the driver task to exit.
    pub async fn close(self) {
        let Self { client, driver } = self;
        drop(client);
        if let Err(e) = driver.await {
            tracing::warn!(error = %e, "connection task did not shut down cleanly");
        }
    }

    async fn query_exists(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<bool, tokio_postgres::Error> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            exists = tracing::field::Empty,
        );
        let row = self
            .client
            .query_one(sql, params)
            .instrument(span.clone())
            .await?;
        let exists: bool = row.try_get(0)?;
        span.record("exists", exists);
        Ok(exists)
    }

    /// Run one DDL statement in its own transaction.
    async fn execute_ddl(&mut self, object: String, sql: String) -> Result<(), StoreError> {
        let span = tracing::debug_span!("db.execute", object = %object, sql = %sql);
        async {
            let tx = self.client.transaction().await?;
            tx.batch_execute(&sql)
                .await
                .map_err(|e| classify(e, &object))?;
            tx.commit().await?;
            Ok::<(), StoreError>(())
        }
        .instrument(span)
        .await
    }
}

/// Turn duplicate-object errors into [`StoreError::AlreadyExists`].
fn classify(err: tokio_postgres::Error, object: &str) -> StoreError {
    match err.code() {
        Some(code) if *code == SqlState::DUPLICATE_SCHEMA || *code == SqlState::DUPLICATE_TABLE => {
            StoreError::AlreadyExists {
                object: object.to_string(),
            }
        }
        _ => StoreError::Postgres(err),
    }
}

impl SchemaStore for PgStore {
    fn namespace_exists<'a>(&'a mut self, namespace: &'a Namespace) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            Ok(self
                .query_exists(NAMESPACE_EXISTS_SQL, &[&namespace.as_str()])
                .await?)
        })
    }

    fn create_namespace<'a>(&'a mut self, namespace: &'a Namespace) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.execute_ddl(namespace.to_string(), create_namespace_sql(namespace))
                .await
        })
    }

    fn table_exists<'a>(&'a mut self, table: &'a QualifiedName) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            Ok(self
                .query_exists(TABLE_EXISTS_SQL, &[&table.namespace, &table.name])
                .await?)
        })
    }

    fn create_table<'a>(&'a mut self, table: &'a Table) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.execute_ddl(table.name.to_string(), create_table_sql(table))
                .await
        })
    }
}

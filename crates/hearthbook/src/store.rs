//! The seam between the bootstrap procedure and a concrete database.

use hearthbook_schema::{Namespace, QualifiedName, Table};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`SchemaStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Errors reported by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// The object exists already, as classified by the store itself
    /// (for Postgres: SQLSTATE 42P06 / 42P07).
    #[error("{object} already exists")]
    AlreadyExists { object: String },

    #[error("statement rejected: {0}")]
    Rejected(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// DDL operations the bootstrap needs from a database.
///
/// Implemented by [`PgStore`](crate::PgStore) for real databases and by
/// [`MemoryStore`](crate::MemoryStore) for tests.
///
/// Each `create_*` call is its own unit of work: when it returns `Ok`, the
/// object is committed.
pub trait SchemaStore: Send {
    /// Whether the namespace exists.
    fn namespace_exists<'a>(&'a mut self, namespace: &'a Namespace) -> StoreFuture<'a, bool>;

    /// Create a namespace and commit.
    fn create_namespace<'a>(&'a mut self, namespace: &'a Namespace) -> StoreFuture<'a, ()>;

    /// Whether the table exists in its namespace.
    fn table_exists<'a>(&'a mut self, table: &'a QualifiedName) -> StoreFuture<'a, bool>;

    /// Create a table (columns, keys, checks) and commit.
    fn create_table<'a>(&'a mut self, table: &'a Table) -> StoreFuture<'a, ()>;
}

use crate::solver::SolverError;
use crate::store::StoreError;
use hearthbook_schema::{InvalidIdent, QualifiedName, SchemaError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot connect to database: {0}")]
    Connect(#[source] tokio_postgres::Error),

    #[error("invalid namespace name: {0}")]
    InvalidNamespace(#[from] InvalidIdent),

    #[error("invalid catalog: {0}")]
    Schema(#[from] SchemaError),

    #[error("invalid table definitions: {0}")]
    Definition(#[from] SolverError),

    #[error("checking {object}: {source}")]
    Inspect { object: String, source: StoreError },

    #[error("creating namespace {namespace}: {source}")]
    CreateNamespace {
        namespace: String,
        source: StoreError,
    },

    #[error("creating table {table} ({position} of {total}): {source}")]
    CreateTable {
        table: QualifiedName,
        position: usize,
        total: usize,
        source: StoreError,
    },

    #[error("{object} is still missing after bootstrap")]
    NotConfirmed { object: String },
}

pub type Result<T> = std::result::Result<T, Error>;

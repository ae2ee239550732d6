//! Idempotent Postgres bootstrap for a household finance ledger.
//!
//! This crate provides:
//! - The household catalog: 18 tables across the `income` and `equity` namespaces
//! - A solver that validates table definitions and orders them by foreign key
//! - A namespace provisioner and a bootstrapper that create only what is missing
//!
//! # Store access
//!
//! Everything that touches a database goes through [`SchemaStore`].
//! [`PgStore`] talks to Postgres over one connection; [`MemoryStore`] keeps
//! everything in process and journals the DDL it would have run.
//!
//! ```ignore
//! let catalog = hearthbook::catalog::household()?;
//! let mut store = PgStore::connect(&config).await.map_err(Error::Connect)?;
//! let report = Bootstrapper::new(&catalog).run(&mut store).await?;
//! store.close().await;
//! ```
//!
//! # Re-running
//!
//! Every namespace and table is checked before it is created and committed on
//! its own. Running the bootstrap against a database that already has the
//! schema issues no DDL; running it after a failure creates whatever the
//! failed run didn't get to.

mod bootstrap;
pub mod catalog;
mod error;
mod memory;
mod postgres;
mod provision;
pub mod solver;
mod store;

pub use bootstrap::{BootstrapReport, Bootstrapper, bootstrap};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use provision::{NamespaceReport, ensure_namespaces, ensure_parsed};
pub use solver::{CreationPlan, SolverError};
pub use store::{SchemaStore, StoreError, StoreFuture};

// Re-export the schema model for convenience
pub use hearthbook_schema::*;

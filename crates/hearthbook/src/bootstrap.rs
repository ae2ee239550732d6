//! The bootstrap procedure: validate, provision, create, confirm.

use crate::error::{Error, Result};
use crate::postgres::PgStore;
use crate::provision::{NamespaceReport, ensure_parsed};
use crate::solver::{self, CreationPlan};
use crate::store::{SchemaStore, StoreError};
use hearthbook_schema::{Catalog, QualifiedName};

/// What a bootstrap run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub namespaces: NamespaceReport,
    /// Tables created by this run, in creation order.
    pub tables_created: Vec<QualifiedName>,
    /// Tables that were already present, in creation order.
    pub tables_present: Vec<QualifiedName>,
}

impl BootstrapReport {
    /// Number of mutating statements this run issued.
    pub fn ddl_statements(&self) -> usize {
        self.namespaces.created.len() + self.tables_created.len()
    }

    /// Whether the store was already fully bootstrapped.
    pub fn is_noop(&self) -> bool {
        self.ddl_statements() == 0
    }
}

/// Applies a catalog to a store.
///
/// # Example
///
/// ```ignore
/// let catalog = hearthbook::catalog::household()?;
/// let report = Bootstrapper::new(&catalog).run(&mut store).await?;
/// println!("{} statements", report.ddl_statements());
/// ```
pub struct Bootstrapper<'a> {
    catalog: &'a Catalog,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Validate the catalog and compute the creation order.
    pub fn plan(&self) -> Result<CreationPlan<'a>> {
        Ok(solver::plan(self.catalog)?)
    }

    /// Bring the store up to the catalog.
    ///
    /// The catalog is validated and ordered before the first store call. Each
    /// namespace and table is its own unit of work, so after a failure the
    /// objects created so far stay and a re-run picks up where this one
    /// stopped.
    pub async fn run<S>(&self, store: &mut S) -> Result<BootstrapReport>
    where
        S: SchemaStore + ?Sized,
    {
        let plan = self.plan()?;
        let total = plan.tables.len();

        let namespaces = ensure_parsed(store, &plan.namespaces).await?;
        let mut report = BootstrapReport {
            namespaces,
            ..Default::default()
        };

        for (index, table) in plan.tables.iter().enumerate() {
            let position = index + 1;
            let exists = store
                .table_exists(&table.name)
                .await
                .map_err(|source| Error::Inspect {
                    object: format!("table {}", table.name),
                    source,
                })?;
            if exists {
                tracing::debug!(table = %table.name, "table already present");
                report.tables_present.push(table.name.clone());
                continue;
            }

            match store.create_table(table).await {
                Ok(()) => {
                    tracing::info!(table = %table.name, position, total, "created table");
                    report.tables_created.push(table.name.clone());
                }
                Err(StoreError::AlreadyExists { .. }) => {
                    tracing::warn!(
                        table = %table.name,
                        "table appeared while bootstrapping, treating as present"
                    );
                    report.tables_present.push(table.name.clone());
                }
                Err(source) => {
                    return Err(Error::CreateTable {
                        table: table.name.clone(),
                        position,
                        total,
                        source,
                    });
                }
            }
        }

        confirm(store, &plan).await?;

        tracing::info!(
            namespaces_created = report.namespaces.created.len(),
            tables_created = report.tables_created.len(),
            tables_present = report.tables_present.len(),
            "bootstrap complete"
        );
        Ok(report)
    }
}

/// Check that every object in the plan exists.
async fn confirm<S>(store: &mut S, plan: &CreationPlan<'_>) -> Result<()>
where
    S: SchemaStore + ?Sized,
{
    for namespace in &plan.namespaces {
        let object = format!("namespace {}", namespace);
        match store.namespace_exists(namespace).await {
            Ok(true) => {}
            Ok(false) => return Err(Error::NotConfirmed { object }),
            Err(source) => return Err(Error::Inspect { object, source }),
        }
    }

    for table in &plan.tables {
        let object = format!("table {}", table.name);
        match store.table_exists(&table.name).await {
            Ok(true) => {}
            Ok(false) => return Err(Error::NotConfirmed { object }),
            Err(source) => return Err(Error::Inspect { object, source }),
        }
    }

    Ok(())
}

/// Connect, bootstrap `catalog` and disconnect.
///
/// The catalog is validated before connecting. The connection is closed on
/// every path.
pub async fn bootstrap(
    config: &tokio_postgres::Config,
    catalog: &Catalog,
) -> Result<BootstrapReport> {
    let bootstrapper = Bootstrapper::new(catalog);
    bootstrapper.plan()?;

    let mut store = PgStore::connect(config).await.map_err(Error::Connect)?;
    let result = bootstrapper.run(&mut store).await;
    store.close().await;
    result
}

//! Namespace provisioning.

use crate::error::{Error, Result};
use crate::store::{SchemaStore, StoreError};
use hearthbook_schema::Namespace;

/// Outcome of provisioning namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceReport {
    /// Namespaces this call created, in request order.
    pub created: Vec<Namespace>,
    /// Namespaces that already existed.
    pub present: Vec<Namespace>,
}

/// Ensure every named namespace exists.
///
/// All names are validated before the store is touched, so a malformed name
/// never leaves a partial result behind. Repeated names are provisioned once.
pub async fn ensure_namespaces<S>(store: &mut S, names: &[&str]) -> Result<NamespaceReport>
where
    S: SchemaStore + ?Sized,
{
    let namespaces = names
        .iter()
        .map(|name| Namespace::parse(name))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    ensure_parsed(store, &namespaces).await
}

/// Like [`ensure_namespaces`], for names that are already validated.
pub async fn ensure_parsed<S>(store: &mut S, namespaces: &[Namespace]) -> Result<NamespaceReport>
where
    S: SchemaStore + ?Sized,
{
    let mut report = NamespaceReport::default();

    for namespace in namespaces {
        if report.created.contains(namespace) || report.present.contains(namespace) {
            continue;
        }

        let exists = store
            .namespace_exists(namespace)
            .await
            .map_err(|source| Error::Inspect {
                object: format!("namespace {}", namespace),
                source,
            })?;
        if exists {
            tracing::debug!(namespace = %namespace, "namespace already present");
            report.present.push(namespace.clone());
            continue;
        }

        match store.create_namespace(namespace).await {
            Ok(()) => {
                tracing::info!(namespace = %namespace, "created namespace");
                report.created.push(namespace.clone());
            }
            Err(StoreError::AlreadyExists { .. }) => {
                tracing::warn!(
                    namespace = %namespace,
                    "namespace appeared while provisioning, treating as present"
                );
                report.present.push(namespace.clone());
            }
            Err(source) => {
                return Err(Error::CreateNamespace {
                    namespace: namespace.to_string(),
                    source,
                });
            }
        }
    }

    Ok(report)
}

use serde_json::json;
use tracing::info;

use super::{ResourceStore, StoreError, namespace_gvk};
use crate::templates::operator_labels;

pub async fn exists(
    store: &dyn ResourceStore,
    name: &str,
) -> Result<bool, StoreError> {
    match store.get(&namespace_gvk(), None, name).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Create the namespace when absent. Already-exists (a conflicting create
/// racing this pass) counts as success.
pub async fn ensure(
    store: &dyn ResourceStore,
    name: &str,
) -> Result<(), StoreError> {
    match store.get(&namespace_gvk(), None, name).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            info!(ns = %name, "creating namespace");
            let manifest = json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": {
                    "name": name,
                    "labels": operator_labels(),
                },
            });
            match store.create(&namespace_gvk(), &manifest).await {
                Ok(()) | Err(StoreError::Conflict) => Ok(()),
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

/// Delete the namespace; reserved for full teardown so a subsystem toggled
/// off and on does not lose user data. NotFound is success.
pub async fn delete(
    store: &dyn ResourceStore,
    name: &str,
) -> Result<(), StoreError> {
    match store.delete(&namespace_gvk(), None, name).await {
        Ok(()) => {
            info!(ns = %name, "deleted namespace");
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

//! Typed CRUD over the flat store namespace.
//!
//! Each registry owns one key prefix (`node:`, `model:`, `replica:`) and stores
//! its entities as JSON. Registries hold no state besides the shared store.

mod model;
mod node;
mod replica;

pub use model::ModelRegistry;
pub use node::{NodeRegistry, StatusHeartbeatPolicy};
pub use replica::ReplicaRegistry;

use edgernetes_meta::{MetaStore, StoreError};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} id cannot be empty")]
    EmptyId { kind: &'static str },

    #[error("{kind} info id {info_id:?} does not match {kind} id {id:?}")]
    IdMismatch {
        kind: &'static str,
        id: String,
        info_id: String,
    },

    #[error("{kind} {id:?} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("encode {kind} {id:?}: {source}")]
    Encode {
        kind: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("decode {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistryError {
    /// Caller-side mistakes, as opposed to storage or data corruption.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            RegistryError::EmptyId { .. }
                | RegistryError::IdMismatch { .. }
                | RegistryError::Store(StoreError::EmptyKey)
        )
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

fn require_id(kind: &'static str, id: &str) -> RegistryResult<()> {
    if id.is_empty() {
        return Err(RegistryError::EmptyId { kind });
    }
    Ok(())
}

/// Stamps `id` onto the entity's own id field, rejecting a conflicting value.
fn stamp_id(kind: &'static str, id: &str, info_id: &mut String) -> RegistryResult<()> {
    require_id(kind, id)?;
    if !info_id.is_empty() && info_id != id {
        return Err(RegistryError::IdMismatch {
            kind,
            id: id.to_string(),
            info_id: info_id.clone(),
        });
    }
    *info_id = id.to_string();
    Ok(())
}

async fn put_json<T: Serialize>(
    store: &dyn MetaStore,
    kind: &'static str,
    prefix: &str,
    id: &str,
    value: &T,
) -> RegistryResult<()> {
    let bytes = serde_json::to_vec(value).map_err(|source| RegistryError::Encode {
        kind,
        id: id.to_string(),
        source,
    })?;
    store.put(&format!("{prefix}{id}"), bytes).await?;
    Ok(())
}

async fn get_json<T: DeserializeOwned>(
    store: &dyn MetaStore,
    prefix: &str,
    id: &str,
) -> RegistryResult<Option<T>> {
    let key = format!("{prefix}{id}");
    let Some(raw) = store.get(&key).await else {
        return Ok(None);
    };
    let value = serde_json::from_slice(&raw).map_err(|source| RegistryError::Decode { key, source })?;
    Ok(Some(value))
}

/// Decodes every record under `prefix`. One bad record fails the whole listing.
async fn list_json<T: DeserializeOwned>(
    store: &dyn MetaStore,
    prefix: &str,
) -> RegistryResult<Vec<T>> {
    let items = store.list_prefix(prefix).await;
    let mut out = Vec::with_capacity(items.len());
    for (key, raw) in items {
        let value =
            serde_json::from_slice(&raw).map_err(|source| RegistryError::Decode { key, source })?;
        out.push(value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_id() {
        let mut empty = String::new();
        stamp_id("node", "n1", &mut empty).unwrap();
        assert_eq!(empty, "n1");

        let mut same = "n1".to_string();
        stamp_id("node", "n1", &mut same).unwrap();

        let mut other = "n2".to_string();
        let err = stamp_id("node", "n1", &mut other).unwrap_err();
        assert!(matches!(err, RegistryError::IdMismatch { .. }));
        assert!(err.is_invalid_argument());
        assert_eq!(other, "n2");

        let err = stamp_id("node", "", &mut String::new()).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyId { kind: "node" }));
    }
}

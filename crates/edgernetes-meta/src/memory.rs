use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::{MetaStore, StoreError, StoreResult};

/// Volatile store with the same semantics as [`crate::WalStore`], minus the log.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    closed: bool,
    kv: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetaStore for MemoryStore {
    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let mut inner = self.inner.write().await;
        if inner.closed {
            return Err(StoreError::Closed);
        }
        inner.kv.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let inner = self.inner.read().await;
        inner.kv.get(key).cloned()
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let mut inner = self.inner.write().await;
        if inner.closed {
            return Err(StoreError::Closed);
        }
        inner.kv.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        inner.kv.keys().cloned().collect()
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.write().await.closed = true;
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        let inner = self.inner.read().await;
        inner
            .kv
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basics() {
        let store = MemoryStore::new();
        store.put("replica:a", b"1".to_vec()).await.unwrap();
        store.put("replica:b", b"2".to_vec()).await.unwrap();
        store.put("model:a", b"3".to_vec()).await.unwrap();
        store.delete("replica:missing").await.unwrap();

        assert!(matches!(
            store.put("", Vec::new()).await,
            Err(StoreError::EmptyKey)
        ));
        assert_eq!(store.list_prefix("replica:").await.len(), 2);

        // clones share state
        let other = store.clone();
        other.delete("replica:a").await.unwrap();
        assert_eq!(store.get("replica:a").await, None);

        store.close().await.unwrap();
        assert!(matches!(
            other.put("x", Vec::new()).await,
            Err(StoreError::Closed)
        ));
        assert_eq!(other.get("model:a").await, Some(b"3".to_vec()));
    }
}

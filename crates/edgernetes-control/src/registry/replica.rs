use std::sync::Arc;

use edgernetes_common::ReplicaInfo;
use edgernetes_meta::MetaStore;

use super::{get_json, list_json, put_json, require_id, stamp_id, RegistryResult};

const KIND: &str = "replica";
const PREFIX: &str = "replica:";

#[derive(Clone)]
pub struct ReplicaRegistry {
    store: Arc<dyn MetaStore>,
}

impl ReplicaRegistry {
    pub fn new(store: Arc<dyn MetaStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, replica_id: &str, mut info: ReplicaInfo) -> RegistryResult<()> {
        stamp_id(KIND, replica_id, &mut info.id)?;
        put_json(self.store.as_ref(), KIND, PREFIX, replica_id, &info).await?;
        tracing::info!(replica_id, model_id=%info.model_id, "replica created");
        Ok(())
    }

    pub async fn update(&self, replica_id: &str, mut info: ReplicaInfo) -> RegistryResult<()> {
        stamp_id(KIND, replica_id, &mut info.id)?;
        put_json(self.store.as_ref(), KIND, PREFIX, replica_id, &info).await
    }

    pub async fn delete(&self, replica_id: &str) -> RegistryResult<()> {
        require_id(KIND, replica_id)?;
        self.store.delete(&format!("{PREFIX}{replica_id}")).await?;
        Ok(())
    }

    pub async fn get(&self, replica_id: &str) -> RegistryResult<Option<ReplicaInfo>> {
        require_id(KIND, replica_id)?;
        get_json(self.store.as_ref(), PREFIX, replica_id).await
    }

    pub async fn list(&self) -> RegistryResult<Vec<ReplicaInfo>> {
        list_json(self.store.as_ref(), PREFIX).await
    }

    pub async fn list_by_model_id(&self, model_id: &str) -> RegistryResult<Vec<ReplicaInfo>> {
        require_id("model", model_id)?;
        let mut replicas = self.list().await?;
        replicas.retain(|r| r.model_id == model_id);
        Ok(replicas)
    }
}

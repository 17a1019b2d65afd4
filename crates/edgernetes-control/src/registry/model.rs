use std::sync::Arc;

use edgernetes_common::ModelInfo;
use edgernetes_meta::MetaStore;

use super::{get_json, list_json, put_json, require_id, stamp_id, RegistryResult};

const KIND: &str = "model";
const PREFIX: &str = "model:";

#[derive(Clone)]
pub struct ModelRegistry {
    store: Arc<dyn MetaStore>,
}

impl ModelRegistry {
    pub fn new(store: Arc<dyn MetaStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, model_id: &str, mut info: ModelInfo) -> RegistryResult<()> {
        stamp_id(KIND, model_id, &mut info.id)?;
        put_json(self.store.as_ref(), KIND, PREFIX, model_id, &info).await?;
        tracing::info!(model_id, name=%info.name, version=%info.version, "model registered");
        Ok(())
    }

    pub async fn deregister(&self, model_id: &str) -> RegistryResult<()> {
        require_id(KIND, model_id)?;
        self.store.delete(&format!("{PREFIX}{model_id}")).await?;
        tracing::info!(model_id, "model deregistered");
        Ok(())
    }

    pub async fn update(&self, model_id: &str, mut info: ModelInfo) -> RegistryResult<()> {
        stamp_id(KIND, model_id, &mut info.id)?;
        put_json(self.store.as_ref(), KIND, PREFIX, model_id, &info).await
    }

    pub async fn get(&self, model_id: &str) -> RegistryResult<Option<ModelInfo>> {
        require_id(KIND, model_id)?;
        get_json(self.store.as_ref(), PREFIX, model_id).await
    }

    pub async fn list(&self) -> RegistryResult<Vec<ModelInfo>> {
        list_json(self.store.as_ref(), PREFIX).await
    }
}

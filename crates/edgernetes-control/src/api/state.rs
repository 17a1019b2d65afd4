use std::sync::Arc;

use edgernetes_meta::MetaStore;

use crate::registry::{ModelRegistry, NodeRegistry, ReplicaRegistry, StatusHeartbeatPolicy};

#[derive(Clone)]
pub struct AppState {
    pub nodes: NodeRegistry,
    pub models: ModelRegistry,
    pub replicas: ReplicaRegistry,
}

impl AppState {
    pub fn new(store: Arc<dyn MetaStore>, status_policy: StatusHeartbeatPolicy) -> Self {
        Self {
            nodes: NodeRegistry::new(store.clone()).with_status_policy(status_policy),
            models: ModelRegistry::new(store.clone()),
            replicas: ReplicaRegistry::new(store),
        }
    }
}

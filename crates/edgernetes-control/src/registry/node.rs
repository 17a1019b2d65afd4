use std::sync::Arc;

use chrono::{DateTime, Utc};

use edgernetes_common::{NodeInfo, NodeStatus};
use edgernetes_meta::MetaStore;

use super::{get_json, list_json, put_json, require_id, stamp_id, RegistryError, RegistryResult};

const KIND: &str = "node";
const PREFIX: &str = "node:";

/// Whether a status write also counts as liveness evidence.
///
/// `RefreshHeartbeat` keeps the historical behaviour where every status change,
/// including ones made by an operator, moves `last_heartbeat` forward and so
/// restarts the offline grace window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusHeartbeatPolicy {
    #[default]
    RefreshHeartbeat,
    LeaveHeartbeat,
}

#[derive(Clone)]
pub struct NodeRegistry {
    store: Arc<dyn MetaStore>,
    status_policy: StatusHeartbeatPolicy,
}

/// Returns the current time, nudged past `prev` so `updated_at` always advances.
fn next_stamp(prev: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match prev {
        Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
        _ => now,
    }
}

impl NodeRegistry {
    pub fn new(store: Arc<dyn MetaStore>) -> Self {
        Self {
            store,
            status_policy: StatusHeartbeatPolicy::default(),
        }
    }

    pub fn with_status_policy(mut self, policy: StatusHeartbeatPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub async fn register(&self, node_id: &str, mut info: NodeInfo) -> RegistryResult<()> {
        stamp_id(KIND, node_id, &mut info.id)?;

        let now = Utc::now();
        info.registered_at.get_or_insert(now);
        info.updated_at = Some(now);
        info.last_activity = Some(now);

        self.write(node_id, &info).await?;
        tracing::info!(node_id, name=%info.name, "node registered");
        Ok(())
    }

    pub async fn deregister(&self, node_id: &str) -> RegistryResult<()> {
        require_id(KIND, node_id)?;
        self.store.delete(&format!("{PREFIX}{node_id}")).await?;
        tracing::info!(node_id, "node deregistered");
        Ok(())
    }

    /// Replaces the stored record. Timestamps left empty in `info` are carried
    /// over from the existing record, so callers only need to fill in what changed.
    pub async fn update(&self, node_id: &str, mut info: NodeInfo) -> RegistryResult<()> {
        stamp_id(KIND, node_id, &mut info.id)?;

        let mut prev_updated = None;
        if let Some(existing) = self.get(node_id).await? {
            if info.registered_at.is_none() {
                info.registered_at = existing.registered_at;
            }
            if info.last_heartbeat.is_none() {
                info.last_heartbeat = existing.last_heartbeat;
            }
            if info.last_activity.is_none() {
                info.last_activity = existing.last_activity;
            }
            prev_updated = existing.updated_at;
        }

        let now = next_stamp(prev_updated);
        // an update of an absent node creates it
        info.registered_at.get_or_insert(now);
        info.updated_at = Some(now);
        info.last_activity.get_or_insert(now);

        self.write(node_id, &info).await
    }

    pub async fn update_status(&self, node_id: &str, status: NodeStatus) -> RegistryResult<()> {
        let mut info = self.get(node_id).await?.ok_or_else(|| RegistryError::NotFound {
            kind: KIND,
            id: node_id.to_string(),
        })?;

        let now = next_stamp(info.updated_at);
        info.status = status;
        info.updated_at = Some(now);
        if self.status_policy == StatusHeartbeatPolicy::RefreshHeartbeat {
            info.last_heartbeat = Some(now);
        }
        info.last_activity.get_or_insert(now);

        self.write(node_id, &info).await
    }

    /// Records a failed health probe's verdict. Unlike `update_status`, this
    /// never touches `last_heartbeat`, so silence keeps accumulating across
    /// failed probes.
    pub async fn mark_unreachable(&self, node_id: &str, status: NodeStatus) -> RegistryResult<()> {
        let mut info = self.get(node_id).await?.ok_or_else(|| RegistryError::NotFound {
            kind: KIND,
            id: node_id.to_string(),
        })?;

        info.status = status;
        info.updated_at = Some(next_stamp(info.updated_at));
        self.write(node_id, &info).await
    }

    /// Records a successful health probe at `at`. An `unknown` node comes back
    /// `online`; the resulting status is returned.
    pub async fn record_heartbeat(
        &self,
        node_id: &str,
        at: DateTime<Utc>,
    ) -> RegistryResult<NodeStatus> {
        let mut info = self.get(node_id).await?.ok_or_else(|| RegistryError::NotFound {
            kind: KIND,
            id: node_id.to_string(),
        })?;

        if info.status == NodeStatus::Unknown {
            info.status = NodeStatus::Online;
        }
        info.last_heartbeat = Some(at);
        info.last_activity = Some(at);
        info.updated_at = Some(next_stamp(info.updated_at));

        self.write(node_id, &info).await?;
        Ok(info.status)
    }

    pub async fn get(&self, node_id: &str) -> RegistryResult<Option<NodeInfo>> {
        require_id(KIND, node_id)?;
        get_json(self.store.as_ref(), PREFIX, node_id).await
    }

    pub async fn list(&self) -> RegistryResult<Vec<NodeInfo>> {
        list_json(self.store.as_ref(), PREFIX).await
    }

    pub async fn list_by_statuses(&self, statuses: &[NodeStatus]) -> RegistryResult<Vec<NodeInfo>> {
        let mut nodes = self.list().await?;
        nodes.retain(|n| statuses.contains(&n.status));
        Ok(nodes)
    }

    async fn write(&self, node_id: &str, info: &NodeInfo) -> RegistryResult<()> {
        put_json(self.store.as_ref(), KIND, PREFIX, node_id, info).await
    }
}

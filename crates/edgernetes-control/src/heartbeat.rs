//! Heartbeat failure detection.
//!
//! Every tick probes each `online`/`unknown` node once. A node that answers has
//! its assigned replicas reconciled against the answer; a node that does not is
//! moved to `unknown`, or to `offline` once it has been silent longer than the
//! grace window. Nodes already `offline` or in `error` are left alone until
//! they are registered again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use edgernetes_common::{
    HeartbeatResponse, NodeInfo, NodeStatus, ReplicaInfo, ReplicaObservation, ReplicaStatus,
};

use crate::probe::{HealthProbe, ProbeError};
use crate::registry::{NodeRegistry, RegistryResult, ReplicaRegistry};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Silence after which a failing node is declared offline.
pub const DEFAULT_OFFLINE_AFTER: Duration = Duration::from_secs(40);

const PROBED_STATUSES: [NodeStatus; 2] = [NodeStatus::Online, NodeStatus::Unknown];

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    pub offline_after: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            offline_after: DEFAULT_OFFLINE_AFTER,
        }
    }
}

/// Counters for one pass over the probed nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub probed: usize,
    pub succeeded: usize,
    pub marked_unknown: usize,
    pub marked_offline: usize,
    pub replicas_updated: usize,
    pub replicas_skipped: usize,
}

/// Status a node moves to after a failed probe.
///
/// Silence is measured from `last_seen`; with nothing to measure from the
/// node is treated as silent forever.
pub fn status_after_failed_probe(
    last_seen: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    offline_after: Duration,
) -> NodeStatus {
    let Some(last_seen) = last_seen else {
        return NodeStatus::Offline;
    };
    // a clock that went backwards counts as no silence at all
    let silent_for = now
        .signed_duration_since(last_seen)
        .to_std()
        .unwrap_or_default();
    if silent_for > offline_after {
        NodeStatus::Offline
    } else {
        NodeStatus::Unknown
    }
}

/// Applies what a heartbeat said about one replica.
pub fn apply_observation(
    replica: &mut ReplicaInfo,
    observation: ReplicaObservation<'_>,
    now: DateTime<Utc>,
) {
    match observation {
        ReplicaObservation::Reported(report) => {
            replica.status = ReplicaStatus::from_report(&report.status);
            replica.error_code = report.error_code;
            replica.error_message = report.error_message.clone();
        }
        ReplicaObservation::Absent => {
            replica.status = ReplicaStatus::Unknown;
        }
    }
    replica.last_heartbeat = Some(now);
}

pub struct HeartbeatMonitor {
    nodes: NodeRegistry,
    replicas: ReplicaRegistry,
    probe: Arc<dyn HealthProbe>,
    config: HeartbeatConfig,
}

impl HeartbeatMonitor {
    pub fn new(
        nodes: NodeRegistry,
        replicas: ReplicaRegistry,
        probe: Arc<dyn HealthProbe>,
        config: HeartbeatConfig,
    ) -> Self {
        Self {
            nodes,
            replicas,
            probe,
            config,
        }
    }

    /// Ticks forever: once right away, then every `interval`.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs_f64(),
            offline_after_secs = self.config.offline_after.as_secs_f64(),
            "heartbeat monitor started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(report) => tracing::debug!(?report, "heartbeat tick finished"),
                Err(e) => tracing::warn!(error=%e, "heartbeat tick failed"),
            }
        }
    }

    /// One pass over every probed node. Only failing to list nodes is an
    /// error; per-node and per-replica problems are logged and counted.
    pub async fn tick(&self) -> RegistryResult<TickReport> {
        let nodes = self.nodes.list_by_statuses(&PROBED_STATUSES).await?;
        let mut report = TickReport::default();

        for node in nodes {
            report.probed += 1;
            match self.probe.probe(&node).await {
                Ok(resp) => {
                    report.succeeded += 1;
                    self.on_probe_success(&node, &resp, &mut report).await;
                }
                Err(e) => self.on_probe_failure(&node, &e, &mut report).await,
            }
        }

        Ok(report)
    }

    async fn on_probe_success(
        &self,
        node: &NodeInfo,
        resp: &HeartbeatResponse,
        report: &mut TickReport,
    ) {
        let now = Utc::now();
        if !resp.success {
            tracing::warn!(node_id=%node.id, "node answered heartbeat but its self-check failed");
        }

        for replica_id in &node.assigned_replicas {
            let mut replica = match self.replicas.get(replica_id).await {
                Ok(Some(r)) => r,
                Ok(None) => {
                    tracing::warn!(node_id=%node.id, %replica_id, "assigned replica not in registry, skipping");
                    report.replicas_skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(node_id=%node.id, %replica_id, error=%e, "failed to load replica");
                    report.replicas_skipped += 1;
                    continue;
                }
            };

            let observation = resp.observe(replica_id);
            if observation == ReplicaObservation::Absent {
                tracing::info!(node_id=%node.id, %replica_id, "replica missing from heartbeat, marking unknown");
            }
            apply_observation(&mut replica, observation, now);

            let status = replica.status;
            if let Err(e) = self.replicas.update(replica_id, replica).await {
                tracing::warn!(node_id=%node.id, %replica_id, error=%e, "failed to update replica");
                report.replicas_skipped += 1;
                continue;
            }
            tracing::debug!(node_id=%node.id, %replica_id, ?status, "replica status updated");
            report.replicas_updated += 1;
        }

        match self.nodes.record_heartbeat(&node.id, now).await {
            Ok(status) if status != node.status => {
                tracing::info!(node_id=%node.id, from=?node.status, to=?status, "node status changed");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(node_id=%node.id, error=%e, "failed to record heartbeat"),
        }
    }

    async fn on_probe_failure(&self, node: &NodeInfo, error: &ProbeError, report: &mut TickReport) {
        let last_seen = node.last_heartbeat.or(node.registered_at);
        let next = status_after_failed_probe(last_seen, Utc::now(), self.config.offline_after);

        if next == NodeStatus::Offline {
            tracing::warn!(node_id=%node.id, error=%error, "node silent past grace window, marking offline");
        } else {
            tracing::warn!(node_id=%node.id, error=%error, "heartbeat failed, marking unknown");
        }

        if let Err(e) = self.nodes.mark_unreachable(&node.id, next).await {
            tracing::warn!(node_id=%node.id, error=%e, "failed to update node status");
            return;
        }
        match next {
            NodeStatus::Offline => report.marked_offline += 1,
            _ => report.marked_unknown += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use edgernetes_common::ReplicaReport;
    use edgernetes_meta::{MemoryStore, MetaStore};

    use super::*;

    /// Answers from a fixed table; nodes not in the table are unreachable.
    #[derive(Default)]
    struct ScriptedProbe {
        answers: HashMap<String, HeartbeatResponse>,
    }

    impl ScriptedProbe {
        fn answer(mut self, node_id: &str, replicas: &[(&str, &str)]) -> Self {
            let model_replicas = replicas
                .iter()
                .map(|(id, status)| ReplicaReport {
                    replica_id: id.to_string(),
                    model_id: "m1".to_string(),
                    name: id.to_string(),
                    version: "1".to_string(),
                    status: status.to_string(),
                    error_code: 0,
                    error_message: String::new(),
                })
                .collect();
            self.answers.insert(
                node_id.to_string(),
                HeartbeatResponse {
                    node_id: node_id.to_string(),
                    success: true,
                    model_replicas,
                },
            );
            self
        }
    }

    #[async_trait]
    impl HealthProbe for ScriptedProbe {
        async fn probe(&self, node: &NodeInfo) -> Result<HeartbeatResponse, ProbeError> {
            self.answers
                .get(&node.id)
                .cloned()
                .ok_or_else(|| ProbeError::NoAddress {
                    node_id: node.id.clone(),
                })
        }
    }

    struct Fixture {
        nodes: NodeRegistry,
        replicas: ReplicaRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let store: Arc<dyn MetaStore> = Arc::new(MemoryStore::new());
            Self {
                nodes: NodeRegistry::new(store.clone()),
                replicas: ReplicaRegistry::new(store),
            }
        }

        async fn node(&self, id: &str, replicas: &[&str], last_heartbeat: Option<DateTime<Utc>>) {
            let info = NodeInfo {
                name: id.to_string(),
                ip: "127.0.0.1".to_string(),
                port: 50052,
                assigned_replicas: replicas.iter().map(|r| r.to_string()).collect(),
                last_heartbeat,
                ..Default::default()
            };
            self.nodes.register(id, info).await.unwrap();
        }

        async fn replica(&self, id: &str, status: ReplicaStatus) {
            let info = ReplicaInfo {
                model_id: "m1".to_string(),
                name: id.to_string(),
                status,
                ..Default::default()
            };
            self.replicas.create(id, info).await.unwrap();
        }

        fn monitor(&self, probe: ScriptedProbe) -> HeartbeatMonitor {
            self.monitor_with(probe, HeartbeatConfig::default())
        }

        fn monitor_with(&self, probe: ScriptedProbe, config: HeartbeatConfig) -> HeartbeatMonitor {
            HeartbeatMonitor::new(
                self.nodes.clone(),
                self.replicas.clone(),
                Arc::new(probe),
                config,
            )
        }
    }

    #[test]
    fn test_grace_window() {
        let now = Utc::now();
        let grace = DEFAULT_OFFLINE_AFTER;
        let ago = |s| Some(now - chrono::Duration::seconds(s));

        assert_eq!(status_after_failed_probe(ago(39), now, grace), NodeStatus::Unknown);
        assert_eq!(status_after_failed_probe(ago(40), now, grace), NodeStatus::Unknown);
        assert_eq!(status_after_failed_probe(ago(41), now, grace), NodeStatus::Offline);
        assert_eq!(status_after_failed_probe(ago(-5), now, grace), NodeStatus::Unknown);
        assert_eq!(status_after_failed_probe(None, now, grace), NodeStatus::Offline);
    }

    #[test]
    fn test_apply_observation() {
        let now = Utc::now();
        let report = ReplicaReport {
            replica_id: "r1".to_string(),
            model_id: "m1".to_string(),
            name: "r1".to_string(),
            version: "1".to_string(),
            status: "failed".to_string(),
            error_code: 2,
            error_message: "model file missing".to_string(),
        };

        let mut replica = ReplicaInfo::default();
        apply_observation(&mut replica, ReplicaObservation::Reported(&report), now);
        assert_eq!(replica.status, ReplicaStatus::Failed);
        assert_eq!(replica.error_code, 2);
        assert_eq!(replica.error_message, "model file missing");
        assert_eq!(replica.last_heartbeat, Some(now));

        apply_observation(&mut replica, ReplicaObservation::Absent, now);
        assert_eq!(replica.status, ReplicaStatus::Unknown);
        // an absent replica keeps its last reported error
        assert_eq!(replica.error_code, 2);
    }

    #[tokio::test]
    async fn test_replica_reconciliation() {
        let fx = Fixture::new();
        fx.node("n1", &["r1", "r2"], None).await;
        fx.replica("r1", ReplicaStatus::Pending).await;
        fx.replica("r2", ReplicaStatus::Running).await;

        let monitor = fx.monitor(ScriptedProbe::default().answer("n1", &[("r1", "running")]));
        let report = monitor.tick().await.unwrap();

        assert_eq!(report.probed, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.replicas_updated, 2);

        let r1 = fx.replicas.get("r1").await.unwrap().unwrap();
        let r2 = fx.replicas.get("r2").await.unwrap().unwrap();
        assert_eq!(r1.status, ReplicaStatus::Running);
        assert_eq!(r2.status, ReplicaStatus::Unknown);
        assert!(r1.last_heartbeat.is_some());
        assert!(r2.last_heartbeat.is_some());

        let n1 = fx.nodes.get("n1").await.unwrap().unwrap();
        assert_eq!(n1.status, NodeStatus::Online);
        assert!(n1.last_heartbeat.is_some());
    }

    #[tokio::test]
    async fn test_missing_replica_is_skipped() {
        let fx = Fixture::new();
        fx.node("n1", &["ghost", "r1"], None).await;
        fx.replica("r1", ReplicaStatus::Pending).await;

        let monitor = fx.monitor(ScriptedProbe::default().answer("n1", &[("r1", "completed")]));
        let report = monitor.tick().await.unwrap();

        assert_eq!(report.replicas_skipped, 1);
        assert_eq!(report.replicas_updated, 1);
        assert!(fx.replicas.get("ghost").await.unwrap().is_none());
        assert_eq!(
            fx.replicas.get("r1").await.unwrap().unwrap().status,
            ReplicaStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_failed_probe_within_grace_marks_unknown() {
        let fx = Fixture::new();
        fx.node("n1", &[], None).await;
        fx.nodes
            .record_heartbeat("n1", Utc::now() - chrono::Duration::seconds(39))
            .await
            .unwrap();

        let report = fx.monitor(ScriptedProbe::default()).tick().await.unwrap();
        assert_eq!(report.marked_unknown, 1);
        assert_eq!(report.marked_offline, 0);
        assert_eq!(
            fx.nodes.get("n1").await.unwrap().unwrap().status,
            NodeStatus::Unknown
        );
    }

    #[tokio::test]
    async fn test_failed_probe_past_grace_marks_offline() {
        let fx = Fixture::new();
        fx.node("n1", &["r1"], Some(Utc::now() - chrono::Duration::seconds(41)))
            .await;
        fx.replica("r1", ReplicaStatus::Running).await;

        let report = fx.monitor(ScriptedProbe::default()).tick().await.unwrap();
        assert_eq!(report.marked_offline, 1);
        assert_eq!(
            fx.nodes.get("n1").await.unwrap().unwrap().status,
            NodeStatus::Offline
        );
        // replicas of an unreachable node are not touched
        assert_eq!(
            fx.replicas.get("r1").await.unwrap().unwrap().status,
            ReplicaStatus::Running
        );

        // offline nodes drop out of the rotation
        let report = fx.monitor(ScriptedProbe::default()).tick().await.unwrap();
        assert_eq!(report.probed, 0);
    }

    #[tokio::test]
    async fn test_sustained_silence_reaches_offline() {
        let fx = Fixture::new();
        fx.node("n1", &[], None).await;
        fx.nodes.record_heartbeat("n1", Utc::now()).await.unwrap();

        let monitor = fx.monitor_with(
            ScriptedProbe::default(),
            HeartbeatConfig {
                interval: Duration::from_millis(200),
                offline_after: Duration::from_millis(500),
            },
        );

        let first = monitor.tick().await.unwrap();
        assert_eq!(first.marked_unknown, 1);

        // failed ticks must not reset the silence clock
        let mut marked_offline = 0;
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            marked_offline += monitor.tick().await.unwrap().marked_offline;
        }

        let node = fx.nodes.get("n1").await.unwrap().unwrap();
        assert_eq!(node.status, NodeStatus::Offline);
        assert_eq!(marked_offline, 1);
        assert!(node.last_heartbeat < node.updated_at);
    }

    #[tokio::test]
    async fn test_never_heartbeated_node_measures_from_registration() {
        let fx = Fixture::new();
        fx.node("fresh", &[], None).await;

        let report = fx.monitor(ScriptedProbe::default()).tick().await.unwrap();
        assert_eq!(report.marked_unknown, 1);
    }

    #[tokio::test]
    async fn test_one_bad_node_does_not_stop_the_tick() {
        let fx = Fixture::new();
        fx.node("down", &[], Some(Utc::now() - chrono::Duration::seconds(300)))
            .await;
        fx.node("up", &["r1"], None).await;
        fx.replica("r1", ReplicaStatus::Pending).await;
        fx.node("halted", &[], None).await;
        fx.nodes.update_status("halted", NodeStatus::Error).await.unwrap();

        let monitor = fx.monitor(ScriptedProbe::default().answer("up", &[("r1", "running")]));
        let report = monitor.tick().await.unwrap();

        assert_eq!(
            report,
            TickReport {
                probed: 2,
                succeeded: 1,
                marked_unknown: 0,
                marked_offline: 1,
                replicas_updated: 1,
                replicas_skipped: 0,
            }
        );
        assert_eq!(
            fx.nodes.get("halted").await.unwrap().unwrap().status,
            NodeStatus::Error
        );
    }

    #[tokio::test]
    async fn test_run_ticks_immediately() {
        let fx = Fixture::new();
        fx.node("n1", &["r1"], None).await;
        fx.replica("r1", ReplicaStatus::Pending).await;

        let monitor = HeartbeatMonitor::new(
            fx.nodes.clone(),
            fx.replicas.clone(),
            Arc::new(ScriptedProbe::default().answer("n1", &[("r1", "running")])),
            HeartbeatConfig {
                interval: Duration::from_secs(3600),
                offline_after: DEFAULT_OFFLINE_AFTER,
            },
        );
        let handle = tokio::spawn(monitor.run());

        let mut status = ReplicaStatus::Pending;
        for _ in 0..100 {
            status = fx.replicas.get("r1").await.unwrap().unwrap().status;
            if status == ReplicaStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(status, ReplicaStatus::Running);
    }
}

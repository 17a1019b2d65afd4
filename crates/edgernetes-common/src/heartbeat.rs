use serde::{Deserialize, Serialize};

/// Body of `POST /heartbeat` sent to a node's agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeartbeatRequest {
    pub node_id: String,
}

/// One replica as seen by the agent running it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaReport {
    pub replica_id: String,
    pub model_id: String,
    pub name: String,
    pub version: String,
    pub status: String,
    pub error_code: i32,
    pub error_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeartbeatResponse {
    pub node_id: String,
    /// Result of the agent's own self-check.
    pub success: bool,
    #[serde(default)]
    pub model_replicas: Vec<ReplicaReport>,
}

/// What a heartbeat response says about one assigned replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaObservation<'a> {
    Reported(&'a ReplicaReport),
    /// The node answered but did not list the replica.
    Absent,
}

impl HeartbeatResponse {
    pub fn observe(&self, replica_id: &str) -> ReplicaObservation<'_> {
        self.model_replicas
            .iter()
            .find(|r| r.replica_id == replica_id)
            .map_or(ReplicaObservation::Absent, ReplicaObservation::Reported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe() {
        let raw = r#"{
            "node_id": "n1",
            "success": true,
            "model_replicas": [{
                "replica_id": "r1", "model_id": "m1", "name": "r1", "version": "1",
                "status": "running", "error_code": 0, "error_message": ""
            }]
        }"#;
        let resp: HeartbeatResponse = serde_json::from_str(raw).unwrap();

        match resp.observe("r1") {
            ReplicaObservation::Reported(r) => assert_eq!(r.status, "running"),
            ReplicaObservation::Absent => panic!("r1 should be reported"),
        }
        assert_eq!(resp.observe("r2"), ReplicaObservation::Absent);
    }

    #[test]
    fn test_replica_report_fields_required() {
        let raw = r#"{"node_id":"n1","success":true,"model_replicas":[{"replica_id":"r1"}]}"#;
        assert!(serde_json::from_str::<HeartbeatResponse>(raw).is_err());
    }
}

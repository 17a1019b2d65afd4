use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Unknown,
}

impl ReplicaStatus {
    /// Maps a status string reported by a node. Anything unrecognised is `Unknown`.
    pub fn from_report(status: &str) -> Self {
        match status {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReplicaInfo {
    #[serde(default)]
    pub id: String,
    pub model_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: ReplicaStatus,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_report() {
        assert_eq!(ReplicaStatus::from_report("running"), ReplicaStatus::Running);
        assert_eq!(ReplicaStatus::from_report("failed"), ReplicaStatus::Failed);
        assert_eq!(ReplicaStatus::from_report("Running"), ReplicaStatus::Unknown);
        assert_eq!(ReplicaStatus::from_report(""), ReplicaStatus::Unknown);
    }
}

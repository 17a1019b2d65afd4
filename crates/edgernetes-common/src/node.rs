use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Unknown,
    Online,
    Offline,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    #[default]
    Unknown,
    Ddr3,
    Ddr4,
    Ddr5,
    Lpddr3,
    Lpddr4,
    Lpddr4x,
    Lpddr5,
    Lpddr5x,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComputeDeviceType {
    Cpu,
    Gpu,
    Npu,
    Tpu,
    Dsp,
    Vpu,
    Fpga,
    IntegratedGpu,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NodeMetadata {
    #[serde(default)]
    pub os_type: String,
    #[serde(default)]
    pub os_version: String,
    #[serde(default)]
    pub agent_version: String,
    #[serde(default)]
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NetworkInfo {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub bandwidth_mbps: u64,
    #[serde(default)]
    pub is_metered: bool,
    #[serde(default)]
    pub latency_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MemoryInfo {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    #[serde(default, rename = "type")]
    pub kind: MemoryType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StorageInfo {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    #[serde(default)]
    pub read_speed: u64,
    #[serde(default)]
    pub write_speed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputeDevice {
    #[serde(rename = "type")]
    pub kind: ComputeDeviceType,
    /// e.g. "nvidia", "apple", "qualcomm"
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub memory_mb: u64,
    #[serde(default)]
    pub compute_units: u32,
    #[serde(default)]
    pub tops: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_draw_watts: Option<u32>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Declared hardware inventory. Stored and returned as-is; the control plane
/// does not interpret it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResourceCapabilities {
    #[serde(default)]
    pub memory: MemoryInfo,
    #[serde(default)]
    pub storage: StorageInfo,
    #[serde(default)]
    pub compute_devices: Vec<ComputeDevice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NodeInfo {
    #[serde(default)]
    pub id: String,
    pub name: String,

    /// Address of the node's own heartbeat endpoint.
    pub ip: String,
    pub port: u16,

    #[serde(default)]
    pub metadata: NodeMetadata,
    #[serde(default)]
    pub network_info: NetworkInfo,
    #[serde(default)]
    pub resource_capabilities: ResourceCapabilities,

    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub assigned_replicas: Vec<String>,

    /// Set on first registration, never rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

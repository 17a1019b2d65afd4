pub mod heartbeat;
pub mod model;
pub mod node;
pub mod replica;

pub use heartbeat::{HeartbeatRequest, HeartbeatResponse, ReplicaObservation, ReplicaReport};
pub use model::{ModelInfo, ModelType};
pub use node::{
    ComputeDevice, ComputeDeviceType, MemoryInfo, MemoryType, NetworkInfo, NodeInfo,
    NodeMetadata, NodeStatus, ResourceCapabilities, StorageInfo,
};
pub use replica::{ReplicaInfo, ReplicaStatus};

pub mod telemetry;

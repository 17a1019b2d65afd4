pub mod api;
pub mod heartbeat;
pub mod probe;
pub mod registry;

pub use heartbeat::{HeartbeatConfig, HeartbeatMonitor, TickReport};
pub use probe::{HealthProbe, HttpHealthProbe, ProbeError};
pub use registry::{
    ModelRegistry, NodeRegistry, RegistryError, RegistryResult, ReplicaRegistry,
    StatusHeartbeatPolicy,
};

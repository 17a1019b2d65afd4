use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use edgernetes_common::{
    ModelInfo, NetworkInfo, NodeInfo, NodeMetadata, NodeStatus, ReplicaInfo,
    ResourceCapabilities,
};

use super::error::ApiError;
use super::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct RegisterNodeRequest {
    pub name: String,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub metadata: NodeMetadata,
    #[serde(default)]
    pub network_info: NetworkInfo,
    #[serde(default)]
    pub resource_capabilities: ResourceCapabilities,
    #[serde(default)]
    pub assigned_replicas: Vec<String>,
}

/// Fields left out keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateNodeRequest {
    pub name: Option<String>,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub metadata: Option<NodeMetadata>,
    pub network_info: Option<NetworkInfo>,
    pub resource_capabilities: Option<ResourceCapabilities>,
    pub assigned_replicas: Option<Vec<String>>,
}

impl UpdateNodeRequest {
    fn apply(self, info: &mut NodeInfo) {
        if let Some(name) = self.name {
            info.name = name;
        }
        if let Some(ip) = self.ip {
            info.ip = ip;
        }
        if let Some(port) = self.port {
            info.port = port;
        }
        if let Some(metadata) = self.metadata {
            info.metadata = metadata;
        }
        if let Some(network_info) = self.network_info {
            info.network_info = network_info;
        }
        if let Some(caps) = self.resource_capabilities {
            info.resource_capabilities = caps;
        }
        if let Some(replicas) = self.assigned_replicas {
            info.assigned_replicas = replicas;
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateNodeStatusRequest {
    pub status: NodeStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListReplicasQuery {
    pub model_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterNodeResponse {
    pub node_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterModelResponse {
    pub model_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateReplicaResponse {
    pub replica_id: String,
}

fn ok() -> Json<serde_json::Value> {
    Json(json!({"success": true}))
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ---- nodes ----

pub async fn register_node(
    State(st): State<AppState>,
    Json(req): Json<RegisterNodeRequest>,
) -> ApiResult<Json<RegisterNodeResponse>> {
    let node_id = Uuid::new_v4().to_string();
    let info = NodeInfo {
        id: node_id.clone(),
        name: req.name,
        ip: req.ip,
        port: req.port,
        metadata: req.metadata,
        network_info: req.network_info,
        resource_capabilities: req.resource_capabilities,
        assigned_replicas: req.assigned_replicas,
        status: NodeStatus::Unknown,
        ..Default::default()
    };
    st.nodes.register(&node_id, info).await?;
    Ok(Json(RegisterNodeResponse { node_id }))
}

pub async fn list_nodes(State(st): State<AppState>) -> ApiResult<Json<Vec<NodeInfo>>> {
    Ok(Json(st.nodes.list().await?))
}

pub async fn get_node(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<NodeInfo>> {
    st.nodes
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("node {id:?} not found")))
}

pub async fn update_node(
    State(st): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNodeRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut info = st
        .nodes
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("node {id:?} not found")))?;
    req.apply(&mut info);
    st.nodes.update(&id, info).await?;
    Ok(ok())
}

pub async fn update_node_status(
    State(st): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNodeStatusRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    st.nodes.update_status(&id, req.status).await?;
    tracing::info!(node_id=%id, status=?req.status, "node status set via api");
    Ok(ok())
}

pub async fn deregister_node(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    st.nodes.deregister(&id).await?;
    Ok(ok())
}

// ---- models ----

pub async fn register_model(
    State(st): State<AppState>,
    Json(mut info): Json<ModelInfo>,
) -> ApiResult<Json<RegisterModelResponse>> {
    // ids are always assigned here, whatever the caller sent
    let model_id = Uuid::new_v4().to_string();
    info.id = model_id.clone();
    st.models.register(&model_id, info).await?;
    Ok(Json(RegisterModelResponse { model_id }))
}

pub async fn list_models(State(st): State<AppState>) -> ApiResult<Json<Vec<ModelInfo>>> {
    Ok(Json(st.models.list().await?))
}

pub async fn get_model(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ModelInfo>> {
    st.models
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("model {id:?} not found")))
}

pub async fn update_model(
    State(st): State<AppState>,
    Path(id): Path<String>,
    Json(info): Json<ModelInfo>,
) -> ApiResult<Json<serde_json::Value>> {
    st.models.update(&id, info).await?;
    Ok(ok())
}

pub async fn deregister_model(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    st.models.deregister(&id).await?;
    Ok(ok())
}

// ---- replicas ----

pub async fn create_replica(
    State(st): State<AppState>,
    Json(info): Json<ReplicaInfo>,
) -> ApiResult<Json<CreateReplicaResponse>> {
    let replica_id = if info.id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        info.id.clone()
    };
    st.replicas.create(&replica_id, info).await?;
    Ok(Json(CreateReplicaResponse { replica_id }))
}

pub async fn list_replicas(
    State(st): State<AppState>,
    Query(q): Query<ListReplicasQuery>,
) -> ApiResult<Json<Vec<ReplicaInfo>>> {
    let replicas = match q.model_id {
        Some(model_id) => st.replicas.list_by_model_id(&model_id).await?,
        None => st.replicas.list().await?,
    };
    Ok(Json(replicas))
}

pub async fn get_replica(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReplicaInfo>> {
    st.replicas
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("replica {id:?} not found")))
}

pub async fn update_replica(
    State(st): State<AppState>,
    Path(id): Path<String>,
    Json(info): Json<ReplicaInfo>,
) -> ApiResult<Json<serde_json::Value>> {
    st.replicas.update(&id, info).await?;
    Ok(ok())
}

pub async fn delete_replica(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    st.replicas.delete(&id).await?;
    Ok(ok())
}

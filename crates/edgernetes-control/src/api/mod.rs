//! HTTP surface of the control plane, mounted under `/api`.

pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    routing::{get, post, put},
    Router,
};

use self::handlers::{
    create_replica, delete_replica, deregister_model, deregister_node, get_model, get_node,
    get_replica, healthz, list_models, list_nodes, list_replicas, register_model, register_node,
    update_model, update_node, update_node_status, update_replica,
};
pub use self::state::AppState;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/healthz", get(healthz))
        .route("/nodes", post(register_node).get(list_nodes))
        .route(
            "/nodes/:id",
            get(get_node).patch(update_node).delete(deregister_node),
        )
        .route("/nodes/:id/status", put(update_node_status))
        .route("/models", post(register_model).get(list_models))
        .route(
            "/models/:id",
            get(get_model).put(update_model).delete(deregister_model),
        )
        .route("/replicas", post(create_replica).get(list_replicas))
        .route(
            "/replicas/:id",
            get(get_replica).put(update_replica).delete(delete_replica),
        )
        .with_state(state);

    Router::new().nest("/api", api_routes)
}

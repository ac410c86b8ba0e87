pub mod discovery;
pub mod leases;
pub mod logs;
pub mod resources;
pub mod selector;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::error::FacadeError;
use crate::state::AppState;

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// `?watch=true` is unsupported regardless of resource (spec §4.6), and any
/// verb axum's router matched a path for but has no handler registered comes
/// back as a bare 405 — rewritten here into the façade's `Status` shape so
/// every response (not just the explicitly-handled ones) carries the wire
/// format clients expect (spec §7).
async fn watch_and_verb_guard(request: Request, next: Next) -> Response {
    let watch_requested = request
        .uri()
        .query()
        .map(|q| q.split('&').any(|kv| kv == "watch=true"))
        .unwrap_or(false);

    if watch_requested {
        return FacadeError::not_implemented("watch is not supported").into_response();
    }

    let response = next.run(request).await;
    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        return FacadeError::not_implemented("method not supported on this resource")
            .into_response();
    }
    response
}

pub fn router(state: AppState) -> Router {
    let discovery_routes = Router::new()
        .route("/version", get(discovery::version))
        .route("/api", get(discovery::api_root))
        .route("/apis", get(discovery::apis_root))
        .route("/api/v1", get(discovery::core_v1))
        .route("/apis/apps/v1", get(discovery::apps_v1))
        .route(
            "/apis/coordination.k8s.io/v1",
            get(discovery::coordination_v1),
        );

    let core_routes = Router::new()
        .route("/api/v1/namespaces", get(resources::list_namespaces))
        .route("/api/v1/namespaces/{name}", get(resources::get_namespace))
        .route("/api/v1/nodes", get(resources::list_nodes))
        .route("/api/v1/nodes/{name}", get(resources::get_node))
        .route(
            "/api/v1/{resource}",
            get(resources::list_cluster_scoped),
        )
        .route(
            "/api/v1/{resource}/{name}",
            get(resources::get_cluster_scoped),
        )
        .route(
            "/api/v1/namespaces/{ns}/{resource}",
            get(resources::list_namespaced),
        )
        .route(
            "/api/v1/namespaces/{ns}/{resource}/{name}",
            get(resources::get_namespaced),
        )
        .route(
            "/api/v1/namespaces/{ns}/pods/{name}/log",
            get(logs::tail),
        );

    let apps_routes = Router::new()
        .route(
            "/apis/apps/v1/namespaces/{ns}/deployments",
            get(resources::list_deployments),
        )
        .route(
            "/apis/apps/v1/namespaces/{ns}/deployments/{name}",
            get(resources::get_deployment).patch(resources::patch_deployment),
        );

    let lease_routes = Router::new()
        .route(
            "/apis/coordination.k8s.io/v1/namespaces/{ns}/leases",
            get(leases::list_leases).post(leases::create_lease),
        )
        .route(
            "/apis/coordination.k8s.io/v1/namespaces/{ns}/leases/{name}",
            get(leases::get_lease)
                .put(leases::update_lease)
                .delete(leases::delete_lease),
        );

    Router::new()
        .route("/healthz", get(health_check))
        .merge(discovery_routes)
        .merge(core_routes)
        .merge(apps_routes)
        .merge(lease_routes)
        .fallback(not_found)
        .layer(middleware::from_fn(watch_and_verb_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> Response {
    FacadeError::not_found("the requested path does not match any known resource").into_response()
}

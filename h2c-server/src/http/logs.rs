use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;

use crate::error::FacadeError;
use crate::state::AppState;

/// `GET /api/v1/namespaces/{ns}/pods/{name}/log`. Resolves `<service>-0` back
/// to the compose service, then delegates to the runtime bridge; any bridge
/// failure (socket absent, connection refused, non-2xx upstream) degrades to
/// 501 rather than 5xx (spec §4.5).
pub async fn tail(
    State(state): State<AppState>,
    Path((namespace, pod_name)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let service = match pod_name.strip_suffix("-0") {
        Some(s) => s,
        None => {
            return FacadeError::not_found(format!("pods \"{pod_name}\" not found")).into_response()
        }
    };

    let snapshot = match state.load_snapshot() {
        Ok(s) => s,
        Err(e) => return FacadeError::internal(e, "failed to load compose snapshot").into_response(),
    };

    if namespace != snapshot.project_name || snapshot.find_service(service).is_none() {
        return FacadeError::not_found(format!("pods \"{pod_name}\" not found")).into_response();
    }

    let tail_lines = query.get("tailLines").and_then(|v| v.parse::<i64>().ok());
    let timestamps = query
        .get("timestamps")
        .map(|v| v == "true")
        .unwrap_or(false);
    let follow = query.get("follow").map(|v| v == "true").unwrap_or(false);

    match state
        .bridge()
        .logs(&snapshot.project_name, service, tail_lines, timestamps, follow)
        .await
    {
        Ok(stream) => {
            let body = Body::from_stream(stream);
            Response::builder()
                .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(body)
                .expect("static headers always produce a valid response")
        }
        Err(e) => {
            tracing::info!(error = %e, %service, "runtime bridge unavailable for log tail");
            FacadeError::not_implemented(format!("container runtime bridge unavailable: {e}"))
                .into_response()
        }
    }
}

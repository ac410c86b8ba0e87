use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::configmaps::{self, ResourceKind};
use crate::error::{FacadeError, FacadeResult};
use crate::http::selector::Selector;
use crate::projector::Projector;
use crate::state::AppState;

/// Resolves a path segment (possibly a short name, spec §4.6) to the
/// canonical core/v1 resource name this façade knows how to project.
fn canonical_core_resource(raw: &str) -> Option<&'static str> {
    match raw {
        "pods" | "po" => Some("pods"),
        "services" | "svc" => Some("services"),
        "endpoints" | "ep" => Some("endpoints"),
        "configmaps" | "cm" => Some("configmaps"),
        "secrets" => Some("secrets"),
        "namespaces" | "ns" => Some("namespaces"),
        "nodes" | "no" => Some("nodes"),
        _ => None,
    }
}

fn list_kind(resource: &str) -> &'static str {
    match resource {
        "pods" => "PodList",
        "services" => "ServiceList",
        "endpoints" => "EndpointsList",
        "configmaps" => "ConfigMapList",
        "secrets" => "SecretList",
        "namespaces" => "NamespaceList",
        "nodes" => "NodeList",
        "deployments" => "DeploymentList",
        _ => "List",
    }
}

fn api_version_of(resource: &str) -> &'static str {
    match resource {
        "deployments" => "apps/v1",
        _ => "v1",
    }
}

fn list_envelope(resource: &str, resource_version: u64, items: Vec<Value>) -> Value {
    json!({
        "kind": list_kind(resource),
        "apiVersion": api_version_of(resource),
        "metadata": { "resourceVersion": resource_version.to_string() },
        "items": items,
    })
}

fn labels_of(item: &Value) -> Value {
    item.pointer("/metadata/labels")
        .cloned()
        .unwrap_or_else(|| json!({}))
}

fn is_system_namespace(name: &str, project_name: &str) -> bool {
    matches!(name, "default" | "kube-system" | "kube-public") || name == project_name
}

/// `GET /api/v1/namespaces` — always enumerable regardless of compose state
/// (spec §3).
pub async fn list_namespaces(State(state): State<AppState>) -> FacadeResult<Json<Value>> {
    let snapshot = state
        .load_snapshot()
        .map_err(|e| FacadeError::internal(e, "failed to load compose snapshot"))?;

    let mut names = vec!["default", "kube-system", "kube-public"]
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    names.push(snapshot.project_name.clone());

    let items: Vec<Value> = names
        .into_iter()
        .map(|name| {
            json!({
                "kind": "Namespace",
                "apiVersion": "v1",
                "metadata": { "name": name },
                "status": { "phase": "Active" },
            })
        })
        .collect();

    Ok(Json(list_envelope(
        "namespaces",
        state.leases().current_version(),
        items,
    )))
}

pub async fn get_namespace(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> FacadeResult<Json<Value>> {
    let snapshot = state
        .load_snapshot()
        .map_err(|e| FacadeError::internal(e, "failed to load compose snapshot"))?;

    if !is_system_namespace(&name, &snapshot.project_name) {
        return Err(FacadeError::not_found(format!(
            "namespaces \"{name}\" not found"
        )));
    }

    Ok(Json(json!({
        "kind": "Namespace",
        "apiVersion": "v1",
        "metadata": { "name": name },
        "status": { "phase": "Active" },
    })))
}

pub async fn list_nodes(State(state): State<AppState>) -> Json<Value> {
    Json(list_envelope("nodes", state.leases().current_version(), vec![]))
}

pub async fn get_node(Path(name): Path<String>) -> FacadeError {
    FacadeError::not_found(format!("nodes \"{name}\" not found"))
}

fn collect_namespaced_items(
    state: &AppState,
    snapshot: &crate::compose::ComposeSnapshot,
    resource: &str,
) -> anyhow::Result<Vec<Value>> {
    let projector = Projector::new(snapshot, state.start_time());

    let items = match resource {
        "pods" => snapshot.workload_services().map(|s| projector.pod(s)).collect(),
        "services" => snapshot
            .workload_services()
            .map(|s| projector.service(s))
            .collect(),
        "endpoints" => snapshot
            .workload_services()
            .map(|s| projector.endpoints(s))
            .collect(),
        "configmaps" => configmaps::scan(
            &state.settings().configmaps_dir(),
            &snapshot.project_name,
            ResourceKind::ConfigMap,
        )?,
        "secrets" => configmaps::scan(
            &state.settings().secrets_dir(),
            &snapshot.project_name,
            ResourceKind::Secret,
        )?,
        _ => vec![],
    };

    Ok(items)
}

async fn list_namespaced_core(
    state: &AppState,
    namespace: &str,
    canonical: &str,
    query: &HashMap<String, String>,
) -> FacadeResult<Value> {
    let snapshot = state
        .load_snapshot()
        .map_err(|e| FacadeError::internal(e, "failed to load compose snapshot"))?;

    if namespace != snapshot.project_name {
        return Ok(list_envelope(canonical, state.leases().current_version(), vec![]));
    }

    let items = collect_namespaced_items(state, &snapshot, canonical)
        .map_err(|e| FacadeError::internal(e, "failed to scan resource directory"))?;

    let selector = match query.get("labelSelector") {
        Some(raw) => Selector::parse(raw)?,
        None => Selector::default(),
    };
    let filtered: Vec<Value> = items
        .into_iter()
        .filter(|item| selector.matches(&labels_of(item)))
        .collect();

    Ok(list_envelope(canonical, state.leases().current_version(), filtered))
}

/// `GET /api/v1/{resource}` — the cluster-scoped list form of spec §4.6's
/// grammar. This façade only ever has one namespace with workloads in it, so
/// the cluster-scoped view is the project namespace's view; routed
/// separately from `list_namespaced` only because the path shape differs.
pub async fn list_cluster_scoped(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> FacadeResult<Json<Value>> {
    let canonical = canonical_core_resource(&resource).ok_or_else(|| {
        FacadeError::not_found(format!("the server could not find the requested resource ({resource})"))
    })?;
    let snapshot = state
        .load_snapshot()
        .map_err(|e| FacadeError::internal(e, "failed to load compose snapshot"))?;
    list_namespaced_core(&state, &snapshot.project_name, canonical, &query)
        .await
        .map(Json)
}

/// `GET /api/v1/{resource}/{name}` — cluster-scoped get.
pub async fn get_cluster_scoped(
    State(state): State<AppState>,
    Path((resource, name)): Path<(String, String)>,
) -> FacadeResult<Json<Value>> {
    let canonical = canonical_core_resource(&resource).ok_or_else(|| {
        FacadeError::not_found(format!("the server could not find the requested resource ({resource})"))
    })?;
    let snapshot = state
        .load_snapshot()
        .map_err(|e| FacadeError::internal(e, "failed to load compose snapshot"))?;
    get_namespaced_core(&state, &snapshot.project_name, canonical, &name)
        .await
        .map(Json)
}

/// `GET /api/v1/namespaces/{ns}/{resource}`. Any namespace other than the
/// project namespace (and its system siblings) yields an empty list, never
/// an error (spec §3 "Project namespace").
pub async fn list_namespaced(
    State(state): State<AppState>,
    Path((namespace, resource)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> FacadeResult<Json<Value>> {
    let canonical = canonical_core_resource(&resource).ok_or_else(|| {
        FacadeError::not_found(format!("the server could not find the requested resource ({resource})"))
    })?;
    list_namespaced_core(&state, &namespace, canonical, &query)
        .await
        .map(Json)
}

/// `GET /apis/apps/v1/namespaces/{ns}/deployments`.
pub async fn list_deployments(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> FacadeResult<Json<Value>> {
    list_namespaced_core(&state, &namespace, "deployments", &query)
        .await
        .map(Json)
}

fn find_by_name<'a>(items: &'a [Value], name: &str) -> Option<&'a Value> {
    items
        .iter()
        .find(|item| item.pointer("/metadata/name").and_then(Value::as_str) == Some(name))
}

async fn get_namespaced_core(
    state: &AppState,
    namespace: &str,
    canonical: &str,
    name: &str,
) -> FacadeResult<Value> {
    let snapshot = state
        .load_snapshot()
        .map_err(|e| FacadeError::internal(e, "failed to load compose snapshot"))?;

    if namespace != snapshot.project_name {
        return Err(FacadeError::not_found(format!("{canonical} \"{name}\" not found")));
    }

    let item = if canonical == "deployments" {
        let projector = Projector::new(&snapshot, state.start_time());
        snapshot.find_service(name).map(|svc| projector.deployment(svc))
    } else {
        let items = collect_namespaced_items(state, &snapshot, canonical)
            .map_err(|e| FacadeError::internal(e, "failed to scan resource directory"))?;
        find_by_name(&items, name).cloned()
    };

    item.ok_or_else(|| FacadeError::not_found(format!("{canonical} \"{name}\" not found")))
}

/// `GET /api/v1/namespaces/{ns}/{resource}/{name}`.
pub async fn get_namespaced(
    State(state): State<AppState>,
    Path((namespace, resource, name)): Path<(String, String, String)>,
) -> FacadeResult<Json<Value>> {
    let canonical = canonical_core_resource(&resource).ok_or_else(|| {
        FacadeError::not_found(format!("the server could not find the requested resource ({resource})"))
    })?;
    get_namespaced_core(&state, &namespace, canonical, &name)
        .await
        .map(Json)
}

/// `GET /apis/apps/v1/namespaces/{ns}/deployments/{name}`.
pub async fn get_deployment(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> FacadeResult<Json<Value>> {
    get_namespaced_core(&state, &namespace, "deployments", &name)
        .await
        .map(Json)
}

/// `PATCH /apis/apps/v1/namespaces/{ns}/deployments/{name}` — the only
/// namespaced-resource mutation outside Leases. Triggers a best-effort
/// restart through the runtime bridge when the body carries the rollout
/// idiom; any other PATCH body is accepted with no side effect (spec §4.5).
pub async fn patch_deployment(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> FacadeResult<(StatusCode, Json<Value>)> {
    let snapshot = state
        .load_snapshot()
        .map_err(|e| FacadeError::internal(e, "failed to load compose snapshot"))?;

    if namespace != snapshot.project_name {
        return Err(FacadeError::not_found(format!(
            "deployments \"{name}\" not found"
        )));
    }

    let svc = snapshot
        .find_service(&name)
        .ok_or_else(|| FacadeError::not_found(format!("deployments \"{name}\" not found")))?;

    if crate::bridge::patch_triggers_restart(&body) {
        if let Err(e) = state.bridge().restart(&snapshot.project_name, &svc.name).await {
            tracing::warn!(error = %e, service = %svc.name, "restart via runtime bridge unavailable");
        }
    }

    let projector = Projector::new(&snapshot, state.start_time());
    Ok((StatusCode::OK, Json(projector.deployment(svc))))
}

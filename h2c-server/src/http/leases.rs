use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::{FacadeError, FacadeResult};
use crate::http::selector::Selector;
use crate::lease::{CreateError, Lease, UpdateError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct LeaseMetadata {
    name: Option<String>,
    #[serde(rename = "resourceVersion")]
    resource_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LeaseSpec {
    #[serde(rename = "holderIdentity")]
    holder_identity: Option<String>,
    #[serde(rename = "leaseDurationSeconds")]
    lease_duration_seconds: Option<i64>,
    #[serde(rename = "acquireTime")]
    acquire_time: Option<DateTime<Utc>>,
    #[serde(rename = "renewTime")]
    renew_time: Option<DateTime<Utc>>,
    #[serde(rename = "leaseTransitions")]
    lease_transitions: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LeaseBody {
    #[serde(default)]
    metadata: LeaseMetadata,
    #[serde(default)]
    spec: LeaseSpec,
    #[serde(rename = "resourceVersion")]
    resource_version: Option<String>,
}

fn render(lease: &Lease) -> Value {
    json!({
        "kind": "Lease",
        "apiVersion": "coordination.k8s.io/v1",
        "metadata": {
            "name": lease.name,
            "namespace": lease.namespace,
            "resourceVersion": lease.resource_version.to_string(),
        },
        "spec": {
            "holderIdentity": lease.holder_identity,
            "leaseDurationSeconds": lease.lease_duration_seconds,
            "acquireTime": lease.acquire_time,
            "renewTime": lease.renew_time,
            "leaseTransitions": lease.lease_transitions,
        },
    })
}

fn render_list(namespace: &str, current_version: u64, leases: &[Lease]) -> Value {
    json!({
        "kind": "LeaseList",
        "apiVersion": "coordination.k8s.io/v1",
        "metadata": { "resourceVersion": current_version.to_string() },
        "items": leases.iter().map(render).collect::<Vec<_>>(),
    })
}

pub async fn list_leases(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> FacadeResult<Json<Value>> {
    let leases = state.leases().list(&namespace);
    let selector = match query.get("labelSelector") {
        Some(raw) => Selector::parse(raw)?,
        None => Selector::default(),
    };
    // Leases carry no labels in this data model (spec §3), so any non-empty
    // selector excludes everything rather than being silently ignored.
    let filtered: Vec<Lease> = if selector.matches(&json!({})) {
        leases
    } else {
        Vec::new()
    };

    Ok(Json(render_list(
        &namespace,
        state.leases().current_version(),
        &filtered,
    )))
}

pub async fn get_lease(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> FacadeResult<Json<Value>> {
    state
        .leases()
        .get(&namespace, &name)
        .map(|l| Json(render(&l)))
        .ok_or_else(|| FacadeError::not_found(format!("leases \"{name}\" not found")))
}

pub async fn create_lease(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    Json(body): Json<LeaseBody>,
) -> FacadeResult<(StatusCode, Json<Value>)> {
    let name = body
        .metadata
        .name
        .ok_or_else(|| FacadeError::bad_request("lease body missing metadata.name"))?;

    let lease = state
        .leases()
        .create(
            &namespace,
            &name,
            body.spec.holder_identity,
            body.spec.lease_duration_seconds,
            body.spec.acquire_time,
            body.spec.lease_transitions,
        )
        .map_err(|e| match e {
            CreateError::AlreadyExists => {
                FacadeError::conflict(format!("leases \"{name}\" already exists"))
            }
        })?;

    Ok((StatusCode::CREATED, Json(render(&lease))))
}

pub async fn update_lease(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(body): Json<LeaseBody>,
) -> FacadeResult<Json<Value>> {
    // Real leader-election clients (kube-rs `LeaseLock`, client-go
    // `leaderelection`) send `resourceVersion` under `metadata`, not
    // top-level; fall back to the top-level key so a hand-built request body
    // still works.
    let raw_version = body
        .metadata
        .resource_version
        .as_ref()
        .or(body.resource_version.as_ref());
    let expected_version = match raw_version {
        Some(raw) => Some(
            raw.parse::<u64>()
                .map_err(|_| FacadeError::bad_request("resourceVersion must be an integer"))?,
        ),
        None => None,
    };

    let lease = state
        .leases()
        .update(
            &namespace,
            &name,
            expected_version,
            body.spec.holder_identity,
            body.spec.lease_duration_seconds,
            body.spec.acquire_time,
            body.spec.renew_time,
        )
        .map_err(|e| match e {
            UpdateError::NotFound => FacadeError::not_found(format!("leases \"{name}\" not found")),
            UpdateError::Conflict => FacadeError::conflict(format!(
                "leases \"{name}\" resourceVersion conflict"
            )),
        })?;

    Ok(Json(render(&lease)))
}

pub async fn delete_lease(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> FacadeResult<Json<Value>> {
    if state.leases().delete(&namespace, &name) {
        Ok(Json(json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Success",
        })))
    } else {
        Err(FacadeError::not_found(format!(
            "leases \"{name}\" not found"
        )))
    }
}

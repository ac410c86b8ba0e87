use axum::Json;
use serde_json::{json, Value};

/// Discovery payloads are static — they never depend on the compose
/// snapshot and must never fail once the process is up (spec §7: "the six
/// discovery endpoints and /version MUST NEVER return anything other than
/// 200").
pub async fn version() -> Json<Value> {
    Json(json!({
        "major": "1",
        "minor": "28",
        "gitVersion": "v1.28.0-h2c",
        "gitCommit": "0000000000000000000000000000000000000000",
        "gitTreeState": "clean",
        "buildDate": "2026-01-01T00:00:00Z",
        "goVersion": "go1.21.0",
        "compiler": "gc",
        "platform": "linux/amd64",
    }))
}

pub async fn api_root() -> Json<Value> {
    Json(json!({
        "kind": "APIVersions",
        "versions": ["v1"],
        "serverAddressByClientCIDRs": [],
    }))
}

pub async fn apis_root() -> Json<Value> {
    Json(json!({
        "kind": "APIGroupList",
        "apiVersion": "v1",
        "groups": [
            {
                "name": "apps",
                "versions": [{"groupVersion": "apps/v1", "version": "v1"}],
                "preferredVersion": {"groupVersion": "apps/v1", "version": "v1"},
            },
            {
                "name": "coordination.k8s.io",
                "versions": [{"groupVersion": "coordination.k8s.io/v1", "version": "v1"}],
                "preferredVersion": {"groupVersion": "coordination.k8s.io/v1", "version": "v1"},
            },
        ],
    }))
}

fn resource(name: &str, kind: &str, namespaced: bool, verbs: &[&str], short_names: &[&str]) -> Value {
    json!({
        "name": name,
        "singularName": "",
        "namespaced": namespaced,
        "kind": kind,
        "verbs": verbs,
        "shortNames": short_names,
    })
}

pub async fn core_v1() -> Json<Value> {
    Json(json!({
        "kind": "APIResourceList",
        "groupVersion": "v1",
        "resources": [
            resource("namespaces", "Namespace", false, &["get", "list"], &["ns"]),
            resource("nodes", "Node", false, &["get", "list"], &["no"]),
            resource("pods", "Pod", true, &["get", "list"], &["po"]),
            resource("services", "Service", true, &["get", "list"], &["svc"]),
            resource("endpoints", "Endpoints", true, &["get", "list"], &["ep"]),
            resource("configmaps", "ConfigMap", true, &["get", "list"], &["cm"]),
            resource("secrets", "Secret", true, &["get", "list"], &[]),
        ],
    }))
}

pub async fn apps_v1() -> Json<Value> {
    Json(json!({
        "kind": "APIResourceList",
        "groupVersion": "apps/v1",
        "resources": [
            resource(
                "deployments",
                "Deployment",
                true,
                &["get", "list", "patch", "update"],
                &["deploy"],
            ),
        ],
    }))
}

pub async fn coordination_v1() -> Json<Value> {
    Json(json!({
        "kind": "APIResourceList",
        "groupVersion": "coordination.k8s.io/v1",
        "resources": [
            resource(
                "leases",
                "Lease",
                true,
                &["create", "delete", "get", "list", "update"],
                &[],
            ),
        ],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn coordination_v1_lists_leases_resource_with_expected_verbs() {
        let Json(body) = coordination_v1().await;
        let leases = &body["resources"][0];
        assert_eq!(leases["name"], "leases");
        assert_eq!(leases["namespaced"], true);
        assert_eq!(leases["kind"], "Lease");
    }

    #[tokio::test]
    async fn api_root_lists_only_v1() {
        let Json(body) = api_root().await;
        assert_eq!(body["versions"], json!(["v1"]));
    }
}

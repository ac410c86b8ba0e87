use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use crate::settings::Settings;
use crate::state::AppState;

fn write_demo_compose(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("compose.yml");
    std::fs::write(
        &path,
        "name: demo\n\
         services:\n\
         \x20 web:\n\
         \x20   image: nginx\n\
         \x20   labels:\n\
         \x20     tier: frontend\n\
         \x20 db:\n\
         \x20   image: postgres\n\
         \x20   labels:\n\
         \x20     tier: backend\n",
    )
    .unwrap();
    path
}

fn demo_state(dir: &std::path::Path) -> AppState {
    let compose = write_demo_compose(dir);
    AppState::new(Settings {
        compose: compose.to_string_lossy().to_string(),
        data_dir: dir.to_string_lossy().to_string(),
        port: 6443,
        sa_dir: dir.to_string_lossy().to_string(),
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn version_endpoint_always_returns_200() {
    let dir = tempfile::tempdir().unwrap();
    let app = crate::http::router(demo_state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/version")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["gitVersion"], "v1.28.0-h2c");
}

#[tokio::test]
async fn pod_listing_excludes_other_namespaces() {
    let dir = tempfile::tempdir().unwrap();
    let app = crate::http::router(demo_state(dir.path()));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/namespaces/demo/pods")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "PodList");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/namespaces/other/pods")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn label_selector_filters_pod_list() {
    let dir = tempfile::tempdir().unwrap();
    let app = crate::http::router(demo_state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/namespaces/demo/pods?labelSelector=tier=frontend")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["metadata"]["name"], "web-0");
}

#[tokio::test]
async fn cluster_scoped_pod_list_matches_project_namespace_view() {
    let dir = tempfile::tempdir().unwrap();
    let app = crate::http::router(demo_state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/pods")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "PodList");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn deployment_list_envelope_uses_apps_v1() {
    let dir = tempfile::tempdir().unwrap();
    let app = crate::http::router(demo_state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/apis/apps/v1/namespaces/demo/deployments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["apiVersion"], "apps/v1");
    assert_eq!(body["items"][0]["apiVersion"], "apps/v1");
}

#[tokio::test]
async fn lease_lifecycle_matches_create_get_delete_get() {
    let dir = tempfile::tempdir().unwrap();
    let app = crate::http::router(demo_state(dir.path()));

    let create = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/apis/coordination.k8s.io/v1/namespaces/demo/leases")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "metadata": {"name": "L"},
                        "spec": {"holderIdentity": "A"}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::CREATED);
    let created = body_json(create).await;
    let v1 = created["metadata"]["resourceVersion"].as_str().unwrap().to_string();

    let get = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/apis/coordination.k8s.io/v1/namespaces/demo/leases/L")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::OK);

    let update = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/apis/coordination.k8s.io/v1/namespaces/demo/leases/L")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "metadata": {"name": "L"},
                        "resourceVersion": v1,
                        "spec": {"holderIdentity": "B"}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::OK);
    let updated = body_json(update).await;
    assert_eq!(updated["spec"]["leaseTransitions"], 1);

    let stale_update = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/apis/coordination.k8s.io/v1/namespaces/demo/leases/L")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "metadata": {"name": "L"},
                        "resourceVersion": v1,
                        "spec": {"holderIdentity": "C"}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stale_update.status(), StatusCode::CONFLICT);

    let delete = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/apis/coordination.k8s.io/v1/namespaces/demo/leases/L")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::OK);

    let get_after_delete = app
        .oneshot(
            Request::builder()
                .uri("/apis/coordination.k8s.io/v1/namespaces/demo/leases/L")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get_after_delete.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lease_update_honors_resource_version_under_metadata() {
    // Mirrors how kube-rs's `LeaseLock` and client-go's `leaderelection`
    // actually place `resourceVersion` — under `metadata`, not top-level.
    let dir = tempfile::tempdir().unwrap();
    let app = crate::http::router(demo_state(dir.path()));

    let create = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/apis/coordination.k8s.io/v1/namespaces/demo/leases")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "metadata": {"name": "M"},
                        "spec": {"holderIdentity": "A"}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::CREATED);
    let created = body_json(create).await;
    let v1 = created["metadata"]["resourceVersion"].as_str().unwrap().to_string();

    let first_update = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/apis/coordination.k8s.io/v1/namespaces/demo/leases/M")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "metadata": {"name": "M", "resourceVersion": v1},
                        "spec": {"holderIdentity": "B"}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first_update.status(), StatusCode::OK);

    // A second candidate racing on the same stale version, also placing it
    // under metadata, must be rejected with a 409 rather than silently
    // winning because the stale check was never applied.
    let stale_update = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/apis/coordination.k8s.io/v1/namespaces/demo/leases/M")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "metadata": {"name": "M", "resourceVersion": v1},
                        "spec": {"holderIdentity": "C"}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stale_update.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unsupported_verb_and_watch_both_return_501() {
    let dir = tempfile::tempdir().unwrap();
    let app = crate::http::router(demo_state(dir.path()));

    let delete_pod = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/namespaces/demo/pods/web-0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delete_pod.status(), StatusCode::NOT_IMPLEMENTED);

    let watch = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/namespaces/demo/pods?watch=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(watch.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn unknown_path_is_shaped_as_kubernetes_status() {
    let dir = tempfile::tempdir().unwrap();
    let app = crate::http::router(demo_state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/totally/unknown/path")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "Status");
    assert_eq!(body["status"], "Failure");
}

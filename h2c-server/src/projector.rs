use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::compose::{ComposeSnapshot, Service};
use crate::identity;

/// Pure mapping from a compose snapshot to Kubernetes resource JSON bodies.
/// Every function here is a projection: no I/O, no shared state, called fresh
/// per request against whatever snapshot the caller already loaded (spec
/// §4.2).
pub struct Projector<'a> {
    pub snapshot: &'a ComposeSnapshot,
    pub start_time: DateTime<Utc>,
}

impl<'a> Projector<'a> {
    pub fn new(snapshot: &'a ComposeSnapshot, start_time: DateTime<Utc>) -> Self {
        Self {
            snapshot,
            start_time,
        }
    }

    fn labels(&self, svc: &Service) -> serde_json::Map<String, Value> {
        let mut labels = serde_json::Map::new();
        labels.insert("app".to_string(), Value::String(svc.name.clone()));
        for (k, v) in &svc.labels {
            labels.insert(k.clone(), Value::String(v.clone()));
        }
        labels
    }

    pub fn pod(&self, svc: &Service) -> Value {
        let project = &self.snapshot.project_name;
        let uid = identity::pod_uid(project, &svc.name);
        let pod_ip = identity::pod_ip(project, &svc.name);

        json!({
            "kind": "Pod",
            "apiVersion": "v1",
            "metadata": {
                "name": format!("{}-0", svc.name),
                "namespace": project,
                "uid": uid.to_string(),
                "labels": self.labels(svc),
            },
            "spec": {
                "containers": [{
                    "name": svc.name,
                    "image": svc.image,
                    "command": svc.command,
                    "ports": svc.ports.iter().map(|p| json!({
                        "containerPort": p.target,
                        "protocol": p.protocol.to_uppercase(),
                    })).collect::<Vec<_>>(),
                }],
            },
            "status": {
                "phase": "Running",
                "hostIP": pod_ip.clone(),
                "podIP": pod_ip,
                "startTime": self.start_time.to_rfc3339(),
            },
        })
    }

    pub fn service(&self, svc: &Service) -> Value {
        let project = &self.snapshot.project_name;
        let cluster_ip = identity::cluster_ip(project, &svc.name);

        json!({
            "kind": "Service",
            "apiVersion": "v1",
            "metadata": {
                "name": svc.name,
                "namespace": project,
                "labels": self.labels(svc),
            },
            "spec": {
                "type": "ClusterIP",
                "clusterIP": cluster_ip,
                "ports": svc.ports.iter().map(|p| {
                    let mut entry = json!({
                        "port": p.target,
                        "targetPort": p.target,
                        "protocol": p.protocol.to_uppercase(),
                    });
                    if let Some(published) = p.published {
                        entry["nodePort"] = json!(published);
                    }
                    entry
                }).collect::<Vec<_>>(),
                "selector": { "app": svc.name },
            },
        })
    }

    pub fn endpoints(&self, svc: &Service) -> Value {
        let project = &self.snapshot.project_name;
        let pod_ip = identity::pod_ip(project, &svc.name);

        json!({
            "kind": "Endpoints",
            "apiVersion": "v1",
            "metadata": {
                "name": svc.name,
                "namespace": project,
                "labels": self.labels(svc),
            },
            "subsets": [{
                "addresses": [{
                    "ip": pod_ip,
                    "targetRef": {
                        "kind": "Pod",
                        "name": format!("{}-0", svc.name),
                        "namespace": project,
                    },
                }],
                "notReadyAddresses": [],
                "ports": svc.ports.iter().map(|p| json!({
                    "port": p.target,
                    "protocol": p.protocol.to_uppercase(),
                })).collect::<Vec<_>>(),
            }],
        })
    }

    pub fn deployment(&self, svc: &Service) -> Value {
        let project = &self.snapshot.project_name;

        json!({
            "kind": "Deployment",
            "apiVersion": "apps/v1",
            "metadata": {
                "name": svc.name,
                "namespace": project,
                "labels": self.labels(svc),
            },
            "spec": {
                "replicas": 1,
                "selector": { "matchLabels": { "app": svc.name } },
                "strategy": { "type": "RollingUpdate" },
                "template": {
                    "metadata": { "labels": self.labels(svc) },
                    "spec": {
                        "containers": [{
                            "name": svc.name,
                            "image": svc.image,
                        }],
                    },
                },
            },
            "status": {
                "replicas": 1,
                "readyReplicas": 1,
                "availableReplicas": 1,
            },
        })
    }
}

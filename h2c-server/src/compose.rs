use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// One `{published?, target, protocol}` port mapping from a compose service.
#[derive(Debug, Clone, Deserialize)]
pub struct PortSpec {
    pub published: Option<u16>,
    pub target: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawService {
    pub image: Option<String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub ports: Vec<PortSpec>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawCompose {
    name: Option<String>,
    #[serde(default)]
    services: serde_yaml::Mapping,
}

/// A single normalised compose service, in the order it appeared in the file.
#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub ports: Vec<PortSpec>,
    pub environment: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub volumes: Vec<String>,
    pub depends_on: Vec<String>,
}

/// Normalised, immutable view of the compose document backing a single
/// request. The façade re-parses the file per request rather than caching —
/// simpler than a staleness-window cache and cheap enough for the request
/// volumes this server sees (spec §3/§9 open question (b)).
#[derive(Debug, Clone)]
pub struct ComposeSnapshot {
    pub project_name: String,
    pub services: Vec<Service>,
}

/// Reserved label the injection planner stamps on the façade's own compose
/// service; projection filters any service carrying it out of every listing
/// (spec §9, "Exclusion of the façade from its own listings").
pub const FACADE_LABEL_KEY: &str = "h2c.io/facade";
pub const FACADE_LABEL_VALUE: &str = "true";

impl ComposeSnapshot {
    pub fn load(compose_path: &Path) -> anyhow::Result<Self> {
        let raw_bytes = std::fs::read(compose_path)
            .with_context(|| format!("reading compose file at {}", compose_path.display()))?;
        let raw: RawCompose = serde_yaml::from_slice(&raw_bytes)
            .with_context(|| format!("parsing compose file at {}", compose_path.display()))?;

        let project_name = raw
            .name
            .clone()
            .unwrap_or_else(|| derive_project_name(compose_path));

        // `serde_yaml::Mapping` preserves the document's insertion order, so
        // iterating it directly (rather than collecting into a `BTreeMap`
        // first) keeps services in compose-file order (spec §4.2).
        let mut services = Vec::with_capacity(raw.services.len());
        for (key, value) in raw.services {
            let name = key
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("service keys must be strings"))?
                .to_string();
            let svc: RawService = serde_yaml::from_value(value)
                .with_context(|| format!("parsing service '{name}'"))?;
            services.push(Service {
                name,
                image: svc.image.unwrap_or_default(),
                command: svc.command,
                ports: svc.ports,
                environment: svc.environment,
                labels: svc.labels,
                volumes: svc.volumes,
                depends_on: svc.depends_on,
            });
        }

        Ok(Self {
            project_name,
            services,
        })
    }

    /// Services with the façade's own reserved label filtered out, in
    /// compose-file order (spec §4.2).
    pub fn workload_services(&self) -> impl Iterator<Item = &Service> {
        self.services.iter().filter(|s| {
            s.labels.get(FACADE_LABEL_KEY).map(String::as_str) != Some(FACADE_LABEL_VALUE)
        })
    }

    pub fn find_service(&self, name: &str) -> Option<&Service> {
        self.workload_services().find(|s| s.name == name)
    }
}

fn derive_project_name(compose_path: &Path) -> String {
    let parent_name = compose_path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("default");

    sanitize_project_name(parent_name)
}

fn sanitize_project_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('-');
        }
    }
    if out.is_empty() {
        "default".to_string()
    } else {
        out
    }
}

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde_yaml::Value;

/// A compose document kept as a generic YAML mapping rather than a typed
/// struct: the planner only ever needs to read `name`/`services` and graft a
/// handful of keys onto each service and one new service, so round-tripping
/// through a strict schema would only risk dropping fields this tool doesn't
/// know about (spec §4.8 step 6, "transform mode").
#[derive(Debug, Clone)]
pub struct ComposeGraph {
    pub document: Value,
}

impl ComposeGraph {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading compose file at {}", path.display()))?;
        let document: Value = serde_yaml::from_slice(&bytes)
            .with_context(|| format!("parsing compose file at {}", path.display()))?;
        Ok(Self { document })
    }

    pub fn project_name(&self, compose_path: &Path) -> String {
        if let Some(name) = self.document.get("name").and_then(Value::as_str) {
            return crate::sanitize::project_name(name);
        }
        let parent = compose_path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("default");
        crate::sanitize::project_name(parent)
    }

    fn services_mut(&mut self) -> &mut serde_yaml::Mapping {
        let root = self
            .document
            .as_mapping_mut()
            .expect("compose document root must be a mapping");
        root.entry(Value::String("services".to_string()))
            .or_insert_with(|| Value::Mapping(serde_yaml::Mapping::new()));
        root.get_mut("services")
            .and_then(Value::as_mapping_mut)
            .expect("services key must hold a mapping")
    }

    pub fn service_names(&self) -> Vec<String> {
        self.document
            .get("services")
            .and_then(Value::as_mapping)
            .map(|m| {
                m.keys()
                    .filter_map(|k| k.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Grafts the SA bundle mount, the cluster-locator environment
    /// variables, and a `depends_on` edge onto an existing service (spec
    /// §4.8 step 5a-c).
    pub fn inject_service(
        &mut self,
        service_name: &str,
        sa_dir_mount: &str,
        facade_service_name: &str,
        facade_port: u16,
    ) -> anyhow::Result<()> {
        let services = self.services_mut();
        let entry = services
            .get_mut(Value::String(service_name.to_string()))
            .ok_or_else(|| anyhow::anyhow!("service '{service_name}' not found in compose file"))?;
        let service = entry
            .as_mapping_mut()
            .ok_or_else(|| anyhow::anyhow!("service '{service_name}' is not a mapping"))?;

        append_sequence_entry(
            service,
            "volumes",
            Value::String(format!("./{sa_dir_mount}:{sa_dir_mount}:ro")),
        );

        set_env_entry(
            service,
            "KUBERNETES_SERVICE_HOST",
            facade_service_name,
        );
        set_env_entry(
            service,
            "KUBERNETES_SERVICE_PORT",
            &facade_port.to_string(),
        );

        append_sequence_entry(
            service,
            "depends_on",
            Value::String(facade_service_name.to_string()),
        );

        Ok(())
    }

    /// Adds the façade's own compose service (spec §4.8 step 5), tagged with
    /// the reserved exclusion label so the server never lists itself.
    pub fn add_facade_service(
        &mut self,
        facade_service_name: &str,
        image: &str,
        compose_mount: &str,
        sa_dir_mount: &str,
        facade_port: u16,
        bridge_socket: Option<&str>,
        publish_host_port: Option<u16>,
    ) {
        let mut service = serde_yaml::Mapping::new();
        service.insert(Value::String("image".to_string()), Value::String(image.to_string()));

        let mut environment = serde_yaml::Mapping::new();
        environment.insert(
            Value::String("H2C_COMPOSE".to_string()),
            Value::String("/data/compose.yml".to_string()),
        );
        environment.insert(
            Value::String("H2C_SA_DIR".to_string()),
            Value::String("/var/run/secrets/kubernetes.io/serviceaccount".to_string()),
        );
        environment.insert(
            Value::String("H2C_PORT".to_string()),
            Value::Number(serde_yaml::Number::from(facade_port as i64)),
        );
        service.insert(
            Value::String("environment".to_string()),
            Value::Mapping(environment),
        );

        let mut volumes = vec![
            Value::String(format!("{compose_mount}:/data/compose.yml:ro")),
            Value::String(format!(
                "./{sa_dir_mount}:/var/run/secrets/kubernetes.io/serviceaccount:ro"
            )),
        ];
        if let Some(socket) = bridge_socket {
            volumes.push(Value::String(format!("{socket}:{socket}")));
        }
        service.insert(Value::String("volumes".to_string()), Value::Sequence(volumes));

        let mut labels = serde_yaml::Mapping::new();
        labels.insert(
            Value::String("h2c.io/facade".to_string()),
            Value::String("true".to_string()),
        );
        service.insert(Value::String("labels".to_string()), Value::Mapping(labels));

        if let Some(host_port) = publish_host_port {
            service.insert(
                Value::String("ports".to_string()),
                Value::Sequence(vec![Value::String(format!("{host_port}:{facade_port}"))]),
            );
        }

        self.services_mut().insert(
            Value::String(facade_service_name.to_string()),
            Value::Mapping(service),
        );
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(&self.document).context("serialising compose override")
    }
}

fn append_sequence_entry(service: &mut serde_yaml::Mapping, key: &str, value: Value) {
    let entry = service
        .entry(Value::String(key.to_string()))
        .or_insert_with(|| Value::Sequence(Vec::new()));
    if let Some(seq) = entry.as_sequence_mut() {
        if !seq.contains(&value) {
            seq.push(value);
        }
    } else {
        *entry = Value::Sequence(vec![value]);
    }
}

fn set_env_entry(service: &mut serde_yaml::Mapping, key: &str, value: &str) {
    let entry = service
        .entry(Value::String("environment".to_string()))
        .or_insert_with(|| Value::Mapping(serde_yaml::Mapping::new()));
    match entry {
        Value::Mapping(map) => {
            map.insert(Value::String(key.to_string()), Value::String(value.to_string()));
        }
        Value::Sequence(seq) => {
            seq.retain(|v| !matches!(v.as_str(), Some(s) if s.starts_with(&format!("{key}="))));
            seq.push(Value::String(format!("{key}={value}")));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_path(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("compose.yml");
        std::fs::write(
            &path,
            "name: demo\nservices:\n  app:\n    image: nginx\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn inject_service_adds_mount_env_and_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_path(dir.path());
        let mut graph = ComposeGraph::load(&path).unwrap();
        graph
            .inject_service("app", "sa-bundle", "h2c-api", 6443)
            .unwrap();

        let rendered = graph.to_yaml_string().unwrap();
        assert!(rendered.contains("KUBERNETES_SERVICE_HOST"));
        assert!(rendered.contains("h2c-api"));
        assert!(rendered.contains("sa-bundle"));
    }

    #[test]
    fn add_facade_service_carries_reserved_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_path(dir.path());
        let mut graph = ComposeGraph::load(&path).unwrap();
        graph.add_facade_service(
            "h2c-api",
            "h2c-server:latest",
            "./compose.yml",
            "sa-bundle",
            6443,
            None,
            Some(16443),
        );

        let rendered = graph.to_yaml_string().unwrap();
        assert!(rendered.contains("h2c.io/facade"));
        assert!(rendered.contains("16443:6443"));
    }

    #[test]
    fn missing_service_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_path(dir.path());
        let mut graph = ComposeGraph::load(&path).unwrap();
        assert!(graph
            .inject_service("nonexistent", "sa-bundle", "h2c-api", 6443)
            .is_err());
    }
}

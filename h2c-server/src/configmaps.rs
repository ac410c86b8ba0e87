use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};

/// Which of the two recognised on-disk resource kinds a loader serves (spec
/// §4.3): ConfigMaps are UTF-8 first with a `binaryData` fallback, Secrets
/// always base64-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
}

impl ResourceKind {
    fn kubernetes_kind(self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
        }
    }
}

/// Scans a `configmaps/` or `secrets/` directory. A top-level file becomes a
/// resource named after the file's stem, with a single data entry keyed on
/// the full file name; a top-level subdirectory becomes a resource named
/// after the directory, with one data entry per contained file (spec §3
/// names the resource, §4.3 keys the data entry on the file name).
/// A missing root directory yields no resources rather than an error — the
/// directory is optional (spec §4.3 is silent on its absence, and treating it
/// as empty keeps discovery/list endpoints always-200 per spec §7).
pub fn scan(root: &Path, namespace: &str, kind: ResourceKind) -> anyhow::Result<Vec<Value>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut resources = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(root)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_file() {
            let file_name = entry.file_name().to_string_lossy().to_string();
            let resource_name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| file_name.clone());
            let bytes = std::fs::read(&path)?;
            resources.push(build_resource(
                &resource_name,
                namespace,
                kind,
                &[(file_name, bytes)],
            ));
        } else if file_type.is_dir() {
            let name = entry.file_name().to_string_lossy().to_string();
            let mut files = Vec::new();
            let mut sub_entries: Vec<_> = std::fs::read_dir(&path)?.collect::<Result<_, _>>()?;
            sub_entries.sort_by_key(|e| e.file_name());
            for sub_entry in sub_entries {
                if sub_entry.file_type()?.is_file() {
                    let sub_name = sub_entry.file_name().to_string_lossy().to_string();
                    let bytes = std::fs::read(sub_entry.path())?;
                    files.push((sub_name, bytes));
                }
            }
            resources.push(build_resource(&name, namespace, kind, &files));
        }
    }

    Ok(resources)
}

fn build_resource(
    name: &str,
    namespace: &str,
    kind: ResourceKind,
    files: &[(String, Vec<u8>)],
) -> Value {
    let mut data = serde_json::Map::new();
    let mut binary_data = serde_json::Map::new();

    for (file_name, bytes) in files {
        match kind {
            ResourceKind::Secret => {
                data.insert(file_name.clone(), Value::String(STANDARD.encode(bytes)));
            }
            ResourceKind::ConfigMap => match std::str::from_utf8(bytes) {
                Ok(text) => {
                    data.insert(file_name.clone(), Value::String(text.to_string()));
                }
                Err(_) => {
                    binary_data.insert(file_name.clone(), Value::String(STANDARD.encode(bytes)));
                }
            },
        }
    }

    let mut body = json!({
        "kind": kind.kubernetes_kind(),
        "apiVersion": "v1",
        "metadata": {
            "name": name,
            "namespace": namespace,
        },
        "data": data,
    });

    if kind == ResourceKind::ConfigMap && !binary_data.is_empty() {
        body["binaryData"] = Value::Object(binary_data);
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_directory_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("configmaps");
        let resources = scan(&missing, "demo", ResourceKind::ConfigMap).unwrap();
        assert!(resources.is_empty());
    }

    #[test]
    fn top_level_file_becomes_single_entry_resource() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.conf"), "key=value").unwrap();
        let resources = scan(dir.path(), "demo", ResourceKind::ConfigMap).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["metadata"]["name"], "app");
        assert_eq!(resources[0]["data"]["app.conf"], "key=value");
    }

    #[test]
    fn subdirectory_becomes_resource_with_one_entry_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nginx-conf");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("a.conf"), "a").unwrap();
        std::fs::write(sub.join("b.conf"), "b").unwrap();
        let resources = scan(dir.path(), "demo", ResourceKind::ConfigMap).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["metadata"]["name"], "nginx-conf");
        assert_eq!(resources[0]["data"]["a.conf"], "a");
        assert_eq!(resources[0]["data"]["b.conf"], "b");
    }

    #[test]
    fn secrets_always_base64_encode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("password"), "hunter2").unwrap();
        let resources = scan(dir.path(), "demo", ResourceKind::Secret).unwrap();
        assert_eq!(resources[0]["data"]["password"], STANDARD.encode("hunter2"));
    }

    #[test]
    fn binary_configmap_content_goes_to_binary_data() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0xff]).unwrap();
        let resources = scan(dir.path(), "demo", ResourceKind::ConfigMap).unwrap();
        assert!(resources[0].get("data").unwrap().get("blob.bin").is_none());
        assert!(resources[0]["binaryData"]["blob.bin"].is_string());
    }
}

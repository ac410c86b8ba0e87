use base64::{engine::general_purpose::STANDARD, Engine};
use serde_yaml::{Mapping, Value};

use crate::sa_bundle::FIXED_TOKEN;

/// Emits a client configuration naming `server` (the first user SAN, or
/// `localhost`), embedding the CA inline as base64, and bearing the fixed
/// token (spec §4.8 step 6, §6 "Emitted files").
pub fn render(server_host: &str, server_port: u16, ca_cert_pem: &str) -> anyhow::Result<String> {
    let mut cluster = Mapping::new();
    cluster.insert(
        Value::String("server".to_string()),
        Value::String(format!("https://{server_host}:{server_port}")),
    );
    cluster.insert(
        Value::String("certificate-authority-data".to_string()),
        Value::String(STANDARD.encode(ca_cert_pem)),
    );

    let mut cluster_entry = Mapping::new();
    cluster_entry.insert(Value::String("name".to_string()), Value::String("h2c".to_string()));
    cluster_entry.insert(Value::String("cluster".to_string()), Value::Mapping(cluster));

    let mut user = Mapping::new();
    user.insert(
        Value::String("token".to_string()),
        Value::String(FIXED_TOKEN.to_string()),
    );

    let mut user_entry = Mapping::new();
    user_entry.insert(Value::String("name".to_string()), Value::String("h2c".to_string()));
    user_entry.insert(Value::String("user".to_string()), Value::Mapping(user));

    let mut context = Mapping::new();
    context.insert(Value::String("cluster".to_string()), Value::String("h2c".to_string()));
    context.insert(Value::String("user".to_string()), Value::String("h2c".to_string()));

    let mut context_entry = Mapping::new();
    context_entry.insert(Value::String("name".to_string()), Value::String("h2c".to_string()));
    context_entry.insert(Value::String("context".to_string()), Value::Mapping(context));

    let mut root = Mapping::new();
    root.insert(Value::String("apiVersion".to_string()), Value::String("v1".to_string()));
    root.insert(Value::String("kind".to_string()), Value::String("Config".to_string()));
    root.insert(
        Value::String("clusters".to_string()),
        Value::Sequence(vec![Value::Mapping(cluster_entry)]),
    );
    root.insert(
        Value::String("users".to_string()),
        Value::Sequence(vec![Value::Mapping(user_entry)]),
    );
    root.insert(
        Value::String("contexts".to_string()),
        Value::Sequence(vec![Value::Mapping(context_entry)]),
    );
    root.insert(
        Value::String("current-context".to_string()),
        Value::String("h2c".to_string()),
    );

    serde_yaml::to_string(&Value::Mapping(root)).map_err(anyhow::Error::from)
}

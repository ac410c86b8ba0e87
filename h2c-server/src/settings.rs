use config::{Config, ConfigError, Environment};
use serde::Deserialize;

fn default_compose() -> String {
    "/data/compose.yml".to_string()
}

fn default_data_dir() -> String {
    "/data".to_string()
}

fn default_port() -> u16 {
    6443
}

fn default_sa_dir() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount".to_string()
}

/// Façade runtime configuration, sourced entirely from `H2C_*` environment
/// variables (spec §6). There is no file layer: unlike a deployed service,
/// this façade has nothing an operator would want to template per-environment
/// beyond these four knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_compose")]
    pub compose: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_sa_dir")]
    pub sa_dir: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("compose", default_compose())?
            .set_default("data_dir", default_data_dir())?
            .set_default("port", default_port() as i64)?
            .set_default("sa_dir", default_sa_dir())?
            .add_source(Environment::with_prefix("H2C").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    pub fn configmaps_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("configmaps")
    }

    pub fn secrets_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("secrets")
    }

    pub fn tls_cert_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.sa_dir).join("tls.crt")
    }

    pub fn tls_key_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.sa_dir).join("tls.key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_environment() {
        // `config::Environment` only looks at vars with the H2C_ prefix, so an
        // empty/irrelevant environment still yields a fully-defaulted Settings.
        let settings = Settings::from_env().expect("settings should build from defaults");
        assert_eq!(settings.port, 6443);
        assert_eq!(settings.data_dir, "/data");
        assert!(settings.compose.ends_with("compose.yml"));
    }
}

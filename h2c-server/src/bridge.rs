use std::path::PathBuf;

use bollard::container::{LogOutput, LogsOptions, RestartContainerOptions};
use bollard::Docker;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use thiserror::Error;

/// Failures the runtime bridge can report. Every variant maps to a 501 at the
/// HTTP layer (spec §4.5) — the bridge never promotes a socket-side failure
/// into a 5xx, since the bridge is explicitly best-effort.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("container runtime socket not available at {0}")]
    SocketUnavailable(String),
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("runtime request failed: {0}")]
    Upstream(String),
}

/// Optional client of a Docker-compatible HTTP API over a Unix-domain
/// socket. Re-dials per call rather than caching a connection: the spec
/// requires the server to re-check per request and downgrade to 501 silently
/// (spec §9 "Bridge degradation"), which is simplest when there's no
/// persistent connection state to get stale.
pub struct RuntimeBridge {
    socket_path: PathBuf,
}

impl RuntimeBridge {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    fn connect(&self) -> Result<Docker, BridgeError> {
        if !self.socket_path.exists() {
            return Err(BridgeError::SocketUnavailable(
                self.socket_path.display().to_string(),
            ));
        }
        Docker::connect_with_unix(
            &self.socket_path.to_string_lossy(),
            120,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| BridgeError::Upstream(e.to_string()))
    }

    /// Resolves a pod name to the container the compose tool would have
    /// created for it. The naming scheme is the open question the spec calls
    /// out (§9 (a)) — this probes the common compose-tool convention
    /// (`<project>_<service>_1` / `<project>-<service>-1`) rather than
    /// hard-coding one.
    async fn resolve_container(
        &self,
        docker: &Docker,
        project: &str,
        service: &str,
    ) -> Result<String, BridgeError> {
        let candidates = [
            format!("{project}_{service}_1"),
            format!("{project}-{service}-1"),
            format!("/{project}_{service}_1"),
        ];

        for candidate in &candidates {
            if docker.inspect_container(candidate, None).await.is_ok() {
                return Ok(candidate.clone());
            }
        }

        Err(BridgeError::ContainerNotFound(format!(
            "{project}/{service}"
        )))
    }

    pub async fn logs(
        &self,
        project: &str,
        service: &str,
        tail_lines: Option<i64>,
        timestamps: bool,
        follow: bool,
    ) -> Result<BoxStream<'static, Result<Bytes, std::io::Error>>, BridgeError> {
        let docker = self.connect()?;
        let container = self.resolve_container(&docker, project, service).await?;

        let tail = tail_lines
            .map(|n| n.to_string())
            .unwrap_or_else(|| "all".to_string());

        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow,
            timestamps,
            tail,
            ..Default::default()
        };

        let stream = docker
            .logs(&container, Some(options))
            .map(|chunk| match chunk {
                Ok(LogOutput::StdOut { message })
                | Ok(LogOutput::StdErr { message })
                | Ok(LogOutput::Console { message }) => Ok(Bytes::from(message.to_vec())),
                Ok(LogOutput::StdIn { message }) => Ok(Bytes::from(message.to_vec())),
                Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
            })
            .boxed();

        Ok(stream)
    }

    /// Restarts the container backing a deployment's single pod. Callers
    /// decide whether a given PATCH body actually warrants this (spec §4.5:
    /// only template-annotation changes trigger the rollout-restart idiom).
    pub async fn restart(&self, project: &str, service: &str) -> Result<(), BridgeError> {
        let docker = self.connect()?;
        let container = self.resolve_container(&docker, project, service).await?;

        docker
            .restart_container(&container, Some(RestartContainerOptions { t: 10 }))
            .await
            .map_err(|e| BridgeError::Upstream(e.to_string()))
    }
}

/// Standard rollout-restart idiom: a PATCH to a Deployment's pod template
/// annotations (`kubectl rollout restart` stamps
/// `spec.template.metadata.annotations["kubectl.kubernetes.io/restartedAt"]`).
pub fn patch_triggers_restart(body: &serde_json::Value) -> bool {
    body.pointer("/spec/template/metadata/annotations")
        .and_then(|a| a.as_object())
        .map(|annotations| annotations.keys().any(|k| k.contains("restartedAt")))
        .unwrap_or(false)
}

pub fn default_socket_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/var/run/docker.sock"),
        PathBuf::from("/run/docker.sock"),
    ]
}

pub fn first_available_socket(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.exists()).cloned()
}

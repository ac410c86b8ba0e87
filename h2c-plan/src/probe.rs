use std::path::{Path, PathBuf};
use std::time::Duration;

use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, WaitContainerOptions,
};
use bollard::service::HostConfig;
use bollard::Docker;
use futures_util::StreamExt;

/// Candidate container-runtime socket paths, in probe order (spec §4.8 step
/// 4). The default Docker socket first, then the common rootless/platform
/// variants.
pub fn candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/var/run/docker.sock"),
        PathBuf::from("/run/docker.sock"),
        dirs_runtime_socket(),
    ]
}

fn dirs_runtime_socket() -> PathBuf {
    let uid = std::env::var("UID").unwrap_or_else(|_| "1000".to_string());
    PathBuf::from(format!("/run/user/{uid}/docker.sock"))
}

const PROBE_IMAGE: &str = "busybox:latest";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempts an actual trial mount of `candidate` into a throwaway container
/// via a Docker connection dialed through that same socket. A probe passes
/// only when the container starts and can see the socket node; any failure —
/// connection refused, missing image, non-zero exit — silently disqualifies
/// the candidate rather than propagating an error (spec §4.8 step 4).
pub async fn passes(candidate: &Path) -> bool {
    if !candidate.exists() {
        return false;
    }

    let docker = match Docker::connect_with_unix(
        &candidate.to_string_lossy(),
        5,
        bollard::API_DEFAULT_VERSION,
    ) {
        Ok(d) => d,
        Err(_) => return false,
    };

    if tokio::time::timeout(PROBE_TIMEOUT, docker.ping())
        .await
        .is_err()
    {
        return false;
    }

    run_trial_container(&docker, candidate).await.unwrap_or(false)
}

async fn run_trial_container(docker: &Docker, candidate: &Path) -> Result<bool, bollard::errors::Error> {
    let mount_spec = format!("{0}:{0}", candidate.display());
    let name = format!("h2c-probe-{:08x}", rand::random::<u32>());

    let config = Config {
        image: Some(PROBE_IMAGE.to_string()),
        cmd: Some(vec![
            "test".to_string(),
            "-S".to_string(),
            candidate.display().to_string(),
        ]),
        host_config: Some(HostConfig {
            binds: Some(vec![mount_spec]),
            auto_remove: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    };

    let create_result = docker
        .create_container(Some(CreateContainerOptions { name: name.clone(), platform: None }), config)
        .await;

    let container_id = match create_result {
        Ok(created) => created.id,
        Err(e) => return Err(e),
    };

    let started = docker.start_container::<String>(&container_id, None).await;
    let passed = if started.is_ok() {
        wait_for_success(docker, &container_id).await
    } else {
        false
    };

    let _ = docker
        .remove_container(
            &container_id,
            Some(RemoveContainerOptions {
                force: true,
                ..Default::default()
            }),
        )
        .await;

    Ok(passed)
}

async fn wait_for_success(docker: &Docker, container_id: &str) -> bool {
    let mut stream = docker.wait_container(
        container_id,
        Some(WaitContainerOptions {
            condition: "not-running",
        }),
    );

    match tokio::time::timeout(PROBE_TIMEOUT, stream.next()).await {
        Ok(Some(Ok(response))) => response.status_code == 0,
        _ => false,
    }
}

/// Probes every candidate in order and returns the first that passes.
pub async fn first_passing(candidates: &[PathBuf]) -> Option<PathBuf> {
    for candidate in candidates {
        if passes(candidate).await {
            return Some(candidate.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nonexistent_socket_fails_probe_immediately() {
        let candidate = PathBuf::from("/nonexistent/docker.sock");
        assert!(!passes(&candidate).await);
    }

    #[tokio::test]
    async fn no_candidate_passes_when_all_sockets_absent() {
        let candidates = vec![PathBuf::from("/nonexistent/a.sock"), PathBuf::from("/nonexistent/b.sock")];
        assert!(first_passing(&candidates).await.is_none());
    }
}

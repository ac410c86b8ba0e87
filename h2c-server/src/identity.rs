use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Namespace UUID for deriving Pod UIDs via `Uuid::new_v5`. Arbitrary but
/// fixed — only stability within a process is required (spec §9).
const POD_UID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x68, 0x32, 0x63, 0x2d, 0x70, 0x6f, 0x64, 0x2d, 0x75, 0x69, 0x64, 0x2d, 0x6e, 0x73, 0x00, 0x00,
]);

/// Deterministic Pod UID from `(project_name, service)`. Stable across
/// requests and process restarts so client libraries that cache by UID across
/// discovery calls keep working.
pub fn pod_uid(project_name: &str, service: &str) -> Uuid {
    let key = format!("{project_name}/{service}");
    Uuid::new_v5(&POD_UID_NAMESPACE, key.as_bytes())
}

/// Deterministic pod/host IP in the Kubernetes default pod CIDR shape
/// (`10.244.x.y`), derived from a SHA-256 digest of `(project_name, service)`.
pub fn pod_ip(project_name: &str, service: &str) -> String {
    let digest = digest_of(project_name, service);
    format!("10.244.{}.{}", digest[0], digest[1].max(1))
}

/// Deterministic ClusterIP in the Kubernetes default service CIDR shape
/// (`10.96.x.y`), derived the same way but salted so it never collides with
/// `pod_ip` for the same service.
pub fn cluster_ip(project_name: &str, service: &str) -> String {
    let digest = digest_of_salted(project_name, service, "clusterip");
    format!("10.96.{}.{}", digest[0], digest[1].max(1))
}

fn digest_of(project_name: &str, service: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(project_name.as_bytes());
    hasher.update(b"/");
    hasher.update(service.as_bytes());
    hasher.finalize().into()
}

fn digest_of_salted(project_name: &str, service: &str, salt: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(project_name.as_bytes());
    hasher.update(b"/");
    hasher.update(service.as_bytes());
    hasher.update(b"/");
    hasher.update(salt.as_bytes());
    hasher.finalize().into()
}

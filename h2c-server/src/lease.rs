use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Kubernetes coordination.k8s.io/v1 Lease, trimmed to the fields the
/// façade's leader-election contract needs (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub namespace: String,
    pub name: String,
    pub holder_identity: Option<String>,
    pub lease_duration_seconds: Option<i64>,
    pub acquire_time: Option<DateTime<Utc>>,
    pub renew_time: Option<DateTime<Utc>>,
    pub lease_transitions: i64,
    pub resource_version: u64,
}

#[derive(Debug)]
pub enum CreateError {
    AlreadyExists,
}

#[derive(Debug)]
pub enum UpdateError {
    NotFound,
    Conflict,
}

/// In-memory lease map keyed by `(namespace, name)`, guarded by a single
/// mutex that is never held across I/O (spec §5/§9). The resource-version
/// counter is process-global and monotonic, doubling as the "current global
/// counter" that list responses for projected (read-only) resources stamp
/// into `metadata.resourceVersion` (spec §4.6).
pub struct LeaseStore {
    leases: Mutex<BTreeMap<(String, String), Lease>>,
    version_counter: AtomicU64,
}

impl LeaseStore {
    pub fn new() -> Self {
        Self {
            leases: Mutex::new(BTreeMap::new()),
            version_counter: AtomicU64::new(1),
        }
    }

    /// Current global resource-version counter, without mutating it. Used to
    /// stamp `metadata.resourceVersion` on list responses for projected
    /// resources that have no per-object version of their own.
    pub fn current_version(&self) -> u64 {
        self.version_counter.load(Ordering::SeqCst)
    }

    fn next_version(&self) -> u64 {
        self.version_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn create(
        &self,
        namespace: &str,
        name: &str,
        holder_identity: Option<String>,
        lease_duration_seconds: Option<i64>,
        acquire_time: Option<DateTime<Utc>>,
        lease_transitions: Option<i64>,
    ) -> Result<Lease, CreateError> {
        let mut leases = self.leases.lock().expect("lease store mutex poisoned");
        let key = (namespace.to_string(), name.to_string());
        if leases.contains_key(&key) {
            return Err(CreateError::AlreadyExists);
        }

        let now = Utc::now();
        let lease = Lease {
            namespace: namespace.to_string(),
            name: name.to_string(),
            holder_identity,
            lease_duration_seconds,
            acquire_time: acquire_time.or(Some(now)),
            renew_time: Some(now),
            lease_transitions: lease_transitions.unwrap_or(0),
            resource_version: self.next_version(),
        };
        leases.insert(key, lease.clone());
        Ok(lease)
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<Lease> {
        let leases = self.leases.lock().expect("lease store mutex poisoned");
        leases
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn list(&self, namespace: &str) -> Vec<Lease> {
        let leases = self.leases.lock().expect("lease store mutex poisoned");
        leases
            .values()
            .filter(|l| l.namespace == namespace)
            .cloned()
            .collect()
    }

    /// Full-object replace. `expected_resource_version` is the version named
    /// in the request body, if any; a mismatch with the stored value is a
    /// `Conflict`, never silently applied.
    pub fn update(
        &self,
        namespace: &str,
        name: &str,
        expected_resource_version: Option<u64>,
        holder_identity: Option<String>,
        lease_duration_seconds: Option<i64>,
        acquire_time: Option<DateTime<Utc>>,
        renew_time: Option<DateTime<Utc>>,
    ) -> Result<Lease, UpdateError> {
        let mut leases = self.leases.lock().expect("lease store mutex poisoned");
        let key = (namespace.to_string(), name.to_string());
        let existing = leases.get(&key).cloned().ok_or(UpdateError::NotFound)?;

        if let Some(expected) = expected_resource_version {
            if expected != existing.resource_version {
                return Err(UpdateError::Conflict);
            }
        }

        let holder_changed = existing.holder_identity.is_some()
            && existing.holder_identity != holder_identity;

        let updated = Lease {
            namespace: namespace.to_string(),
            name: name.to_string(),
            holder_identity,
            lease_duration_seconds,
            acquire_time: acquire_time.or(existing.acquire_time),
            renew_time: renew_time.or(Some(Utc::now())),
            lease_transitions: if holder_changed {
                existing.lease_transitions + 1
            } else {
                existing.lease_transitions
            },
            resource_version: self.next_version(),
        };
        leases.insert(key, updated.clone());
        Ok(updated)
    }

    pub fn delete(&self, namespace: &str, name: &str) -> bool {
        let mut leases = self.leases.lock().expect("lease store mutex poisoned");
        leases
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some()
    }
}

impl Default for LeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get_then_delete_then_get() {
        let store = LeaseStore::new();
        store
            .create("demo", "l", Some("a".into()), None, None, None)
            .expect("create should succeed");
        assert!(store.get("demo", "l").is_some());
        assert!(store.delete("demo", "l"));
        assert!(store.get("demo", "l").is_none());
    }

    #[test]
    fn create_collision_is_already_exists() {
        let store = LeaseStore::new();
        store.create("demo", "l", None, None, None, None).unwrap();
        let err = store.create("demo", "l", None, None, None, None).unwrap_err();
        assert!(matches!(err, CreateError::AlreadyExists));
    }

    #[test]
    fn update_bumps_resource_version_and_detects_holder_change() {
        let store = LeaseStore::new();
        let created = store
            .create("demo", "l", Some("a".into()), None, None, None)
            .unwrap();
        let updated = store
            .update(
                "demo",
                "l",
                Some(created.resource_version),
                Some("b".into()),
                None,
                None,
                None,
            )
            .unwrap();
        assert!(updated.resource_version > created.resource_version);
        assert_eq!(updated.lease_transitions, 1);
    }

    #[test]
    fn update_with_stale_resource_version_is_conflict() {
        let store = LeaseStore::new();
        let created = store.create("demo", "l", None, None, None, None).unwrap();
        store
            .update(
                "demo",
                "l",
                Some(created.resource_version),
                Some("a".into()),
                None,
                None,
                None,
            )
            .unwrap();
        let err = store
            .update(
                "demo",
                "l",
                Some(created.resource_version),
                Some("b".into()),
                None,
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, UpdateError::Conflict));
    }

    #[test]
    fn list_scopes_to_namespace() {
        let store = LeaseStore::new();
        store.create("demo", "l1", None, None, None, None).unwrap();
        store.create("other", "l2", None, None, None, None).unwrap();
        assert_eq!(store.list("demo").len(), 1);
        assert_eq!(store.list("other").len(), 1);
        assert_eq!(store.list("unrelated").len(), 0);
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::bridge::RuntimeBridge;
use crate::lease::LeaseStore;
use crate::settings::Settings;

/// Shared state handed to every handler via axum's `State` extractor. Cheap
/// to clone — everything behind it is either `Arc`-shared or immutable.
#[derive(Clone)]
pub struct AppState(Arc<Inner>);

struct Inner {
    settings: Settings,
    leases: LeaseStore,
    bridge: RuntimeBridge,
    start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let bridge_socket = crate::bridge::default_socket_candidates();
        let socket_path = crate::bridge::first_available_socket(&bridge_socket)
            .unwrap_or_else(|| bridge_socket[0].clone());

        Self(Arc::new(Inner {
            settings,
            leases: LeaseStore::new(),
            bridge: RuntimeBridge::new(socket_path),
            start_time: Utc::now(),
        }))
    }

    pub fn settings(&self) -> &Settings {
        &self.0.settings
    }

    pub fn leases(&self) -> &LeaseStore {
        &self.0.leases
    }

    pub fn bridge(&self) -> &RuntimeBridge {
        &self.0.bridge
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.0.start_time
    }

    pub fn compose_path(&self) -> PathBuf {
        PathBuf::from(&self.0.settings.compose)
    }

    /// Loads a fresh snapshot for this request. Re-parsing per request rather
    /// than caching keeps "reflects the file within seconds" trivially true
    /// (spec §3) at the cost of a parse per call, which is cheap for the
    /// compose files this façade is built to read.
    pub fn load_snapshot(&self) -> anyhow::Result<crate::compose::ComposeSnapshot> {
        crate::compose::ComposeSnapshot::load(&self.compose_path())
    }
}

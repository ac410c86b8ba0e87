use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;

use crate::settings::Settings;

/// Whether the façade found a usable cert/key pair at startup. `ca.crt`
/// living alongside `tls.crt`/`tls.key` is for clients to read, not the
/// server (spec §4.7) — it plays no role here.
pub enum Listener {
    Https(RustlsConfig),
    Http,
}

/// Probes `${H2C_SA_DIR}` for `tls.crt`/`tls.key`. Both files must exist to
/// serve HTTPS; either missing falls back to plain HTTP. A pair that exists
/// but fails to parse is a startup error, not a silent fallback — the spec
/// treats "unreadable cert material when both files are present" as a
/// terminating condition (spec §7).
pub async fn resolve(settings: &Settings) -> anyhow::Result<Listener> {
    let cert_path = settings.tls_cert_path();
    let key_path = settings.tls_key_path();

    if !cert_path.is_file() || !key_path.is_file() {
        return Ok(Listener::Http);
    }

    let config = RustlsConfig::from_pem_file(&cert_path, &key_path)
        .await
        .with_context(|| {
            format!(
                "loading TLS material from {} / {}",
                cert_path.display(),
                key_path.display()
            )
        })?;

    Ok(Listener::Https(config))
}

pub async fn serve(
    app: Router,
    addr: SocketAddr,
    listener: Listener,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    match listener {
        Listener::Https(config) => {
            tracing::info!(%addr, "serving HTTPS");
            let handle = Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown.await;
                shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(5)));
            });
            axum_server::bind_rustls(addr, config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server error")?;
        }
        Listener::Http => {
            tracing::info!(%addr, "serving HTTP (no TLS material found)");
            let tcp_listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            axum::serve(tcp_listener, app)
                .with_graceful_shutdown(shutdown)
                .await
                .context("HTTP server error")?;
        }
    }

    Ok(())
}

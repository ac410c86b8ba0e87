mod cert;
mod compose;
mod kubeconfig;
mod probe;
mod sa_bundle;
mod sanitize;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use compose::ComposeGraph;

const FACADE_SERVICE_NAME: &str = "h2c-api";
const FACADE_PORT: u16 = 6443;
const FACADE_IMAGE: &str = "h2c-server:latest";
const SA_BUNDLE_DIRNAME: &str = "h2c-sa-bundle";

/// Host-side injection planner: rewrites a compose file to bootstrap the
/// façade API server (spec §4.8).
#[derive(Parser, Debug)]
#[command(name = "h2c-plan", version)]
struct Cli {
    /// Path to the compose file to transform.
    compose: PathBuf,

    /// Publish the façade port on the host; PORT defaults to 6443 when
    /// omitted. Also triggers emission of a client config file.
    #[arg(long, num_args = 0..=1, default_missing_value = "6443")]
    expose_host_port: Option<u16>,

    /// Extra certificate SAN; repeatable. The first occurrence also names
    /// the server in the emitted client config.
    #[arg(long)]
    host: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let compose_dir = cli
        .compose
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut graph = ComposeGraph::load(&cli.compose)
        .with_context(|| format!("loading compose file {}", cli.compose.display()))?;
    let project_name = graph.project_name(&cli.compose);
    tracing::info!(project = %project_name, "resolved project name");

    let sa_bundle_dir = compose_dir.join(SA_BUNDLE_DIRNAME);
    let reissued = cert::issue_or_reuse(&sa_bundle_dir, &cli.host)
        .context("issuing certificate authority and leaf certificate")?;
    if reissued {
        tracing::info!(dir = %sa_bundle_dir.display(), "issued new certificate bundle");
    } else {
        tracing::info!(dir = %sa_bundle_dir.display(), "reusing existing certificate bundle");
    }

    sa_bundle::write(&sa_bundle_dir, &project_name).context("writing service account bundle")?;

    let bridge_socket = probe_bridge_socket();

    let service_names = graph.service_names();
    for service in &service_names {
        graph
            .inject_service(service, SA_BUNDLE_DIRNAME, FACADE_SERVICE_NAME, FACADE_PORT)
            .with_context(|| format!("injecting façade mount into service '{service}'"))?;
    }

    graph.add_facade_service(
        FACADE_SERVICE_NAME,
        FACADE_IMAGE,
        &format!("./{}", relative_to(&compose_dir, &cli.compose)),
        SA_BUNDLE_DIRNAME,
        FACADE_PORT,
        bridge_socket.as_deref(),
        cli.expose_host_port,
    );

    let override_path = compose_dir.join("compose.override.yml");
    std::fs::write(&override_path, graph.to_yaml_string()?)
        .with_context(|| format!("writing override file {}", override_path.display()))?;
    tracing::info!(path = %override_path.display(), "wrote compose override");

    if let Some(host_port) = cli.expose_host_port {
        let server_host = cli.host.first().map(String::as_str).unwrap_or("localhost");
        let ca_pem = std::fs::read_to_string(sa_bundle_dir.join("ca.crt"))
            .context("reading CA certificate for client config")?;
        let rendered = kubeconfig::render(server_host, host_port, &ca_pem)?;
        let kubeconfig_path = compose_dir.join(format!("kubeconfig-{server_host}.conf"));
        std::fs::write(&kubeconfig_path, rendered)
            .with_context(|| format!("writing client config {}", kubeconfig_path.display()))?;
        tracing::info!(path = %kubeconfig_path.display(), "wrote client config");
    }

    Ok(())
}

fn probe_bridge_socket() -> Option<String> {
    let runtime = tokio::runtime::Runtime::new().expect("failed to start probe runtime");
    runtime.block_on(async {
        probe::first_passing(&probe::candidates())
            .await
            .map(|p| p.display().to_string())
    })
}

fn relative_to(base: &Path, target: &Path) -> String {
    target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| base.display().to_string())
}

//! Resource Watcher
//!
//! Lists and watches one resource kind through the typed Kubernetes client
//! and logs every change. Reconnects from the last seen resource version,
//! relisting when the server reports it as expired.
//!
//! Configuration:
//! - K8S_SERVER, K8S_TOKEN, K8S_REQUEST_TIMEOUT_SECS: API server access
//! - WATCH_KIND: kind or plural to follow (default `pods`)
//! - WATCH_NAMESPACE: namespace to watch (default all namespaces)
//! - LABEL_SELECTOR, FIELD_SELECTOR: `k=v,k2=v2` filters

mod backoff;
mod error;
mod watcher;

use k8s_client::KubeClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use watcher::WatchConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Resource Watcher");

    let config = WatchConfig::from_env()?;
    let client = KubeClient::from_env()?;

    info!("Configuration:");
    info!("  API server: {}", client.base_url());
    info!("  Kind: {:?}", config.kind);
    info!(
        "  Namespace: {}",
        if config.namespace.is_empty() { "all namespaces" } else { config.namespace.as_str() }
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                signal_token.cancel();
            }
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
    });

    watcher::run(client, config, shutdown).await?;
    Ok(())
}

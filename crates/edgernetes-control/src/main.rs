mod args;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;

use edgernetes_common::telemetry::{init_tracing, TelemetryConfig};
use edgernetes_control::api::{self, AppState};
use edgernetes_control::{HeartbeatConfig, HeartbeatMonitor, HttpHealthProbe, StatusHeartbeatPolicy};
use edgernetes_meta::{MetaStore, WalStore};

use crate::args::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let otel_provider = init_tracing(&TelemetryConfig {
        service_name: "edgernetes-control",
        service_version: env!("CARGO_PKG_VERSION"),
        otlp_endpoint: args.otlp_endpoint.as_deref(),
        otlp_token: args.otlp_token.as_deref(),
    });

    let wal = WalStore::open(&args.data_dir).await?;
    tracing::info!(path = %wal.wal_path().display(), "store opened");
    let store: Arc<dyn MetaStore> = Arc::new(wal);

    let status_policy = if args.status_change_refreshes_heartbeat {
        StatusHeartbeatPolicy::RefreshHeartbeat
    } else {
        StatusHeartbeatPolicy::LeaveHeartbeat
    };
    let st = AppState::new(store.clone(), status_policy);

    let probe = HttpHealthProbe::new(Duration::from_secs(args.probe_timeout_secs))?;
    let monitor = HeartbeatMonitor::new(
        st.nodes.clone(),
        st.replicas.clone(),
        Arc::new(probe),
        HeartbeatConfig {
            interval: Duration::from_secs(args.heartbeat_interval_secs),
            offline_after: Duration::from_secs(args.offline_after_secs),
        },
    );
    let monitor_task = tokio::spawn(monitor.run());

    let app = api::router(st);
    let listener = tokio::net::TcpListener::bind(&args.listen_addr).await?;
    tracing::info!(addr = %args.listen_addr, "control plane listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor_task.abort();
    if let Err(e) = store.close().await {
        tracing::error!(error = %e, "failed to close store");
    }
    if let Some(provider) = otel_provider {
        if let Err(e) = provider.shutdown() {
            tracing::error!(error = %e, "failed to flush traces");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

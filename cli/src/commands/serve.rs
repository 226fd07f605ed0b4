// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `serve` command: runs the HTTP service until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Args;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use lighthouse_command_core::application::agent_indexer::{AgentIndexHandle, AgentIndexer};
use lighthouse_command_core::application::repository_factory::create_document_store;
use lighthouse_command_core::domain::config::CommandConfigManifest;
use lighthouse_command_core::domain::repository::StorageBackend;
use lighthouse_command_core::infrastructure::db::Database;
use lighthouse_command_core::metrics::register_metrics;
use lighthouse_command_core::presentation::api::{app, AppState};

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Bind address (overrides spec.server.bind_address)
    #[arg(long, env = "LIGHTHOUSE_HOST")]
    pub host: Option<String>,

    /// HTTP port (overrides spec.server.port)
    #[arg(long, env = "LIGHTHOUSE_PORT")]
    pub port: Option<u16>,
}

pub async fn execute(args: ServeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = CommandConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.spec.server.bind_address = host;
    }
    if let Some(port) = args.port {
        config.spec.server.port = port;
    }
    config.validate().context("Configuration validation failed")?;

    info!(
        name = %config.metadata.name,
        backend = ?config.spec.database.backend,
        update_key_source = ?config.spec.reconciliation.update_key_source,
        "Lighthouse command service starting"
    );

    if let Some(metrics_port) = config.spec.observability.metrics_port {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], metrics_port))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics exposed on port {}", metrics_port);
    }
    register_metrics();

    let backend = config.storage_backend();
    let pool = match &backend {
        StorageBackend::InMemory => {
            warn!("Using the in-memory document store, mirrored objects are lost on restart");
            None
        }
        StorageBackend::PostgreSQL(pg) => {
            let database = Database::new(&pg.connection_string, pg.max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            database.migrate().await.context("Failed to prepare document schema")?;
            Some(database.get_pool().clone())
        }
    };
    let store = create_document_store(&backend, pool)?;

    let (indexer_handle, indexer_task) = if config.spec.indexer.enabled {
        let (handle, indexer) = AgentIndexer::channel(store.clone(), config.spec.indexer.queue_capacity);
        (handle, Some(indexer.start()))
    } else {
        info!("Agent indexer disabled");
        (AgentIndexHandle::disabled(), None)
    };

    let state = AppState::new(store, indexer_handle, config.spec.reconciliation.update_key_source);
    let router = app(state);

    let ip: IpAddr = config
        .spec
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.spec.server.bind_address))?;
    let addr = SocketAddr::new(ip, config.spec.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Lighthouse command service listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped, draining agent indexer");
    if let Some(task) = indexer_task {
        if let Err(e) = task.await {
            error!(error = %e, "Agent indexer task ended abnormally");
        }
    }

    info!("Lighthouse command service shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

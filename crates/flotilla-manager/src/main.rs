mod args;
mod config;
mod handlers;
mod metrics;
mod state;

use std::sync::Arc;

use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};

use flotilla_composer::{ClusterAccess, Composer, KubeClusterClient, RecordingCluster};

use crate::args::Args;
use crate::config::read_config;
use crate::handlers::{create_workers, delete_workers, healthz};
use crate::metrics::{metrics_handler, track_requests};
use crate::state::AppState;

pub(crate) fn build_app(st: AppState) -> Router {
    let worker_routes = Router::new()
        .route("/create-workers", post(create_workers))
        .route("/delete-workers", delete(delete_workers));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/health", get(healthz))
        .route("/metrics", get(metrics_handler))
        .nest("/worker-manager", worker_routes)
        .layer(middleware::from_fn_with_state(st.clone(), track_requests))
        .layer(cors)
        .with_state(st)
}

async fn cluster_access(args: &Args) -> ClusterAccess {
    if args.dry_run {
        tracing::warn!("dry run: objects are recorded in memory only");
        return ClusterAccess::ready(RecordingCluster::new());
    }

    let access = ClusterAccess::from_result(
        KubeClusterClient::acquire(args.kubeconfig.as_deref()).await,
    );
    if let ClusterAccess::Unavailable(reason) = &access {
        tracing::warn!(%reason, "cluster client unavailable; create requests will fail");
    }
    access
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error=%e, "failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _otel_guard = flotilla_common::telemetry::init_tracing(
        "flotilla-manager",
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
    );

    let port = match args.port {
        Some(p) => p,
        None => read_config(&args.config).await?.manager_port,
    };

    let access = cluster_access(&args).await;
    let st = AppState {
        composer: Arc::new(Composer::new(access)),
        metrics: Arc::new(metrics::Metrics::default()),
    };
    let app = build_app(st);

    let addr = format!("{}:{}", args.listen_host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "worker manager listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("worker manager stopped");
    Ok(())
}

mod cors;
mod error;
mod middleware;
mod routes;
mod state;

use archive_content_store::{ContentBackend, ContentStore, DiskBackend, S3Backend};
use archive_ingest::{PipelineContext, Worker};
use archive_models::StorageBackend;
use archive_search::{DbFallbackIndex, ExternalIndex, SearchIndexPort, SearchSync};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = archive_config::settings();
    let db = connect_to_postgres(&settings.database_url).await?;

    let content_store = build_content_store(&settings.storage).await;
    let search_index = build_search_index(db.clone(), &settings.search);

    let notifier = archive_notify::Notifier::new(
        settings.notify.callback_url.clone(),
        settings.notify.notify_enabled,
        Duration::from_secs(10),
    );
    let token_signer = archive_tokens::ActionTokenSigner::new(settings.notify.action_secret.clone().into_bytes());

    let (storage_backend, storage_bucket) = match &settings.storage {
        archive_config::StorageSettings::Disk { .. } => (StorageBackend::Disk, None),
        archive_config::StorageSettings::ObjectStore { bucket, .. } => (StorageBackend::ObjectStore, Some(bucket.clone())),
    };

    let pipeline = Arc::new(PipelineContext {
        db: db.clone(),
        content_store,
        storage_backend,
        storage_bucket,
        notifier,
        search: SearchSync::new(search_index),
        token_signer,
        action_base_url: format!("http://{}", settings.bind_address),
        action_ttl_seconds: settings.notify.action_ttl_seconds,
        dashboard_base_url: format!("http://{}", settings.bind_address),
        retry_base_seconds: settings.ingest.retry_base_seconds as i64,
        retry_max_seconds: settings.ingest.retry_max_seconds as i64,
    });

    let worker = Worker::new(Arc::clone(&pipeline), 8, Duration::from_secs(2), 50);
    let worker_handle = tokio::spawn(worker.serve(shutdown_signal()));

    let state = AppState {
        db: db.clone(),
        pipeline,
        read_only_mode: settings.runtime.read_only_mode,
    };

    let app = routes::router(state.clone())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors::cors_layer(&settings.runtime.cors_allow_origins)),
        )
        .layer(axum::middleware::from_fn_with_state(state, middleware::reject_when_read_only));

    tracing::info!(address = %settings.bind_address, "archive-api listening");
    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    worker_handle.await.ok();
    Ok(())
}

async fn connect_to_postgres(database_url: &str) -> anyhow::Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new().min_connections(1).max_connections(10).connect(database_url).await?;
    Ok(pool)
}

async fn build_content_store(storage: &archive_config::StorageSettings) -> ContentStore {
    let backend: Arc<dyn ContentBackend> = match storage {
        archive_config::StorageSettings::Disk { disk_root } => Arc::new(DiskBackend::new(disk_root)),
        archive_config::StorageSettings::ObjectStore { bucket, .. } => Arc::new(S3Backend::from_env(bucket.clone()).await),
    };
    ContentStore::new(backend)
}

fn build_search_index(db: sqlx::PgPool, search: &archive_config::SearchSettings) -> Arc<dyn SearchIndexPort> {
    match search {
        archive_config::SearchSettings::Db => Arc::new(DbFallbackIndex::new(db)),
        archive_config::SearchSettings::External {
            url,
            api_key,
            index_name,
            timeout_seconds,
        } => Arc::new(ExternalIndex::new(url.clone(), index_name.clone(), api_key.clone(), Duration::from_secs_f64(*timeout_seconds))),
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
}

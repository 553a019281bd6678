use marketplace_gateway::{
    AppState,
    config::{AppConfig, Env, UploadBackend},
    create_router,
    repository::{InMemoryProfileRepository, PostgresProfileRepository, RepositoryState},
    storage::{ImageHostClient, S3UploadClient, UploadState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketplace_gateway=debug,tower_http=info,axum=trace".into());

    // Pretty logs locally, JSON for the log aggregator in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    let repo = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            Arc::new(PostgresProfileRepository::new(pool)) as RepositoryState
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory profile store");
            Arc::new(InMemoryProfileRepository::new()) as RepositoryState
        }
    };

    let upload = &config.upload;
    let uploads = match upload.backend {
        UploadBackend::ImageHost => {
            Arc::new(ImageHostClient::new(&upload.image_host_url, &upload.image_host_cloud))
                as UploadState
        }
        UploadBackend::S3 => {
            let client = S3UploadClient::new(
                &upload.s3_endpoint,
                &upload.s3_region,
                &upload.s3_key,
                &upload.s3_secret,
                &upload.s3_bucket,
            )
            .await;
            if config.env == Env::Local {
                client.ensure_bucket_exists().await;
            }
            Arc::new(client) as UploadState
        }
    };

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        uploads,
        config,
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {:?}", e);
    }
}

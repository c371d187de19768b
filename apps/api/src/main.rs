mod attachments;
mod auth;
mod config;
mod crypto;
mod db;
mod errors;
mod jobs;
mod profile;
mod public;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::attachments::{AttachmentPolicy, AttachmentService, S3ObjectStore};
use crate::auth::credentials::PgCredentialStore;
use crate::auth::flags::RedisFlagStore;
use crate::auth::session::{SessionManager, SessionSettings};
use crate::config::Config;
use crate::crypto::CryptoHelper;
use crate::db::create_pool;
use crate::jobs::PgMaintenanceRepository;
use crate::profile::repository::{PgProfileRepository, ProfileRepository};
use crate::profile::ProfileStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; a missing variable or weak key aborts startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL: profile document, credentials, history, keep-alive
    let db = create_pool(&config.database_url).await?;

    // Redis: session flags and preferences
    let redis = redis::Client::open(config.redis_url.clone())?;
    let flags = RedisFlagStore::connect(&redis).await?;
    info!("Redis flag store connected");

    // S3 / MinIO: attachments
    let s3 = build_s3_client(&config).await;
    let object_store = S3ObjectStore::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_public_url.clone(),
    );
    info!("S3 client initialized");

    let crypto = Arc::new(CryptoHelper::new(&config.encryption_key));
    let sessions = SessionManager::new(
        Arc::new(PgCredentialStore::new(
            db.clone(),
            config.credential_allowlist.clone(),
        )),
        Arc::new(flags),
        crypto,
        SessionSettings::from_config(&config),
    );
    if config.demo_login_enabled {
        info!("Demo login is enabled");
    }

    let profile_repo: Arc<dyn ProfileRepository> = Arc::new(PgProfileRepository::new(db.clone()));
    let profile = ProfileStore::spawn(profile_repo.clone(), config.autosave_debounce);
    profile.load().await?;
    info!(
        "Profile loaded, auto-save debounce {}ms",
        config.autosave_debounce.as_millis()
    );

    // Scheduled maintenance
    let maintenance = Arc::new(PgMaintenanceRepository::new(db.clone()));
    tokio::spawn(jobs::run_keep_alive(
        maintenance.clone(),
        config.keepalive_interval,
    ));
    tokio::spawn(jobs::run_backup(
        profile_repo.clone(),
        maintenance,
        config.backup_interval,
    ));

    let state = AppState {
        sessions: Arc::new(sessions),
        profile: profile.clone(),
        attachments: AttachmentService::new(
            Arc::new(object_store),
            AttachmentPolicy {
                max_bytes: config.attachment_max_bytes,
            },
        ),
        public_repo: profile_repo,
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Nothing typed before shutdown may be lost
    if profile.is_dirty().await {
        match profile.flush().await {
            Ok(()) => info!("Pending profile edits flushed"),
            Err(e) => error!("Final profile flush failed: {e}"),
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "cv-api-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::from_conf(
        aws_sdk_s3::config::Builder::from(&s3_config)
            .force_path_style(true)
            .build(),
    )
}

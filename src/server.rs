//! Reusable places service runtime.
//!
//! Provides [`ServerHandle`] that encapsulates the full server lifecycle:
//! database init, migrations, adapter wiring, REST API, metrics, and
//! graceful shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::application::{AddressResolver, ImageStore, PlaceWorkflow, UserService};
use crate::config::{AppConfig, StorageBackend};
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::{
    init_database, run_migrations, DatabaseConfig, GoogleGeocoder, GoogleGeocoderConfig,
    LocalImageStore, S3ImageStore, S3ImageStoreConfig, SeaOrmRepositoryProvider,
};
use crate::interfaces::http::{create_api_router, RouterOptions};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the places service.
pub struct ServerOptions {
    /// Application configuration.
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running places service.
///
/// # Examples
///
/// ```rust,no_run
/// use places_service::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// Repository provider for data access.
    pub repos: Arc<dyn RepositoryProvider>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the REST API is bound to.
    pub local_addr: SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Start the service with the given options.
    ///
    /// This will:
    /// 1. Install the Prometheus metrics recorder
    /// 2. Connect to the database and run migrations
    /// 3. Build the geocoder and the image store from config
    /// 4. Start the REST API server (with Swagger UI)
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting places service...");

        let prometheus_handle = prometheus_handle()?;

        // ── Database ───────────────────────────────────────────
        let db_config = DatabaseConfig {
            url: app_cfg.database.connection_url(),
            max_connections: app_cfg.database.max_connections,
            connect_timeout: Duration::from_secs(app_cfg.timeouts.database_secs),
        };
        let db = init_database(&db_config).await?;

        if opts.auto_migrate {
            run_migrations(&db).await?;
        }

        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

        // ── External services ──────────────────────────────────
        let timeouts = app_cfg.timeouts.call_timeouts();

        if app_cfg.geocoding.api_key.is_empty() {
            warn!("geocoding.api_key is empty, address lookups will be rejected");
        }
        let resolver: Arc<dyn AddressResolver> = Arc::new(GoogleGeocoder::new(GoogleGeocoderConfig {
            base_url: app_cfg.geocoding.base_url.clone(),
            api_key: app_cfg.geocoding.api_key.clone(),
            request_timeout: timeouts.geocoder,
        }));

        let (images, local_images_dir) = build_image_store(&app_cfg).await?;

        // ── Application services ───────────────────────────────
        if app_cfg.security.uses_dev_secret() {
            warn!("security.jwt_secret is the built-in development secret; set JWT_KEY before exposing this service");
        }
        let jwt_config = JwtConfig {
            secret: app_cfg.security.jwt_secret.clone(),
            expiration_hours: app_cfg.security.jwt_expiration_hours,
            ..JwtConfig::default()
        };
        info!(
            "JWT configured with {}h token expiration",
            jwt_config.expiration_hours
        );

        let workflow = Arc::new(PlaceWorkflow::new(
            repos.clone(),
            resolver,
            images.clone(),
            timeouts,
        ));
        let user_service = Arc::new(UserService::new(
            repos.clone(),
            images,
            jwt_config,
            app_cfg.security.bcrypt_cost,
            timeouts,
        ));

        // ── REST API server ────────────────────────────────────
        let api_router = create_api_router(
            workflow,
            user_service,
            repos.clone(),
            prometheus_handle,
            RouterOptions {
                cors_origins: app_cfg.server.cors_origins.clone(),
                max_upload_bytes: app_cfg.server.max_upload_bytes,
                local_images_dir,
            },
        );

        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let api_shutdown = shutdown.signal();

        let listener = tokio::net::TcpListener::bind(app_cfg.server.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_server = axum::serve(
            listener,
            api_router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            repos,
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown to be triggered, then for in-flight requests to
    /// drain within `server.shutdown_timeout`.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            mut api_task,
            ..
        } = self;

        let task = &mut api_task;
        let drained = shutdown
            .shutdown_with_cleanup(move || async move {
                if let Err(e) = task.await {
                    error!("REST API server task panicked: {}", e);
                }
            })
            .await;
        if !drained {
            api_task.abort();
        }

        if let Err(e) = db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("Database connection closed");
        }

        info!("Places service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("Shutting down places service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    /// Check if the server is still running.
    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can only be installed once per process, so a
/// restart within the same process reuses it.
fn prometheus_handle() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("Prometheus metrics recorder installed");
    Ok(PROM_HANDLE.get_or_init(|| handle).clone())
}

async fn build_image_store(
    app_cfg: &AppConfig,
) -> Result<(Arc<dyn ImageStore>, Option<PathBuf>), Box<dyn std::error::Error>> {
    let storage = &app_cfg.storage;
    match storage.backend {
        StorageBackend::S3 => {
            let store = S3ImageStore::connect(S3ImageStoreConfig {
                bucket: storage.bucket.clone(),
                region: storage.region.clone(),
                access_key_id: storage.access_key_id.clone(),
                secret_access_key: storage.secret_access_key.clone(),
                endpoint: storage.endpoint.clone(),
                public_base_url: storage.public_base_url.clone(),
                key_prefix: storage.key_prefix.clone(),
            })
            .await;
            Ok((Arc::new(store), None))
        }
        StorageBackend::Local => {
            let dir = PathBuf::from(&storage.local_dir);
            tokio::fs::create_dir_all(&dir).await?;
            let public_base = storage
                .public_base_url
                .clone()
                .unwrap_or_else(|| format!("{}/uploads/images", app_cfg.server.base_url()));
            let store = LocalImageStore::new(dir, public_base);
            let served = store.dir().to_path_buf();
            info!(dir = %served.display(), "Storing images on local disk");
            Ok((Arc::new(store), Some(served)))
        }
    }
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

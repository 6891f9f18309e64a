pub mod api;
pub mod auth;
pub mod cache;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod logging;
pub mod password;

use api::{AppState, create_api_router, health};
use auth::{Authenticator, require_auth};
use axum::{Router, middleware, routing::get};
use cache::RevocationCache;
use db::Database;
use jwt::{Clock, JwtConfig, RefreshTokenStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

/// Routes reachable without a valid access token.
pub const DEFAULT_EXEMPT_ROUTES: &[&str] = &[
    "GET /health",
    "POST /v1/register",
    "POST /v1/login",
    "POST /v1/refresh",
    "POST /v1/logout",
];

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Backend tracking outstanding refresh tokens
    pub cache: Arc<dyn RevocationCache>,
    /// Value of the `iss` claim
    pub issuer: String,
    /// HMAC secret for signing tokens
    pub jwt_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Clock skew tolerated when checking `exp` and `iat`
    pub leeway: Duration,
    /// Upper bound on a single cache call
    pub cache_timeout: Duration,
    /// `"METHOD /path"` entries that skip authentication
    pub exempt_routes: Vec<String>,
    pub bcrypt_cost: u32,
    pub clock: Arc<dyn Clock>,
}

impl ServerConfig {
    /// Configuration with default TTLs and exempt routes.
    pub fn new(db: Database, cache: Arc<dyn RevocationCache>, jwt_secret: Vec<u8>) -> Self {
        Self {
            db,
            cache,
            issuer: "tokenward".to_string(),
            jwt_secret,
            access_ttl: jwt::DEFAULT_ACCESS_TOKEN_TTL,
            refresh_ttl: jwt::DEFAULT_REFRESH_TOKEN_TTL,
            leeway: Duration::ZERO,
            cache_timeout: jwt::DEFAULT_CACHE_TIMEOUT,
            exempt_routes: DEFAULT_EXEMPT_ROUTES.iter().map(|r| r.to_string()).collect(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            clock: Arc::new(SystemClock),
        }
    }

    fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(self.issuer.clone(), &self.jwt_secret)
            .with_ttls(self.access_ttl, self.refresh_ttl)
            .with_leeway(self.leeway)
            .with_clock(self.clock.clone())
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = config.jwt_config();
    let verifier = Arc::new(jwt.verifier());

    let state = AppState {
        db: config.db.clone(),
        issuer: Arc::new(jwt.issuer()),
        verifier: verifier.clone(),
        refresh_tokens: RefreshTokenStore::new(config.cache.clone(), jwt.refresh_ttl())
            .with_timeout(config.cache_timeout),
        bcrypt_cost: config.bcrypt_cost,
    };

    let authenticator = Arc::new(Authenticator::new(
        verifier,
        config.exempt_routes.iter().cloned(),
    ));

    create_router(state, authenticator)
}

/// Assemble the full router from prepared parts.
///
/// Authentication wraps the outer router so it sees full request paths,
/// unknown routes included.
pub fn create_router(state: AppState, authenticator: Arc<Authenticator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/v1", create_api_router(state))
        .layer(middleware::from_fn_with_state(authenticator, require_auth))
        .layer(middleware::from_fn(logging::log_requests))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(cache: &Arc<dyn RevocationCache>) {
    cleanup::run_cleanup(cache.as_ref()).await;
    cleanup::spawn_cleanup_scheduler(cache.clone());
}

/// Run the server on the given listener until Ctrl+C or SIGTERM.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, std::net::SocketAddr), std::io::Error> {
    init_cleanup(&config.cache).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let app = create_app(&config);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok((handle, local_addr))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

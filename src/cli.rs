//! CLI argument parsing, validation, and startup helpers.

use crate::cache::{MemoryCache, RevocationCache};
use crate::db::Database;
use crate::logging::LogFormat;
use crate::password::MIN_BCRYPT_COST;
use crate::{DEFAULT_EXEMPT_ROUTES, ServerConfig};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Longest accepted token lifetime: 10 years.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Largest accepted clock skew: 1 hour.
const MAX_LEEWAY_SECS: u64 = 60 * 60;

/// Where outstanding refresh tokens are kept.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheBackend {
    /// Process memory; a restart invalidates every refresh token
    Memory,
    /// The SQLite database
    #[default]
    Sqlite,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "tokenward", about = "Bearer token authentication service")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "TOKENWARD_PORT", default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "TOKENWARD_DATABASE", default_value = "tokenward.db")]
    pub database: String,

    /// Value of the `iss` claim in issued tokens
    #[arg(long, env = "TOKENWARD_ISSUER", default_value = "tokenward")]
    pub issuer: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "TOKENWARD_ACCESS_TTL", default_value = "900",
        value_parser = clap::value_parser!(u64).range(..=MAX_TTL_SECS))]
    pub access_ttl: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "TOKENWARD_REFRESH_TTL", default_value = "1209600",
        value_parser = clap::value_parser!(u64).range(..=MAX_TTL_SECS))]
    pub refresh_ttl: u64,

    /// Tolerated clock skew in seconds
    #[arg(long, env = "TOKENWARD_LEEWAY", default_value = "0",
        value_parser = clap::value_parser!(u64).range(..=MAX_LEEWAY_SECS))]
    pub leeway: u64,

    /// Timeout for a single refresh token cache call, in milliseconds
    #[arg(long, env = "TOKENWARD_CACHE_TIMEOUT_MS", default_value = "1000")]
    pub cache_timeout_ms: u64,

    /// Route that skips authentication, as "METHOD /path". Repeatable
    #[arg(long = "exempt-route", env = "EXEMPT_ROUTES", value_delimiter = ',',
        value_parser = validate_exempt_route)]
    pub exempt_routes: Vec<String>,

    /// Refresh token cache backend
    #[arg(long, env = "TOKENWARD_CACHE", default_value = "sqlite")]
    pub cache: CacheBackend,

    /// bcrypt work factor for password hashes
    #[arg(long, env = "TOKENWARD_BCRYPT_COST", default_value = "12",
        value_parser = clap::value_parser!(u32).range(MIN_BCRYPT_COST as i64..=31))]
    pub bcrypt_cost: u32,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Accept `"METHOD /path"` with an upper-case method.
fn validate_exempt_route(s: &str) -> Result<String, String> {
    let s = s.trim();
    let Some((method, path)) = s.split_once(' ') else {
        return Err(format!("Exempt route must look like 'METHOD /path': {}", s));
    };

    if method.is_empty() || !method.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(format!("Exempt route method must be upper case: {}", s));
    }

    if !path.starts_with('/') {
        return Err(format!("Exempt route path must start with '/': {}", s));
    }

    if path.chars().any(|c| !c.is_ascii() || c.is_whitespace()) {
        return Err(format!("Exempt route path contains invalid characters: {}", s));
    }

    Ok(s.to_string())
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Keep the secret out of child processes and /proc/<pid>/environ.
        // SAFETY: called from main before the runtime spawns other threads
        // that read the environment.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!("JWT secret is required. Set JWT_SECRET or use --jwt-secret-file");
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            min_length = MIN_JWT_SECRET_LENGTH,
            "JWT secret is too short"
        );
        return None;
    }

    Some(secret)
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    let cache: Arc<dyn RevocationCache> = match args.cache {
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::Sqlite => Arc::new(db.revocations()),
    };

    let exempt_routes = if args.exempt_routes.is_empty() {
        DEFAULT_EXEMPT_ROUTES.iter().map(|r| r.to_string()).collect()
    } else {
        args.exempt_routes.clone()
    };

    ServerConfig {
        issuer: args.issuer.clone(),
        access_ttl: Duration::from_secs(args.access_ttl),
        refresh_ttl: Duration::from_secs(args.refresh_ttl),
        leeway: Duration::from_secs(args.leeway),
        cache_timeout: Duration::from_millis(args.cache_timeout_ms),
        exempt_routes,
        bcrypt_cost: args.bcrypt_cost,
        ..ServerConfig::new(db, cache, jwt_secret.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_exempt_route() {
        assert_eq!(
            validate_exempt_route("GET /health").unwrap(),
            "GET /health"
        );
        assert_eq!(
            validate_exempt_route("  POST /v1/login ").unwrap(),
            "POST /v1/login"
        );
        assert!(validate_exempt_route("/health").is_err());
        assert!(validate_exempt_route("get /health").is_err());
        assert!(validate_exempt_route("GET health").is_err());
        assert!(validate_exempt_route("GET /he alth").is_err());
        assert!(validate_exempt_route(" /health").is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["tokenward"]).unwrap();
        assert_eq!(args.port, 7291);
        assert_eq!(args.issuer, "tokenward");
        assert_eq!(args.access_ttl, 900);
        assert_eq!(args.refresh_ttl, 1_209_600);
        assert_eq!(args.cache, CacheBackend::Sqlite);
        assert_eq!(args.bcrypt_cost, 12);
    }

    #[test]
    fn test_exempt_routes_repeatable() {
        let args = Args::try_parse_from([
            "tokenward",
            "--exempt-route",
            "GET /health",
            "--exempt-route",
            "POST /v1/login,POST /v1/refresh",
        ])
        .unwrap();
        assert_eq!(
            args.exempt_routes,
            vec!["GET /health", "POST /v1/login", "POST /v1/refresh"]
        );
    }

    #[test]
    fn test_bcrypt_cost_range() {
        assert!(Args::try_parse_from(["tokenward", "--bcrypt-cost", "3"]).is_err());
        assert!(Args::try_parse_from(["tokenward", "--bcrypt-cost", "32"]).is_err());
        assert!(Args::try_parse_from(["tokenward", "--bcrypt-cost", "4"]).is_ok());
    }

    #[test]
    fn test_ttl_and_leeway_ranges() {
        let max_ttl = MAX_TTL_SECS.to_string();
        let too_long = (MAX_TTL_SECS + 1).to_string();
        let huge = u64::MAX.to_string();

        for flag in ["--access-ttl", "--refresh-ttl"] {
            assert!(Args::try_parse_from(["tokenward", flag, "0"]).is_ok());
            assert!(Args::try_parse_from(["tokenward", flag, max_ttl.as_str()]).is_ok());
            assert!(Args::try_parse_from(["tokenward", flag, too_long.as_str()]).is_err());
            assert!(Args::try_parse_from(["tokenward", flag, huge.as_str()]).is_err());
        }

        assert!(Args::try_parse_from(["tokenward", "--leeway", "3600"]).is_ok());
        assert!(Args::try_parse_from(["tokenward", "--leeway", "3601"]).is_err());
    }

    #[tokio::test]
    async fn test_build_config() {
        let args = Args::try_parse_from([
            "tokenward",
            "--issuer",
            "auth.example",
            "--leeway",
            "5",
            "--cache",
            "memory",
        ])
        .unwrap();
        let db = Database::open(":memory:").await.unwrap();
        let config = build_config(&args, db, "x".repeat(32));

        assert_eq!(config.issuer, "auth.example");
        assert_eq!(config.leeway, Duration::from_secs(5));
        assert_eq!(config.access_ttl, Duration::from_secs(900));
        assert_eq!(config.cache_timeout, Duration::from_millis(1000));
        assert_eq!(config.jwt_secret, "x".repeat(32).into_bytes());
        assert_eq!(config.exempt_routes.len(), DEFAULT_EXEMPT_ROUTES.len());
    }
}

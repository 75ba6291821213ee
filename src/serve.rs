use super::config::AppConfig;
use super::db::{self, Db};
pub use super::error::Error;
use anyhow::Context as _;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::get,
    Router,
};
use clap::Parser;
use clap_verbosity_flag::{log::LevelFilter, InfoLevel, Verbosity};
use figment::{providers::Format as _, Figment};
use rand::Rng;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

/// The application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug, Clone)]
/// Command line arguments.
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "default.toml")]
    pub config: PathBuf,
    /// The verbosity level.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

#[derive(Clone, FromRef)]
/// The application state, shared across all routes.
pub struct AppState {
    /// The application configuration.
    pub config: AppConfig,
    /// The database connection pool.
    pub db: Db,
}

/// Assemble the router. Shared between `run` and the test harness.
pub(crate) fn app(state: AppState) -> Router {
    let blob_dir = state.config.blob.path.clone();
    // Leave headroom above the blob limit for multipart framing.
    let body_limit = state.config.blob.limit as usize + (1 << 20);

    Router::new()
        .route("/", get(super::index))
        .merge(super::endpoints::routes())
        .nest_service("/blobs", ServeDir::new(blob_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The main application entry point.
pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up trace logging to console and account for the user-provided verbosity flag.
    if args.verbosity.log_level_filter() != LevelFilter::Off {
        let lvl = match args.verbosity.log_level_filter() {
            LevelFilter::Error => tracing::Level::ERROR,
            LevelFilter::Warn => tracing::Level::WARN,
            LevelFilter::Info | LevelFilter::Off => tracing::Level::INFO,
            LevelFilter::Debug => tracing::Level::DEBUG,
            LevelFilter::Trace => tracing::Level::TRACE,
        };
        tracing_subscriber::fmt().with_max_level(lvl).init();
    }

    if !args.config.exists() {
        // Throw up a warning if the config file does not exist.
        //
        // This is not fatal because users can specify all configuration settings via
        // the environment, but the most likely scenario here is that a user accidentally
        // omitted the config file for some reason (e.g. forgot to mount it into Docker).
        warn!(
            "configuration file {} does not exist",
            args.config.display()
        );
    }

    // Read and parse the user-provided configuration.
    let config: AppConfig = Figment::new()
        .admerge(figment::providers::Toml::file(args.config))
        .admerge(figment::providers::Env::prefixed("ADSPACE_"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize metrics reporting.
    super::metrics::setup(config.metrics.as_ref()).context("failed to set up metrics exporter")?;

    tokio::fs::create_dir_all(&config.blob.path)
        .await
        .context("failed to create blob directory")?;
    if let Some(db_path) = config.db.strip_prefix("sqlite://") {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("failed to create database directory")?;
        }
    }

    let pool = db::connect(&config.db)
        .await
        .context("failed to establish database connection pool")?;

    bootstrap_admin(&pool)
        .await
        .context("failed to bootstrap admin account")?;

    let addr = config
        .listen_address
        .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000));

    let app = app(AppState {
        config: config.clone(),
        db: pool.clone(),
    });

    info!("listening on {addr}");
    info!("connect to: http://127.0.0.1:{}", addr.port());

    let listener = TcpListener::bind(&addr)
        .await
        .context("failed to bind address")?;

    axum::serve(listener, app.into_make_service())
        .await
        .context("failed to serve app")
}

/// Determine whether or not this was the first startup (i.e. no users exist).
/// If so, create an admin account and share its credentials via the console.
async fn bootstrap_admin(db: &Db) -> anyhow::Result<()> {
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
        .context("failed to count users")?;

    if users != 0 {
        return Ok(());
    }

    let email = "admin@adspace.local";
    let password: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();

    let id = Uuid::new_v4().to_string();
    let hash = super::auth::hash_password(&password)?;
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password, name, role, created_at)
            VALUES (?, ?, ?, 'Administrator', 'admin', ?)
        "#,
    )
    .bind(&id)
    .bind(email)
    .bind(&hash)
    .bind(chrono::Utc::now())
    .execute(db)
    .await
    .context("failed to create admin account")?;

    // N.B: This is a sensitive message, so we're bypassing `tracing` here and
    // logging it directly to console.
    println!("=====================================");
    println!("            FIRST STARTUP            ");
    println!("=====================================");
    println!("Log in as the moderation admin with:");
    println!("  email:    {email}");
    println!("  password: {password}");
    println!("=====================================");

    Ok(())
}

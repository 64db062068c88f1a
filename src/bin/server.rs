use std::{
    env::{self},
    error::Error,
    fs::OpenOptions,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use carteira_rs::{
    AppState, AuthEvent, AuthStateObserver, CacheInvalidationObserver, build_router,
    cache::CachePolicy, get_local_offset, graceful_shutdown, logging_middleware, spawn_observer,
};

/// The REST API server for carteira_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DB_PATH")]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// The canonical name of the timezone used for dates, e.g. "America/Sao_Paulo".
    #[arg(long, env = "LOCAL_TIMEZONE", default_value = "America/Sao_Paulo")]
    timezone: String,

    /// How long a user's transactions stay cached, in seconds.
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 60)]
    cache_ttl_secs: u64,

    /// Also write debug logs to this file.
    #[arg(long, env = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    setup_logging(args.log_file.as_ref())?;

    if get_local_offset(&args.timezone).is_none() {
        return Err(format!("\"{}\" is not a valid canonical timezone", args.timezone).into());
    }

    let secret = env::var("SECRET").map_err(|_| "The environment variable 'SECRET' must be set")?;

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let conn = Connection::open(&args.db_path)?;
    let app_state = AppState::new(
        conn,
        &secret,
        &args.timezone,
        CachePolicy::with_ttl(Duration::from_secs(args.cache_ttl_secs)),
    )?;

    spawn_observer(
        &app_state.auth_events,
        CacheInvalidationObserver::new(app_state.transaction_cache.clone()),
    );
    spawn_observer(&app_state.auth_events, AuthEventLogger);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(app_state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

/// Writes every auth event to the log.
struct AuthEventLogger;

impl AuthStateObserver for AuthEventLogger {
    fn on_auth_event(&mut self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(user_id) => tracing::info!("user {user_id} signed in"),
            AuthEvent::SignedOut(user_id) => tracing::info!("user {user_id} signed out"),
            AuthEvent::SessionExpired(user_id) => {
                tracing::info!("session for user {user_id} expired")
            }
        }
    }
}

fn setup_logging(log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_log = tracing_subscriber::fmt::layer().pretty().with_filter(env_filter);

    let debug_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(filter::LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged where they are rendered.
        .on_failure(());

    router.layer(tracing_layer)
}

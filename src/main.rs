//! # Animal Translator Backend - Main Application Entry Point
//!
//! This is the main entry point for the animal-translator-backend web server.
//! It sets up an Actix-web HTTP server that "translates" animal sounds into
//! humorous responses.
//!
//! ## Key Rust Concepts Used:
//! - **async/await**: The entire application is asynchronous, so simulated
//!   processing delays never block other requests
//! - **modules**: Code is organized into separate modules (mod statements)
//! - **Result<T, E>**: Error handling using Rust's Result type
//! - **Arc**: Thread-safe shared ownership of the pipeline and limiters
//! - **static**: Global variables that live for the entire program duration
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML file + environment variables)
//! - **state**: Wires the components together and shares them with handlers
//! - **audio**: Payload decoding, validation and multipart reading
//! - **classification**: Labels, random sources and the classifier
//! - **catalog**: Pre-authored response variants per label
//! - **rate_limit**: Fixed-window admission control
//! - **translation**: The request pipeline and result assembly
//! - **middleware**: Per-scope rate limiting
//! - **handlers**: HTTP request handlers for API endpoints
//! - **error**: Error types and their HTTP responses

// Module declarations - These tell Rust about our other source files
mod audio;          // Ingress decoding and validation (audio/ directory)
mod catalog;        // Response variants (catalog/ directory)
mod classification; // Labels and classifiers (classification/ directory)
mod config;         // Configuration management (config.rs)
mod error;          // Error handling types (error.rs)
mod handlers;       // HTTP request handlers (handlers/ directory)
mod health;         // Health check endpoint (health.rs)
mod middleware;     // Custom middleware (middleware/ directory)
mod rate_limit;     // Admission control (rate_limit/ directory)
mod state;          // Application state management (state.rs)
mod translation;    // Translation pipeline (translation/ directory)

// External crate imports - These are dependencies from Cargo.toml
use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use crate::state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown signal that can be accessed from anywhere in the program.
/// AtomicBool is thread-safe, meaning multiple threads can safely read/write to it.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Sets up logging** for debugging and monitoring
/// 2. **Loads configuration** from files and environment variables
/// 3. **Builds the application state**, refusing to start on an incomplete catalog
/// 4. **Configures the HTTP server** with CORS, request tracing, rate limiting and routes
/// 5. **Purges stale rate limit windows** in the background
/// 6. **Handles graceful shutdown** when receiving system signals
#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting animal-translator-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    let allowed_origins = config.allowed_origins();
    info!("CORS allowed origins: {:?}", allowed_origins);

    // A broken catalog is fatal: better to fail here than to answer 500s later
    let app_state = AppState::new(config.clone())?;
    info!(
        "Response catalog loaded: {} variants",
        app_state.catalog.stats().total_variants
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();
    spawn_rate_limit_purge(app_state.clone(), app_state.purge_interval());

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors_config = app_state.config.cors.clone();
        let mut cors = Cors::default()
            .allowed_origin_fn(move |origin, _req| {
                origin
                    .to_str()
                    .map(|origin| cors_config.matches_suffix(origin))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .supports_credentials()
            .max_age(3600);
        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        let general_limiter = app_state.general_limiter.clone();
        let trust_forwarded_for = app_state.config.rate_limit.trust_forwarded_for;

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .service(
                web::scope("/api")
                    .wrap(middleware::RateLimit::new(general_limiter, trust_forwarded_for))
                    .configure(handlers::configure_api),
            )
            // Also provide health check at root level for load balancers
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system for the application.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "animal_translator_backend=trace")
/// - If not set, defaults to "animal_translator_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "animal_translator_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Periodically forget callers whose window has fully elapsed, so the
/// counter maps don't grow with every address ever seen.
fn spawn_rate_limit_purge(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match state.purge_rate_limits().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "Purged expired rate limit windows"),
                Err(e) => warn!(error = %e, "Failed to purge rate limit windows"),
            }
        }
    });
}

/// Set up signal handlers for graceful shutdown.
///
/// ## What this does:
/// - Listens for SIGTERM (termination signal from system)
/// - Listens for SIGINT (interrupt signal, usually Ctrl+C)
/// - When either signal is received, sets the global shutdown flag
fn setup_signal_handlers() {
    tokio::spawn(async {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers: {}", e);
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Wait for the shutdown signal to be set, checking every 100ms.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

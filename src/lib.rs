//! Backend for a child-counseling clinic: client self-service
//! (registration, login, case-history intake) and an admin surface
//! (client directory, form review/editing, counter-signing).
//!
//! All persistence lives in a hosted table store reached over REST; the
//! handlers here are a stateless translation layer between the HTTP
//! surface and that store, one store call per logical step.
//!
//! # Infrastructure
//! - Every route lives under `/api`, JSON in and out
//! - Requests share one [`state::AppState`] holding config and the store
//!   client; no other state survives between requests
//! - With `STATIC_DIR` set, the prebuilt front-end bundle is served with
//!   an SPA fallback; unset, the dev asset pipeline runs separately and
//!   this process is API-only
//!
//! # Setup
//!
//! Required environment (a `.env` file is honored):
//! ```sh
//! STORE_URL=...          # table store endpoint (default localhost)
//! STORE_SERVICE_KEY=...  # store access key, no baked-in fallback
//! SEED_ADMIN_USER=...    # bootstrap admin credential pair
//! SEED_ADMIN_PASS=...
//! ```
use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

use routes::{
    admin_client_handler, admin_clients_handler, admin_login_handler, admin_sign_handler,
    admin_update_handler, client_login_handler, health_handler, intake_submit_handler,
};
use state::AppState;

pub async fn start_server() {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new();

    info!("Seeding admin account...");
    auth::seed_admin(&state).await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/admin/login", post(admin_login_handler))
        .route("/client/login", post(client_login_handler))
        .route("/intake/submit", post(intake_submit_handler))
        .route("/admin/clients", get(admin_clients_handler))
        .route("/admin/client/{client_id}", get(admin_client_handler))
        .route("/admin/intake/update", post(admin_update_handler))
        .route("/admin/sign", post(admin_sign_handler));

    let mut app = Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Production mode: serve the prebuilt bundle, falling back to the SPA
    // entry point for client-side routes.
    if let Some(dir) = &state.config.static_dir {
        info!("Serving static assets from {dir}");
        let index = ServeFile::new(format!("{dir}/index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutdown requested");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! Campus Portal API - University Administration Backend
//!
//! A unified REST backend for the university administration portal:
//! appointments, announcements, courses and enrollments, hostels and
//! rooms, the library, student records and the request/approval queue.
//!
//! All business rules run here. Clients render what the server returns;
//! they never derive seat counts, occupancy or overdue flags themselves,
//! and every privileged action is checked against the caller's token.

mod announcements;
mod appointments;
mod audit;
mod auth;
mod config;
mod error;
mod hostels;
mod library;
mod models;
mod registrar;
mod requests;
mod routes;
mod state;
mod students;
mod users;

use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Campus Portal API...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    if std::env::var("JWT_SECRET").is_err() {
        warn!("⚠️  JWT_SECRET not set, using default (INSECURE - set in production!)");
    }

    // Build the shared in-memory state and seed the administrator account
    let state = Arc::new(AppState::new(settings.clone()));
    state.users.init_default_admin(&settings.auth).await?;
    info!("✅ Administrator account ready ({})", settings.auth.admin_email);

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Authentication ───");
    info!("   POST /api/auth/login            - Login with email/password");
    info!("   POST /api/auth/register         - Register (pending approval)");
    info!("   POST /api/auth/refresh          - Refresh access token");
    info!("   GET  /api/auth/me               - Get current user");
    info!("");
    info!("   ─── Campus Records ───");
    info!("   GET  /api/students              - List student records");
    info!("   GET  /api/courses               - List the course catalog");
    info!("   POST /api/enrollments           - Enroll a student (admin)");
    info!("   POST /api/enrollments/{{id}}/transfer - Move a seat (admin)");
    info!("");
    info!("   ─── Facilities ───");
    info!("   GET  /api/hostels               - List hostels with occupancy");
    info!("   POST /api/rooms/{{id}}/residents  - Assign a resident (admin)");
    info!("   GET  /api/books                 - Search the library catalog");
    info!("   GET  /api/borrowings?overdue=true - Overdue loans");
    info!("");
    info!("   ─── Front Desk ───");
    info!("   POST /api/appointments          - Book an appointment");
    info!("   GET  /api/announcements         - Notice board with unread flags");
    info!("   POST /api/requests              - File a request");
    info!("   PATCH /api/requests/{{id}}/status - Approve or reject (admin)");
    info!("   GET  /api/audit                 - Audit trail (admin)");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,campus_portal_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}

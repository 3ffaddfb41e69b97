//! Route definitions and router setup
//!
//! Configures all API routes and middleware. Every /api route except the
//! auth entry points requires a valid token; mutations additionally
//! require the admin role, enforced here as route-group layers rather
//! than inside handlers.

mod announcements;
mod appointments;
mod audit;
mod auth;
mod courses;
mod enrollments;
mod hostels;
mod library;
mod requests;
mod students;
mod users;

use crate::auth::{auth_middleware, require_admin};
use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    middleware::from_fn,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Requests running longer than this are cut off with 408
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    // Admin-only mutations
    let admin_routes = Router::new()
        // Users and approvals
        .route("/users", get(users::list_users))
        .route("/users/pending", get(users::pending_users))
        .route(
            "/users/{id}",
            put(users::update_user).delete(users::delete_user),
        )
        // Students
        .route("/students", post(students::create_student))
        .route(
            "/students/{id}",
            put(students::update_student).delete(students::delete_student),
        )
        // Courses and enrollments
        .route("/courses", post(courses::create_course))
        .route(
            "/courses/{code}",
            put(courses::update_course).delete(courses::delete_course),
        )
        .route("/enrollments", post(enrollments::create_enrollment))
        .route("/enrollments/{id}", delete(enrollments::delete_enrollment))
        .route(
            "/enrollments/{id}/transfer",
            post(enrollments::transfer_enrollment),
        )
        // Library
        .route("/books", post(library::create_book))
        .route(
            "/books/{id}",
            put(library::update_book).delete(library::delete_book),
        )
        .route("/borrowings", post(library::create_borrowing))
        .route("/borrowings/{id}/return", post(library::return_borrowing))
        // Hostels and rooms
        .route("/hostels", post(hostels::create_hostel))
        .route(
            "/hostels/{id}",
            put(hostels::update_hostel).delete(hostels::delete_hostel),
        )
        .route("/hostels/{id}/rooms", post(hostels::create_room))
        .route(
            "/rooms/{id}",
            put(hostels::update_room).delete(hostels::delete_room),
        )
        .route("/rooms/{id}/residents", post(hostels::assign_resident))
        .route(
            "/rooms/{id}/residents/{student_id}",
            delete(hostels::remove_resident),
        )
        .route("/rooms/{id}/warnings", post(hostels::add_room_warning))
        // Appointments
        .route(
            "/appointments/{id}",
            put(appointments::update_appointment).delete(appointments::delete_appointment),
        )
        .route(
            "/appointments/{id}/status",
            patch(appointments::update_appointment_status),
        )
        // Announcements
        .route("/announcements", post(announcements::create_announcement))
        .route(
            "/announcements/{id}",
            put(announcements::update_announcement).delete(announcements::delete_announcement),
        )
        // Requests
        .route(
            "/requests/{id}/status",
            patch(requests::update_request_status),
        )
        .route("/requests/{id}", delete(requests::delete_request))
        // Audit trail
        .route("/audit", get(audit::list_audit_entries))
        .layer(from_fn(require_admin));

    // Signed-in reads and self-service
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/password", post(users::change_password))
        .route("/students", get(students::list_students))
        .route("/students/{id}", get(students::get_student))
        .route("/courses", get(courses::list_courses))
        .route("/courses/{code}", get(courses::get_course))
        .route(
            "/courses/{code}/enrollments",
            get(enrollments::course_enrollments),
        )
        .route("/enrollments", get(enrollments::list_enrollments))
        .route("/enrollments/{id}", get(enrollments::get_enrollment))
        .route("/books", get(library::list_books))
        .route("/books/{id}", get(library::get_book))
        .route("/borrowings", get(library::list_borrowings))
        .route("/borrowings/{id}", get(library::get_borrowing))
        .route("/hostels", get(hostels::list_hostels))
        .route("/hostels/{id}", get(hostels::get_hostel))
        .route("/hostels/{id}/rooms", get(hostels::hostel_rooms))
        .route("/rooms/{id}", get(hostels::get_room))
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route("/appointments/{id}", get(appointments::get_appointment))
        .route("/announcements", get(announcements::list_announcements))
        .route("/announcements/{id}", get(announcements::get_announcement))
        .route(
            "/announcements/{id}/read",
            post(announcements::mark_announcement_read),
        )
        .route(
            "/requests",
            get(requests::list_requests).post(requests::create_request),
        )
        .route("/requests/{id}", get(requests::get_request))
        .merge(admin_routes)
        .layer(from_fn(auth_middleware));

    // Open entry points
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/refresh", post(auth::refresh));

    // Build the router
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", public_routes.merge(protected_routes))
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    }
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

use anyhow::Context;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use clubhub_api::firestore::{paths, FirestoreClient, StructuredQuery};
use clubhub_api::handlers::{club, school, user};
use clubhub_api::middleware::auth::bearer_auth_middleware;
use clubhub_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up GCP_PROJECT_ID, emulator
    // hosts, service account credentials, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = clubhub_api::config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting ClubHub API in {:?} mode", config.environment);

    let state = AppState::from_config(config);
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("CLUBHUB_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("🚀 ClubHub API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server")?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/user/profile", get(user::profile::profile_get))
        // Authenticated API
        .merge(club_routes(state.clone()))
        .merge(school_routes(state.clone()))
        .merge(user_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn club_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/club/members/add", post(club::members::add_post))
        .route("/api/club/members/remove", post(club::members::remove_post))
        .route("/api/club/officers/update", post(club::officers::update_post))
        .route("/api/club/attendance/take", post(club::attendance::take_post))
        .route("/api/club/attendance/query", post(club::attendance::query_post))
        .route(
            "/api/club/attendance/member-statistics",
            post(club::attendance::member_statistics_post),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            bearer_auth_middleware,
        ))
}

fn school_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/school/create", post(school::create::create_post))
        .route("/api/school/join", post(school::join::join_post))
        .route("/api/school/search", post(school::search::search_post))
        .route("/api/school/admin/add", post(school::admin::add_post))
        .route("/api/school/admin/remove", post(school::admin::remove_post))
        .route(
            "/api/school/admin/transfer-ownership",
            post(school::admin::transfer_ownership_post),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            bearer_auth_middleware,
        ))
}

fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/user/interests", post(user::interests::interests_post))
        .route("/api/user/grad-year", post(user::grad_year::grad_year_post))
        .route_layer(middleware::from_fn_with_state(
            state,
            bearer_auth_middleware,
        ))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "ClubHub API",
            "version": version,
            "description": "Multi-tenant school club management backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "profile": "/user/profile?email= (public)",
                "club": "/api/club/* (protected - membership, officers, attendance)",
                "school": "/api/school/* (protected - creation, joining, admins, search)",
                "user": "/api/user/* (protected - profile fields)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state
        .firestore
        .count("", StructuredQuery::new(paths::SCHOOLS), Some(1))
        .await
    {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "document store unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "store_error": e.to_string()
                }
            })),
        ),
    }
}

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use concours_backend::{
    config::Config,
    database::pool::create_pool,
    middleware::{auth, rate_limit},
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let config = Config::from_env()?;

    let pool = create_pool(&config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Multipart bodies carry up to three project files or two identity
    // documents in one request.
    let body_limit = config
        .max_project_file_bytes
        .saturating_mul(3)
        .max(config.max_identity_file_bytes.saturating_mul(2))
        + 1024 * 1024;

    let public_rps = config.public_rps;
    let jury_rps = config.jury_rps;
    let jwt_secret = config.jwt_secret.clone();
    let app_state = AppState::new(pool, config.clone());

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let public_api = Router::new()
        .route(
            "/api/candidats/inscription",
            post(routes::candidate_routes::register_candidate),
        )
        .route(
            "/api/candidats/soumission",
            post(routes::submission_routes::submit_project),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(public_rps),
            rate_limit::rps_middleware,
        ));

    let jury_api = Router::new()
        .route("/api/jury/candidats", get(routes::jury_routes::list_candidates))
        .route(
            "/api/jury/candidats/:id",
            get(routes::jury_routes::get_candidate),
        )
        .route(
            "/api/jury/candidats/:id/approve",
            post(routes::jury_routes::approve_candidate),
        )
        .route(
            "/api/jury/candidats/:id/reject",
            post(routes::jury_routes::reject_candidate),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth::JuryAuth::new(jwt_secret),
            auth::require_jury,
        ))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(jury_rps),
            rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(public_api)
        .merge(jury_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use axum::{
    routing::{get, post},
    Router,
};
use lms_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    // No background timer drives attempt expiry: every route below derives
    // time state lazily from the stored start time and the wall clock.
    let attempt_api = Router::new()
        .route(
            "/api/assessments/:id/attempt/check",
            get(routes::attempt::check_attempt),
        )
        .route(
            "/api/assessments/:id/attempt/start",
            post(routes::attempt::start_attempt),
        )
        .route(
            "/api/attempts/:id/resume",
            post(routes::attempt::resume_attempt),
        )
        .route("/api/attempts/:id/answer", post(routes::attempt::set_answer))
        .route("/api/attempts/:id/end", post(routes::attempt::end_attempt))
        .route(
            "/api/attempts/:id/score",
            get(routes::attempt::score_attempt),
        )
        .layer(axum::middleware::from_fn(
            lms_backend::middleware::auth::require_bearer_auth,
        ));

    let app = base_routes
        .merge(attempt_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

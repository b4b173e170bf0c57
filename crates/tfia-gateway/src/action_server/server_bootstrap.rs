//! Action server bootstrap and router wiring.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use super::upload_runtime::handle_upload_test_file;
use super::*;

pub async fn run_action_server(config: ActionServerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.upload_dir)
        .with_context(|| format!("failed to create {}", config.upload_dir.display()))?;

    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind action server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound action server address")?;

    info!(
        addr = %local_addr,
        upload_dir = %config.upload_dir.display(),
        actions = config.registry.registered_action_names().len(),
        "action server listening"
    );

    let app = build_action_server_router(Arc::new(ActionServerState::new(config)));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("action server exited unexpectedly")?;

    info!("action server stopped");
    Ok(())
}

pub(super) fn build_action_server_router(state: Arc<ActionServerState>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    let max_webhook_bytes = state.config.max_webhook_bytes;
    Router::new()
        .route(
            WEBHOOK_ENDPOINT,
            post(handle_webhook)
                .options(handle_cors_preflight)
                .layer(DefaultBodyLimit::max(max_webhook_bytes)),
        )
        .route(ACTIONS_ENDPOINT, get(handle_actions_list))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .route(
            UPLOAD_TEST_FILE_ENDPOINT,
            post(handle_upload_test_file)
                .options(handle_cors_preflight)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .layer(axum::middleware::map_response(apply_cors_headers))
        .with_state(state)
}

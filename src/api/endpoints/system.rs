//! `POST /api/shutdown` — asks the server to stop after in-flight requests finish.

use axum::extract::State;
use axum::Json;

use crate::api::types::{ApiContext, MessageResponse};

pub async fn shutdown(State(ctx): State<ApiContext>) -> Json<MessageResponse> {
    tracing::info!("Shutdown requested over HTTP");
    // notify_one keeps the permit if the server is not yet waiting.
    ctx.shutdown.notify_one();
    Json(MessageResponse::new("Sistema sendo encerrado..."))
}

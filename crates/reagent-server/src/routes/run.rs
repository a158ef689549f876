use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use reagent::agent::RunStatus;
use reagent::errors::RunError;
use reagent::providers::base::Usage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct RunRequest {
    query: String,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    final_text: String,
    rounds_used: usize,
    status: RunStatus,
    usage: Usage,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_status(error: &RunError) -> StatusCode {
    match error {
        RunError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

// Answer a single query, non streaming
async fn run_handler(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> impl IntoResponse {
    tracing::info!("Received run request");

    match state.agent.run(&request.query).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(RunResponse {
                final_text: outcome.final_text,
                rounds_used: outcome.rounds_used,
                status: outcome.status,
                usage: outcome.usage,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            (
                error_status(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/run", post(run_handler))
        .with_state(state)
}

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use reagent::models::tool::Tool;

async fn list_tools(State(state): State<AppState>) -> Json<Vec<Tool>> {
    Json(state.agent.registry().tools().to_vec())
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .with_state(state)
}

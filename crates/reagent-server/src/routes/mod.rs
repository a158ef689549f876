// Export route modules
pub mod run;
pub mod tools;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(run::routes(state.clone()))
        .merge(tools::routes(state))
}

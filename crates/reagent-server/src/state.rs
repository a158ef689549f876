use reagent::agent::Agent;
use std::sync::Arc;

/// Shared application state
///
/// A single agent answers every request; runs keep their state on their own stack.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}

impl AppState {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent: Arc::new(agent),
        }
    }
}

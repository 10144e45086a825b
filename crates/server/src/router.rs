use axum::Router;
use tower_http::trace::TraceLayer;

use crate::bootstrap::Application;
use crate::chat::{self, ChatState};
use crate::{health, inspect};

/// Chat completions, health, and a logging fallback for every other path.
pub fn router(app: &Application) -> Router {
    let chat_state =
        ChatState::new(app.runtime.clone(), app.formatter.clone(), app.config.llm.model.clone());

    Router::new()
        .merge(chat::router(chat_state))
        .merge(health::router(app.db_pool.clone(), app.runtime.provider_name()))
        .fallback(inspect::log_request)
        .layer(TraceLayer::new_for_http())
}

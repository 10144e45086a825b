use copo_core::errors::ApplicationError;
use copo_server::bootstrap::{bootstrap_with_config, Application};

use crate::commands::{async_runtime, load_config, CommandResult};

pub fn run(query: &str) -> CommandResult {
    let config = match load_config("ask") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime("ask") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let app = match bootstrap_with_config(config).await {
            Ok(app) => app,
            Err(error) => return CommandResult::failure("ask", "bootstrap", error.to_string(), 4),
        };
        let result = answer(&app, query).await;
        app.db_pool.close().await;
        result
    })
}

/// Runs `query` through the bootstrapped runtime and wraps the answer like the HTTP endpoint does.
pub async fn answer(app: &Application, query: &str) -> CommandResult {
    if query.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_query", "question must not be empty", 2);
    }

    let answer = match app.runtime.handle_query(query, "cli").await {
        Ok(answer) => answer,
        Err(error) => {
            let interface = ApplicationError::from(error).into_interface("cli");
            return CommandResult::failure("ask", "llm_request", interface.user_message(), 5);
        }
    };

    match app.formatter.format(&answer.text) {
        Ok(formatted) => CommandResult::success("ask", formatted),
        Err(error) => CommandResult::failure("ask", "response_template", error.to_string(), 6),
    }
}

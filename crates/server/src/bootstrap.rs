use std::sync::Arc;

use copo_agent::llm::{LlmClient, LlmError};
use copo_agent::providers::build_client;
use copo_agent::tools::RegistryError;
use copo_agent::{AgentRuntime, AgentSettings, ToolRegistry};
use copo_core::config::{AppConfig, ConfigError, LoadOptions};
use copo_db::{connect, migrations, DbPool, SqlCatalogRepository};
use thiserror::Error;
use tracing::info;

use crate::formatter::ResponseFormatter;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<AgentRuntime>,
    pub formatter: Arc<ResponseFormatter>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    Llm(#[source] LlmError),
    #[error("tool registry setup failed: {0}")]
    Registry(#[from] RegistryError),
    #[error("response template setup failed: {0}")]
    Template(#[source] tera::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let llm = build_client(&config.llm).map_err(BootstrapError::Llm)?;
    bootstrap_with_client(config, llm).await
}

/// Wires the application around an already constructed model client.
pub async fn bootstrap_with_client(
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        provider = llm.provider_name(),
        model = %config.llm.model,
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let registry = Arc::new(ToolRegistry::product_catalog()?);
    let catalog = Arc::new(SqlCatalogRepository::new(db_pool.clone()));
    let runtime = AgentRuntime::new(llm, registry, catalog, AgentSettings::from_config(&config.agent));
    let formatter = ResponseFormatter::new(&config.response).map_err(BootstrapError::Template)?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        tools = runtime.registry().len(),
        max_tool_turns = config.agent.max_tool_turns,
        "agent runtime initialized"
    );

    Ok(Application {
        config,
        db_pool,
        runtime: Arc::new(runtime),
        formatter: Arc::new(formatter),
    })
}

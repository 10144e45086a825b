use crate::commands::{async_runtime, load_config, CommandResult};
use copo_db::{connect, migrations};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let applied = migrations::MIGRATOR.iter().count();
        pool.close().await;
        Ok::<usize, (&'static str, String, u8)>(applied)
    });

    match result {
        Ok(applied) => {
            CommandResult::success("migrate", format!("catalog schema up to date ({applied} migrations)"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

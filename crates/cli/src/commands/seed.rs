use crate::commands::{async_runtime, load_config, CommandResult};
use copo_db::{connect, fixtures::DEMO_CODES, migrations, DemoCatalogSeed, SeedResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime("seed") {
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

        let seed_result = DemoCatalogSeed::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoCatalogSeed::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if verification.all_present {
            Ok(seed_result)
        } else {
            Err(("seed_verification", verification_failure_message(&verification.checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seed_result) => CommandResult::success("seed", success_message(&seed_result)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn success_message(seed_result: &SeedResult) -> String {
    let codes = DEMO_CODES
        .iter()
        .map(|(code, active)| {
            if *active {
                format!("  - {code}")
            } else {
                format!("  - {code} (inactive)")
            }
        })
        .collect::<Vec<_>>();
    format!(
        "demo catalog loaded: {} products, {} active\n{}",
        seed_result.products_seeded,
        seed_result.active_products,
        codes.join("\n")
    )
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "some demo products failed to load".to_string()
    } else {
        format!("seed verification failed for codes: {}", failed_checks.join(", "))
    }
}

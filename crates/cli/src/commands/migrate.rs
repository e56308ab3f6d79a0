use clientele_core::config::StoreBackend;
use clientele_store::{connect_with_settings, schema};

use crate::commands::{prepare, CommandResult, EXIT_STORE_CONNECTIVITY, EXIT_STORE_OPERATION};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("migrate") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let store = &config.store;
    if store.backend != StoreBackend::Sqlite {
        return CommandResult::success(
            "migrate",
            format!("no schema step needed for the `{}` backend", store.backend.as_str()),
        );
    }

    let result = runtime.block_on(async {
        let pool = connect_with_settings(&store.url, store.max_connections, store.timeout_secs)
            .await
            .map_err(|error| ("store_connectivity", error.to_string(), EXIT_STORE_CONNECTIVITY))?;
        let created = schema::ensure_schema(&pool, &store.table)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_STORE_OPERATION));
        pool.close().await;
        created
    });

    match result {
        Ok(true) => CommandResult::success("migrate", format!("created table `{}`", store.table)),
        Ok(false) => {
            CommandResult::success("migrate", format!("table `{}` already present", store.table))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

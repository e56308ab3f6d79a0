use clientele_store::{open_store, seed_demo_customers, SeedResult};

use crate::commands::{prepare, CommandResult, EXIT_STORE_CONNECTIVITY, EXIT_STORE_OPERATION};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let store = open_store(&config.store)
            .await
            .map_err(|error| ("store_connectivity", error.to_string(), EXIT_STORE_CONNECTIVITY))?;
        seed_demo_customers(store.as_ref())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_STORE_OPERATION))
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summarize(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summarize(seeded: &SeedResult) -> String {
    let names = seeded
        .inserted
        .iter()
        .map(|customer| customer.name.as_deref().unwrap_or("<unnamed>"))
        .collect::<Vec<_>>();

    let mut message = if names.is_empty() {
        "no demo customers inserted".to_string()
    } else {
        format!("inserted {} demo customers: {}", names.len(), names.join(", "))
    };
    if !seeded.skipped.is_empty() {
        message.push_str(&format!("; already present: {}", seeded.skipped.join(", ")));
    }
    message
}

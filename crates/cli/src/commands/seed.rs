use crate::commands::{block_on, load_config, CommandResult};
use jargon_jar_db::{connect_with_config, migrations, GlobalCatalogue, SeedResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let result = block_on("seed", async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seeded = GlobalCatalogue::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = GlobalCatalogue::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        pool.close().await;

        if verification.all_present {
            Ok(seeded)
        } else {
            let missing = verification
                .checks
                .iter()
                .filter_map(|(term, present)| (!present).then_some(*term))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_failure_message(&missing), 6u8))
        }
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err(failure) => failure,
    }
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "global jargon catalogue ready: {} inserted, {} already present",
        seeded.inserted, seeded.already_present
    )
}

fn verification_failure_message(missing: &[&str]) -> String {
    if missing.is_empty() {
        "Some catalogue terms failed to load".to_string()
    } else {
        format!("Catalogue verification failed for terms: {}", missing.join(", "))
    }
}

//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `campaign_core` linkage and store bootstrap.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `campaign_cli [STORE_PATH]`. Without a path an in-memory store is
//! opened. Setting `CAMPAIGN_LOG_DIR` (absolute path) enables file logging.

use campaign_core::db::migrations::current_version;
use campaign_core::{
    default_log_level, init_logging, open_db, open_db_in_memory, CampaignService,
    SqliteCampaignRepository, SqliteObjectRepository,
};
use log::{error, info};
use std::error::Error;
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "CAMPAIGN_LOG_DIR";

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("campaign_core logging=error error={err}");
        }
    }

    println!("campaign_core ping={}", campaign_core::ping());
    println!("campaign_core version={}", campaign_core::core_version());

    match probe_store(std::env::args().nth(1)) {
        Ok(()) => {
            info!("event=cli_probe module=cli status=ok");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_probe module=cli status=error error={err}");
            eprintln!("campaign_core store=error error={err}");
            ExitCode::FAILURE
        }
    }
}

fn probe_store(path: Option<String>) -> Result<(), Box<dyn Error>> {
    let conn = match path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let service = CampaignService::new(
        SqliteCampaignRepository::try_new(&conn)?,
        SqliteObjectRepository::try_new(&conn)?,
    );

    println!(
        "campaign_core store={} schema_version={}",
        path.as_deref().unwrap_or(":memory:"),
        current_version(&conn)?
    );
    println!(
        "campaign_core campaigns={} active={}",
        service.list_names(false)?.len(),
        service.list_names(true)?.len()
    );
    Ok(())
}

//! ytup - Main entry point

use ytup::config::ConfigManager;
use ytup::logger::{self, ActivityLog};
use ytup::wizard::Wizard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init_tracing();

    let config = match ConfigManager::new().await {
        Ok(manager) => manager.get().clone(),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let log = ActivityLog::new(config.log_level);
    log.session_start(env!("CARGO_PKG_VERSION"));

    // Startup housekeeping: move old daily logs aside
    match log.archive_old(config.log_retention_days) {
        Ok(0) => {}
        Ok(n) => tracing::info!("Archived {} old log file(s)", n),
        Err(e) => tracing::warn!("Log archival failed: {}", e),
    }

    println!("ytup {}", env!("CARGO_PKG_VERSION"));
    println!("Upload a video to YouTube");

    let result = match Wizard::new(config, log.clone()) {
        Ok(mut wizard) => wizard.run().await,
        Err(e) => Err(e),
    };

    log.session_end();

    match result {
        Ok(()) => Ok(()),
        Err(ytup::Error::Interrupted) => {
            // Conventional exit status for SIGINT
            std::process::exit(130);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

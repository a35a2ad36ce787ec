//! Process startup entry point.
//!
//! # Responsibility
//! - Load configuration, start logging and create the schema.
//! - Report readiness, then join the background credential sweep and report
//!   its outcome.
//!
//! # Invariants
//! - A schema failure ends the process before any data access.

use diary_core::{init_logging, open_db, spawn_background_migration, DiaryConfig};
use log::{error, info};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = DiaryConfig::from_env();

    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("diary: logging disabled: {err}");
    }

    // Held for the process lifetime; the presentation layer builds its
    // services on this connection.
    let _conn = match open_db(&config.db_path) {
        Ok(conn) => conn,
        Err(err) => {
            error!("event=startup module=cli status=error error_code=schema_init_failed error={err}");
            eprintln!("diary: cannot open {}: {err}", config.db_path.display());
            return ExitCode::FAILURE;
        }
    };
    info!("event=startup module=cli status=ok db_path={}", config.db_path.display());

    let task = match spawn_background_migration(&config.db_path) {
        Ok(task) => task,
        Err(err) => {
            eprintln!("diary: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("diary_core {} ready", diary_core::core_version());

    // No presentation layer runs in this binary, so the only remaining work
    // is the sweep; join it before exiting so its report is not lost.
    match task.wait() {
        Ok(report) => {
            println!(
                "credential sweep finished: {} account(s) scanned, {} credential(s) upgraded",
                report.scanned, report.migrated
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("diary: credential migration failed: {err}");
            ExitCode::FAILURE
        }
    }
}

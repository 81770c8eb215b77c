//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `enrollment_core` linkage.
//! - Optionally open the database named by a TOML config and report its
//!   schema version and active matrix.

use enrollment_core::db::migrations::current_user_version;
use enrollment_core::repo::matrix_repo::{MatrixRepository, SqliteMatrixRepository};
use enrollment_core::{init_logging_from_config, open_db_with_config, CoreConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("enrollment_core ping={}", enrollment_core::ping());
    println!("enrollment_core version={}", enrollment_core::core_version());

    let Some(config_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match probe_database(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn probe_database(config_path: &str) -> Result<(), String> {
    let config = CoreConfig::load(config_path).map_err(|err| err.to_string())?;
    if init_logging_from_config(&config)? {
        log::info!("event=cli_start module=cli status=ok");
    }

    let conn = open_db_with_config(&config).map_err(|err| err.to_string())?;
    let version = current_user_version(&conn).map_err(|err| err.to_string())?;
    println!("database={} schema_version={version}", config.database_path.display());

    let active = SqliteMatrixRepository::new(&conn)
        .find_active_matrix()
        .map_err(|err| err.to_string())?;
    match active {
        Some(matrix) => println!("active_matrix={} name={}", matrix.id, matrix.name),
        None => println!("active_matrix=none"),
    }
    Ok(())
}

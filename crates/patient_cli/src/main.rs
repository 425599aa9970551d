//! Operator CLI for the patient registry database.
//!
//! # Responsibility
//! - Apply migrations ahead of a deploy, reset a development database and
//!   print stored patients without starting the HTTP server.

use clap::{Parser, Subcommand};
use log::info;
use patient_core::db::migrations::{latest_version, schema_version};
use patient_core::db::{open_db, reset_db};
use patient_core::{
    core_version, init_logging, AppConfig, PatientRepository, SqlitePatientRepository,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "patient_cli", version, about = "Patient registry database tool")]
struct Cli {
    /// SQLite database file; overrides the configured `database_path`.
    #[arg(long, global = true, env = "PATIENT_DATABASE_PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bring the database schema up to the latest version.
    Migrate,
    /// Drop all patient data and re-create the seeded schema.
    Reset {
        /// Required acknowledgement that all data will be lost.
        #[arg(long)]
        yes: bool,
    },
    /// Print every stored patient, one per line.
    List,
    /// Print the crate and schema versions.
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("patient_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_logging(&config.log_level, config.log_dir.as_deref())?;
    let database = cli.database.unwrap_or(config.database_path);

    match cli.command {
        Command::Migrate => {
            let conn = open_db(&database)?;
            println!("schema_version={}", schema_version(&conn)?);
        }
        Command::Reset { yes } => {
            if !yes {
                return Err("reset deletes every patient; pass --yes to confirm".into());
            }
            let conn = reset_db(&database)?;
            info!("event=cli_reset module=cli status=ok");
            println!("schema_version={}", schema_version(&conn)?);
        }
        Command::List => {
            let conn = open_db(&database)?;
            let repo = SqlitePatientRepository::try_new(&conn)?;
            for patient in repo.list()? {
                println!(
                    "{}\t{}\t{}\t{}",
                    patient.id, patient.name, patient.address, patient.birth_year
                );
            }
        }
        Command::Version => {
            println!("patient_core version={}", core_version());
            println!("latest_schema_version={}", latest_version());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn reset_flag_parses() {
        let cli = Cli::try_parse_from(["patient_cli", "--database", "/tmp/x.db", "reset", "--yes"])
            .unwrap();
        assert!(matches!(cli.command, Command::Reset { yes: true }));
        assert_eq!(cli.database.unwrap().to_str(), Some("/tmp/x.db"));
    }
}

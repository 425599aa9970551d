//! Patient registry HTTP server entry point.
//!
//! Startup order: configuration, logging, database migration, listener.
//! Any failure before the listener binds exits the process with status 1.

use log::{error, info};
use patient_core::db::DbError;
use patient_core::{init_logging, AppConfig, ConfigError};
use patient_server::{router, AppState};
use std::fmt::{Display, Formatter};
use std::process::ExitCode;

#[derive(Debug)]
enum StartupError {
    Config(ConfigError),
    Logging(String),
    Migration(DbError),
    Io(std::io::Error),
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(message) => write!(f, "failed to initialize logging: {message}"),
            Self::Migration(err) => write!(f, "database migration failed: {err}"),
            Self::Io(err) => write!(f, "http server error: {err}"),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=server_exit module=server status=error error={}", err);
            eprintln!("patient_server: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::load().map_err(StartupError::Config)?;
    init_logging(&config.log_level, config.log_dir.as_deref()).map_err(StartupError::Logging)?;

    let database_path = config.database_path.clone();
    let state = tokio::task::spawn_blocking(move || AppState::open(database_path))
        .await
        .map_err(|err| StartupError::Io(std::io::Error::other(err)))?
        .map_err(StartupError::Migration)?;

    let addr = config.listen_socket();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(StartupError::Io)?;
    info!("event=server_listen module=server status=ok addr={}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Io)?;

    info!("event=server_exit module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            "event=shutdown_signal module=server status=error error={}",
            err
        );
        std::future::pending::<()>().await;
    }
}

use clap::Parser;
use pocketbook::AppError;
use pocketbook::cli::Cli;
use pocketbook::config::Config;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pocketbook=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match Config::from_env() {
        Ok(config) => cli.run(config).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Service errors carry a message meant for the user; the rest is context
            match err.downcast_ref::<AppError>() {
                Some(app_err) => {
                    if let AppError::Database(source) = app_err {
                        tracing::error!(error = ?source, "command failed");
                    }
                    eprintln!("Error: {}", app_err.user_message());
                }
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

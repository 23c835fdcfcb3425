//! apptrack CLI - Daily appointment-API hits report
//!
//! Builds yesterday's hits spreadsheet and mails it, or previews the counts
//! on the terminal.

mod config;
mod logging;

use anyhow::Result;
use apptrack_core::catalogue::CATALOGUE;
use apptrack_core::{layout, Renderer};
use apptrack_mail::{NotificationDispatcher, SmtpMailer};
use apptrack_render::{ReportAssembler, TextRenderer};
use apptrack_store::SqlCountGateway;
use chrono::{Duration, Local};
use clap::{Parser, Subcommand};
use config::AppConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(author, version, about = "Daily appointment-API hits report", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "APPTRACK_CONFIG", default_value = "apptrack.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the report and e-mail it (default)
    Send,

    /// Build the report file only
    Build,

    /// Print yesterday's counts without writing a file
    Preview,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    logging::init(cli.verbose, config.logging.file.as_deref())?;
    info!("apptrack v{} using {}", env!("CARGO_PKG_VERSION"), cli.config.display());

    let gateway = Arc::new(SqlCountGateway::new(config.database.clone()));

    match cli.command.unwrap_or(Commands::Send) {
        Commands::Send => {
            let assembler = ReportAssembler::new(gateway, config.report.clone());
            let mailer = Arc::new(SmtpMailer::new(config.smtp.clone()));
            let dispatcher = NotificationDispatcher::new(assembler, config.recipients.clone(), mailer);

            let status = dispatcher.send_report().await;
            println!("{status}");
            if !status.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Build => {
            let path = ReportAssembler::new(gateway, config.report.clone())
                .build_report()
                .await?;
            println!("{}", path.display());
        }
        Commands::Preview => {
            let yesterday = (Local::now().naive_local() - Duration::days(1)).date();
            let report = layout::build_report(gateway.as_ref(), CATALOGUE, yesterday).await?;
            print!("{}", TextRenderer::new().render(&report)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

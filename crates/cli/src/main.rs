use std::path::PathBuf;

use anyhow::Context;
use bookshelf_app::App;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Book catalog service")]
struct Cli {
    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations and serve HTTP until interrupted (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Print the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(cli.config_dir)
        .with_context(|| "failed to load bookshelf settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Config => {
            let mut shown = settings.clone();
            shown.auth = settings.auth.redacted();
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        Command::Migrate => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            let app = App::bootstrap(settings).await?;
            let applied = app.migrate().await?;
            tracing::info!(applied, "migrate finished");
        }
        Command::Serve => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookshelf starting");
            App::bootstrap(settings).await?.serve().await?;
        }
    }

    Ok(())
}

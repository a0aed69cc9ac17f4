use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use commands::OutputFmt;
use ironplan::{config::Config, db::open};

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr.
    let log_level = if cli.verbose { "ironplan=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let fmt = OutputFmt::from_flag(cli.json);

    // Config commands run before the config is parsed.
    if let Commands::Config(cmd) = cli.cmd {
        return commands::config::handle(cmd, fmt).await;
    }

    let config_path = Config::default_path()?;
    let settings = Config::load(&config_path)?
        .settings()
        .with_context(|| format!("Invalid config in {}", config_path.display()))?;

    let pool = open(&settings.db_path).await?;

    match cli.cmd {
        Commands::Exercise(cmd) => commands::exercise::handle(cmd, &pool, fmt).await?,
        Commands::Program(cmd) => commands::program::handle(cmd, &pool, &settings, fmt).await?,
        Commands::Log(cmd) => commands::log::handle(cmd, &pool, fmt).await?,
        Commands::Checkin {
            sleep,
            energy,
            soreness,
            motivation,
            rhr,
            hrv,
            note,
            date,
        } => {
            let args = commands::readiness::Checkin {
                sleep,
                energy,
                soreness,
                motivation,
                rhr,
                hrv,
                note,
                date,
            };
            commands::readiness::checkin(args, &pool, &settings, fmt).await?
        }
        Commands::Readiness { days, date } => {
            commands::readiness::show(days, date, &pool, &settings, fmt).await?
        }
        Commands::Status { days, graph } => commands::status::handle(days, graph, &pool, &settings, fmt).await?,
        Commands::Calendar {
            year,
            month,
            program,
        } => commands::calendar::handle(year, month, program, &pool, &settings, fmt).await?,
        Commands::Profile(cmd) => commands::profile::handle(cmd, &pool, fmt).await?,
        Commands::Config(_) => {}
    }

    pool.close().await;
    Ok(())
}

use anyhow::Result;
use colored::Colorize;

use crate::{
    cli::ConfigCmd,
    commands::{OutputFmt, emit},
};
use ironplan::config::Config;

pub async fn handle(cmd: ConfigCmd, fmt: OutputFmt) -> Result<()> {
    let config_path = Config::default_path()?;
    let mut cfg = Config::load(&config_path)?;

    match cmd {
        ConfigCmd::List => {
            emit(fmt, &cfg, || {
                if cfg.map.is_empty() {
                    println!("{}", "(no config set)".dimmed());
                } else {
                    println!("{}", "Config:".cyan().bold());
                    for (k, v) in &cfg.map {
                        println!("  {} = {}", k.green(), v);
                    }
                }
                println!("{}", config_path.display().to_string().dimmed());
            });
        }

        ConfigCmd::Get { key } => match cfg.map.get(&key) {
            Some(val) => println!("{}", val),
            None => println!("{} key `{}` not found", "warning:".yellow().bold(), key),
        },

        ConfigCmd::Set { key, val } => {
            cfg.map.insert(key.clone(), val.clone());

            // Refuse values the engine could not use.
            if let Err(e) = cfg.settings() {
                println!("{} {:#}; nothing saved", "error:".red().bold(), e);
                return Ok(());
            }

            cfg.save(&config_path)?;
            println!("{} set `{}` = `{}`", "info:".blue().bold(), key.green(), val);
        }

        ConfigCmd::Unset { key } => {
            if cfg.map.remove(&key).is_some() {
                cfg.save(&config_path)?;
                println!("{} removed `{}`", "info:".blue().bold(), key.green());
            } else {
                println!("{} key `{}` not found", "warning:".yellow().bold(), key);
            }
        }
    }

    Ok(())
}

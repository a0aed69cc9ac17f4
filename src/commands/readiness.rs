use anyhow::{Result, bail};
use chrono::NaiveDate;
use colored::{ColoredString, Colorize};

use crate::commands::{OutputFmt, date_or_today, emit};
use ironplan::{
    config::EngineSettings,
    db::DB,
    models::ReadinessEntry,
    readiness::{ReadinessEngine, ReadinessLog, ReadinessZone},
    storage,
};

pub struct Checkin {
    pub sleep: Option<u8>,
    pub energy: Option<u8>,
    pub soreness: Option<u8>,
    pub motivation: Option<u8>,
    pub rhr: Option<u32>,
    pub hrv: Option<f64>,
    pub note: Option<String>,
    pub date: Option<String>,
}

fn paint(zone: ReadinessZone, text: String) -> ColoredString {
    match zone {
        ReadinessZone::Optimal => text.green().bold(),
        ReadinessZone::Good => text.green(),
        ReadinessZone::Adjusting => text.yellow(),
        ReadinessZone::Struggling => text.red(),
        ReadinessZone::Critical => text.red().bold(),
    }
}

pub async fn checkin(args: Checkin, pool: &DB, settings: &EngineSettings, fmt: OutputFmt) -> Result<()> {
    let entry = ReadinessEntry {
        date: date_or_today(args.date.as_deref())?,
        sleep_quality: args.sleep,
        energy: args.energy,
        soreness: args.soreness,
        motivation: args.motivation,
        resting_hr: args.rhr,
        hrv: args.hrv,
        note: args.note,
    };

    // Validation and the replace-by-date rule live in the log.
    let mut log = ReadinessLog::from_entries(storage::list_readiness(pool).await?)?;
    let previous = log.upsert(entry.clone())?;
    storage::upsert_readiness(pool, &entry).await?;

    let score = ReadinessEngine::new(settings.readiness).score(&entry);

    emit(fmt, &score, || {
        let verb = if previous.is_some() { "updated" } else { "recorded" };
        println!("{} {} check-in for {}", "ok:".green().bold(), verb, entry.date);
        match score {
            Some(s) => println!(
                "  {} {}",
                "readiness".cyan(),
                paint(s.zone, format!("{} ({})", s.score, s.zone))
            ),
            None => println!(
                "{} no subjective factors given; no score for this day",
                "info:".blue().bold()
            ),
        }
    });

    Ok(())
}

pub async fn show(
    days: u32,
    date: Option<String>,
    pool: &DB,
    settings: &EngineSettings,
    fmt: OutputFmt,
) -> Result<()> {
    if days == 0 {
        bail!("--days must be at least 1");
    }
    let end: NaiveDate = date_or_today(date.as_deref())?;
    let entries = storage::list_readiness(pool).await?;
    let series = ReadinessEngine::new(settings.readiness).aggregate(&entries, end, days);

    emit(fmt, &series, || {
        println!("{}", "Readiness:".cyan().bold());
        for day in &series.days {
            let bar = match (day.score, day.zone) {
                (Some(score), Some(zone)) => {
                    let width = (score as usize).div_ceil(5);
                    format!(
                        "{} {}",
                        paint(zone, "█".repeat(width)),
                        paint(zone, format!("{} {}", score, zone))
                    )
                }
                _ => "–".dimmed().to_string(),
            };
            println!("  {} {}", day.date.format("%a %b %d").to_string().dimmed(), bar);
        }

        println!();
        match series.mean {
            Some(mean) => {
                let zone = ReadinessZone::classify(mean.round() as u8);
                println!(
                    "{} {} over {} day(s)",
                    "Average:".cyan().bold(),
                    paint(zone, format!("{:.0} ({})", mean, zone)),
                    days
                );
            }
            None => println!("{} no check-ins in this window", "info:".blue().bold()),
        }
        println!("{} {} day(s)", "Streak:".cyan().bold(), series.streak);
    });

    Ok(())
}

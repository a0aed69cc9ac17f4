use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use colored::Colorize;
use serde::Serialize;

use crate::commands::{OutputFmt, emit, program};
use ironplan::{
    config::EngineSettings,
    db::DB,
    phase::Session,
    storage,
};

#[derive(Debug, Default, Serialize)]
struct DayCell {
    date: Option<NaiveDate>,
    prescribed: Option<String>,
    logged: Vec<String>,
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

pub async fn handle(
    year: Option<i32>,
    month: Option<u32>,
    key: Option<String>,
    pool: &DB,
    settings: &EngineSettings,
    fmt: OutputFmt,
) -> Result<()> {
    let now = chrono::Local::now();
    let year = year.unwrap_or(now.year());
    let month = month.unwrap_or(now.month());

    if !(1..=12).contains(&month) {
        bail!("month must be between 1 and 12");
    }
    let (first_day, last_day) =
        month_bounds(year, month).with_context(|| format!("{}-{} is out of range", year, month))?;

    let mut cells: BTreeMap<NaiveDate, DayCell> = first_day
        .iter_days()
        .take_while(|d| *d <= last_day)
        .map(|d| {
            (
                d,
                DayCell {
                    date: Some(d),
                    ..DayCell::default()
                },
            )
        })
        .collect();

    // Logs still show when no program has been imported.
    let has_programs = !storage::list_programs(pool).await?.is_empty();
    let mut program_name = None;
    if key.is_some() || has_programs {
        let (stored, prog) = program::load(pool, settings, key.as_deref()).await?;
        for (date, cell) in cells.iter_mut() {
            if let Some(day) = prog.on_date(stored.start_date, *date) {
                if !matches!(day.session, Session::Recovery { .. }) {
                    cell.prescribed = Some(program::session_summary(&day.session));
                }
            }
        }
        program_name = Some(stored.name);
    }

    for log in storage::list_logs(pool, Some(first_day), Some(last_day)).await? {
        if let Some(cell) = cells.get_mut(&log.date) {
            cell.logged.push(log.label);
        }
    }

    let active: Vec<&DayCell> = cells
        .values()
        .filter(|c| c.prescribed.is_some() || !c.logged.is_empty())
        .collect();

    emit(fmt, &active, || {
        println!("\n{}", first_day.format("%B %Y").to_string().bold().cyan());
        println!("{}", "Su Mo Tu We Th Fr Sa".dimmed());

        // Get the day of week for the first day (0 = Sunday)
        let first_weekday = first_day.weekday().num_days_from_sunday() as usize;
        print!("{}", "   ".repeat(first_weekday));

        for (date, cell) in &cells {
            let day = format!("{:2}", date.day());
            let styled = match (cell.prescribed.is_some(), !cell.logged.is_empty()) {
                (_, true) => day.green().bold(),
                (true, false) if *date < now.date_naive() => day.red(),
                (true, false) => day.yellow(),
                (false, false) => day.normal(),
            };
            print!("{} ", styled);

            // New line at end of week
            if (first_weekday + date.day() as usize) % 7 == 0 {
                println!();
            }
        }
        println!("\n");

        println!(
            "{} {} logged  {} planned  {} missed",
            "Legend:".dimmed(),
            "■".green().bold(),
            "■".yellow(),
            "■".red()
        );
        if let Some(name) = &program_name {
            println!("{} {}", "Program:".dimmed(), name);
        }

        if !active.is_empty() {
            println!("\n{}", "Days:".bold().cyan());
            for cell in &active {
                let Some(date) = cell.date else { continue };
                let plan = cell.prescribed.as_deref().unwrap_or("unplanned");
                let done = if cell.logged.is_empty() {
                    String::new()
                } else {
                    format!(" {} {}", "✓".green(), cell.logged.join(", "))
                };
                println!("  {} {}{}", date.format("%a %b %d").to_string().green(), plan, done);
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_bounds_handle_december_and_leap_years() {
        let (a, b) = month_bounds(2024, 12).unwrap();
        assert_eq!((a.day(), b.day(), b.month()), (1, 31, 12));

        let (_, feb) = month_bounds(2024, 2).unwrap();
        assert_eq!(feb.day(), 29);

        assert!(month_bounds(2025, 13).is_none());
    }
}

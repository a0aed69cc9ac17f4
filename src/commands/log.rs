use anyhow::{Result, anyhow, bail};
use colored::Colorize;
use serde::Serialize;

use crate::{
    cli::LogCmd,
    commands::{OutputFmt, date_or_today, emit},
};
use ironplan::{
    catalog::ExerciseCatalog,
    db::DB,
    models::{PerformedExercise, PrUpdate, WorkoutLogEntry, apply_log_to_profile},
    phase::Reps,
    storage,
    types::SessionType,
    utils::format_minutes,
};

/// Parses `NAME:WEIGHT:SETSxREPS[@RPE]`.
///
/// The weight may be empty or `bw` for unloaded work. Reps accept anything a
/// prescription does (`5`, `8-10`, `amrap`).
fn parse_performed(raw: &str) -> Result<PerformedExercise> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    let [name, weight, volume] = parts.as_slice() else {
        bail!("`{}` should look like NAME:WEIGHT:SETSxREPS[@RPE]", raw);
    };
    if name.is_empty() {
        bail!("`{}` is missing an exercise name", raw);
    }

    let weight = match *weight {
        "" => None,
        w if w.eq_ignore_ascii_case("bw") => None,
        w => Some(
            w.parse::<f64>()
                .map_err(|_| anyhow!("invalid weight `{}` in `{}`", w, raw))?,
        ),
    };

    let (volume, rpe) = match volume.split_once('@') {
        Some((v, rpe)) => {
            let rpe = rpe
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|r| (1.0..=10.0).contains(r))
                .ok_or_else(|| anyhow!("RPE in `{}` must be between 1 and 10", raw))?;
            (v, Some(rpe))
        }
        None => (*volume, None),
    };

    let Some((sets, reps)) = volume.split_once(['x', 'X']) else {
        bail!("`{}` is missing SETSxREPS", raw);
    };
    let sets = sets
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| anyhow!("invalid set count `{}` in `{}`", sets.trim(), raw))?;
    let reps: Reps = reps.parse().map_err(|e: String| anyhow!(e))?;

    Ok(PerformedExercise {
        name: name.to_string(),
        weight,
        sets,
        reps: reps.to_string(),
        rpe,
        note: None,
    })
}

/// Swaps a typed name for its catalog id so records and load line up.
fn canonical_name(catalog: &ExerciseCatalog, performed: &mut PerformedExercise) {
    match catalog.find(&performed.name) {
        Some(ex) => performed.name = ex.id.clone(),
        None => {
            let hint = catalog
                .suggest(&performed.name)
                .map(|s| format!(" -- did you mean: `{}`?", s.green()))
                .unwrap_or_default();
            println!(
                "{} `{}` is not in the catalog; logged as typed{}",
                "warning:".yellow().bold(),
                performed.name,
                hint
            );
        }
    }
}

#[derive(Serialize)]
struct AddJson<'a> {
    entry: &'a WorkoutLogEntry,
    records: &'a [PrUpdate],
}

pub async fn handle(cmd: LogCmd, pool: &DB, fmt: OutputFmt) -> Result<()> {
    match cmd {
        LogCmd::Add {
            label,
            date,
            session_type,
            exercises,
            duration,
            incomplete,
        } => {
            let catalog = storage::catalog(pool).await?;
            let session_type = session_type
                .map(|t| t.parse::<SessionType>().map_err(|e| anyhow!(e)))
                .transpose()?;

            let mut performed = exercises
                .iter()
                .map(|raw| parse_performed(raw))
                .collect::<Result<Vec<_>>>()?;
            for p in &mut performed {
                canonical_name(&catalog, p);
            }

            let entry = WorkoutLogEntry {
                id: storage::new_log_id(),
                date: date_or_today(date.as_deref())?,
                label,
                session_type,
                completed: !incomplete,
                duration_min: duration,
                exercises: performed,
            };
            storage::insert_log(pool, &entry).await?;

            let mut profile = storage::load_profile(pool).await?;
            let records = apply_log_to_profile(&mut profile, &entry, &catalog);
            if !records.is_empty() {
                storage::save_profile(pool, &profile).await?;
            }

            emit(fmt, &AddJson { entry: &entry, records: &records }, || {
                println!(
                    "{} logged `{}` on {} {}",
                    "ok:".green().bold(),
                    entry.label,
                    entry.date,
                    format!("(id {})", entry.id).dimmed()
                );
                for r in &records {
                    let prev = r
                        .previous
                        .map(|p| format!("{:.1}", p))
                        .unwrap_or_else(|| "none".to_string());
                    println!(
                        "{} new record `{}`: {} {}",
                        "ok:".green().bold(),
                        r.key,
                        format!("{:.1}", r.value).green().bold(),
                        format!("(was {})", prev).dimmed()
                    );
                }
            });
        }

        LogCmd::List { from, to } => {
            let from = from.as_deref().map(|d| date_or_today(Some(d))).transpose()?;
            let to = to.as_deref().map(|d| date_or_today(Some(d))).transpose()?;
            let logs = storage::list_logs(pool, from, to).await?;

            emit(fmt, &logs, || {
                println!("{}", "Workouts:".cyan().bold());
                for log in &logs {
                    let kind = log.session_type.map(|t| t.as_str()).unwrap_or("session");
                    let duration = log.duration_min.map(format_minutes).unwrap_or_default();
                    let status = if log.completed {
                        String::new()
                    } else {
                        " (incomplete)".red().to_string()
                    };
                    println!(
                        " {} • {} [{}] {}{} {}",
                        log.date.to_string().yellow(),
                        log.label.bold(),
                        kind,
                        duration.dimmed(),
                        status,
                        format!("id {}", log.id).dimmed()
                    );
                    for ex in &log.exercises {
                        let weight = ex
                            .weight
                            .map(|w| format!("{} kg ", w))
                            .unwrap_or_default();
                        let rpe = ex.rpe.map(|r| format!(" @{}", r)).unwrap_or_default();
                        println!("     {} {}{}x{}{}", ex.name, weight, ex.sets, ex.reps, rpe);
                    }
                }
                if logs.is_empty() {
                    println!("{}", "  (no workouts logged)".dimmed());
                }
            });
        }

        LogCmd::Delete { id } => {
            if storage::delete_log(pool, &id).await? {
                println!("{} deleted workout `{}`", "ok:".green().bold(), id);
                println!(
                    "{} records raised by it are kept; training load is recomputed",
                    "info:".blue().bold()
                );
            } else {
                println!("{} no workout `{}`", "warning:".yellow().bold(), id);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_full_exercise_entry() {
        let p = parse_performed("backSquat:120:5x5@8.5").unwrap();
        assert_eq!(p.name, "backSquat");
        assert_eq!(p.weight, Some(120.0));
        assert_eq!(p.sets, 5);
        assert_eq!(p.reps, "5");
        assert_eq!(p.rpe, Some(8.5));
    }

    #[test]
    fn bodyweight_and_ranges() {
        let p = parse_performed("pullUp:bw:3x8-10").unwrap();
        assert_eq!(p.weight, None);
        assert_eq!(p.reps, "8-10");
        assert_eq!(p.rpe, None);

        let p = parse_performed("pushUp::2xamrap").unwrap();
        assert_eq!(p.reps, "AMRAP");
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(parse_performed("backSquat:120").is_err());
        assert!(parse_performed(":100:5x5").is_err());
        assert!(parse_performed("backSquat:heavy:5x5").is_err());
        assert!(parse_performed("backSquat:100:0x5").is_err());
        assert!(parse_performed("backSquat:100:5x5@11").is_err());
        assert!(parse_performed("backSquat:100:5x10-8").is_err());
    }
}

use std::collections::BTreeSet;

use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;

use crate::{
    cli::ExerciseCmd,
    commands::{OutputFmt, emit, plain_len},
};
use ironplan::{
    catalog::{Exercise, ExerciseCatalog},
    db::DB,
    storage,
    substitution,
    types::{Equipment, MovementPattern, Muscle, parse_label_list},
};

fn movement_pattern(raw: &str) -> Result<MovementPattern> {
    raw.parse().map_err(|e: String| anyhow!(e))
}

fn equipment_set(csv: &str) -> Result<BTreeSet<Equipment>> {
    let items = parse_label_list::<Equipment>(csv).map_err(|e| anyhow!(e))?;
    Ok(items.into_iter().collect())
}

/// Finds an exercise by id or name, with a "did you mean" on failure.
fn lookup<'a>(catalog: &'a ExerciseCatalog, query: &str) -> Result<&'a Exercise> {
    match catalog.find(query) {
        Some(ex) => Ok(ex),
        None => match catalog.suggest(query) {
            Some(sug) => bail!("no exercise `{}` -- did you mean: `{}`?", query, sug),
            None => bail!("no exercise `{}`", query),
        },
    }
}

fn join<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn handle(cmd: ExerciseCmd, pool: &DB, fmt: OutputFmt) -> Result<()> {
    match cmd {
        ExerciseCmd::List { pattern, equipment } => {
            let catalog = storage::catalog(pool).await?;

            let pattern = pattern.as_deref().map(movement_pattern).transpose()?;
            let equipment = equipment.as_deref().map(equipment_set).transpose()?;

            let rows: Vec<&Exercise> = catalog
                .iter()
                .filter(|ex| pattern.is_none_or(|p| ex.pattern == p))
                .filter(|ex| equipment.as_ref().is_none_or(|eq| ex.usable_with(eq)))
                .collect();

            emit(fmt, &rows, || {
                println!("{}", "Exercises:".cyan().bold());

                let left: Vec<String> = rows
                    .iter()
                    .map(|ex| {
                        let tag = if ex.custom {
                            " (custom)".magenta().to_string()
                        } else {
                            String::new()
                        };
                        format!(" • {} [{}]{}", ex.id.bold(), ex.pattern.as_str().yellow(), tag)
                    })
                    .collect();

                let pad = left.iter().map(|s| plain_len(s)).max().unwrap_or(0);
                for (l, ex) in left.iter().zip(&rows) {
                    let total_pad = pad + l.len() - plain_len(l);
                    println!(
                        "{:<total_pad$} {} {}",
                        l,
                        "|".blue(),
                        join(ex.equipment.iter().map(|e| e.as_str())).dimmed(),
                    );
                }

                if rows.is_empty() {
                    println!("{}", "  (no exercises found)".dimmed());
                }
            });
        }

        ExerciseCmd::Show { exercise } => {
            let query = exercise.join(" ");
            if query.trim().is_empty() {
                bail!("which exercise? pass an id or a name");
            }
            let catalog = storage::catalog(pool).await?;
            let ex = lookup(&catalog, query.trim())?;

            emit(fmt, ex, || {
                println!("{} {}", ex.name.bold(), format!("({})", ex.id).dimmed());
                println!("  {:<10} {}", "pattern".cyan(), ex.pattern.as_str());
                println!(
                    "  {:<10} {}",
                    "equipment".cyan(),
                    join(ex.equipment.iter().map(|e| e.as_str()))
                );
                println!(
                    "  {:<10} {}",
                    "muscles".cyan(),
                    join(ex.muscles.iter().map(|m| m.as_str()))
                );
                if let Some(key) = &ex.pr_key {
                    println!("  {:<10} {}", "record".cyan(), key);
                }
                if ex.custom {
                    println!("  {}", "custom exercise".magenta());
                }
            });
        }

        ExerciseCmd::Add {
            name,
            pattern,
            equipment,
            muscles,
        } => {
            let pattern = movement_pattern(&pattern)?;
            let equipment = equipment_set(&equipment)?;
            let muscles = parse_label_list::<Muscle>(&muscles).map_err(|e| anyhow!(e))?;

            let catalog = storage::catalog(pool).await?;
            if let Some(existing) = catalog.find(&name) {
                println!(
                    "{} `{}` already exists as `{}`",
                    "warning:".yellow().bold(),
                    name,
                    existing.id
                );
                return Ok(());
            }

            let exercise = Exercise::custom(&name, pattern, equipment, muscles)
                .context("Invalid custom exercise")?;
            storage::add_custom_exercise(pool, &exercise).await?;
            println!("{} added `{}` as `{}`", "ok:".green().bold(), exercise.name, exercise.id);
        }

        ExerciseCmd::Delete { id } => {
            if storage::delete_custom_exercise(pool, &id).await? {
                println!("{} deleted `{}`", "ok:".green().bold(), id);
            } else if ExerciseCatalog::builtin().get(&id).is_some() {
                println!(
                    "{} `{}` is a built-in exercise and cannot be deleted",
                    "error:".red().bold(),
                    id
                );
            } else {
                println!("{} no custom exercise `{}`", "warning:".yellow().bold(), id);
            }
        }

        ExerciseCmd::Swaps {
            exercise,
            equipment,
        } => {
            let catalog = storage::catalog(pool).await?;
            let source = lookup(&catalog, &exercise)?;

            let available = match equipment {
                Some(csv) => equipment_set(&csv)?,
                None => storage::load_profile(pool).await?.equipment,
            };
            if available.is_empty() {
                println!(
                    "{} no equipment set; run `ironplan profile equipment` or pass --equipment",
                    "info:".blue().bold()
                );
            }

            let swaps = substitution::swaps_for(&catalog, &source.id, &available)?;

            emit(fmt, &swaps, || {
                println!(
                    "{} {} ({})",
                    "Swaps for".cyan().bold(),
                    source.id.bold(),
                    source.pattern.as_str().yellow()
                );
                for (i, ex) in swaps.iter().enumerate() {
                    let shared = ex.muscles.intersection(&source.muscles).count();
                    println!(
                        " {:>2} • {} {}",
                        (i + 1).to_string().yellow(),
                        ex.id.bold(),
                        format!("– {} shared muscle(s)", shared).dimmed()
                    );
                }
                if swaps.is_empty() {
                    println!("{}", "  (no usable substitutes)".dimmed());
                }
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_and_equipment_arguments_parse() {
        assert_eq!(movement_pattern("hip-hinge").unwrap(), MovementPattern::HipHinge);
        let err = movement_pattern("hinge-ish").unwrap_err();
        assert!(!err.to_string().is_empty());

        let eq = equipment_set("barbell, bench").unwrap();
        assert_eq!(eq, BTreeSet::from([Equipment::Barbell, Equipment::Bench]));
        assert!(equipment_set("barbell, anvil").is_err());
    }
}

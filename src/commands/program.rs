use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use colored::Colorize;
use serde::Serialize;

use crate::{
    cli::ProgramCmd,
    commands::{OutputFmt, date_or_today, emit},
};
use ironplan::{
    config::EngineSettings,
    db::DB,
    error::IssueKind,
    phase::{DailyPrescription, ExercisePrescription, Session, Slot},
    progression::ModelRegistry,
    storage::{self, StoredProgram},
    template::{self, Program, TemplateDocument, ValidationReport},
    utils::format_minutes,
};

fn read_document(file: &str) -> Result<TemplateDocument> {
    let path = Path::new(file);
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read template: {}", file))?;
    let ext = path.extension().and_then(|e| e.to_str());
    TemplateDocument::parse(&text, ext).with_context(|| format!("Could not parse `{}`", file))
}

/// Validates against the stored catalog and the configured models.
async fn check(pool: &DB, settings: &EngineSettings, doc: &TemplateDocument) -> Result<ValidationReport> {
    let catalog = storage::catalog(pool).await?;
    let registry = ModelRegistry::new(&settings.progression).context("Invalid progression settings")?;
    Ok(template::validate(doc, &catalog, &registry))
}

fn print_report(report: &ValidationReport) {
    for issue in &report.issues {
        let kind = match issue.kind {
            IssueKind::Structure => "structure",
            IssueKind::Reference => "reference",
        };
        println!(
            "{} {} {} {}",
            "error:".red().bold(),
            format!("[{}]", kind).dimmed(),
            issue.field.yellow(),
            issue.message
        );
    }
}

/// Loads a stored program and regenerates its calendar for the current profile.
pub async fn load(
    pool: &DB,
    settings: &EngineSettings,
    key: Option<&str>,
) -> Result<(StoredProgram, Program)> {
    let Some((stored, doc)) = storage::get_program(pool, key).await? else {
        match key {
            Some(key) => bail!("no program `{}`", key),
            None => bail!("no programs imported yet; run `ironplan program import <FILE>`"),
        }
    };

    let catalog = storage::catalog(pool).await?;
    let profile = storage::load_profile(pool).await?;
    let registry = ModelRegistry::new(&settings.progression).context("Invalid progression settings")?;

    let program = template::materialize(&doc, &profile, &catalog, &registry)
        .with_context(|| format!("Stored program `{}` no longer materializes", stored.name))?;
    Ok((stored, program))
}

fn exercise_line(p: &ExercisePrescription) -> String {
    let mut line = format!("{} {}x{}", p.exercise_id.bold(), p.sets, p.reps);
    if let Some(pct) = p.intensity_percent {
        line.push_str(&format!(" @ {:.1}%", pct));
    }
    if let Some(w) = p.target_weight {
        line.push_str(&format!(" {}", format!("({} kg)", w).green()));
    }
    if let Some(rpe) = p.rpe {
        line.push_str(&format!(" rpe {}", rpe));
    }
    if let Some(rest) = p.rest_seconds {
        line.push_str(&format!(" {}", format!("rest {}s", rest).dimmed()));
    }
    match &p.slot {
        Slot::Prescribed => {}
        Slot::Substituted { original } => {
            line.push_str(&format!(" {}", format!("(swapped for {})", original).yellow()));
        }
        Slot::Unresolved => line.push_str(&format!(" {}", "(no usable swap)".red())),
    }
    line
}

/// One-line description of a session, used by listings and the calendar.
pub fn session_summary(session: &Session) -> String {
    match session {
        Session::Strength { exercises }
        | Session::MuscularEndurance { exercises }
        | Session::Mobility { exercises } => {
            format!("{} ({} exercises)", session.session_type().as_str(), exercises.len())
        }
        Session::Cardio(c) => format!(
            "{} {} {}",
            c.activity,
            c.zone.as_str().to_uppercase(),
            format_minutes(c.duration_min)
        ),
        Session::Recovery { duration_min, .. } => match duration_min {
            Some(m) => format!("recovery {}", format_minutes(*m)),
            None => "rest".to_string(),
        },
    }
}

fn print_day(day: &DailyPrescription, date: Option<NaiveDate>) {
    let label = format!("Day {}", day.day);
    let date = date
        .map(|d| d.format(" %a %b %d").to_string())
        .unwrap_or_default();
    println!(
        "  {}{} {} {}",
        label.cyan(),
        date.dimmed(),
        "|".blue(),
        session_summary(&day.session)
    );

    match &day.session {
        Session::Cardio(c) => {
            if let Some((lo, hi)) = c.target_hr {
                println!("      {}", format!("target {}-{} bpm", lo, hi).dimmed());
            }
        }
        Session::Recovery { note: Some(note), .. } => println!("      {}", note.dimmed()),
        _ => {
            for p in day.session.exercises() {
                println!("      • {}", exercise_line(p));
            }
        }
    }
}

#[derive(Serialize)]
struct ImportJson<'a> {
    program: &'a StoredProgram,
    total_weeks: u32,
    warnings: Vec<String>,
}

pub async fn handle(cmd: ProgramCmd, pool: &DB, settings: &EngineSettings, fmt: OutputFmt) -> Result<()> {
    match cmd {
        ProgramCmd::Import { file, start } => {
            let doc = read_document(&file)?;
            let report = check(pool, settings, &doc).await?;
            if !report.is_valid() {
                print_report(&report);
                bail!("`{}` has {} problem(s); nothing imported", file, report.issues.len());
            }

            // Substitution warnings are reported before storing.
            let catalog = storage::catalog(pool).await?;
            let profile = storage::load_profile(pool).await?;
            let registry = ModelRegistry::new(&settings.progression)?;
            let program = template::materialize(&doc, &profile, &catalog, &registry)?;

            let start = date_or_today(start.as_deref())?;
            let stored = storage::save_program(pool, &doc, start).await?;

            let out = ImportJson {
                program: &stored,
                total_weeks: program.total_weeks(),
                warnings: program.warnings.iter().map(|w| w.to_string()).collect(),
            };
            emit(fmt, &out, || {
                for w in &program.warnings {
                    println!("{} {}", "warning:".yellow().bold(), w);
                }
                println!(
                    "{} imported `{}` ({} weeks, starting {})",
                    "ok:".green().bold(),
                    stored.name,
                    program.total_weeks(),
                    stored.start_date
                );
            });
        }

        ProgramCmd::Validate { file } => {
            let doc = read_document(&file)?;
            let report = check(pool, settings, &doc).await?;

            emit(fmt, &report, || {
                if report.is_valid() {
                    let weeks = doc.declared_weeks().unwrap_or(0);
                    println!("{} `{}` is valid ({} weeks)", "ok:".green().bold(), file, weeks);
                } else {
                    print_report(&report);
                    println!(
                        "\n{} {} problem(s) found",
                        "Summary:".cyan().bold(),
                        report.issues.len()
                    );
                }
            });
        }

        ProgramCmd::List => {
            let progs = storage::list_programs(pool).await?;
            emit(fmt, &progs, || {
                println!("{}", "Programs:".cyan().bold());
                for p in &progs {
                    println!(
                        " • {} {} {}",
                        p.name.bold(),
                        "|".blue(),
                        format!("starts {} · id {}", p.start_date, p.id).dimmed()
                    );
                }
                if progs.is_empty() {
                    println!("{}", "  (no programs imported)".dimmed());
                }
            });
        }

        ProgramCmd::Show { program, week } => {
            let (stored, program) = load(pool, settings, program.as_deref()).await?;
            if let Some(w) = week {
                if w == 0 || w > program.total_weeks() {
                    bail!("week {} is outside 1..={}", w, program.total_weeks());
                }
            }

            let days: Vec<&DailyPrescription> = program
                .days
                .iter()
                .filter(|d| week.is_none_or(|w| d.week == w))
                .collect();

            let mix = template::weekly_mix(&program);

            emit(fmt, &days, || {
                println!("{}", stored.name.bold().cyan());
                if let Some(desc) = &program.description {
                    println!("{}", desc.dimmed());
                }
                for range in program.phase_ranges() {
                    println!(
                        "  {} weeks {}-{}",
                        range.name.yellow(),
                        range.start_week,
                        range.end_week
                    );
                }
                for w in &program.warnings {
                    println!("{} {}", "warning:".yellow().bold(), w);
                }

                let mut current = 0;
                for d in &days {
                    if d.week != current {
                        current = d.week;
                        println!(
                            "\n{} {} {}",
                            format!("Week {}", d.week).bold(),
                            format!("({} week {})", d.phase, d.phase_week).dimmed(),
                            format!(
                                "intensity {:.1}% volume ×{:.2}",
                                d.params.intensity_percent, d.params.volume_multiplier
                            )
                            .dimmed()
                        );
                        if let Some(counts) = mix.get(&d.week) {
                            let summary = counts
                                .iter()
                                .map(|(kind, n)| format!("{} {}", n, kind))
                                .collect::<Vec<_>>()
                                .join(", ");
                            println!("  {}", summary.dimmed());
                        }
                    }
                    print_day(d, Program::date_of(stored.start_date, d.week, d.day));
                }
            });
        }

        ProgramCmd::Today { program, date } => {
            let date = date_or_today(date.as_deref())?;
            let (stored, program) = load(pool, settings, program.as_deref()).await?;

            let day = program.on_date(stored.start_date, date);
            emit(fmt, &day, || match day {
                Some(d) => {
                    println!(
                        "{} {} {}",
                        stored.name.bold().cyan(),
                        format!("week {} · {}", d.week, d.phase).dimmed(),
                        if date == Local::now().date_naive() {
                            "(today)".green().to_string()
                        } else {
                            String::new()
                        }
                    );
                    print_day(d, Some(date));
                }
                None => println!(
                    "{} `{}` does not cover {} (starts {}, {} weeks)",
                    "info:".blue().bold(),
                    stored.name,
                    date,
                    stored.start_date,
                    program.total_weeks()
                ),
            });
        }

        ProgramCmd::Delete { program } => {
            if storage::delete_program(pool, &program).await? {
                println!("{} deleted `{}`", "ok:".green().bold(), program);
            } else {
                println!("{} no program `{}`", "warning:".yellow().bold(), program);
            }
        }
    }

    Ok(())
}

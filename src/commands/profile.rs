use anyhow::{Result, anyhow, bail};
use colored::Colorize;

use crate::{
    cli::ProfileCmd,
    commands::{OutputFmt, date_or_today, emit},
};
use ironplan::{
    catalog::ExerciseCatalog,
    db::DB,
    models::AthleteProfile,
    storage,
    types::{Equipment, HrZone, parse_label_list},
};

fn print_profile(profile: &AthleteProfile) {
    println!("{}", "Profile:".cyan().bold());

    let opt = |v: Option<String>| v.unwrap_or_else(|| "–".dimmed().to_string());
    println!("  {:<14} {}", "body weight".green(), opt(profile.body_weight.map(|w| format!("{} kg", w))));
    println!("  {:<14} {}", "max hr".green(), opt(profile.benchmarks.max_hr.map(|h| h.to_string())));
    println!(
        "  {:<14} {}",
        "aerobic".green(),
        opt(profile.benchmarks.aerobic_threshold_hr.map(|h| h.to_string()))
    );
    println!(
        "  {:<14} {}",
        "anaerobic".green(),
        opt(profile.benchmarks.anaerobic_threshold_hr.map(|h| h.to_string()))
    );

    let equipment = profile
        .equipment
        .iter()
        .map(|e| e.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "  {:<14} {}",
        "equipment".green(),
        if equipment.is_empty() { "–".dimmed().to_string() } else { equipment }
    );

    if let Some(max) = profile.benchmarks.max_hr {
        println!("\n{}", "Heart-rate zones:".cyan().bold());
        for zone in HrZone::ALL {
            let (lo, hi) = zone.bpm_range(max);
            println!("  {} {}-{} bpm", zone.as_str().to_uppercase().yellow(), lo, hi);
        }
    }

    println!("\n{}", "Records:".cyan().bold());
    for (key, pr) in &profile.personal_records {
        println!("  {} {} {}", key.bold(), pr.value, format!("({})", pr.date).dimmed());
    }
    if profile.personal_records.is_empty() {
        println!("{}", "  (no records yet)".dimmed());
    }
}

pub async fn handle(cmd: ProfileCmd, pool: &DB, fmt: OutputFmt) -> Result<()> {
    let mut profile = storage::load_profile(pool).await?;

    match cmd {
        ProfileCmd::Show => {
            emit(fmt, &profile, || print_profile(&profile));
        }

        ProfileCmd::Set {
            body_weight,
            max_hr,
            aerobic,
            anaerobic,
        } => {
            if body_weight.is_none() && max_hr.is_none() && aerobic.is_none() && anaerobic.is_none() {
                bail!("nothing to set; pass --body-weight, --max-hr, --aerobic or --anaerobic");
            }
            if body_weight.is_some_and(|w| w <= 0.0) {
                bail!("body weight must be positive");
            }

            if body_weight.is_some() {
                profile.body_weight = body_weight;
            }
            let hr = &mut profile.benchmarks;
            if max_hr.is_some() {
                hr.max_hr = max_hr;
            }
            if aerobic.is_some() {
                hr.aerobic_threshold_hr = aerobic;
            }
            if anaerobic.is_some() {
                hr.anaerobic_threshold_hr = anaerobic;
            }

            if let (Some(max), Some(t)) = (hr.max_hr, hr.anaerobic_threshold_hr) {
                if t > max {
                    println!(
                        "{} anaerobic threshold ({}) is above max hr ({})",
                        "warning:".yellow().bold(),
                        t,
                        max
                    );
                }
            }

            storage::save_profile(pool, &profile).await?;
            println!("{} profile updated", "ok:".green().bold());
        }

        ProfileCmd::Equipment { equipment } => {
            let items = parse_label_list::<Equipment>(&equipment).map_err(|e| anyhow!(e))?;
            profile.equipment = items.into_iter().collect();
            storage::save_profile(pool, &profile).await?;
            println!(
                "{} equipment set to {}",
                "ok:".green().bold(),
                profile
                    .equipment
                    .iter()
                    .map(|e| e.as_str().yellow().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        ProfileCmd::Pr { key, value, date } => {
            if value <= 0.0 {
                bail!("record value must be positive");
            }
            let known = ExerciseCatalog::builtin()
                .iter()
                .any(|ex| ex.pr_key.as_deref() == Some(key.as_str()));
            if !known {
                println!(
                    "{} no catalog exercise uses record key `{}`; it will not drive target weights",
                    "warning:".yellow().bold(),
                    key
                );
            }

            let date = date_or_today(date.as_deref())?;
            let previous = profile.pr(&key);
            profile.set_pr(&key, value, date);
            storage::save_profile(pool, &profile).await?;

            match previous {
                Some(prev) => println!("{} `{}` {} → {}", "ok:".green().bold(), key, prev, value),
                None => println!("{} `{}` = {}", "ok:".green().bold(), key, value),
            }
        }
    }

    Ok(())
}

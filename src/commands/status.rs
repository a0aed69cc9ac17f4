use anyhow::{Result, bail};
use chrono::{Days, Local, NaiveDate};
use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::commands::{OutputFmt, emit};
use ironplan::{
    config::EngineSettings,
    db::DB,
    load::{AcrZone, TrainingLoadCalculator, TrainingLoadPoint},
    readiness::ReadinessEngine,
    storage,
};

/// One line on the chart.
struct Series<'a> {
    label: &'a str,
    mark: char,
    values: Vec<f64>,
}

fn row_of(value: f64, min: f64, range: f64, height: usize) -> usize {
    let y = ((value - min) / range * (height - 1) as f64).round() as usize;
    height - 1 - y.min(height - 1) // Flip the y-axis
}

/// Plots series that share the `dates` axis. Later series draw over earlier ones.
fn create_ascii_graph(dates: &[NaiveDate], series: &[Series], width: usize, height: usize, title: &str) -> Vec<String> {
    if dates.len() < 2 || width < 2 || height < 2 {
        return vec!["Not enough data to graph".to_string()];
    }

    let all = || series.iter().flat_map(|s| s.values.iter().copied());
    let min_value = all().fold(f64::INFINITY, f64::min).min(0.0);
    let max_value = all().fold(f64::NEG_INFINITY, f64::max);
    let range = max_value - min_value;

    if range <= 0.0 {
        return vec!["No variation in data".to_string()];
    }

    let mut grid = vec![vec![' '; width]; height];
    let col = |i: usize| (i as f64 / (dates.len() - 1) as f64 * (width - 1) as f64).round() as usize;

    for s in series {
        for (i, &value) in s.values.iter().enumerate() {
            let x = col(i);
            let y = row_of(value, min_value, range, height);

            // Draw connecting lines
            if i > 0 {
                let prev_x = col(i - 1) as isize;
                let prev_y = row_of(s.values[i - 1], min_value, range, height) as isize;
                let dx = x as isize - prev_x;
                let dy = y as isize - prev_y;
                let steps = dx.abs().max(dy.abs());

                for step in 1..steps {
                    let px = (prev_x + dx * step / steps) as usize;
                    let py = (prev_y + dy * step / steps) as usize;
                    if px < width && py < height && grid[py][px] == ' ' {
                        grid[py][px] = '·';
                    }
                }
            }

            if x < width {
                grid[y][x] = s.mark;
            }
        }
    }

    let mut result = Vec::new();
    let step = range / (height - 1) as f64;

    let legend = series
        .iter()
        .map(|s| format!("{} {}", s.mark, s.label))
        .collect::<Vec<_>>()
        .join("  ");
    result.push(format!("\n{} {}", title.bold(), legend.dimmed()));
    result.push("─".repeat(width + 7));

    for (i, row) in grid.iter().enumerate() {
        let value = min_value + step * (height - 1 - i) as f64;
        result.push(format!("{:5.0} │{}", value, row.iter().collect::<String>()));
    }

    result.push(format!("      └{}", "─".repeat(width)));

    let first = dates[0].format("%Y-%m-%d").to_string();
    let last = dates[dates.len() - 1].format("%Y-%m-%d").to_string();
    let gap = (width + 1).saturating_sub(first.len() + last.len()).max(2);
    result.push(format!("       {}{}{}", first, " ".repeat(gap), last));

    result
}

fn paint_zone(zone: Option<AcrZone>) -> ColoredString {
    match zone {
        Some(AcrZone::Optimal) => "optimal".green(),
        Some(AcrZone::Caution) => "caution".yellow(),
        Some(AcrZone::Overreaching) => "overreaching".red().bold(),
        Some(AcrZone::Detraining) => "detraining".blue(),
        None => "–".dimmed(),
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    from: NaiveDate,
    to: NaiveDate,
    points: &'a [TrainingLoadPoint],
    readiness: Option<u8>,
}

pub async fn handle(days: u32, graph: bool, pool: &DB, settings: &EngineSettings, fmt: OutputFmt) -> Result<()> {
    if days == 0 {
        bail!("--days must be at least 1");
    }
    let to = Local::now().date_naive();
    let from = to.checked_sub_days(Days::new(days as u64 - 1)).unwrap_or(to);

    // The averages need the whole history; only the window is shown.
    let logs = storage::list_logs(pool, None, Some(to)).await?;
    let calc = TrainingLoadCalculator::new(settings.load);
    let all = calc.compute(&logs);
    let start = all.partition_point(|p| p.date < from);
    let points = &all[start..];

    let readiness = storage::list_readiness(pool).await?;
    let today = ReadinessEngine::new(settings.readiness)
        .aggregate(&readiness, to, 1)
        .days
        .first()
        .and_then(|d| d.score);

    let out = StatusJson {
        from,
        to,
        points,
        readiness: today,
    };

    emit(fmt, &out, || {
        println!(
            "{} {} → {} {}",
            "Training load".cyan().bold(),
            from,
            to,
            format!("(ATL {}d, CTL {}d)", settings.load.atl_days, settings.load.ctl_days).dimmed()
        );

        let Some(last) = points.last() else {
            println!("{}", "  (no completed workouts in this period)".dimmed());
            return;
        };

        if graph {
            let (term_width, term_height) = term_size::dimensions().unwrap_or((80, 24));
            let width = (term_width / 2).min(60);
            let height = (term_height / 2).min(15);

            let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
            let series = [
                Series {
                    label: "CTL",
                    mark: '○',
                    values: points.iter().map(|p| p.ctl).collect(),
                },
                Series {
                    label: "ATL",
                    mark: '●',
                    values: points.iter().map(|p| p.atl).collect(),
                },
            ];
            for line in create_ascii_graph(&dates, &series, width, height, "Acute vs chronic load") {
                println!("{}", line);
            }
        } else {
            println!(
                "  {:<10} {:>7} {:>7} {:>7} {:>6}  {}",
                "date".dimmed(),
                "load".dimmed(),
                "ATL".dimmed(),
                "CTL".dimmed(),
                "ACR".dimmed(),
                "zone".dimmed()
            );
            for p in points {
                let acr = p.acr.map(|a| format!("{:.2}", a)).unwrap_or_else(|| "–".into());
                println!(
                    "  {:<10} {:>7.1} {:>7.1} {:>7.1} {:>6}  {}",
                    p.date.to_string(),
                    p.load,
                    p.atl,
                    p.ctl,
                    acr,
                    paint_zone(p.zone)
                );
            }
        }

        println!();
        println!(
            "{} ATL {:.1} · CTL {:.1} · ACR {} ({})",
            "Latest:".cyan().bold(),
            last.atl,
            last.ctl,
            last.acr.map(|a| format!("{:.2}", a)).unwrap_or_else(|| "–".into()),
            paint_zone(last.zone)
        );
        if let Some(score) = today {
            println!("{} {} today", "Readiness:".cyan().bold(), score);
        }
        if last.zone == Some(AcrZone::Overreaching) {
            println!(
                "{} acute load is well above your chronic base; consider a lighter day",
                "warning:".yellow().bold()
            );
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_output_carries_todays_score() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let out = StatusJson {
            from: day,
            to: day,
            points: &[],
            readiness: Some(72),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["readiness"], 72);
        assert_eq!(json["points"], serde_json::json!([]));
    }

    fn dates(n: u64) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        (0..n).map(|i| start + Days::new(i)).collect()
    }

    #[test]
    fn graph_needs_two_points() {
        let series = [Series {
            label: "ATL",
            mark: '●',
            values: vec![1.0],
        }];
        assert_eq!(
            create_ascii_graph(&dates(1), &series, 20, 5, "t"),
            vec!["Not enough data to graph".to_string()]
        );
    }

    #[test]
    fn graph_marks_extremes_on_first_and_last_rows() {
        let series = [Series {
            label: "ATL",
            mark: '●',
            values: vec![0.0, 5.0, 10.0],
        }];
        let lines = create_ascii_graph(&dates(3), &series, 21, 6, "t");
        // Title, rule, 6 grid rows, axis, dates.
        assert_eq!(lines.len(), 10);

        let top: Vec<char> = lines[2].chars().collect();
        let bottom: Vec<char> = lines[7].chars().collect();
        assert_eq!(top.last(), Some(&'●'));
        assert_eq!(bottom[7], '●');
        assert!(lines[2].trim_start().starts_with("10"));
    }
}

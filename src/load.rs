//! Acute and chronic training load.
//!
//! Loads are recomputed from the full log every time; nothing here keeps
//! state between calls, so editing or deleting a past entry changes every
//! later point.

use std::{collections::BTreeMap, fmt::Display};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::WorkoutLogEntry;

/// ACR band lower bounds, highest first. Each bound belongs to its own band.
const ACR_BANDS: [(f64, AcrZone); 3] = [
    (1.5, AcrZone::Overreaching),
    (1.3, AcrZone::Caution),
    (0.8, AcrZone::Optimal),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcrZone {
    Detraining,
    Optimal,
    Caution,
    Overreaching,
}

impl AcrZone {
    pub fn classify(acr: f64) -> Self {
        ACR_BANDS
            .iter()
            .find(|(lower, _)| acr >= *lower)
            .map(|(_, zone)| *zone)
            .unwrap_or(Self::Detraining)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detraining => "detraining",
            Self::Optimal => "optimal",
            Self::Caution => "caution",
            Self::Overreaching => "overreaching",
        }
    }
}

impl Display for AcrZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadSettings {
    /// ATL time constant in days.
    pub atl_days: f64,
    /// CTL time constant in days.
    pub ctl_days: f64,
    /// Intensity proxy for sets logged without an RPE.
    pub default_intensity: f64,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            atl_days: 7.0,
            ctl_days: 28.0,
            default_intensity: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingLoadPoint {
    pub date: NaiveDate,
    /// Summed session load for the date.
    pub load: f64,
    pub atl: f64,
    pub ctl: f64,
    /// `None` while CTL is zero.
    pub acr: Option<f64>,
    pub zone: Option<AcrZone>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingLoadCalculator {
    settings: LoadSettings,
}

impl TrainingLoadCalculator {
    pub fn new(settings: LoadSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    /// `sets × reps × intensity` summed over a completed session.
    ///
    /// Intensity is RPE / 10 when logged, otherwise the configured default.
    /// Rep ranges count at their midpoint; entries without a numeric rep
    /// count contribute nothing.
    pub fn session_load(&self, entry: &WorkoutLogEntry) -> f64 {
        if !entry.completed {
            return 0.0;
        }
        entry
            .exercises
            .iter()
            .filter_map(|ex| {
                let reps = ex.reps_estimate()?;
                let proxy = ex
                    .rpe
                    .map(|rpe| rpe / 10.0)
                    .unwrap_or(self.settings.default_intensity);
                Some(ex.sets as f64 * reps * proxy)
            })
            .sum()
    }

    /// Summed load per date, in date order. Sums do not depend on entry order.
    pub fn daily_loads(&self, entries: &[WorkoutLogEntry]) -> BTreeMap<NaiveDate, f64> {
        let mut per_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for entry in entries {
            per_day
                .entry(entry.date)
                .or_default()
                .push(self.session_load(entry));
        }
        per_day
            .into_iter()
            .map(|(date, mut loads)| {
                loads.sort_by(f64::total_cmp);
                (date, loads.into_iter().sum())
            })
            .collect()
    }

    /// One point per logged date.
    ///
    /// Both averages are seeded with the first day's load and then stepped
    /// once per calendar day, so unlogged days decay the averages with a load
    /// of zero.
    pub fn compute(&self, entries: &[WorkoutLogEntry]) -> Vec<TrainingLoadPoint> {
        let daily = self.daily_loads(entries);
        let Some((&first, &seed)) = daily.iter().next() else {
            return Vec::new();
        };
        let Some(&last) = daily.keys().next_back() else {
            return Vec::new();
        };

        let k_atl = smoothing(self.settings.atl_days);
        let k_ctl = smoothing(self.settings.ctl_days);
        let (mut atl, mut ctl) = (seed, seed);

        let mut points = Vec::with_capacity(daily.len());
        let mut date = first;
        loop {
            let load = daily.get(&date).copied();
            if date != first {
                let today = load.unwrap_or(0.0);
                atl += k_atl * (today - atl);
                ctl += k_ctl * (today - ctl);
            }

            if let Some(load) = load {
                let acr = (ctl > 0.0).then(|| atl / ctl);
                points.push(TrainingLoadPoint {
                    date,
                    load,
                    atl,
                    ctl,
                    acr,
                    zone: acr.map(AcrZone::classify),
                });
            }

            if date >= last {
                break;
            }
            match date.checked_add_days(Days::new(1)) {
                Some(next) => date = next,
                None => break,
            }
        }

        debug!(
            entries = entries.len(),
            points = points.len(),
            from = %first,
            to = %last,
            "computed training load"
        );
        points
    }
}

/// Per-day EWMA weight for a time constant of `days`.
fn smoothing(days: f64) -> f64 {
    if days <= 0.0 {
        1.0
    } else {
        1.0 - (-1.0 / days).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PerformedExercise;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn date(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Days::new(offset)
    }

    fn session(offset: u64, sets: u32, reps: &str, rpe: Option<f64>) -> WorkoutLogEntry {
        WorkoutLogEntry {
            id: format!("log-{offset}-{sets}-{reps}"),
            date: date(offset),
            label: "session".into(),
            session_type: None,
            completed: true,
            duration_min: None,
            exercises: vec![PerformedExercise {
                name: "backSquat".into(),
                weight: Some(100.0),
                sets,
                reps: reps.into(),
                rpe,
                note: None,
            }],
        }
    }

    #[test]
    fn empty_log_has_no_points() {
        assert!(TrainingLoadCalculator::default().compute(&[]).is_empty());
    }

    #[test]
    fn single_day_is_balanced() {
        let points = TrainingLoadCalculator::default().compute(&[session(0, 5, "5", Some(8.0))]);
        assert_eq!(points.len(), 1);
        let p = points[0];
        assert_eq!(p.load, 20.0);
        assert_eq!(p.atl, 20.0);
        assert_eq!(p.ctl, 20.0);
        assert_eq!(p.acr, Some(1.0));
        assert_eq!(p.zone, Some(AcrZone::Optimal));
    }

    #[test]
    fn session_load_uses_midpoint_and_default_intensity() {
        let calc = TrainingLoadCalculator::default();
        // 3 × 9 × 0.7
        assert!((calc.session_load(&session(0, 3, "8-10", None)) - 18.9).abs() < 1e-9);

        let mut skipped = session(0, 3, "5", None);
        skipped.completed = false;
        assert_eq!(calc.session_load(&skipped), 0.0);
        assert_eq!(calc.session_load(&session(0, 3, "AMRAP", Some(9.0))), 0.0);
    }

    #[test]
    fn same_day_sessions_are_summed() {
        let calc = TrainingLoadCalculator::default();
        let points = calc.compute(&[session(0, 5, "5", Some(8.0)), session(0, 2, "10", Some(5.0))]);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].load, 30.0);
    }

    #[test]
    fn gaps_still_decay() {
        let calc = TrainingLoadCalculator::default();
        let log = [session(0, 5, "10", Some(10.0)), session(14, 1, "1", Some(1.0))];
        let points = calc.compute(&log);

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].date, date(14));
        // Fourteen days of stepping, thirteen of them at zero load.
        let k = 1.0 - (-1.0f64 / 7.0).exp();
        let mut atl = 50.0;
        for _ in 0..13 {
            atl -= k * atl;
        }
        atl += k * (0.1 - atl);
        assert!((points[1].atl - atl).abs() < 1e-9);
        assert!(points[1].atl < points[1].ctl);
        assert_eq!(points[1].zone, Some(AcrZone::Detraining));
    }

    #[test]
    fn spike_after_base_is_overreaching() {
        let calc = TrainingLoadCalculator::default();
        let mut log: Vec<_> = (0..28).map(|d| session(d, 3, "5", Some(7.0))).collect();
        log.extend((28..35).map(|d| session(d, 10, "10", Some(9.0))));

        let last = *calc.compute(&log).last().unwrap();
        assert!(last.acr.unwrap() >= 1.5);
        assert_eq!(last.zone, Some(AcrZone::Overreaching));
    }

    #[test]
    fn zero_chronic_load_has_no_ratio() {
        let mut entry = session(0, 3, "5", None);
        entry.completed = false;
        let points = TrainingLoadCalculator::default().compute(&[entry]);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].ctl, 0.0);
        assert_eq!(points[0].acr, None);
        assert_eq!(points[0].zone, None);
    }

    #[test]
    fn band_edges_belong_to_the_upper_band() {
        assert_eq!(AcrZone::classify(0.79), AcrZone::Detraining);
        assert_eq!(AcrZone::classify(0.8), AcrZone::Optimal);
        assert_eq!(AcrZone::classify(1.29), AcrZone::Optimal);
        assert_eq!(AcrZone::classify(1.3), AcrZone::Caution);
        assert_eq!(AcrZone::classify(1.5), AcrZone::Overreaching);
    }

    #[test]
    fn deleting_history_changes_later_points() {
        let calc = TrainingLoadCalculator::default();
        let full = vec![session(0, 5, "5", None), session(3, 5, "5", None), session(6, 5, "5", None)];
        let edited = vec![full[0].clone(), full[2].clone()];

        let a = calc.compute(&full);
        let b = calc.compute(&edited);
        assert_ne!(a.last().unwrap().atl, b.last().unwrap().atl);
    }

    proptest! {
        #[test]
        fn compute_is_pure_and_order_independent(
            days in prop::collection::vec((0u64..60, 1u32..6, 1u32..12), 1..40)
        ) {
            let calc = TrainingLoadCalculator::default();
            let log: Vec<_> = days
                .iter()
                .map(|(d, sets, reps)| session(*d, *sets, &reps.to_string(), None))
                .collect();
            let mut reversed = log.clone();
            reversed.reverse();

            let first = calc.compute(&log);
            prop_assert_eq!(&first, &calc.compute(&log));
            prop_assert_eq!(&first, &calc.compute(&reversed));

            let distinct: std::collections::BTreeSet<_> = days.iter().map(|(d, _, _)| *d).collect();
            prop_assert_eq!(first.len(), distinct.len());
            for p in &first {
                prop_assert!(p.atl >= 0.0 && p.ctl >= 0.0);
            }
        }
    }
}

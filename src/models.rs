use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    catalog::ExerciseCatalog,
    phase::Reps,
    types::{Equipment, SessionType},
    utils::calculate_1rm,
};

/// Best known value for one record key, e.g. a back-squat 1RM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecord {
    pub value: f64,
    pub date: NaiveDate,
}

/// Test results that parameterize heart-rate zones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks {
    pub max_hr: Option<u32>,
    pub aerobic_threshold_hr: Option<u32>,
    pub anaerobic_threshold_hr: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub equipment: BTreeSet<Equipment>,
    pub body_weight: Option<f64>,
    pub personal_records: BTreeMap<String, PersonalRecord>,
    pub benchmarks: Benchmarks,
}

impl AthleteProfile {
    pub fn pr(&self, key: &str) -> Option<f64> {
        self.personal_records.get(key).map(|r| r.value)
    }

    pub fn set_pr(&mut self, key: &str, value: f64, date: NaiveDate) {
        self.personal_records
            .insert(key.to_string(), PersonalRecord { value, date });
    }
}

/// One exercise as it was actually performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformedExercise {
    /// Catalog id or display name.
    pub name: String,
    pub weight: Option<f64>,
    pub sets: u32,
    /// Free-form as entered, e.g. `5` or `8-10`.
    pub reps: String,
    pub rpe: Option<f64>,
    pub note: Option<String>,
}

impl PerformedExercise {
    /// Reps as a number for load math; ranges count at their midpoint.
    pub fn reps_estimate(&self) -> Option<f64> {
        self.reps.parse::<Reps>().ok().and_then(|r| r.midpoint())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutLogEntry {
    pub id: String,
    pub date: NaiveDate,
    pub label: String,
    pub session_type: Option<SessionType>,
    pub completed: bool,
    pub duration_min: Option<u32>,
    pub exercises: Vec<PerformedExercise>,
}

/// A daily check-in. Every factor is 1-5; soreness counts against readiness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessEntry {
    pub date: NaiveDate,
    pub sleep_quality: Option<u8>,
    pub energy: Option<u8>,
    pub soreness: Option<u8>,
    pub motivation: Option<u8>,
    pub resting_hr: Option<u32>,
    pub hrv: Option<f64>,
    pub note: Option<String>,
}

/// A personal record raised by a logged session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrUpdate {
    pub key: String,
    pub previous: Option<f64>,
    pub value: f64,
    pub date: NaiveDate,
}

/// Raises personal records that a completed session beat.
///
/// Each weighted exercise that maps to a catalog record key is estimated with
/// Epley; the profile only ever moves up. Ranges are estimated from their low
/// end so an optimistic range never inflates a record.
pub fn apply_log_to_profile(
    profile: &mut AthleteProfile,
    entry: &WorkoutLogEntry,
    catalog: &ExerciseCatalog,
) -> Vec<PrUpdate> {
    if !entry.completed {
        return Vec::new();
    }

    let mut updates: Vec<PrUpdate> = Vec::new();

    for performed in &entry.exercises {
        let Some(key) = catalog
            .find(&performed.name)
            .and_then(|ex| ex.pr_key.as_deref())
        else {
            continue;
        };
        let Some(weight) = performed.weight.filter(|w| *w > 0.0) else {
            continue;
        };
        let reps = match performed.reps.parse::<Reps>() {
            Ok(Reps::Fixed(n)) | Ok(Reps::Range(n, _)) => n,
            _ => continue,
        };

        let estimate = calculate_1rm(weight, reps);
        let previous = profile.pr(key);
        if previous.is_some_and(|p| p >= estimate) {
            continue;
        }

        debug!(key, estimate, ?previous, "personal record raised");
        profile.set_pr(key, estimate, entry.date);

        match updates.iter_mut().find(|u| u.key == key) {
            Some(existing) => existing.value = estimate,
            None => updates.push(PrUpdate {
                key: key.to_string(),
                previous,
                value: estimate,
                date: entry.date,
            }),
        }
    }

    updates
}

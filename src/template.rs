//! Authored program documents: parsing, validation and materialization.
//!
//! A [`TemplateDocument`] mirrors what a person writes by hand, so most of
//! its fields are loosely typed. [`validate`] walks the whole document and
//! reports every problem at once; [`materialize`] turns a valid document
//! into a [`Program`] for one athlete.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{Days, NaiveDate};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    catalog::{Exercise, ExerciseCatalog},
    error::{EngineError, EngineResult, ValidationIssue, Warning},
    models::AthleteProfile,
    phase::{
        CardioPrescription, DailyPrescription, DayTemplate, ExercisePrescription, Phase, Reps,
        Session, Slot, expand,
    },
    progression::ModelRegistry,
    substitution,
    types::{Equipment, HrZone, MovementPattern, Muscle, SessionType},
    utils::round_to_nearest,
};

/// Plate increment used for prescribed loads.
pub const LOAD_INCREMENT: f64 = 2.5;

/// Longest program a document may describe, in weeks.
pub const MAX_WEEKS: i64 = 520;

//
// Document
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// When present it must agree with the phases.
    #[serde(default)]
    pub total_weeks: Option<i64>,
    #[serde(default)]
    pub custom_exercises: Vec<CustomExerciseDoc>,
    #[serde(default)]
    pub phases: Vec<PhaseDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomExerciseDoc {
    pub id: String,
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub muscles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDoc {
    pub name: String,
    pub start_week: i64,
    pub end_week: i64,
    pub model: String,
    #[serde(default)]
    pub days: Vec<DayDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayDoc {
    pub day: i64,
    #[serde(rename = "type")]
    pub session_type: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseDoc>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub duration_min: Option<i64>,
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDoc {
    #[serde(alias = "exercise")]
    pub id: String,
    pub sets: i64,
    pub reps: RepsDoc,
    #[serde(default)]
    pub max_reps: Option<i64>,
    #[serde(default, alias = "intensity_percent")]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub rpe: Option<f64>,
    #[serde(default, alias = "rest")]
    pub rest_seconds: Option<i64>,
}

/// Reps as written: `5` or `"8-10"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepsDoc {
    Count(i64),
    Text(String),
}

impl RepsDoc {
    fn as_text(&self) -> String {
        match self {
            Self::Count(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl TemplateDocument {
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        toml::from_str(text).map_err(|e| EngineError::Malformed {
            format: "toml",
            message: e.message().to_string(),
        })
    }

    pub fn from_json_str(text: &str) -> EngineResult<Self> {
        serde_json::from_str(text).map_err(|e| EngineError::Malformed {
            format: "json",
            message: e.to_string(),
        })
    }

    /// Picks the parser from a file extension; anything but `json` is read as TOML.
    pub fn parse(text: &str, extension: Option<&str>) -> EngineResult<Self> {
        match extension.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::from_json_str(text),
            _ => Self::from_toml_str(text),
        }
    }

    pub fn declared_weeks(&self) -> Option<u32> {
        self.phases
            .iter()
            .map(|p| p.end_week)
            .max()
            .and_then(|w| u32::try_from(w).ok())
    }
}

//
// Validation
//

/// Every problem found in a document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn into_result(self) -> EngineResult<()> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(self.issues))
        }
    }
}

/// A document lowered into engine types.
#[derive(Debug, Clone)]
struct Compiled {
    phases: Vec<Phase>,
    custom: Vec<Exercise>,
}

struct Compiler<'a> {
    catalog: &'a ExerciseCatalog,
    registry: &'a ModelRegistry,
    issues: Vec<ValidationIssue>,
}

impl<'a> Compiler<'a> {
    fn structure(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue::structure(field, message));
    }

    fn reference(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue::reference(field, message));
    }

    fn compile(mut self, doc: &TemplateDocument) -> Result<Compiled, Vec<ValidationIssue>> {
        if doc.name.trim().is_empty() {
            self.structure("name", "must not be empty");
        }

        let custom = self.custom_exercises(&doc.custom_exercises);
        let extended = match self.catalog.with_custom(custom.clone()) {
            Ok(cat) => cat,
            Err(e) => {
                self.issues.extend(e.issues().iter().cloned());
                self.catalog.clone()
            }
        };

        if doc.phases.is_empty() {
            self.structure("phases", "a program needs at least one phase");
        }

        let phases: Vec<Option<Phase>> = doc
            .phases
            .iter()
            .enumerate()
            .map(|(i, p)| self.phase(&extended, i, p))
            .collect();

        self.unique_names(doc);
        self.contiguity(doc);

        if self.issues.is_empty() {
            Ok(Compiled {
                phases: phases.into_iter().flatten().collect(),
                custom,
            })
        } else {
            Err(self.issues)
        }
    }

    fn custom_exercises(&mut self, docs: &[CustomExerciseDoc]) -> Vec<Exercise> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for (i, doc) in docs.iter().enumerate() {
            let field = format!("custom_exercises[{i}]");
            let before = self.issues.len();

            let id = doc.id.trim();
            if id.is_empty() {
                self.structure(format!("{field}.id"), "must not be empty");
            } else if self.catalog.get(id).is_some() {
                self.structure(
                    format!("{field}.id"),
                    format!("`{id}` is already a catalog exercise"),
                );
            } else if !seen.insert(id.to_string()) {
                self.structure(format!("{field}.id"), format!("`{id}` is declared twice"));
            }

            if doc.name.trim().is_empty() {
                self.structure(format!("{field}.name"), "must not be empty");
            }

            let pattern = doc
                .pattern
                .parse::<MovementPattern>()
                .map_err(|e| self.structure(format!("{field}.pattern"), e))
                .ok();

            let mut equipment = BTreeSet::new();
            for (j, raw) in doc.equipment.iter().enumerate() {
                match raw.parse::<Equipment>() {
                    Ok(eq) => {
                        equipment.insert(eq);
                    }
                    Err(e) => self.structure(format!("{field}.equipment[{j}]"), e),
                }
            }
            if doc.equipment.is_empty() {
                self.structure(
                    format!("{field}.equipment"),
                    "at least one piece of equipment is required",
                );
            }

            let mut muscles = BTreeSet::new();
            for (j, raw) in doc.muscles.iter().enumerate() {
                match raw.parse::<Muscle>() {
                    Ok(m) => {
                        muscles.insert(m);
                    }
                    Err(e) => self.structure(format!("{field}.muscles[{j}]"), e),
                }
            }

            if let (Some(pattern), true) = (pattern, self.issues.len() == before) {
                out.push(Exercise {
                    id: id.to_string(),
                    name: doc.name.trim().to_string(),
                    pattern,
                    equipment,
                    muscles,
                    pr_key: None,
                    cardio: pattern == MovementPattern::Cardio,
                    mobility: pattern == MovementPattern::Mobility,
                    custom: true,
                });
            }
        }

        out
    }

    fn phase(&mut self, catalog: &ExerciseCatalog, i: usize, doc: &PhaseDoc) -> Option<Phase> {
        let field = format!("phases[{i}]");
        let before = self.issues.len();

        if doc.name.trim().is_empty() {
            self.structure(format!("{field}.name"), "must not be empty");
        }
        let start_week = self.week(format!("{field}.start_week"), doc.start_week);
        let end_week = self.week(format!("{field}.end_week"), doc.end_week);
        if doc.end_week < doc.start_week {
            self.structure(
                format!("{field}.end_week"),
                format!(
                    "ends in week {} before it starts in week {}",
                    doc.end_week, doc.start_week
                ),
            );
        }
        if let Err(e) = self.registry.get(&doc.model) {
            self.reference(format!("{field}.model"), e.to_string());
        }

        if doc.days.len() != 7 {
            self.structure(
                format!("{field}.days"),
                format!("expected 7 day entries, found {}", doc.days.len()),
            );
        }

        let mut seen_days = HashSet::new();
        let mut days = Vec::with_capacity(doc.days.len());
        for (j, day) in doc.days.iter().enumerate() {
            let day_field = format!("{field}.days[{j}]");
            if !(1..=7).contains(&day.day) {
                self.structure(
                    format!("{day_field}.day"),
                    format!("day {} is outside 1..7", day.day),
                );
            } else if !seen_days.insert(day.day) {
                self.structure(
                    format!("{day_field}.day"),
                    format!("day {} appears more than once", day.day),
                );
            }
            if let Some(session) = self.session(catalog, &day_field, day) {
                days.push(DayTemplate {
                    day: day.day.clamp(0, 7) as u8,
                    session,
                });
            }
        }

        if self.issues.len() != before {
            return None;
        }
        Some(Phase {
            name: doc.name.trim().to_string(),
            start_week: start_week?,
            end_week: end_week?,
            model: doc.model.clone(),
            days,
        })
    }

    fn week(&mut self, field: String, week: i64) -> Option<u32> {
        if week < 1 {
            self.structure(field, "weeks are numbered from 1");
            None
        } else if week > MAX_WEEKS {
            self.structure(field, format!("week {week} is past the {MAX_WEEKS}-week limit"));
            None
        } else {
            u32::try_from(week).ok()
        }
    }

    /// Bounded count such as sets or seconds; `min` is the smallest legal value.
    fn count(&mut self, field: String, value: i64, min: i64, what: &str) -> Option<u32> {
        if value < min {
            self.structure(field, format!("must be at least {min} {what}, got {value}"));
            return None;
        }
        let count = u32::try_from(value).ok();
        if count.is_none() {
            self.structure(field, format!("{value} {what} is out of range"));
        }
        count
    }

    /// Week ranges are recovered by phase name, so names must be distinct.
    fn unique_names(&mut self, doc: &TemplateDocument) {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for (i, p) in doc.phases.iter().enumerate() {
            let name = p.name.trim();
            if name.is_empty() {
                continue;
            }
            if let Some(first) = seen.get(name) {
                self.structure(
                    format!("phases[{i}].name"),
                    format!("phase name `{name}` is already used by phases[{first}]"),
                );
            } else {
                seen.insert(name, i);
            }
        }
    }

    fn session(&mut self, catalog: &ExerciseCatalog, field: &str, doc: &DayDoc) -> Option<Session> {
        let session_type = match doc.session_type.parse::<SessionType>() {
            Ok(t) => t,
            Err(e) => {
                self.structure(format!("{field}.type"), e);
                return None;
            }
        };

        match session_type {
            SessionType::Strength | SessionType::MuscularEndurance | SessionType::Mobility => {
                if doc.exercises.is_empty() && session_type != SessionType::Mobility {
                    self.structure(
                        format!("{field}.exercises"),
                        format!("a {} day needs at least one exercise", session_type),
                    );
                }
                let exercises: Vec<ExercisePrescription> = doc
                    .exercises
                    .iter()
                    .enumerate()
                    .filter_map(|(k, ex)| {
                        self.prescription(catalog, &format!("{field}.exercises[{k}]"), ex)
                    })
                    .collect();

                Some(match session_type {
                    SessionType::Strength => Session::Strength { exercises },
                    SessionType::MuscularEndurance => Session::MuscularEndurance { exercises },
                    _ => Session::Mobility { exercises },
                })
            }
            SessionType::Cardio => {
                let zone = match doc.zone.as_deref() {
                    None => {
                        self.structure(format!("{field}.zone"), "a cardio day needs a heart-rate zone");
                        None
                    }
                    Some(raw) => raw
                        .parse::<HrZone>()
                        .map_err(|_| {
                            self.reference(
                                format!("{field}.zone"),
                                EngineError::UnknownZone(raw.to_string()).to_string(),
                            )
                        })
                        .ok(),
                };
                let duration = match doc.duration_min {
                    Some(m) => self.count(format!("{field}.duration_min"), m, 1, "minutes"),
                    None => {
                        self.structure(format!("{field}.duration_min"), "a cardio day needs a duration");
                        None
                    }
                };

                Some(Session::Cardio(CardioPrescription {
                    zone: zone?,
                    duration_min: duration?,
                    activity: doc
                        .activity
                        .clone()
                        .unwrap_or_else(|| "cardio".to_string()),
                    target_hr: None,
                }))
            }
            SessionType::Recovery => {
                let duration_min = match doc.duration_min {
                    Some(m) => Some(self.count(format!("{field}.duration_min"), m, 1, "minutes")?),
                    None => None,
                };
                Some(Session::Recovery {
                    duration_min,
                    note: doc.note.clone(),
                })
            }
        }
    }

    fn prescription(
        &mut self,
        catalog: &ExerciseCatalog,
        field: &str,
        doc: &ExerciseDoc,
    ) -> Option<ExercisePrescription> {
        let before = self.issues.len();

        if let Err(e) = catalog.resolve(doc.id.trim()) {
            self.reference(format!("{field}.id"), e.to_string());
        }
        let sets = self.count(format!("{field}.sets"), doc.sets, 1, "sets");

        let reps = doc
            .reps
            .as_text()
            .parse::<Reps>()
            .map_err(|e| self.structure(format!("{field}.reps"), e))
            .ok();

        let max_reps = doc.max_reps.and_then(|max| {
            let floor = reps.map(|r| r.high()).unwrap_or(1).max(1) as i64;
            if max < floor {
                self.structure(
                    format!("{field}.max_reps"),
                    format!("ceiling {max} is below the prescribed reps ({floor})"),
                );
                return None;
            }
            self.count(format!("{field}.max_reps"), max, floor, "reps")
        });
        if let Some(pct) = doc.intensity {
            if !(1.0..=100.0).contains(&pct) {
                self.structure(
                    format!("{field}.intensity"),
                    format!("must be within 1-100 percent, got {pct}"),
                );
            }
        }
        if let Some(rpe) = doc.rpe {
            if !(1.0..=10.0).contains(&rpe) {
                self.structure(format!("{field}.rpe"), format!("must be within 1-10, got {rpe}"));
            }
        }
        let rest_seconds = doc
            .rest_seconds
            .and_then(|r| self.count(format!("{field}.rest_seconds"), r, 0, "seconds"));

        if self.issues.len() != before {
            return None;
        }

        Some(ExercisePrescription {
            exercise_id: doc.id.trim().to_string(),
            sets: sets?,
            reps: reps?,
            max_reps,
            intensity_percent: doc.intensity,
            rpe: doc.rpe,
            rest_seconds,
            slot: Slot::Prescribed,
            target_weight: None,
        })
    }

    /// Phases must tile weeks 1..N with no overlap and no gap.
    fn contiguity(&mut self, doc: &TemplateDocument) {
        let ordered: Vec<(usize, &PhaseDoc)> = doc
            .phases
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.start_week >= 1 && p.end_week >= p.start_week && p.end_week <= MAX_WEEKS
            })
            .sorted_by_key(|(i, p)| (p.start_week, *i))
            .collect();

        // The phase reaching furthest so far; every later phase is checked against it.
        let mut reach: Option<(usize, &PhaseDoc)> = None;
        for &(j, next) in &ordered {
            match reach {
                None if next.start_week != 1 => self.structure(
                    format!("phases[{j}].start_week"),
                    format!(
                        "the first phase `{}` starts in week {}; weeks 1-{} are not covered",
                        next.name,
                        next.start_week,
                        next.start_week - 1
                    ),
                ),
                None => {}
                Some((i, prev)) if next.start_week <= prev.end_week => self.structure(
                    format!("phases[{j}].start_week"),
                    format!(
                        "phase `{}` (weeks {}-{}) overlaps phase `{}` at phases[{}] (weeks {}-{})",
                        next.name,
                        next.start_week,
                        next.end_week,
                        prev.name,
                        i,
                        prev.start_week,
                        prev.end_week
                    ),
                ),
                Some((i, prev)) if next.start_week > prev.end_week + 1 => self.structure(
                    format!("phases[{j}].start_week"),
                    format!(
                        "weeks {}-{} between phase `{}` at phases[{}] and phase `{}` are not covered",
                        prev.end_week + 1,
                        next.start_week - 1,
                        prev.name,
                        i,
                        next.name
                    ),
                ),
                Some(_) => {}
            }
            if reach.is_none_or(|(_, p)| next.end_week > p.end_week) {
                reach = Some((j, next));
            }
        }

        if let (Some(declared), Some(last)) = (doc.total_weeks, ordered.iter().map(|(_, p)| p.end_week).max()) {
            if declared != last {
                self.structure(
                    "total_weeks",
                    format!("declares {declared} weeks but the phases end in week {last}"),
                );
            }
        }
    }
}

/// Checks structure and references, reporting every violation.
pub fn validate(
    doc: &TemplateDocument,
    catalog: &ExerciseCatalog,
    registry: &ModelRegistry,
) -> ValidationReport {
    let compiler = Compiler {
        catalog,
        registry,
        issues: Vec::new(),
    };
    match compiler.compile(doc) {
        Ok(_) => ValidationReport::default(),
        Err(issues) => ValidationReport { issues },
    }
}

//
// Materialization
//

/// The calendar generated from a document for one athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub description: Option<String>,
    pub days: Vec<DailyPrescription>,
    pub warnings: Vec<Warning>,
    /// Custom exercises the document declared.
    pub custom_exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRange {
    pub name: String,
    pub start_week: u32,
    pub end_week: u32,
}

impl Program {
    pub fn total_weeks(&self) -> u32 {
        self.days.last().map(|d| d.week).unwrap_or(0)
    }

    /// Week ranges re-derived from the generated calendar.
    pub fn phase_ranges(&self) -> Vec<PhaseRange> {
        self.days
            .iter()
            .chunk_by(|d| d.phase.as_str())
            .into_iter()
            .filter_map(|(name, mut days)| {
                let first = days.next()?;
                let last = days.last().unwrap_or(first);
                Some(PhaseRange {
                    name: name.to_string(),
                    start_week: first.week,
                    end_week: last.week,
                })
            })
            .collect()
    }

    pub fn day(&self, week: u32, day: u8) -> Option<&DailyPrescription> {
        self.days.iter().find(|d| d.week == week && d.day == day)
    }

    pub fn week(&self, week: u32) -> impl Iterator<Item = &DailyPrescription> {
        self.days.iter().filter(move |d| d.week == week)
    }

    /// Calendar date of `(week, day)` for a program starting on `start`.
    pub fn date_of(start: NaiveDate, week: u32, day: u8) -> Option<NaiveDate> {
        let offset = (week.checked_sub(1)? as u64) * 7 + (day.checked_sub(1)? as u64);
        start.checked_add_days(Days::new(offset))
    }

    /// The prescription falling on `date`, if the program covers it.
    pub fn on_date(&self, start: NaiveDate, date: NaiveDate) -> Option<&DailyPrescription> {
        let offset = u32::try_from((date - start).num_days()).ok()?;
        self.day(offset / 7 + 1, (offset % 7 + 1) as u8)
    }
}

/// Validates `doc`, then expands every phase against `profile`.
///
/// Structural or reference problems abort with [`EngineError::Validation`].
/// Exercises the athlete is not fully equipped for are swapped for the
/// nearest usable alternative. When none exists the slot keeps the original
/// exercise, is flagged unresolved and a warning is returned with the program.
pub fn materialize(
    doc: &TemplateDocument,
    profile: &AthleteProfile,
    catalog: &ExerciseCatalog,
    registry: &ModelRegistry,
) -> EngineResult<Program> {
    let compiled = Compiler {
        catalog,
        registry,
        issues: Vec::new(),
    }
    .compile(doc)
    .map_err(EngineError::Validation)?;

    let catalog = catalog.with_custom(compiled.custom.clone())?;
    let mut warnings = Vec::new();
    let mut days = Vec::new();

    for mut phase in compiled.phases {
        substitute(&mut phase, profile, &catalog, &mut warnings)?;
        days.extend(expand(&phase, registry)?);
    }

    days.sort_by_key(|d| (d.week, d.day));
    for day in &mut days {
        fill_targets(day, profile, &catalog);
    }

    debug!(
        program = %doc.name,
        days = days.len(),
        warnings = warnings.len(),
        "materialized program"
    );

    Ok(Program {
        name: doc.name.trim().to_string(),
        description: doc.description.clone(),
        days,
        warnings,
        custom_exercises: compiled.custom,
    })
}

fn substitute(
    phase: &mut Phase,
    profile: &AthleteProfile,
    catalog: &ExerciseCatalog,
    warnings: &mut Vec<Warning>,
) -> EngineResult<()> {
    for tpl in &mut phase.days {
        for slot in tpl.session.exercises_mut() {
            let exercise = catalog.resolve(&slot.exercise_id)?;
            if exercise.fully_equipped(&profile.equipment) {
                continue;
            }

            match substitution::nearest(catalog, &exercise.id, &profile.equipment)? {
                Some(swap) => {
                    debug!(from = %exercise.id, to = %swap.id, phase = %phase.name, "substituted exercise");
                    slot.slot = Slot::Substituted {
                        original: exercise.id.clone(),
                    };
                    slot.exercise_id = swap.id.clone();
                }
                None => {
                    warn!(exercise = %exercise.id, phase = %phase.name, day = tpl.day, "no usable substitute");
                    slot.slot = Slot::Unresolved;
                    warnings.push(Warning::UnresolvedSubstitution {
                        phase: phase.name.clone(),
                        day: tpl.day,
                        exercise_id: exercise.id.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn fill_targets(day: &mut DailyPrescription, profile: &AthleteProfile, catalog: &ExerciseCatalog) {
    match &mut day.session {
        Session::Cardio(cardio) => {
            cardio.target_hr = profile.benchmarks.max_hr.map(|max| cardio.zone.bpm_range(max));
        }
        Session::Strength { exercises } | Session::MuscularEndurance { exercises } => {
            for p in exercises.iter_mut().filter(|p| p.slot != Slot::Unresolved) {
                let pr = catalog
                    .get(&p.exercise_id)
                    .and_then(|ex| ex.pr_key.as_deref())
                    .and_then(|key| profile.pr(key));
                p.target_weight = match (pr, p.intensity_percent) {
                    (Some(pr), Some(pct)) => Some(round_to_nearest(pr * pct / 100.0, LOAD_INCREMENT)),
                    _ => None,
                };
            }
        }
        Session::Mobility { .. } | Session::Recovery { .. } => {}
    }
}

/// Counts of each session type per week, used by summaries.
pub fn weekly_mix(program: &Program) -> BTreeMap<u32, BTreeMap<&'static str, usize>> {
    let mut mix: BTreeMap<u32, BTreeMap<&'static str, usize>> = BTreeMap::new();
    for d in &program.days {
        *mix.entry(d.week)
            .or_default()
            .entry(d.session.session_type().as_str())
            .or_default() += 1;
    }
    mix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueKind;
    use pretty_assertions::assert_eq;

    const HYBRID: &str = r#"
name = "Hybrid Base"
total_weeks = 6

[[custom_exercises]]
id = "zercherSquat"
name = "Zercher Squat"
pattern = "squat"
equipment = ["barbell"]
muscles = ["quads", "glutes", "abs"]

[[phases]]
name = "Accumulation"
start_week = 1
end_week = 4
model = "linear"

  [[phases.days]]
  day = 1
  type = "strength"
    [[phases.days.exercises]]
    id = "backSquat"
    sets = 4
    reps = "8-10"
    intensity = 70
    rpe = 8
    rest = 180
    [[phases.days.exercises]]
    id = "benchPress"
    sets = 3
    reps = 8

  [[phases.days]]
  day = 2
  type = "cardio"
  zone = "z2"
  duration_min = 40
  activity = "run"

  [[phases.days]]
  day = 3
  type = "mobility"

  [[phases.days]]
  day = 4
  type = "muscular-endurance"
    [[phases.days.exercises]]
    id = "zercherSquat"
    sets = 3
    reps = "12-15"

  [[phases.days]]
  day = 5
  type = "recovery"
  note = "easy walk"

  [[phases.days]]
  day = 6
  type = "cardio"
  zone = "zone4"
  duration_min = 20

  [[phases.days]]
  day = 7
  type = "recovery"

[[phases]]
name = "Taper"
start_week = 5
end_week = 6
model = "step-taper"

  [[phases.days]]
  day = 1
  type = "strength"
    [[phases.days.exercises]]
    id = "deadlift"
    sets = 3
    reps = "3-5"

  [[phases.days]]
  day = 2
  type = "recovery"
  [[phases.days]]
  day = 3
  type = "recovery"
  [[phases.days]]
  day = 4
  type = "recovery"
  [[phases.days]]
  day = 5
  type = "recovery"
  [[phases.days]]
  day = 6
  type = "recovery"
  [[phases.days]]
  day = 7
  type = "recovery"
"#;

    fn doc() -> TemplateDocument {
        TemplateDocument::from_toml_str(HYBRID).unwrap()
    }

    fn full_gym() -> AthleteProfile {
        let mut profile = AthleteProfile {
            equipment: Equipment::ALL.iter().copied().collect(),
            ..AthleteProfile::default()
        };
        profile.benchmarks.max_hr = Some(190);
        profile.set_pr("backSquat", 140.0, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
        profile
    }

    fn check(doc: &TemplateDocument) -> ValidationReport {
        validate(doc, ExerciseCatalog::builtin(), &ModelRegistry::default())
    }

    fn fields(report: &ValidationReport) -> Vec<&str> {
        report.issues.iter().map(|i| i.field.as_str()).collect()
    }

    /// The sample document with its phases replaced by copies of the taper week.
    fn with_phases(ranges: &[(&str, i64, i64)]) -> TemplateDocument {
        let mut d = doc();
        let week = d.phases[1].clone();
        d.total_weeks = None;
        d.phases = ranges
            .iter()
            .map(|(name, start_week, end_week)| PhaseDoc {
                name: name.to_string(),
                start_week: *start_week,
                end_week: *end_week,
                ..week.clone()
            })
            .collect();
        d
    }

    #[test]
    fn sample_document_is_valid() {
        let report = check(&doc());
        assert!(report.is_valid(), "{:?}", report.issues);
    }

    #[test]
    fn json_documents_parse_too() {
        let json = serde_json::to_string(&doc()).unwrap();
        assert_eq!(TemplateDocument::parse(&json, Some("JSON")).unwrap(), doc());
        assert!(matches!(
            TemplateDocument::parse("name = ", Some("toml")),
            Err(EngineError::Malformed { format: "toml", .. })
        ));
    }

    #[test]
    fn overlap_names_both_phases() {
        let mut d = doc();
        d.phases[1].start_week = 4;
        d.total_weeks = None;

        let report = check(&d);
        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.field, "phases[1].start_week");
        assert!(issue.message.contains("`Taper`"));
        assert!(issue.message.contains("`Accumulation`"));
        assert!(issue.message.contains("phases[0]"));
    }

    #[test]
    fn gaps_and_late_starts_are_reported() {
        let mut d = doc();
        d.phases[0].start_week = 2;
        d.phases[1].start_week = 6;
        d.phases[1].end_week = 7;

        assert_eq!(
            fields(&check(&d)),
            vec!["phases[0].start_week", "phases[1].start_week", "total_weeks"]
        );
    }

    #[test]
    fn overlaps_are_checked_against_the_longest_phase_so_far() {
        let report = check(&with_phases(&[("A", 1, 10), ("B", 2, 3), ("C", 4, 12)]));
        assert_eq!(fields(&report), vec!["phases[1].start_week", "phases[2].start_week"]);
        assert!(report.issues[1].message.contains("`C`"));
        assert!(report.issues[1].message.contains("`A` at phases[0]"));

        // B sits inside A, so C starting after A leaves no gap.
        let report = check(&with_phases(&[("A", 1, 10), ("B", 2, 3), ("C", 11, 12)]));
        assert_eq!(fields(&report), vec!["phases[1].start_week"]);

        let report = check(&with_phases(&[("A", 1, 2), ("B", 3, 4), ("C", 6, 7)]));
        assert_eq!(fields(&report), vec!["phases[2].start_week"]);
        assert!(report.issues[0].message.starts_with("weeks 5-5"));
    }

    #[test]
    fn phase_names_must_be_distinct() {
        let report = check(&with_phases(&[("Block", 1, 3), ("Block", 4, 5)]));
        assert_eq!(fields(&report), vec!["phases[1].name"]);
        assert!(report.issues[0].message.contains("phases[0]"));

        let program = materialize(
            &with_phases(&[("Block", 1, 3), ("Block 2", 4, 5)]),
            &full_gym(),
            ExerciseCatalog::builtin(),
            &ModelRegistry::default(),
        )
        .unwrap();
        assert_eq!(
            program.phase_ranges(),
            vec![
                PhaseRange { name: "Block".into(), start_week: 1, end_week: 3 },
                PhaseRange { name: "Block 2".into(), start_week: 4, end_week: 5 },
            ]
        );
    }

    #[test]
    fn oversized_numbers_are_rejected_not_truncated() {
        let d = with_phases(&[("Base", 1, 4_294_967_297)]);
        assert_eq!(fields(&check(&d)), vec!["phases[0].end_week"]);
        assert!(materialize(&d, &full_gym(), ExerciseCatalog::builtin(), &ModelRegistry::default()).is_err());

        assert_eq!(fields(&check(&with_phases(&[("Base", 1, MAX_WEEKS)]))), Vec::<&str>::new());
        assert_eq!(
            fields(&check(&with_phases(&[("Base", 1, MAX_WEEKS + 1)]))),
            vec!["phases[0].end_week"]
        );

        let mut d = doc();
        d.phases[0].days[0].exercises[0].sets = i64::from(u32::MAX) + 1;
        d.phases[0].days[0].exercises[0].rest_seconds = Some(-30);
        d.phases[0].days[1].duration_min = Some(i64::MAX);
        assert_eq!(
            fields(&check(&d)),
            vec![
                "phases[0].days[0].exercises[0].sets",
                "phases[0].days[0].exercises[0].rest_seconds",
                "phases[0].days[1].duration_min",
            ]
        );
    }

    #[test]
    fn every_problem_is_reported_at_once() {
        let mut d = doc();
        d.phases[0].model = "zigzag".into();
        d.phases[0].days[0].exercises[0].id = "bakSquat".into();
        d.phases[0].days[0].exercises[0].rpe = Some(11.0);
        d.phases[0].days[0].exercises[1].reps = RepsDoc::Text("lots".into());
        d.phases[0].days[1].zone = Some("z9".into());
        d.phases[1].days.pop();
        d.phases[1].days[2].day = 2;

        let report = check(&d);
        assert_eq!(
            fields(&report),
            vec![
                "phases[0].model",
                "phases[0].days[0].exercises[0].id",
                "phases[0].days[0].exercises[0].rpe",
                "phases[0].days[0].exercises[1].reps",
                "phases[0].days[1].zone",
                "phases[1].days",
                "phases[1].days[2].day",
            ]
        );
        assert_eq!(report.issues[0].kind, IssueKind::Reference);
        assert!(report.issues[1].message.contains("did you mean `backSquat`"));
        assert_eq!(report.issues[4].kind, IssueKind::Reference);
        assert!(report.clone().into_result().is_err());
    }

    #[test]
    fn undeclared_custom_exercise_is_unknown() {
        let mut d = doc();
        d.custom_exercises.clear();
        let report = check(&d);
        assert_eq!(fields(&report), vec!["phases[0].days[3].exercises[0].id"]);
    }

    #[test]
    fn materialize_expands_and_concatenates() {
        let program = materialize(
            &doc(),
            &full_gym(),
            ExerciseCatalog::builtin(),
            &ModelRegistry::default(),
        )
        .unwrap();

        assert_eq!(program.days.len(), 42);
        assert_eq!(program.total_weeks(), 6);
        assert!(program.warnings.is_empty());
        assert_eq!(
            program.phase_ranges(),
            vec![
                PhaseRange { name: "Accumulation".into(), start_week: 1, end_week: 4 },
                PhaseRange { name: "Taper".into(), start_week: 5, end_week: 6 },
            ]
        );

        // Linear week 1 is 65%: 140 * 0.65 = 91 → 90.
        let squat = &program.day(1, 1).unwrap().session.exercises()[0];
        assert_eq!(squat.intensity_percent, Some(65.0));
        assert_eq!(squat.target_weight, Some(90.0));
        // No bench record on file.
        assert_eq!(program.day(1, 1).unwrap().session.exercises()[1].target_weight, None);

        match &program.day(2, 2).unwrap().session {
            Session::Cardio(c) => assert_eq!(c.target_hr, Some((114, 133))),
            other => panic!("expected cardio, got {other:?}"),
        }

        // Taper's final week is a deload.
        assert_eq!(program.day(6, 1).unwrap().params.intensity_percent, 60.0);
    }

    #[test]
    fn missing_equipment_triggers_substitution() {
        let mut profile = full_gym();
        profile.equipment = BTreeSet::from([Equipment::Machine, Equipment::Dumbbell, Equipment::Bench]);

        let program = materialize(&doc(), &profile, ExerciseCatalog::builtin(), &ModelRegistry::default())
            .unwrap();

        let day1 = program.day(3, 1).unwrap().session.exercises();
        assert_eq!(day1[0].exercise_id, "hackSquat");
        assert_eq!(day1[0].slot, Slot::Substituted { original: "backSquat".into() });
        assert_eq!(day1[1].exercise_id, "dumbbellBenchPress");

        // Declared custom exercises are substituted like catalog ones.
        let me = program.day(1, 4).unwrap().session.exercises();
        assert!(matches!(me[0].slot, Slot::Substituted { .. }));
    }

    #[test]
    fn unusable_exercise_is_flagged_not_dropped() {
        let mut profile = full_gym();
        profile.equipment = BTreeSet::from([Equipment::Rower]);

        let program = materialize(&doc(), &profile, ExerciseCatalog::builtin(), &ModelRegistry::default())
            .unwrap();

        let squat = &program.day(1, 1).unwrap().session.exercises()[0];
        assert_eq!(squat.exercise_id, "backSquat");
        assert_eq!(squat.slot, Slot::Unresolved);
        assert_eq!(squat.target_weight, None);
        assert!(program.warnings.contains(&Warning::UnresolvedSubstitution {
            phase: "Accumulation".into(),
            day: 1,
            exercise_id: "backSquat".into(),
        }));
    }

    #[test]
    fn partially_equipped_exercise_without_swap_is_flagged() {
        let mut profile = full_gym();
        profile.equipment = BTreeSet::from([Equipment::Barbell]);

        let program = materialize(&doc(), &profile, ExerciseCatalog::builtin(), &ModelRegistry::default())
            .unwrap();

        let day1 = program.day(1, 1).unwrap().session.exercises();
        assert_eq!(day1[0].slot, Slot::Prescribed);
        assert_eq!(day1[0].target_weight, Some(90.0));
        assert_eq!(day1[1].exercise_id, "benchPress");
        assert_eq!(day1[1].slot, Slot::Unresolved);
        assert!(program.warnings.contains(&Warning::UnresolvedSubstitution {
            phase: "Accumulation".into(),
            day: 1,
            exercise_id: "benchPress".into(),
        }));
    }

    #[test]
    fn program_round_trips_through_json() {
        let mut profile = full_gym();
        profile.equipment = BTreeSet::from([Equipment::Rower]);
        let program = materialize(
            &with_phases(&[("Build", 1, 3), ("Peak", 4, 5)]),
            &profile,
            ExerciseCatalog::builtin(),
            &ModelRegistry::default(),
        )
        .unwrap();
        assert!(!program.warnings.is_empty());

        let json = serde_json::to_string(&program).unwrap();
        assert_eq!(serde_json::from_str::<Program>(&json).unwrap(), program);
    }

    #[test]
    fn invalid_document_never_materializes() {
        let mut d = doc();
        d.phases[1].start_week = 3;
        let err = materialize(&d, &full_gym(), ExerciseCatalog::builtin(), &ModelRegistry::default())
            .unwrap_err();
        assert!(!err.issues().is_empty());
    }

    #[test]
    fn calendar_dates_line_up() {
        let program = materialize(&doc(), &full_gym(), ExerciseCatalog::builtin(), &ModelRegistry::default())
            .unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();

        assert_eq!(Program::date_of(start, 1, 1), Some(start));
        assert_eq!(
            Program::date_of(start, 2, 3),
            NaiveDate::from_ymd_opt(2025, 3, 12)
        );
        assert_eq!(Program::date_of(start, 0, 1), None);

        let wed = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let found = program.on_date(start, wed).unwrap();
        assert_eq!((found.week, found.day), (2, 3));
        assert!(program.on_date(start, start.pred_opt().unwrap()).is_none());
        assert!(program.on_date(start, start + Days::new(42)).is_none());
    }

    #[test]
    fn weekly_mix_counts_sessions() {
        let program = materialize(&doc(), &full_gym(), ExerciseCatalog::builtin(), &ModelRegistry::default())
            .unwrap();
        let mix = weekly_mix(&program);
        assert_eq!(mix[&1]["cardio"], 2);
        assert_eq!(mix[&6]["recovery"], 6);
    }
}

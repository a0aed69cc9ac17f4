//! Weekly templates and their expansion into a dated-by-index calendar.

use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{EngineError, EngineResult, ValidationIssue},
    progression::{ModelRegistry, WeekParams},
    types::{HrZone, SessionType},
};

/// Reps never shift above this unless the template names its own ceiling.
pub const DEFAULT_REP_CEILING: u32 = 20;

/// A rep target: `5`, `8-10` or `AMRAP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Reps {
    Fixed(u32),
    Range(u32, u32),
    Amrap,
}

impl Reps {
    pub fn high(&self) -> u32 {
        match self {
            Self::Fixed(n) => *n,
            Self::Range(_, hi) => *hi,
            Self::Amrap => 0,
        }
    }

    pub fn midpoint(&self) -> Option<f64> {
        match self {
            Self::Fixed(n) => Some(*n as f64),
            Self::Range(lo, hi) => Some((*lo + *hi) as f64 / 2.0),
            Self::Amrap => None,
        }
    }

    /// Moves both bounds by `shift`, clamped to `[1, ceiling]`. A collapsed range becomes fixed.
    pub fn shifted(&self, shift: i32, ceiling: u32) -> Self {
        let ceiling = ceiling.max(1);
        let move_by = |n: u32| (n as i64 + shift as i64).clamp(1, ceiling as i64) as u32;
        match self {
            Self::Fixed(n) => Self::Fixed(move_by(*n)),
            Self::Range(lo, hi) => {
                let (lo, hi) = (move_by(*lo), move_by(*hi));
                if lo == hi {
                    Self::Fixed(lo)
                } else {
                    Self::Range(lo, hi)
                }
            }
            Self::Amrap => Self::Amrap,
        }
    }
}

impl FromStr for Reps {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.eq_ignore_ascii_case("amrap") {
            return Ok(Self::Amrap);
        }

        let parse = |part: &str| -> Result<u32, String> {
            match part.trim().parse::<u32>() {
                Ok(n) if n >= 1 => Ok(n),
                _ => Err(format!("invalid rep count `{}` in `{}`", part.trim(), raw)),
            }
        };

        match raw.split_once(['-', '–']) {
            Some((lo, hi)) => {
                let (lo, hi) = (parse(lo)?, parse(hi)?);
                match lo.cmp(&hi) {
                    std::cmp::Ordering::Less => Ok(Self::Range(lo, hi)),
                    std::cmp::Ordering::Equal => Ok(Self::Fixed(lo)),
                    std::cmp::Ordering::Greater => {
                        Err(format!("rep range `{}` is reversed", raw))
                    }
                }
            }
            None => parse(raw).map(Self::Fixed),
        }
    }
}

impl TryFrom<String> for Reps {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Reps> for String {
    fn from(value: Reps) -> Self {
        value.to_string()
    }
}

impl Display for Reps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{}", n),
            Self::Range(lo, hi) => write!(f, "{}-{}", lo, hi),
            Self::Amrap => write!(f, "AMRAP"),
        }
    }
}

/// How a prescription slot relates to what the template asked for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Slot {
    #[default]
    Prescribed,
    Substituted {
        original: String,
    },
    /// No usable exercise exists for the athlete's equipment.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExercisePrescription {
    pub exercise_id: String,
    pub sets: u32,
    pub reps: Reps,
    /// Upper bound for rep shifting.
    #[serde(default)]
    pub max_reps: Option<u32>,
    /// Percent of 1RM. Overridden per week by the phase's progression model.
    #[serde(default)]
    pub intensity_percent: Option<f64>,
    #[serde(default)]
    pub rpe: Option<f64>,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub slot: Slot,
    /// Load derived from the athlete's personal record.
    #[serde(default)]
    pub target_weight: Option<f64>,
}

impl ExercisePrescription {
    pub fn rep_ceiling(&self) -> u32 {
        self.max_reps
            .unwrap_or_else(|| DEFAULT_REP_CEILING.max(self.reps.high()))
    }

    fn for_week(&self, params: &WeekParams) -> Self {
        Self {
            intensity_percent: Some(params.intensity_percent),
            reps: self.reps.shifted(params.rep_shift, self.rep_ceiling()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardioPrescription {
    pub zone: HrZone,
    pub duration_min: u32,
    pub activity: String,
    /// Beats-per-minute band derived from the athlete's max HR.
    #[serde(default)]
    pub target_hr: Option<(u32, u32)>,
}

/// A day's work, keyed by session type. Only the fields a session type needs exist on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Session {
    Strength {
        exercises: Vec<ExercisePrescription>,
    },
    MuscularEndurance {
        exercises: Vec<ExercisePrescription>,
    },
    Mobility {
        exercises: Vec<ExercisePrescription>,
    },
    Cardio(CardioPrescription),
    Recovery {
        #[serde(default)]
        duration_min: Option<u32>,
        #[serde(default)]
        note: Option<String>,
    },
}

impl Session {
    pub fn session_type(&self) -> SessionType {
        match self {
            Self::Strength { .. } => SessionType::Strength,
            Self::MuscularEndurance { .. } => SessionType::MuscularEndurance,
            Self::Mobility { .. } => SessionType::Mobility,
            Self::Cardio(_) => SessionType::Cardio,
            Self::Recovery { .. } => SessionType::Recovery,
        }
    }

    pub fn exercises(&self) -> &[ExercisePrescription] {
        match self {
            Self::Strength { exercises }
            | Self::MuscularEndurance { exercises }
            | Self::Mobility { exercises } => exercises,
            Self::Cardio(_) | Self::Recovery { .. } => &[],
        }
    }

    pub fn exercises_mut(&mut self) -> &mut [ExercisePrescription] {
        match self {
            Self::Strength { exercises }
            | Self::MuscularEndurance { exercises }
            | Self::Mobility { exercises } => exercises,
            Self::Cardio(_) | Self::Recovery { .. } => &mut [],
        }
    }

    /// Applies one week of progression to every prescribed exercise.
    fn for_week(&self, params: &WeekParams) -> Self {
        let scale = |minutes: u32| {
            ((minutes as f64 * params.volume_multiplier).round() as u32).max(1)
        };

        match self {
            Self::Strength { exercises } => Self::Strength {
                exercises: exercises.iter().map(|p| p.for_week(params)).collect(),
            },
            Self::MuscularEndurance { exercises } => Self::MuscularEndurance {
                exercises: exercises.iter().map(|p| p.for_week(params)).collect(),
            },
            Self::Mobility { exercises } => Self::Mobility {
                exercises: exercises.iter().map(|p| p.for_week(params)).collect(),
            },
            Self::Cardio(cardio) => Self::Cardio(CardioPrescription {
                duration_min: scale(cardio.duration_min),
                ..cardio.clone()
            }),
            Self::Recovery { duration_min, note } => Self::Recovery {
                duration_min: duration_min.map(scale),
                note: note.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTemplate {
    pub day: u8,
    pub session: Session,
}

/// A contiguous block of weeks sharing one weekly template and one progression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    /// 1-based, inclusive.
    pub start_week: u32,
    /// 1-based, inclusive.
    pub end_week: u32,
    pub model: String,
    pub days: Vec<DayTemplate>,
}

impl Phase {
    pub fn weeks(&self) -> u32 {
        self.end_week.saturating_sub(self.start_week) + 1
    }

    pub fn check(&self) -> EngineResult<()> {
        let mut issues = Vec::new();
        let field = |f: &str| format!("phase `{}`.{}", self.name, f);

        if self.start_week == 0 {
            issues.push(ValidationIssue::structure(field("start_week"), "weeks are 1-based"));
        }
        if self.end_week < self.start_week {
            issues.push(ValidationIssue::structure(
                field("end_week"),
                format!("ends (week {}) before it starts (week {})", self.end_week, self.start_week),
            ));
        }
        if self.days.len() != 7 {
            issues.push(ValidationIssue::structure(
                field("days"),
                format!("expected 7 day entries, found {}", self.days.len()),
            ));
        }
        let days: BTreeSet<u8> = self.days.iter().map(|d| d.day).collect();
        if days.len() != self.days.len() || days.iter().any(|d| !(1..=7).contains(d)) {
            issues.push(ValidationIssue::structure(
                field("days"),
                "day numbers must be unique and within 1..7",
            ));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(issues))
        }
    }
}

/// One concrete day of a generated calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPrescription {
    pub phase: String,
    /// Absolute program week, 1-based.
    pub week: u32,
    /// Week within the phase, 1-based.
    pub phase_week: u32,
    pub day: u8,
    pub params: WeekParams,
    pub session: Session,
}

impl DailyPrescription {
    /// 1-based day index from the start of the program.
    pub fn absolute_day(&self) -> u32 {
        (self.week - 1) * 7 + self.day as u32
    }
}

/// Expands a phase's weekly template over its week range.
///
/// Produces `7 × weeks` entries ordered by `(week, day)`. Each week's
/// parameters replace the template's intensity and shift its rep ranges;
/// cardio and recovery durations scale with the volume multiplier. The
/// phase's own `model` id picks the progression model from `registry`.
pub fn expand(phase: &Phase, registry: &ModelRegistry) -> EngineResult<Vec<DailyPrescription>> {
    phase.check()?;
    let model = registry.get(&phase.model)?;
    let params = model.weeks(phase.weeks())?;

    let mut days: Vec<&DayTemplate> = phase.days.iter().collect();
    days.sort_by_key(|d| d.day);

    debug!(
        phase = %phase.name,
        model = %model.id,
        weeks = phase.weeks(),
        "expanding phase"
    );

    Ok(params
        .iter()
        .flat_map(|week| {
            days.iter().map(move |tpl| DailyPrescription {
                phase: phase.name.clone(),
                week: phase.start_week + week.week - 1,
                phase_week: week.week,
                day: tpl.day,
                params: *week,
                session: tpl.session.for_week(week),
            })
        })
        .collect())
}

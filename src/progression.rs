//! Progression models: pure week-by-week load parameters.
//!
//! A model maps `(week, total_weeks)` to [`WeekParams`]. Every model is
//! deterministic; resolving the same inputs twice yields identical output.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult, ValidationIssue};

/// Load parameters for one week of a phase. `week` is 1-based and phase-relative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekParams {
    pub week: u32,
    pub intensity_percent: f64,
    pub volume_multiplier: f64,
    pub rep_shift: i32,
}

/// An intensity/volume pair used by the cyclic and stepped schemes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub intensity: f64,
    pub volume: f64,
}

impl Level {
    pub const fn new(intensity: f64, volume: f64) -> Self {
        Self { intensity, volume }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scheme {
    /// `base + (week - 1) * increment`, capped at `max`. Volume falls as `base / intensity`.
    Linear { base: f64, increment: f64, max: f64 },
    /// Repeats `cycle` from the start once it runs out.
    Wave { cycle: Vec<Level> },
    /// Holds each step for `block_weeks`; the final week is always `deload`.
    StepTaper {
        block_weeks: u32,
        steps: Vec<Level>,
        deload: Level,
    },
    /// Same parameters every week.
    Constant { level: Level },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionModel {
    pub id: String,
    pub scheme: Scheme,
    /// Intensity points above the reference intensity that cost one rep.
    /// Zero or negative disables rep shifting.
    pub rep_step: f64,
    /// Inclusive bounds for the volume multiplier.
    pub volume_range: (f64, f64),
}

impl ProgressionModel {
    /// Week-by-week parameters for a phase of `total_weeks` weeks.
    pub fn weeks(&self, total_weeks: u32) -> EngineResult<Vec<WeekParams>> {
        if total_weeks == 0 {
            return Err(EngineError::invalid(
                "total_weeks",
                "must be a positive integer",
            ));
        }
        self.check()?;

        Ok((1..=total_weeks)
            .map(|week| self.week(week, total_weeks))
            .collect())
    }

    fn week(&self, week: u32, total_weeks: u32) -> WeekParams {
        let level = match &self.scheme {
            Scheme::Linear {
                base,
                increment,
                max,
            } => {
                let intensity = (base + (week - 1) as f64 * increment).min(*max);
                let volume = if intensity > 0.0 { base / intensity } else { 1.0 };
                Level::new(intensity, volume)
            }
            Scheme::Wave { cycle } => cycle[((week - 1) as usize) % cycle.len()],
            Scheme::StepTaper {
                block_weeks,
                steps,
                deload,
            } => {
                if week == total_weeks {
                    *deload
                } else {
                    let block = ((week - 1) / (*block_weeks).max(1)) as usize;
                    steps[block.min(steps.len() - 1)]
                }
            }
            Scheme::Constant { level } => *level,
        };

        let intensity = level.intensity.clamp(1.0, 100.0);
        let (min_vol, max_vol) = self.volume_range;

        WeekParams {
            week,
            intensity_percent: intensity,
            volume_multiplier: level.volume.clamp(min_vol, max_vol),
            rep_shift: self.rep_shift(intensity),
        }
    }

    /// The week-1 intensity that rep shifts are measured from.
    fn reference_intensity(&self) -> f64 {
        match &self.scheme {
            Scheme::Linear { base, .. } => *base,
            Scheme::Wave { cycle } => cycle[0].intensity,
            Scheme::StepTaper { steps, .. } => steps[0].intensity,
            Scheme::Constant { level } => level.intensity,
        }
    }

    // Heavier than the reference shifts reps down, lighter shifts them up.
    fn rep_shift(&self, intensity: f64) -> i32 {
        if self.rep_step <= 0.0 {
            return 0;
        }
        let steps = ((intensity - self.reference_intensity()) / self.rep_step).trunc();
        -(steps as i32)
    }

    fn check(&self) -> EngineResult<()> {
        let field = |f: &str| format!("models.{}.{}", self.id, f);
        let mut issues = Vec::new();

        match &self.scheme {
            Scheme::Linear { base, increment, max } => {
                if base > max {
                    issues.push(ValidationIssue::structure(
                        field("base"),
                        "base intensity exceeds the cap",
                    ));
                }
                if *increment < 0.0 {
                    issues.push(ValidationIssue::structure(
                        field("increment"),
                        format!("a linear model never steps down, got {increment}"),
                    ));
                }
            }
            Scheme::Wave { cycle } if cycle.is_empty() => {
                issues.push(ValidationIssue::structure(
                    field("cycle"),
                    "a wave needs at least one level",
                ));
            }
            Scheme::StepTaper { steps, deload, .. } => {
                if steps.is_empty() {
                    issues.push(ValidationIssue::structure(
                        field("steps"),
                        "a taper needs at least one step",
                    ));
                }
                if steps
                    .iter()
                    .any(|s| s.intensity < deload.intensity || s.volume < deload.volume)
                {
                    issues.push(ValidationIssue::structure(
                        field("deload"),
                        "deload must be the lowest intensity/volume pair",
                    ));
                }
            }
            _ => {}
        }

        let (lo, hi) = self.volume_range;
        if !(lo > 0.0 && lo <= hi) {
            issues.push(ValidationIssue::structure(
                field("volume_range"),
                "must be a positive, ordered range",
            ));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(issues))
        }
    }
}

/// Tunables for the built-in models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSettings {
    pub linear_base: f64,
    pub linear_increment: f64,
    pub linear_max: f64,
    pub linear_rep_step: f64,
    pub wave_rep_step: f64,
    pub step_block_weeks: u32,
    pub step_rep_step: f64,
}

impl Default for ProgressionSettings {
    fn default() -> Self {
        Self {
            linear_base: 65.0,
            linear_increment: 2.5,
            linear_max: 90.0,
            linear_rep_step: 5.0,
            wave_rep_step: 5.0,
            step_block_weeks: 3,
            step_rep_step: 7.5,
        }
    }
}

const ALIASES: [(&str, &str); 3] = [
    ("undulating", "wave"),
    ("block-taper", "step-taper"),
    ("step", "step-taper"),
];

/// Named progression models, looked up by id.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ProgressionModel>,
}

fn builtin_models(settings: &ProgressionSettings) -> Vec<ProgressionModel> {
    vec![
        ProgressionModel {
            id: "linear".into(),
            scheme: Scheme::Linear {
                base: settings.linear_base,
                increment: settings.linear_increment,
                max: settings.linear_max,
            },
            rep_step: settings.linear_rep_step,
            volume_range: (0.5, 1.0),
        },
        ProgressionModel {
            id: "wave".into(),
            scheme: Scheme::Wave {
                cycle: vec![
                    Level::new(67.5, 1.0), // light
                    Level::new(75.0, 0.9), // medium
                    Level::new(82.5, 0.8), // heavy
                    Level::new(60.0, 0.6), // deload
                ],
            },
            rep_step: settings.wave_rep_step,
            volume_range: (0.5, 1.0),
        },
        ProgressionModel {
            id: "step-taper".into(),
            scheme: Scheme::StepTaper {
                block_weeks: settings.step_block_weeks,
                steps: vec![
                    Level::new(70.0, 1.0),
                    Level::new(77.5, 0.85),
                    Level::new(85.0, 0.7),
                ],
                deload: Level::new(60.0, 0.5),
            },
            rep_step: settings.step_rep_step,
            volume_range: (0.5, 1.0),
        },
        ProgressionModel {
            id: "maintenance".into(),
            scheme: Scheme::Constant {
                level: Level::new(70.0, 1.0),
            },
            rep_step: 0.0,
            volume_range: (1.0, 1.0),
        },
    ]
}

impl ModelRegistry {
    pub fn new(settings: &ProgressionSettings) -> EngineResult<Self> {
        let models = builtin_models(settings);

        let mut issues = Vec::new();
        for m in &models {
            if let Err(e) = m.check() {
                issues.extend(e.issues().iter().cloned());
            }
        }
        if !issues.is_empty() {
            return Err(EngineError::Validation(issues));
        }

        Ok(Self { models })
    }

    pub fn get(&self, id: &str) -> EngineResult<&ProgressionModel> {
        let wanted = id.trim().to_ascii_lowercase();
        let canonical = ALIASES
            .iter()
            .find(|(alias, _)| *alias == wanted)
            .map(|(_, target)| *target)
            .unwrap_or(wanted.as_str());

        self.models
            .iter()
            .find(|m| m.id == canonical)
            .ok_or_else(|| EngineError::UnknownModel(id.to_string()))
    }

    /// `resolve(model_id, total_weeks)`: exactly `total_weeks` entries ordered by week.
    pub fn resolve(&self, model_id: &str, total_weeks: u32) -> EngineResult<Vec<WeekParams>> {
        self.get(model_id)?.weeks(total_weeks)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.id.as_str())
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            models: builtin_models(&ProgressionSettings::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn intensities(params: &[WeekParams]) -> Vec<f64> {
        params.iter().map(|p| p.intensity_percent).collect()
    }

    #[test]
    fn linear_eight_weeks() {
        let weeks = ModelRegistry::default().resolve("linear", 8).unwrap();
        assert_eq!(weeks.len(), 8);
        assert_eq!(weeks[0].intensity_percent, 65.0);
        assert_eq!(weeks[7].intensity_percent, 82.5);
        assert_eq!(weeks[0].volume_multiplier, 1.0);
        assert!(weeks[7].volume_multiplier < weeks[0].volume_multiplier);
        // 17.5 points over base at 5 points per rep.
        assert_eq!(weeks[0].rep_shift, 0);
        assert_eq!(weeks[7].rep_shift, -3);
    }

    #[test]
    fn linear_is_capped() {
        let weeks = ModelRegistry::default().resolve("linear", 16).unwrap();
        assert_eq!(weeks[15].intensity_percent, 90.0);
        assert_eq!(weeks[11].intensity_percent, 90.0);
        assert_eq!(weeks[10].intensity_percent, 90.0);
        assert_eq!(weeks[9].intensity_percent, 87.5);
    }

    #[test]
    fn wave_restarts_its_cycle() {
        let weeks = ModelRegistry::default().resolve("wave", 6).unwrap();
        assert_eq!(intensities(&weeks), vec![67.5, 75.0, 82.5, 60.0, 67.5, 75.0]);
        assert_eq!(weeks[3].rep_shift, 1);
        assert_eq!(weeks[2].rep_shift, -3);
    }

    #[test]
    fn step_taper_forces_final_deload() {
        let reg = ModelRegistry::default();
        let weeks = reg.resolve("step-taper", 7).unwrap();
        assert_eq!(
            intensities(&weeks),
            vec![70.0, 70.0, 70.0, 77.5, 77.5, 77.5, 60.0]
        );
        assert_eq!(weeks[6].volume_multiplier, 0.5);

        // Mid-cycle end still deloads.
        let weeks = reg.resolve("step-taper", 5).unwrap();
        assert_eq!(weeks[4].intensity_percent, 60.0);

        let single = reg.resolve("step-taper", 1).unwrap();
        assert_eq!(single[0].intensity_percent, 60.0);
    }

    #[test]
    fn aliases_resolve_to_the_same_model() {
        let reg = ModelRegistry::default();
        assert_eq!(
            reg.resolve("undulating", 5).unwrap(),
            reg.resolve("wave", 5).unwrap()
        );
        assert_eq!(reg.get("Block-Taper").unwrap().id, "step-taper");
    }

    #[test]
    fn unknown_model_fails_fast() {
        let err = ModelRegistry::default().resolve("zigzag", 4).unwrap_err();
        assert!(matches!(err, EngineError::UnknownModel(ref id) if id == "zigzag"));
    }

    #[test]
    fn zero_weeks_is_rejected() {
        let err = ModelRegistry::default().resolve("linear", 0).unwrap_err();
        assert_eq!(err.issues()[0].field, "total_weeks");
    }

    #[test]
    fn custom_settings_are_validated() {
        let bad = ProgressionSettings {
            linear_base: 95.0,
            linear_max: 90.0,
            ..ProgressionSettings::default()
        };
        let err = ModelRegistry::new(&bad).unwrap_err();
        assert_eq!(err.issues()[0].field, "models.linear.base");
    }

    #[test]
    fn negative_linear_increment_is_rejected() {
        let bad = ProgressionSettings {
            linear_increment: -5.0,
            ..ProgressionSettings::default()
        };
        let err = ModelRegistry::new(&bad).unwrap_err();
        assert_eq!(err.issues()[0].field, "models.linear.increment");

        let flat = ProgressionSettings {
            linear_increment: 0.0,
            ..ProgressionSettings::default()
        };
        let reg = ModelRegistry::new(&flat).unwrap();
        assert!(intensities(&reg.resolve("linear", 4).unwrap()).iter().all(|i| *i == 65.0));
    }

    proptest! {
        #[test]
        fn every_model_returns_exactly_n_bounded_weeks(n in 1u32..120) {
            let reg = ModelRegistry::default();
            let ids: Vec<String> = reg.ids().map(str::to_string).collect();
            for id in ids {
                let first = reg.resolve(&id, n).unwrap();
                prop_assert_eq!(first.len(), n as usize);
                for (i, p) in first.iter().enumerate() {
                    prop_assert_eq!(p.week, i as u32 + 1);
                    prop_assert!((1.0..=100.0).contains(&p.intensity_percent));
                    prop_assert!(p.volume_multiplier > 0.0 && p.volume_multiplier <= 1.0);
                }
                let second = reg.resolve(&id, n).unwrap();
                prop_assert_eq!(first, second);
            }
        }

        #[test]
        fn linear_never_decreases(n in 1u32..60) {
            let weeks = ModelRegistry::default().resolve("linear", n).unwrap();
            for pair in weeks.windows(2) {
                prop_assert!(pair[0].intensity_percent <= pair[1].intensity_percent);
            }
        }

        #[test]
        fn wave_is_periodic(n in 5u32..60) {
            let weeks = ModelRegistry::default().resolve("wave", n).unwrap();
            for i in 4..weeks.len() {
                prop_assert_eq!(weeks[i].intensity_percent, weeks[i - 4].intensity_percent);
            }
        }

        #[test]
        fn taper_last_week_is_lowest(n in 1u32..40) {
            let weeks = ModelRegistry::default().resolve("step-taper", n).unwrap();
            let last = weeks[weeks.len() - 1];
            for w in &weeks {
                prop_assert!(last.intensity_percent <= w.intensity_percent);
                prop_assert!(last.volume_multiplier <= w.volume_multiplier);
            }
        }
    }
}

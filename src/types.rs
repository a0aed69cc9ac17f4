use std::{fmt::Display, str::FromStr};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Muscle {
    Biceps,
    Triceps,
    Forearms,
    Chest,
    Shoulders,
    Back,
    Lats,
    Traps,
    LowerBack,
    Quads,
    Hamstrings,
    Glutes,
    Adductors,
    Calves,
    Abs,
    Obliques,
    Heart,
}

impl Muscle {
    pub const ALL: [Muscle; 17] = [
        Self::Biceps,
        Self::Triceps,
        Self::Forearms,
        Self::Chest,
        Self::Shoulders,
        Self::Back,
        Self::Lats,
        Self::Traps,
        Self::LowerBack,
        Self::Quads,
        Self::Hamstrings,
        Self::Glutes,
        Self::Adductors,
        Self::Calves,
        Self::Abs,
        Self::Obliques,
        Self::Heart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Biceps => "biceps",
            Self::Triceps => "triceps",
            Self::Forearms => "forearms",
            Self::Chest => "chest",
            Self::Shoulders => "shoulders",
            Self::Back => "back",
            Self::Lats => "lats",
            Self::Traps => "traps",
            Self::LowerBack => "lower-back",
            Self::Quads => "quads",
            Self::Hamstrings => "hamstrings",
            Self::Glutes => "glutes",
            Self::Adductors => "adductors",
            Self::Calves => "calves",
            Self::Abs => "abs",
            Self::Obliques => "obliques",
            Self::Heart => "heart",
        }
    }
}

/// Biomechanical grouping used to decide which exercises can stand in for each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MovementPattern {
    HipHinge,
    Squat,
    HorizontalPush,
    VerticalPush,
    HorizontalPull,
    VerticalPull,
    Lunge,
    Carry,
    Core,
    Accessory,
    Cardio,
    Mobility,
}

impl MovementPattern {
    pub const ALL: [MovementPattern; 12] = [
        Self::HipHinge,
        Self::Squat,
        Self::HorizontalPush,
        Self::VerticalPush,
        Self::HorizontalPull,
        Self::VerticalPull,
        Self::Lunge,
        Self::Carry,
        Self::Core,
        Self::Accessory,
        Self::Cardio,
        Self::Mobility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HipHinge => "hip-hinge",
            Self::Squat => "squat",
            Self::HorizontalPush => "horizontal-push",
            Self::VerticalPush => "vertical-push",
            Self::HorizontalPull => "horizontal-pull",
            Self::VerticalPull => "vertical-pull",
            Self::Lunge => "lunge",
            Self::Carry => "carry",
            Self::Core => "core",
            Self::Accessory => "accessory",
            Self::Cardio => "cardio",
            Self::Mobility => "mobility",
        }
    }

    /// Everything except cardio and mobility.
    pub fn is_strength(&self) -> bool {
        !matches!(self, Self::Cardio | Self::Mobility)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Equipment {
    Barbell,
    Dumbbell,
    Kettlebell,
    Machine,
    Cable,
    Bodyweight,
    Band,
    PullUpBar,
    Bench,
    Box,
    Sled,
    Rower,
    Bike,
    Treadmill,
    SkiErg,
}

impl Equipment {
    pub const ALL: [Equipment; 15] = [
        Self::Barbell,
        Self::Dumbbell,
        Self::Kettlebell,
        Self::Machine,
        Self::Cable,
        Self::Bodyweight,
        Self::Band,
        Self::PullUpBar,
        Self::Bench,
        Self::Box,
        Self::Sled,
        Self::Rower,
        Self::Bike,
        Self::Treadmill,
        Self::SkiErg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Barbell => "barbell",
            Self::Dumbbell => "dumbbell",
            Self::Kettlebell => "kettlebell",
            Self::Machine => "machine",
            Self::Cable => "cable",
            Self::Bodyweight => "bodyweight",
            Self::Band => "band",
            Self::PullUpBar => "pull-up-bar",
            Self::Bench => "bench",
            Self::Box => "box",
            Self::Sled => "sled",
            Self::Rower => "rower",
            Self::Bike => "bike",
            Self::Treadmill => "treadmill",
            Self::SkiErg => "ski-erg",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    Strength,
    Cardio,
    MuscularEndurance,
    Mobility,
    Recovery,
}

impl SessionType {
    pub const ALL: [SessionType; 5] = [
        Self::Strength,
        Self::Cardio,
        Self::MuscularEndurance,
        Self::Mobility,
        Self::Recovery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Cardio => "cardio",
            Self::MuscularEndurance => "muscular-endurance",
            Self::Mobility => "mobility",
            Self::Recovery => "recovery",
        }
    }
}

/// The five canonical heart-rate zones, as fractions of max HR.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HrZone {
    Z1, // Recovery: 50-60% max
    Z2, // Aerobic: 60-70% max
    Z3, // Tempo: 70-80% max
    Z4, // Threshold: 80-90% max
    Z5, // VO2max: 90-100% max
}

impl HrZone {
    pub const ALL: [HrZone; 5] = [Self::Z1, Self::Z2, Self::Z3, Self::Z4, Self::Z5];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Z1 => "z1",
            Self::Z2 => "z2",
            Self::Z3 => "z3",
            Self::Z4 => "z4",
            Self::Z5 => "z5",
        }
    }

    /// Percent-of-max-HR band, lower bound inclusive.
    pub fn percent_band(&self) -> (u32, u32) {
        match self {
            Self::Z1 => (50, 60),
            Self::Z2 => (60, 70),
            Self::Z3 => (70, 80),
            Self::Z4 => (80, 90),
            Self::Z5 => (90, 100),
        }
    }

    /// Beats-per-minute band for an athlete with the given max HR.
    pub fn bpm_range(&self, max_hr: u32) -> (u32, u32) {
        let (lo, hi) = self.percent_band();
        let bpm = |pct: u32| (max_hr as f64 * pct as f64 / 100.0).round() as u32;
        (bpm(lo), bpm(hi))
    }
}

/// Parses from the canonical label, case-insensitively.
macro_rules! impl_label_parsing {
    ($($ty:ident => $what:literal),* $(,)?) => {
        $(
            impl FromStr for $ty {
                type Err = String;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
                    Self::ALL
                        .iter()
                        .copied()
                        .find(|v| v.as_str() == wanted)
                        .ok_or_else(|| format!("unknown {}: `{}`", $what, s))
                }
            }

            impl Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.as_str())
                }
            }
        )*
    };
}

impl_label_parsing! {
    Muscle => "muscle",
    MovementPattern => "movement pattern",
    Equipment => "equipment",
    SessionType => "session type",
}

impl FromStr for HrZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        let digits = raw
            .strip_prefix("zone")
            .or_else(|| raw.strip_prefix('z'))
            .map(str::trim);

        match digits {
            Some("1") => Ok(Self::Z1),
            Some("2") => Ok(Self::Z2),
            Some("3") => Ok(Self::Z3),
            Some("4") => Ok(Self::Z4),
            Some("5") => Ok(Self::Z5),
            _ => Err(format!("unknown heart-rate zone: `{}`", s)),
        }
    }
}

impl Display for HrZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parses a comma-separated list of labels, e.g. `barbell,bench`.
pub fn parse_label_list<T: FromStr<Err = String>>(csv: &str) -> Result<Vec<T>, String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(T::from_str)
        .collect()
}

/// Return the closest candidate for `input`
/// if similarity ≥ 0.80 *and* clearly better than the runner-up.
/// Otherwise return `None` (no suggestion shown).
pub fn best_suggestion<'a, I>(input: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let inp = input.trim().to_ascii_lowercase();
    if inp.is_empty() {
        return None;
    }

    let mut scores: Vec<(&'a str, f64)> = candidates
        .into_iter()
        .map(|c| (c, jaro_winkler(&inp, &c.to_ascii_lowercase())))
        .collect();

    // Highest score first.
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best, best_score) = *scores.first()?;
    let second_score = scores.get(1).map(|(_, s)| *s).unwrap_or(0.0);

    const MIN_SCORE: f64 = 0.80;
    const GAP: f64 = 0.02;

    if best_score >= MIN_SCORE && best_score - second_score >= GAP {
        Some(best)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for p in MovementPattern::ALL {
            assert_eq!(p.as_str().parse::<MovementPattern>(), Ok(p));
        }
        for e in Equipment::ALL {
            assert_eq!(e.as_str().parse::<Equipment>(), Ok(e));
        }
        assert_eq!("Pull_Up_Bar".parse::<Equipment>(), Ok(Equipment::PullUpBar));
        assert!("anvil".parse::<Equipment>().is_err());
    }

    #[test]
    fn hr_zone_accepts_both_spellings() {
        assert_eq!("z3".parse::<HrZone>(), Ok(HrZone::Z3));
        assert_eq!("Zone5".parse::<HrZone>(), Ok(HrZone::Z5));
        assert!("z6".parse::<HrZone>().is_err());
        assert!("tempo".parse::<HrZone>().is_err());
    }

    #[test]
    fn hr_zone_bpm_range_uses_max_hr() {
        assert_eq!(HrZone::Z2.bpm_range(190), (114, 133));
        assert_eq!(HrZone::Z5.bpm_range(200), (180, 200));
    }

    #[test]
    fn parse_label_list_skips_blanks() {
        let eq: Vec<Equipment> = parse_label_list("barbell, ,bench").unwrap();
        assert_eq!(eq, vec![Equipment::Barbell, Equipment::Bench]);
        assert!(parse_label_list::<Equipment>("barbell,anvil").is_err());
    }

    #[test]
    fn suggestion_needs_a_clear_winner() {
        let ids = ["backSquat", "frontSquat", "benchPress"];
        assert_eq!(best_suggestion("bakSquat", ids), Some("backSquat"));
        assert_eq!(best_suggestion("zzz", ids), None);
        assert_eq!(best_suggestion("", ids), None);
    }
}

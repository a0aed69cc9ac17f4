use std::{collections::BTreeMap, fmt::Display};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    error::{EngineError, EngineResult, ValidationIssue},
    models::ReadinessEntry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessZone {
    Critical,
    Struggling,
    Adjusting,
    Good,
    Optimal,
}

impl ReadinessZone {
    pub fn classify(score: u8) -> Self {
        match score {
            85..=u8::MAX => Self::Optimal,
            70..=84 => Self::Good,
            55..=69 => Self::Adjusting,
            40..=54 => Self::Struggling,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::Good => "good",
            Self::Adjusting => "adjusting",
            Self::Struggling => "struggling",
            Self::Critical => "critical",
        }
    }
}

impl Display for ReadinessZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relative weight of each check-in factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessWeights {
    pub sleep: f64,
    pub energy: f64,
    pub soreness: f64,
    pub motivation: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            sleep: 1.0,
            energy: 1.0,
            soreness: 1.0,
            motivation: 1.0,
        }
    }
}

impl ReadinessWeights {
    /// Parses `sleep,energy,soreness,motivation`.
    pub fn from_csv(raw: &str) -> Result<Self, String> {
        let parts: Vec<f64> = raw
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("`{}` is not a number", p.trim()))
            })
            .collect::<Result<_, _>>()?;

        match parts.as_slice() {
            &[sleep, energy, soreness, motivation] => {
                if parts.iter().any(|w| !w.is_finite() || *w < 0.0) || parts.iter().sum::<f64>() <= 0.0 {
                    return Err("weights must be non-negative and not all zero".into());
                }
                Ok(Self {
                    sleep,
                    energy,
                    soreness,
                    motivation,
                })
            }
            _ => Err(format!("expected 4 weights, found {}", parts.len())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessScore {
    pub score: u8,
    pub zone: ReadinessZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessDay {
    pub date: NaiveDate,
    pub score: Option<u8>,
    pub zone: Option<ReadinessZone>,
}

/// A trailing window of daily scores. Days without a check-in stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessSeries {
    pub days: Vec<ReadinessDay>,
    /// Consecutive scored days ending at the window's last day.
    pub streak: u32,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadinessEngine {
    weights: ReadinessWeights,
}

impl ReadinessEngine {
    pub fn new(weights: ReadinessWeights) -> Self {
        Self { weights }
    }

    /// Composite 0-100 score over the factors present in `entry`.
    ///
    /// Each factor maps 1..5 onto 0..100 with soreness inverted. Missing
    /// factors drop out and the remaining weights are renormalized; with no
    /// factors at all there is no score.
    pub fn score(&self, entry: &ReadinessEntry) -> Option<ReadinessScore> {
        let w = &self.weights;
        let factors = [
            (entry.sleep_quality, w.sleep),
            (entry.energy, w.energy),
            (entry.soreness.map(|s| 6u8.saturating_sub(s.clamp(1, 5))), w.soreness),
            (entry.motivation, w.motivation),
        ];

        let (weighted, total) = factors
            .iter()
            .filter_map(|(value, weight)| value.map(|v| (normalize(v), *weight)))
            .fold((0.0, 0.0), |(sum, total), (v, weight)| (sum + v * weight, total + weight));

        if total <= 0.0 {
            return None;
        }

        let score = (weighted / total).round().clamp(0.0, 100.0) as u8;
        Some(ReadinessScore {
            score,
            zone: ReadinessZone::classify(score),
        })
    }

    /// Scores for the `range_days` dates ending at `end`, oldest first.
    ///
    /// When several entries share a date the last one wins.
    pub fn aggregate(&self, entries: &[ReadinessEntry], end: NaiveDate, range_days: u32) -> ReadinessSeries {
        let by_date: BTreeMap<NaiveDate, &ReadinessEntry> =
            entries.iter().map(|e| (e.date, e)).collect();

        let days: Vec<ReadinessDay> = (0..range_days)
            .rev()
            .filter_map(|back| end.checked_sub_days(Days::new(back as u64)))
            .map(|date| {
                let scored = by_date.get(&date).and_then(|e| self.score(e));
                ReadinessDay {
                    date,
                    score: scored.map(|s| s.score),
                    zone: scored.map(|s| s.zone),
                }
            })
            .collect();

        let streak = days.iter().rev().take_while(|d| d.score.is_some()).count() as u32;
        let present: Vec<f64> = days.iter().filter_map(|d| d.score).map(f64::from).collect();
        let mean = (!present.is_empty()).then(|| present.iter().sum::<f64>() / present.len() as f64);

        ReadinessSeries { days, streak, mean }
    }
}

fn normalize(value: u8) -> f64 {
    (value.clamp(1, 5) as f64 - 1.0) / 4.0 * 100.0
}

/// Check-ins keyed by date; writing a date twice keeps the later entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadinessLog {
    entries: BTreeMap<NaiveDate, ReadinessEntry>,
}

impl ReadinessLog {
    pub fn from_entries(entries: impl IntoIterator<Item = ReadinessEntry>) -> EngineResult<Self> {
        let mut log = Self::default();
        for entry in entries {
            log.upsert(entry)?;
        }
        Ok(log)
    }

    /// Inserts or replaces the entry for its date, returning the replaced one.
    pub fn upsert(&mut self, entry: ReadinessEntry) -> EngineResult<Option<ReadinessEntry>> {
        check_entry(&entry)?;
        Ok(self.entries.insert(entry.date, entry))
    }

    pub fn get(&self, date: NaiveDate) -> Option<&ReadinessEntry> {
        self.entries.get(&date)
    }

    pub fn remove(&mut self, date: NaiveDate) -> Option<ReadinessEntry> {
        self.entries.remove(&date)
    }

    /// Entries in date order.
    pub fn entries(&self) -> Vec<ReadinessEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every factor must be within 1-5.
pub fn check_entry(entry: &ReadinessEntry) -> EngineResult<()> {
    let factors = [
        ("sleep_quality", entry.sleep_quality),
        ("energy", entry.energy),
        ("soreness", entry.soreness),
        ("motivation", entry.motivation),
    ];
    let issues: Vec<ValidationIssue> = factors
        .iter()
        .filter_map(|(field, value)| {
            value.filter(|v| !(1..=5).contains(v)).map(|v| {
                ValidationIssue::structure(*field, format!("must be within 1-5, got {v}"))
            })
        })
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(issues))
    }
}

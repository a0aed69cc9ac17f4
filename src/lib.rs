//! Periodization and training analytics.
//!
//! The engine modules are pure and synchronous: templates are validated and
//! materialized into a day-by-day calendar, and training load and readiness
//! are recomputed from history on every call. `db` and `storage` persist the
//! inputs in SQLite for the command-line front end.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod load;
pub mod models;
pub mod phase;
pub mod progression;
pub mod readiness;
pub mod storage;
pub mod substitution;
pub mod template;
pub mod types;
pub mod utils;

pub use catalog::{Exercise, ExerciseCatalog};
pub use error::{EngineError, EngineResult, ValidationIssue, Warning};
pub use load::{AcrZone, LoadSettings, TrainingLoadCalculator, TrainingLoadPoint};
pub use models::{AthleteProfile, PerformedExercise, ReadinessEntry, WorkoutLogEntry};
pub use phase::{DailyPrescription, Phase, Reps, Session};
pub use progression::{ModelRegistry, ProgressionModel, WeekParams};
pub use readiness::{ReadinessEngine, ReadinessLog, ReadinessSeries, ReadinessZone};
pub use template::{Program, TemplateDocument, ValidationReport, materialize, validate};

//! SQLite persistence for everything the engine reads.
//!
//! Rows are read back into plain engine structs; derived views (load,
//! readiness scores, calendars) are never stored.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    catalog::{Exercise, ExerciseCatalog},
    db::DB,
    models::{AthleteProfile, Benchmarks, PerformedExercise, PersonalRecord, ReadinessEntry, WorkoutLogEntry},
    template::TemplateDocument,
    types::{Equipment, MovementPattern, Muscle, SessionType, parse_label_list},
};

const DATE_FMT: &str = "%Y-%m-%d";
const MIN_DATE: &str = "0000-01-01";
const MAX_DATE: &str = "9999-12-31";

fn now() -> String {
    Local::now().to_rfc3339()
}

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FMT).ok()
}

fn join_labels<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

//
// Profile
//

pub async fn load_profile(pool: &DB) -> Result<AthleteProfile> {
    let row: Option<(Option<f64>, Option<i64>, Option<i64>, Option<i64>)> = sqlx::query_as(
        "SELECT body_weight, max_hr, aerobic_threshold_hr, anaerobic_threshold_hr
         FROM profile WHERE id = 1",
    )
    .fetch_optional(pool)
    .await
    .context("Failed to load profile")?;

    let (body_weight, max_hr, aerobic, anaerobic) = row.unwrap_or_default();
    let hr = |v: Option<i64>| v.and_then(|v| u32::try_from(v).ok());

    let equipment: Vec<String> = sqlx::query_scalar("SELECT equipment FROM profile_equipment")
        .fetch_all(pool)
        .await?;
    let equipment: BTreeSet<Equipment> = equipment
        .iter()
        .filter_map(|raw| match raw.parse() {
            Ok(eq) => Some(eq),
            Err(e) => {
                warn!(%e, "skipping unknown equipment row");
                None
            }
        })
        .collect();

    let records: Vec<(String, f64, String)> =
        sqlx::query_as("SELECT key, value, date FROM personal_records ORDER BY key")
            .fetch_all(pool)
            .await?;
    let personal_records = records
        .into_iter()
        .filter_map(|(key, value, date)| match parse_date(&date) {
            Some(date) => Some((key, PersonalRecord { value, date })),
            None => {
                warn!(%key, %date, "skipping personal record with unreadable date");
                None
            }
        })
        .collect();

    Ok(AthleteProfile {
        equipment,
        body_weight,
        personal_records,
        benchmarks: Benchmarks {
            max_hr: hr(max_hr),
            aerobic_threshold_hr: hr(aerobic),
            anaerobic_threshold_hr: hr(anaerobic),
        },
    })
}

/// Replaces the stored profile with `profile`.
pub async fn save_profile(pool: &DB, profile: &AthleteProfile) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO profile(id, body_weight, max_hr, aerobic_threshold_hr, anaerobic_threshold_hr, updated_at)
         VALUES(1, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             body_weight = excluded.body_weight,
             max_hr = excluded.max_hr,
             aerobic_threshold_hr = excluded.aerobic_threshold_hr,
             anaerobic_threshold_hr = excluded.anaerobic_threshold_hr,
             updated_at = excluded.updated_at",
    )
    .bind(profile.body_weight)
    .bind(profile.benchmarks.max_hr.map(i64::from))
    .bind(profile.benchmarks.aerobic_threshold_hr.map(i64::from))
    .bind(profile.benchmarks.anaerobic_threshold_hr.map(i64::from))
    .bind(now())
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM profile_equipment")
        .execute(&mut *tx)
        .await?;
    for eq in &profile.equipment {
        sqlx::query("INSERT INTO profile_equipment(equipment) VALUES(?)")
            .bind(eq.as_str())
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("DELETE FROM personal_records")
        .execute(&mut *tx)
        .await?;
    for (key, record) in &profile.personal_records {
        sqlx::query("INSERT INTO personal_records(key, value, date) VALUES(?, ?, ?)")
            .bind(key)
            .bind(record.value)
            .bind(fmt_date(record.date))
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await.context("Failed to save profile")
}

//
// Custom exercises
//

pub async fn list_custom_exercises(pool: &DB) -> Result<Vec<Exercise>> {
    let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
        "SELECT id, name, pattern, equipment, muscles FROM custom_exercises ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to load custom exercises")?;

    let mut out = Vec::with_capacity(rows.len());
    for (id, name, pattern, equipment, muscles) in rows {
        let parsed = (|| -> Result<Exercise, String> {
            let pattern: MovementPattern = pattern.parse()?;
            Ok(Exercise {
                id: id.clone(),
                name,
                pattern,
                equipment: parse_label_list::<Equipment>(&equipment)?.into_iter().collect(),
                muscles: parse_label_list::<Muscle>(&muscles)?.into_iter().collect(),
                pr_key: None,
                cardio: pattern == MovementPattern::Cardio,
                mobility: pattern == MovementPattern::Mobility,
                custom: true,
            })
        })();

        match parsed {
            Ok(ex) => out.push(ex),
            Err(e) => warn!(%id, %e, "skipping unreadable custom exercise"),
        }
    }
    Ok(out)
}

pub async fn add_custom_exercise(pool: &DB, exercise: &Exercise) -> Result<()> {
    let res = sqlx::query(
        "INSERT INTO custom_exercises(id, name, pattern, equipment, muscles, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
    )
    .bind(&exercise.id)
    .bind(&exercise.name)
    .bind(exercise.pattern.as_str())
    .bind(join_labels(&exercise.equipment))
    .bind(join_labels(&exercise.muscles))
    .bind(now())
    .execute(pool)
    .await;

    match res {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            bail!("an exercise named `{}` already exists", exercise.name)
        }
        Err(e) => Err(e).context("Failed to save custom exercise"),
    }
}

pub async fn delete_custom_exercise(pool: &DB, id: &str) -> Result<bool> {
    let res = sqlx::query("DELETE FROM custom_exercises WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// The built-in catalog with stored custom exercises appended.
pub async fn catalog(pool: &DB) -> Result<ExerciseCatalog> {
    let custom = list_custom_exercises(pool).await?;
    Ok(ExerciseCatalog::builtin().with_custom(custom)?)
}

//
// Workout log
//

pub async fn insert_log(pool: &DB, entry: &WorkoutLogEntry) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO workout_logs(id, date, label, session_type, completed, duration_min, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(fmt_date(entry.date))
    .bind(&entry.label)
    .bind(entry.session_type.map(|t| t.as_str()))
    .bind(entry.completed)
    .bind(entry.duration_min.map(i64::from))
    .bind(now())
    .execute(&mut *tx)
    .await?;

    for (pos, ex) in entry.exercises.iter().enumerate() {
        sqlx::query(
            "INSERT INTO performed_exercises(log_id, position, name, weight, sets, reps, rpe, note)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(pos as i64)
        .bind(&ex.name)
        .bind(ex.weight)
        .bind(i64::from(ex.sets))
        .bind(&ex.reps)
        .bind(ex.rpe)
        .bind(&ex.note)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await.context("Failed to save workout log")
}

type LogRow = (String, String, String, Option<String>, bool, Option<i64>);
type PerformedRow = (String, String, Option<f64>, i64, String, Option<f64>, Option<String>);

/// Logs dated within `[from, to]`, oldest first. Either bound may be open.
pub async fn list_logs(
    pool: &DB,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<WorkoutLogEntry>> {
    let from = from.map(fmt_date).unwrap_or_else(|| MIN_DATE.to_string());
    let to = to.map(fmt_date).unwrap_or_else(|| MAX_DATE.to_string());

    let logs: Vec<LogRow> = sqlx::query_as(
        "SELECT id, date, label, session_type, completed, duration_min
         FROM workout_logs
         WHERE date >= ? AND date <= ?
         ORDER BY date, created_at",
    )
    .bind(&from)
    .bind(&to)
    .fetch_all(pool)
    .await
    .context("Failed to load workout logs")?;

    let performed: Vec<PerformedRow> = sqlx::query_as(
        "SELECT p.log_id, p.name, p.weight, p.sets, p.reps, p.rpe, p.note
         FROM performed_exercises p
         JOIN workout_logs l ON l.id = p.log_id
         WHERE l.date >= ? AND l.date <= ?
         ORDER BY p.log_id, p.position",
    )
    .bind(&from)
    .bind(&to)
    .fetch_all(pool)
    .await?;

    let mut by_log: HashMap<String, Vec<PerformedExercise>> = HashMap::new();
    for (log_id, name, weight, sets, reps, rpe, note) in performed {
        by_log.entry(log_id).or_default().push(PerformedExercise {
            name,
            weight,
            sets: u32::try_from(sets).unwrap_or(0),
            reps,
            rpe,
            note,
        });
    }

    let mut out = Vec::with_capacity(logs.len());
    for (id, date, label, session_type, completed, duration_min) in logs {
        let Some(date) = parse_date(&date) else {
            warn!(%id, %date, "skipping workout log with unreadable date");
            continue;
        };
        let session_type = session_type.and_then(|t| t.parse::<SessionType>().ok());
        let exercises = by_log.remove(&id).unwrap_or_default();
        out.push(WorkoutLogEntry {
            id,
            date,
            label,
            session_type,
            completed,
            duration_min: duration_min.and_then(|m| u32::try_from(m).ok()),
            exercises,
        });
    }
    Ok(out)
}

pub async fn delete_log(pool: &DB, id: &str) -> Result<bool> {
    let res = sqlx::query("DELETE FROM workout_logs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub fn new_log_id() -> String {
    Uuid::new_v4().to_string()
}

//
// Readiness
//

/// Writes the check-in for its date, replacing any earlier one.
pub async fn upsert_readiness(pool: &DB, entry: &ReadinessEntry) -> Result<()> {
    sqlx::query(
        "INSERT INTO readiness_entries
             (date, sleep_quality, energy, soreness, motivation, resting_hr, hrv, note, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(date) DO UPDATE SET
             sleep_quality = excluded.sleep_quality,
             energy = excluded.energy,
             soreness = excluded.soreness,
             motivation = excluded.motivation,
             resting_hr = excluded.resting_hr,
             hrv = excluded.hrv,
             note = excluded.note,
             updated_at = excluded.updated_at",
    )
    .bind(fmt_date(entry.date))
    .bind(entry.sleep_quality.map(i64::from))
    .bind(entry.energy.map(i64::from))
    .bind(entry.soreness.map(i64::from))
    .bind(entry.motivation.map(i64::from))
    .bind(entry.resting_hr.map(i64::from))
    .bind(entry.hrv)
    .bind(&entry.note)
    .bind(now())
    .execute(pool)
    .await
    .context("Failed to save check-in")?;
    Ok(())
}

type ReadinessRow = (
    String,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<f64>,
    Option<String>,
);

pub async fn list_readiness(pool: &DB) -> Result<Vec<ReadinessEntry>> {
    let rows: Vec<ReadinessRow> = sqlx::query_as(
        "SELECT date, sleep_quality, energy, soreness, motivation, resting_hr, hrv, note
         FROM readiness_entries ORDER BY date",
    )
    .fetch_all(pool)
    .await
    .context("Failed to load check-ins")?;

    let factor = |v: Option<i64>| v.and_then(|v| u8::try_from(v).ok());

    Ok(rows
        .into_iter()
        .filter_map(|(date, sleep, energy, soreness, motivation, resting_hr, hrv, note)| {
            let Some(parsed) = parse_date(&date) else {
                warn!(%date, "skipping check-in with unreadable date");
                return None;
            };
            Some(ReadinessEntry {
                date: parsed,
                sleep_quality: factor(sleep),
                energy: factor(energy),
                soreness: factor(soreness),
                motivation: factor(motivation),
                resting_hr: resting_hr.and_then(|v| u32::try_from(v).ok()),
                hrv,
                note,
            })
        })
        .collect())
}

//
// Programs
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredProgram {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub created_at: String,
}

pub async fn save_program(pool: &DB, doc: &TemplateDocument, start_date: NaiveDate) -> Result<StoredProgram> {
    let stored = StoredProgram {
        id: Uuid::new_v4().to_string(),
        name: doc.name.trim().to_string(),
        start_date,
        created_at: now(),
    };
    let json = serde_json::to_string(doc).context("Failed to serialize program")?;

    let res = sqlx::query(
        "INSERT INTO programs(id, name, start_date, document, created_at) VALUES(?, ?, ?, ?, ?)",
    )
    .bind(&stored.id)
    .bind(&stored.name)
    .bind(fmt_date(start_date))
    .bind(json)
    .bind(&stored.created_at)
    .execute(pool)
    .await;

    match res {
        Ok(_) => Ok(stored),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            bail!("a program named `{}` already exists", stored.name)
        }
        Err(e) => Err(e).context("Failed to save program"),
    }
}

type ProgramRow = (String, String, String, String);

fn stored_from_row((id, name, start, created_at): ProgramRow) -> Option<StoredProgram> {
    match parse_date(&start) {
        Some(start_date) => Some(StoredProgram {
            id,
            name,
            start_date,
            created_at,
        }),
        None => {
            warn!(%id, %start, "skipping program with unreadable start date");
            None
        }
    }
}

pub async fn list_programs(pool: &DB) -> Result<Vec<StoredProgram>> {
    let rows: Vec<ProgramRow> = sqlx::query_as(
        "SELECT id, name, start_date, created_at FROM programs ORDER BY created_at",
    )
    .fetch_all(pool)
    .await
    .context("Failed to load programs")?;
    Ok(rows.into_iter().filter_map(stored_from_row).collect())
}

/// Looks a program up by name or id. Without a key, the most recently imported one.
pub async fn get_program(pool: &DB, key: Option<&str>) -> Result<Option<(StoredProgram, TemplateDocument)>> {
    let row: Option<(String, String, String, String, String)> = match key {
        Some(key) => {
            sqlx::query_as(
                "SELECT id, name, start_date, created_at, document FROM programs
                 WHERE name = ? COLLATE NOCASE OR id = ?",
            )
            .bind(key)
            .bind(key)
            .fetch_optional(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT id, name, start_date, created_at, document FROM programs
                 ORDER BY created_at DESC LIMIT 1",
            )
            .fetch_optional(pool)
            .await?
        }
    };

    let Some((id, name, start, created_at, document)) = row else {
        return Ok(None);
    };
    let doc: TemplateDocument = serde_json::from_str(&document)
        .with_context(|| format!("Stored program `{}` is corrupt", name))?;

    Ok(stored_from_row((id, name, start, created_at)).map(|p| (p, doc)))
}

pub async fn delete_program(pool: &DB, key: &str) -> Result<bool> {
    let res = sqlx::query("DELETE FROM programs WHERE name = ? COLLATE NOCASE OR id = ?")
        .bind(key)
        .bind(key)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn entry(id: &str, d: u32) -> WorkoutLogEntry {
        WorkoutLogEntry {
            id: id.into(),
            date: day(d),
            label: "Upper".into(),
            session_type: Some(SessionType::Strength),
            completed: true,
            duration_min: Some(55),
            exercises: vec![
                PerformedExercise {
                    name: "benchPress".into(),
                    weight: Some(80.0),
                    sets: 4,
                    reps: "6-8".into(),
                    rpe: Some(8.5),
                    note: None,
                },
                PerformedExercise {
                    name: "pullUp".into(),
                    weight: None,
                    sets: 3,
                    reps: "10".into(),
                    rpe: None,
                    note: Some("strict".into()),
                },
            ],
        }
    }

    #[tokio::test]
    async fn profile_round_trips() {
        let pool = open_in_memory().await.unwrap();
        assert_eq!(load_profile(&pool).await.unwrap(), AthleteProfile::default());

        let mut profile = AthleteProfile {
            equipment: BTreeSet::from([Equipment::Barbell, Equipment::PullUpBar]),
            body_weight: Some(82.5),
            ..AthleteProfile::default()
        };
        profile.benchmarks.max_hr = Some(188);
        profile.set_pr("deadlift", 200.0, day(2));

        save_profile(&pool, &profile).await.unwrap();
        assert_eq!(load_profile(&pool).await.unwrap(), profile);

        profile.equipment.remove(&Equipment::Barbell);
        save_profile(&pool, &profile).await.unwrap();
        assert_eq!(load_profile(&pool).await.unwrap().equipment.len(), 1);
    }

    #[tokio::test]
    async fn logs_keep_their_exercises_and_cascade_on_delete() {
        let pool = open_in_memory().await.unwrap();
        insert_log(&pool, &entry("b", 9)).await.unwrap();
        insert_log(&pool, &entry("a", 2)).await.unwrap();

        let all = list_logs(&pool, None, None).await.unwrap();
        assert_eq!(all.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(all[0], entry("a", 2));

        let recent = list_logs(&pool, Some(day(5)), None).await.unwrap();
        assert_eq!(recent.len(), 1);

        assert!(delete_log(&pool, "a").await.unwrap());
        assert!(!delete_log(&pool, "a").await.unwrap());
        let orphans: i64 = sqlx::query_scalar("SELECT count(*) FROM performed_exercises WHERE log_id = 'a'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn readiness_upserts_by_date() {
        let pool = open_in_memory().await.unwrap();
        let mut first = ReadinessEntry {
            date: day(3),
            sleep_quality: Some(2),
            energy: Some(2),
            ..ReadinessEntry::default()
        };
        upsert_readiness(&pool, &first).await.unwrap();

        first.sleep_quality = Some(5);
        first.motivation = Some(4);
        upsert_readiness(&pool, &first).await.unwrap();

        let stored = list_readiness(&pool).await.unwrap();
        assert_eq!(stored, vec![first]);
    }

    #[tokio::test]
    async fn custom_exercises_extend_the_catalog() {
        let pool = open_in_memory().await.unwrap();
        let sled = Exercise::custom(
            "Sled Drag",
            MovementPattern::Carry,
            [Equipment::Sled],
            [Muscle::Quads, Muscle::Glutes],
        )
        .unwrap();
        add_custom_exercise(&pool, &sled).await.unwrap();

        let dup = Exercise::custom("sled drag", MovementPattern::Carry, [Equipment::Sled], [])
            .unwrap();
        assert!(add_custom_exercise(&pool, &dup).await.is_err());

        let cat = catalog(&pool).await.unwrap();
        assert_eq!(cat.len(), ExerciseCatalog::builtin().len() + 1);
        assert_eq!(cat.get(&sled.id), Some(&sled));

        assert!(delete_custom_exercise(&pool, &sled.id).await.unwrap());
        assert_eq!(catalog(&pool).await.unwrap().len(), ExerciseCatalog::builtin().len());
    }

    #[tokio::test]
    async fn programs_are_found_by_name_or_latest() {
        let pool = open_in_memory().await.unwrap();
        let doc = TemplateDocument {
            name: "Base".into(),
            description: None,
            total_weeks: None,
            custom_exercises: vec![],
            phases: vec![],
        };
        let stored = save_program(&pool, &doc, day(7)).await.unwrap();
        assert!(save_program(&pool, &doc, day(7)).await.is_err());
        let shouted = TemplateDocument {
            name: "BASE".into(),
            ..doc.clone()
        };
        let err = save_program(&pool, &shouted, day(7)).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let (found, found_doc) = get_program(&pool, Some("base")).await.unwrap().unwrap();
        assert_eq!(found, stored);
        assert_eq!(found_doc, doc);
        assert_eq!(get_program(&pool, None).await.unwrap().map(|(p, _)| p.id), Some(stored.id.clone()));

        assert!(delete_program(&pool, &stored.id).await.unwrap());
        assert!(get_program(&pool, None).await.unwrap().is_none());
        assert!(list_programs(&pool).await.unwrap().is_empty());
    }
}

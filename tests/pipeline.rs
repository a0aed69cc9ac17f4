use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use ironplan::{
    AthleteProfile, ExerciseCatalog, ModelRegistry, PerformedExercise, Program, ReadinessEngine,
    ReadinessEntry, ReadinessLog, Session, TemplateDocument, TrainingLoadCalculator, WorkoutLogEntry,
    db, materialize,
    phase::Slot,
    storage,
    template::PhaseRange,
    types::{Equipment, SessionType},
    validate,
};
use pretty_assertions::assert_eq;

const TEMPLATE: &str = include_str!("fixtures/strength_base.toml");

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

fn full_gym() -> AthleteProfile {
    let mut profile = AthleteProfile {
        equipment: Equipment::ALL.iter().copied().collect(),
        ..AthleteProfile::default()
    };
    profile.benchmarks.max_hr = Some(200);
    profile.set_pr("backSquat", 150.0, start());
    profile
}

fn generate(profile: &AthleteProfile) -> Program {
    let doc = TemplateDocument::from_toml_str(TEMPLATE).unwrap();
    materialize(&doc, profile, ExerciseCatalog::builtin(), &ModelRegistry::default()).unwrap()
}

/// Logs every strength session of the first `weeks` weeks as prescribed.
fn follow(program: &Program, weeks: u32) -> Vec<WorkoutLogEntry> {
    program
        .days
        .iter()
        .filter(|d| d.week <= weeks && d.session.session_type() == SessionType::Strength)
        .map(|d| WorkoutLogEntry {
            id: format!("w{}d{}", d.week, d.day),
            date: Program::date_of(start(), d.week, d.day).unwrap(),
            label: format!("{} week {}", d.phase, d.phase_week),
            session_type: Some(SessionType::Strength),
            completed: true,
            duration_min: Some(60),
            exercises: d
                .session
                .exercises()
                .iter()
                .map(|p| PerformedExercise {
                    name: p.exercise_id.clone(),
                    weight: p.target_weight,
                    sets: p.sets,
                    reps: p.reps.to_string(),
                    rpe: Some(8.0),
                    note: None,
                })
                .collect(),
        })
        .collect()
}

#[test]
fn template_materializes_into_a_full_calendar() {
    let doc = TemplateDocument::from_toml_str(TEMPLATE).unwrap();
    let report = validate(&doc, ExerciseCatalog::builtin(), &ModelRegistry::default());
    assert!(report.is_valid(), "{:?}", report.issues);

    let program = generate(&full_gym());
    assert_eq!(program.total_weeks(), 5);
    assert_eq!(program.days.len(), 35);
    assert!(program.warnings.is_empty());

    // Week ranges survive the trip through the generated calendar.
    assert_eq!(
        program.phase_ranges(),
        vec![
            PhaseRange {
                name: "Base".into(),
                start_week: 1,
                end_week: 3
            },
            PhaseRange {
                name: "Hold".into(),
                start_week: 4,
                end_week: 5
            },
        ]
    );

    for d in &program.days {
        let date = Program::date_of(start(), d.week, d.day).unwrap();
        assert_eq!(program.on_date(start(), date), Some(d));
    }
    assert_eq!(program.on_date(start(), start() - Days::new(1)), None);
    assert_eq!(program.on_date(start(), start() + Days::new(35)), None);
}

#[test]
fn linear_weeks_drive_target_weights() {
    let program = generate(&full_gym());
    let squat = |week| program.day(week, 1).unwrap().session.exercises()[0].clone();

    assert_eq!(squat(1).intensity_percent, Some(65.0));
    assert_eq!(squat(1).target_weight, Some(97.5));
    assert_eq!(squat(3).intensity_percent, Some(70.0));
    assert_eq!(squat(3).target_weight, Some(105.0));

    // Bench has no recorded max, so no absolute load.
    assert_eq!(program.day(1, 1).unwrap().session.exercises()[1].target_weight, None);

    match &program.day(1, 2).unwrap().session {
        Session::Cardio(c) => {
            assert_eq!(c.activity, "bike");
            assert_eq!(c.target_hr, Some((120, 140)));
        }
        other => panic!("expected cardio, got {:?}", other),
    }
}

#[test]
fn home_gym_gets_substitutes_or_warnings() {
    let catalog = ExerciseCatalog::builtin();
    let equipment: BTreeSet<Equipment> = [Equipment::Dumbbell, Equipment::Bench, Equipment::Bodyweight]
        .into_iter()
        .collect();
    let profile = AthleteProfile {
        equipment: equipment.clone(),
        ..AthleteProfile::default()
    };

    let program = generate(&profile);
    let mut unresolved = 0;
    for d in &program.days {
        for p in d.session.exercises() {
            let ex = catalog.get(&p.exercise_id).unwrap();
            match &p.slot {
                Slot::Prescribed => assert!(ex.usable_with(&equipment), "{}", ex.id),
                Slot::Substituted { original } => {
                    assert_ne!(original, &p.exercise_id);
                    assert_eq!(catalog.get(original).unwrap().pattern, ex.pattern);
                    assert!(ex.usable_with(&equipment));
                }
                Slot::Unresolved => unresolved += 1,
            }
        }
    }

    let squat = &program.day(1, 1).unwrap().session.exercises()[0];
    assert_ne!(squat.slot, Slot::Prescribed);

    // One warning per unresolved template slot, not per generated day.
    let unresolved_templates: BTreeSet<_> = program
        .days
        .iter()
        .flat_map(|d| {
            d.session
                .exercises()
                .iter()
                .filter(|p| p.slot == Slot::Unresolved)
                .map(move |p| (d.phase.clone(), d.day, p.exercise_id.clone()))
        })
        .collect();
    assert_eq!(program.warnings.len(), unresolved_templates.len());
    assert_eq!(unresolved == 0, program.warnings.is_empty());
}

#[test]
fn following_the_plan_builds_chronic_load() {
    let program = generate(&full_gym());
    let log = follow(&program, 3);
    assert_eq!(log.len(), 6);

    let calc = TrainingLoadCalculator::default();
    let points = calc.compute(&log);
    assert_eq!(points.len(), 6);
    assert!(points.iter().all(|p| p.acr.is_some() && p.zone.is_some()));

    // Skipping the last week's sessions lowers acute load more than chronic.
    let mut skipped = log.clone();
    for entry in skipped.iter_mut().filter(|e| e.date >= start() + Days::new(14)) {
        entry.completed = false;
    }
    let full_last = *points.last().unwrap();
    let skip_last = *calc.compute(&skipped).last().unwrap();
    assert!(skip_last.atl < full_last.atl);
    assert!(full_last.atl - skip_last.atl > full_last.ctl - skip_last.ctl);
}

#[test]
fn readiness_history_replaces_same_day_checkins() {
    let day = |offset| start() + Days::new(offset);
    let mut log = ReadinessLog::default();
    for offset in 0..5 {
        log.upsert(ReadinessEntry {
            date: day(offset),
            sleep_quality: Some(4),
            energy: Some(4),
            soreness: Some(2),
            motivation: Some(4),
            ..ReadinessEntry::default()
        })
        .unwrap();
    }
    let replaced = log
        .upsert(ReadinessEntry {
            date: day(4),
            sleep_quality: Some(1),
            energy: Some(1),
            soreness: Some(5),
            motivation: Some(1),
            ..ReadinessEntry::default()
        })
        .unwrap();
    assert!(replaced.is_some());
    assert_eq!(log.len(), 5);

    let series = ReadinessEngine::default().aggregate(&log.entries(), day(4), 7);
    assert_eq!(series.days.len(), 7);
    assert_eq!(series.streak, 5);
    assert_eq!(series.days[6].score, Some(0));
    assert_eq!(series.days[5].score, Some(75));
    assert_eq!(series.days[0].score, None);
    assert_eq!(series.mean, Some(60.0));
}

#[tokio::test]
async fn stored_program_regenerates_identically() {
    let pool = db::open_in_memory().await.unwrap();
    let profile = full_gym();
    storage::save_profile(&pool, &profile).await.unwrap();

    let doc = TemplateDocument::from_toml_str(TEMPLATE).unwrap();
    storage::save_program(&pool, &doc, start()).await.unwrap();

    let (stored, loaded) = storage::get_program(&pool, None).await.unwrap().unwrap();
    assert_eq!(stored.start_date, start());
    assert_eq!(loaded, doc);

    let catalog = storage::catalog(&pool).await.unwrap();
    let profile = storage::load_profile(&pool).await.unwrap();
    let registry = ModelRegistry::default();
    let regenerated = materialize(&loaded, &profile, &catalog, &registry).unwrap();
    assert_eq!(regenerated, generate(&full_gym()));

    // Load recomputed from stored history matches the in-memory log.
    let log = follow(&regenerated, 3);
    for entry in &log {
        storage::insert_log(&pool, entry).await.unwrap();
    }
    let stored_log = storage::list_logs(&pool, None, None).await.unwrap();
    let calc = TrainingLoadCalculator::default();
    assert_eq!(calc.compute(&stored_log), calc.compute(&log));
}

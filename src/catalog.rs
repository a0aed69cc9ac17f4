//! Exercise reference data.
//!
//! The built-in catalog is loaded once and shared by reference; custom
//! exercises are layered on top with [`ExerciseCatalog::with_custom`], which
//! returns a new catalog instead of mutating the shared one.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{EngineError, EngineResult, ValidationIssue},
    types::{Equipment, MovementPattern, Muscle, best_suggestion},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub pattern: MovementPattern,
    /// What the exercise calls for. A substitute only needs one of these.
    pub equipment: BTreeSet<Equipment>,
    pub muscles: BTreeSet<Muscle>,
    /// Key into the athlete's personal records, used for load-percentage math.
    #[serde(default)]
    pub pr_key: Option<String>,
    #[serde(default)]
    pub cardio: bool,
    #[serde(default)]
    pub mobility: bool,
    #[serde(default)]
    pub custom: bool,
}

impl Exercise {
    /// Creates a user-authored exercise with a generated identity.
    pub fn custom(
        name: &str,
        pattern: MovementPattern,
        equipment: impl IntoIterator<Item = Equipment>,
        muscles: impl IntoIterator<Item = Muscle>,
    ) -> EngineResult<Self> {
        let exercise = Self {
            id: format!("custom-{}", Uuid::new_v4()),
            name: name.trim().to_string(),
            pattern,
            equipment: equipment.into_iter().collect(),
            muscles: muscles.into_iter().collect(),
            pr_key: None,
            cardio: pattern == MovementPattern::Cardio,
            mobility: pattern == MovementPattern::Mobility,
            custom: true,
        };
        exercise.check()?;
        Ok(exercise)
    }

    pub fn is_cardio(&self) -> bool {
        self.cardio || self.pattern == MovementPattern::Cardio
    }

    pub fn is_mobility(&self) -> bool {
        self.mobility || self.pattern == MovementPattern::Mobility
    }

    /// True when at least one listed piece of equipment is available.
    pub fn usable_with(&self, available: &BTreeSet<Equipment>) -> bool {
        !self.equipment.is_disjoint(available)
    }

    /// True when every listed piece of equipment is available.
    pub fn fully_equipped(&self, available: &BTreeSet<Equipment>) -> bool {
        self.equipment.is_subset(available)
    }

    fn check(&self) -> EngineResult<()> {
        let mut issues = Vec::new();
        if self.id.trim().is_empty() {
            issues.push(ValidationIssue::structure("id", "must not be empty"));
        }
        if self.name.is_empty() {
            issues.push(ValidationIssue::structure(
                format!("{}.name", self.id),
                "must not be empty",
            ));
        }
        if self.equipment.is_empty() {
            issues.push(ValidationIssue::structure(
                format!("{}.equipment", self.id),
                "at least one piece of equipment is required",
            ));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(issues))
        }
    }
}

/// Immutable, insertion-ordered set of exercises with an id index.
#[derive(Debug, Clone)]
pub struct ExerciseCatalog {
    exercises: Vec<Exercise>,
    index: HashMap<String, usize>,
}

static BUILTIN: Lazy<ExerciseCatalog> = Lazy::new(|| ExerciseCatalog::from_trusted(builtin_exercises()));

impl ExerciseCatalog {
    /// Builds a catalog, rejecting duplicate ids and exercises without equipment.
    pub fn new(exercises: Vec<Exercise>) -> EngineResult<Self> {
        let mut issues = Vec::new();
        let mut index = HashMap::with_capacity(exercises.len());

        for (pos, ex) in exercises.iter().enumerate() {
            if let Err(e) = ex.check() {
                issues.extend(e.issues().iter().cloned());
            }
            if index.insert(ex.id.clone(), pos).is_some() {
                issues.push(ValidationIssue::structure(
                    format!("{}.id", ex.id),
                    "duplicate exercise id",
                ));
            }
        }

        if issues.is_empty() {
            Ok(Self { exercises, index })
        } else {
            Err(EngineError::Validation(issues))
        }
    }

    fn from_trusted(exercises: Vec<Exercise>) -> Self {
        let index = exercises
            .iter()
            .enumerate()
            .map(|(pos, ex)| (ex.id.clone(), pos))
            .collect();
        Self { exercises, index }
    }

    /// The process-wide built-in catalog.
    pub fn builtin() -> &'static ExerciseCatalog {
        &BUILTIN
    }

    /// A new catalog with `custom` appended after the existing entries.
    pub fn with_custom(&self, custom: impl IntoIterator<Item = Exercise>) -> EngineResult<Self> {
        let mut all = self.exercises.clone();
        all.extend(custom.into_iter().map(|mut ex| {
            ex.custom = true;
            ex
        }));
        Self::new(all)
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.index.get(id).map(|&pos| &self.exercises[pos])
    }

    pub fn resolve(&self, id: &str) -> EngineResult<&Exercise> {
        self.get(id).ok_or_else(|| EngineError::UnknownExercise {
            id: id.to_string(),
            suggestion: self.suggest(id).map(str::to_string),
        })
    }

    /// Looks up by id first, then by case-insensitive display name.
    pub fn find(&self, id_or_name: &str) -> Option<&Exercise> {
        let needle = id_or_name.trim();
        self.get(needle).or_else(|| {
            self.exercises
                .iter()
                .find(|ex| ex.name.eq_ignore_ascii_case(needle))
        })
    }

    /// Insertion position, used as the deterministic tiebreaker.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn suggest(&self, id: &str) -> Option<&str> {
        best_suggestion(id, self.exercises.iter().map(|ex| ex.id.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exercise> {
        self.exercises.iter()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

fn ex(
    id: &str,
    name: &str,
    pattern: MovementPattern,
    equipment: &[Equipment],
    muscles: &[Muscle],
    pr_key: Option<&str>,
) -> Exercise {
    Exercise {
        id: id.to_string(),
        name: name.to_string(),
        pattern,
        equipment: equipment.iter().copied().collect(),
        muscles: muscles.iter().copied().collect(),
        pr_key: pr_key.map(str::to_string),
        cardio: pattern == MovementPattern::Cardio,
        mobility: pattern == MovementPattern::Mobility,
        custom: false,
    }
}

fn builtin_exercises() -> Vec<Exercise> {
    use Equipment::*;
    use MovementPattern as P;
    use Muscle::*;

    vec![
        //
        // Squat
        //
        ex("backSquat", "Back Squat", P::Squat, &[Barbell], &[Quads, Glutes, Adductors, LowerBack], Some("backSquat")),
        ex("frontSquat", "Front Squat", P::Squat, &[Barbell], &[Quads, Glutes, Abs], Some("frontSquat")),
        ex("boxSquat", "Box Squat", P::Squat, &[Barbell, Box], &[Quads, Glutes, Hamstrings], None),
        ex("gobletSquat", "Goblet Squat", P::Squat, &[Dumbbell, Kettlebell], &[Quads, Glutes], None),
        ex("legPress", "Leg Press", P::Squat, &[Machine], &[Quads, Glutes], None),
        ex("hackSquat", "Hack Squat", P::Squat, &[Machine], &[Quads, Glutes, Adductors], None),
        ex("airSquat", "Air Squat", P::Squat, &[Bodyweight], &[Quads, Glutes], None),
        //
        // Hip hinge
        //
        ex("deadlift", "Deadlift", P::HipHinge, &[Barbell], &[Hamstrings, Glutes, LowerBack, Back], Some("deadlift")),
        ex("romanianDeadlift", "Romanian Deadlift", P::HipHinge, &[Barbell, Dumbbell], &[Hamstrings, Glutes, LowerBack], None),
        ex("hipThrust", "Hip Thrust", P::HipHinge, &[Barbell, Bench], &[Glutes, Hamstrings], None),
        ex("kettlebellSwing", "Kettlebell Swing", P::HipHinge, &[Kettlebell], &[Glutes, Hamstrings, LowerBack], None),
        ex("backExtension", "Back Extension", P::HipHinge, &[Machine, Bodyweight], &[LowerBack, Glutes, Hamstrings], None),
        ex("cablePullThrough", "Cable Pull-Through", P::HipHinge, &[Cable], &[Glutes, Hamstrings], None),
        //
        // Horizontal push
        //
        ex("benchPress", "Bench Press", P::HorizontalPush, &[Barbell, Bench], &[Chest, Triceps, Shoulders], Some("benchPress")),
        ex("dumbbellBenchPress", "Dumbbell Bench Press", P::HorizontalPush, &[Dumbbell, Bench], &[Chest, Triceps, Shoulders], None),
        ex("machineChestPress", "Machine Chest Press", P::HorizontalPush, &[Machine], &[Chest, Triceps], None),
        ex("pushUp", "Push-Up", P::HorizontalPush, &[Bodyweight], &[Chest, Triceps, Abs], None),
        //
        // Vertical push
        //
        ex("overheadPress", "Overhead Press", P::VerticalPush, &[Barbell], &[Shoulders, Triceps, Traps], Some("overheadPress")),
        ex("dumbbellShoulderPress", "Dumbbell Shoulder Press", P::VerticalPush, &[Dumbbell], &[Shoulders, Triceps], None),
        ex("machineShoulderPress", "Machine Shoulder Press", P::VerticalPush, &[Machine], &[Shoulders, Triceps], None),
        ex("pikePushUp", "Pike Push-Up", P::VerticalPush, &[Bodyweight], &[Shoulders, Triceps], None),
        //
        // Horizontal pull
        //
        ex("barbellRow", "Barbell Row", P::HorizontalPull, &[Barbell], &[Back, Lats, Biceps], Some("barbellRow")),
        ex("dumbbellRow", "Dumbbell Row", P::HorizontalPull, &[Dumbbell], &[Back, Lats, Biceps], None),
        ex("seatedCableRow", "Seated Cable Row", P::HorizontalPull, &[Cable, Machine], &[Back, Lats, Biceps], None),
        ex("invertedRow", "Inverted Row", P::HorizontalPull, &[Bodyweight], &[Back, Biceps], None),
        ex("bandRow", "Band Row", P::HorizontalPull, &[Band], &[Back, Biceps], None),
        //
        // Vertical pull
        //
        ex("pullUp", "Pull-Up", P::VerticalPull, &[PullUpBar], &[Lats, Biceps, Back], Some("pullUp")),
        ex("chinUp", "Chin-Up", P::VerticalPull, &[PullUpBar], &[Lats, Biceps], None),
        ex("latPulldown", "Lat Pulldown", P::VerticalPull, &[Cable, Machine], &[Lats, Biceps], None),
        ex("bandPulldown", "Band Pulldown", P::VerticalPull, &[Band], &[Lats], None),
        //
        // Lunge
        //
        ex("walkingLunge", "Walking Lunge", P::Lunge, &[Bodyweight, Dumbbell], &[Quads, Glutes], None),
        ex("bulgarianSplitSquat", "Bulgarian Split Squat", P::Lunge, &[Dumbbell, Bodyweight], &[Quads, Glutes, Adductors], None),
        ex("reverseLunge", "Reverse Lunge", P::Lunge, &[Barbell, Dumbbell], &[Quads, Glutes, Hamstrings], None),
        ex("stepUp", "Step-Up", P::Lunge, &[Box], &[Quads, Glutes], None),
        //
        // Carry
        //
        ex("farmersCarry", "Farmer's Carry", P::Carry, &[Dumbbell, Kettlebell], &[Forearms, Traps, Abs], None),
        ex("suitcaseCarry", "Suitcase Carry", P::Carry, &[Kettlebell, Dumbbell], &[Obliques, Forearms], None),
        ex("sledPush", "Sled Push", P::Carry, &[Sled], &[Quads, Glutes, Calves], None),
        //
        // Core
        //
        ex("plank", "Plank", P::Core, &[Bodyweight], &[Abs, Obliques], None),
        ex("hangingLegRaise", "Hanging Leg Raise", P::Core, &[PullUpBar], &[Abs, Forearms], None),
        ex("pallofPress", "Pallof Press", P::Core, &[Cable, Band], &[Obliques, Abs], None),
        ex("deadBug", "Dead Bug", P::Core, &[Bodyweight], &[Abs], None),
        //
        // Accessory
        //
        ex("bicepsCurl", "Biceps Curl", P::Accessory, &[Dumbbell, Barbell, Cable], &[Biceps, Forearms], None),
        ex("tricepsPushdown", "Triceps Pushdown", P::Accessory, &[Cable, Band], &[Triceps], None),
        ex("lateralRaise", "Lateral Raise", P::Accessory, &[Dumbbell, Cable], &[Shoulders], None),
        ex("facePull", "Face Pull", P::Accessory, &[Cable, Band], &[Shoulders, Traps], None),
        ex("calfRaise", "Calf Raise", P::Accessory, &[Machine, Bodyweight], &[Calves], None),
        //
        // Cardio
        //
        ex("rowErg", "Rowing Ergometer", P::Cardio, &[Rower], &[Heart, Back, Quads], None),
        ex("bikeErg", "Bike Ergometer", P::Cardio, &[Bike], &[Heart, Quads], None),
        ex("treadmillRun", "Treadmill Run", P::Cardio, &[Treadmill], &[Heart, Calves, Quads], None),
        ex("outdoorRun", "Outdoor Run", P::Cardio, &[Bodyweight], &[Heart, Calves, Quads], None),
        ex("skiErg", "Ski Ergometer", P::Cardio, &[SkiErg], &[Heart, Lats, Triceps], None),
        //
        // Mobility
        //
        ex("hipMobilityFlow", "Hip Mobility Flow", P::Mobility, &[Bodyweight], &[Glutes, Adductors], None),
        ex("thoracicRotation", "Thoracic Rotation", P::Mobility, &[Bodyweight], &[Back], None),
        ex("couchStretch", "Couch Stretch", P::Mobility, &[Bodyweight], &[Quads], None),
    ]
}

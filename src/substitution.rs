use std::collections::BTreeSet;

use crate::{
    catalog::{Exercise, ExerciseCatalog},
    error::EngineResult,
    types::Equipment,
};

/// Ranked alternatives for `exercise_id` that can be done with `available`.
///
/// A candidate shares the movement pattern and needs only one usable piece
/// of its listed equipment. Cardio and mobility entries never stand in for a
/// strength pattern. Results are ordered by shared target muscles, then by
/// catalog position.
pub fn swaps_for<'a>(
    catalog: &'a ExerciseCatalog,
    exercise_id: &str,
    available: &BTreeSet<Equipment>,
) -> EngineResult<Vec<&'a Exercise>> {
    let source = catalog.resolve(exercise_id)?;
    let strength_pool = source.pattern.is_strength();

    let mut ranked: Vec<(usize, usize, &Exercise)> = catalog
        .iter()
        .enumerate()
        .filter(|(_, ex)| ex.id != source.id)
        .filter(|(_, ex)| ex.pattern == source.pattern)
        .filter(|(_, ex)| !(strength_pool && (ex.is_cardio() || ex.is_mobility())))
        .filter(|(_, ex)| ex.usable_with(available))
        .map(|(pos, ex)| (ex.muscles.intersection(&source.muscles).count(), pos, ex))
        .collect();

    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    Ok(ranked.into_iter().map(|(_, _, ex)| ex).collect())
}

/// The best swap, if any.
pub fn nearest<'a>(
    catalog: &'a ExerciseCatalog,
    exercise_id: &str,
    available: &BTreeSet<Equipment>,
) -> EngineResult<Option<&'a Exercise>> {
    Ok(swaps_for(catalog, exercise_id, available)?.into_iter().next())
}

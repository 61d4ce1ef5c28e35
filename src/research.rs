//! Astrophysics research cost, used as the default target requirement

use serde::{Deserialize, Serialize};

use crate::models::ResourceVector;

const BASE_COST: ResourceVector = ResourceVector {
    metal: 4_000.0,
    crystal: 8_000.0,
    deuterium: 4_000.0,
};

const COST_MULTIPLIER: f64 = 1.75;

/// Highest research level considered; larger levels are capped to it
pub const MAX_LEVEL: i64 = 100;

/// Research level range to plan for. `from` is the current level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelRange {
    pub from: i64,
    pub to: i64,
}

/// Cost of a single research level
pub fn level_cost(level: i64) -> ResourceVector {
    let factor = COST_MULTIPLIER.powi((level.clamp(1, MAX_LEVEL) - 1) as i32);
    ResourceVector::from_fn(|r| (BASE_COST.get(r) * factor).round())
}

/// Total cost of researching up to `range.to`.
///
/// Sums levels `from + 1 ..= to` when `0 < from < to`, otherwise the cost of
/// level `to` alone. Returns `None` when there is no target level.
/// Levels above [`MAX_LEVEL`] are capped.
pub fn range_cost(range: LevelRange) -> Option<ResourceVector> {
    if range.to <= 0 {
        return None;
    }
    let range = LevelRange {
        from: range.from.min(MAX_LEVEL),
        to: range.to.min(MAX_LEVEL),
    };

    if range.from > 0 && range.from < range.to {
        let total = (range.from + 1..=range.to)
            .map(level_cost)
            .fold(ResourceVector::ZERO, |acc, cost| acc + cost);
        Some(total)
    } else {
        Some(level_cost(range.to))
    }
}

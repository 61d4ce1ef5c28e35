//! Storage capacity model

use crate::models::{AllyClass, Resource, ResourceVector, StorageLevels};

/// Capacity of an unbuilt storage
pub const BASE_CAPACITY: f64 = 10_000.0;

const GROWTH: f64 = 20.0 / 33.0;

/// Capacity of a storage building at `level`, before bonuses
pub fn capacity_base(level: i64) -> f64 {
    if level <= 0 {
        return BASE_CAPACITY;
    }
    (2.5 * (GROWTH * level as f64).exp()).floor() * 5000.0
}

/// Capacity with a percentage bonus and a class bonus applied
pub fn capacity(level: i64, bonus_percent: f64, class_bonus_percent: f64) -> f64 {
    let bonus = finite_or_zero(bonus_percent) + finite_or_zero(class_bonus_percent);
    (capacity_base(level) * (1.0 + bonus / 100.0)).round()
}

/// Capacity of each resource's storage
pub fn capacities(levels: &StorageLevels, bonus_percent: f64, ally_class: AllyClass) -> ResourceVector {
    ResourceVector::from_fn(|r: Resource| {
        capacity(levels.get(r), bonus_percent, ally_class.storage_bonus_percent())
    })
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

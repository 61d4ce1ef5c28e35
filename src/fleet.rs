//! Ship catalog and fleet loss estimation
//!
//! A destroyed fleet leaves a debris field worth a fraction of the ships'
//! construction cost. Salvage is floored per line so the estimate never
//! promises more than a recycler can actually collect.

use log::warn;

use crate::models::{FleetLine, Resource, ResourceVector, ShipType};

/// Debris yield used when no valid ratio is configured
pub const DEFAULT_DEBRIS_RATIO: f64 = 0.7;

pub const SHIPS: &[ShipType] = &[
    ship("lf", "Light Fighter", 3_000.0, 1_000.0, 0.0),
    ship("hf", "Heavy Fighter", 6_000.0, 4_000.0, 0.0),
    ship("cr", "Cruiser", 20_000.0, 7_000.0, 2_000.0),
    ship("bs", "Battleship", 45_000.0, 15_000.0, 0.0),
    ship("bc", "Battlecruiser", 30_000.0, 40_000.0, 15_000.0),
    ship("bom", "Bomber", 50_000.0, 25_000.0, 15_000.0),
    ship("des", "Destroyer", 60_000.0, 50_000.0, 15_000.0),
    ship("rip", "Deathstar", 5_000_000.0, 4_000_000.0, 1_000_000.0),
    ship("expo", "Pathfinder", 8_000.0, 15_000.0, 8_000.0),
    ship("reap", "Reaper", 85_000.0, 55_000.0, 20_000.0),
    ship("sc", "Small Cargo", 2_000.0, 2_000.0, 0.0),
    ship("lc", "Large Cargo", 6_000.0, 6_000.0, 0.0),
    ship("col", "Colony Ship", 10_000.0, 20_000.0, 10_000.0),
    ship("rec", "Recycler", 10_000.0, 6_000.0, 2_000.0),
    ship("spy", "Espionage Probe", 0.0, 1_000.0, 0.0),
];

const fn ship(
    key: &'static str,
    name: &'static str,
    metal_cost: f64,
    crystal_cost: f64,
    deuterium_cost: f64,
) -> ShipType {
    ShipType {
        key,
        name,
        metal_cost,
        crystal_cost,
        deuterium_cost,
    }
}

/// Look up a ship by its catalog key
pub fn find_ship(key: &str) -> Option<&'static ShipType> {
    let key = key.trim();
    SHIPS.iter().find(|s| s.key.eq_ignore_ascii_case(key))
}

/// Convert a configured debris percentage into a ratio in [0, 1].
/// Unset or non-finite input yields the default ratio.
pub fn debris_ratio(percent: Option<f64>) -> f64 {
    match percent {
        Some(p) if p.is_finite() => p.clamp(0.0, 100.0) / 100.0,
        _ => DEFAULT_DEBRIS_RATIO,
    }
}

/// Per-line result. `None` for lines that contribute nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLoss {
    pub ship: &'static ShipType,
    pub quantity: i64,
    pub points: f64,
    pub salvage: ResourceVector,
}

/// Aggregate loss for a whole fleet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetLoss {
    pub lines: Vec<Option<LineLoss>>,
    /// Sum of per-line point values, unrounded
    pub points: f64,
    pub salvage: ResourceVector,
}

impl FleetLoss {
    /// Lost points as reported: the rounded sum of unrounded line values
    pub fn total_points(&self) -> f64 {
        self.points.round()
    }

    pub fn has_salvage(&self) -> bool {
        self.salvage.any_positive()
    }
}

/// Estimate the debris and point loss of a fleet at the given yield ratio
pub fn estimate_loss(lines: &[FleetLine], ratio: f64) -> FleetLoss {
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        DEFAULT_DEBRIS_RATIO
    };

    let mut loss = FleetLoss::default();

    for line in lines {
        let Some(ship) = find_ship(&line.ship) else {
            warn!("Ignoring fleet line with unknown ship '{}'", line.ship);
            loss.lines.push(None);
            continue;
        };

        if line.quantity <= 0 {
            loss.lines.push(None);
            continue;
        }

        let quantity = line.quantity as f64;
        let points = ship.total_cost() / 1000.0 * quantity;
        let salvage = ResourceVector::from_fn(|r: Resource| (ship.cost(r) * quantity * ratio).floor());

        loss.points += points;
        loss.salvage = loss.salvage + salvage;
        loss.lines.push(Some(LineLoss {
            ship,
            quantity: line.quantity,
            points,
            salvage,
        }));
    }

    loss
}

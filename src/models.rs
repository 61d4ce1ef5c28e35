//! Data models for resources, exchange rates, ships and storage

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three tradable resources, in fixed priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Metal,
    Crystal,
    Deuterium,
}

impl Resource {
    /// Priority order used for every tie-break: metal > crystal > deuterium
    pub const ALL: [Resource; 3] = [Resource::Metal, Resource::Crystal, Resource::Deuterium];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Metal => "metal",
            Resource::Crystal => "crystal",
            Resource::Deuterium => "deuterium",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Resource::Metal => "Metal",
            Resource::Crystal => "Crystal",
            Resource::Deuterium => "Deuterium",
        }
    }

    /// Name of the building that stores this resource
    pub fn storage_name(self) -> &'static str {
        match self {
            Resource::Metal => "Metal Storage",
            Resource::Crystal => "Crystal Storage",
            Resource::Deuterium => "Deuterium Tank",
        }
    }

    /// Parse a user selection where "none" means nothing was selected
    pub fn parse_selection(text: &str) -> Result<Option<Resource>, UnknownResource> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource '{0}' (expected metal, crystal or deuterium)")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metal" | "m" => Ok(Resource::Metal),
            "crystal" | "c" => Ok(Resource::Crystal),
            "deuterium" | "deut" | "d" => Ok(Resource::Deuterium),
            _ => Err(UnknownResource(s.to_string())),
        }
    }
}

/// An amount of each resource. Used for stock, salvage, targets,
/// production rates, deficits and surpluses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceVector {
    pub metal: f64,
    pub crystal: f64,
    pub deuterium: f64,
}

impl ResourceVector {
    pub const ZERO: ResourceVector = ResourceVector {
        metal: 0.0,
        crystal: 0.0,
        deuterium: 0.0,
    };

    pub fn new(metal: f64, crystal: f64, deuterium: f64) -> Self {
        Self {
            metal,
            crystal,
            deuterium,
        }
    }

    pub fn get(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Metal => self.metal,
            Resource::Crystal => self.crystal,
            Resource::Deuterium => self.deuterium,
        }
    }

    pub fn get_mut(&mut self, resource: Resource) -> &mut f64 {
        match resource {
            Resource::Metal => &mut self.metal,
            Resource::Crystal => &mut self.crystal,
            Resource::Deuterium => &mut self.deuterium,
        }
    }

    pub fn set(&mut self, resource: Resource, value: f64) {
        *self.get_mut(resource) = value;
    }

    /// Build a vector by evaluating `f` for each resource
    pub fn from_fn(mut f: impl FnMut(Resource) -> f64) -> Self {
        Self {
            metal: f(Resource::Metal),
            crystal: f(Resource::Crystal),
            deuterium: f(Resource::Deuterium),
        }
    }

    pub fn any_positive(&self) -> bool {
        Resource::ALL.iter().any(|&r| self.get(r) > 0.0)
    }

    /// Replace negative, NaN and infinite components with 0
    pub fn sanitized(&self) -> ResourceVector {
        ResourceVector::from_fn(|r| non_negative(self.get(r)))
    }
}

impl Add for ResourceVector {
    type Output = ResourceVector;

    fn add(self, other: ResourceVector) -> ResourceVector {
        ResourceVector::from_fn(|r| self.get(r) + other.get(r))
    }
}

/// Coerce a raw numeric input: non-finite or negative becomes 0
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub const MAX_RATE_METAL: f64 = 3.0;
pub const MAX_RATE_CRYSTAL: f64 = 2.0;
pub const MAX_RATE_DEUTERIUM: f64 = 1.0;

/// Exchange rates between the resources, e.g. 3:2:1.
///
/// Metal is the normalizing numerator: one unit of resource `r` is worth
/// `metal / r` value units (metal-equivalent).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeRates {
    pub metal: f64,
    pub crystal: f64,
    pub deuterium: f64,
}

impl Default for ExchangeRates {
    fn default() -> Self {
        Self {
            metal: MAX_RATE_METAL,
            crystal: MAX_RATE_CRYSTAL,
            deuterium: MAX_RATE_DEUTERIUM,
        }
    }
}

impl ExchangeRates {
    pub fn new(metal: f64, crystal: f64, deuterium: f64) -> Self {
        Self {
            metal,
            crystal,
            deuterium,
        }
        .clamped()
    }

    /// Clamp each rate to its documented maximum. A rate that is not a
    /// positive finite number falls back to the default for that resource.
    pub fn clamped(&self) -> ExchangeRates {
        fn clamp(value: f64, max: f64) -> f64 {
            if value.is_finite() && value > 0.0 {
                value.min(max)
            } else {
                max
            }
        }

        ExchangeRates {
            metal: clamp(self.metal, MAX_RATE_METAL),
            crystal: clamp(self.crystal, MAX_RATE_CRYSTAL),
            deuterium: clamp(self.deuterium, MAX_RATE_DEUTERIUM),
        }
    }

    pub fn rate(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Metal => self.metal,
            Resource::Crystal => self.crystal,
            Resource::Deuterium => self.deuterium,
        }
    }

    /// Value units per raw unit of `resource`. Always 1 for metal.
    pub fn factor(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Metal => 1.0,
            other => self.metal / self.rate(other),
        }
    }

    pub fn value_units(&self, resource: Resource, amount: f64) -> f64 {
        amount * self.factor(resource)
    }

    /// Sum of all components expressed in value units
    pub fn total_value(&self, amounts: &ResourceVector) -> f64 {
        Resource::ALL
            .iter()
            .map(|&r| self.value_units(r, amounts.get(r)))
            .sum()
    }
}

/// Static ship definition with its construction cost
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipType {
    pub key: &'static str,
    pub name: &'static str,
    pub metal_cost: f64,
    pub crystal_cost: f64,
    pub deuterium_cost: f64,
}

impl ShipType {
    pub fn cost(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Metal => self.metal_cost,
            Resource::Crystal => self.crystal_cost,
            Resource::Deuterium => self.deuterium_cost,
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.metal_cost + self.crystal_cost + self.deuterium_cost
    }
}

/// One row of the lost fleet. Rows are never merged, even for the same ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetLine {
    pub ship: String,
    #[serde(default)]
    pub quantity: i64,
}

/// Alliance class; merchants get extra storage capacity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllyClass {
    #[default]
    Warrior,
    Merchant,
    Researcher,
}

impl AllyClass {
    pub fn storage_bonus_percent(self) -> f64 {
        match self {
            AllyClass::Merchant => 10.0,
            AllyClass::Warrior | AllyClass::Researcher => 0.0,
        }
    }
}

impl FromStr for AllyClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warrior" => Ok(AllyClass::Warrior),
            "merchant" | "trader" => Ok(AllyClass::Merchant),
            "researcher" => Ok(AllyClass::Researcher),
            other => Err(format!("unknown ally class '{}'", other)),
        }
    }
}

/// Storage building levels per resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageLevels {
    pub metal: i64,
    pub crystal: i64,
    pub deuterium: i64,
}

impl StorageLevels {
    pub fn get(&self, resource: Resource) -> i64 {
        match resource {
            Resource::Metal => self.metal,
            Resource::Crystal => self.crystal,
            Resource::Deuterium => self.deuterium,
        }
    }

    pub fn set(&mut self, resource: Resource, level: i64) {
        match resource {
            Resource::Metal => self.metal = level,
            Resource::Crystal => self.crystal = level,
            Resource::Deuterium => self.deuterium = level,
        }
    }
}

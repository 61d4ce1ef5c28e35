//! Session configuration: every input of a calculation in one typed,
//! versioned document

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{non_negative, AllyClass, ExchangeRates, FleetLine, Resource, ResourceVector, StorageLevels};
use crate::research::{self, LevelRange};
use crate::units;

/// Current schema version of [`SessionConfig`]
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse session config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read session config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported session config version {found} (this build reads version {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("no fleet row {row} (the fleet has {len} rows)")]
    NoFleetRow { row: usize, len: usize },
    #[error("invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        field: Field,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub levels: StorageLevels,
    pub bonus_percent: f64,
    pub ally_class: AllyClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub version: u32,
    /// Explicit requirement, used when no research level is set
    pub target: ResourceVector,
    pub research: LevelRange,
    pub stock: ResourceVector,
    /// Daily production
    pub production: ResourceVector,
    pub rates: ExchangeRates,
    pub storage: StorageConfig,
    /// Debris field yield in percent; unset means the game default
    pub debris_percent: Option<f64>,
    pub fleet: Vec<FleetLine>,
    /// Dark matter per resource pack
    pub pack_cost: f64,
    /// Dark matter per merchant trade
    pub trade_cost: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            target: ResourceVector::ZERO,
            research: LevelRange::default(),
            stock: ResourceVector::ZERO,
            production: ResourceVector::ZERO,
            rates: ExchangeRates::default(),
            storage: StorageConfig::default(),
            debris_percent: None,
            fleet: Vec::new(),
            pack_cost: 0.0,
            trade_cost: 0.0,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        if config.version == 0 || config.version > SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        SessionConfig::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Copy with every value coerced into its valid range
    pub fn sanitized(&self) -> SessionConfig {
        let levels = &self.storage.levels;
        SessionConfig {
            version: SCHEMA_VERSION,
            target: self.target.sanitized(),
            research: LevelRange {
                from: self.research.from.clamp(0, research::MAX_LEVEL),
                to: self.research.to.clamp(0, research::MAX_LEVEL),
            },
            stock: self.stock.sanitized(),
            production: self.production.sanitized(),
            rates: self.rates.clamped(),
            storage: StorageConfig {
                levels: StorageLevels {
                    metal: levels.metal.max(0),
                    crystal: levels.crystal.max(0),
                    deuterium: levels.deuterium.max(0),
                },
                bonus_percent: non_negative(self.storage.bonus_percent),
                ally_class: self.storage.ally_class,
            },
            debris_percent: self
                .debris_percent
                .filter(|p| p.is_finite())
                .map(|p| p.clamp(0.0, 100.0)),
            fleet: self.fleet.clone(),
            pack_cost: non_negative(self.pack_cost),
            trade_cost: non_negative(self.trade_cost),
        }
    }

    /// The requirement to plan for: the research cost when a research level
    /// is set, otherwise the explicit target
    pub fn effective_target(&self) -> ResourceVector {
        research::range_cost(self.research).unwrap_or(self.target)
    }

    /// Remove fleet row `row`, counted from 1 as listed
    pub fn remove_fleet_row(&mut self, row: usize) -> Result<FleetLine, ConfigError> {
        let index = self.fleet_index(row)?;
        Ok(self.fleet.remove(index))
    }

    /// Change the quantity of fleet row `row` in place
    pub fn set_fleet_quantity(&mut self, row: usize, value: &str) -> Result<&FleetLine, ConfigError> {
        let index = self.fleet_index(row)?;
        let line = &mut self.fleet[index];
        line.quantity = units::parse_count(value);
        Ok(line)
    }

    fn fleet_index(&self, row: usize) -> Result<usize, ConfigError> {
        match row.checked_sub(1) {
            Some(index) if index < self.fleet.len() => Ok(index),
            _ => Err(ConfigError::NoFleetRow {
                row,
                len: self.fleet.len(),
            }),
        }
    }

    /// Set one field from user text. Numbers that cannot be parsed become 0,
    /// except the debris yield which falls back to its default.
    pub fn set_field(&mut self, field: Field, value: &str) -> Result<(), ConfigError> {
        match field {
            Field::Target(r) => self.target.set(r, units::parse_quantity(value)),
            Field::Stock(r) => self.stock.set(r, units::parse_quantity(value)),
            Field::Production(r) => self.production.set(r, units::parse_quantity(value)),
            Field::Rate(r) => {
                let mut rates = self.rates;
                match r {
                    Resource::Metal => rates.metal = units::parse_quantity(value),
                    Resource::Crystal => rates.crystal = units::parse_quantity(value),
                    Resource::Deuterium => rates.deuterium = units::parse_quantity(value),
                }
                self.rates = rates.clamped();
            }
            Field::StorageLevel(r) => self.storage.levels.set(r, units::parse_count(value).max(0)),
            Field::StorageBonus => self.storage.bonus_percent = units::parse_quantity(value),
            Field::AllyClass => {
                self.storage.ally_class =
                    value.parse().map_err(|reason| ConfigError::InvalidValue {
                        field,
                        value: value.to_string(),
                        reason,
                    })?;
            }
            Field::Debris => {
                self.debris_percent = units::parse_number(value).map(|p| p.clamp(0.0, 100.0));
            }
            Field::ResearchFrom => self.research.from = units::parse_count(value).clamp(0, research::MAX_LEVEL),
            Field::ResearchTo => self.research.to = units::parse_count(value).clamp(0, research::MAX_LEVEL),
            Field::PackCost => self.pack_cost = units::parse_quantity(value),
            Field::TradeCost => self.trade_cost = units::parse_quantity(value),
        }
        Ok(())
    }
}

/// Addressable configuration fields, written as `stock.metal`,
/// `storage.level.crystal`, `debris`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Target(Resource),
    Stock(Resource),
    Production(Resource),
    Rate(Resource),
    StorageLevel(Resource),
    StorageBonus,
    AllyClass,
    Debris,
    ResearchFrom,
    ResearchTo,
    PackCost,
    TradeCost,
}

impl FromStr for Field {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let unknown = || ConfigError::UnknownField(s.to_string());

        let simple = match key.as_str() {
            "storage.bonus" => Some(Field::StorageBonus),
            "ally-class" | "storage.class" => Some(Field::AllyClass),
            "debris" => Some(Field::Debris),
            "research.from" => Some(Field::ResearchFrom),
            "research.to" => Some(Field::ResearchTo),
            "pack-cost" => Some(Field::PackCost),
            "trade-cost" => Some(Field::TradeCost),
            _ => None,
        };
        if let Some(field) = simple {
            return Ok(field);
        }

        let (group, resource) = key.rsplit_once('.').ok_or_else(unknown)?;
        let resource: Resource = resource.parse().map_err(|_| unknown())?;
        match group {
            "target" => Ok(Field::Target(resource)),
            "stock" => Ok(Field::Stock(resource)),
            "production" => Ok(Field::Production(resource)),
            "rates" | "rate" => Ok(Field::Rate(resource)),
            "storage.level" => Ok(Field::StorageLevel(resource)),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Target(r) => write!(f, "target.{}", r),
            Field::Stock(r) => write!(f, "stock.{}", r),
            Field::Production(r) => write!(f, "production.{}", r),
            Field::Rate(r) => write!(f, "rates.{}", r),
            Field::StorageLevel(r) => write!(f, "storage.level.{}", r),
            Field::StorageBonus => f.write_str("storage.bonus"),
            Field::AllyClass => f.write_str("ally-class"),
            Field::Debris => f.write_str("debris"),
            Field::ResearchFrom => f.write_str("research.from"),
            Field::ResearchTo => f.write_str("research.to"),
            Field::PackCost => f.write_str("pack-cost"),
            Field::TradeCost => f.write_str("trade-cost"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = SessionConfig::from_json_str(r#"{ "stock": { "crystal": 10000 } }"#).unwrap();
        assert_eq!(config.version, SCHEMA_VERSION);
        assert_eq!(config.stock, ResourceVector::new(0.0, 10_000.0, 0.0));
        assert_eq!(config.rates, ExchangeRates::default());
        assert_eq!(config.debris_percent, None);
        assert!(config.fleet.is_empty());
    }

    #[test]
    fn demo_session_parses() {
        let config = SessionConfig::from_json_str(include_str!("../demos/session.json")).unwrap();
        assert_eq!(config.research, LevelRange { from: 4, to: 5 });
        assert_eq!(config.storage.ally_class, AllyClass::Merchant);
        assert_eq!(config.fleet.len(), 2);
        assert_eq!(config.debris_percent, Some(70.0));
    }

    #[test]
    fn rejects_future_versions() {
        let err = SessionConfig::from_json_str(r#"{ "version": 7 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 7, expected: 1 }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = SessionConfig::from_json_str("{ stock: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn json_round_trip() {
        let mut config = SessionConfig::default();
        config.fleet.push(FleetLine {
            ship: "lf".to_string(),
            quantity: 10,
        });
        config.storage.ally_class = AllyClass::Merchant;
        config.debris_percent = Some(30.0);

        let json = config.to_json_string().unwrap();
        assert!(json.contains("\"merchant\""));
        assert_eq!(SessionConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn sanitize_coerces_invalid_values() {
        let config = SessionConfig {
            stock: ResourceVector::new(-10.0, f64::NAN, 5.0),
            rates: ExchangeRates {
                metal: 9.0,
                crystal: 0.0,
                deuterium: 0.5,
            },
            debris_percent: Some(250.0),
            pack_cost: -1.0,
            storage: StorageConfig {
                levels: StorageLevels {
                    metal: -2,
                    crystal: 3,
                    deuterium: 0,
                },
                bonus_percent: f64::INFINITY,
                ally_class: AllyClass::Warrior,
            },
            ..SessionConfig::default()
        }
        .sanitized();

        assert_eq!(config.stock, ResourceVector::new(0.0, 0.0, 5.0));
        assert_eq!(config.rates, ExchangeRates::new(3.0, 2.0, 0.5));
        assert_eq!(config.debris_percent, Some(100.0));
        assert_eq!(config.pack_cost, 0.0);
        assert_eq!(config.storage.levels.metal, 0);
        assert_eq!(config.storage.bonus_percent, 0.0);
    }

    #[test]
    fn sanitize_caps_research_levels() {
        let config = SessionConfig {
            research: LevelRange {
                from: -4,
                to: i64::MAX,
            },
            ..SessionConfig::default()
        }
        .sanitized();
        assert_eq!(config.research, LevelRange { from: 0, to: research::MAX_LEVEL });
    }

    #[test]
    fn research_level_overrides_explicit_target() {
        let mut config = SessionConfig {
            target: ResourceVector::new(1.0, 2.0, 3.0),
            ..SessionConfig::default()
        };
        assert_eq!(config.effective_target(), ResourceVector::new(1.0, 2.0, 3.0));

        config.research.to = 1;
        assert_eq!(config.effective_target(), ResourceVector::new(4_000.0, 8_000.0, 4_000.0));
    }

    #[test]
    fn fleet_rows_are_edited_by_position() {
        let mut config = SessionConfig::default();
        for (ship, quantity) in [("lf", 10), ("cr", 2), ("lf", 5)] {
            config.fleet.push(FleetLine {
                ship: ship.to_string(),
                quantity,
            });
        }

        let removed = config.remove_fleet_row(2).unwrap();
        assert_eq!(removed.ship, "cr");
        assert_eq!(config.fleet.len(), 2);

        let edited = config.set_fleet_quantity(2, "1 200").unwrap();
        assert_eq!(edited.quantity, 1_200);
        assert_eq!(config.fleet[0].quantity, 10);

        assert!(matches!(config.remove_fleet_row(0), Err(ConfigError::NoFleetRow { row: 0, len: 2 })));
        assert!(matches!(
            config.set_fleet_quantity(3, "4"),
            Err(ConfigError::NoFleetRow { row: 3, len: 2 })
        ));
    }

    #[test]
    fn parses_field_paths() {
        assert_eq!("stock.metal".parse::<Field>().unwrap(), Field::Stock(Resource::Metal));
        assert_eq!("rates.c".parse::<Field>().unwrap(), Field::Rate(Resource::Crystal));
        assert_eq!(
            "storage.level.deuterium".parse::<Field>().unwrap(),
            Field::StorageLevel(Resource::Deuterium)
        );
        assert_eq!("Debris".parse::<Field>().unwrap(), Field::Debris);
        assert!(matches!("stock.gold".parse::<Field>(), Err(ConfigError::UnknownField(_))));
        assert!(matches!("colour".parse::<Field>(), Err(ConfigError::UnknownField(_))));

        for field in [Field::Target(Resource::Crystal), Field::StorageLevel(Resource::Metal), Field::PackCost] {
            assert_eq!(field.to_string().parse::<Field>().unwrap(), field);
        }
    }

    #[test]
    fn set_field_coerces_user_text() {
        let mut config = SessionConfig::default();
        config.set_field(Field::Stock(Resource::Metal), "12 500").unwrap();
        config.set_field(Field::Stock(Resource::Crystal), "lots").unwrap();
        config.set_field(Field::Rate(Resource::Crystal), "2,6").unwrap();
        config.set_field(Field::StorageLevel(Resource::Metal), "7").unwrap();
        config.set_field(Field::Debris, "abc").unwrap();
        config.set_field(Field::AllyClass, "merchant").unwrap();

        assert_eq!(config.stock.metal, 12_500.0);
        assert_eq!(config.stock.crystal, 0.0);
        assert_eq!(config.rates.crystal, 2.0);
        assert_eq!(config.storage.levels.metal, 7);
        assert_eq!(config.debris_percent, None);
        assert_eq!(config.storage.ally_class, AllyClass::Merchant);

        let err = config.set_field(Field::AllyClass, "pirate").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: Field::AllyClass, .. }));
    }
}

//! Resource balance calculation
//!
//! Compares the resources on hand against a target requirement and expresses
//! what is missing or left over both in raw units and in value units
//! (metal-equivalent at the configured exchange rates).

use crate::conversion::ConversionState;
use crate::models::{ExchangeRates, Resource, ResourceVector};

/// Deficits and surpluses of a working total against a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balance {
    pub target: ResourceVector,
    pub working_total: ResourceVector,
    pub deficit: ResourceVector,
    pub surplus: ResourceVector,
    /// Deficit of each resource in value units
    pub deficit_value: ResourceVector,
    pub total_deficit_value: f64,
    pub total_surplus_value: f64,
}

impl Balance {
    /// Compute the balance of `working_total` against `target`
    pub fn compute(target: &ResourceVector, working_total: &ResourceVector, rates: &ExchangeRates) -> Balance {
        let deficit = ResourceVector::from_fn(|r| (target.get(r) - working_total.get(r)).max(0.0));
        let surplus = ResourceVector::from_fn(|r| (working_total.get(r) - target.get(r)).max(0.0));
        let deficit_value = ResourceVector::from_fn(|r| rates.value_units(r, deficit.get(r)));

        Balance {
            target: *target,
            working_total: *working_total,
            deficit,
            surplus,
            deficit_value,
            total_deficit_value: rates.total_value(&deficit),
            total_surplus_value: rates.total_value(&surplus),
        }
    }

    pub fn surplus_value(&self, resource: Resource, rates: &ExchangeRates) -> f64 {
        rates.value_units(resource, self.surplus.get(resource))
    }

    pub fn has_surplus(&self) -> bool {
        self.surplus.any_positive()
    }

    pub fn has_deficit(&self) -> bool {
        self.deficit.any_positive()
    }

    /// Resources with something left over, in priority order
    pub fn surplus_resources(&self) -> Vec<Resource> {
        Resource::ALL
            .into_iter()
            .filter(|&r| self.surplus.get(r) > 0.0)
            .collect()
    }

    /// Resources still missing, in priority order
    pub fn deficit_resources(&self) -> Vec<Resource> {
        Resource::ALL
            .into_iter()
            .filter(|&r| self.deficit.get(r) > 0.0)
            .collect()
    }
}

/// Stock plus salvage, before any conversion
pub fn base_total(stock: &ResourceVector, salvage: &ResourceVector) -> ResourceVector {
    *stock + *salvage
}

/// The totals a calculation starts from. Once a conversion has been applied,
/// the converted totals replace stock plus salvage until they are cleared.
pub fn starting_total(base_total: &ResourceVector, state: &ConversionState) -> ResourceVector {
    if state.active {
        state.cumulative_totals
    } else {
        *base_total
    }
}

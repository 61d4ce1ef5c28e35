//! Manual resource conversion
//!
//! The player trades surplus of one resource for a missing one at the
//! configured exchange rates. Each conversion is a one-shot command; the
//! converted totals are kept in a [`ConversionState`] that the caller carries
//! from one calculation to the next until it is cleared.

use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::balance::Balance;
use crate::models::{ExchangeRates, Resource, ResourceVector};
use crate::units::format_quantity;

/// Accumulated result of all conversions applied so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionState {
    pub active: bool,
    pub cumulative_totals: ResourceVector,
    pub conversion_count: u32,
}

impl ConversionState {
    pub fn is_empty(&self) -> bool {
        *self == ConversionState::default()
    }
}

/// A user action driving one calculation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Recompute from the current inputs without converting anything
    Recalculate,
    /// Convert surplus of `from` into the missing `to`; `None` is "nothing selected"
    ApplyConversion {
        from: Option<Resource>,
        to: Option<Resource>,
    },
    /// Forget all conversions
    ClearConversion,
    /// Forget all conversions and inputs
    Reset,
}

/// Why a conversion request was not applied. The state is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("No surplus resources to convert.")]
    NoSurplus,
    #[error("Select a surplus resource and a missing resource.")]
    NothingSelected,
    #[error("A resource cannot be converted into itself.")]
    SameResource,
    #[error("Not enough surplus or deficit to convert.")]
    NothingToConvert,
}

/// A successfully applied conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub from: Resource,
    pub to: Resource,
    /// Value units traded
    pub used_value: f64,
    /// Raw units taken from `from`
    pub removed: f64,
    /// Raw units added to `to`
    pub added: f64,
    /// Surplus of `from` still available afterwards
    pub leftover_from: f64,
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Converted {} {} into {} {}.",
            format_quantity(self.removed),
            self.from,
            format_quantity(self.added),
            self.to
        )?;
        if self.leftover_from > 0.0 {
            write!(
                f,
                " {} {} surplus is still available for another conversion.",
                format_quantity(self.leftover_from),
                self.from
            )?;
        }
        Ok(())
    }
}

/// What happened to the conversion state during a pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversionOutcome {
    None,
    Applied(Conversion),
    Rejected(Rejection),
    Cleared,
}

/// Resources the player may pick as the source and destination of a conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOffer {
    pub from: Vec<Resource>,
    pub to: Vec<Resource>,
}

/// Where the conversion workflow stands after a pass
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Nothing can be converted
    Idle,
    /// Surplus and deficit both exist; the offer lists the choices
    Offer(ConversionOffer),
    /// A conversion was just applied; `next` tells whether more are possible
    Applied {
        conversion: Conversion,
        next: Option<ConversionOffer>,
    },
}

impl Phase {
    /// Phase after a pass, given the final balance and the pass outcome
    pub fn after(balance: &Balance, outcome: &ConversionOutcome) -> Phase {
        let next = offer(balance);
        match outcome {
            ConversionOutcome::Applied(conversion) => Phase::Applied {
                conversion: *conversion,
                next,
            },
            _ => next.map(Phase::Offer).unwrap_or(Phase::Idle),
        }
    }
}

/// Conversion choices for a balance, or `None` when either side is empty
pub fn offer(balance: &Balance) -> Option<ConversionOffer> {
    let from = balance.surplus_resources();
    let to = balance.deficit_resources();
    if from.is_empty() || to.is_empty() {
        None
    } else {
        Some(ConversionOffer { from, to })
    }
}

/// Apply one conversion to the current balance.
///
/// Surplus and need are read from `balance`, which must reflect the current
/// working totals. On success returns the new state and the conversion; on
/// rejection nothing changes.
pub fn apply(
    state: &ConversionState,
    balance: &Balance,
    rates: &ExchangeRates,
    from: Option<Resource>,
    to: Option<Resource>,
) -> Result<(ConversionState, Conversion), Rejection> {
    if !balance.has_surplus() {
        return Err(Rejection::NoSurplus);
    }
    let (Some(from), Some(to)) = (from, to) else {
        return Err(Rejection::NothingSelected);
    };
    if from == to {
        return Err(Rejection::SameResource);
    }

    let excess_units = balance.surplus.get(from);
    let need_units = balance.deficit.get(to);
    if excess_units <= 0.0 || need_units <= 0.0 {
        debug!(
            "Conversion {} -> {} rejected: surplus {}, need {}",
            from, to, excess_units, need_units
        );
        return Err(Rejection::NothingToConvert);
    }

    let excess_value = balance.surplus_value(from, rates);
    let need_value = rates.value_units(to, need_units);
    let used_value = excess_value.min(need_value);
    if used_value <= 0.0 {
        return Err(Rejection::NothingToConvert);
    }

    // The exhausted side takes its raw amount so it lands exactly on target
    let (removed, added) = if excess_value <= need_value {
        (excess_units, used_value / rates.factor(to))
    } else {
        (used_value / rates.factor(from), need_units)
    };

    let mut totals = balance.working_total;
    totals.set(from, (totals.get(from) - removed).max(0.0));
    totals.set(to, (totals.get(to) + added).max(0.0));

    let next = ConversionState {
        active: true,
        cumulative_totals: totals,
        conversion_count: state.conversion_count + 1,
    };
    let conversion = Conversion {
        from,
        to,
        used_value,
        removed,
        added,
        leftover_from: (totals.get(from) - balance.target.get(from)).max(0.0),
    };

    info!(
        "Conversion #{}: {} {} -> {} {} ({} value units)",
        next.conversion_count, removed, from, added, to, used_value
    );

    Ok((next, conversion))
}

/// Empty state; the next calculation starts from stock plus salvage again
pub fn clear() -> ConversionState {
    ConversionState::default()
}

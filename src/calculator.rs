//! One full calculation pass and its report
//!
//! A pass takes the session inputs, the conversion state carried over from
//! the previous pass and the command that triggered it, and returns the next
//! conversion state together with a [`Snapshot`] of everything computed.

use std::fmt;

use log::debug;

use crate::balance::{self, Balance};
use crate::capacity;
use crate::config::SessionConfig;
use crate::conversion::{self, Command, ConversionOutcome, ConversionState, Phase, Rejection};
use crate::fleet::{self, FleetLoss};
use crate::models::{ExchangeRates, Resource, ResourceVector};
use crate::planner::{self, Costs, Plan, TradeAdvice};
use crate::units::{format_days, format_quantity};

/// Storage capacities and how far salvage or stock exceed them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityReport {
    pub capacities: ResourceVector,
    /// Salvage above capacity, 0 where it fits
    pub salvage_overflow: ResourceVector,
    /// Current stock above capacity, 0 where it fits
    pub stock_overflow: ResourceVector,
}

impl CapacityReport {
    pub fn check(capacities: &ResourceVector, salvage: &ResourceVector, stock: &ResourceVector) -> Self {
        Self {
            capacities: *capacities,
            salvage_overflow: ResourceVector::from_fn(|r| (salvage.get(r) - capacities.get(r)).max(0.0)),
            stock_overflow: ResourceVector::from_fn(|r| (stock.get(r) - capacities.get(r)).max(0.0)),
        }
    }

    pub fn salvage_exceeds(&self, resource: Resource) -> bool {
        self.salvage_overflow.get(resource) > 0.0
    }

    pub fn stock_exceeds(&self, resource: Resource) -> bool {
        self.stock_overflow.get(resource) > 0.0
    }

    pub fn has_issue(&self) -> bool {
        self.salvage_overflow.any_positive() || self.stock_overflow.any_positive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowSource {
    Salvage,
    Stock,
}

/// Human-readable status of a pass
#[derive(Debug, Clone, PartialEq)]
pub enum StatusNote {
    Complete {
        /// The stock alone was short; conversions covered the rest
        via_conversion: bool,
    },
    InDeficit {
        missing_value: f64,
        days: Option<f64>,
    },
    CapacityIssue {
        resource: Resource,
        source: OverflowSource,
        overflow: f64,
    },
    ConversionApplied(conversion::Conversion),
    ConversionRejected(Rejection),
    ConversionCleared,
    PointsLost(f64),
}

impl fmt::Display for StatusNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusNote::Complete { via_conversion: true } => write!(
                f,
                "Complete: converting surplus covers everything that was missing for this level, \
                 no extra production or packs needed."
            ),
            StatusNote::Complete { via_conversion: false } => {
                write!(f, "Complete: you already have enough resources (rates applied) for this level.")
            }
            StatusNote::InDeficit { missing_value, days } => {
                write!(f, "Missing: {} metal-equivalent.", format_quantity(*missing_value))?;
                if let Some(days) = days {
                    write!(f, " Estimated time: ~{} days.", format_days(*days))?;
                }
                Ok(())
            }
            StatusNote::CapacityIssue {
                resource,
                source,
                overflow,
            } => {
                let what = match source {
                    OverflowSource::Salvage => "debris",
                    OverflowSource::Stock => "stock",
                };
                write!(
                    f,
                    "Capacity issue: {} {} exceeds the {} by {}.",
                    resource,
                    what,
                    resource.storage_name(),
                    format_quantity(*overflow)
                )
            }
            StatusNote::ConversionApplied(conversion) => write!(f, "{}", conversion),
            StatusNote::ConversionRejected(rejection) => write!(f, "Conversion not applied: {}", rejection),
            StatusNote::ConversionCleared => write!(
                f,
                "Conversions cleared. Pick a surplus and a missing resource to convert again; \
                 conversions can be repeated with other combinations."
            ),
            StatusNote::PointsLost(points) => {
                write!(f, "Points lost with the fleet: {}.", format_quantity(*points))
            }
        }
    }
}

/// Everything computed in one pass
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub rates: ExchangeRates,
    pub target: ResourceVector,
    pub stock: ResourceVector,
    pub fleet: FleetLoss,
    /// Stock plus salvage
    pub base_total: ResourceVector,
    /// Balance of stock plus salvage, ignoring all conversions
    pub base_balance: Balance,
    /// Balance after all conversions, including this pass's
    pub balance: Balance,
    pub capacity: CapacityReport,
    pub outcome: ConversionOutcome,
    pub phase: Phase,
    pub plan: Plan,
    pub notes: Vec<StatusNote>,
}

/// Run one calculation pass.
///
/// `Recalculate` never changes the conversion state. `ApplyConversion` applies
/// at most one conversion; `ClearConversion` and `Reset` start over from
/// stock plus salvage. `Reset` also discards the inputs.
pub fn run(state: &ConversionState, config: &SessionConfig, command: Command) -> (ConversionState, Snapshot) {
    let config = match command {
        Command::Reset => SessionConfig::default(),
        _ => config.sanitized(),
    };
    let state = match command {
        Command::ClearConversion | Command::Reset => conversion::clear(),
        _ => *state,
    };

    let rates = config.rates;
    let target = config.effective_target();
    let fleet = fleet::estimate_loss(&config.fleet, fleet::debris_ratio(config.debris_percent));
    let base_total = balance::base_total(&config.stock, &fleet.salvage);
    let base_balance = Balance::compute(&target, &base_total, &rates);
    let current = Balance::compute(&target, &balance::starting_total(&base_total, &state), &rates);

    debug!(
        "Pass {:?}: target {:?}, working total {:?}, deficit value {}",
        command, target, current.working_total, current.total_deficit_value
    );

    let (next_state, outcome, balance) = match command {
        Command::ApplyConversion { from, to } => {
            match conversion::apply(&state, &current, &rates, from, to) {
                Ok((next, applied)) => {
                    let after = Balance::compute(&target, &next.cumulative_totals, &rates);
                    (next, ConversionOutcome::Applied(applied), after)
                }
                Err(rejection) => (state, ConversionOutcome::Rejected(rejection), current),
            }
        }
        Command::ClearConversion | Command::Reset => (state, ConversionOutcome::Cleared, current),
        Command::Recalculate => (state, ConversionOutcome::None, current),
    };

    let capacities = capacity::capacities(
        &config.storage.levels,
        config.storage.bonus_percent,
        config.storage.ally_class,
    );
    let capacity = CapacityReport::check(&capacities, &fleet.salvage, &config.stock);

    let costs = Costs {
        per_pack: config.pack_cost,
        per_trade: config.trade_cost,
    };
    let plan = planner::plan(
        &balance,
        &config.production,
        &capacities,
        &rates,
        &costs,
        next_state.conversion_count,
    );
    let phase = Phase::after(&balance, &outcome);

    let mut snapshot = Snapshot {
        rates,
        target,
        stock: config.stock,
        fleet,
        base_total,
        base_balance,
        balance,
        capacity,
        outcome,
        phase,
        plan,
        notes: Vec::new(),
    };
    snapshot.notes = status_notes(&snapshot);

    (next_state, snapshot)
}

fn status_notes(snapshot: &Snapshot) -> Vec<StatusNote> {
    let mut notes = Vec::new();

    match snapshot.outcome {
        ConversionOutcome::Applied(conversion) => notes.push(StatusNote::ConversionApplied(conversion)),
        ConversionOutcome::Rejected(rejection) => notes.push(StatusNote::ConversionRejected(rejection)),
        ConversionOutcome::Cleared => notes.push(StatusNote::ConversionCleared),
        ConversionOutcome::None => {}
    }

    if snapshot.balance.total_deficit_value <= 0.0 {
        notes.push(StatusNote::Complete {
            via_conversion: snapshot.base_balance.total_deficit_value > 0.0,
        });
    } else {
        notes.push(StatusNote::InDeficit {
            missing_value: snapshot.balance.total_deficit_value,
            days: snapshot.plan.days_to_target,
        });
    }

    for (source, overflow) in [
        (OverflowSource::Salvage, &snapshot.capacity.salvage_overflow),
        (OverflowSource::Stock, &snapshot.capacity.stock_overflow),
    ] {
        for resource in Resource::ALL {
            let amount = overflow.get(resource);
            if amount > 0.0 {
                notes.push(StatusNote::CapacityIssue {
                    resource,
                    source,
                    overflow: amount,
                });
            }
        }
    }

    let points = snapshot.fleet.total_points();
    if points > 0.0 {
        notes.push(StatusNote::PointsLost(points));
    }

    notes
}

/// Format the per-ship breakdown of the lost fleet
pub fn format_fleet_lines(fleet: &FleetLoss) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<18} {:>8} {:>10} {:>14} {:>14} {:>14}\n",
        "Ship", "Qty", "Points", "Metal", "Crystal", "Deuterium"
    ));
    for line in fleet.lines.iter().flatten() {
        output.push_str(&format!(
            "{:<18} {:>8} {:>10} {:>14} {:>14} {:>14}\n",
            line.ship.name,
            format_quantity(line.quantity as f64),
            format_quantity(line.points),
            format_quantity(line.salvage.metal),
            format_quantity(line.salvage.crystal),
            format_quantity(line.salvage.deuterium)
        ));
    }
    output
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let balance = &self.balance;

        writeln!(f, "=== Research Status ===")?;
        for r in Resource::ALL {
            let label = r.title();
            if balance.deficit.get(r) > 0.0 {
                writeln!(f, "  {} missing: {}", label, format_quantity(balance.deficit.get(r)))?;
            } else if balance.surplus.get(r) > 0.0 {
                writeln!(f, "  {} surplus: {}", label, format_quantity(balance.surplus.get(r)))?;
            } else {
                writeln!(f, "  {}: OK", label)?;
            }
        }
        writeln!(
            f,
            "  Metal equivalent of crystal:   {}",
            format_quantity(balance.deficit_value.crystal)
        )?;
        writeln!(
            f,
            "  Metal equivalent of deuterium: {}",
            format_quantity(balance.deficit_value.deuterium)
        )?;
        writeln!(
            f,
            "  Total metal cost (rates applied): {}",
            format_quantity(balance.total_deficit_value)
        )?;
        writeln!(f)?;

        if !self.fleet.lines.is_empty() {
            writeln!(f, "Debris:")?;
            for r in Resource::ALL {
                writeln!(f, "  {} debris: {}", r.title(), format_quantity(self.fleet.salvage.get(r)))?;
            }
            writeln!(f)?;
        }

        let has_stock = self.stock.any_positive();
        let heading = match (has_stock, self.fleet.has_salvage()) {
            (true, true) => "Totals after resources + generated debris",
            (false, true) => "Total resources + generated debris",
            _ => "Total resources",
        };
        writeln!(f, "{}:", heading)?;
        for r in Resource::ALL {
            writeln!(f, "  Total {}: {}", r.title(), format_quantity(balance.working_total.get(r)))?;
        }
        writeln!(f)?;

        writeln!(f, "Capacity:")?;
        if self.capacity.has_issue() {
            for note in self.notes.iter().filter(|n| matches!(n, StatusNote::CapacityIssue { .. })) {
                writeln!(f, "  {}", note)?;
            }
        } else {
            writeln!(f, "  No capacity issues detected.")?;
        }
        writeln!(f)?;

        writeln!(f, "Recommended trades:")?;
        match &self.plan.trades {
            TradeAdvice::NothingNeeded => writeln!(f, "  None, you have everything.")?,
            TradeAdvice::OnlyMetalMissing => writeln!(
                f,
                "  No trade possible, only metal is missing (cover it with production or packs)."
            )?,
            TradeAdvice::Trades { source, lines } => {
                for line in lines {
                    write!(
                        f,
                        "  {} -> {}: need {} {}",
                        source.title(),
                        line.to.title(),
                        format_quantity(line.need),
                        line.to
                    )?;
                    if line.capacity > 0.0 {
                        write!(
                            f,
                            " (~{} trades; limit {})",
                            line.blocks,
                            format_quantity(line.capacity)
                        )?;
                    }
                    writeln!(f, ". {}: {}", source.title(), format_quantity(line.source_amount))?;
                }
                writeln!(f, "  Total trades: {}", self.plan.trades.blocks())?;
                writeln!(
                    f,
                    "  {} needed in total: {}",
                    source.title(),
                    format_quantity(self.plan.trades.source_total())
                )?;
            }
        }
        writeln!(f)?;

        writeln!(f, "Packs and dark matter:")?;
        writeln!(f, "  Metal cost (rates applied):      {}", format_quantity(self.plan.total_deficit_value))?;
        writeln!(f, "  Daily production (metal-equiv.): {}", format_quantity(self.plan.total_production_value))?;
        writeln!(f, "  Daily production (metal only):   {}", format_quantity(self.plan.metal_production_value))?;
        match self.plan.days_to_target {
            Some(days) => writeln!(f, "  Days to target:                  ~{}", format_days(days))?,
            None => writeln!(f, "  Days to target:                  unknown")?,
        }
        writeln!(f, "  Packs needed (approx.):          {}", self.plan.packs_needed)?;
        writeln!(f, "  Dark matter (packs):             {}", format_quantity(self.plan.pack_cost))?;
        writeln!(f, "  Trades (incl. conversions):      {}", self.plan.total_trades)?;
        writeln!(f, "  Dark matter (trades):            {}", format_quantity(self.plan.trade_cost))?;
        writeln!(f, "  Dark matter total:               {}", format_quantity(self.plan.dark_matter_total))?;
        writeln!(f)?;

        writeln!(f, "Conversion:")?;
        let offer = match &self.phase {
            Phase::Idle => None,
            Phase::Offer(offer) => Some(offer),
            Phase::Applied { next, .. } => next.as_ref(),
        };
        match offer {
            Some(offer) => {
                let names = |list: &[Resource]| list.iter().map(|r| r.name()).collect::<Vec<_>>().join(", ");
                writeln!(f, "  Convert from: {}", names(offer.from.as_slice()))?;
                writeln!(f, "  Convert to:   {}", names(offer.to.as_slice()))?;
            }
            None => writeln!(f, "  No surplus resources to convert.")?,
        }
        writeln!(f)?;

        writeln!(f, "Notes:")?;
        for note in self.notes.iter().filter(|n| !matches!(n, StatusNote::CapacityIssue { .. })) {
            writeln!(f, "  {}", note)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FleetLine;

    fn example_config() -> SessionConfig {
        SessionConfig {
            target: ResourceVector::new(8_000.0, 8_000.0, 4_000.0),
            stock: ResourceVector::new(0.0, 10_000.0, 0.0),
            rates: ExchangeRates::new(1.0, 2.0, 1.0),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn recalculate_is_side_effect_free() {
        let config = example_config();
        let state = ConversionState::default();
        let (next, first) = run(&state, &config, Command::Recalculate);
        let (again, second) = run(&next, &config, Command::Recalculate);

        assert_eq!(next, state);
        assert_eq!(again, state);
        assert_eq!(first.balance, second.balance);
        assert_eq!(first.outcome, ConversionOutcome::None);
        assert!(matches!(first.phase, Phase::Offer(_)));
    }

    #[test]
    fn conversion_is_applied_once() {
        let config = example_config();
        let convert = Command::ApplyConversion {
            from: Some(Resource::Crystal),
            to: Some(Resource::Metal),
        };

        let (state, snapshot) = run(&ConversionState::default(), &config, convert);
        assert_eq!(state.conversion_count, 1);
        assert_eq!(snapshot.balance.deficit.metal, 7_000.0);
        assert_eq!(snapshot.balance.surplus.crystal, 0.0);
        assert!(matches!(snapshot.phase, Phase::Applied { next: None, .. }));

        // the converted totals persist across plain recalculations
        let (kept, recalculated) = run(&state, &config, Command::Recalculate);
        assert_eq!(kept, state);
        assert_eq!(recalculated.balance, snapshot.balance);
        assert_eq!(recalculated.phase, Phase::Idle);

        // asking again finds no surplus left
        let (unchanged, rejected) = run(&state, &config, convert);
        assert_eq!(unchanged, state);
        assert_eq!(rejected.outcome, ConversionOutcome::Rejected(Rejection::NoSurplus));
    }

    #[test]
    fn clear_restores_pre_conversion_balance() {
        let config = example_config();
        let (_, original) = run(&ConversionState::default(), &config, Command::Recalculate);
        let (converted, _) = run(
            &ConversionState::default(),
            &config,
            Command::ApplyConversion {
                from: Some(Resource::Crystal),
                to: Some(Resource::Deuterium),
            },
        );
        assert!(converted.active);

        let (cleared, snapshot) = run(&converted, &config, Command::ClearConversion);
        assert!(cleared.is_empty());
        assert_eq!(snapshot.balance, original.balance);
        assert_eq!(snapshot.outcome, ConversionOutcome::Cleared);

        let (_, again) = run(&cleared, &config, Command::Recalculate);
        assert_eq!(again.balance, original.balance);
    }

    #[test]
    fn rejected_request_keeps_state() {
        let config = example_config();
        let (state, _) = run(
            &ConversionState::default(),
            &config,
            Command::ApplyConversion {
                from: Some(Resource::Crystal),
                to: Some(Resource::Metal),
            },
        );
        let (next, snapshot) = run(
            &state,
            &config,
            Command::ApplyConversion {
                from: Some(Resource::Metal),
                to: Some(Resource::Metal),
            },
        );
        assert_eq!(next, state);
        assert_eq!(snapshot.outcome, ConversionOutcome::Rejected(Rejection::NoSurplus));

        let surplus_config = SessionConfig {
            stock: ResourceVector::new(0.0, 20_000.0, 0.0),
            ..example_config()
        };
        let (fresh, same) = run(
            &ConversionState::default(),
            &surplus_config,
            Command::ApplyConversion {
                from: Some(Resource::Crystal),
                to: Some(Resource::Crystal),
            },
        );
        assert!(fresh.is_empty());
        assert_eq!(same.outcome, ConversionOutcome::Rejected(Rejection::SameResource));
        assert!(same.notes.contains(&StatusNote::ConversionRejected(Rejection::SameResource)));
    }

    #[test]
    fn salvage_and_stock_capacity_are_checked_separately() {
        let config = SessionConfig {
            stock: ResourceVector::new(0.0, 12_000.0, 0.0),
            fleet: vec![FleetLine {
                ship: "lf".to_string(),
                quantity: 10,
            }],
            ..SessionConfig::default()
        };
        let (_, snapshot) = run(&ConversionState::default(), &config, Command::Recalculate);

        assert_eq!(snapshot.fleet.salvage, ResourceVector::new(21_000.0, 7_000.0, 0.0));
        assert!(snapshot.capacity.salvage_exceeds(Resource::Metal));
        assert!(!snapshot.capacity.salvage_exceeds(Resource::Crystal));
        assert!(snapshot.capacity.stock_exceeds(Resource::Crystal));
        assert_eq!(snapshot.capacity.salvage_overflow.metal, 11_000.0);
        assert_eq!(snapshot.capacity.stock_overflow.crystal, 2_000.0);
        assert!(snapshot.notes.contains(&StatusNote::PointsLost(40.0)));
        assert_eq!(snapshot.base_total, ResourceVector::new(21_000.0, 19_000.0, 0.0));
    }

    #[test]
    fn completion_notes_distinguish_conversions() {
        let already = SessionConfig {
            target: ResourceVector::new(1_000.0, 0.0, 0.0),
            stock: ResourceVector::new(2_000.0, 0.0, 0.0),
            ..SessionConfig::default()
        };
        let (_, snapshot) = run(&ConversionState::default(), &already, Command::Recalculate);
        assert_eq!(snapshot.notes[0], StatusNote::Complete { via_conversion: false });

        let needs_conversion = SessionConfig {
            target: ResourceVector::new(1_000.0, 0.0, 0.0),
            stock: ResourceVector::new(0.0, 5_000.0, 0.0),
            ..SessionConfig::default()
        };
        let (_, snapshot) = run(
            &ConversionState::default(),
            &needs_conversion,
            Command::ApplyConversion {
                from: Some(Resource::Crystal),
                to: Some(Resource::Metal),
            },
        );
        assert!(snapshot.notes.contains(&StatusNote::Complete { via_conversion: true }));
    }

    #[test]
    fn reset_discards_inputs_and_conversions() {
        let state = ConversionState {
            active: true,
            cumulative_totals: ResourceVector::new(5.0, 5.0, 5.0),
            conversion_count: 3,
        };
        let (next, snapshot) = run(&state, &example_config(), Command::Reset);
        assert!(next.is_empty());
        assert_eq!(snapshot.target, ResourceVector::ZERO);
        assert_eq!(snapshot.plan.total_trades, 0);
    }

    #[test]
    fn report_mentions_key_figures() {
        let (_, snapshot) = run(&ConversionState::default(), &example_config(), Command::Recalculate);
        let report = snapshot.to_string();
        assert!(report.contains("Metal missing: 8 000"));
        assert!(report.contains("Crystal surplus: 2 000"));
        assert!(report.contains("Total metal cost (rates applied): 12 000"));
        assert!(report.contains("Convert from: crystal"));
        assert!(report.contains("Days to target:                  unknown"));
        assert!(report.contains("Missing: 12 000 metal-equivalent."));
    }
}

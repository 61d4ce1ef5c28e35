//! Requirement planning: time to target, packs, trades and dark matter cost

use crate::balance::Balance;
use crate::models::{ExchangeRates, Resource, ResourceVector};

/// Prices in dark matter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Costs {
    pub per_pack: f64,
    pub per_trade: f64,
}

/// One recommended trade from the source resource into a missing one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeLine {
    pub to: Resource,
    pub need: f64,
    pub capacity: f64,
    /// Trades needed when each trade is limited by the destination storage
    pub blocks: u64,
    /// Raw amount of the source resource needed to cover `need`
    pub source_amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradeAdvice {
    /// Nothing is missing
    NothingNeeded,
    /// Only metal is missing and there is nothing to trade it from
    OnlyMetalMissing,
    Trades {
        source: Resource,
        lines: Vec<TradeLine>,
    },
}

impl TradeAdvice {
    pub fn blocks(&self) -> u64 {
        match self {
            TradeAdvice::Trades { lines, .. } => lines.iter().map(|l| l.blocks).sum(),
            _ => 0,
        }
    }

    pub fn source_total(&self) -> f64 {
        match self {
            TradeAdvice::Trades { lines, .. } => lines.iter().map(|l| l.source_amount).sum(),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub total_deficit_value: f64,
    pub total_production_value: f64,
    pub metal_production_value: f64,
    /// Absent when nothing is missing or nothing is produced
    pub days_to_target: Option<f64>,
    pub packs_needed: u64,
    pub pack_cost: f64,
    pub trades: TradeAdvice,
    /// Storage-limited trades covering the crystal and deuterium deficits
    pub storage_trades: u64,
    /// `storage_trades` plus manual conversions; metal is priced through packs
    pub total_trades: u64,
    pub trade_cost: f64,
    pub dark_matter_total: f64,
}

/// Default source resource for trades: the largest surplus in value units,
/// ties broken metal > crystal > deuterium. Metal when nothing is left over.
pub fn choose_source(surplus: &ResourceVector, rates: &ExchangeRates) -> Resource {
    let mut best = Resource::Metal;
    let mut best_value = f64::NEG_INFINITY;
    for r in Resource::ALL {
        let amount = surplus.get(r);
        if amount <= 0.0 {
            continue;
        }
        let value = rates.value_units(r, amount);
        if value > best_value {
            best_value = value;
            best = r;
        }
    }
    best
}

/// Number of storage-limited trades needed to move `need` units
pub fn trade_blocks(need: f64, capacity: f64) -> u64 {
    if need > 0.0 && capacity > 0.0 {
        (need / capacity).ceil() as u64
    } else {
        0
    }
}

/// Recommend trades for the remaining deficit
pub fn advise_trades(balance: &Balance, capacities: &ResourceVector, rates: &ExchangeRates) -> TradeAdvice {
    if !balance.has_deficit() {
        return TradeAdvice::NothingNeeded;
    }
    if !balance.has_surplus() && balance.deficit.crystal == 0.0 && balance.deficit.deuterium == 0.0 {
        return TradeAdvice::OnlyMetalMissing;
    }

    // A surplus resource has no deficit, and without surplus crystal or
    // deuterium is missing, so at least one line always remains
    let source = choose_source(&balance.surplus, rates);
    let lines: Vec<TradeLine> = Resource::ALL
        .into_iter()
        .filter(|&r| r != source && balance.deficit.get(r) > 0.0)
        .map(|to| {
            let need = balance.deficit.get(to);
            let capacity = capacities.get(to);
            TradeLine {
                to,
                need,
                capacity,
                blocks: trade_blocks(need, capacity),
                source_amount: balance.deficit_value.get(to) / rates.factor(source),
            }
        })
        .collect();

    TradeAdvice::Trades { source, lines }
}

/// Plan how to cover the remaining deficit
pub fn plan(
    balance: &Balance,
    production: &ResourceVector,
    capacities: &ResourceVector,
    rates: &ExchangeRates,
    costs: &Costs,
    conversion_count: u32,
) -> Plan {
    let total_deficit_value = balance.total_deficit_value;
    let total_production_value = rates.total_value(production);
    let metal_production_value = rates.value_units(Resource::Metal, production.metal);

    let days_to_target = (total_deficit_value > 0.0 && total_production_value > 0.0)
        .then(|| total_deficit_value / total_production_value);

    let packs_needed = if total_deficit_value > 0.0 && metal_production_value > 0.0 {
        (total_deficit_value / metal_production_value).ceil() as u64
    } else {
        0
    };
    let pack_cost = packs_needed as f64 * costs.per_pack;

    let trades = advise_trades(balance, capacities, rates);
    let storage_trades = trade_blocks(balance.deficit.crystal, capacities.crystal)
        + trade_blocks(balance.deficit.deuterium, capacities.deuterium);
    let total_trades = storage_trades + u64::from(conversion_count);
    let trade_cost = total_trades as f64 * costs.per_trade;

    Plan {
        total_deficit_value,
        total_production_value,
        metal_production_value,
        days_to_target,
        packs_needed,
        pack_cost,
        trades,
        storage_trades,
        total_trades,
        trade_cost,
        dark_matter_total: pack_cost + trade_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(value: f64) -> ResourceVector {
        ResourceVector::new(value, value, value)
    }

    #[test]
    fn source_prefers_largest_value_then_priority() {
        let rates = ExchangeRates::default();
        // 1500 crystal is worth 2250, ahead of 400 deuterium (1200) and 1000 metal
        let surplus = ResourceVector::new(1_000.0, 1_500.0, 400.0);
        assert_eq!(choose_source(&surplus, &rates), Resource::Crystal);

        let tied = ResourceVector::new(3_000.0, 2_000.0, 1_000.0);
        assert_eq!(choose_source(&tied, &rates), Resource::Metal);

        let tied_without_metal = ResourceVector::new(0.0, 2_000.0, 1_000.0);
        assert_eq!(choose_source(&tied_without_metal, &rates), Resource::Crystal);

        assert_eq!(choose_source(&ResourceVector::ZERO, &rates), Resource::Metal);
    }

    #[test]
    fn blocks_guard_zero_capacity() {
        assert_eq!(trade_blocks(25_000.0, 10_000.0), 3);
        assert_eq!(trade_blocks(20_000.0, 10_000.0), 2);
        assert_eq!(trade_blocks(25_000.0, 0.0), 0);
        assert_eq!(trade_blocks(0.0, 10_000.0), 0);
    }

    #[test]
    fn trades_from_metal_surplus() {
        let rates = ExchangeRates::default();
        let balance = Balance::compute(
            &ResourceVector::new(0.0, 15_000.0, 5_000.0),
            &ResourceVector::new(100_000.0, 0.0, 0.0),
            &rates,
        );
        let advice = advise_trades(&balance, &caps(10_000.0), &rates);

        let TradeAdvice::Trades { source, lines } = &advice else {
            panic!("expected trades, got {:?}", advice);
        };
        assert_eq!(*source, Resource::Metal);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].to, Resource::Crystal);
        assert_eq!(lines[0].blocks, 2);
        assert_eq!(lines[0].source_amount, 22_500.0);
        assert_eq!(lines[1].to, Resource::Deuterium);
        assert_eq!(lines[1].blocks, 1);
        assert_eq!(lines[1].source_amount, 15_000.0);
        assert_eq!(advice.blocks(), 3);
        assert_eq!(advice.source_total(), 37_500.0);
    }

    #[test]
    fn trade_advice_special_cases() {
        let rates = ExchangeRates::default();
        let c = caps(10_000.0);

        let done = Balance::compute(&ResourceVector::ZERO, &ResourceVector::ZERO, &rates);
        assert_eq!(advise_trades(&done, &c, &rates), TradeAdvice::NothingNeeded);

        let metal_only = Balance::compute(&ResourceVector::new(5_000.0, 0.0, 0.0), &ResourceVector::ZERO, &rates);
        assert_eq!(advise_trades(&metal_only, &c, &rates), TradeAdvice::OnlyMetalMissing);

        // crystal surplus, only metal missing: source is crystal, metal is a valid line
        let crystal_to_metal = Balance::compute(
            &ResourceVector::new(5_000.0, 0.0, 0.0),
            &ResourceVector::new(0.0, 4_000.0, 0.0),
            &rates,
        );
        assert!(matches!(
            advise_trades(&crystal_to_metal, &c, &rates),
            TradeAdvice::Trades { source: Resource::Crystal, .. }
        ));

        // no surplus but crystal missing: default source metal, crystal line
        let no_surplus = Balance::compute(
            &ResourceVector::new(5_000.0, 1_000.0, 0.0),
            &ResourceVector::ZERO,
            &rates,
        );
        let advice = advise_trades(&no_surplus, &c, &rates);
        assert!(matches!(advice, TradeAdvice::Trades { source: Resource::Metal, ref lines } if lines.len() == 1));
    }

    #[test]
    fn plan_with_production_and_costs() {
        let rates = ExchangeRates::default();
        let balance = Balance::compute(
            &ResourceVector::new(10_000.0, 2_000.0, 1_000.0),
            &ResourceVector::ZERO,
            &rates,
        );
        // deficit value: 10 000 + 3 000 + 3 000
        let production = ResourceVector::new(1_000.0, 500.0, 200.0);
        let costs = Costs {
            per_pack: 3_500.0,
            per_trade: 1_000.0,
        };
        let plan = plan(&balance, &production, &caps(10_000.0), &rates, &costs, 2);

        assert_eq!(plan.total_deficit_value, 16_000.0);
        assert_eq!(plan.total_production_value, 2_350.0);
        let days = plan.days_to_target.unwrap();
        assert!((days - 16_000.0 / 2_350.0).abs() < 1e-12);
        assert_eq!(plan.packs_needed, 16);
        assert_eq!(plan.pack_cost, 56_000.0);
        // one block each for crystal and deuterium, plus two manual conversions
        assert_eq!(plan.total_trades, 4);
        assert_eq!(plan.trade_cost, 4_000.0);
        assert_eq!(plan.dark_matter_total, 60_000.0);
    }

    #[test]
    fn metal_blocks_are_not_priced_as_trades() {
        let rates = ExchangeRates::default();
        let balance = Balance::compute(
            &ResourceVector::new(50_000.0, 0.0, 5_000.0),
            &ResourceVector::new(0.0, 100_000.0, 0.0),
            &rates,
        );
        let costs = Costs {
            per_pack: 0.0,
            per_trade: 1.0,
        };
        let plan = plan(&balance, &ResourceVector::ZERO, &caps(10_000.0), &rates, &costs, 0);

        // crystal is the source, so metal still gets a recommended line
        assert!(matches!(plan.trades, TradeAdvice::Trades { source: Resource::Crystal, .. }));
        assert_eq!(plan.trades.blocks(), 6);
        // only the deuterium block counts towards dark matter
        assert_eq!(plan.storage_trades, 1);
        assert_eq!(plan.total_trades, 1);
        assert_eq!(plan.trade_cost, 1.0);
    }

    #[test]
    fn plan_without_production_has_unknown_time() {
        let rates = ExchangeRates::default();
        let balance = Balance::compute(&ResourceVector::new(10_000.0, 0.0, 0.0), &ResourceVector::ZERO, &rates);
        let idle = plan(&balance, &ResourceVector::ZERO, &caps(10_000.0), &rates, &Costs::default(), 0);
        assert_eq!(idle.days_to_target, None);
        assert_eq!(idle.packs_needed, 0);

        // crystal production alone gives a time estimate but no packs
        let crystal_only = plan(
            &balance,
            &ResourceVector::new(0.0, 800.0, 0.0),
            &caps(10_000.0),
            &rates,
            &Costs::default(),
            0,
        );
        assert!(crystal_only.days_to_target.is_some());
        assert_eq!(crystal_only.packs_needed, 0);
        assert_eq!(crystal_only.dark_matter_total, 0.0);
    }

    #[test]
    fn nothing_missing_plans_nothing() {
        let rates = ExchangeRates::default();
        let balance = Balance::compute(
            &ResourceVector::new(1_000.0, 0.0, 0.0),
            &ResourceVector::new(5_000.0, 0.0, 0.0),
            &rates,
        );
        let plan = plan(
            &balance,
            &ResourceVector::new(1_000.0, 0.0, 0.0),
            &caps(10_000.0),
            &rates,
            &Costs { per_pack: 1.0, per_trade: 1.0 },
            0,
        );
        assert_eq!(plan.days_to_target, None);
        assert_eq!(plan.packs_needed, 0);
        assert_eq!(plan.trades, TradeAdvice::NothingNeeded);
        assert_eq!(plan.total_trades, 0);
    }
}

//! Plan summaries and report output.
//!
//! [`PlanSummary`] groups the line items of a plan per year, typology and
//! purchase mode. The
//! writers render it as text tables ([`write_report`]) or dump the raw line
//! items as CSV ([`write_csv`]).

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use prettytable::{Table, format, row};

use crate::allocate::LineItem;
use crate::config::Granularity;
use crate::market::coefficients::credited_fraction;
use crate::market::{PurchaseMode, Region, Typology};
use crate::request::PlanRequest;

/// Cost at the low, medium and high price bands.
///
/// Unit prices are quoted as a single figure, so the three bands always hold
/// the same cost.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBands {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl CostBands {
    pub fn of(cost: f64) -> Self {
        Self {
            low: cost,
            medium: cost,
            high: cost,
        }
    }

    fn add(&mut self, cost: f64) {
        let bands = Self::of(cost);
        self.low += bands.low;
        self.medium += bands.medium;
        self.high += bands.high;
    }
}

/// Volume and cost accumulated over a set of line items.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    pub quantity: f64,
    pub cost: f64,
}

impl Tally {
    fn add(&mut self, item: &LineItem) {
        self.quantity += item.quantity;
        self.cost += item.cost();
    }

    /// Average price per tonne, zero when nothing was bought.
    pub fn price_per_ton(&self) -> f64 {
        if self.quantity > 0.0 {
            self.cost / self.quantity
        } else {
            0.0
        }
    }
}

/// Purchases of one typology in one mode during a year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancingDetails {
    pub total: Tally,
    pub regions: BTreeMap<Region, Tally>,
}

/// Purchases of one typology during a year, split by mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TypologyBreakdown {
    pub typology: Typology,
    pub ex_post: FinancingDetails,
    pub ex_ante: FinancingDetails,
}

impl TypologyBreakdown {
    fn mode_mut(&mut self, mode: PurchaseMode) -> &mut FinancingDetails {
        match mode {
            PurchaseMode::ExPost => &mut self.ex_post,
            PurchaseMode::ExAnte => &mut self.ex_ante,
        }
    }
}

/// Everything bought in one year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyStrategy {
    pub year: u32,
    pub quantity_purchased: f64,
    pub cost: CostBands,
    pub types_purchased: Vec<TypologyBreakdown>,
}

/// Summary of a whole plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanSummary {
    /// Yearly strategies in ascending year order.
    pub strategies: Vec<YearlyStrategy>,
    pub total_quantity: f64,
    pub total_cost: CostBands,
    pub by_mode: BTreeMap<PurchaseMode, Tally>,
    pub by_typology: BTreeMap<Typology, Tally>,
    pub by_region: BTreeMap<Region, Tally>,
}

impl PlanSummary {
    pub fn new(items: &[LineItem]) -> Self {
        let mut summary = PlanSummary::default();

        let by_year = items
            .iter()
            .sorted_by_key(|item| item.year)
            .group_by(|item| item.year);
        for (year, group) in &by_year {
            let mut strategy = YearlyStrategy {
                year,
                quantity_purchased: 0.0,
                cost: CostBands::default(),
                types_purchased: Vec::new(),
            };

            for item in group {
                strategy.quantity_purchased += item.quantity;
                strategy.cost.add(item.cost());

                let position = match strategy
                    .types_purchased
                    .iter()
                    .position(|b| b.typology == item.typology)
                {
                    Some(position) => position,
                    None => {
                        strategy.types_purchased.push(TypologyBreakdown {
                            typology: item.typology,
                            ex_post: FinancingDetails::default(),
                            ex_ante: FinancingDetails::default(),
                        });
                        strategy.types_purchased.len() - 1
                    }
                };
                let details = strategy.types_purchased[position].mode_mut(item.mode);
                details.total.add(item);
                details.regions.entry(item.region).or_default().add(item);

                summary.by_mode.entry(item.mode).or_default().add(item);
                summary.by_typology.entry(item.typology).or_default().add(item);
                summary.by_region.entry(item.region).or_default().add(item);
            }

            summary.total_quantity += strategy.quantity_purchased;
            summary.total_cost.add(strategy.cost.medium);
            summary.strategies.push(strategy);
        }

        summary
    }

    /// Medium cost averaged over the years with purchases.
    pub fn average_yearly_cost(&self) -> f64 {
        if self.strategies.is_empty() {
            0.0
        } else {
            self.total_cost.medium / self.strategies.len() as f64
        }
    }

    /// Medium cost per tonne over the whole plan.
    pub fn average_price_per_ton(&self) -> f64 {
        if self.total_quantity > 0.0 {
            self.total_cost.medium / self.total_quantity
        } else {
            0.0
        }
    }
}

/// Volume credited toward a target year by the purchases made up to it.
///
/// Spot purchases count in full. Forward purchases count along their delivery
/// curve, exactly as the allocation model weighs them.
pub fn credited_through(items: &[LineItem], granularity: Granularity, year: u32) -> f64 {
    let Some(target) = granularity.slot_of_year(year) else {
        return 0.0;
    };

    items
        .iter()
        .filter_map(|item| {
            let slot = granularity.slot_of_year(item.year)?;
            Some(
                item.quantity
                    * credited_fraction(item.typology, granularity, item.mode, slot, target),
            )
        })
        .sum()
}

/// Write the line items as CSV.
pub fn write_csv(out: &mut impl Write, items: &[LineItem]) -> Result<()> {
    writeln!(out, "year,typology,region,type,quantity,price,cost")?;
    for item in items {
        writeln!(
            out,
            "{},{},{},{},{:.3},{:.4},{:.2}",
            item.year,
            item.typology,
            item.region,
            item.mode,
            item.quantity,
            item.price,
            item.cost(),
        )?;
    }
    Ok(())
}

/// Write a human-readable report of the plan.
pub fn write_report(
    out: &mut impl Write,
    items: &[LineItem],
    request: &PlanRequest,
) -> Result<()> {
    let summary = PlanSummary::new(items);

    writeln!(out, "Time granularity: {}", request.granularity.name())?;
    writeln!(out, "Total budget: {:.2}", summary.total_cost.medium)?;
    writeln!(out, "Total volume: {:.3} t", summary.total_quantity)?;
    writeln!(
        out,
        "Average yearly cost: {:.2}, average price: {:.4} per t",
        summary.average_yearly_cost(),
        summary.average_price_per_ton()
    )?;

    let mut table = Table::new();
    table.set_titles(row!["Need year", "Required", "Credited"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    for (&year, &need) in &request.carbon_needs {
        table.add_row(row![
            year,
            format!("{:.3}", need),
            format!("{:.3}", credited_through(items, request.granularity, year)),
        ]);
    }
    writeln!(out, "\nCarbon needs")?;
    table.print(out)?;

    writeln!(out, "\nTotals")?;
    let mut table = Table::new();
    table.set_titles(row!["Group", "Quantity", "Cost", "Price/t"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    for (mode, tally) in &summary.by_mode {
        table.add_row(tally_row(mode.to_string(), tally));
    }
    // Most expensive typology first
    for (typology, tally) in summary
        .by_typology
        .iter()
        .sorted_by_key(|(_, tally)| std::cmp::Reverse(OrderedFloat(tally.cost)))
    {
        table.add_row(tally_row(typology.to_string(), tally));
    }
    for (region, tally) in &summary.by_region {
        table.add_row(tally_row(region.to_string(), tally));
    }
    table.print(out)?;

    for strategy in &summary.strategies {
        writeln!(
            out,
            "\nYear {}: {:.3} t, cost {:.2}",
            strategy.year, strategy.quantity_purchased, strategy.cost.medium
        )?;

        let mut table = Table::new();
        table.set_titles(row!["Typology", "Type", "Quantity", "Cost", "Price/t", "Regions"]);
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        for breakdown in &strategy.types_purchased {
            for (mode, details) in [
                (PurchaseMode::ExPost, &breakdown.ex_post),
                (PurchaseMode::ExAnte, &breakdown.ex_ante),
            ] {
                if details.total.quantity <= 0.0 {
                    continue;
                }
                let regions = details.regions.keys().join(" ");
                table.add_row(row![
                    breakdown.typology,
                    mode,
                    format!("{:.3}", details.total.quantity),
                    format!("{:.2}", details.total.cost),
                    format!("{:.4}", details.total.price_per_ton()),
                    regions,
                ]);
            }
        }
        table.print(out)?;
    }

    Ok(())
}

fn tally_row(label: String, tally: &Tally) -> prettytable::Row {
    row![
        label,
        format!("{:.3}", tally.quantity),
        format!("{:.2}", tally.cost),
        format!("{:.4}", tally.price_per_ton()),
    ]
}

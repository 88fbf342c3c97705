//! The allocation linear program.
//!
//! One continuous variable is created per (typology, region, slot, mode). The
//! objective is the total spend. Constraints, in the order they are added:
//!
//! | name                      | meaning                                             |
//! |---------------------------|-----------------------------------------------------|
//! | `budget_ceiling[year]`    | spend in the slot is at most `z`                    |
//! | `ceiling_share`           | `z` is at most the ceiling share of total spend     |
//! | `budget_floor[year]`      | spend in the slot is at least `z_min` (if floored)  |
//! | `floor_share`             | `z_min` is at least the floor share of total spend  |
//! | `financing_total`         | the financing aggregator equals the total volume    |
//! | `financing_split[mode]`   | volume per mode matches the request (if fixed)      |
//! | `typology_total`          | the typology aggregator equals the total volume     |
//! | `typology_split[typology]`| volume per typology matches the request             |
//! | `region_total`            | the region aggregator equals the total volume       |
//! | `region_split[region]`    | volume per region matches the request (if fixed)    |
//! | `carbon_need[year]`       | volume credited by the year covers the need         |

use itertools::iproduct;
use tracing::{debug, info};

use crate::AppError;
use crate::config::{PlanShape, PlannerConfig};
use crate::constraint;
use crate::lp_solver::{
    Constraint, LPModelBuilder, LPSolution, LinearExpression, OptimizationSense,
    OptimizationStatus, SolverOptions, VariableId,
};
use crate::market::coefficients::{credited_fraction, unit_price};
use crate::market::{PurchaseMode, Region, Typology};
use crate::request::PlanRequest;

use super::{Allocation, LineItem};

/// Quantities below this many tonnes are solver noise and not reported.
pub const QUANTITY_EPSILON: f64 = 1e-6;

/// One purchase decision of the model.
#[derive(Debug)]
pub struct Purchase<Brand> {
    pub typology: Typology,
    pub region: Region,
    pub slot: usize,
    pub year: u32,
    pub mode: PurchaseMode,
    /// Price per tonne, forward discount included.
    pub price: f64,
    pub variable: VariableId<Brand>,
}

/// A built allocation model, ready to be solved.
pub struct AllocationModel<Brand> {
    builder: LPModelBuilder<Brand>,
    shape: PlanShape,
    purchases: Vec<Purchase<Brand>>,
}

fn variable_name(mode: PurchaseMode, typology: Typology, region: Region, year: u32) -> String {
    let prefix = match mode {
        PurchaseMode::ExPost => "x",
        PurchaseMode::ExAnte => "y",
    };
    format!("{prefix}[{typology},{region},{year}]")
}

/// Tonnes bought across the selected purchases.
fn volume<Brand>(
    purchases: &[Purchase<Brand>],
    selected: impl Fn(&Purchase<Brand>) -> bool,
) -> LinearExpression<Brand> {
    purchases
        .iter()
        .filter(|p| selected(p))
        .map(|p| p.variable)
        .sum()
}

/// Money spent on the selected purchases.
fn spend<Brand>(
    purchases: &[Purchase<Brand>],
    selected: impl Fn(&Purchase<Brand>) -> bool,
) -> LinearExpression<Brand> {
    purchases
        .iter()
        .filter(|p| selected(p))
        .map(|p| p.price * p.variable)
        .sum()
}

impl<Brand> AllocationModel<Brand> {
    /// Build the model for a validated request on top of an empty builder.
    pub fn build(
        mut builder: LPModelBuilder<Brand>,
        request: &PlanRequest,
        config: &PlannerConfig,
    ) -> Self {
        let shape = config.shape(request.granularity);

        let purchases: Vec<_> = iproduct!(
            request.typology.keys().copied(),
            request.regions.keys().copied(),
            0..shape.slots,
            PurchaseMode::ALL
        )
        .map(|(typology, region, slot, mode)| {
            let year = shape.year_of_slot(slot);
            Purchase {
                typology,
                region,
                slot,
                year,
                mode,
                price: unit_price(typology, region, year, mode, config.forward_discount),
                variable: builder.add_variable(
                    variable_name(mode, typology, region, year),
                    0.0,
                    f64::INFINITY,
                ),
            }
        })
        .collect();

        builder.set_objective(spend(&purchases, |_| true), OptimizationSense::Minimize);

        // Spend smoothing
        let z = builder.add_variable("z", 0.0, f64::INFINITY);
        for slot in 0..shape.slots {
            builder.add_constraint(constraint!(
                format!("budget_ceiling[{}]", shape.year_of_slot(slot)),
                (spend(&purchases, |p| p.slot == slot) - z) <= 0.0
            ));
        }
        builder.add_constraint(constraint!(
            "ceiling_share",
            (z - shape.ceiling * spend(&purchases, |_| true)) <= 0.0
        ));

        if let Some(floor) = shape.floor {
            let z_min = builder.add_variable("z_min", 0.0, f64::INFINITY);
            for slot in 0..shape.slots {
                builder.add_constraint(constraint!(
                    format!("budget_floor[{}]", shape.year_of_slot(slot)),
                    (spend(&purchases, |p| p.slot == slot) - z_min) >= 0.0
                ));
            }
            builder.add_constraint(constraint!(
                "floor_share",
                (z_min - floor * spend(&purchases, |_| true)) >= 0.0
            ));
        }

        // Portfolio mix
        let total_financing = builder.add_variable("total_financing", 0.0, f64::INFINITY);
        builder.add_constraint(constraint!(
            "financing_total",
            (total_financing - volume(&purchases, |_| true)) == 0.0
        ));
        if !request.optimize_financing {
            for (&mode, &fraction) in &request.financing {
                builder.add_constraint(constraint!(
                    format!("financing_split[{}]", mode.split_key()),
                    (volume(&purchases, |p| p.mode == mode) - fraction * total_financing) == 0.0
                ));
            }
        }

        let total_typology = builder.add_variable("total_typology", 0.0, f64::INFINITY);
        builder.add_constraint(constraint!(
            "typology_total",
            (total_typology - volume(&purchases, |_| true)) == 0.0
        ));
        for (&typology, &fraction) in &request.typology {
            builder.add_constraint(constraint!(
                format!("typology_split[{typology}]"),
                (volume(&purchases, |p| p.typology == typology) - fraction * total_typology) == 0.0
            ));
        }

        let total_region = builder.add_variable("total_region", 0.0, f64::INFINITY);
        builder.add_constraint(constraint!(
            "region_total",
            (total_region - volume(&purchases, |_| true)) == 0.0
        ));
        if !request.optimize_region {
            for (&region, &fraction) in &request.regions {
                builder.add_constraint(constraint!(
                    format!("region_split[{region}]"),
                    (volume(&purchases, |p| p.region == region) - fraction * total_region) == 0.0
                ));
            }
        }

        // Cumulative delivery
        for (&year, &need) in &request.carbon_needs {
            // Validated requests only carry years inside the horizon
            let Some(target) = shape.slot_of_year(year) else {
                continue;
            };
            let credited: LinearExpression<Brand> = purchases
                .iter()
                .filter(|p| p.slot <= target)
                .map(|p| {
                    let weight = credited_fraction(
                        p.typology,
                        shape.granularity,
                        p.mode,
                        p.slot,
                        target,
                    );
                    weight * p.variable
                })
                .sum();
            builder.add_constraint(Constraint::ge(
                format!("carbon_need[{year}]"),
                credited,
                need,
            ));
        }

        info!(
            granularity = shape.granularity.name(),
            variables = builder.variable_count(),
            constraints = builder.constraint_count(),
            "allocation model built"
        );

        Self {
            builder,
            shape,
            purchases,
        }
    }

    pub fn shape(&self) -> &PlanShape {
        &self.shape
    }

    pub fn purchases(&self) -> &[Purchase<Brand>] {
        &self.purchases
    }

    pub fn variable_count(&self) -> usize {
        self.builder.variable_count()
    }

    pub fn constraint_count(&self) -> usize {
        self.builder.constraint_count()
    }

    /// Constraint names in the order they were added.
    pub fn constraint_names(&self) -> impl Iterator<Item = &str> {
        self.builder.constraints().map(|c| c.name())
    }

    /// Look up a constraint by name.
    pub fn constraint(&self, name: &str) -> Option<&Constraint<Brand>> {
        self.builder.constraints().find(|c| c.name() == name)
    }

    /// Solve the model and read back the purchase schedule.
    pub fn solve(&self, options: &SolverOptions) -> Result<Allocation, AppError> {
        let solution = self
            .builder
            .solve(options)
            .map_err(|e| AppError::SolverError(format!("{e:#}")))?;

        match solution.status {
            OptimizationStatus::Optimal => Ok(self.extract(&solution)),
            OptimizationStatus::Infeasible => Err(AppError::Infeasible),
            OptimizationStatus::Unbounded => Err(AppError::Unbounded),
            OptimizationStatus::TimeLimitReached => Err(AppError::SolverError(
                "time limit reached before an optimal plan was found".into(),
            )),
            OptimizationStatus::Other(reason) => Err(AppError::SolverError(reason.into())),
        }
    }

    fn extract(&self, solution: &LPSolution<Brand>) -> Allocation {
        let results: Vec<LineItem> = self
            .purchases
            .iter()
            .filter_map(|p| {
                let quantity = solution.get_value(p.variable)?;
                (quantity > QUANTITY_EPSILON).then_some(LineItem {
                    year: p.year,
                    quantity,
                    typology: p.typology,
                    region: p.region,
                    price: p.price,
                    mode: p.mode,
                })
            })
            .collect();

        let total_price = self
            .builder
            .objective()
            .map_or(solution.objective_value, |objective| solution.evaluate(objective));

        for need in self
            .builder
            .constraints()
            .filter(|c| c.name().starts_with("carbon_need"))
        {
            debug!(
                constraint = need.name(),
                required = need.rhs(),
                credited = solution.evaluate(need.expression()),
                "carbon need covered"
            );
        }
        debug!(
            line_items = results.len(),
            total_price,
            solver_objective = solution.objective_value,
            "allocation extracted"
        );

        Allocation {
            results,
            total_price,
        }
    }
}

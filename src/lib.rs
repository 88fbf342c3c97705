//! Carbon-credit portfolio allocation planning with linear programming
//!
//! This library turns a buyer's portfolio preferences into a cost-minimising
//! purchase schedule of carbon credits over the 2025–2050 horizon.
//!
//! # Overview
//!
//! A request states how the portfolio volume is split between purchase modes
//! (spot *ex-post* or forward *ex-ante*), project typologies and regions, plus a
//! schedule of cumulative carbon needs. The planner builds a linear program whose
//! variables are the tonnes bought per typology, region, time slot and mode,
//! minimises the total spend, and returns one line item per non-zero purchase.
//!
//! Spend is smoothed over the horizon: no slot may take more than a fixed share
//! of the total, and (except in the flexible mode) every slot must take a minimum
//! share. Forward purchases are cheaper but only count toward a need along a
//! delivery curve.
//!
//! # Usage Example
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use kalculator::{PlanRequest, PlannerConfig, plan};
//!
//! let config = PlannerConfig::default();
//! let request = PlanRequest::from_json(
//!     r#"{
//!         "financing": {"exPost": 0.4, "exAnte": 0.6},
//!         "typology": {"nbsRemoval": 0.3, "nbsAvoidance": 0.2, "dac": 0.1,
//!                      "biochar": 0.2, "renewableEnergy": 0.2},
//!         "regionAllocation": {"northAmerica": 0.2, "southAmerica": 0.2, "europe": 0.2,
//!                              "africa": 0.1, "asia": 0.2, "oceania": 0.1},
//!         "carbonUnitNeeds": {"2030": 100000, "2050": 900000},
//!         "timeConstraints": 1
//!     }"#,
//!     &config,
//! )?;
//!
//! let allocation = plan(&request, &config)?;
//! println!("{}", allocation.total_price);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - **[`market`]**: typologies, regions, purchase modes and their coefficient tables
//! - **[`config`]**: planner constants, cap profiles and time granularities
//! - **[`request`]**: request parsing and validation
//! - **[`allocate`]**: the allocation model, its solve and the CLI entry point
//! - **[`report`]**: plan summaries and CSV / text report output
//! - **[`lp_solver`]**: linear programming solver abstraction layer

use clap::Parser;
use thiserror::Error;

pub mod allocate;
pub mod config;
pub mod logging;
pub mod lp_solver;
pub mod market;
pub mod report;
pub mod request;

pub use allocate::{AllocateArgs, Allocation, LineItem, allocate_main, plan};
pub use config::{CapProfile, Granularity, PlannerConfig};
pub use market::{PurchaseMode, Region, Typology};
pub use request::PlanRequest;

/// Application-level errors raised while validating a request or solving a plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    /// A required request field, or a key of one of its splits, is absent or empty.
    #[error("missing {0}")]
    MissingInput(String),
    /// A carbon need is scheduled outside the planning horizon.
    #[error("carbon need year {year} is outside 2025-2050")]
    YearOutOfRange { year: i64 },
    /// A fraction or a need is negative or not a finite number.
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: String, value: f64 },
    /// A fraction group does not add up to 1.
    #[error("{group} fractions sum to {sum}, expected 1")]
    SplitSum { group: String, sum: f64 },
    /// A typology that is not part of the configured set.
    #[error("unexpected typology `{0}`")]
    UnexpectedTypology(String),
    /// The request document does not have the expected shape.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    /// The requirements cannot be met together.
    #[error("problem infeasible")]
    Infeasible,
    #[error("problem unbounded")]
    Unbounded,
    #[error("solver error: {0}")]
    SolverError(String),
}

impl AppError {
    /// Stable tag identifying the error variant in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::MissingInput(_) => "missing_input",
            AppError::YearOutOfRange { .. } => "year_out_of_range",
            AppError::InvalidValue { .. } => "invalid_value",
            AppError::SplitSum { .. } => "split_sum",
            AppError::UnexpectedTypology(_) => "unexpected_typology",
            AppError::MalformedRequest(_) => "malformed_request",
            AppError::Infeasible => "infeasible",
            AppError::Unbounded => "unbounded",
            AppError::SolverError(_) => "solver_error",
        }
    }
}

/// Command-line interface of the planner.
///
/// The request is given inline, through `--input`, or on stdin. The resulting
/// plan is written to stdout as JSON; logs and errors go to stderr.
#[derive(Debug, Parser)]
#[clap(
    name = "kalculator",
    version,
    about = "Plan a cost-minimising carbon-credit purchase schedule"
)]
pub struct CLIArguments {
    #[clap(flatten)]
    pub allocate: AllocateArgs,

    #[clap(flatten)]
    pub logging: logging::LoggingArgs,
}

//! Allocation planning.
//!
//! This module turns a validated [`PlanRequest`] into a purchase schedule. The
//! work is split in two:
//!
//! - [`model`] builds the linear program: one variable per typology, region,
//!   slot and purchase mode, the spend objective and the named constraint set.
//! - [`plan`] solves it through [`crate::lp_solver`] and shapes the result into
//!   [`LineItem`]s.
//!
//! The same model serves the three time granularities; only the
//! [`PlanShape`](crate::config::PlanShape) changes.
//!
//! # Outputs
//!
//! The plan itself is printed as JSON on stdout. Optional outputs:
//!
//! - **CSV** (`--csv`): one row per line item
//! - **Report** (`--rpt`): yearly strategies and portfolio totals as text tables
//!
//! # Usage Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use kalculator::allocate::{AllocateArgs, allocate_main};
//!
//! let args = AllocateArgs {
//!     input: Some("request.json".into()),
//!     rpt: Some("plan.rpt".into()),
//!     ..AllocateArgs::default()
//! };
//!
//! allocate_main(args)?;
//! # Ok(())
//! # }
//! ```

use std::{
    fs,
    io::{self, BufWriter, Read, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{CapProfile, PlannerConfig, SPLIT_TOLERANCE};
use crate::lp_model_builder;
use crate::market::{FifthTypology, PurchaseMode, Region, Typology};
use crate::report;
use crate::request::PlanRequest;

pub mod model;

pub use model::{AllocationModel, Purchase, QUANTITY_EPSILON};

/// Environment variable holding a default solver time limit, in seconds.
pub const TIME_LIMIT_ENV: &str = "KALCULATOR_TIME_LIMIT";

/// One purchase of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub year: u32,
    /// Tonnes bought.
    pub quantity: f64,
    pub typology: Typology,
    pub region: Region,
    /// Price per tonne paid.
    pub price: f64,
    #[serde(rename = "type")]
    pub mode: PurchaseMode,
}

impl LineItem {
    pub fn cost(&self) -> f64 {
        self.quantity * self.price
    }
}

/// A solved plan, in the shape printed on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub results: Vec<LineItem>,
    pub total_price: f64,
}

/// Build and solve the allocation model for a request.
pub fn plan(request: &PlanRequest, config: &PlannerConfig) -> Result<Allocation> {
    let model = AllocationModel::build(lp_model_builder!(AllocationPlan), request, config);
    let allocation = model.solve(&config.solver)?;

    info!(
        line_items = allocation.results.len(),
        total_price = allocation.total_price,
        "plan solved"
    );
    Ok(allocation)
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    if seconds.is_finite() && seconds > 0.0 {
        Ok(Duration::from_secs_f64(seconds))
    } else {
        Err(format!("time limit must be positive, got {seconds}"))
    }
}

/// Command-line arguments for planning an allocation.
#[derive(Parser, Debug, Clone)]
pub struct AllocateArgs {
    /// Request JSON document; read from stdin when omitted or `-`
    #[clap(conflicts_with = "input")]
    pub request: Option<String>,

    /// Read the request JSON from a file
    #[clap(long, short)]
    pub input: Option<PathBuf>,

    /// Spend ceiling profile
    #[clap(long, value_enum, default_value_t = CapProfile::Revised)]
    pub profile: CapProfile,

    /// Category completing the typology set
    #[clap(long, value_enum, default_value_t = FifthTypology::RenewableEnergy)]
    pub fifth_typology: FifthTypology,

    /// Solver time limit in seconds [env: KALCULATOR_TIME_LIMIT]
    #[clap(long, short = 't', value_parser = parse_seconds)]
    pub time_limit: Option<Duration>,

    /// Accepted deviation of a fraction group from 1
    #[clap(long, default_value_t = SPLIT_TOLERANCE)]
    pub split_tolerance: f64,

    /// Output CSV file with the line items
    #[clap(long)]
    pub csv: Option<PathBuf>,

    /// Output report file
    #[clap(long)]
    pub rpt: Option<PathBuf>,
}

impl Default for AllocateArgs {
    fn default() -> Self {
        Self {
            request: None,
            input: None,
            profile: CapProfile::default(),
            fifth_typology: FifthTypology::default(),
            time_limit: None,
            split_tolerance: SPLIT_TOLERANCE,
            csv: None,
            rpt: None,
        }
    }
}

impl AllocateArgs {
    /// Planner configuration selected by the arguments and the environment.
    pub fn planner_config(&self) -> Result<PlannerConfig> {
        if !(self.split_tolerance.is_finite() && self.split_tolerance >= 0.0) {
            return Err(anyhow!(
                "split tolerance must be a non-negative number, got {}",
                self.split_tolerance
            ));
        }

        let time_limit = match self.time_limit {
            Some(limit) => Some(limit),
            None => match std::env::var(TIME_LIMIT_ENV) {
                Ok(value) => {
                    Some(parse_seconds(&value).map_err(|e| anyhow!("{TIME_LIMIT_ENV}: {e}"))?)
                }
                Err(_) => None,
            },
        };

        let mut config = PlannerConfig {
            profile: self.profile,
            fifth_typology: self.fifth_typology,
            split_tolerance: self.split_tolerance,
            ..PlannerConfig::default()
        };
        config.solver.time_limit = time_limit;
        Ok(config)
    }

    /// Request document text, from the argument, a file or stdin.
    pub fn read_request(&self) -> Result<String> {
        match (&self.request, &self.input) {
            (_, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("failed to read request from {}", path.display())),
            (Some(text), None) if text != "-" => Ok(text.clone()),
            _ => {
                let mut text = String::new();
                io::stdin()
                    .read_to_string(&mut text)
                    .context("failed to read request from stdin")?;
                Ok(text)
            }
        }
    }
}

/// Plan an allocation and write it out.
///
/// This is the entry point of the command line tool. It:
///
/// 1. Reads the request from the argument, `--input` or stdin
/// 2. Validates it against the selected configuration
/// 3. Builds and solves the allocation model
/// 4. Prints the plan as JSON on stdout and writes the optional CSV and report files
pub fn allocate_main(args: AllocateArgs) -> Result<()> {
    let config = args.planner_config()?;
    let text = args.read_request()?;
    let request = PlanRequest::from_json(&text, &config)?;

    info!(
        granularity = request.granularity.name(),
        needs = request.carbon_needs.len(),
        profile = ?config.profile,
        "planning allocation"
    );
    let allocation = plan(&request, &config)?;

    {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer(&mut out, &allocation)?;
        writeln!(out)?;
    }

    if let Some(output) = &args.csv {
        let mut out_file = BufWriter::new(fs::File::create(output)?);
        report::write_csv(&mut out_file, &allocation.results)?;
        out_file.flush()?;
    }

    if let Some(output) = &args.rpt {
        let mut out_file = BufWriter::new(fs::File::create(output)?);
        report::write_report(&mut out_file, &allocation.results, &request)?;
        out_file.flush()?;
    }

    Ok(())
}

//! Linear Programming (LP) solver abstraction layer
//!
//! This module keeps the allocation model independent of the numeric engine that
//! solves it. The planner builds an [`LPModelBuilder`] out of continuous
//! variables, named linear constraints and a linear objective; the builder is
//! then handed to COIN-OR CBC (see [`coin_cbc`]) which returns an [`LPSolution`].
//!
//! # Type Safety with Branded Types
//!
//! All core types (`VariableId`, `LinearExpression`, `Constraint`, `LPModelBuilder`)
//! use a generic `Brand` type parameter that provides compile-time guarantees:
//!
//! - Variables from one builder cannot be accidentally used with another builder
//! - Constraints are type-checked to ensure they only use variables from their builder
//! - No runtime overhead - the brand is a zero-sized phantom type
//!
//! Use the `lp_model_builder!()` macro to create builders with unique brands:
//!
//! ```rust
//! use kalculator::constraint;
//! use kalculator::lp_model_builder;
//!
//! let mut builder1 = lp_model_builder!();
//! let mut builder2 = lp_model_builder!();
//!
//! let x = builder1.add_variable("x", 0.0, 10.0);
//! let y = builder2.add_variable("y", 0.0, 10.0);
//!
//! // This compiles:
//! builder1.add_constraint(constraint!((x) <= 5.0));
//!
//! // This would NOT compile (type error):
//! // builder1.add_constraint(constraint!((y) <= 5.0));
//! ```
//!
//! # Building LP Models
//!
//! Constraints are written with the `constraint!` macro, optionally named so the
//! built model can be inspected before it is solved:
//!
//! ```rust,no_run
//! use kalculator::constraint;
//! use kalculator::lp_model_builder;
//! use kalculator::lp_solver::{OptimizationSense, SolverOptions};
//!
//! let mut builder = lp_model_builder!();
//! let x = builder.add_variable("x", 0.0, f64::INFINITY);
//! let y = builder.add_variable("y", 0.0, f64::INFINITY);
//!
//! builder.add_constraint(constraint!((x + y) == 10.0));
//! builder.add_constraint(constraint!("cap", (2.0 * x - y) <= 5.0));
//!
//! builder.set_objective(x + 2.0 * y, OptimizationSense::Minimize);
//! let _solution = builder.solve(&SolverOptions::default());
//! ```
//!
//! Larger sums are collected from iterators; repeated variables are merged before
//! the model reaches the solver:
//!
//! ```rust
//! use kalculator::lp_model_builder;
//! use kalculator::lp_solver::LinearExpression;
//!
//! let mut builder = lp_model_builder!();
//! let xs: Vec<_> = (0..4).map(|i| builder.add_variable(format!("x{i}"), 0.0, 1.0)).collect();
//!
//! let total: LinearExpression<_> = xs.iter().map(|&x| 3.0 * x).sum();
//! assert_eq!(total.terms.len(), 4);
//! ```

use anyhow::Result;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Constraint sense for linear constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// Less than or equal to (≤)
    LessEqual,
    /// Equal to (=)
    Equal,
    /// Greater than or equal to (≥)
    GreaterEqual,
}

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationSense {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Status of the optimization process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// Optimal solution found
    Optimal,
    /// Problem is infeasible (no solution exists)
    Infeasible,
    /// Problem is unbounded
    Unbounded,
    /// The configured time limit stopped the search
    TimeLimitReached,
    /// Other status (solver-specific)
    Other(&'static str),
}

/// Knobs forwarded to the solver backend.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolverOptions {
    /// Wall-clock limit for a single solve. `None` leaves the backend default.
    pub time_limit: Option<Duration>,
}

/// A linear expression term: coefficient * variable
#[derive(Debug)]
pub struct LinearTerm<Brand> {
    pub coefficient: f64,
    pub variable: VariableId<Brand>,
}

// Manual impls so that Brand needs no Clone bound
impl<Brand> Clone for LinearTerm<Brand> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Brand> Copy for LinearTerm<Brand> {}

/// A linear expression: sum of terms plus constant
#[derive(Debug)]
pub struct LinearExpression<Brand> {
    pub terms: Vec<LinearTerm<Brand>>,
    pub constant: f64,
}

impl<Brand> Clone for LinearExpression<Brand> {
    fn clone(&self) -> Self {
        Self {
            terms: self.terms.clone(),
            constant: self.constant,
        }
    }
}

impl<Brand> LinearExpression<Brand> {
    /// Create a new linear expression with a constant term
    pub fn new(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    /// Add a term to the expression
    pub fn add_term(&mut self, coefficient: f64, variable: VariableId<Brand>) {
        self.terms.push(LinearTerm {
            coefficient,
            variable,
        });
    }

    /// Create a linear expression from a single variable
    pub fn from_variable(variable: VariableId<Brand>) -> Self {
        Self {
            terms: vec![LinearTerm {
                coefficient: 1.0,
                variable,
            }],
            constant: 0.0,
        }
    }

    /// Merge repeated variables into a single term each, dropping zero coefficients.
    ///
    /// Terms keep the order in which each variable first appears.
    pub fn compact(self) -> Self {
        let mut order = Vec::new();
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.terms {
            let entry = merged.entry(term.variable.id).or_insert_with(|| {
                order.push(term.variable);
                0.0
            });
            *entry += term.coefficient;
        }

        Self {
            terms: order
                .into_iter()
                .filter_map(|variable| {
                    let coefficient = merged[&variable.id];
                    (coefficient != 0.0).then_some(LinearTerm {
                        coefficient,
                        variable,
                    })
                })
                .collect(),
            constant: self.constant,
        }
    }
}

impl<Brand> Default for LinearExpression<Brand> {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl<Brand> From<VariableId<Brand>> for LinearExpression<Brand> {
    fn from(variable: VariableId<Brand>) -> Self {
        Self::from_variable(variable)
    }
}

impl<Brand> std::iter::Sum<LinearExpression<Brand>> for LinearExpression<Brand> {
    fn sum<I: Iterator<Item = LinearExpression<Brand>>>(iter: I) -> Self {
        iter.fold(LinearExpression::default(), |acc, expr| acc + expr)
    }
}

impl<Brand> std::iter::Sum<VariableId<Brand>> for LinearExpression<Brand> {
    fn sum<I: Iterator<Item = VariableId<Brand>>>(iter: I) -> Self {
        let mut expr = LinearExpression::default();
        for variable in iter {
            expr.add_term(1.0, variable);
        }
        expr
    }
}

/// Unique identifier for a variable in the LP model
///
/// The `Brand` type parameter ensures that variables can only be used with the
/// builder that created them. This is enforced at compile time.
pub struct VariableId<Brand> {
    id: usize,
    _brand: PhantomData<fn() -> Brand>,
}

// Manual trait implementations that don't require Brand to implement anything
impl<Brand> std::fmt::Debug for VariableId<Brand> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableId").field("id", &self.id).finish()
    }
}

impl<Brand> Clone for VariableId<Brand> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Brand> Copy for VariableId<Brand> {}

impl<Brand> PartialEq for VariableId<Brand> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<Brand> Eq for VariableId<Brand> {}

impl<Brand> std::hash::Hash for VariableId<Brand> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Unique identifier for a constraint in the LP model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(usize);

/// A named linear constraint
///
/// Names are free-form labels used for inspection and logging; an empty name
/// is allowed. The `Brand` type parameter ensures the constraint only uses
/// variables from the builder that will consume it.
///
/// # Examples
///
/// ```rust,no_run
/// use kalculator::constraint;
/// use kalculator::lp_model_builder;
/// use kalculator::lp_solver::{Constraint, ConstraintSense};
///
/// let mut builder = lp_model_builder!();
/// let x = builder.add_variable("x", 0.0, 10.0);
/// let y = builder.add_variable("y", 0.0, 10.0);
///
/// let c = constraint!("sum", (x + y) == 10.0);
/// let c = Constraint::eq("sum", x + y, 10.0);
/// let c = Constraint::new("sum", x + y, ConstraintSense::Equal, 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct Constraint<Brand> {
    name: Arc<str>,
    expression: LinearExpression<Brand>,
    sense: ConstraintSense,
    rhs: f64,
}

impl<Brand> Constraint<Brand> {
    /// Create a new constraint
    pub fn new(
        name: impl Into<Arc<str>>,
        expression: impl Into<LinearExpression<Brand>>,
        sense: ConstraintSense,
        rhs: f64,
    ) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            sense,
            rhs,
        }
    }

    /// Create an equality constraint: expression == rhs
    pub fn eq(
        name: impl Into<Arc<str>>,
        expression: impl Into<LinearExpression<Brand>>,
        rhs: f64,
    ) -> Self {
        Self::new(name, expression, ConstraintSense::Equal, rhs)
    }

    /// Create a less-than-or-equal constraint: expression <= rhs
    pub fn le(
        name: impl Into<Arc<str>>,
        expression: impl Into<LinearExpression<Brand>>,
        rhs: f64,
    ) -> Self {
        Self::new(name, expression, ConstraintSense::LessEqual, rhs)
    }

    /// Create a greater-than-or-equal constraint: expression >= rhs
    pub fn ge(
        name: impl Into<Arc<str>>,
        expression: impl Into<LinearExpression<Brand>>,
        rhs: f64,
    ) -> Self {
        Self::new(name, expression, ConstraintSense::GreaterEqual, rhs)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &LinearExpression<Brand> {
        &self.expression
    }

    pub fn sense(&self) -> ConstraintSense {
        self.sense
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }
}

/// Variable information stored in the model
#[derive(Debug, Clone)]
struct VariableInfo {
    name: Arc<str>,
    lower_bound: f64,
    upper_bound: f64,
}

/// Objective function information
#[derive(Debug, Clone)]
struct ObjectiveInfo<Brand> {
    expression: LinearExpression<Brand>,
    sense: OptimizationSense,
}

/// Result of solving an LP model
#[derive(Debug, Clone)]
pub struct LPSolution<Brand> {
    pub status: OptimizationStatus,
    pub objective_value: f64,
    variable_values: Vec<f64>,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> LPSolution<Brand> {
    /// Get the value of a variable from the solution
    pub fn get_value(&self, var_id: VariableId<Brand>) -> Option<f64> {
        self.variable_values.get(var_id.id).copied()
    }

    /// Evaluate an expression against the solved variable values
    pub fn evaluate(&self, expression: &LinearExpression<Brand>) -> f64 {
        expression.terms.iter().fold(expression.constant, |acc, term| {
            acc + term.coefficient * self.get_value(term.variable).unwrap_or(0.0)
        })
    }
}

/// Builder for LP models
///
/// The `Brand` type parameter ensures type safety - variables from one builder
/// cannot be accidentally used with another builder. This is enforced at compile time.
///
/// # Examples
///
/// ```rust,no_run
/// use kalculator::lp_model_builder;
/// use kalculator::lp_solver::LPModelBuilder;
///
/// struct MyModel;
/// let mut builder1 = LPModelBuilder::<MyModel>::new();
/// let x = builder1.add_variable("x", 0.0, 10.0);
///
/// let mut builder2 = lp_model_builder!();
/// ```
pub struct LPModelBuilder<Brand> {
    variables: Vec<VariableInfo>,
    constraints: Vec<Constraint<Brand>>,
    objective: Option<ObjectiveInfo<Brand>>,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> LPModelBuilder<Brand> {
    /// Create a new LP model builder
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: None,
            _brand: PhantomData,
        }
    }

    /// Add a continuous variable to the model
    pub fn add_variable(
        &mut self,
        name: impl Into<Arc<str>>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> VariableId<Brand> {
        let var_id = VariableId {
            id: self.variables.len(),
            _brand: PhantomData,
        };
        self.variables.push(VariableInfo {
            name: name.into(),
            lower_bound,
            upper_bound,
        });
        var_id
    }

    /// Add a constraint to the model
    pub fn add_constraint(&mut self, constraint: Constraint<Brand>) -> ConstraintId {
        let constr_id = ConstraintId(self.constraints.len());
        self.constraints.push(constraint);
        constr_id
    }

    /// Set the objective function
    pub fn set_objective(&mut self, expression: LinearExpression<Brand>, sense: OptimizationSense) {
        self.objective = Some(ObjectiveInfo { expression, sense });
    }

    /// Objective expression, if one was set
    pub fn objective(&self) -> Option<&LinearExpression<Brand>> {
        self.objective.as_ref().map(|info| &info.expression)
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Name given to a variable when it was added
    pub fn variable_name(&self, var_id: VariableId<Brand>) -> &str {
        &self.variables[var_id.id].name
    }

    /// Iterate over the constraints in insertion order
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint<Brand>> {
        self.constraints.iter()
    }

    /// Solve the model with COIN-OR CBC
    pub fn solve(&self, options: &SolverOptions) -> Result<LPSolution<Brand>> {
        crate::lp_solver::coin_cbc::solve_coin_cbc(self, options)
    }
}

impl<Brand> Default for LPModelBuilder<Brand> {
    fn default() -> Self {
        Self::new()
    }
}

// Macros for convenient syntax
pub mod macros;

// Operator overloading for linear expressions
pub mod ops;

pub mod coin_cbc;

pub mod output_suppression;

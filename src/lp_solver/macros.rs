//! Macros for the LP solver module
//!
//! This module contains all the macros used by the LP solver, providing
//! convenient syntax for creating models and constraints.

/// Create a new LP model builder with a unique brand
///
/// This macro ensures that each model builder has a unique type-level brand,
/// preventing accidental mixing of variables between different models.
///
/// # Examples
///
/// ```rust
/// use kalculator::lp_model_builder;
///
/// // Anonymous brand (each call creates unique anonymous type)
/// let mut builder = lp_model_builder!();
/// let x = builder.add_variable("x", 0.0, 10.0);
///
/// // Named brand (easier to identify in type system and errors)
/// let mut yearly = lp_model_builder!(YearlyPlan);
/// let mut flexible = lp_model_builder!(FlexiblePlan);
///
/// let a = yearly.add_variable("a", 0.0, 100.0);
/// let b = flexible.add_variable("b", 0.0, 24.0);
///
/// // This would cause a compile-time error due to different brands:
/// // flexible.add_constraint(constraint!((a) <= 50.0)); // ERROR!
/// ```
#[macro_export]
macro_rules! lp_model_builder {
    // Named brand - user provides the brand name
    ($brand_name:ident) => {{
        struct $brand_name;
        $crate::lp_solver::LPModelBuilder::<$brand_name>::new()
    }};

    // Anonymous brand - the `UniqueBrand` struct is defined locally within the `{{ ... }}` block,
    // so each macro invocation creates a fresh scope with its own distinct `UniqueBrand` type
    () => {{
        struct UniqueBrand;
        $crate::lp_solver::LPModelBuilder::<UniqueBrand>::new()
    }};
}

/// Create constraints using natural comparison syntax
///
/// The left-hand side must be in parentheses. A leading name is optional; it
/// accepts anything convertible into `Arc<str>`.
///
/// # Examples
///
/// ```rust
/// use kalculator::constraint;
/// use kalculator::lp_model_builder;
///
/// let mut builder = lp_model_builder!(OptimisationModel);
/// let x = builder.add_variable("x", 0.0, 10.0);
/// let y = builder.add_variable("y", 0.0, 10.0);
///
/// let c1 = constraint!((x + y) == 10.0);
/// let c2 = constraint!((2.0 * x) <= 5.0);
/// let c3 = constraint!(format!("floor[{}]", 2030), (x - y) >= 0.0);
///
/// builder.add_constraint(constraint!("budget", (2.0 * x) <= 15.0));
/// ```
#[macro_export]
macro_rules! constraint {
    (($lhs:expr) == $rhs:expr) => {
        $crate::constraint!("", ($lhs) == $rhs)
    };
    (($lhs:expr) <= $rhs:expr) => {
        $crate::constraint!("", ($lhs) <= $rhs)
    };
    (($lhs:expr) >= $rhs:expr) => {
        $crate::constraint!("", ($lhs) >= $rhs)
    };

    ($name:expr, ($lhs:expr) == $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $name,
            $lhs,
            $crate::lp_solver::ConstraintSense::Equal,
            $rhs as f64,
        )
    };
    ($name:expr, ($lhs:expr) <= $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $name,
            $lhs,
            $crate::lp_solver::ConstraintSense::LessEqual,
            $rhs as f64,
        )
    };
    ($name:expr, ($lhs:expr) >= $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $name,
            $lhs,
            $crate::lp_solver::ConstraintSense::GreaterEqual,
            $rhs as f64,
        )
    };
}

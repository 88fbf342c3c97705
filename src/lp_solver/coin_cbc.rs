use std::collections::HashMap;
use std::time::Instant;

use crate::lp_solver::output_suppression::GagHandle;
use crate::lp_solver::*;
use ::coin_cbc::{Col, Model, Sense};
use tracing::debug;

/// Round a floating-point number to a specified number of significant digits
/// This is an workaround to mask floating point errors in CBC.
fn round_to_sig_digits(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10_f64.powi(digits as i32 - magnitude - 1);
    (value * scale).round() / scale
}

fn column_of<Brand>(
    var_map: &HashMap<VariableId<Brand>, Col>,
    variable: VariableId<Brand>,
) -> Result<Col> {
    var_map
        .get(&variable)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("Variable {:?} not found in model", variable))
}

/// Solve an LP model using Coin CBC
pub fn solve_coin_cbc<Brand>(
    builder: &LPModelBuilder<Brand>,
    options: &SolverOptions,
) -> Result<LPSolution<Brand>> {
    // CBC writes its banner to stdout even at log level 0
    let _gag_handle = GagHandle::stdout()?;
    let mut model = Model::default();
    model.set_parameter("log", "0");
    if let Some(limit) = options.time_limit {
        model.set_parameter("sec", &format!("{:.3}", limit.as_secs_f64()));
    }

    let mut var_map = HashMap::new();
    for (idx, var_info) in builder.variables.iter().enumerate() {
        let col = model.add_col();
        model.set_col_lower(col, var_info.lower_bound);
        model.set_col_upper(col, var_info.upper_bound);
        let var_id = VariableId {
            id: idx,
            _brand: std::marker::PhantomData,
        };
        var_map.insert(var_id, col);
    }

    for constraint in &builder.constraints {
        let row = model.add_row();
        // set_weight overwrites, so repeated variables have to be merged first
        let expression = constraint.expression.clone().compact();

        for term in &expression.terms {
            model.set_weight(row, column_of(&var_map, term.variable)?, term.coefficient);
        }

        let rhs_adjusted = constraint.rhs - expression.constant;

        match constraint.sense {
            ConstraintSense::LessEqual => model.set_row_upper(row, rhs_adjusted),
            ConstraintSense::Equal => model.set_row_equal(row, rhs_adjusted),
            ConstraintSense::GreaterEqual => model.set_row_lower(row, rhs_adjusted),
        }
    }

    if let Some(obj_info) = &builder.objective {
        let expression = obj_info.expression.clone().compact();
        for term in &expression.terms {
            model.set_obj_coeff(column_of(&var_map, term.variable)?, term.coefficient);
        }

        model.set_obj_sense(match obj_info.sense {
            OptimizationSense::Minimize => Sense::Minimize,
            OptimizationSense::Maximize => Sense::Maximize,
        });
    }

    debug!(
        variables = builder.variables.len(),
        constraints = builder.constraints.len(),
        "handing model to CBC"
    );
    let started = Instant::now();
    let solution = model.solve();
    let raw = solution.raw();

    let status = if raw.is_proven_optimal() {
        OptimizationStatus::Optimal
    } else if raw.is_continuous_unbounded() {
        OptimizationStatus::Unbounded
    } else if raw.is_proven_infeasible() {
        OptimizationStatus::Infeasible
    } else if raw.is_seconds_limit_reached() {
        OptimizationStatus::TimeLimitReached
    } else if raw.is_abandoned() {
        OptimizationStatus::Other("CBC abandoned the search")
    } else {
        OptimizationStatus::Other("CBC stopped without a proven optimum")
    };
    debug!(?status, elapsed_ms = started.elapsed().as_millis() as u64, "CBC finished");

    let mut variable_values = vec![0.0; builder.variables.len()];
    for (var_id, col) in var_map.iter() {
        variable_values[var_id.id] = round_to_sig_digits(solution.col(*col), 8);
    }

    let objective_value = match &builder.objective {
        Some(obj_info) => round_to_sig_digits(
            obj_info
                .expression
                .terms
                .iter()
                .fold(obj_info.expression.constant, |acc, term| {
                    acc + term.coefficient * variable_values[term.variable.id]
                }),
            8,
        ),
        None => 0.0,
    };

    Ok(LPSolution {
        status,
        objective_value,
        variable_values,
        _brand: std::marker::PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::round_to_sig_digits;

    #[test]
    fn test_round_to_sig_digits() {
        assert_eq!(round_to_sig_digits(0.0, 8), 0.0);
        assert_eq!(round_to_sig_digits(1234.5678901, 8), 1234.5679);
        assert_eq!(round_to_sig_digits(-0.000123456789, 3), -0.000123);
        assert!(round_to_sig_digits(f64::INFINITY, 8).is_infinite());
    }
}

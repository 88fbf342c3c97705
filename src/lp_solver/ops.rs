//! Operator overloading for linear programming expressions
//!
//! Variables and expressions support natural arithmetic operators:
//!
//! ```ignore
//! let x = builder.add_variable("x", 0.0, 10.0);
//! let y = builder.add_variable("y", 0.0, 10.0);
//!
//! let expr1 = x + y;             // Addition
//! let expr2 = x - y;             // Subtraction
//! let expr3 = 2.0 * x;           // Scalar multiplication (left)
//! let expr4 = x * 2.0;           // Scalar multiplication (right)
//! let expr5 = x + 2.0 * y + 5.0; // Mixed expressions
//! let expr6 = (x + y) * 3.0;     // Parentheses work
//! let expr7 = -(x + y);          // Negation
//! ```
//!
//! All operations maintain the brand type parameter, ensuring variables from different
//! models cannot be accidentally mixed.

use super::{LinearExpression, LinearTerm, VariableId};

// ============================================================================
// Operators for LinearExpression
// ============================================================================

impl<Brand> std::ops::Add<LinearExpression<Brand>> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(self, other: LinearExpression<Brand>) -> Self::Output {
        let mut terms = self.terms;
        terms.extend(other.terms);
        LinearExpression {
            terms,
            constant: self.constant + other.constant,
        }
    }
}

impl<Brand> std::ops::Add<VariableId<Brand>> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(mut self, other: VariableId<Brand>) -> Self::Output {
        self.add_term(1.0, other);
        self
    }
}

impl<Brand> std::ops::Add<f64> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(self, other: f64) -> Self::Output {
        LinearExpression {
            terms: self.terms,
            constant: self.constant + other,
        }
    }
}

impl<Brand> std::ops::AddAssign<LinearExpression<Brand>> for LinearExpression<Brand> {
    fn add_assign(&mut self, other: LinearExpression<Brand>) {
        self.terms.extend(other.terms);
        self.constant += other.constant;
    }
}

impl<Brand> std::ops::Neg for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl<Brand> std::ops::Sub<LinearExpression<Brand>> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: LinearExpression<Brand>) -> Self::Output {
        self + (-other)
    }
}

impl<Brand> std::ops::Sub<VariableId<Brand>> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(mut self, other: VariableId<Brand>) -> Self::Output {
        self.add_term(-1.0, other);
        self
    }
}

impl<Brand> std::ops::Sub<f64> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: f64) -> Self::Output {
        self + (-other)
    }
}

impl<Brand> std::ops::Mul<f64> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn mul(self, other: f64) -> Self::Output {
        LinearExpression {
            terms: self
                .terms
                .into_iter()
                .map(|term| LinearTerm {
                    coefficient: term.coefficient * other,
                    variable: term.variable,
                })
                .collect(),
            constant: self.constant * other,
        }
    }
}

impl<Brand> std::ops::Mul<LinearExpression<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn mul(self, other: LinearExpression<Brand>) -> Self::Output {
        other * self
    }
}

// ============================================================================
// Operators for VariableId
// ============================================================================

impl<Brand> std::ops::Add<LinearExpression<Brand>> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(self, other: LinearExpression<Brand>) -> Self::Output {
        LinearExpression::from_variable(self) + other
    }
}

impl<Brand> std::ops::Add<VariableId<Brand>> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(self, other: VariableId<Brand>) -> Self::Output {
        LinearExpression::from_variable(self) + other
    }
}

impl<Brand> std::ops::Add<f64> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(self, other: f64) -> Self::Output {
        LinearExpression::from_variable(self) + other
    }
}

impl<Brand> std::ops::Sub<VariableId<Brand>> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: VariableId<Brand>) -> Self::Output {
        LinearExpression::from_variable(self) - other
    }
}

impl<Brand> std::ops::Sub<LinearExpression<Brand>> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: LinearExpression<Brand>) -> Self::Output {
        LinearExpression::from_variable(self) - other
    }
}

impl<Brand> std::ops::Sub<f64> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: f64) -> Self::Output {
        LinearExpression::from_variable(self) - other
    }
}

impl<Brand> std::ops::Mul<f64> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn mul(self, other: f64) -> Self::Output {
        LinearExpression {
            terms: vec![LinearTerm {
                coefficient: other,
                variable: self,
            }],
            constant: 0.0,
        }
    }
}

impl<Brand> std::ops::Mul<VariableId<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn mul(self, other: VariableId<Brand>) -> Self::Output {
        other * self
    }
}

// ============================================================================
// Reverse operators for f64
// ============================================================================

impl<Brand> std::ops::Add<VariableId<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn add(self, other: VariableId<Brand>) -> Self::Output {
        LinearExpression::from_variable(other) + self
    }
}

impl<Brand> std::ops::Sub<VariableId<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: VariableId<Brand>) -> Self::Output {
        other * -1.0 + self
    }
}

#[cfg(test)]
mod tests {
    use crate::lp_model_builder;

    #[test]
    fn test_expression_operations() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable("x", 0.0, 10.0);
        let y = builder.add_variable("y", 0.0, 10.0);

        let expr = 2.0 * x + 3.0 * y + 5.0;
        assert_eq!(expr.constant, 5.0);
        assert_eq!(expr.terms.len(), 2);

        assert_eq!((x + y).terms.len(), 2);
        assert_eq!((x - y).terms.len(), 2);
        assert_eq!((2.0 * x).terms.len(), 1);
        assert_eq!((x * 2.0).terms[0].coefficient, 2.0);
    }

    #[test]
    fn test_subtraction_signs() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable("x", 0.0, 10.0);
        let y = builder.add_variable("y", 0.0, 10.0);

        let expr = 10.0 - x;
        assert_eq!(expr.terms[0].coefficient, -1.0);
        assert_eq!(expr.constant, 10.0);

        let expr = (x + 2.0) - (3.0 * y + 1.0);
        assert_eq!(expr.terms[1].coefficient, -3.0);
        assert_eq!(expr.constant, 1.0);

        let expr = -(x + y);
        assert!(expr.terms.iter().all(|t| t.coefficient == -1.0));
    }

    #[test]
    fn test_add_assign_accumulates() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable("x", 0.0, 10.0);

        let mut acc = x * 1.0;
        acc += 4.0 * x + 2.0;
        assert_eq!(acc.terms.len(), 2);
        assert_eq!(acc.constant, 2.0);
    }

    #[test]
    fn test_variable_id_debug() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable("x", 0.0, 10.0);

        let debug_str = format!("{:?}", x);
        assert!(debug_str.contains("VariableId"));
    }
}

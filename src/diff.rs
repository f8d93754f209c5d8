use tracing::debug;

use crate::expr::{Expression, Number};

impl Expression {
    /// Derivative of this expression with respect to `with_respect_to`.
    ///
    /// The result is not simplified: `d/dx (x + y)` is `1 + 0`, and the
    /// product rule always yields `l*dr + r*dl` in that order.
    pub fn differentiate(&self, with_respect_to: &str) -> Expression {
        debug!(variable = with_respect_to, "differentiating {self}");
        derivative(self, with_respect_to)
    }
}

fn derivative(expr: &Expression, var: &str) -> Expression {
    match expr {
        Expression::Number(_) => Expression::Number(Number::ZERO),
        Expression::Variable(v) if v.name() == var => Expression::Number(Number::ONE),
        Expression::Variable(_) => Expression::Number(Number::ZERO),
        Expression::Plus(lhs, rhs) => derivative(lhs, var).plus(derivative(rhs, var)),
        Expression::Times(lhs, rhs) => {
            let d_lhs = derivative(lhs, var);
            let d_rhs = derivative(rhs, var);
            Expression::clone(lhs)
                .times(d_rhs)
                .plus(Expression::clone(rhs).times(d_lhs))
        }
    }
}

use std::collections::HashMap;

use tracing::trace;

use crate::expr::{Expression, InvalidValueError, Number, Variable};

/// Values substituted for variables during [`Expression::simplify`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    values: HashMap<String, Number>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an environment from `(name, value)` pairs; later pairs win.
    pub fn try_from_iter<I, K>(bindings: I) -> Result<Self, InvalidValueError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let mut environment = Environment::new();
        for (name, value) in bindings {
            environment.define(name, value)?;
        }
        Ok(environment)
    }

    /// Binds `name` to `value`, replacing any earlier binding.
    pub fn define(&mut self, name: impl Into<String>, value: f64) -> Result<(), InvalidValueError> {
        let variable = Variable::new(name)?;
        let value = Number::new(value)?;
        self.values.insert(variable.name().to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).map(|n| n.get())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn lookup(&self, variable: &Variable) -> Option<Number> {
        self.values.get(variable.name()).copied()
    }
}

impl TryFrom<HashMap<String, f64>> for Environment {
    type Error = InvalidValueError;

    fn try_from(values: HashMap<String, f64>) -> Result<Self, Self::Error> {
        Environment::try_from_iter(values)
    }
}

#[derive(Clone, Copy)]
enum Fold {
    Sum,
    Product,
}

impl Expression {
    /// Substitutes the bound variables and folds every `+` or `*` whose two
    /// operands are numbers, in one bottom-up pass. An operation with any
    /// non-numeric operand is rebuilt as is.
    pub fn simplify(&self, environment: &Environment) -> Expression {
        match self {
            Expression::Number(_) => self.clone(),
            Expression::Variable(v) => match environment.lookup(v) {
                Some(n) => Expression::Number(n),
                None => self.clone(),
            },
            Expression::Plus(lhs, rhs) => {
                fold(Fold::Sum, lhs.simplify(environment), rhs.simplify(environment))
            }
            Expression::Times(lhs, rhs) => {
                fold(Fold::Product, lhs.simplify(environment), rhs.simplify(environment))
            }
        }
    }
}

fn fold(op: Fold, lhs: Expression, rhs: Expression) -> Expression {
    if let (Expression::Number(a), Expression::Number(b)) = (&lhs, &rhs) {
        let value = match op {
            Fold::Sum => a.get() + b.get(),
            Fold::Product => a.get() * b.get(),
        };
        // an overflowing fold leaves the operation in place
        if let Ok(folded) = Number::new(value) {
            trace!(lhs = a.get(), rhs = b.get(), value, "folded constant");
            return Expression::Number(folded);
        }
        trace!(lhs = a.get(), rhs = b.get(), "fold overflows, keeping operation");
    }
    match op {
        Fold::Sum => lhs.plus(rhs),
        Fold::Product => lhs.times(rhs),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(input: &str) -> Expression {
        Expression::parse(input).unwrap()
    }

    fn env(bindings: &[(&str, f64)]) -> Environment {
        Environment::try_from_iter(bindings.iter().copied()).unwrap()
    }

    #[test]
    fn leaves() {
        let environment = env(&[("x", 3.0)]);
        assert_eq!(parse("2").simplify(&environment), parse("2"));
        assert_eq!(parse("x").simplify(&environment), parse("3"));
        assert_eq!(parse("y").simplify(&environment), parse("y"));
    }

    #[test]
    fn folds_only_when_both_sides_are_numbers() {
        let environment = env(&[("x", 2.0)]);
        assert_eq!(parse("x + 1").simplify(&environment), parse("3"));
        assert_eq!(parse("x * 4").simplify(&environment), parse("8"));
        assert_eq!(parse("x + y").simplify(&environment), parse("2 + y"));
        assert_eq!(parse("1 + 2 + y").simplify(&environment), parse("3 + y"));
        // no reassociation: (y + 1) + 2 keeps both constants
        assert_eq!(parse("y + 1 + 2").simplify(&environment), parse("y + 1 + 2"));
    }

    #[test]
    fn overflowing_fold_is_left_unfolded() {
        let environment = env(&[("x", 1e308)]);
        let big = Expression::number(1e308).unwrap();

        let square = parse("x*x").simplify(&environment);
        assert_eq!(square, big.clone().times(big.clone()));
        assert_eq!(parse(&square.to_string()), square);

        let zeroed = parse("x*x*0").simplify(&environment);
        assert_eq!(
            zeroed,
            big.clone().times(big.clone()).times(Expression::number(0.0).unwrap())
        );
        assert_eq!(parse(&zeroed.to_string()), zeroed);

        let sum = parse("x + x").simplify(&environment);
        assert_eq!(sum, big.clone().plus(big));
        assert_eq!(parse(&sum.to_string()), sum);
    }

    #[test]
    fn empty_environment_still_folds_constants() {
        assert_eq!(parse("2*3 + x").simplify(&Environment::new()), parse("6 + x"));
    }

    #[test]
    fn polynomial_examples() {
        let e = parse("x*x*x + x*y + z + 1");
        assert_eq!(
            e.simplify(&env(&[("x", 10.0)])).to_string(),
            "(((1000.0000 + 10.0000*y) + z) + 1.0000)"
        );
        assert_eq!(
            e.simplify(&env(&[("x", 10.0), ("y", 2.0)])).to_string(),
            "((1020.0000 + z) + 1.0000)"
        );
        assert_eq!(
            e.simplify(&env(&[("x", 10.0), ("y", 2.0), ("z", 7.0)])).to_string(),
            "1028.0000"
        );
    }

    #[test]
    fn environment_validates_bindings() {
        let mut environment = Environment::new();
        assert_eq!(environment.define("x", -1.0), Err(InvalidValueError::Negative(-1.0)));
        assert_eq!(environment.define("", 1.0), Err(InvalidValueError::EmptyName));
        assert!(matches!(
            environment.define("x1", 1.0),
            Err(InvalidValueError::NotALetter { found: '1', .. })
        ));
        assert!(environment.is_empty());

        environment.define("x", 1.0).unwrap();
        environment.define("x", 2.0).unwrap();
        assert_eq!(environment.get("x"), Some(2.0));
        assert_eq!(environment.len(), 1);
    }

    #[test]
    fn from_hash_map() {
        let values = HashMap::from([("a".to_string(), 1.5)]);
        let environment = Environment::try_from(values).unwrap();
        assert_eq!(environment.get("a"), Some(1.5));
        assert_eq!(environment.get("b"), None);
    }
}

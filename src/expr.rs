use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul};
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

use crate::{Parser, SyntaxError};

/// A leaf constructor was given a value that breaks its invariant.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum InvalidValueError {
    #[error("number must be nonnegative, got {0}")]
    #[diagnostic(code(symexpr::value::negative), help("negative literals are not supported"))]
    Negative(f64),

    #[error("number must be finite, got {0}")]
    #[diagnostic(code(symexpr::value::not_finite))]
    NotFinite(f64),

    #[error("variable name must not be empty")]
    #[diagnostic(code(symexpr::value::empty_name))]
    EmptyName,

    #[error("variable name `{name}` contains '{found}', which is not a letter")]
    #[diagnostic(
        code(symexpr::value::not_a_letter),
        help("variable names are made of the letters a-z and A-Z only")
    )]
    NotALetter { name: String, found: char },
}

/// Only [`Expression::Number`] carries a numeric value.
#[derive(Error, Debug, Diagnostic, Clone, Copy, PartialEq, Eq)]
#[error("a {kind} expression has no numeric value")]
#[diagnostic(
    code(symexpr::value::unsupported),
    help("check `Expression::has_value` before asking for the value")
)]
pub struct UnsupportedOperationError {
    pub kind: &'static str,
}

/// A nonnegative, finite floating-point literal.
///
/// Equality and hashing compare the bit pattern; `-0.0` is stored as `0.0`
/// so both agree with numeric equality.
#[derive(Debug, Clone, Copy)]
pub struct Number(f64);

impl Number {
    pub const ZERO: Number = Number(0.0);
    pub const ONE: Number = Number(1.0);

    pub fn new(value: f64) -> Result<Self, InvalidValueError> {
        if !value.is_finite() {
            return Err(InvalidValueError::NotFinite(value));
        }
        if value < 0.0 {
            return Err(InvalidValueError::Negative(value));
        }
        Ok(Number(value + 0.0))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl TryFrom<f64> for Number {
    type Error = InvalidValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Number::new(value)
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// A case-sensitive, non-empty name made only of ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidValueError> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidValueError::EmptyName);
        }
        if let Some(found) = name.chars().find(|c| !c.is_ascii_alphabetic()) {
            return Err(InvalidValueError::NotALetter { name, found });
        }
        Ok(Variable(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable polynomial expression over `+` and `*`.
///
/// Equality is structural and sensitive to operand order: `a + b` is not
/// equal to `b + a`. The [`Display`] output is the canonical form, which
/// [`Expression::parse`] reads back into an equal tree.
///
/// Every operation recurses once per level of the tree, so trees nested
/// tens of thousands of levels deep can overflow the stack. The parser
/// refuses input nested more than [`crate::parse::MAX_NESTING`] parentheses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Number(Number),
    Variable(Variable),
    Plus(Box<Expression>, Box<Expression>),
    Times(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn parse(input: &str) -> Result<Self, SyntaxError> {
        Parser::new(None, input).parse()
    }

    pub fn number(value: f64) -> Result<Self, InvalidValueError> {
        Number::new(value).map(Expression::Number)
    }

    pub fn variable(name: impl Into<String>) -> Result<Self, InvalidValueError> {
        Variable::new(name).map(Expression::Variable)
    }

    /// `self + rhs`, with `self` as the left operand.
    pub fn plus(self, rhs: Expression) -> Expression {
        Expression::Plus(Box::new(self), Box::new(rhs))
    }

    /// `self * rhs`, with `self` as the left operand.
    pub fn times(self, rhs: Expression) -> Expression {
        Expression::Times(Box::new(self), Box::new(rhs))
    }

    pub fn has_value(&self) -> bool {
        matches!(self, Expression::Number(_))
    }

    pub fn value(&self) -> Result<f64, UnsupportedOperationError> {
        match self {
            Expression::Number(n) => Ok(n.get()),
            _ => Err(UnsupportedOperationError { kind: self.kind() }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Number(_) => "number",
            Expression::Variable(_) => "variable",
            Expression::Plus(..) => "sum",
            Expression::Times(..) => "product",
        }
    }

    pub fn to_canonical_string(&self) -> String {
        self.to_string()
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{n}"),
            Expression::Variable(v) => write!(f, "{v}"),
            Expression::Plus(lhs, rhs) => write!(f, "({lhs} + {rhs})"),
            // `*` folds to the left when parsed, so a product on the right
            // needs its own parentheses.
            Expression::Times(lhs, rhs) => match rhs.as_ref() {
                Expression::Times(..) => write!(f, "{lhs}*({rhs})"),
                _ => write!(f, "{lhs}*{rhs}"),
            },
        }
    }
}

impl FromStr for Expression {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

impl From<Number> for Expression {
    fn from(value: Number) -> Self {
        Expression::Number(value)
    }
}

impl From<Variable> for Expression {
    fn from(value: Variable) -> Self {
        Expression::Variable(value)
    }
}

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Self) -> Self::Output {
        self.plus(rhs)
    }
}

impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Self) -> Self::Output {
        self.times(rhs)
    }
}

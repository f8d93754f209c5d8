//! String-in, string-out entry points over [`Expression`].

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::{
    Environment, SyntaxError,
    expr::{Expression, InvalidValueError, Variable},
};

#[derive(Error, Debug, Diagnostic)]
pub enum CommandError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidExpression(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidValue(#[from] InvalidValueError),

    #[error("malformed binding `{0}`")]
    #[diagnostic(
        code(symexpr::command::binding),
        help("write bindings as name=value, for example x=2.5")
    )]
    MalformedBinding(String),
}

/// Parses `input`, differentiates it by `variable` and prints the result in
/// canonical form.
pub fn differentiate_text(input: &str, variable: &str) -> Result<String, CommandError> {
    let expression = Expression::parse(input)?;
    let variable = Variable::new(variable)?;
    debug!(%variable, "differentiate command");
    Ok(expression.differentiate(variable.name()).to_string())
}

/// Parses `input`, simplifies it under `environment` and prints the result
/// in canonical form.
pub fn simplify_text(input: &str, environment: &Environment) -> Result<String, CommandError> {
    let expression = Expression::parse(input)?;
    debug!(bindings = environment.len(), "simplify command");
    Ok(expression.simplify(environment).to_string())
}

/// Reads one `name=value` binding. The name and value are checked later, by
/// [`Environment::define`].
pub fn parse_binding(text: &str) -> Result<(String, f64), CommandError> {
    let malformed = || CommandError::MalformedBinding(text.to_string());
    let (name, value) = text.split_once('=').ok_or_else(malformed)?;
    let value = value.trim().parse::<f64>().map_err(|_| malformed())?;
    Ok((name.trim().to_string(), value))
}

pub fn parse_environment<'a>(
    bindings: impl IntoIterator<Item = &'a str>,
) -> Result<Environment, CommandError> {
    let bindings = bindings
        .into_iter()
        .map(parse_binding)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Environment::try_from_iter(bindings)?)
}

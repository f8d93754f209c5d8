//! Line-oriented interactive session.
//!
//! A plain line is parsed and becomes the current expression. Lines starting
//! with `!` are commands acting on the current expression:
//!
//! - `!d/d<var>` differentiates it; the derivative becomes current.
//! - `!simplify name=value ...` prints it simplified; it stays current.
//! - `!quit` ends the session.

use std::io::{self, BufRead, Write};

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::{
    Expression,
    commands::{CommandError, parse_environment},
    expr::Variable,
};

#[derive(Error, Debug, Diagnostic)]
pub enum ReplError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Command(#[from] CommandError),

    #[error("no expression entered yet")]
    #[diagnostic(code(symexpr::repl::no_expression), help("type an expression first"))]
    NoExpression,

    #[error("unknown command `{0}`")]
    #[diagnostic(
        code(symexpr::repl::unknown_command),
        help("commands are `!d/d<var>`, `!simplify name=value ...` and `!quit`")
    )]
    UnknownCommand(String),
}

impl From<crate::SyntaxError> for ReplError {
    fn from(e: crate::SyntaxError) -> Self {
        ReplError::Command(e.into())
    }
}

impl From<crate::InvalidValueError> for ReplError {
    fn from(e: crate::InvalidValueError) -> Self {
        ReplError::Command(e.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Show(String),
    Nothing,
    Quit,
}

#[derive(Debug, Default)]
pub struct Session {
    current: Option<Expression>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Expression> {
        self.current.as_ref()
    }

    pub fn handle(&mut self, line: &str) -> Result<Reply, ReplError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Reply::Nothing);
        }
        let Some(command) = line.strip_prefix('!') else {
            let expression = Expression::parse(line)?;
            let shown = expression.to_string();
            self.current = Some(expression);
            return Ok(Reply::Show(shown));
        };

        if command == "quit" {
            return Ok(Reply::Quit);
        }
        if let Some(name) = command.strip_prefix("d/d") {
            let variable = Variable::new(name.trim())?;
            let current = self.current.as_ref().ok_or(ReplError::NoExpression)?;
            let derivative = current.differentiate(variable.name());
            let shown = derivative.to_string();
            self.current = Some(derivative);
            return Ok(Reply::Show(shown));
        }
        if let Some(bindings) = argument(command, "simplify") {
            let environment = parse_environment(bindings.split_whitespace())?;
            let current = self.current.as_ref().ok_or(ReplError::NoExpression)?;
            return Ok(Reply::Show(current.simplify(&environment).to_string()));
        }
        Err(ReplError::UnknownCommand(line.to_string()))
    }
}

/// The text after `word`, if `command` is `word` alone or `word` followed
/// by whitespace.
fn argument<'a>(command: &'a str, word: &str) -> Option<&'a str> {
    let rest = command.strip_prefix(word)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

/// Runs a session until `!quit` or the end of `input`. Errors in a line are
/// reported on `output` and the session continues.
pub fn run(input: impl BufRead, mut output: impl Write) -> io::Result<()> {
    let mut session = Session::new();
    for line in input.lines() {
        let line = line?;
        match session.handle(&line) {
            Ok(Reply::Show(text)) => writeln!(output, "{text}")?,
            Ok(Reply::Nothing) => {}
            Ok(Reply::Quit) => break,
            Err(e) => {
                debug!(error = %e, "rejected line");
                writeln!(output, "error: {e}")?;
            }
        }
        output.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn transcript(input: &str) -> String {
        let mut output = Vec::new();
        run(input.as_bytes(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn differentiate_then_simplify() {
        let out = transcript("x*x + y\n!d/dx\n!simplify x=3\n");
        assert_eq!(out, "(x*x + y)\n((x*1.0000 + x*1.0000) + 0.0000)\n6.0000\n");
    }

    #[test]
    fn errors_do_not_end_the_session() {
        let out = transcript("!d/dx\nx +\n!frobnicate\nx\n!quit\ny\n");
        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "error: no expression entered yet");
        assert!(lines[1].starts_with("error: "));
        assert_eq!(lines[2], "error: unknown command `!frobnicate`");
        assert_eq!(lines[3], "x");
    }

    #[test]
    fn simplify_keeps_current_expression() {
        let mut session = Session::new();
        session.handle("a*b").unwrap();
        assert_eq!(
            session.handle("!simplify a=2 b=4").unwrap(),
            Reply::Show("8.0000".to_string())
        );
        assert_eq!(session.current(), Some(&Expression::parse("a*b").unwrap()));
        assert!(matches!(
            session.handle("!simplify a"),
            Err(ReplError::Command(CommandError::MalformedBinding(_)))
        ));
        assert_eq!(session.handle("   ").unwrap(), Reply::Nothing);
    }

    #[test]
    fn command_word_must_stand_alone() {
        let mut session = Session::new();
        session.handle("x + 1").unwrap();
        assert!(matches!(
            session.handle("!simplifyx=1"),
            Err(ReplError::UnknownCommand(line)) if line == "!simplifyx=1"
        ));
        assert!(matches!(
            session.handle("!simplifying"),
            Err(ReplError::UnknownCommand(_))
        ));
        assert_eq!(session.handle("!simplify").unwrap(), Reply::Show("(x + 1.0000)".to_string()));
        assert_eq!(
            session.handle("!simplify\tx=1").unwrap(),
            Reply::Show("2.0000".to_string())
        );
    }
}

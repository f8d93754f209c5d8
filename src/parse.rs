use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use tracing::trace;

use crate::{
    Lexer, SyntaxError,
    expr::{Expression, Variable},
    lex::{Eof, InvalidLiteral, TokenKind},
};

/// Deepest parenthesis nesting the parser accepts.
pub const MAX_NESTING: usize = 256;

#[derive(Error, Debug, Diagnostic)]
#[error("expression is nested too deeply")]
#[diagnostic(
    code(symexpr::parse::too_deep),
    help("at most 256 levels of parentheses are allowed")
)]
pub struct NestingError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this parenthesis is one level too many")]
    pub(crate) span: SourceSpan,
}

impl NestingError {
    pub(crate) fn src(&self) -> &NamedSource<String> {
        &self.src
    }
}

/// Recursive-descent parser for
///
/// ```text
/// root      := sum
/// sum       := product ('+' product)*
/// product   := primitive ('*' primitive)*
/// primitive := number | variable | '(' sum ')'
/// ```
///
/// Sums and products are folded to the left while they are read, so
/// `a+b+c` becomes `(a+b)+c`.
pub struct Parser<'de> {
    lexer: Lexer<'de>,
    depth: usize,
}

impl<'de> Parser<'de> {
    pub fn new(filename: Option<&'de str>, whole: &'de str) -> Self {
        Parser {
            lexer: Lexer::new(filename, whole),
            depth: 0,
        }
    }

    /// Parses the whole input as a single expression.
    pub fn parse(mut self) -> Result<Expression, SyntaxError> {
        trace!(input = self.lexer.whole(), "parsing expression");
        let expr = self.parse_sum()?;
        match self.lexer.next() {
            None => Ok(expr),
            Some(Ok(token)) => Err(self.lexer.unexpected(
                &token,
                "unexpected input after the end of the expression",
                Some("join the parts with `+` or `*`, or remove this".to_string()),
            )),
            Some(Err(e)) => Err(e),
        }
    }

    fn parse_sum(&mut self) -> Result<Expression, SyntaxError> {
        let mut sum = self.parse_product()?;
        while self.lexer.next_if(TokenKind::Plus)?.is_some() {
            sum = sum.plus(self.parse_product()?);
        }
        Ok(sum)
    }

    fn parse_product(&mut self) -> Result<Expression, SyntaxError> {
        let mut product = self.parse_primitive()?;
        while self.lexer.next_if(TokenKind::Star)?.is_some() {
            product = product.times(self.parse_primitive()?);
        }
        Ok(product)
    }

    fn parse_primitive(&mut self) -> Result<Expression, SyntaxError> {
        let token = match self.lexer.next() {
            Some(token) => token?,
            None => return Err(Eof::build(&self.lexer).into()),
        };

        match token.kind {
            TokenKind::Number(n) => Ok(Expression::Number(n)),
            TokenKind::Ident => match Variable::new(token.literal) {
                Ok(v) => Ok(Expression::Variable(v)),
                Err(cause) => Err(InvalidLiteral {
                    src: self.lexer.source(),
                    span: token.span(),
                    literal: token.literal.to_string(),
                    cause,
                }
                .into()),
            },
            TokenKind::LeftParen => {
                if self.depth == MAX_NESTING {
                    return Err(NestingError {
                        src: self.lexer.source(),
                        span: token.span(),
                    }
                    .into());
                }
                self.depth += 1;
                let inner = self.parse_sum()?;
                self.lexer
                    .expect(TokenKind::RightParen, "expected `)` to close the parenthesis")?;
                self.depth -= 1;
                Ok(inner)
            }
            TokenKind::RightParen | TokenKind::Plus | TokenKind::Star => Err(self.lexer.unexpected(
                &token,
                format!("expected a number, a variable or `(`, found `{}`", token.literal),
                None,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(input: &str) -> Expression {
        Expression::parse(input).unwrap()
    }

    fn var(name: &str) -> Expression {
        Expression::variable(name).unwrap()
    }

    fn num(value: f64) -> Expression {
        Expression::number(value).unwrap()
    }

    #[test]
    fn leaves() {
        assert_eq!(parse("3"), num(3.0));
        assert_eq!(parse("2.4"), num(2.4));
        assert_eq!(parse("  foo "), var("foo"));
    }

    #[test]
    fn sums_fold_left() {
        assert_eq!(parse("a + b + c"), var("a").plus(var("b")).plus(var("c")));
        assert_eq!(parse("3 + 4 + 5"), parse("(3 + 4) + 5"));
        assert_ne!(parse("3 + 4 + 5"), parse("3 + (4 + 5)"));
    }

    #[test]
    fn products_fold_left() {
        assert_eq!(parse("a*b*c"), var("a").times(var("b")).times(var("c")));
    }

    #[test]
    fn star_binds_tighter() {
        assert_eq!(
            parse("3*x + 2.4"),
            num(3.0).times(var("x")).plus(num(2.4))
        );
        assert_eq!(
            parse("3*(x + 2.4)"),
            num(3.0).times(var("x").plus(num(2.4)))
        );
    }

    #[test]
    fn parentheses_are_transparent() {
        let expected = parse("x + y");
        assert_eq!(parse("(x + y)"), expected);
        assert_eq!(parse("(x)+(y)"), expected);
        assert_eq!(parse("((((x))) + y)"), expected);
        assert_eq!(parse("(1+2)+(x+y)"), parse("(((1)+2)+((x)+(y)))"));
    }

    #[test]
    fn not_commutative() {
        assert_ne!(parse("x + y"), parse("y + x"));
        assert_ne!(parse("x * y"), parse("y * x"));
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["", "   ", "()", "1 +", "+ 1", "x y", "1 2", "3x", "a1", "(x", "x)", "1.", ".5", "-1", "x - y", "x / y", "x ^ 2", "x**y"] {
            assert!(Expression::parse(input).is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn trailing_input_is_reported_where_it_starts() {
        let err = Expression::parse("x + y z").unwrap_err();
        assert!(matches!(err, SyntaxError::UnexpectedToken(_)));
        assert_eq!(err.span(), SourceSpan::from(6..7));
        assert_eq!(err.input(), "x + y z");
    }

    #[test]
    fn missing_operand_is_eof() {
        let err = Expression::parse("x *").unwrap_err();
        assert!(matches!(err, SyntaxError::UnexpectedEof(_)));
        assert!(matches!(Expression::parse("").unwrap_err(), SyntaxError::UnexpectedEof(_)));
    }

    #[test]
    fn nesting_limit() {
        let ok = format!("{}x{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse(&ok), var("x"));

        let deep = format!("{}x{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        let err = Expression::parse(&deep).unwrap_err();
        assert!(matches!(err, SyntaxError::TooDeep(_)));
        assert_eq!(err.span(), SourceSpan::from(MAX_NESTING..MAX_NESTING + 1));
    }

    #[test]
    fn filename_is_kept_for_diagnostics() {
        let err = Parser::new(Some("input.txt"), "x +").parse().unwrap_err();
        assert_eq!(err.input(), "x +");
        assert_eq!(err.line(), 1);
    }
}

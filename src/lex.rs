use std::fmt::Display;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::expr::{InvalidValueError, Number};
use crate::parse::NestingError;

/// Any way an input string can fail to match the expression grammar.
#[derive(Error, Debug, Diagnostic)]
pub enum SyntaxError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    UnexpectedCharacter(#[from] SingleTokenError),

    /// A number literal too large to be finite. Numbers are finite
    /// everywhere, so such a literal is refused rather than read as infinity.
    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidLiteral(#[from] InvalidLiteral),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnexpectedToken(#[from] UnexpectedToken),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnexpectedEof(#[from] Eof),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TooDeep(#[from] NestingError),
}

impl SyntaxError {
    /// The text that was being parsed.
    pub fn input(&self) -> &str {
        self.named_source().inner()
    }

    /// Human-readable explanation of what went wrong.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Byte range of the offending part of [`SyntaxError::input`].
    pub fn span(&self) -> SourceSpan {
        match self {
            SyntaxError::UnexpectedCharacter(e) => e.bad_bit,
            SyntaxError::InvalidLiteral(e) => e.span,
            SyntaxError::UnexpectedToken(e) => e.span,
            SyntaxError::UnexpectedEof(e) => e.bad_line,
            SyntaxError::TooDeep(e) => e.span,
        }
    }

    /// 1-based line of the offending part of the input.
    pub fn line(&self) -> usize {
        line_of(self.input(), self.span().offset())
    }

    fn named_source(&self) -> &NamedSource<String> {
        match self {
            SyntaxError::UnexpectedCharacter(e) => &e.src,
            SyntaxError::InvalidLiteral(e) => &e.src,
            SyntaxError::UnexpectedToken(e) => &e.src,
            SyntaxError::UnexpectedEof(e) => &e.src,
            SyntaxError::TooDeep(e) => e.src(),
        }
    }
}

pub(crate) fn line_of(src: &str, offset: usize) -> usize {
    src.get(..offset).unwrap_or(src).matches('\n').count() + 1
}

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected character '{token}'")]
#[diagnostic(
    code(symexpr::lex::unexpected_character),
    help("expressions are built from numbers, letters, `+`, `*` and parentheses")
)]
pub struct SingleTokenError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this character")]
    bad_bit: SourceSpan,

    pub token: char,
}

#[derive(Error, Debug, Diagnostic)]
#[error("invalid literal `{literal}`")]
#[diagnostic(
    code(symexpr::lex::invalid_literal),
    help("number literals must be finite")
)]
pub struct InvalidLiteral {
    #[source_code]
    pub(crate) src: NamedSource<String>,

    #[label("not a valid literal")]
    pub(crate) span: SourceSpan,

    pub literal: String,

    #[source]
    pub(crate) cause: InvalidValueError,
}

#[derive(Error, Debug, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(symexpr::parse::unexpected_token))]
pub struct UnexpectedToken {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    message: String,

    #[help]
    help: Option<String>,
}

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected end of input")]
#[diagnostic(
    code(symexpr::parse::eof),
    help("the expression ended early, possibly an operand or a closing parenthesis is missing")
)]
pub struct Eof {
    #[source_code]
    src: NamedSource<String>,

    #[label("expected more input here")]
    bad_line: SourceSpan,
}

impl Eof {
    pub fn build(lexer: &Lexer<'_>) -> Self {
        Eof {
            src: lexer.source(),
            bad_line: SourceSpan::from(lexer.byte.saturating_sub(1)..lexer.byte),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    pub offset: usize,
}

impl Token<'_> {
    pub fn span(&self) -> SourceSpan {
        SourceSpan::from(self.offset..self.offset + self.literal.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    Plus,
    Star,
    Ident,
    Number(Number),
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit} null"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit} null"),
            TokenKind::Plus => write!(f, "PLUS {lit} null"),
            TokenKind::Star => write!(f, "STAR {lit} null"),
            TokenKind::Ident => write!(f, "IDENTIFIER {lit} null"),
            TokenKind::Number(n) => {
                let n = n.get();
                if n == n.trunc() {
                    write!(f, "NUMBER {lit} {n}.0")
                } else {
                    write!(f, "NUMBER {lit} {n}")
                }
            }
        }
    }
}

pub struct Lexer<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    rest: &'de str,
    pub byte: usize,
    peeked: Option<Result<Token<'de>, SyntaxError>>,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: Option<&'de str>, input: &'de str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
            peeked: None,
        }
    }

    pub fn whole(&self) -> &'de str {
        self.whole
    }

    pub(crate) fn source(&self) -> NamedSource<String> {
        NamedSource::new(self.filename.unwrap_or("<input>"), self.whole.to_string())
    }

    pub fn expect(&mut self, expected: TokenKind, error: &str) -> Result<Token<'de>, SyntaxError> {
        match self.next() {
            Some(Ok(token)) if token.kind == expected => Ok(token),
            Some(Ok(token)) => {
                Err(self.unexpected(&token, error, Some(format!("use `{expected:?}` here instead"))))
            }
            Some(Err(e)) => Err(e),
            None => Err(Eof::build(self).into()),
        }
    }

    /// Consumes the next token only if it is of the `expected` kind. A lexing
    /// error in the next token is returned rather than skipped.
    pub fn next_if(&mut self, expected: TokenKind) -> Result<Option<Token<'de>>, SyntaxError> {
        let take = match self.peek() {
            Some(Ok(token)) => token.kind == expected,
            Some(Err(_)) => true,
            None => false,
        };
        if take { self.next().transpose() } else { Ok(None) }
    }

    pub fn peek(&mut self) -> Option<&Result<Token<'de>, SyntaxError>> {
        if self.peeked.is_some() {
            return self.peeked.as_ref();
        }
        self.peeked = self.next();
        self.peeked.as_ref()
    }

    pub fn unexpected(
        &self,
        token: &Token<'de>,
        message: impl Into<String>,
        help: Option<String>,
    ) -> SyntaxError {
        UnexpectedToken {
            src: self.source(),
            span: token.span(),
            message: message.into(),
            help,
        }
        .into()
    }

    fn invalid_literal(&self, literal: &str, offset: usize, cause: InvalidValueError) -> SyntaxError {
        InvalidLiteral {
            src: self.source(),
            span: SourceSpan::from(offset..offset + literal.len()),
            literal: literal.to_string(),
            cause,
        }
        .into()
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(peeked) = self.peeked.take() {
            return Some(peeked);
        }
        loop {
            let mut chars = self.rest.chars();
            let c = chars.next()?;
            let literal = &self.rest[..c.len_utf8()];
            let offset = self.byte;
            let cur = self.rest;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            enum Start {
                Ident,
                Number,
            }

            let process = |kind: TokenKind| {
                Some(Ok(Token {
                    kind,
                    literal,
                    offset,
                }))
            };

            let started = match c {
                '(' => return process(TokenKind::LeftParen),
                ')' => return process(TokenKind::RightParen),
                '+' => return process(TokenKind::Plus),
                '*' => return process(TokenKind::Star),
                'a'..='z' | 'A'..='Z' => Start::Ident,
                '0'..='9' => Start::Number,
                ' ' | '\r' | '\t' | '\n' => continue, // Skip whitespace
                c => {
                    return Some(Err(SingleTokenError {
                        src: self.source(),
                        bad_bit: SourceSpan::from(offset..self.byte),
                        token: c,
                    }
                    .into()));
                }
            };

            let literal = match started {
                Start::Ident => {
                    let end = cur
                        .find(|c: char| !c.is_ascii_alphabetic())
                        .unwrap_or(cur.len());
                    &cur[..end]
                }
                Start::Number => {
                    let digits = |s: &str| s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
                    let mut end = digits(cur);
                    // a trailing `.` without digits after it is not part of the number
                    if let Some(fraction) = cur[end..].strip_prefix('.') {
                        let fraction_len = digits(fraction);
                        if fraction_len > 0 {
                            end += 1 + fraction_len;
                        }
                    }
                    &cur[..end]
                }
            };

            let extra_bytes = literal.len() - c.len_utf8();
            self.byte += extra_bytes;
            self.rest = &self.rest[extra_bytes..];

            let kind = match started {
                Start::Ident => TokenKind::Ident,
                Start::Number => {
                    // digit strings always parse; overly long ones become infinite
                    let value = literal.parse::<f64>().unwrap_or(f64::INFINITY);
                    match Number::new(value) {
                        Ok(n) => TokenKind::Number(n),
                        Err(e) => return Some(Err(self.invalid_literal(literal, offset, e))),
                    }
                }
            };

            return Some(Ok(Token {
                kind,
                literal,
                offset,
            }));
        }
    }
}

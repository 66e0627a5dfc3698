use crate::algebra::{BinaryOperation, Expression, Parameter};
use std::{iter::Peekable, ops::Range};

/// Parse an [`Expression`] tree from some text.
pub fn parse(s: &str) -> Result<Expression, ParseError> {
    Parser::new(s).parse()
}

/// A simple recursive descent parser (`LL(1)`) for converting a string into an
/// expression tree.
///
/// The grammar:
///
/// ```text
/// expression     := term (("+" | "-") term)*
///
/// term           := unary (("*" | "/") unary)*
///
/// unary          := "-" unary
///                 | power
///
/// power          := factor (("^" | "**") unary)?
///
/// factor         := variable_or_function_call
///                 | "(" expression ")"
///                 | NUMBER
///
/// variable_or_function_call = IDENTIFIER "(" expression ")"
///                           | IDENTIFIER
/// ```
///
/// Addition, subtraction, multiplication and division are left-associative,
/// while exponentiation is right-associative and binds tighter than a leading
/// minus (`-x^2` is `-(x^2)`).
#[derive(Debug, Clone)]
pub(crate) struct Parser<'a> {
    tokens: Peekable<Tokens<'a>>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Parser {
            tokens: Tokens::new(src).peekable(),
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expression, ParseError> {
        let expr = self.expression()?;

        match self.tokens.next() {
            None => Ok(expr),
            Some(Ok(token)) => Err(ParseError::UnexpectedToken {
                found: token.kind,
                span: token.span,
                expected: &[],
            }),
            Some(Err(e)) => Err(e),
        }
    }

    fn peek(&mut self) -> Option<TokenKind> {
        self.tokens
            .peek()
            .and_then(|result| result.as_ref().ok())
            .map(|tok| tok.kind)
    }

    fn advance(&mut self) -> Result<Token<'a>, ParseError> {
        match self.tokens.next() {
            Some(result) => result,
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let left = self.term()?;

        self.left_associative(
            left,
            &[TokenKind::Plus, TokenKind::Minus],
            |p| p.term(),
        )
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        let left = self.unary()?;

        self.left_associative(
            left,
            &[TokenKind::Times, TokenKind::Divide],
            |p| p.unary(),
        )
    }

    fn left_associative<F>(
        &mut self,
        mut left: Expression,
        expected: &[TokenKind],
        mut operand: F,
    ) -> Result<Expression, ParseError>
    where
        F: FnMut(&mut Parser<'a>) -> Result<Expression, ParseError>,
    {
        while let Some(kind) = self.peek() {
            if !expected.contains(&kind) {
                break;
            }

            // skip past the operator
            let _ = self.advance()?;
            // and parse the second bit
            let right = operand(self)?;

            left = Expression::Binary {
                left: Box::new(left),
                right: Box::new(right),
                op: kind.as_binary_op(),
            };
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        if self.peek() == Some(TokenKind::Minus) {
            let _ = self.advance()?;
            let operand = self.unary()?;
            Ok(Expression::Negate(Box::new(operand)))
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> Result<Expression, ParseError> {
        let base = self.factor()?;

        if self.peek() == Some(TokenKind::Caret) {
            let _ = self.advance()?;
            let exponent = self.unary()?;
            Ok(base.pow(exponent))
        } else {
            Ok(base)
        }
    }

    fn factor(&mut self) -> Result<Expression, ParseError> {
        let expected = &[
            TokenKind::Number,
            TokenKind::Identifier,
            TokenKind::OpenParen,
            TokenKind::Minus,
        ];

        match self.peek() {
            Some(TokenKind::Number) => {
                return self.number();
            },
            Some(TokenKind::Identifier) => {
                return self.variable_or_function_call()
            },
            Some(TokenKind::OpenParen) => {
                let _ = self.advance()?;
                let expr = self.expression()?;
                self.close_paren()?;
                return Ok(expr);
            },
            _ => {},
        }

        // we couldn't parse the factor, return a nice error
        match self.tokens.next() {
            Some(Ok(Token { span, kind, .. })) => {
                Err(ParseError::UnexpectedToken {
                    found: kind,
                    expected,
                    span,
                })
            },
            Some(Err(e)) => Err(e),
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn close_paren(&mut self) -> Result<(), ParseError> {
        let Token { kind, span, .. } = self.advance()?;

        if kind == TokenKind::CloseParen {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                found: kind,
                span,
                expected: &[TokenKind::CloseParen],
            })
        }
    }

    fn variable_or_function_call(&mut self) -> Result<Expression, ParseError> {
        let ident = self.advance()?;
        debug_assert_eq!(ident.kind, TokenKind::Identifier);

        if self.peek() == Some(TokenKind::OpenParen) {
            self.function_call(ident)
        } else {
            Ok(Expression::Parameter(Parameter::named(ident.text)))
        }
    }

    fn function_call(
        &mut self,
        identifier: Token<'a>,
    ) -> Result<Expression, ParseError> {
        let open_paren = self.advance()?;
        debug_assert_eq!(open_paren.kind, TokenKind::OpenParen);

        let argument = self.expression()?;
        self.close_paren()?;

        Ok(Expression::call(identifier.text, argument))
    }

    fn number(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance()?;
        debug_assert_eq!(token.kind, TokenKind::Number);

        token
            .text
            .parse()
            .map(Expression::Constant)
            .map_err(|_| ParseError::InvalidNumber { span: token.span })
    }
}

/// Possible errors that may occur while parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid character, {character:?}, at index {index}")]
    InvalidCharacter { character: char, index: usize },
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("found a {found:?} at {span:?} but expected one of {expected:?}")]
    UnexpectedToken {
        found: TokenKind,
        span: Range<usize>,
        expected: &'static [TokenKind],
    },
    #[error("malformed number at {span:?}")]
    InvalidNumber { span: Range<usize> },
}

#[derive(Debug, Clone, PartialEq)]
struct Tokens<'a> {
    src: &'a str,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self { Tokens { src, cursor: 0 } }

    fn rest(&self) -> &'a str { &self.src[self.cursor..] }

    fn peek(&self) -> Option<char> { self.rest().chars().next() }

    fn peek_nth(&self, n: usize) -> Option<char> { self.rest().chars().nth(n) }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Some(c)
    }

    fn chomp(
        &mut self,
        kind: TokenKind,
        length: usize,
    ) -> Option<Result<Token<'a>, ParseError>> {
        let start = self.cursor;
        for _ in 0..length {
            self.advance()?;
        }
        let end = self.cursor;

        Some(Ok(Token::from_text(self.src, start..end, kind)))
    }

    fn take_while<P>(&mut self, mut predicate: P) -> Range<usize>
    where
        P: FnMut(char) -> bool,
    {
        let start = self.cursor;

        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }

            self.advance();
        }

        start..self.cursor
    }

    fn chomp_integer(&mut self) { self.take_while(|c| c.is_ascii_digit()); }

    fn chomp_number(&mut self) -> Token<'a> {
        let start = self.cursor;
        self.chomp_integer();

        if self.peek() == Some('.') {
            // skip past the decimal
            self.advance();
            self.chomp_integer();
        }

        // an exponent only counts if it is followed by digits, otherwise the
        // "e" is the start of an identifier (e.g. "2e" is "2*e" in spirit and
        // will be rejected by the parser)
        if let Some('e') | Some('E') = self.peek() {
            let exponent_digits = match self.peek_nth(1) {
                Some('+') | Some('-') => self.peek_nth(2),
                other => other,
            };

            if exponent_digits.map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
                if let Some('+') | Some('-') = self.peek() {
                    self.advance();
                }
                self.chomp_integer();
            }
        }

        let end = self.cursor;

        Token::from_text(self.src, start..end, TokenKind::Number)
    }

    fn chomp_identifier(&mut self) -> Token<'a> {
        let mut seen_first_character = false;

        let span = self.take_while(|c| {
            if seen_first_character {
                c.is_alphanumeric() || c == '_'
            } else {
                seen_first_character = true;
                c.is_alphabetic() || c == '_'
            }
        });

        Token::from_text(self.src, span, TokenKind::Identifier)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.peek()? {
                space if space.is_whitespace() => {
                    self.advance();
                    continue;
                },
                '(' => self.chomp(TokenKind::OpenParen, 1),
                ')' => self.chomp(TokenKind::CloseParen, 1),
                '+' => self.chomp(TokenKind::Plus, 1),
                '-' => self.chomp(TokenKind::Minus, 1),
                '*' if self.peek_nth(1) == Some('*') => {
                    self.chomp(TokenKind::Caret, 2)
                },
                '*' => self.chomp(TokenKind::Times, 1),
                '/' => self.chomp(TokenKind::Divide, 1),
                '^' => self.chomp(TokenKind::Caret, 1),
                '_' | 'a'..='z' | 'A'..='Z' => {
                    Some(Ok(self.chomp_identifier()))
                },
                '0'..='9' | '.' => Some(Ok(self.chomp_number())),
                other => {
                    let index = self.cursor;
                    self.advance();
                    Some(Err(ParseError::InvalidCharacter {
                        character: other,
                        index,
                    }))
                },
            };
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    span: Range<usize>,
    kind: TokenKind,
}

impl<'a> Token<'a> {
    fn from_text(
        original_source: &'a str,
        span: Range<usize>,
        kind: TokenKind,
    ) -> Self {
        Token {
            text: &original_source[span.clone()],
            span,
            kind,
        }
    }
}

/// The kinds of token that can appear in an [`Expression`]'s text form.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    Number,
    OpenParen,
    CloseParen,
    Plus,
    Minus,
    Times,
    Divide,
    /// Exponentiation, written as either `^` or `**`.
    Caret,
}

impl TokenKind {
    fn as_binary_op(self) -> BinaryOperation {
        match self {
            TokenKind::Plus => BinaryOperation::Plus,
            TokenKind::Minus => BinaryOperation::Minus,
            TokenKind::Times => BinaryOperation::Times,
            TokenKind::Divide => BinaryOperation::Divide,
            TokenKind::Caret => BinaryOperation::Power,
            other => unreachable!("{:?} is not a binary op", other),
        }
    }
}


#[cfg(test)]
mod parser_tests {
    use super::*;

    macro_rules! parser_test {
        ($name:ident, $src:expr) => {
            parser_test!($name, $src, $src);
        };
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let got = Parser::new($src).parse().unwrap();

                let round_tripped = got.to_string();
                assert_eq!(round_tripped, $should_be);
            }
        };
    }

    parser_test!(simple_integer, "1");
    parser_test!(one_plus_one, "1 + 1");
    parser_test!(one_plus_one_plus_negative_one, "1 + -1");
    parser_test!(one_plus_one_times_three, "1 + 1*3");
    parser_test!(one_plus_one_all_times_three, "(1 + 1)*3");
    parser_test!(negative_one, "-1");
    parser_test!(negative_one_plus_one, "-1 + 1");
    parser_test!(negative_one_plus_x, "-1 + x");
    parser_test!(number_in_parens, "(1)", "1");
    parser_test!(bimdas, "1*2 + 3*4/(5 - 2)*1 - 3");
    parser_test!(subtraction_is_left_associative, "1 - 2 - 3");
    parser_test!(explicit_right_grouping, "1 - (2 - 3)");
    parser_test!(division_is_left_associative, "8/4/2");
    parser_test!(power, "x^2");
    parser_test!(python_style_power, "x**2", "x^2");
    parser_test!(power_is_right_associative, "2^3^2");
    parser_test!(negated_power, "-x^2");
    parser_test!(negative_exponent, "x^-1", "x^(-1)");
    parser_test!(scientific_notation, "1.5e3*x", "1500*x");
    parser_test!(function_call, "sin(1)", "sin(1)");
    parser_test!(function_call_with_expression, "sin(1/0)");
    parser_test!(
        function_calls_function_calls_function_with_variable,
        "foo(bar(baz(pi)))"
    );
    parser_test!(
        oblique_shock_relation,
        "2*(1/tan(beta))*(M^2*sin(beta)^2 - 1)/(M^2*(gamma + cos(2*beta)) + 2)"
    );

    #[test]
    fn subtraction_tree_shape() {
        let got = parse("a - b - c").unwrap();

        let should_be = (Expression::named("a") - Expression::named("b"))
            - Expression::named("c");
        assert_eq!(got, should_be);
    }

    #[test]
    fn leftover_tokens_are_an_error() {
        let got = parse("1 + 2)").unwrap_err();

        assert_eq!(
            got,
            ParseError::UnexpectedToken {
                found: TokenKind::CloseParen,
                span: 5..6,
                expected: &[],
            }
        );
    }

    #[test]
    fn unclosed_paren() {
        let got = parse("(1 + 2").unwrap_err();

        assert_eq!(got, ParseError::UnexpectedEndOfInput);
    }

    #[test]
    fn missing_operand() {
        let got = parse("1 + *").unwrap_err();

        match got {
            ParseError::UnexpectedToken { found, span, .. } => {
                assert_eq!(found, TokenKind::Times);
                assert_eq!(span, 4..5);
            },
            other => panic!("Unexpected error: {:?}", other),
        }
    }
}

//! Recursive descent expression parser.
//!
//! Parses attribute expression text into an [`Expr`]. Uses the logos-based
//! tokenizer from [`crate::expr::tokenizer`]. Precedence, tightest last:
//! assignment, `||`, `&&`, equality, comparison, additive, multiplicative,
//! unary, member access.

use super::ast::{BinaryOp, Expr, Path, UnaryOp};
use super::tokenizer::{tokenize, Token};
use super::EvalError;
use super::value::Value;

/// Parse an expression string into an [`Expr`].
pub fn parse_expression(input: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(input).map_err(|offset| EvalError::Syntax {
        position: offset,
        message: "unrecognized character".to_string(),
    })?;
    let mut parser = Parser { tokens, cursor: 0 };
    let expr = parser.parse_assignment()?;
    if let Some((token, text)) = parser.peek() {
        return Err(EvalError::Syntax {
            position: parser.cursor,
            message: format!("unexpected trailing token {token:?} '{text}'"),
        });
    }
    Ok(expr)
}

/// Recursive descent parser state.
struct Parser {
    tokens: Vec<(Token, String)>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(Token, String)> {
        self.tokens.get(self.cursor)
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|(t, _)| *t)
    }

    fn advance(&mut self) -> Option<(Token, String)> {
        let tok = self.tokens.get(self.cursor).cloned();
        if tok.is_some() {
            self.cursor += 1;
        }
        tok
    }

    fn eat(&mut self, expected: Token) -> bool {
        if self.peek_token() == Some(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(Token, String), EvalError> {
        match self.advance() {
            Some(tok) if tok.0 == expected => Ok(tok),
            Some((token, text)) => Err(EvalError::Syntax {
                position: self.cursor - 1,
                message: format!("expected {expected:?}, got {token:?} '{text}'"),
            }),
            None => Err(EvalError::Syntax {
                position: self.cursor,
                message: format!("expected {expected:?}, got end of expression"),
            }),
        }
    }

    /// assignment := or ( '=' assignment )?   (right-associative)
    fn parse_assignment(&mut self) -> Result<Expr, EvalError> {
        let lhs = self.parse_or()?;
        if self.eat(Token::Assign) {
            let target = expr_to_path(&lhs).ok_or_else(|| EvalError::Syntax {
                position: self.cursor,
                message: "left side of '=' must be an identifier or property path".to_string(),
            })?;
            let value = self.parse_assignment()?;
            return Ok(Expr::Assign(target, Box::new(value)));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_and()?;
        while self.eat(Token::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(Token::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                _ => break,
            };
            self.cursor += 1;
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.cursor += 1;
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.cursor += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.cursor += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat(Token::Bang) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        if self.eat(Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.parse_postfix()
    }

    /// postfix := primary ( '.' Ident )*
    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        while self.eat(Token::Dot) {
            let (_, name) = self.expect(Token::Ident)?;
            expr = Expr::Member(Box::new(expr), name);
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some((Token::True, _)) => Ok(Expr::Literal(Value::Bool(true))),
            Some((Token::False, _)) => Ok(Expr::Literal(Value::Bool(false))),
            Some((Token::Null, _)) => Ok(Expr::Literal(Value::Null)),
            Some((Token::Number, text)) => {
                let n: f64 = text.parse().map_err(|_| EvalError::Syntax {
                    position: self.cursor - 1,
                    message: format!("invalid number literal '{text}'"),
                })?;
                Ok(Expr::Literal(Value::Number(n)))
            }
            Some((Token::StringDouble | Token::StringSingle, text)) => {
                // Strip the surrounding quotes; the tokenizer guarantees them.
                let inner = &text[1..text.len() - 1];
                Ok(Expr::Literal(Value::Str(inner.to_string())))
            }
            Some((Token::Ident, name)) => Ok(Expr::Ident(name)),
            Some((Token::ParenOpen, _)) => {
                let expr = self.parse_assignment()?;
                self.expect(Token::ParenClose)?;
                Ok(expr)
            }
            Some((Token::BraceOpen, _)) => self.parse_object(),
            Some((token, text)) => Err(EvalError::Syntax {
                position: self.cursor - 1,
                message: format!("unexpected {token:?} '{text}'"),
            }),
            None => Err(EvalError::Syntax {
                position: self.cursor,
                message: "unexpected end of expression".to_string(),
            }),
        }
    }

    /// object := '{' ( key ':' expr ),* ','? '}'  with string or ident keys.
    fn parse_object(&mut self) -> Result<Expr, EvalError> {
        let mut entries = Vec::new();
        loop {
            if self.eat(Token::BraceClose) {
                return Ok(Expr::Object(entries));
            }
            let key = match self.advance() {
                Some((Token::Ident, name)) => name,
                Some((Token::StringDouble | Token::StringSingle, text)) => {
                    text[1..text.len() - 1].to_string()
                }
                Some((token, text)) => {
                    return Err(EvalError::Syntax {
                        position: self.cursor - 1,
                        message: format!("expected object key, got {token:?} '{text}'"),
                    })
                }
                None => {
                    return Err(EvalError::Syntax {
                        position: self.cursor,
                        message: "unterminated object literal".to_string(),
                    })
                }
            };
            self.expect(Token::Colon)?;
            let value = self.parse_assignment()?;
            entries.push((key, value));
            if !self.eat(Token::Comma) {
                self.expect(Token::BraceClose)?;
                return Ok(Expr::Object(entries));
            }
        }
    }
}

/// Convert an expression to an assignment path if it is a plain identifier
/// or a chain of member accesses rooted at one.
fn expr_to_path(expr: &Expr) -> Option<Path> {
    match expr {
        Expr::Ident(name) => Some(Path {
            root: name.clone(),
            segments: Vec::new(),
        }),
        Expr::Member(base, name) => {
            let mut path = expr_to_path(base)?;
            path.segments.push(name.clone());
            Some(path)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Expr {
        parse_expression(input).expect("expression should parse")
    }

    fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    // ── Literals ─────────────────────────────────────────────────────

    #[test]
    fn parse_literals() {
        assert_eq!(parse("true"), Expr::Literal(Value::Bool(true)));
        assert_eq!(parse("false"), Expr::Literal(Value::Bool(false)));
        assert_eq!(parse("null"), Expr::Literal(Value::Null));
        assert_eq!(parse("42"), Expr::Literal(Value::Number(42.0)));
        assert_eq!(parse("3.5"), Expr::Literal(Value::Number(3.5)));
    }

    #[test]
    fn parse_strings() {
        assert_eq!(parse("'hi'"), Expr::Literal(Value::Str("hi".into())));
        assert_eq!(parse("\"hi\""), Expr::Literal(Value::Str("hi".into())));
    }

    #[test]
    fn parse_ident() {
        assert_eq!(parse("message"), ident("message"));
    }

    // ── Operators and precedence ─────────────────────────────────────

    #[test]
    fn parse_member_chain() {
        assert_eq!(
            parse("user.profile.name"),
            Expr::Member(
                Box::new(Expr::Member(Box::new(ident("user")), "profile".into())),
                "name".into()
            )
        );
    }

    #[test]
    fn mul_binds_tighter_than_add() {
        assert_eq!(
            parse("1 + 2 * 3"),
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Literal(Value::Number(1.0))),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Literal(Value::Number(2.0))),
                    Box::new(Expr::Literal(Value::Number(3.0))),
                )),
            )
        );
    }

    #[test]
    fn comparison_binds_tighter_than_and() {
        assert_eq!(
            parse("a < b && c"),
            Expr::Binary(
                BinaryOp::And,
                Box::new(Expr::Binary(
                    BinaryOp::Lt,
                    Box::new(ident("a")),
                    Box::new(ident("b")),
                )),
                Box::new(ident("c")),
            )
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            parse("a || b && c"),
            Expr::Binary(
                BinaryOp::Or,
                Box::new(ident("a")),
                Box::new(Expr::Binary(
                    BinaryOp::And,
                    Box::new(ident("b")),
                    Box::new(ident("c")),
                )),
            )
        );
    }

    #[test]
    fn parens_override_precedence() {
        assert_eq!(
            parse("(1 + 2) * 3"),
            Expr::Binary(
                BinaryOp::Mul,
                Box::new(Expr::Binary(
                    BinaryOp::Add,
                    Box::new(Expr::Literal(Value::Number(1.0))),
                    Box::new(Expr::Literal(Value::Number(2.0))),
                )),
                Box::new(Expr::Literal(Value::Number(3.0))),
            )
        );
    }

    #[test]
    fn unary_not_and_neg() {
        assert_eq!(
            parse("!visible"),
            Expr::Unary(UnaryOp::Not, Box::new(ident("visible")))
        );
        assert_eq!(
            parse("-x"),
            Expr::Unary(UnaryOp::Neg, Box::new(ident("x")))
        );
    }

    // ── Assignment ───────────────────────────────────────────────────

    #[test]
    fn parse_simple_assignment() {
        assert_eq!(
            parse("message = 'Updated'"),
            Expr::Assign(
                Path {
                    root: "message".into(),
                    segments: Vec::new()
                },
                Box::new(Expr::Literal(Value::Str("Updated".into()))),
            )
        );
    }

    #[test]
    fn parse_path_assignment() {
        assert_eq!(
            parse("user.name = 'x'"),
            Expr::Assign(
                Path {
                    root: "user".into(),
                    segments: vec!["name".into()]
                },
                Box::new(Expr::Literal(Value::Str("x".into()))),
            )
        );
    }

    #[test]
    fn assignment_value_may_reference_target() {
        // `count = count + 1` — the canonical counter handler.
        let expr = parse("count = count + 1");
        assert!(matches!(expr, Expr::Assign(..)));
        assert_eq!(expr.reads().into_iter().collect::<Vec<_>>(), vec!["count"]);
    }

    #[test]
    fn assignment_to_literal_is_error() {
        assert!(parse_expression("1 = 2").is_err());
    }

    // ── Object literals ──────────────────────────────────────────────

    #[test]
    fn parse_object_literal() {
        assert_eq!(
            parse("{ message: 'Hello', count: 0 }"),
            Expr::Object(vec![
                ("message".into(), Expr::Literal(Value::Str("Hello".into()))),
                ("count".into(), Expr::Literal(Value::Number(0.0))),
            ])
        );
    }

    #[test]
    fn parse_empty_object() {
        assert_eq!(parse("{}"), Expr::Object(Vec::new()));
    }

    #[test]
    fn parse_object_string_keys_and_trailing_comma() {
        assert_eq!(
            parse("{ 'a': 1, }"),
            Expr::Object(vec![("a".into(), Expr::Literal(Value::Number(1.0)))])
        );
    }

    // ── Errors ───────────────────────────────────────────────────────

    #[test]
    fn empty_input_is_error() {
        assert!(parse_expression("").is_err());
    }

    #[test]
    fn trailing_tokens_are_error() {
        assert!(parse_expression("a b").is_err());
    }

    #[test]
    fn unclosed_paren_is_error() {
        assert!(parse_expression("(a + b").is_err());
    }

    #[test]
    fn unterminated_object_is_error() {
        assert!(parse_expression("{ a: 1").is_err());
    }

    #[test]
    fn unrecognized_character_is_error() {
        let err = parse_expression("a @ b").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { .. }));
    }
}

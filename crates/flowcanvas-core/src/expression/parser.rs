//! Recursive-descent parser, one method per precedence level.

use super::lexer::{Spanned, Token, tokenize};
use super::{BinaryOp, Expr, ExpressionError, UnaryOp, Value};

/// Nesting limit for parentheses and unary chains.
const MAX_DEPTH: usize = 64;
/// Limit on binary and member nodes. Bounds the depth of left-deep chains such as
/// `1+1+...+1`, which the parser builds iteratively but evaluation walks recursively.
const MAX_CHAIN: usize = 512;
/// Longest accepted source, in bytes.
pub(crate) const MAX_SOURCE_LEN: usize = 4096;

pub(crate) fn parse(src: &str) -> Result<Expr, ExpressionError> {
    if src.len() > MAX_SOURCE_LEN {
        return Err(ExpressionError::TooLong {
            len: src.len(),
            max: MAX_SOURCE_LEN,
        });
    }
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
        depth: 0,
        chained: 0,
    };
    let expr = parser.expression()?;
    parser.expect(Token::Eof)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    chained: usize,
}

type Level = fn(&mut Parser) -> Result<Expr, ExpressionError>;

impl Parser {
    fn peek(&self) -> &Spanned {
        // tokenize always ends with Eof and the parser never advances past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned {
        let current = self.peek().clone();
        if current.token != Token::Eof {
            self.pos += 1;
        }
        current
    }

    fn eat(&mut self, token: &Token) -> bool {
        if &self.peek().token == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ExpressionError> {
        if self.eat(&token) {
            return Ok(());
        }
        let found = self.peek();
        Err(ExpressionError::UnexpectedToken {
            found: found.token.to_string(),
            expected: token.to_string(),
            offset: found.offset,
        })
    }

    /// Count one more binary or member node.
    fn chain(&mut self, offset: usize) -> Result<(), ExpressionError> {
        self.chained += 1;
        if self.chained > MAX_CHAIN {
            return Err(ExpressionError::TooDeep { offset });
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, ExpressionError> {
        self.or()
    }

    fn binary_level(
        &mut self,
        next: Level,
        ops: &[(Token, BinaryOp)],
    ) -> Result<Expr, ExpressionError> {
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                let offset = self.peek().offset;
                if self.eat(token) {
                    self.chain(offset)?;
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn or(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(Self::and, &[(Token::OrOr, BinaryOp::Or)])
    }

    fn and(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(Self::equality, &[(Token::AndAnd, BinaryOp::And)])
    }

    fn equality(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            Self::comparison,
            &[
                (Token::EqEqEq, BinaryOp::StrictEq),
                (Token::NotEqEq, BinaryOp::StrictNe),
                (Token::EqEq, BinaryOp::Eq),
                (Token::NotEq, BinaryOp::Ne),
            ],
        )
    }

    fn comparison(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            Self::additive,
            &[
                (Token::Le, BinaryOp::Le),
                (Token::Ge, BinaryOp::Ge),
                (Token::Lt, BinaryOp::Lt),
                (Token::Gt, BinaryOp::Gt),
            ],
        )
    }

    fn additive(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            Self::term,
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
        )
    }

    fn term(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            Self::unary,
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
        )
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep {
                offset: self.peek().offset,
            });
        }
        let result = if self.eat(&Token::Bang) {
            self.unary()
                .map(|operand| Expr::Unary(UnaryOp::Not, Box::new(operand)))
        } else if self.eat(&Token::Minus) {
            self.unary()
                .map(|operand| Expr::Unary(UnaryOp::Neg, Box::new(operand)))
        } else {
            self.postfix()
        };
        self.depth -= 1;
        result
    }

    fn postfix(&mut self) -> Result<Expr, ExpressionError> {
        let mut expr = self.primary()?;
        loop {
            let offset = self.peek().offset;
            if matches!(self.peek().token, Token::Dot | Token::LBracket) {
                self.chain(offset)?;
            }
            if self.eat(&Token::Dot) {
                let next = self.advance();
                let name = match next.token {
                    Token::Ident(name) => name,
                    Token::True => "true".to_string(),
                    Token::False => "false".to_string(),
                    Token::Null => "null".to_string(),
                    other => {
                        return Err(ExpressionError::UnexpectedToken {
                            found: other.to_string(),
                            expected: "property name".to_string(),
                            offset: next.offset,
                        });
                    }
                };
                expr = Expr::Member(Box::new(expr), Box::new(Expr::Literal(Value::Str(name))));
            } else if self.eat(&Token::LBracket) {
                let key = self.expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Member(Box::new(expr), Box::new(key));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let next = self.advance();
        match next.token {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(ExpressionError::UnexpectedToken {
                found: other.to_string(),
                expected: "expression".to_string(),
                offset: next.offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Number(n)))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Binary(
                BinaryOp::Add,
                lit(1.0),
                Box::new(Expr::Binary(BinaryOp::Mul, lit(2.0), lit(3.0)))
            )
        );
    }

    #[test]
    fn binary_operators_are_left_associative() {
        assert_eq!(
            parse("8 - 4 - 2").unwrap(),
            Expr::Binary(
                BinaryOp::Sub,
                Box::new(Expr::Binary(BinaryOp::Sub, lit(8.0), lit(4.0))),
                lit(2.0)
            )
        );
    }

    #[test]
    fn member_chains_desugar_to_literal_keys() {
        assert_eq!(
            parse("default.items[0]").unwrap(),
            Expr::Member(
                Box::new(Expr::Member(
                    Box::new(Expr::Ident("default".into())),
                    Box::new(Expr::Literal(Value::Str("items".into())))
                )),
                lit(0.0)
            )
        );
    }

    #[test]
    fn rejects_trailing_tokens_and_empty_input() {
        assert!(matches!(
            parse("1 2"),
            Err(ExpressionError::UnexpectedToken { offset: 2, .. })
        ));
        assert!(matches!(
            parse(""),
            Err(ExpressionError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse("(1 + 2"),
            Err(ExpressionError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn rejects_runaway_nesting() {
        let src = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(matches!(parse(&src), Err(ExpressionError::TooDeep { .. })));
    }

    #[test]
    fn rejects_long_operator_and_member_chains() {
        let sum = format!("{}1", "1+".repeat(1000));
        assert!(matches!(parse(&sum), Err(ExpressionError::TooDeep { .. })));

        let path = format!("a{}", ".b".repeat(1000));
        assert!(matches!(parse(&path), Err(ExpressionError::TooDeep { .. })));

        let indexed = format!("a{}", "[0]".repeat(1000));
        assert!(matches!(parse(&indexed), Err(ExpressionError::TooDeep { .. })));
    }

    #[test]
    fn moderate_chains_still_parse() {
        let sum = format!("{}1", "1+".repeat(300));
        assert!(parse(&sum).is_ok());
    }

    #[test]
    fn rejects_oversized_source() {
        let src = format!("{}1", "1+".repeat(10_000));
        assert_eq!(
            parse(&src),
            Err(ExpressionError::TooLong {
                len: src.len(),
                max: MAX_SOURCE_LEN
            })
        );
    }
}

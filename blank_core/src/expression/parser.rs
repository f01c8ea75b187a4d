//! Recursive-descent parser producing [`Expr`] trees.
//!
//! Precedence, lowest first: `+ -`, `* /`, unary `- +`, `^` (right-associative).

use super::lexer::{Token, TokenKind};
use super::{BinaryOp, EvalError, Expr, UnaryOp};

/// Deepest nesting of groups, calls, signs and exponents accepted
pub(crate) const MAX_DEPTH: usize = 64;

/// Longest formula accepted, in tokens. Bounds the height of left-leaning
/// `a + b + c ...` chains, which are built iteratively but evaluated recursively.
pub(crate) const MAX_TOKENS: usize = 1024;

pub(crate) struct Parser {
    tokens: Vec<Token>,
    index: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            index: 0,
            depth: 0,
        }
    }

    pub fn parse_formula(&mut self) -> Result<Expr, EvalError> {
        if self.check(&TokenKind::Eof) {
            return Err(EvalError::syntax("empty formula", self.peek().position));
        }
        if self.tokens.len() > MAX_TOKENS {
            return Err(EvalError::syntax("formula too long", self.tokens[MAX_TOKENS].position));
        }
        let expr = self.parse_add_sub()?;
        if !self.check(&TokenKind::Eof) {
            return Err(EvalError::syntax("unexpected trailing input", self.peek().position));
        }
        Ok(expr)
    }

    fn parse_add_sub(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_mul_div()?;
        loop {
            let op = if self.match_kind(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.match_kind(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                return Ok(expr);
            };
            let rhs = self.parse_mul_div()?;
            expr = Expr::binary(expr, op, rhs);
        }
    }

    fn parse_mul_div(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = if self.match_kind(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.match_kind(&TokenKind::Slash) {
                BinaryOp::Div
            } else {
                return Ok(expr);
            };
            let rhs = self.parse_unary()?;
            expr = Expr::binary(expr, op, rhs);
        }
    }

    /// Every recursive path (groups, call arguments, signs, exponents) passes
    /// through here, so this is where nesting depth is bounded.
    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::syntax("expression nested too deeply", self.peek().position));
        }
        let expr = self.parse_signed();
        self.depth -= 1;
        expr
    }

    fn parse_signed(&mut self) -> Result<Expr, EvalError> {
        if self.match_kind(&TokenKind::Minus) {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }
        if self.match_kind(&TokenKind::Plus) {
            return self.parse_unary();
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, EvalError> {
        let base = self.parse_primary()?;
        if self.match_kind(&TokenKind::Caret) {
            let exponent = self.parse_unary()?;
            return Ok(Expr::binary(base, BinaryOp::Pow, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if !self.match_kind(&TokenKind::LParen) {
                    return Ok(Expr::Variable(name));
                }
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_add_sub()?);
                        if !self.match_kind(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen, "expected ')' after call arguments")?;
                Ok(Expr::Call { name, args })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_add_sub()?;
                self.expect(&TokenKind::RParen, "expected ')' to close group")?;
                Ok(expr)
            }
            _ => Err(EvalError::syntax("expected expression", token.position)),
        }
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    fn check(&self, expected: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(expected)
    }

    fn match_kind(&mut self, expected: &TokenKind) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &TokenKind, message: &str) -> Result<(), EvalError> {
        if self.match_kind(expected) {
            Ok(())
        } else {
            Err(EvalError::syntax(message, self.peek().position))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                Expr::Number(1.0),
                BinaryOp::Add,
                Expr::binary(Expr::Number(2.0), BinaryOp::Mul, Expr::Number(3.0)),
            )
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse("2 ^ 3 ^ 2").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                Expr::Number(2.0),
                BinaryOp::Pow,
                Expr::binary(Expr::Number(3.0), BinaryOp::Pow, Expr::Number(2.0)),
            )
        );
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = parse("-2^2").unwrap();
        assert!(matches!(expr, Expr::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_calls() {
        let expr = parse("switch(dtID, 0, d())").unwrap();
        match expr {
            Expr::Call { name, args } => {
                assert_eq!(name, "switch");
                assert_eq!(args.len(), 3);
                assert_eq!(args[2], Expr::Call { name: "d".into(), args: vec![] });
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let nested = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(parse(&nested), Err(EvalError::Syntax { .. })));

        let signs = format!("{}1", "-".repeat(10_000));
        assert!(matches!(parse(&signs), Err(EvalError::Syntax { .. })));

        let exponents = vec!["2"; 5_000].join("^");
        assert!(matches!(parse(&exponents), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_depth_limit_applies_below_token_limit() {
        let nested = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        match parse(&nested) {
            Err(EvalError::Syntax { message, .. }) => assert!(message.contains("nested")),
            other => panic!("expected nesting error, got {other:?}"),
        }

        let signs = format!("{}1", "-".repeat(500));
        assert!(matches!(parse(&signs), Err(EvalError::Syntax { .. })));

        let exponents = vec!["2"; 300].join("^");
        assert!(matches!(parse(&exponents), Err(EvalError::Syntax { .. })));

        let calls = format!("{}1{}", "max(".repeat(100), ")".repeat(100));
        assert!(matches!(parse(&calls), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_nesting_within_limit_parses() {
        let depth = MAX_DEPTH - 2;
        let nested = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&nested).unwrap(), Expr::Number(1.0));
    }

    #[test]
    fn test_long_chain_is_a_syntax_error() {
        let chain = vec!["1"; 50_000].join(" + ");
        assert!(matches!(parse(&chain), Err(EvalError::Syntax { .. })));

        let short = vec!["1"; 100].join(" + ");
        assert!(parse(&short).is_ok());
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["", "1 +", "(1 + 2", "max(1,", "1 2", ")", "L +* W"] {
            assert!(
                matches!(parse(bad), Err(EvalError::Syntax { .. })),
                "'{bad}' should not parse"
            );
        }
    }
}

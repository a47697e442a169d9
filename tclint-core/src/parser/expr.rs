//! `expr` expression sub-grammar (spec §4B "Expression sub-parser").
//!
//! A precedence-climbing (Pratt) parser over [`BinaryOp::binding_power`],
//! grounded on the general recursive-descent-over-a-cursor shape of
//! `yash-arith`'s arithmetic expression evaluator, adapted to Tcl's operator
//! table (`eq`/`ne`/`in`/`ni` word operators, `**` as right-associative
//! power, `name(args)` function calls) instead of POSIX arithmetic
//! expansion.

use crate::parser::core::Parser;
use crate::parser::error::{ParseError, SyntaxErrorKind};
use crate::parser::word::is_name_char;
use crate::syntax::{BareWord, BinaryOp, Expr, Spanned, UnaryOp, Word};

/// Binding power unary `-`/`+`/`!`/`~` parse their operand at: tighter than
/// every binary operator except `**` (`-2**2` is `-(2**2)` in Tcl).
const UNARY_BP: u8 = 23;

impl Parser {
    /// Parses a complete `expr` expression from the current position to end
    /// of input.
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.skip_expr_ws();
        let expr = self.parse_expr_bp(0)?;
        self.skip_expr_ws();
        if !self.lexer.at_end() {
            return Err(ParseError::new(
                SyntaxErrorKind::InvalidExprSyntax {
                    detail: "trailing characters after expression".to_string(),
                },
                self.lexer.span_point(self.lexer.position()),
            ));
        }
        Ok(expr)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        self.skip_expr_ws();
        let mut left = self.parse_expr_prefix()?;
        loop {
            self.skip_expr_ws();
            if self.lexer.peek_char() == Some('?') {
                if min_bp > 0 {
                    break;
                }
                self.lexer.bump();
                let if_true = self.parse_expr_bp(0)?;
                self.skip_expr_ws();
                match self.lexer.peek_char() {
                    Some(':') => {
                        self.lexer.bump();
                    }
                    _ => {
                        return Err(ParseError::new(
                            SyntaxErrorKind::InvalidExprSyntax {
                                detail: "expected ':' in ?: expression".to_string(),
                            },
                            self.lexer.span_point(self.lexer.position()),
                        ));
                    }
                }
                let if_false = self.parse_expr_bp(0)?;
                let span = left.span().merge(if_false.span());
                left = Expr::Ternary {
                    cond: Box::new(left),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                    span,
                };
                continue;
            }

            let Some(op) = self.peek_binary_op() else {
                break;
            };
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }
            self.lexer.bump_bytes(op.as_str().len());
            self.skip_expr_ws();
            let right = self.parse_expr_bp(r_bp)?;
            let span = left.span().merge(right.span());
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn parse_expr_prefix(&mut self) -> Result<Expr, ParseError> {
        self.skip_expr_ws();
        let start = self.lexer.position();
        let unary = match self.lexer.peek_char() {
            Some('-') => Some(UnaryOp::Neg),
            Some('+') => Some(UnaryOp::Plus),
            Some('!') => Some(UnaryOp::Not),
            Some('~') => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = unary {
            self.lexer.bump();
            let operand = self.parse_expr_bp(UNARY_BP)?;
            return Ok(Expr::UnaryOp {
                op,
                operand: Box::new(operand),
                span: self.lexer.span_from(start),
            });
        }
        if self.lexer.peek_char() == Some('(') {
            self.lexer.bump();
            self.enter_nested()?;
            let inner = self.parse_expr_bp(0);
            self.leave_nested();
            let inner = inner?;
            self.skip_expr_ws();
            match self.lexer.peek_char() {
                Some(')') => {
                    self.lexer.bump();
                }
                _ => {
                    return Err(ParseError::new(
                        SyntaxErrorKind::UnterminatedExprParen,
                        self.lexer.span_point(start),
                    ));
                }
            }
            return Ok(Expr::Paren {
                inner: Box::new(inner),
                span: self.lexer.span_from(start),
            });
        }
        self.parse_expr_operand()
    }

    fn parse_expr_operand(&mut self) -> Result<Expr, ParseError> {
        let start = self.lexer.position();
        match self.lexer.peek_char() {
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            Some('$') | Some('"') | Some('{') | Some('[') => {
                let word = self.parse_word()?;
                Ok(Expr::Leaf(word))
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(c) = self.lexer.peek_char() {
                    if is_name_char(c) && c != ':' {
                        name.push(c);
                        self.lexer.bump();
                    } else {
                        break;
                    }
                }
                if self.lexer.peek_char() == Some('(') {
                    self.lexer.bump();
                    self.enter_nested()?;
                    let args = self.parse_call_args();
                    self.leave_nested();
                    let args = args?;
                    match self.lexer.peek_char() {
                        Some(')') => {
                            self.lexer.bump();
                        }
                        _ => {
                            return Err(ParseError::new(
                                SyntaxErrorKind::UnterminatedExprParen,
                                self.lexer.span_point(start),
                            ));
                        }
                    }
                    Ok(Expr::Function {
                        name,
                        args,
                        span: self.lexer.span_from(start),
                    })
                } else {
                    Ok(Expr::Leaf(Word::Bare(BareWord {
                        text: name,
                        span: self.lexer.span_from(start),
                    })))
                }
            }
            _ => Err(ParseError::new(
                SyntaxErrorKind::EmptyExprOperand,
                self.lexer.span_point(start),
            )),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        self.skip_expr_ws();
        if self.lexer.peek_char() == Some(')') {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr_bp(0)?);
            self.skip_expr_ws();
            match self.lexer.peek_char() {
                Some(',') => {
                    self.lexer.bump();
                    self.skip_expr_ws();
                }
                _ => break,
            }
        }
        Ok(args)
    }

    fn parse_number(&mut self) -> Result<Expr, ParseError> {
        let start = self.lexer.position();
        let mut text = String::new();
        if self.lexer.starts_with("0x") || self.lexer.starts_with("0X") {
            text.push(self.lexer.peek_char().unwrap());
            self.lexer.bump();
            text.push(self.lexer.peek_char().unwrap());
            self.lexer.bump();
            while let Some(c) = self.lexer.peek_char() {
                if c.is_ascii_hexdigit() {
                    text.push(c);
                    self.lexer.bump();
                } else {
                    break;
                }
            }
        } else {
            while let Some(c) = self.lexer.peek_char() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.lexer.bump();
                } else {
                    break;
                }
            }
            if self.lexer.peek_char() == Some('.') {
                text.push('.');
                self.lexer.bump();
                while let Some(c) = self.lexer.peek_char() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.lexer.bump();
                    } else {
                        break;
                    }
                }
            }
            if matches!(self.lexer.peek_char(), Some('e') | Some('E')) {
                text.push(self.lexer.peek_char().unwrap());
                self.lexer.bump();
                if matches!(self.lexer.peek_char(), Some('+') | Some('-')) {
                    text.push(self.lexer.peek_char().unwrap());
                    self.lexer.bump();
                }
                while let Some(c) = self.lexer.peek_char() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.lexer.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        Ok(Expr::Leaf(Word::Bare(BareWord {
            text,
            span: self.lexer.span_from(start),
        })))
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let l = &self.lexer;
        if l.starts_with("||") {
            return Some(BinaryOp::Or);
        }
        if l.starts_with("&&") {
            return Some(BinaryOp::And);
        }
        if l.starts_with("==") {
            return Some(BinaryOp::Eq);
        }
        if l.starts_with("!=") {
            return Some(BinaryOp::Ne);
        }
        if l.starts_with("<=") {
            return Some(BinaryOp::Le);
        }
        if l.starts_with(">=") {
            return Some(BinaryOp::Ge);
        }
        if l.starts_with("<<") {
            return Some(BinaryOp::Shl);
        }
        if l.starts_with(">>") {
            return Some(BinaryOp::Shr);
        }
        if l.starts_with("**") {
            return Some(BinaryOp::Pow);
        }
        if self.starts_with_word_op("eq") {
            return Some(BinaryOp::StrEq);
        }
        if self.starts_with_word_op("ne") {
            return Some(BinaryOp::StrNe);
        }
        if self.starts_with_word_op("in") {
            return Some(BinaryOp::In);
        }
        if self.starts_with_word_op("ni") {
            return Some(BinaryOp::NotIn);
        }
        match l.peek_char() {
            Some('|') => Some(BinaryOp::BitOr),
            Some('^') => Some(BinaryOp::BitXor),
            Some('&') => Some(BinaryOp::BitAnd),
            Some('<') => Some(BinaryOp::Lt),
            Some('>') => Some(BinaryOp::Gt),
            Some('+') => Some(BinaryOp::Add),
            Some('-') => Some(BinaryOp::Sub),
            Some('*') => Some(BinaryOp::Mul),
            Some('/') => Some(BinaryOp::Div),
            Some('%') => Some(BinaryOp::Mod),
            _ => None,
        }
    }

    /// Whether the cursor starts with word-operator `kw`, followed by a
    /// non-identifier character (so `iname` doesn't match the `in` operator).
    fn starts_with_word_op(&self, kw: &str) -> bool {
        self.lexer.starts_with(kw) && !self.lexer.peek_at(kw.len()).is_some_and(is_name_char)
    }

    fn skip_expr_ws(&mut self) {
        let _ = self.lexer.skip_blanks();
        while matches!(self.lexer.peek_char(), Some('\n')) {
            self.lexer.bump();
            let _ = self.lexer.skip_blanks();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::core::ParserConfig;
    use crate::source::{Code, Origin};

    fn parse(src: &str) -> Expr {
        let mut parser = Parser::new(Code::new(src, Origin::Unknown), ParserConfig::default());
        parser.parse_expr().unwrap()
    }

    #[test]
    fn precedence_mul_binds_tighter_than_add() {
        let expr = parse("1 + 2 * 3");
        match expr {
            Expr::BinaryOp { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::BinaryOp { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected shape: {other}"),
        }
    }

    #[test]
    fn pow_is_right_associative() {
        let expr = parse("2 ** 3 ** 2");
        match expr {
            Expr::BinaryOp { op: BinaryOp::Pow, left, right, .. } => {
                assert!(matches!(*left, Expr::Leaf(_)));
                assert!(matches!(*right, Expr::BinaryOp { op: BinaryOp::Pow, .. }));
            }
            other => panic!("unexpected shape: {other}"),
        }
    }

    #[test]
    fn unary_minus_binds_tighter_than_mul() {
        let expr = parse("-2 * 3");
        assert!(matches!(expr, Expr::BinaryOp { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn parens_override_precedence() {
        let expr = parse("(1 + 2) * 3");
        match expr {
            Expr::BinaryOp { op: BinaryOp::Mul, left, .. } => {
                assert!(matches!(*left, Expr::Paren { .. }));
            }
            other => panic!("unexpected shape: {other}"),
        }
    }

    #[test]
    fn ternary_parses() {
        let expr = parse("$x > 0 ? 1 : -1");
        assert!(matches!(expr, Expr::Ternary { .. }));
    }

    #[test]
    fn function_call_parses_args() {
        let expr = parse("max(1, 2, 3)");
        match expr {
            Expr::Function { name, args, .. } => {
                assert_eq!(name, "max");
                assert_eq!(args.len(), 3);
            }
            other => panic!("unexpected shape: {other}"),
        }
    }

    #[test]
    fn string_eq_operator() {
        let expr = parse(r#"$x eq "hi""#);
        assert!(matches!(expr, Expr::BinaryOp { op: BinaryOp::StrEq, .. }));
    }

    #[test]
    fn in_operator_not_confused_with_identifier_prefix() {
        // `index` must not be parsed as `in` followed by garbage.
        let expr = parse("index");
        assert!(matches!(expr, Expr::Leaf(Word::Bare(_))));
    }
}

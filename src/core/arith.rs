/// Literal expression evaluation: arithmetic, comparison and boolean logic
/// over numbers, booleans and strings, once every name has been substituted.
use std::fmt;

use crate::core::error::EvalError;

/// A runtime value produced by an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
        }
    }

    fn as_number(&self, op: &str) -> Result<f64, EvalError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(EvalError::TypeError(format!(
                "operator '{}' expects numbers, got {}",
                op,
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    True,
    False,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    BangEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AmpAmp,
    PipePipe,
    Question,
    Colon,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    // `==` and `===` are the same operator here; likewise `!=` and `!==`.
    let eat_eq = |i: &mut usize, max: usize| {
        let mut n = 0;
        while *i < len && chars[*i] == '=' && n < max {
            *i += 1;
            n += 1;
        }
        n
    };

    while i < len {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent, as produced by f64 formatting of very large values.
                if i < len && (chars[i] == 'e' || chars[i] == 'E') {
                    i += 1;
                    if i < len && (chars[i] == '+' || chars[i] == '-') {
                        i += 1;
                    }
                    while i < len && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| EvalError::Syntax(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(n));
            }
            '"' => {
                let start = i + 1;
                let mut end = start;
                while end < len && chars[end] != '"' {
                    end += 1;
                }
                if end >= len {
                    return Err(EvalError::Syntax("unterminated string literal".to_string()));
                }
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "true" => tokens.push(Token::True),
                    "false" => tokens.push(Token::False),
                    _ => {
                        return Err(EvalError::Syntax(format!(
                            "unexpected identifier '{}' (names must be quoted)",
                            word
                        )))
                    }
                }
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Question);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '!' => {
                i += 1;
                if eat_eq(&mut i, 2) > 0 {
                    tokens.push(Token::BangEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '=' => {
                if eat_eq(&mut i, 3) < 2 {
                    return Err(EvalError::Syntax(
                        "assignment is not allowed in expressions; use '=='".to_string(),
                    ));
                }
                tokens.push(Token::EqEq);
            }
            '<' | '>' => {
                i += 1;
                let with_eq = i < len && chars[i] == '=';
                if with_eq {
                    i += 1;
                }
                tokens.push(match (c, with_eq) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::LtEq,
                    ('>', false) => Token::Gt,
                    _ => Token::GtEq,
                });
            }
            '&' | '|' => {
                if i + 1 < len && chars[i + 1] == c {
                    tokens.push(if c == '&' { Token::AmpAmp } else { Token::PipePipe });
                    i += 2;
                } else {
                    return Err(EvalError::Syntax(format!("unexpected '{}'", c)));
                }
            }
            other => return Err(EvalError::Syntax(format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

// Binding powers. Higher binds tighter; right = left + 1 for left-assoc.
const BP_CONDITIONAL: u8 = 2;
const BP_OR: u8 = 4;
const BP_AND: u8 = 6;
const BP_EQUALITY: u8 = 8;
const BP_COMPARISON: u8 = 10;
const BP_ADDITIVE: u8 = 12;
const BP_MULTIPLICATIVE: u8 = 14;
const BP_UNARY: u8 = 16;

fn infix(token: &Token) -> Option<(u8, u8, Option<BinaryOp>)> {
    let entry = match token {
        Token::Question => (BP_CONDITIONAL, BP_CONDITIONAL, None),
        Token::PipePipe => (BP_OR, BP_OR + 1, Some(BinaryOp::Or)),
        Token::AmpAmp => (BP_AND, BP_AND + 1, Some(BinaryOp::And)),
        Token::EqEq => (BP_EQUALITY, BP_EQUALITY + 1, Some(BinaryOp::Eq)),
        Token::BangEq => (BP_EQUALITY, BP_EQUALITY + 1, Some(BinaryOp::Ne)),
        Token::Lt => (BP_COMPARISON, BP_COMPARISON + 1, Some(BinaryOp::Lt)),
        Token::LtEq => (BP_COMPARISON, BP_COMPARISON + 1, Some(BinaryOp::Le)),
        Token::Gt => (BP_COMPARISON, BP_COMPARISON + 1, Some(BinaryOp::Gt)),
        Token::GtEq => (BP_COMPARISON, BP_COMPARISON + 1, Some(BinaryOp::Ge)),
        Token::Plus => (BP_ADDITIVE, BP_ADDITIVE + 1, Some(BinaryOp::Add)),
        Token::Minus => (BP_ADDITIVE, BP_ADDITIVE + 1, Some(BinaryOp::Sub)),
        Token::Star => (BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1, Some(BinaryOp::Mul)),
        Token::Slash => (BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1, Some(BinaryOp::Div)),
        Token::Percent => (BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1, Some(BinaryOp::Rem)),
        _ => return None,
    };
    Some(entry)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, wanted: Token) -> Result<(), EvalError> {
        match self.advance() {
            Some(t) if t == wanted => Ok(()),
            Some(t) => Err(EvalError::Syntax(format!("expected {:?}, found {:?}", wanted, t))),
            None => Err(EvalError::Syntax(format!("expected {:?}, found end of input", wanted))),
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, EvalError> {
        let mut left = self.parse_prefix()?;

        while let Some(token) = self.peek() {
            let Some((l_bp, r_bp, op)) = infix(token) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();

            left = match op {
                Some(op) => {
                    let right = self.parse_expr(r_bp)?;
                    Expr::Binary(op, Box::new(left), Box::new(right))
                }
                None => {
                    let then = self.parse_expr(0)?;
                    self.expect(Token::Colon)?;
                    let otherwise = self.parse_expr(r_bp)?;
                    Expr::Conditional(Box::new(left), Box::new(then), Box::new(otherwise))
                }
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, EvalError> {
        let token = self
            .advance()
            .ok_or_else(|| EvalError::Syntax("unexpected end of expression".to_string()))?;

        match token {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Bang => Ok(Expr::Not(Box::new(self.parse_expr(BP_UNARY)?))),
            Token::Minus => Ok(Expr::Neg(Box::new(self.parse_expr(BP_UNARY)?))),
            Token::Plus => self.parse_expr(BP_UNARY),
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(EvalError::Syntax(format!("unexpected token {:?}", other))),
        }
    }
}

fn eval(expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner)?.is_truthy())),
        Expr::Neg(inner) => Ok(Value::Number(-eval(inner)?.as_number("-")?)),
        Expr::Conditional(cond, then, otherwise) => {
            if eval(cond)?.is_truthy() {
                eval(then)
            } else {
                eval(otherwise)
            }
        }
        Expr::Binary(BinaryOp::And, l, r) => {
            let left = eval(l)?;
            if !left.is_truthy() {
                return Ok(left);
            }
            eval(r)
        }
        Expr::Binary(BinaryOp::Or, l, r) => {
            let left = eval(l)?;
            if left.is_truthy() {
                return Ok(left);
            }
            eval(r)
        }
        Expr::Binary(op, l, r) => binary(*op, eval(l)?, eval(r)?),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    use BinaryOp::*;
    let value = match op {
        Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::Str(format!("{}{}", left, right)),
            _ => Value::Number(left.as_number("+")? + right.as_number("+")?),
        },
        Sub => Value::Number(left.as_number("-")? - right.as_number("-")?),
        Mul => Value::Number(left.as_number("*")? * right.as_number("*")?),
        Div | Rem => {
            let symbol = if op == Div { "/" } else { "%" };
            let a = left.as_number(symbol)?;
            let b = right.as_number(symbol)?;
            if b == 0.0 {
                return Err(EvalError::TypeError("division by zero".to_string()));
            }
            Value::Number(if op == Div { a / b } else { a % b })
        }
        Eq => Value::Bool(left == right),
        Ne => Value::Bool(left != right),
        Lt | Le | Gt | Ge => {
            let ordering = match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(EvalError::TypeError(format!(
                        "cannot compare {} with {}",
                        left.type_name(),
                        right.type_name()
                    )))
                }
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Value::Bool(match op {
                Lt => ordering.is_lt(),
                Le => ordering.is_le(),
                Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
        And | Or => {
            return Err(EvalError::Syntax(
                "logical operators are evaluated lazily".to_string(),
            ))
        }
    };
    Ok(value)
}

/// Evaluate a fully literal expression string (no name references left).
pub fn evaluate_literal(input: &str) -> Result<Value, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Syntax("empty expression".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr(0)?;
    if let Some(extra) = parser.peek() {
        return Err(EvalError::Syntax(format!("unexpected trailing {:?}", extra)));
    }
    eval(&expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(input: &str) -> f64 {
        match evaluate_literal(input).unwrap() {
            Value::Number(n) => n,
            other => panic!("expected number, got {:?}", other),
        }
    }

    fn boolean(input: &str) -> bool {
        match evaluate_literal(input).unwrap() {
            Value::Bool(b) => b,
            other => panic!("expected bool, got {:?}", other),
        }
    }

    #[test]
    fn precedence() {
        assert_eq!(num("1 + 2 * 3"), 7.0);
        assert_eq!(num("(1 + 2) * 3"), 9.0);
        assert_eq!(num("10 - 4 - 3"), 3.0);
        assert_eq!(num("7 % 4"), 3.0);
        assert_eq!(num("-2 * -3"), 6.0);
    }

    #[test]
    fn comparisons_and_logic() {
        assert!(boolean("15 > 10"));
        assert!(!boolean("5 > 10"));
        assert!(boolean("3 >= 3 && 2 <= 1 || true"));
        assert!(boolean("!false"));
        assert!(boolean("1 === 1"));
        assert!(boolean("1 !== 2"));
        assert!(boolean("true == true"));
        assert!(!boolean("1 == true"));
    }

    #[test]
    fn strings() {
        assert_eq!(
            evaluate_literal("\"gold: \" + 5").unwrap(),
            Value::Str("gold: 5".to_string())
        );
        assert!(boolean("\"a\" < \"b\""));
    }

    #[test]
    fn conditional() {
        assert_eq!(num("1 > 2 ? 10 : 20"), 20.0);
        assert_eq!(num("true ? 1 : false ? 2 : 3"), 1.0);
    }

    #[test]
    fn short_circuit_skips_errors() {
        assert!(!boolean("false && (1 / 0 > 0)"));
    }

    #[test]
    fn errors() {
        assert!(matches!(evaluate_literal("1 +"), Err(EvalError::Syntax(_))));
        assert!(matches!(evaluate_literal("gold > 1"), Err(EvalError::Syntax(_))));
        assert!(matches!(evaluate_literal("a = 1"), Err(EvalError::Syntax(_))));
        assert!(matches!(evaluate_literal(""), Err(EvalError::Syntax(_))));
        assert!(matches!(evaluate_literal("1 / 0"), Err(EvalError::TypeError(_))));
        assert!(matches!(evaluate_literal("true - 1"), Err(EvalError::TypeError(_))));
        assert!(matches!(evaluate_literal("1 < true"), Err(EvalError::TypeError(_))));
        assert!(matches!(evaluate_literal("(1"), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn display_drops_integral_fraction() {
        assert_eq!(Value::Number(15.0).to_string(), "15");
        assert_eq!(Value::Number(-2.5).to_string(), "-2.5");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }
}

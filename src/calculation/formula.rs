//! Salary composition formulas.
//!
//! A formula is a restricted arithmetic expression over the five salary
//! components, e.g. `基本工资 + 绩效工资 + 加班工资 - 社保 - 个税`. The
//! vocabulary is fixed: decimal literals, `+ - * /`, parentheses and the
//! component keywords listed by [`SalaryComponent::spellings`].
//!
//! Tokens do not need to be separated by whitespace. A word that is not an
//! exact keyword spelling (for example `基本工资X`) makes the formula invalid.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::SalaryComponent;

/// Resolved component values a formula is evaluated against.
pub type ComponentValues = BTreeMap<SalaryComponent, Decimal>;

/// An arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
        };
        write!(f, "{}", symbol)
    }
}

/// A typed formula token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A decimal literal.
    Number(Decimal),
    /// An arithmetic operator.
    Operator(Operator),
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// A component keyword, with the spelling used in the formula.
    Keyword(SalaryComponent, &'static str),
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '(' | ')')
}

fn is_boundary(rest: &str) -> bool {
    rest.chars()
        .next()
        .is_none_or(|c| c.is_whitespace() || is_operator_char(c))
}

/// Splits a formula into typed tokens.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{tokenize, Operator, Token};
/// use payroll_engine::models::SalaryComponent;
///
/// let tokens = tokenize("基本工资*1.1").unwrap();
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[0], Token::Keyword(SalaryComponent::BaseSalary, "基本工资"));
/// assert_eq!(tokens[1], Token::Operator(Operator::Mul));
/// ```
pub fn tokenize(expression: &str) -> EngineResult<Vec<Token>> {
    let malformed = |message: String| EngineError::MalformedFormula {
        formula: expression.to_string(),
        message,
    };

    // Longest spellings first so "base salary" wins over any shorter prefix.
    let mut spellings: Vec<(SalaryComponent, &'static str)> = SalaryComponent::ALL
        .into_iter()
        .flat_map(|c| c.spellings().iter().map(move |s| (c, *s)))
        .collect();
    spellings.sort_by_key(|(_, s)| std::cmp::Reverse(s.len()));

    let mut tokens = Vec::new();
    let mut rest = expression;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        }

        let token = match c {
            '+' => Some(Token::Operator(Operator::Add)),
            '-' => Some(Token::Operator(Operator::Sub)),
            '*' => Some(Token::Operator(Operator::Mul)),
            '/' => Some(Token::Operator(Operator::Div)),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = token {
            tokens.push(token);
            rest = &rest[1..];
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let end = rest
                .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
                .unwrap_or(rest.len());
            let literal = &rest[..end];
            let value = Decimal::from_str(literal)
                .map_err(|_| malformed(format!("invalid number '{}'", literal)))?;
            tokens.push(Token::Number(value));
            rest = &rest[end..];
            continue;
        }

        let keyword = spellings
            .iter()
            .find(|(_, spelling)| rest.starts_with(spelling) && is_boundary(&rest[spelling.len()..]));
        if let Some((component, spelling)) = keyword {
            tokens.push(Token::Keyword(*component, *spelling));
            rest = &rest[spelling.len()..];
            continue;
        }

        let end = rest
            .find(|ch: char| ch.is_whitespace() || is_operator_char(ch))
            .unwrap_or(rest.len());
        return Err(malformed(format!("unknown token '{}'", &rest[..end])));
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Number(Decimal),
    Component(SalaryComponent, &'static str),
    Negate(Box<Expr>),
    Binary(Box<Expr>, Operator, Box<Expr>),
}

/// Deepest nesting of parentheses and unary signs a formula may use.
pub const MAX_FORMULA_NESTING: usize = 64;

/// Most tokens a formula may contain.
pub const MAX_FORMULA_TOKENS: usize = 512;

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    depth: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> EngineError {
        EngineError::MalformedFormula {
            formula: self.source.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> EngineResult<T>) -> EngineResult<T> {
        if self.depth >= MAX_FORMULA_NESTING {
            return Err(self.error("formula nests too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expression(&mut self) -> EngineResult<Expr> {
        let mut left = self.term()?;
        while let Some(Token::Operator(op @ (Operator::Add | Operator::Sub))) = self.peek() {
            self.position += 1;
            let right = self.term()?;
            left = Expr::Binary(Box::new(left), *op, Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> EngineResult<Expr> {
        let mut left = self.factor()?;
        while let Some(Token::Operator(op @ (Operator::Mul | Operator::Div))) = self.peek() {
            self.position += 1;
            let right = self.factor()?;
            left = Expr::Binary(Box::new(left), *op, Box::new(right));
        }
        Ok(left)
    }

    fn factor(&mut self) -> EngineResult<Expr> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(*value)),
            Some(Token::Keyword(component, spelling)) => Ok(Expr::Component(*component, *spelling)),
            Some(Token::Operator(Operator::Sub)) => {
                let operand = self.nested(Self::factor)?;
                Ok(Expr::Negate(Box::new(operand)))
            }
            Some(Token::Operator(Operator::Add)) => self.nested(Self::factor),
            Some(Token::LeftParen) => self.nested(|parser| {
                let inner = parser.expression()?;
                match parser.next() {
                    Some(Token::RightParen) => Ok(inner),
                    _ => Err(parser.error("unbalanced '('")),
                }
            }),
            Some(Token::Operator(op)) => Err(self.error(format!("unexpected operator '{}'", op))),
            Some(Token::RightParen) => Err(self.error("unexpected ')'")),
            None => Err(self.error("unexpected end of formula")),
        }
    }
}

/// A parsed, validated salary formula.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{ComponentValues, Formula};
/// use payroll_engine::models::SalaryComponent;
/// use rust_decimal::Decimal;
///
/// let formula = Formula::parse("(base_salary + performance_pay) * 0.5").unwrap();
/// let mut values = ComponentValues::new();
/// values.insert(SalaryComponent::BaseSalary, Decimal::from(6000));
/// values.insert(SalaryComponent::PerformancePay, Decimal::from(2000));
/// assert_eq!(formula.evaluate(&values).unwrap(), Decimal::from(4000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Tokenizes and parses a formula.
    ///
    /// Formulas longer than [`MAX_FORMULA_TOKENS`] tokens or nested deeper
    /// than [`MAX_FORMULA_NESTING`] levels are malformed.
    pub fn parse(expression: &str) -> EngineResult<Self> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser {
            tokens: &tokens,
            position: 0,
            depth: 0,
            source: expression,
        };
        if tokens.len() > MAX_FORMULA_TOKENS {
            return Err(parser.error(format!(
                "formula has {} tokens, at most {} are allowed",
                tokens.len(),
                MAX_FORMULA_TOKENS
            )));
        }
        let expr = parser.expression()?;
        if let Some(token) = parser.peek() {
            return Err(parser.error(format!("unexpected trailing token {:?}", token)));
        }
        Ok(Self {
            source: expression.to_string(),
            expr,
        })
    }

    /// The formula text as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The components the formula refers to.
    pub fn components(&self) -> BTreeSet<SalaryComponent> {
        let mut found = BTreeSet::new();
        collect_components(&self.expr, &mut found);
        found
    }

    /// Evaluates the formula with standard precedence in decimal arithmetic.
    pub fn evaluate(&self, values: &ComponentValues) -> EngineResult<Decimal> {
        eval(&self.expr, values)
    }
}

fn collect_components(expr: &Expr, found: &mut BTreeSet<SalaryComponent>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Component(component, _) => {
            found.insert(*component);
        }
        Expr::Negate(inner) => collect_components(inner, found),
        Expr::Binary(left, _, right) => {
            collect_components(left, found);
            collect_components(right, found);
        }
    }
}

fn eval(expr: &Expr, values: &ComponentValues) -> EngineResult<Decimal> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Component(component, spelling) => {
            values
                .get(component)
                .copied()
                .ok_or_else(|| EngineError::UnresolvedKeyword {
                    keyword: spelling.to_string(),
                })
        }
        Expr::Negate(inner) => Ok(-eval(inner, values)?),
        Expr::Binary(left, op, right) => {
            let left = eval(left, values)?;
            let right = eval(right, values)?;
            let result = match op {
                Operator::Add => left.checked_add(right),
                Operator::Sub => left.checked_sub(right),
                Operator::Mul => left.checked_mul(right),
                Operator::Div => {
                    if right.is_zero() {
                        return Err(EngineError::invalid_input("formula divides by zero"));
                    }
                    left.checked_div(right)
                }
            };
            result.ok_or_else(|| {
                EngineError::invalid_input(format!("formula overflows at {} {} {}", left, op, right))
            })
        }
    }
}

/// Returns true if `expression` is a well-formed formula over the keyword vocabulary.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::validate_formula;
///
/// assert!(validate_formula("基本工资 + 绩效工资 + 加班工资 - 社保 - 个税"));
/// assert!(!validate_formula("基本工资 + 奖金"));
/// assert!(!validate_formula("基本工资 +"));
/// ```
pub fn validate_formula(expression: &str) -> bool {
    Formula::parse(expression).is_ok()
}

/// Parses and evaluates `expression` against resolved component values.
pub fn evaluate(expression: &str, resolved: &ComponentValues) -> EngineResult<Decimal> {
    Formula::parse(expression)?.evaluate(resolved)
}

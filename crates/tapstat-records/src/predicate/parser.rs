use std::{iter::Peekable, vec::IntoIter};

use super::lexer::Token;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    Number(f64),
    Bool(bool),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Or => "|",
            Self::And => "&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    fn comparison(token: &Token) -> Option<Self> {
        Some(match token {
            Token::Eq => Self::Eq,
            Token::Ne => Self::Ne,
            Token::Lt => Self::Lt,
            Token::Le => Self::Le,
            Token::Gt => Self::Gt,
            Token::Ge => Self::Ge,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Literal),
    Column(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Column names in order of first appearance.
    pub(crate) fn columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Not(inner) | Self::Neg(inner) => inner.columns(out),
            Self::Binary { lhs, rhs, .. } => {
                lhs.columns(out);
                rhs.columns(out);
            }
        }
    }
}

/// Recursive-descent parser over the token stream.
///
/// Precedence from loosest to tightest: `|`, `&`, `~`, comparison, `+ -`,
/// `* /`, unary minus.
pub(crate) struct Parser {
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expr, String> {
        let expr = self.or()?;
        match self.tokens.next() {
            None => Ok(expr),
            Some(token) => Err(format!("unexpected {} after expression", describe(&token))),
        }
    }

    fn keyword(&mut self, word: &str) -> bool {
        self.tokens
            .next_if(|t| matches!(t, Token::Ident(s) if s == word))
            .is_some()
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.and()?;
        while self.tokens.next_if_eq(&Token::Pipe).is_some() || self.keyword("or") {
            lhs = Expr::binary(BinaryOp::Or, lhs, self.and()?);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.not()?;
        while self.tokens.next_if_eq(&Token::Amp).is_some() || self.keyword("and") {
            lhs = Expr::binary(BinaryOp::And, lhs, self.not()?);
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, String> {
        if self.tokens.next_if_eq(&Token::Tilde).is_some() || self.keyword("not") {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let lhs = self.sum()?;
        let Some(op) = self.tokens.peek().and_then(BinaryOp::comparison) else {
            return Ok(lhs);
        };
        self.tokens.next();
        let rhs = self.sum()?;
        if let Some(token) = self.tokens.peek()
            && BinaryOp::comparison(token).is_some()
        {
            return Err("chained comparisons need parentheses".to_owned());
        }
        Ok(Expr::binary(op, lhs, rhs))
    }

    fn sum(&mut self) -> Result<Expr, String> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.tokens.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.tokens.next();
            lhs = Expr::binary(op, lhs, self.term()?);
        }
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.tokens.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.tokens.next();
            lhs = Expr::binary(op, lhs, self.unary()?);
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.tokens.next_if_eq(&Token::Minus).is_some() {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, String> {
        let Some(token) = self.tokens.next() else {
            return Err("unexpected end of condition".to_owned());
        };
        match token {
            Token::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            Token::Text(s) => Ok(Expr::Literal(Literal::Text(s))),
            Token::Ident(name) => match name.as_str() {
                "True" => Ok(Expr::Literal(Literal::Bool(true))),
                "False" => Ok(Expr::Literal(Literal::Bool(false))),
                "and" | "or" | "not" => Err(format!("unexpected keyword `{name}`")),
                _ => Ok(Expr::Column(name)),
            },
            Token::LParen => {
                let inner = self.or()?;
                match self.tokens.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(token) => Err(format!("expected `)`, found {}", describe(&token))),
                    None => Err("missing closing `)`".to_owned()),
                }
            }
            token => Err(format!("unexpected {}", describe(&token))),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("number `{n}`"),
        Token::Text(s) => format!("string '{s}'"),
        Token::Ident(s) => format!("identifier `{s}`"),
        Token::LParen => "`(`".to_owned(),
        Token::RParen => "`)`".to_owned(),
        Token::Amp => "`&`".to_owned(),
        Token::Pipe => "`|`".to_owned(),
        Token::Tilde => "`~`".to_owned(),
        Token::Eq => "`==`".to_owned(),
        Token::Ne => "`!=`".to_owned(),
        Token::Lt => "`<`".to_owned(),
        Token::Le => "`<=`".to_owned(),
        Token::Gt => "`>`".to_owned(),
        Token::Ge => "`>=`".to_owned(),
        Token::Plus => "`+`".to_owned(),
        Token::Minus => "`-`".to_owned(),
        Token::Star => "`*`".to_owned(),
        Token::Slash => "`/`".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{super::lexer::tokenize, *};

    fn parse(input: &str) -> Result<Expr, String> {
        Parser::new(tokenize(input, &['_'])?).parse()
    }

    fn column(name: &str) -> Box<Expr> {
        Box::new(Expr::Column(name.into()))
    }

    fn number(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Literal::Number(n)))
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a > 1 | b > 2 & c > 3").unwrap();
        let Expr::Binary { op, rhs, .. } = expr else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(
            parse("loss * 100 + 1 > 5").unwrap(),
            Expr::Binary {
                op: BinaryOp::Gt,
                lhs: Box::new(Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(Expr::Binary {
                        op: BinaryOp::Mul,
                        lhs: column("loss"),
                        rhs: number(100.0),
                    }),
                    rhs: number(1.0),
                }),
                rhs: number(5.0),
            }
        );
    }

    #[test]
    fn test_keywords_match_symbols() {
        assert_eq!(
            parse("not a == 1 and b == 2 or c").unwrap(),
            parse("~a == 1 & b == 2 | c").unwrap()
        );
    }

    #[test]
    fn test_columns_in_first_appearance_order() {
        let expr = parse("(target >= 500) & (sess_size > 10) & (target < 900)").unwrap();
        let mut names = vec![];
        expr.columns(&mut names);
        assert_eq!(names, ["target", "sess_size"]);
    }

    #[test]
    fn test_malformed_conditions() {
        for input in ["(a > 1", "a >", "a > 1)", "a < b < c", "& a", "a b"] {
            assert!(parse(input).is_err(), "{input} should not parse");
        }
    }
}

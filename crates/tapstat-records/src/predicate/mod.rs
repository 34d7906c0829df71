//! Boolean row conditions over named columns.
//!
//! A condition such as `(target >= 500) & (sess_size > 10)` is tokenized,
//! parsed into a small expression tree and evaluated against column views.
//! Nothing outside the fixed grammar is ever executed.
//!
//! ```text
//! expr    := or
//! or      := and ( ('|' | 'or') and )*
//! and     := not ( ('&' | 'and') not )*
//! not     := ('~' | 'not') not | cmp
//! cmp     := sum ( ('==' | '!=' | '<' | '<=' | '>' | '>=') sum )?
//! sum     := term ( ('+' | '-') term )*
//! term    := unary ( ('*' | '/') unary )*
//! unary   := '-' unary | atom
//! atom    := NUMBER | STRING | 'True' | 'False' | IDENT | '(' expr ')'
//! ```
//!
//! Missing cells compare false (except with `!=`) and make arithmetic
//! missing. A number standing alone is true when it is non-zero.

use crate::column::ColumnView;

mod eval;
mod lexer;
mod parser;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid predicate `{condition}`: {reason}")]
pub struct PredicateError {
    pub condition: String,
    pub reason: String,
}

/// Tokenizer settings for conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateOptions {
    /// Characters that count as letters inside identifiers, in addition to
    /// alphanumerics.
    pub word_chars: Vec<char>,
}

impl Default for PredicateOptions {
    fn default() -> Self {
        Self {
            word_chars: vec!['_'],
        }
    }
}

/// A parsed row condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    condition: String,
    expr: Option<parser::Expr>,
}

impl Predicate {
    /// Parses a condition with the default options.
    ///
    /// An empty (or whitespace-only) condition selects every row.
    ///
    /// ```
    /// # use tapstat_records::predicate::Predicate;
    /// let predicate = Predicate::parse("(target >= 500) & (sess_size > 10)").unwrap();
    /// assert_eq!(predicate.columns(), ["target", "sess_size"]);
    /// assert!(Predicate::parse("target >=").is_err());
    /// ```
    pub fn parse(condition: &str) -> Result<Self, PredicateError> {
        Self::parse_with(condition, &PredicateOptions::default())
    }

    pub fn parse_with(condition: &str, options: &PredicateOptions) -> Result<Self, PredicateError> {
        let invalid = |reason| PredicateError {
            condition: condition.to_owned(),
            reason,
        };
        let tokens = lexer::tokenize(condition, &options.word_chars).map_err(invalid)?;
        let expr = if tokens.is_empty() {
            None
        } else {
            Some(parser::Parser::new(tokens).parse().map_err(invalid)?)
        };
        Ok(Self {
            condition: condition.to_owned(),
            expr,
        })
    }

    #[must_use]
    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Whether the predicate selects every row without looking at any column.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.expr.is_none()
    }

    /// Column names the condition refers to, in order of first appearance.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let mut names = vec![];
        if let Some(expr) = &self.expr {
            expr.columns(&mut names);
        }
        names
    }

    /// Evaluates the condition on `len` rows.
    ///
    /// `resolve` maps each referenced column name to a view of `len` rows;
    /// its error is returned unchanged so callers can report scoping issues.
    pub(crate) fn mask<'a, E, F>(&self, len: usize, mut resolve: F) -> Result<Vec<bool>, E>
    where
        E: From<PredicateError>,
        F: FnMut(&str) -> Result<ColumnView<'a>, E>,
    {
        let Some(expr) = &self.expr else {
            return Ok(vec![true; len]);
        };
        let mut columns = eval::Columns::new();
        for name in self.columns() {
            columns.insert(name, resolve(name)?);
        }
        eval::mask(expr, &columns, len).map_err(|reason| {
            PredicateError {
                condition: self.condition.clone(),
                reason,
            }
            .into()
        })
    }
}

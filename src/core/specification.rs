//! Composable query predicates
//!
//! A [`Specification`] is a small predicate tree over property paths. The
//! in-memory backend evaluates it against a [`Probe`]; SQL backends compile the
//! same tree into a `WHERE` clause with bound parameters, so one specification
//! runs unchanged on every backend.
//!
//! ```rust,ignore
//! let spec = MemberSpecification::username("m1")
//!     .and(MemberSpecification::team_name("teamA"));
//! let found = members.find_all_matching(&spec).await?;
//! ```

use crate::core::entity::Probe;
use crate::core::error::{DataResult, ValidationError};
use crate::core::field::FieldValue;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
        }
    }
}

/// Untyped predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Matches every row
    All,
    Compare {
        path: String,
        op: CompareOp,
        value: FieldValue,
    },
    /// SQL `LIKE` pattern: `%` any run, `_` one char, `\` escapes
    Like {
        path: String,
        pattern: String,
        ignore_case: bool,
    },
    In {
        path: String,
        values: Vec<FieldValue>,
    },
    IsNull {
        path: String,
    },
    And(Box<Criterion>, Box<Criterion>),
    Or(Box<Criterion>, Box<Criterion>),
    Not(Box<Criterion>),
}

impl Criterion {
    /// Evaluate with SQL semantics: comparisons against null never match
    pub fn matches(&self, probe: &dyn Probe) -> bool {
        match self {
            Criterion::All => true,
            Criterion::Compare { path, op, value } => match probe.field_value(path) {
                Some(actual) if !actual.is_null() && !value.is_null() => actual
                    .compare(value)
                    .map(|ordering| op.holds(ordering))
                    .unwrap_or(false),
                _ => false,
            },
            Criterion::Like {
                path,
                pattern,
                ignore_case,
            } => match probe.field_value(path) {
                Some(FieldValue::String(text)) => {
                    if *ignore_case {
                        like_match(&pattern.to_lowercase(), &text.to_lowercase())
                    } else {
                        like_match(pattern, &text)
                    }
                }
                _ => false,
            },
            Criterion::In { path, values } => match probe.field_value(path) {
                Some(actual) if !actual.is_null() => values
                    .iter()
                    .any(|v| actual.compare(v) == Some(Ordering::Equal)),
                _ => false,
            },
            Criterion::IsNull { path } => {
                matches!(probe.field_value(path), Some(FieldValue::Null))
            }
            Criterion::And(a, b) => a.matches(probe) && b.matches(probe),
            Criterion::Or(a, b) => a.matches(probe) || b.matches(probe),
            Criterion::Not(inner) => !inner.matches(probe),
        }
    }

    /// Every property path the tree refers to
    pub fn paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Criterion::All => {}
            Criterion::Compare { path, .. }
            | Criterion::Like { path, .. }
            | Criterion::In { path, .. }
            | Criterion::IsNull { path } => out.push(path),
            Criterion::And(a, b) | Criterion::Or(a, b) => {
                a.collect_paths(out);
                b.collect_paths(out);
            }
            Criterion::Not(inner) => inner.collect_paths(out),
        }
    }
}

/// Typed wrapper binding a [`Criterion`] tree to the entity it filters
pub struct Specification<T> {
    criterion: Criterion,
    _marker: PhantomData<fn(&T)>,
}

impl<T> Clone for Specification<T> {
    fn clone(&self) -> Self {
        Self::from_criterion(self.criterion.clone())
    }
}

impl<T> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Specification").field(&self.criterion).finish()
    }
}

impl<T> PartialEq for Specification<T> {
    fn eq(&self, other: &Self) -> bool {
        self.criterion == other.criterion
    }
}

impl<T> Specification<T> {
    pub fn from_criterion(criterion: Criterion) -> Self {
        Self {
            criterion,
            _marker: PhantomData,
        }
    }

    pub fn all() -> Self {
        Self::from_criterion(Criterion::All)
    }

    fn compare(path: &str, op: CompareOp, value: impl Into<FieldValue>) -> Self {
        Self::from_criterion(Criterion::Compare {
            path: path.to_string(),
            op,
            value: value.into(),
        })
    }

    pub fn eq(path: &str, value: impl Into<FieldValue>) -> Self {
        Self::compare(path, CompareOp::Eq, value)
    }

    pub fn ne(path: &str, value: impl Into<FieldValue>) -> Self {
        Self::compare(path, CompareOp::Ne, value)
    }

    pub fn gt(path: &str, value: impl Into<FieldValue>) -> Self {
        Self::compare(path, CompareOp::Gt, value)
    }

    pub fn ge(path: &str, value: impl Into<FieldValue>) -> Self {
        Self::compare(path, CompareOp::Ge, value)
    }

    pub fn lt(path: &str, value: impl Into<FieldValue>) -> Self {
        Self::compare(path, CompareOp::Lt, value)
    }

    pub fn le(path: &str, value: impl Into<FieldValue>) -> Self {
        Self::compare(path, CompareOp::Le, value)
    }

    pub fn like(path: &str, pattern: impl Into<String>) -> Self {
        Self::from_criterion(Criterion::Like {
            path: path.to_string(),
            pattern: pattern.into(),
            ignore_case: false,
        })
    }

    pub fn like_ignore_case(path: &str, pattern: impl Into<String>) -> Self {
        Self::from_criterion(Criterion::Like {
            path: path.to_string(),
            pattern: pattern.into(),
            ignore_case: true,
        })
    }

    pub fn is_in<I, V>(path: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Self::from_criterion(Criterion::In {
            path: path.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn is_null(path: &str) -> Self {
        Self::from_criterion(Criterion::IsNull {
            path: path.to_string(),
        })
    }

    pub fn and(self, other: Self) -> Self {
        match (self.criterion, other.criterion) {
            (Criterion::All, c) | (c, Criterion::All) => Self::from_criterion(c),
            (a, b) => Self::from_criterion(Criterion::And(Box::new(a), Box::new(b))),
        }
    }

    pub fn or(self, other: Self) -> Self {
        Self::from_criterion(Criterion::Or(
            Box::new(self.criterion),
            Box::new(other.criterion),
        ))
    }

    pub fn criterion(&self) -> &Criterion {
        &self.criterion
    }

    pub fn is_satisfied_by(&self, probe: &dyn Probe) -> bool {
        self.criterion.matches(probe)
    }

    /// Reject paths the entity does not expose
    pub fn validate(&self, entity_type: &str, allowed: &[&str]) -> DataResult<()> {
        match self.criterion.paths().into_iter().find(|p| !allowed.contains(p)) {
            Some(path) => Err(ValidationError::UnknownProperty {
                entity_type: entity_type.to_string(),
                property: path.to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

impl<T> std::ops::Not for Specification<T> {
    type Output = Specification<T>;

    fn not(self) -> Self::Output {
        Self::from_criterion(Criterion::Not(Box::new(self.criterion)))
    }
}

/// Escape `%`, `_` and `\` so a literal can be embedded in a LIKE pattern
pub fn escape_like(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// SQL LIKE matching with backslash escapes
pub fn like_match(pattern: &str, text: &str) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum Token {
        Any,
        One,
        Lit(char),
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Lit(chars.next().unwrap_or('\\')),
            c => Token::Lit(c),
        });
    }
    let text: Vec<char> = text.chars().collect();

    // dp[j]: tokens[..i] matches text[..j]
    let mut dp = vec![false; text.len() + 1];
    dp[0] = true;
    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        for j in 0..=text.len() {
            next[j] = match token {
                Token::Any => dp[j] || (j > 0 && next[j - 1]),
                Token::One => j > 0 && dp[j - 1],
                Token::Lit(c) => j > 0 && dp[j - 1] && text[j - 1] == *c,
            };
        }
        dp = next;
    }
    dp[text.len()]
}

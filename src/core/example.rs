//! Query by example
//!
//! An [`Example`] pairs a probe entity with an [`ExampleMatcher`]. Every
//! non-null probe field that is not ignored becomes a criterion, so a
//! half-filled entity doubles as a search form.

use crate::core::entity::Probe;
use crate::core::field::FieldValue;
use crate::core::specification::{Specification, escape_like};

/// How string fields of the probe are matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringMatcher {
    #[default]
    Exact,
    StartsWith,
    EndsWith,
    Contains,
}

/// Entities usable as probes list the paths an example may constrain
pub trait ExampleProbe: Probe {
    fn probe_paths() -> &'static [&'static str];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExampleMatcher {
    ignored_paths: Vec<String>,
    string_matcher: StringMatcher,
    ignore_case: bool,
}

impl ExampleMatcher {
    /// All non-null fields must match
    pub fn matching() -> Self {
        Self::default()
    }

    /// Skip these paths even when the probe has a value for them.
    ///
    /// Needed for non-optional fields such as `age`, which always carry a
    /// value and would otherwise constrain the search.
    pub fn with_ignore_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_string_matcher(mut self, matcher: StringMatcher) -> Self {
        self.string_matcher = matcher;
        self
    }

    pub fn with_ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignored_paths.iter().any(|p| p == path)
    }
}

#[derive(Debug, Clone)]
pub struct Example<T> {
    probe: T,
    matcher: ExampleMatcher,
}

impl<T: ExampleProbe> Example<T> {
    pub fn of(probe: T) -> Self {
        Self::with_matcher(probe, ExampleMatcher::matching())
    }

    pub fn with_matcher(probe: T, matcher: ExampleMatcher) -> Self {
        Self { probe, matcher }
    }

    pub fn probe(&self) -> &T {
        &self.probe
    }

    pub fn matcher(&self) -> &ExampleMatcher {
        &self.matcher
    }

    /// Build the equivalent specification
    pub fn to_specification(&self) -> Specification<T> {
        let mut spec = Specification::all();
        for path in T::probe_paths() {
            if self.matcher.is_ignored(path) {
                continue;
            }
            let value = match self.probe.field_value(path) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            spec = spec.and(self.criterion_for(path, value));
        }
        spec
    }

    fn criterion_for(&self, path: &str, value: FieldValue) -> Specification<T> {
        let text = match &value {
            FieldValue::String(s) => s,
            _ => return Specification::eq(path, value),
        };
        let escaped = escape_like(text);
        let pattern = match self.matcher.string_matcher {
            StringMatcher::Exact if !self.matcher.ignore_case => {
                return Specification::eq(path, value);
            }
            StringMatcher::Exact => escaped,
            StringMatcher::StartsWith => format!("{}%", escaped),
            StringMatcher::EndsWith => format!("%{}", escaped),
            StringMatcher::Contains => format!("%{}%", escaped),
        };
        if self.matcher.ignore_case {
            Specification::like_ignore_case(path, pattern)
        } else {
            Specification::like(path, pattern)
        }
    }
}

//! Key filters used to restrict which fields of a row are kept or shown

use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Selects keys of a [`Row`](super::Row)
///
/// A filter is either an explicit key list, a regular expression matched
/// against the key, or an arbitrary predicate.
#[derive(Clone)]
pub enum FieldFilter {
    Keys(Vec<String>),
    Pattern(Regex),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl FieldFilter {
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }

    /// Build a pattern filter
    ///
    /// # Errors
    /// Returns an error if the expression does not compile
    pub fn pattern(expr: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(expr)?))
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Keys(keys) => keys.iter().any(|k| k == key),
            Self::Pattern(re) => re.is_match(key),
            Self::Predicate(f) => f(key),
        }
    }
}

impl fmt::Debug for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for FieldFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::keys(iter)
    }
}

//! Media-feature queries
//!
//! Only single-feature queries of the form `(feature: value)` are supported,
//! which covers user-preference features such as `prefers-reduced-motion`.

use std::fmt;
use std::str::FromStr;

use crate::error::PlatformError;

/// A parsed `(feature: value)` media query
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MediaQuery {
    feature: String,
    value: String,
}

impl MediaQuery {
    pub fn new(feature: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            feature: feature.into().to_ascii_lowercase(),
            value: value.into().to_ascii_lowercase(),
        }
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether this query matches the given current value of its feature
    pub fn matches_value(&self, current: &str) -> bool {
        self.value.eq_ignore_ascii_case(current)
    }
}

impl FromStr for MediaQuery {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| PlatformError::InvalidMediaQuery(s.to_string()))?;

        let (feature, value) = inner
            .split_once(':')
            .ok_or_else(|| PlatformError::InvalidMediaQuery(s.to_string()))?;

        let (feature, value) = (feature.trim(), value.trim());
        if feature.is_empty() || value.is_empty() {
            return Err(PlatformError::InvalidMediaQuery(s.to_string()));
        }

        Ok(Self::new(feature, value))
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}: {})", self.feature, self.value)
    }
}

//! Key Pattern Module
//!
//! Matchers used for bulk invalidation. Plain strings are matched literally;
//! a regular expression must be built explicitly with [`KeyPattern::regex`].

use regex::Regex;

use crate::error::{FetchError, Result};

// == Key Pattern ==
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Keys starting with the given text
    Prefix(String),
    /// Keys containing the given text anywhere
    Substring(String),
    /// Keys matched by a compiled regular expression
    Regex(Regex),
}

impl KeyPattern {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        KeyPattern::Prefix(prefix.into())
    }

    pub fn substring(text: impl Into<String>) -> Self {
        KeyPattern::Substring(text.into())
    }

    /// Compiles `pattern` as a regular expression.
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(KeyPattern::Regex)
            .map_err(|e| FetchError::InvalidPattern(e.to_string()))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Prefix(prefix) => key.starts_with(prefix.as_str()),
            KeyPattern::Substring(text) => key.contains(text.as_str()),
            KeyPattern::Regex(re) => re.is_match(key),
        }
    }
}

impl From<Regex> for KeyPattern {
    fn from(re: Regex) -> Self {
        KeyPattern::Regex(re)
    }
}

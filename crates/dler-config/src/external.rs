//! Externals entries: exact module specifiers or anchored regular expressions.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigError, Result};

/// One externals entry.
///
/// Matching is exact equality for [`ExternalPattern::Exact`] and a regex test
/// for [`ExternalPattern::Pattern`]; substring containment never counts.
///
/// In config files a regex is written as a slash-delimited string
/// (`"/^@scope\\/.*$/"`). Any other string is an exact specifier.
#[derive(Debug, Clone)]
pub enum ExternalPattern {
    Exact(String),
    Pattern(Regex),
}

impl ExternalPattern {
    pub fn exact(specifier: impl Into<String>) -> Self {
        Self::Exact(specifier.into())
    }

    pub fn regex(source: &str) -> Result<Self> {
        Regex::new(source)
            .map(Self::Pattern)
            .map_err(|e| ConfigError::InvalidExternal {
                pattern: source.to_string(),
                message: e.to_string(),
            })
    }

    /// Parses the config-file spelling.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            Some(source) if !source.is_empty() => Self::regex(source),
            _ => Ok(Self::exact(raw)),
        }
    }

    pub fn matches(&self, specifier: &str) -> bool {
        match self {
            Self::Exact(value) => value == specifier,
            Self::Pattern(regex) => regex.is_match(specifier),
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}

impl PartialEq for ExternalPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for ExternalPattern {}

impl fmt::Display for ExternalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(value) => f.write_str(value),
            Self::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl Serialize for ExternalPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExternalPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

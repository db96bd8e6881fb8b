//! Path patterns used by the default-layout rules and collections.
//!
//! Default-layout rules are regular expressions (`^posts/`), collections use
//! globs (`*posts/*`). Both are matched against `/`-separated file set paths.

use glob::{MatchOptions, Pattern};
use regex::Regex;

use crate::config::ConfigError;

/// A regular expression matched against file paths.
#[derive(Debug, Clone)]
pub struct PathRegex(Regex);

impl PathRegex {
    pub fn new(pattern: &str, context: &str) -> Result<Self, ConfigError> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|e| ConfigError::InvalidPattern {
                context: context.to_string(),
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.0.is_match(path)
    }
}

/// A glob matched against file paths, where `*` stops at `/`.
#[derive(Debug, Clone)]
pub struct PathGlob(Pattern);

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl PathGlob {
    pub fn new(pattern: &str, context: &str) -> Result<Self, ConfigError> {
        Pattern::new(pattern)
            .map(Self)
            .map_err(|e| ConfigError::InvalidPattern {
                context: context.to_string(),
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.0.matches_with(path, GLOB_OPTIONS)
    }
}

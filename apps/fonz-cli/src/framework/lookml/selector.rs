//! Explore selectors
//!
//! Users choose explores with `model/explore` selectors where either side may be the
//! `*` wildcard, e.g. `ecommerce/*` or `*/users`. Exclusions use the same syntax and
//! win over inclusions. With no inclusions every explore is selected.

use std::fmt;
use std::str::FromStr;

use crate::utilities::constants::{SELECTOR_SEPARATOR, SELECTOR_WILDCARD};

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Invalid explore selector '{selector}': expected the form model/explore")]
pub struct SelectorParseError {
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub model: String,
    pub explore: String,
}

impl Selector {
    pub fn matches(&self, model: &str, explore: &str) -> bool {
        part_matches(&self.model, model) && part_matches(&self.explore, explore)
    }
}

fn part_matches(pattern: &str, value: &str) -> bool {
    pattern == SELECTOR_WILDCARD || pattern == value
}

impl FromStr for Selector {
    type Err = SelectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || SelectorParseError {
            selector: s.to_string(),
        };
        let (model, explore) = s.trim().split_once(SELECTOR_SEPARATOR).ok_or_else(error)?;
        if model.is_empty() || explore.is_empty() || explore.contains(SELECTOR_SEPARATOR) {
            return Err(error());
        }
        Ok(Selector {
            model: model.to_string(),
            explore: explore.to_string(),
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.model, SELECTOR_SEPARATOR, self.explore)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExploreSelection {
    pub includes: Vec<Selector>,
    pub excludes: Vec<Selector>,
}

impl ExploreSelection {
    pub fn parse(includes: &[String], excludes: &[String]) -> Result<Self, SelectorParseError> {
        Ok(Self {
            includes: includes
                .iter()
                .map(|s| s.parse())
                .collect::<Result<_, _>>()?,
            excludes: excludes
                .iter()
                .map(|s| s.parse())
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn is_selected(&self, model: &str, explore: &str) -> bool {
        let included = self.includes.is_empty()
            || self.includes.iter().any(|s| s.matches(model, explore));
        included && !self.excludes.iter().any(|s| s.matches(model, explore))
    }
}

impl fmt::Display for ExploreSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.includes.is_empty() {
            write!(f, "{}{}{}", SELECTOR_WILDCARD, SELECTOR_SEPARATOR, SELECTOR_WILDCARD)?;
        } else {
            let includes: Vec<String> = self.includes.iter().map(|s| s.to_string()).collect();
            write!(f, "{}", includes.join(", "))?;
        }
        if !self.excludes.is_empty() {
            let excludes: Vec<String> = self.excludes.iter().map(|s| s.to_string()).collect();
            write!(f, " (excluding {})", excludes.join(", "))?;
        }
        Ok(())
    }
}

//! Calendar months as used to name per-month model folders

use crate::errors::{ReferenceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

const ALL: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

impl Month {
    pub fn all() -> &'static [Month; 12] {
        &ALL
    }

    /// 1-based month number.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_number(n: u32) -> Result<Self> {
        n.checked_sub(1)
            .and_then(|i| ALL.get(i as usize).copied())
            .ok_or_else(|| ReferenceError::InvalidMonth(n.to_string()))
    }

    /// Three-letter lowercase abbreviation, e.g. `"jul"`.
    pub fn abbr(self) -> &'static str {
        &self.full_name()[..3]
    }

    /// Lowercase full name, which is also the folder name, e.g. `"july"`.
    pub fn full_name(self) -> &'static str {
        match self {
            Month::January => "january",
            Month::February => "february",
            Month::March => "march",
            Month::April => "april",
            Month::May => "may",
            Month::June => "june",
            Month::July => "july",
            Month::August => "august",
            Month::September => "september",
            Month::October => "october",
            Month::November => "november",
            Month::December => "december",
        }
    }

    /// Parse a case-insensitive three-letter abbreviation.
    pub fn from_abbr(abbr: &str) -> Result<Self> {
        let lower = abbr.trim().to_ascii_lowercase();
        ALL.iter()
            .copied()
            .find(|m| m.abbr() == lower)
            .ok_or_else(|| ReferenceError::InvalidMonth(abbr.to_string()))
    }

    /// Month preceding this one, used for hotspot model names.
    pub fn previous(self) -> Option<Self> {
        Self::from_number(self.number() - 1).ok()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

impl FromStr for Month {
    type Err = ReferenceError;

    /// Accepts an abbreviation, a full name or a month number.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u32>() {
            return Self::from_number(n);
        }
        let lower = trimmed.to_ascii_lowercase();
        ALL.iter()
            .copied()
            .find(|m| m.full_name() == lower)
            .map_or_else(|| Self::from_abbr(trimmed), Ok)
    }
}

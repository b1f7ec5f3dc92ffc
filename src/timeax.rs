// SPDX-License-Identifier: AGPL-3.0-or-later
//! Calendar keys for the monthly time axis.
//!
//! The whole pipeline runs on monthly grids, so the time coordinate is a
//! plain (year, month) pair with total order and month-step arithmetic.
//! Serialized as `"YYYY-MM"` in `.dsg` headers and model metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One calendar month, e.g. 2014-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1–12.
    pub month: u32,
}

impl YearMonth {
    /// Construct a year-month, validating the month range.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `month` is not in 1–12.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidInput(format!(
                "month {month} out of range 1-12"
            )));
        }
        Ok(Self { year, month })
    }

    /// Parse `"YYYY-MM"` (an optional `-DD` suffix is ignored).
    ///
    /// # Errors
    ///
    /// Returns `Err` on malformed input or an out-of-range month.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, '-');
        let year = parts
            .next()
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or_else(|| Error::InvalidInput(format!("bad year-month {s:?}")))?;
        let month = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(|| Error::InvalidInput(format!("bad year-month {s:?}")))?;
        Self::new(year, month)
    }

    /// Next calendar month.
    #[must_use]
    pub const fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// This month shifted `n` months into the past.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub const fn minus_months(self, n: u32) -> Self {
        let total = self.year as i64 * 12 + (self.month as i64 - 1) - n as i64;
        Self {
            year: total.div_euclid(12) as i32,
            month: (total.rem_euclid(12) + 1) as u32,
        }
    }

    /// Inclusive list of months from `start` through `end`.
    ///
    /// Empty when `start > end`.
    #[must_use]
    pub fn range_inclusive(start: Self, end: Self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut cur = start;
        while cur <= end {
            out.push(cur);
            cur = cur.succ();
        }
        out
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<YearMonth> for String {
    fn from(ym: YearMonth) -> Self {
        ym.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let ym = YearMonth::parse("2014-01").unwrap();
        assert_eq!(ym, YearMonth { year: 2014, month: 1 });
        assert_eq!(ym.to_string(), "2014-01");
    }

    #[test]
    fn parse_accepts_full_date() {
        let ym = YearMonth::parse("1991-12-01").unwrap();
        assert_eq!(ym, YearMonth { year: 1991, month: 12 });
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(YearMonth::parse("noise").is_err());
        assert!(YearMonth::parse("2014-13").is_err());
        assert!(YearMonth::parse("2014").is_err());
    }

    #[test]
    fn succ_wraps_december() {
        let dec = YearMonth::new(2020, 12).unwrap();
        assert_eq!(dec.succ(), YearMonth { year: 2021, month: 1 });
    }

    #[test]
    fn minus_months_crosses_year_boundary() {
        let feb = YearMonth::new(1991, 2).unwrap();
        assert_eq!(feb.minus_months(3), YearMonth { year: 1990, month: 11 });
        assert_eq!(feb.minus_months(1), YearMonth { year: 1991, month: 1 });
        assert_eq!(feb.minus_months(0), feb);
    }

    #[test]
    fn range_inclusive_spans_years() {
        let months = YearMonth::range_inclusive(
            YearMonth::new(2020, 11).unwrap(),
            YearMonth::new(2021, 2).unwrap(),
        );
        assert_eq!(months.len(), 4);
        assert_eq!(months[0].to_string(), "2020-11");
        assert_eq!(months[3].to_string(), "2021-02");
    }

    #[test]
    fn ordering_is_chronological() {
        let a = YearMonth::new(2016, 12).unwrap();
        let b = YearMonth::new(2017, 1).unwrap();
        assert!(a < b);
    }
}

//! Percentages to one decimal place
//!
//! Stored as an exact count of tenths of a percent. Rounding is half-to-even
//! on the exact rational value, so 1/16 (6.25%) is 6.2 and 3/16 (18.75%) is
//! 18.8.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percentage {
    tenths: u64,
}

impl Percentage {
    /// `numerator / denominator * 100`, or `None` for an empty denominator
    pub fn of(numerator: usize, denominator: usize) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let denominator = denominator as u64;
        let scaled = numerator as u64 * 1000;
        let quotient = scaled / denominator;
        let remainder = scaled % denominator;

        let tenths = match (2 * remainder).cmp(&denominator) {
            Ordering::Less => quotient,
            Ordering::Greater => quotient + 1,
            Ordering::Equal if quotient % 2 == 0 => quotient,
            Ordering::Equal => quotient + 1,
        };
        Some(Self { tenths })
    }

    pub fn tenths(self) -> u64 {
        self.tenths
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tenths / 10, self.tenths % 10)
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

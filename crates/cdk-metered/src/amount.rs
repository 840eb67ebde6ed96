//! Sat amounts
//!
//! Local proofs are always denominated in sats. The remote node reports its
//! balance in millisats, which is floored into sats on the way in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Millisats per sat
pub const MSAT_PER_SAT: u64 = 1000;

/// Amount in sats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Amount zero
    pub const ZERO: Amount = Amount(0);

    /// Amount from a millisat value, rounding down to whole sats
    pub fn from_msat(msat: u64) -> Self {
        Self(msat / MSAT_PER_SAT)
    }

    /// Amount from a possibly fractional sat value, rounding up
    ///
    /// Prices advertised by the node can carry sub-sat precision; a bearer
    /// token must always cover the full price.
    pub fn from_sats_ceil(sats: f64) -> Result<Self, Error> {
        if !sats.is_finite() || sats < 0.0 {
            return Err(Error::Validation(format!("Invalid sat amount: {sats}")));
        }
        let ceil = sats.ceil();
        if ceil > u64::MAX as f64 {
            return Err(Error::Validation(format!("Sat amount too large: {sats}")));
        }
        Ok(Self(ceil as u64))
    }

    /// Checked addition for Amount. Returns None if overflow occurs.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction for Amount. Returns None if overflow occurs.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Try sum to check for overflow
    pub fn try_sum<I>(iter: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Self>,
    {
        iter.into_iter().try_fold(Amount::ZERO, |acc, x| {
            acc.checked_add(x).ok_or(Error::AmountOverflow)
        })
    }

    /// Convert to u64
    pub fn to_u64(self) -> u64 {
        self.0
    }

    /// Is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::ZERO
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(width) = f.width() {
            write!(f, "{:width$}", self.0, width = width)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<u64>()
            .map_err(|_| Error::Validation(format!("Invalid amount: {s}")))?;
        Ok(Amount(value))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Amount> for u64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

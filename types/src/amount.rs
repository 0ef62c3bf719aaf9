//! Fixed-point token amounts.
//!
//! Amounts are represented as fixed-point integers (u128) to avoid floating-point errors.
//! The smallest unit is 1 raw; one whole token is `10^DECIMALS` raw.

use crate::error::ParseError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Number of fractional decimal digits an amount can carry.
pub const DECIMALS: u32 = 18;

/// Raw units per whole token.
pub const UNIT: u128 = 10u128.pow(DECIMALS);

/// A token amount in raw units.
///
/// Serialized as a decimal string such as `"12.5"` so that no client has to
/// deal with integers wider than 64 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// The smallest representable positive amount.
    pub const MIN_POSITIVE: Self = Self(1);

    pub fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// An amount of whole tokens.
    pub fn whole(tokens: u64) -> Self {
        Self(tokens as u128 * UNIT)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Sum an iterator of amounts, returning `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(iter: I) -> Option<Self> {
        iter.into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl FromStr for Amount {
    type Err = ParseError;

    /// Parse a non-negative decimal string with at most [`DECIMALS`] fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(ParseError::InvalidAmount(s.to_string()));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(ParseError::InvalidAmount(s.to_string()));
        }
        if frac.len() > DECIMALS as usize {
            return Err(ParseError::TooPrecise {
                value: s.to_string(),
                max_decimals: DECIMALS,
            });
        }

        let overflow = || ParseError::AmountOverflow(s.to_string());
        let whole_raw = if whole.is_empty() {
            0
        } else {
            whole.parse::<u128>().map_err(|_| overflow())?
        };
        let frac_raw = if frac.is_empty() {
            0
        } else {
            let scale = 10u128.pow(DECIMALS - frac.len() as u32);
            frac.parse::<u128>().map_err(|_| overflow())? * scale
        };

        whole_raw
            .checked_mul(UNIT)
            .and_then(|w| w.checked_add(frac_raw))
            .map(Self)
            .ok_or_else(overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{:0width$}", frac, width = DECIMALS as usize);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_and_fractional() {
        assert_eq!("12".parse::<Amount>().unwrap(), Amount::whole(12));
        assert_eq!(
            "1.5".parse::<Amount>().unwrap(),
            Amount::from_raw(UNIT + UNIT / 2)
        );
        assert_eq!(".25".parse::<Amount>().unwrap(), Amount::from_raw(UNIT / 4));
        assert_eq!(
            "0.000000000000000001".parse::<Amount>().unwrap(),
            Amount::MIN_POSITIVE
        );
    }

    #[test]
    fn parse_rejects_excess_precision() {
        let err = "0.0000000000000000001".parse::<Amount>().unwrap_err();
        assert!(matches!(err, ParseError::TooPrecise { .. }));
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", ".", "-1", "1.2.3", "abc", "1e5"] {
            assert!(bad.parse::<Amount>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn parse_rejects_overflow() {
        let huge = "9".repeat(40);
        assert!(matches!(
            huge.parse::<Amount>().unwrap_err(),
            ParseError::AmountOverflow(_)
        ));
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Amount::whole(100).to_string(), "100");
        assert_eq!(Amount::from_raw(UNIT / 2).to_string(), "0.5");
        assert_eq!(Amount::MIN_POSITIVE.to_string(), "0.000000000000000001");
    }

    #[test]
    fn checked_sum_detects_overflow() {
        let max = Amount::from_raw(u128::MAX);
        assert_eq!(Amount::checked_sum([max, Amount::MIN_POSITIVE]), None);
        assert_eq!(
            Amount::checked_sum([Amount::whole(1), Amount::whole(2)]),
            Some(Amount::whole(3))
        );
    }

    #[test]
    fn json_is_decimal_string() {
        let amount: Amount = "2.75".parse().unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"2.75\"");
        let back: Amount = serde_json::from_str("\"2.75\"").unwrap();
        assert_eq!(back, amount);
        assert!(serde_json::from_str::<Amount>("\"2.x\"").is_err());
    }
}

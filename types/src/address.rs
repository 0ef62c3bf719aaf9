//! Account and contract address type, rendered as `0x`-prefixed hex.

use crate::error::ParseError;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

type Blake2b256 = Blake2b<U32>;

/// A 20-byte ledger address.
///
/// Both externally owned accounts (managers, backers, providers) and deployed
/// records (campaigns, the verification authority) are identified by an
/// `Address`. Deployed addresses are derived, never chosen.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Length of an address in bytes.
    pub const LEN: usize = 20;

    /// The all-zero address. Never assigned to a deployed record.
    pub const ZERO: Self = Self([0u8; 20]);

    /// The textual prefix.
    pub const PREFIX: &'static str = "0x";

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Derive an address from a domain tag and arbitrary parts.
    ///
    /// The address is the first 20 bytes of `blake2b-256(domain || parts...)`.
    pub fn derive(domain: &[u8], parts: &[&[u8]]) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(domain);
        for part in parts {
            hasher.update(part);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    /// Convenience for dev tooling and tests: a stable address for a label.
    pub fn from_label(label: &str) -> Self {
        Self::derive(b"fundrelay/label", &[label.as_bytes()])
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(Self::PREFIX)
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ParseError::InvalidAddress(s.to_string()))?;
        if body.len() != Self::LEN * 2 {
            return Err(ParseError::InvalidAddress(s.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|_| ParseError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{}..)", hex::encode(&self.0[..4]))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let addr = Address::new([0xab; 20]);
        let text = addr.to_string();
        assert_eq!(text, format!("0x{}", "ab".repeat(20)));
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn parse_accepts_uppercase_hex() {
        let upper = format!("0x{}", "AB".repeat(20));
        assert_eq!(upper.parse::<Address>().unwrap(), Address::new([0xab; 20]));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("".parse::<Address>().is_err());
        assert!("ab".repeat(20).parse::<Address>().is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!(format!("0x{}", "zz".repeat(20)).parse::<Address>().is_err());
    }

    #[test]
    fn derive_is_deterministic_and_domain_separated() {
        let a = Address::derive(b"campaign", &[b"x", b"y"]);
        let b = Address::derive(b"campaign", &[b"x", b"y"]);
        let c = Address::derive(b"other", &[b"x", b"y"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());
    }

    #[test]
    fn json_uses_hex_string() {
        let addr = Address::from_label("alice");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}

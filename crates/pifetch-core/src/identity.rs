//! Hardware identity of the target device and the address validator.
//!
//! A [`DeviceIdentity`] is the six-byte MAC address burned into the device's
//! network interface. It is the only stable handle on a device whose IPv4
//! address is handed out by DHCP, so every lookup starts from it.

use crate::error::{FetchError, FetchResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    /// Six hex pairs separated by `:` or `-`, nothing else.
    static ref CANONICAL_MAC: Regex =
        Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").unwrap();

    /// Two-digit hardware token anywhere in free text (probe output).
    static ref MAC_TOKEN: Regex =
        Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}").unwrap();
}

/// Immutable hardware address. Equality ignores case and delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity([u8; 6]);

impl DeviceIdentity {
    /// Validate `candidate` and normalize it.
    ///
    /// Fails with `InvalidAddressFormat` unless the string is exactly six
    /// hex byte pairs delimited by colons or hyphens.
    pub fn parse(candidate: &str) -> FetchResult<Self> {
        if !CANONICAL_MAC.is_match(candidate) {
            return Err(FetchError::invalid_address(candidate));
        }
        Self::from_groups(candidate).ok_or_else(|| FetchError::invalid_address(candidate))
    }

    /// Parse a hardware token as it appears in neighbor-table dumps, where
    /// BSD-derived `arp` drops leading zeros (`a:b:c:d:e:f`).
    pub fn parse_lenient(token: &str) -> Option<Self> {
        let groups: Vec<&str> = token.split([':', '-']).collect();
        if groups.len() != 6 || groups.iter().any(|g| g.is_empty() || g.len() > 2) {
            return None;
        }
        Self::from_groups(token)
    }

    /// First two-digit hardware token found in `text`, if any.
    pub fn find_in(text: &str) -> Option<Self> {
        MAC_TOKEN
            .find(text)
            .and_then(|m| Self::from_groups(m.as_str()))
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    fn from_groups(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 6];
        let mut count = 0;
        for (i, group) in s.split([':', '-']).enumerate() {
            if i >= 6 {
                return None;
            }
            bytes[i] = u8::from_str_radix(group, 16).ok()?;
            count += 1;
        }
        (count == 6).then_some(Self(bytes))
    }
}

/// The address validator: a free-function alias of [`DeviceIdentity::parse`].
pub fn validate_hardware_address(candidate: &str) -> FetchResult<DeviceIdentity> {
    DeviceIdentity::parse(candidate)
}

impl FromStr for DeviceIdentity {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

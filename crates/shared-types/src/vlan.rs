//! VLAN identifiers and the channel names callers use to address them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SharedTypeError;

/// IEEE 802.1Q VLAN identifier (1-4094).
///
/// VLAN 0 is reserved for priority tagged frames and 4095 is reserved by the
/// standard, so neither can be assigned to a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    /// Minimum valid VLAN ID.
    pub const MIN: u16 = 1;

    /// Maximum valid VLAN ID.
    pub const MAX: u16 = 4094;

    /// Creates a new VLAN ID, rejecting values outside 1-4094.
    pub fn new(id: u16) -> Result<Self, SharedTypeError> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(VlanId(id))
        } else {
            Err(SharedTypeError::InvalidValue {
                field: "vlan_id",
                value: id.to_string(),
            })
        }
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VlanId {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u16 = s.trim().parse().map_err(|_| SharedTypeError::InvalidValue {
            field: "vlan_id",
            value: s.to_string(),
        })?;
        VlanId::new(id)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = SharedTypeError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}

/// Caller-facing name for the way a nic reaches a network.
///
/// `Native` is the untagged VLAN of the port, `Tagged` carries an 802.1Q tag.
/// The variant order matters: `Native` sorts before every tagged channel, and
/// tagged channels sort by VLAN number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Native,
    Tagged(VlanId),
}

impl Channel {
    const PREFIX: &'static str = "vlan/";
    const NATIVE: &'static str = "vlan/native";

    pub fn is_native(&self) -> bool {
        matches!(self, Channel::Native)
    }

    pub fn tagged_vlan(&self) -> Option<VlanId> {
        match self {
            Channel::Native => None,
            Channel::Tagged(vlan) => Some(*vlan),
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Channel::Native
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Native => f.write_str(Self::NATIVE),
            Channel::Tagged(vlan) => write!(f, "{}{}", Self::PREFIX, vlan),
        }
    }
}

impl FromStr for Channel {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::NATIVE {
            return Ok(Channel::Native);
        }

        let tag = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| SharedTypeError::ParseError(format!("unknown channel '{}'", s)))?;
        // Reject "vlan/+12" and "vlan/ 12", which u16 parsing would otherwise accept
        if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SharedTypeError::ParseError(format!("unknown channel '{}'", s)));
        }

        Ok(Channel::Tagged(tag.parse()?))
    }
}

impl Serialize for Channel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

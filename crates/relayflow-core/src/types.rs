/*!
 * Core identifier types for RelayFlow.
 *
 * Physical channels and accessories are addressed by small integers on the
 * device; these newtypes keep the two id spaces from being mixed up.
 */
use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric id of a physical channel (input, output or power meter).
///
/// Channel ids are 1-based and match the labels printed on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Create a channel id
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Raw numeric value
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for ChannelId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

/// Accessory id as announced by the accessory server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessoryId(u64);

impl AccessoryId {
    /// The pre-existing primary accessory always has aid 1.
    pub const PRIMARY: AccessoryId = AccessoryId(1);

    /// Create an accessory id
    pub const fn new(aid: u64) -> Self {
        Self(aid)
    }

    /// Build an aid from a per-kind base and a channel id
    pub const fn from_base(base: u64, id: ChannelId) -> Self {
        Self(base + id.get() as u64)
    }

    /// Raw numeric value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccessoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

//! Joint → (chip, channel) routing table.
//!
//! The same table serves named lookups (presets, calibration) and the
//! positional command protocol, which translates each parameter position to
//! a [`Joint`] before resolving it here.

use std::collections::BTreeMap;

use bionic_hand_pca9685::{Channel, DeviceAddress};

use crate::error::{MapError, MapResult};
use crate::joint::Joint;

/// Physical output a joint's servo is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelTarget {
    pub address: DeviceAddress,
    pub channel: Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoMapEntry {
    pub joint: Joint,
    pub target: ChannelTarget,
}

impl ServoMapEntry {
    /// Returns `None` if `channel` is not a valid output index.
    pub const fn new(joint: Joint, address: DeviceAddress, channel: u8) -> Option<Self> {
        match Channel::new(channel) {
            Some(channel) => Some(Self {
                joint,
                target: ChannelTarget { address, channel },
            }),
            None => None,
        }
    }
}

// (joint, board, channel) as wired on the hand.
const STANDARD_WIRING: [(Joint, DeviceAddress, u8); 19] = [
    (Joint::INDEX_DIST, DeviceAddress::PRIMARY, 0),
    (Joint::INDEX_MED, DeviceAddress::PRIMARY, 1),
    (Joint::INDEX_PROX, DeviceAddress::PRIMARY, 2),
    (Joint::INDEX_LAT, DeviceAddress::SECONDARY, 3),
    (Joint::MIDDLE_PROX, DeviceAddress::PRIMARY, 4),
    (Joint::MIDDLE_MED, DeviceAddress::PRIMARY, 5),
    (Joint::MIDDLE_DIST, DeviceAddress::PRIMARY, 7),
    (Joint::MIDDLE_LAT, DeviceAddress::SECONDARY, 4),
    (Joint::RING_PROX, DeviceAddress::PRIMARY, 8),
    (Joint::RING_MED, DeviceAddress::PRIMARY, 9),
    (Joint::RING_DIST, DeviceAddress::PRIMARY, 10),
    (Joint::RING_LAT, DeviceAddress::SECONDARY, 7),
    (Joint::LITTLE_PROX, DeviceAddress::PRIMARY, 12),
    (Joint::LITTLE_MED, DeviceAddress::PRIMARY, 13),
    (Joint::LITTLE_DIST, DeviceAddress::PRIMARY, 14),
    (Joint::LITTLE_LAT, DeviceAddress::SECONDARY, 8),
    (Joint::THUMB_PROX, DeviceAddress::SECONDARY, 0),
    (Joint::THUMB_DIST, DeviceAddress::SECONDARY, 1),
    (Joint::THUMB_LAT, DeviceAddress::SECONDARY, 2),
];

/// Immutable joint routing table.
///
/// Construction guarantees that every joint appears once and that no two
/// joints share an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoMap {
    targets: BTreeMap<Joint, ChannelTarget>,
}

impl ServoMap {
    /// Builds a map from arbitrary entries.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::DuplicateJoint`] if a joint is listed twice and
    /// [`MapError::ChannelCollision`] if two joints share an output.
    pub fn new(entries: impl IntoIterator<Item = ServoMapEntry>) -> MapResult<Self> {
        let mut targets = BTreeMap::new();
        let mut owners: BTreeMap<ChannelTarget, Joint> = BTreeMap::new();
        for entry in entries {
            if targets.contains_key(&entry.joint) {
                return Err(MapError::DuplicateJoint(entry.joint));
            }
            if let Some(&first) = owners.get(&entry.target) {
                return Err(MapError::ChannelCollision {
                    first,
                    second: entry.joint,
                    address: entry.target.address,
                    channel: entry.target.channel,
                });
            }
            targets.insert(entry.joint, entry.target);
            owners.insert(entry.target, entry.joint);
        }
        Ok(Self { targets })
    }

    /// The wiring of the hand: flexion joints of the four fingers on the
    /// primary board, thumb and spread joints on the secondary board.
    pub fn standard() -> Self {
        let targets = STANDARD_WIRING
            .iter()
            .filter_map(|&(joint, address, channel)| {
                ServoMapEntry::new(joint, address, channel).map(|e| (e.joint, e.target))
            })
            .collect();
        Self { targets }
    }

    /// # Errors
    ///
    /// Returns [`MapError::UnknownJoint`] if `joint` is not wired.
    pub fn resolve(&self, joint: Joint) -> MapResult<ChannelTarget> {
        self.targets
            .get(&joint)
            .copied()
            .ok_or(MapError::UnknownJoint(joint))
    }

    /// Resolves a joint by its `NN_seg` name.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownJointName`] for a malformed name and
    /// [`MapError::UnknownJoint`] for a well-formed but unwired one.
    pub fn resolve_name(&self, name: &str) -> MapResult<ChannelTarget> {
        self.resolve(name.parse()?)
    }

    pub fn contains(&self, joint: Joint) -> bool {
        self.targets.contains_key(&joint)
    }

    /// Entries in joint order.
    pub fn entries(&self) -> impl Iterator<Item = ServoMapEntry> + '_ {
        self.targets
            .iter()
            .map(|(&joint, &target)| ServoMapEntry { joint, target })
    }

    pub fn joints(&self) -> impl Iterator<Item = Joint> + '_ {
        self.targets.keys().copied()
    }

    /// Distinct chip addresses referenced by the map, ascending.
    pub fn addresses(&self) -> Vec<DeviceAddress> {
        let mut addresses: Vec<_> = self.targets.values().map(|t| t.address).collect();
        addresses.sort_unstable();
        addresses.dedup();
        addresses
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Default for ServoMap {
    fn default() -> Self {
        Self::standard()
    }
}

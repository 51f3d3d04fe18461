//! Joint identifiers.
//!
//! Joints are named `<digit>_<segment>`, where the digit is the two-digit
//! finger number (`01` thumb through `05` little finger) and the segment is
//! one of `prox`, `med`, `dist`, `lat`. `02_dist` is the index-finger distal
//! joint; `04_lat` is the ring-finger spread joint.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Digit {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Digit {
    pub const ALL: [Self; 5] = [
        Self::Thumb,
        Self::Index,
        Self::Middle,
        Self::Ring,
        Self::Little,
    ];

    /// Finger number used in joint names (1 = thumb).
    pub const fn number(self) -> u8 {
        match self {
            Self::Thumb => 1,
            Self::Index => 2,
            Self::Middle => 3,
            Self::Ring => 4,
            Self::Little => 5,
        }
    }

    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Thumb),
            2 => Some(Self::Index),
            3 => Some(Self::Middle),
            4 => Some(Self::Ring),
            5 => Some(Self::Little),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Thumb => "thumb",
            Self::Index => "index",
            Self::Middle => "middle",
            Self::Ring => "ring",
            Self::Little => "little",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Proximal,
    Medial,
    Distal,
    Lateral,
}

impl Segment {
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::Proximal => "prox",
            Self::Medial => "med",
            Self::Distal => "dist",
            Self::Lateral => "lat",
        }
    }

    fn from_abbreviation(s: &str) -> Option<Self> {
        match s {
            "prox" => Some(Self::Proximal),
            "med" => Some(Self::Medial),
            "dist" => Some(Self::Distal),
            "lat" => Some(Self::Lateral),
            _ => None,
        }
    }
}

/// One controllable degree of freedom.
///
/// Any digit/segment pair is representable; whether it is wired is decided
/// by the [`ServoMap`](crate::ServoMap). The thumb has no medial servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Joint {
    pub digit: Digit,
    pub segment: Segment,
}

impl Joint {
    pub const fn new(digit: Digit, segment: Segment) -> Self {
        Self { digit, segment }
    }

    pub const THUMB_PROX: Self = Self::new(Digit::Thumb, Segment::Proximal);
    pub const THUMB_DIST: Self = Self::new(Digit::Thumb, Segment::Distal);
    pub const THUMB_LAT: Self = Self::new(Digit::Thumb, Segment::Lateral);

    pub const INDEX_PROX: Self = Self::new(Digit::Index, Segment::Proximal);
    pub const INDEX_MED: Self = Self::new(Digit::Index, Segment::Medial);
    pub const INDEX_DIST: Self = Self::new(Digit::Index, Segment::Distal);
    pub const INDEX_LAT: Self = Self::new(Digit::Index, Segment::Lateral);

    pub const MIDDLE_PROX: Self = Self::new(Digit::Middle, Segment::Proximal);
    pub const MIDDLE_MED: Self = Self::new(Digit::Middle, Segment::Medial);
    pub const MIDDLE_DIST: Self = Self::new(Digit::Middle, Segment::Distal);
    pub const MIDDLE_LAT: Self = Self::new(Digit::Middle, Segment::Lateral);

    pub const RING_PROX: Self = Self::new(Digit::Ring, Segment::Proximal);
    pub const RING_MED: Self = Self::new(Digit::Ring, Segment::Medial);
    pub const RING_DIST: Self = Self::new(Digit::Ring, Segment::Distal);
    pub const RING_LAT: Self = Self::new(Digit::Ring, Segment::Lateral);

    pub const LITTLE_PROX: Self = Self::new(Digit::Little, Segment::Proximal);
    pub const LITTLE_MED: Self = Self::new(Digit::Little, Segment::Medial);
    pub const LITTLE_DIST: Self = Self::new(Digit::Little, Segment::Distal);
    pub const LITTLE_LAT: Self = Self::new(Digit::Little, Segment::Lateral);

    /// Flexion joints of a digit, base to tip. The thumb has two.
    pub fn flexion_chain(digit: Digit) -> &'static [Joint] {
        match digit {
            Digit::Thumb => &[Self::THUMB_PROX, Self::THUMB_DIST],
            Digit::Index => &[Self::INDEX_PROX, Self::INDEX_MED, Self::INDEX_DIST],
            Digit::Middle => &[Self::MIDDLE_PROX, Self::MIDDLE_MED, Self::MIDDLE_DIST],
            Digit::Ring => &[Self::RING_PROX, Self::RING_MED, Self::RING_DIST],
            Digit::Little => &[Self::LITTLE_PROX, Self::LITTLE_MED, Self::LITTLE_DIST],
        }
    }

    pub fn is_lateral(self) -> bool {
        self.segment == Segment::Lateral
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}_{}",
            self.digit.number(),
            self.segment.abbreviation()
        )
    }
}

impl FromStr for Joint {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || MapError::UnknownJointName(s.to_string());
        let (digit, segment) = s.split_once('_').ok_or_else(unknown)?;
        if digit.len() != 2 || !digit.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown());
        }
        let digit = digit
            .parse::<u8>()
            .ok()
            .and_then(Digit::from_number)
            .ok_or_else(unknown)?;
        let segment = Segment::from_abbreviation(segment).ok_or_else(unknown)?;
        Ok(Self::new(digit, segment))
    }
}

impl Serialize for Joint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Joint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

//! Value types for chip addresses, PWM channels, and pulse counts.

use core::fmt;

/// 7-bit bus address of one PCA9685 expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// First board: finger flexion joints.
    pub const PRIMARY: Self = Self(0x40);
    /// Second board: thumb and lateral (spread) joints.
    pub const SECONDARY: Self = Self(0x41);

    /// Both boards, in initialization order.
    pub const ALL: [Self; 2] = [Self::PRIMARY, Self::SECONDARY];

    /// Returns `None` when `raw` does not fit in seven bits.
    pub const fn new(raw: u8) -> Option<Self> {
        if raw <= 0x7F { Some(Self(raw)) } else { None }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// One of the sixteen PWM outputs of a chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    pub const COUNT: u8 = 16;

    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    /// Every channel of a chip, lowest first.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).map(Self)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// 12-bit OFF count loaded into a channel. The ON count is always zero, so
/// this is the pulse width in ticks of the 4096-tick PWM period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PulseValue(u16);

impl PulseValue {
    pub const MAX: u16 = 0x0FFF;

    /// Rejects anything above [`PulseValue::MAX`].
    pub const fn new(ticks: u16) -> Option<Self> {
        if ticks <= Self::MAX {
            Some(Self(ticks))
        } else {
            None
        }
    }

    /// Keeps only the low 12 bits of `raw`.
    pub const fn masked(raw: u32) -> Self {
        Self((raw & Self::MAX as u32) as u16)
    }

    pub const fn ticks(self) -> u16 {
        self.0
    }

    pub const fn low_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn high_byte(self) -> u8 {
        (self.0 >> 8) as u8
    }
}

impl fmt::Display for PulseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for PulseValue {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(value)
    }
}

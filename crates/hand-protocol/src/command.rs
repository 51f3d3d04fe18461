//! Command opcodes and their positional joint layouts.

use core::fmt;

use bionic_hand_pca9685::PulseValue;

use crate::error::{ProtocolError, ProtocolResult};
use crate::joint::Joint;
use crate::preset::PositionPreset;

const FIRST_FINGER_PAIR: [Joint; 8] = [
    Joint::INDEX_PROX,
    Joint::INDEX_MED,
    Joint::INDEX_DIST,
    Joint::INDEX_LAT,
    Joint::MIDDLE_PROX,
    Joint::MIDDLE_MED,
    Joint::MIDDLE_DIST,
    Joint::MIDDLE_LAT,
];

const SECOND_FINGER_PAIR: [Joint; 8] = [
    Joint::RING_PROX,
    Joint::RING_MED,
    Joint::RING_DIST,
    Joint::RING_LAT,
    Joint::LITTLE_PROX,
    Joint::LITTLE_MED,
    Joint::LITTLE_DIST,
    Joint::LITTLE_LAT,
];

const THUMB: [Joint; 3] = [Joint::THUMB_PROX, Joint::THUMB_DIST, Joint::THUMB_LAT];

/// The three joint groups a command line can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `command1`: index then middle finger.
    FirstFingerPair,
    /// `command2`: ring then little finger.
    SecondFingerPair,
    /// `command3`: thumb proximal, distal, lateral.
    Thumb,
}

impl Opcode {
    pub const ALL: [Self; 3] = [Self::FirstFingerPair, Self::SecondFingerPair, Self::Thumb];

    pub const fn token(self) -> &'static str {
        match self {
            Self::FirstFingerPair => "command1",
            Self::SecondFingerPair => "command2",
            Self::Thumb => "command3",
        }
    }

    /// Bare-digit alias sent by some host scripts.
    pub const fn numeric_alias(self) -> &'static str {
        match self {
            Self::FirstFingerPair => "1",
            Self::SecondFingerPair => "2",
            Self::Thumb => "3",
        }
    }

    /// Joints addressed by each parameter position.
    pub const fn joints(self) -> &'static [Joint] {
        match self {
            Self::FirstFingerPair => &FIRST_FINGER_PAIR,
            Self::SecondFingerPair => &SECOND_FINGER_PAIR,
            Self::Thumb => &THUMB,
        }
    }

    pub const fn arity(self) -> usize {
        self.joints().len()
    }

    pub fn from_token(token: &str, accept_numeric: bool) -> Option<Self> {
        Self::ALL.into_iter().find(|op| {
            token == op.token() || (accept_numeric && token == op.numeric_alias())
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One parsed command line. Displays as the wire line, without terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    pulses: Vec<PulseValue>,
}

impl Command {
    /// # Errors
    ///
    /// Returns [`ProtocolError::WrongArity`] unless `pulses` holds exactly
    /// one value per joint of `opcode`.
    pub fn new(opcode: Opcode, pulses: Vec<PulseValue>) -> ProtocolResult<Self> {
        if pulses.len() != opcode.arity() {
            return Err(ProtocolError::WrongArity {
                opcode,
                expected: opcode.arity(),
                actual: pulses.len(),
            });
        }
        Ok(Self { opcode, pulses })
    }

    /// The command that moves `opcode`'s joints to their `preset` values.
    /// Returns `None` if the preset leaves any of those joints unset.
    pub fn from_preset(opcode: Opcode, preset: &PositionPreset) -> Option<Self> {
        let pulses = opcode
            .joints()
            .iter()
            .map(|&joint| preset.pulse(joint))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { opcode, pulses })
    }

    /// Same pulse on every joint of the group.
    pub fn uniform(opcode: Opcode, pulse: PulseValue) -> Self {
        Self {
            opcode,
            pulses: vec![pulse; opcode.arity()],
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn pulses(&self) -> &[PulseValue] {
        &self.pulses
    }

    /// Parameter positions paired with the joints they drive.
    pub fn assignments(&self) -> impl Iterator<Item = (Joint, PulseValue)> + '_ {
        self.opcode
            .joints()
            .iter()
            .copied()
            .zip(self.pulses.iter().copied())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.token())?;
        for pulse in &self.pulses {
            write!(f, ",{pulse}")?;
        }
        Ok(())
    }
}

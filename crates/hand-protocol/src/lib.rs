//! Joint model, servo routing, calibrated presets, and the ASCII command
//! protocol of the bionic hand.
//!
//! Everything here is pure data and parsing; nothing touches the bus. A
//! [`Command`] or [`PositionPreset`] resolves to `(chip, channel, pulse)`
//! triples through a [`ServoMap`], and the controller crate turns those
//! into register writes.
//!
//! The positional command groups are defined as lists of [`Joint`]s and
//! resolved through the same [`ServoMap`] as named presets, so there is a
//! single source of truth for the wiring.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod command;
pub mod error;
pub mod joint;
pub mod line;
pub mod parser;
pub mod preset;
pub mod servo_map;

pub use command::{Command, Opcode};
pub use error::{MapError, MapResult, PresetError, ProtocolError, ProtocolResult};
pub use joint::{Digit, Joint, Segment};
pub use line::{DEFAULT_MAX_LINE_LEN, LineAssembler};
pub use parser::{CommandParser, ParsePolicy, ParserConfig};
pub use preset::{BUILTIN_NAMES, PositionPreset, SERVO_MAX, SERVO_MID, SERVO_MIN};
pub use servo_map::{ChannelTarget, ServoMap, ServoMapEntry};

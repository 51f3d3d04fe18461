//! Command implementations for handctl

pub mod calibrate;
pub mod drive;

use bionic_hand_protocol::Joint;
use clap::{Subcommand, ValueEnum};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply command lines read from the serial port (or stdin)
    Serve {
        /// Serial port, overriding the configuration file
        #[arg(long, conflicts_with = "stdin")]
        port: Option<String>,
        /// Baud rate, overriding the configuration file
        #[arg(long, conflicts_with = "stdin")]
        baud: Option<u32>,
        /// Read command lines from standard input instead
        #[arg(long)]
        stdin: bool,
    },

    /// Apply a single command line, e.g. `command3,270,270,400`
    Send {
        line: String,
    },

    /// Move the hand to a named or ad-hoc position
    Preset {
        /// Built-in preset name (extended, spread, fist)
        #[arg(required_unless_present = "set", conflicts_with = "set")]
        name: Option<String>,
        /// Joint assignments, e.g. `02_dist=300,01_lat=260`
        #[arg(long)]
        set: Option<String>,
    },

    /// List the built-in presets
    Presets {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Run a calibration or test routine
    Calibrate {
        #[arg(value_enum)]
        routine: Routine,
        /// Repetitions; 0 repeats until Ctrl-C
        #[arg(long, default_value_t = 1)]
        cycles: u32,
        /// Joint for the sweep routine
        #[arg(long, default_value = "02_dist")]
        joint: Joint,
        /// Finger number (1 = thumb) for the finger routine
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=5))]
        finger: u8,
    },
}

impl Commands {
    /// Whether the command can run without touching the servo bus.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Presets { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Routine {
    /// Alternate between the extended and fist presets
    Poses,
    /// Drive the lateral joints to their limits
    Limits,
    /// Sweep one joint across its range
    Sweep,
    /// Open, close and open one finger
    Finger,
    /// Finger routine for every digit in turn
    Fingers,
    /// Whole-hand close/open through protocol lines
    Sequence,
    /// Read MODE1 from both chips
    Probe,
}

impl Routine {
    pub fn name(self) -> &'static str {
        match self {
            Self::Poses => "poses",
            Self::Limits => "limits",
            Self::Sweep => "sweep",
            Self::Finger => "finger",
            Self::Fingers => "fingers",
            Self::Sequence => "sequence",
            Self::Probe => "probe",
        }
    }
}

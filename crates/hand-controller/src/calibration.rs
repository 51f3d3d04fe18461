//! Bench routines for checking servo wiring and travel.
//!
//! Every routine runs a bounded number of cycles (or until cancelled), checks
//! the cancel token before each move, and returns a [`RoutineReport`].

use bionic_hand_pca9685::{PulseValue, RegisterBus};
use bionic_hand_protocol::{
    Command, Digit, Joint, Opcode, PositionPreset, SERVO_MAX, SERVO_MID, SERVO_MIN,
};
use embedded_hal::delay::DelayNs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::controller::{HandController, LineOutcome, ProbeResult};
use crate::error::ControllerResult;

/// How many cycles a routine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iterations {
    Count(u32),
    UntilCancelled,
}

impl Iterations {
    fn allows(self, completed: u32) -> bool {
        match self {
            Self::Count(n) => completed < n,
            Self::UntilCancelled => true,
        }
    }
}

/// Timings, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Hold time after each pose, limit, or finger move.
    pub step_delay_ms: u32,
    /// Hold time per step of a single-joint sweep.
    pub sweep_delay_ms: u32,
    /// Pulse increment of a single-joint sweep.
    pub sweep_step: u16,
    /// Gap between fingers in the all-fingers test.
    pub finger_gap_ms: u32,
    /// Hold time of each hand shape in the sequence test.
    pub sequence_hold_ms: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: 500,
            sweep_delay_ms: 50,
            sweep_step: 5,
            finger_gap_ms: 1000,
            sequence_hold_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutineReport {
    /// Fully completed cycles.
    pub cycles: u32,
    /// Channel writes issued.
    pub writes: usize,
    pub cancelled: bool,
}

/// Runs routines against a controller that has already been initialized.
pub struct Calibrator<'a, B, D> {
    hand: &'a mut HandController<B, D>,
    config: CalibrationConfig,
    cancel: CancelToken,
    report: RoutineReport,
}

impl<'a, B: RegisterBus, D: DelayNs> Calibrator<'a, B, D> {
    pub fn new(
        hand: &'a mut HandController<B, D>,
        config: CalibrationConfig,
        cancel: CancelToken,
    ) -> Self {
        Self {
            hand,
            config,
            cancel,
            report: RoutineReport::default(),
        }
    }

    /// Alternates between the extended and fist presets.
    ///
    /// # Errors
    ///
    /// Stops at the first driver failure.
    pub fn pose_cycle(&mut self, iterations: Iterations) -> ControllerResult<RoutineReport> {
        let poses = [PositionPreset::extended(), PositionPreset::fist()];
        let hold = self.config.step_delay_ms;
        self.run("poses", iterations, |cal| {
            for pose in &poses {
                if !cal.preset(pose)? || !cal.hold(hold) {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    /// Moves the finger lateral joints to the centre, then to the minimum.
    /// The thumb lateral is left where it is.
    ///
    /// # Errors
    ///
    /// Stops at the first driver failure.
    pub fn joint_limits(&mut self, iterations: Iterations) -> ControllerResult<RoutineReport> {
        let laterals: Vec<Joint> = self
            .hand
            .map()
            .joints()
            .filter(|j| j.is_lateral() && j.digit != Digit::Thumb)
            .collect();
        let hold = self.config.step_delay_ms;
        self.run("limits", iterations, |cal| {
            for ticks in [SERVO_MID, SERVO_MIN] {
                if !cal.joints(&laterals, ticks)? || !cal.hold(hold) {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    /// Steps one joint from the minimum to the maximum, then parks it at
    /// the centre.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Map`](crate::ControllerError::Map) for an
    /// unmapped joint, or the first driver failure.
    pub fn sweep(&mut self, joint: Joint, iterations: Iterations) -> ControllerResult<RoutineReport> {
        self.hand.map().resolve(joint)?;
        let step = usize::from(self.config.sweep_step.max(1));
        let hold = self.config.sweep_delay_ms;
        self.run("sweep", iterations, |cal| {
            for ticks in (SERVO_MIN..=SERVO_MAX).step_by(step) {
                if !cal.joints(&[joint], ticks)? || !cal.hold(hold) {
                    return Ok(false);
                }
            }
            cal.joints(&[joint], SERVO_MID)
        })
    }

    /// Opens, closes, and reopens the flexion joints of one digit.
    ///
    /// # Errors
    ///
    /// Stops at the first driver failure.
    pub fn finger(&mut self, digit: Digit, iterations: Iterations) -> ControllerResult<RoutineReport> {
        let hold = self.config.step_delay_ms;
        self.run("finger", iterations, |cal| cal.flex(digit, hold))
    }

    /// Runs the finger test on every digit, thumb first.
    ///
    /// # Errors
    ///
    /// Stops at the first driver failure.
    pub fn fingers(&mut self, iterations: Iterations) -> ControllerResult<RoutineReport> {
        let hold = self.config.step_delay_ms;
        let gap = self.config.finger_gap_ms;
        self.run("fingers", iterations, |cal| {
            for digit in Digit::ALL {
                if !cal.flex(digit, hold)? || !cal.hold(gap) {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    /// Closes then opens the whole hand by feeding wire-format lines
    /// through the command parser.
    ///
    /// # Errors
    ///
    /// Stops at the first driver failure.
    pub fn sequence(&mut self, iterations: Iterations) -> ControllerResult<RoutineReport> {
        let shapes: Vec<Vec<String>> = [SERVO_MAX, SERVO_MIN]
            .into_iter()
            .map(|ticks| {
                Opcode::ALL
                    .iter()
                    .map(|&op| Command::uniform(op, PulseValue::masked(u32::from(ticks))).to_string())
                    .collect()
            })
            .collect();
        let hold = self.config.sequence_hold_ms;
        self.run("sequence", iterations, |cal| {
            for lines in &shapes {
                for line in lines {
                    if !cal.line(line)? {
                        return Ok(false);
                    }
                }
                if !cal.hold(hold) {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    /// Reads MODE1 from every chip.
    pub fn probe(&mut self) -> Vec<ProbeResult> {
        self.hand.probe()
    }

    fn run(
        &mut self,
        routine: &'static str,
        iterations: Iterations,
        mut cycle: impl FnMut(&mut Self) -> ControllerResult<bool>,
    ) -> ControllerResult<RoutineReport> {
        self.report = RoutineReport::default();
        info!(routine, ?iterations, "calibration routine started");
        while iterations.allows(self.report.cycles) {
            if self.cancel.is_cancelled() || !cycle(self)? {
                self.report.cancelled = true;
                break;
            }
            self.report.cycles += 1;
            debug!(routine, cycle = self.report.cycles, "cycle complete");
        }
        info!(
            routine,
            cycles = self.report.cycles,
            writes = self.report.writes,
            cancelled = self.report.cancelled,
            "calibration routine finished"
        );
        Ok(self.report)
    }

    /// `false` once cancelled.
    fn preset(&mut self, preset: &PositionPreset) -> ControllerResult<bool> {
        if self.cancel.is_cancelled() {
            return Ok(false);
        }
        let applied = self.hand.apply_preset(preset)?.applied;
        self.report.writes += applied;
        Ok(true)
    }

    fn joints(&mut self, joints: &[Joint], ticks: u16) -> ControllerResult<bool> {
        if self.cancel.is_cancelled() {
            return Ok(false);
        }
        let pulse = PulseValue::masked(u32::from(ticks));
        for &joint in joints {
            self.hand.set_joint(joint, pulse)?;
            self.report.writes += 1;
        }
        Ok(true)
    }

    fn line(&mut self, line: &str) -> ControllerResult<bool> {
        if self.cancel.is_cancelled() {
            return Ok(false);
        }
        if let LineOutcome::Applied(opcode) = self.hand.handle_line(line)? {
            self.report.writes += opcode.arity();
        }
        Ok(true)
    }

    fn flex(&mut self, digit: Digit, hold: u32) -> ControllerResult<bool> {
        let chain = Joint::flexion_chain(digit);
        for ticks in [SERVO_MIN, SERVO_MAX, SERVO_MIN] {
            if !self.joints(chain, ticks)? || !self.hold(hold) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn hold(&mut self, ms: u32) -> bool {
        self.hand.pause_ms(ms);
        !self.cancel.is_cancelled()
    }
}

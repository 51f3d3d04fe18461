//! Calibration and test routines

use anyhow::Result;
use bionic_hand_controller::{
    CalibrationConfig, Calibrator, CancelToken, HandController, Iterations,
};
use bionic_hand_pca9685::RegisterBus;
use bionic_hand_protocol::{Digit, Joint};
use embedded_hal::delay::DelayNs;
use tracing::warn;

use crate::commands::Routine;
use crate::error::CliError;
use crate::output;

pub struct RoutineArgs {
    pub routine: Routine,
    pub cycles: u32,
    pub joint: Joint,
    pub finger: u8,
}

impl RoutineArgs {
    fn iterations(&self) -> Iterations {
        match self.cycles {
            0 => Iterations::UntilCancelled,
            n => Iterations::Count(n),
        }
    }

    fn digit(&self) -> Result<Digit, CliError> {
        Digit::from_number(self.finger).ok_or_else(|| {
            CliError::InvalidConfiguration(format!("no finger numbered {}", self.finger))
        })
    }
}

pub fn execute<B: RegisterBus, D: DelayNs>(
    hand: &mut HandController<B, D>,
    config: CalibrationConfig,
    cancel: &CancelToken,
    args: &RoutineArgs,
) -> Result<()> {
    match hand.init() {
        // A dead chip is what probing is for; report it instead of failing.
        Err(e) if args.routine == Routine::Probe => {
            warn!(error = %e, "bring-up failed, probing anyway");
        }
        result => result.map_err(CliError::from)?,
    }

    let iterations = args.iterations();
    let mut calibrator = Calibrator::new(hand, config, cancel.clone());
    let report = match args.routine {
        Routine::Poses => calibrator.pose_cycle(iterations),
        Routine::Limits => calibrator.joint_limits(iterations),
        Routine::Sweep => calibrator.sweep(args.joint, iterations),
        Routine::Finger => calibrator.finger(args.digit()?, iterations),
        Routine::Fingers => calibrator.fingers(iterations),
        Routine::Sequence => calibrator.sequence(iterations),
        Routine::Probe => {
            output::print_probe(&calibrator.probe());
            return Ok(());
        }
    }
    .map_err(CliError::from)?;
    output::print_routine_report(args.routine.name(), &report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bionic_hand_pca9685::DeviceAddress;
    use bionic_hand_pca9685::mock::{MockBus, NoopDelay};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn args(routine: Routine, cycles: u32) -> RoutineArgs {
        RoutineArgs {
            routine,
            cycles,
            joint: Joint::INDEX_DIST,
            finger: 2,
        }
    }

    #[test]
    fn test_zero_cycles_means_until_cancelled() {
        assert_eq!(args(Routine::Poses, 0).iterations(), Iterations::UntilCancelled);
        assert_eq!(args(Routine::Poses, 3).iterations(), Iterations::Count(3));
    }

    #[test]
    fn test_finger_number_maps_to_digit() -> TestResult {
        let mut a = args(Routine::Finger, 1);
        a.finger = 1;
        assert_eq!(a.digit()?, Digit::Thumb);
        a.finger = 9;
        assert!(a.digit().is_err());
        Ok(())
    }

    #[test]
    fn test_sweep_runs_on_simulated_bus() -> TestResult {
        let mut hand = HandController::standard(MockBus::new(), NoopDelay::new());
        execute(
            &mut hand,
            CalibrationConfig::default(),
            &CancelToken::new(),
            &args(Routine::Sweep, 1),
        )?;
        let target = hand.map().resolve(Joint::INDEX_DIST)?;
        assert_eq!(
            hand.driver().bus().channel_pulse(target.address, target.channel).ticks(),
            325
        );
        Ok(())
    }

    #[test]
    fn test_probe_tolerates_offline_chip() -> TestResult {
        let bus = MockBus::new().with_offline(DeviceAddress::SECONDARY);
        let mut hand = HandController::standard(bus, NoopDelay::new());
        execute(
            &mut hand,
            CalibrationConfig::default(),
            &CancelToken::new(),
            &args(Routine::Probe, 1),
        )?;
        Ok(())
    }
}

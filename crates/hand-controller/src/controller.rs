//! Preset and command application.
//!
//! The controller owns the driver and the routing table and is the only
//! place where joints turn into register writes.

use bionic_hand_pca9685::{DeviceAddress, DriverError, PulseValue, PwmDriver, RegisterBus};
use bionic_hand_protocol::{
    ChannelTarget, Command, CommandParser, Joint, Opcode, PositionPreset, ProtocolError, ServoMap,
};
use embedded_hal::delay::DelayNs;
use tracing::{debug, error, info, warn};

use crate::error::{ControllerError, ControllerResult};

/// What happened to one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Applied(Opcode),
    /// Malformed line; nothing was written.
    Discarded(ProtocolError),
}

/// Joints written and skipped by [`HandController::apply_preset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetReport {
    pub applied: usize,
    pub skipped: Vec<Joint>,
}

/// Result of reading MODE1 from one chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub address: DeviceAddress,
    pub mode1: Result<u8, DriverError>,
}

impl ProbeResult {
    /// A chip counts as responsive when it answers with a non-zero MODE1.
    pub fn is_responsive(&self) -> bool {
        matches!(self.mode1, Ok(mode) if mode != 0)
    }
}

pub struct HandController<B, D> {
    driver: PwmDriver<B, D>,
    map: ServoMap,
    parser: CommandParser,
}

impl<B: RegisterBus, D: DelayNs> HandController<B, D> {
    pub fn new(driver: PwmDriver<B, D>, map: ServoMap, parser: CommandParser) -> Self {
        Self {
            driver,
            map,
            parser,
        }
    }

    /// Standard wiring, strict parser, default driver timing.
    pub fn standard(bus: B, delay: D) -> Self {
        Self::new(
            PwmDriver::new(bus, delay),
            ServoMap::standard(),
            CommandParser::strict(),
        )
    }

    /// Brings up every chip the map references, lowest address first.
    ///
    /// # Errors
    ///
    /// Stops at the first chip that fails to initialize.
    pub fn init(&mut self) -> ControllerResult<()> {
        for address in self.map.addresses() {
            self.driver.init(address).inspect_err(|e| {
                error!(%address, error = %e, "PWM expander bring-up failed");
            })?;
        }
        info!(joints = self.map.len(), "hand controller ready");
        Ok(())
    }

    /// Writes every joint of `preset`. Joints missing from the map are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Stops at the first driver failure; joints before it stay applied.
    pub fn apply_preset(&mut self, preset: &PositionPreset) -> ControllerResult<PresetReport> {
        let mut report = PresetReport::default();
        for &(joint, pulse) in preset.entries() {
            let target = match self.map.resolve(joint) {
                Ok(target) => target,
                Err(e) => {
                    warn!(preset = preset.name(), error = %e, "skipping joint");
                    report.skipped.push(joint);
                    continue;
                }
            };
            self.write(target, pulse)?;
            report.applied += 1;
        }
        debug!(
            preset = preset.name(),
            applied = report.applied,
            skipped = report.skipped.len(),
            "preset applied"
        );
        Ok(report)
    }

    /// Writes every joint of `command`.
    ///
    /// All targets are resolved before the first write, so an unmapped
    /// joint leaves the hand untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Map`] if any joint is unmapped, or the
    /// first driver failure.
    pub fn apply_command(&mut self, command: &Command) -> ControllerResult<()> {
        let writes = command
            .assignments()
            .map(|(joint, pulse)| Ok((self.map.resolve(joint)?, pulse)))
            .collect::<ControllerResult<Vec<_>>>()?;
        for (target, pulse) in writes {
            self.write(target, pulse)?;
        }
        debug!(opcode = %command.opcode(), "command applied");
        Ok(())
    }

    /// Parses and applies one line. Malformed lines are discarded without
    /// touching the bus.
    ///
    /// # Errors
    ///
    /// Only for failures while applying a well-formed command.
    pub fn handle_line(&mut self, line: &str) -> ControllerResult<LineOutcome> {
        let command = match self.parser.parse(line) {
            Ok(command) => command,
            Err(e) => {
                warn!(line, error = %e, "discarding command line");
                return Ok(LineOutcome::Discarded(e));
            }
        };
        self.apply_command(&command)?;
        Ok(LineOutcome::Applied(command.opcode()))
    }

    /// # Errors
    ///
    /// Returns [`ControllerError::Map`] for an unmapped joint, or the driver
    /// failure.
    pub fn set_joint(&mut self, joint: Joint, pulse: PulseValue) -> ControllerResult<()> {
        let target = self.map.resolve(joint)?;
        self.write(target, pulse)
    }

    /// Reads MODE1 from every mapped chip.
    pub fn probe(&mut self) -> Vec<ProbeResult> {
        self.map
            .addresses()
            .into_iter()
            .map(|address| {
                let mode1 = self.driver.read_mode1(address);
                match &mode1 {
                    Ok(mode) => info!(%address, mode1 = *mode, "chip answered"),
                    Err(e) => warn!(%address, error = %e, "chip did not answer"),
                }
                ProbeResult { address, mode1 }
            })
            .collect()
    }

    pub fn pause_ms(&mut self, ms: u32) {
        self.driver.pause_ms(ms);
    }

    pub fn map(&self) -> &ServoMap {
        &self.map
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    pub fn driver(&self) -> &PwmDriver<B, D> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut PwmDriver<B, D> {
        &mut self.driver
    }

    pub fn into_driver(self) -> PwmDriver<B, D> {
        self.driver
    }

    fn write(&mut self, target: ChannelTarget, pulse: PulseValue) -> ControllerResult<()> {
        self.driver
            .set_channel(target.address, target.channel, pulse)
            .map_err(ControllerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bionic_hand_pca9685::mock::{MockBus, NoopDelay};
    use bionic_hand_protocol::{Digit, Segment};

    fn ready() -> ControllerResult<HandController<MockBus, NoopDelay>> {
        let mut hand = HandController::standard(MockBus::new(), NoopDelay::new());
        hand.init()?;
        hand.driver_mut().bus_mut().clear_log();
        Ok(hand)
    }

    #[test]
    fn test_init_brings_up_both_chips() -> ControllerResult<()> {
        let hand = ready()?;
        for address in DeviceAddress::ALL {
            assert_eq!(
                hand.driver().state(address),
                bionic_hand_pca9685::ChipState::Running
            );
        }
        Ok(())
    }

    #[test]
    fn test_apply_preset_skips_unmapped_joints() -> ControllerResult<()> {
        let mut hand = ready()?;
        let thumb_med = Joint::new(Digit::Thumb, Segment::Medial);
        let preset = PositionPreset::new("probe")
            .with(thumb_med, PulseValue::masked(300))
            .with(Joint::THUMB_LAT, PulseValue::masked(260));

        let report = hand.apply_preset(&preset)?;
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, vec![thumb_med]);
        assert_eq!(hand.driver().bus().channel_writes().len(), 1);
        Ok(())
    }

    #[test]
    fn test_malformed_line_writes_nothing() -> ControllerResult<()> {
        let mut hand = ready()?;
        let outcome = hand.handle_line("command1,1,2,3")?;
        assert!(matches!(
            outcome,
            LineOutcome::Discarded(ProtocolError::WrongArity { .. })
        ));
        assert!(hand.driver().bus().ops().is_empty());
        Ok(())
    }

    #[test]
    fn test_command_with_unmapped_joint_writes_nothing() -> ControllerResult<()> {
        // Map without the little finger.
        let map = ServoMap::new(
            ServoMap::standard()
                .entries()
                .filter(|e| e.joint.digit != Digit::Little),
        )?;
        let mut hand = HandController::new(
            PwmDriver::new(MockBus::new(), NoopDelay::new()),
            map,
            CommandParser::strict(),
        );
        hand.init()?;
        hand.driver_mut().bus_mut().clear_log();

        let result = hand.handle_line("command2,1,2,3,4,5,6,7,8");
        assert!(matches!(
            result,
            Err(ControllerError::Map(bionic_hand_protocol::MapError::UnknownJoint(j))) if j == Joint::LITTLE_PROX
        ));
        assert!(hand.driver().bus().ops().is_empty());
        Ok(())
    }

    #[test]
    fn test_set_joint_before_init_fails_fast() {
        let mut hand = HandController::standard(MockBus::new(), NoopDelay::new());
        let result = hand.set_joint(Joint::INDEX_DIST, PulseValue::masked(300));
        assert!(matches!(
            result,
            Err(ControllerError::Driver(DriverError::NotRunning { .. }))
        ));
    }

    #[test]
    fn test_probe_reports_each_chip() -> ControllerResult<()> {
        let mut hand = HandController::standard(
            MockBus::new().with_offline(DeviceAddress::SECONDARY),
            NoopDelay::new(),
        );
        hand.driver_mut().init(DeviceAddress::PRIMARY)?;
        let results = hand.probe();
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|r| r.address == DeviceAddress::PRIMARY && r.is_responsive()));
        assert!(results.iter().any(|r| r.address == DeviceAddress::SECONDARY && !r.is_responsive()));
        Ok(())
    }
}

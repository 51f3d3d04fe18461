//! Commands that move the hand: serve, send and preset.

use std::io;

use anyhow::Result;
use bionic_hand_controller::{
    CancelToken, DEFAULT_POLL_INTERVAL, HandController, LineOutcome, PolledReader, run_session,
};
use bionic_hand_pca9685::RegisterBus;
use bionic_hand_protocol::PositionPreset;
use embedded_hal::delay::DelayNs;
use tracing::info;

use crate::config::HandConfig;
use crate::error::CliError;
use crate::hardware;
use crate::output;

pub fn serve<B: RegisterBus, D: DelayNs>(
    hand: &mut HandController<B, D>,
    config: &HandConfig,
    cancel: &CancelToken,
    source: ServeSource<'_>,
) -> Result<()> {
    hand.init().map_err(CliError::from)?;
    let session = config.session_config();
    let stats = match source {
        ServeSource::Stdin => {
            // Stdin has no read timeout; poll it so Ctrl-C is seen while idle.
            let reader = PolledReader::spawn(io::stdin(), DEFAULT_POLL_INTERVAL)?;
            run_session(reader, hand, &session, cancel)
        }
        ServeSource::Serial { port, baud } => {
            let reader = hardware::open_serial(&config.serial, port, baud)?;
            run_session(reader, hand, &session, cancel)
        }
    }
    .map_err(CliError::from)?;
    output::print_session_stats(&stats);
    Ok(())
}

pub enum ServeSource<'a> {
    Stdin,
    Serial {
        port: Option<&'a str>,
        baud: Option<u32>,
    },
}

pub fn send<B: RegisterBus, D: DelayNs>(hand: &mut HandController<B, D>, line: &str) -> Result<()> {
    hand.init().map_err(CliError::from)?;
    match hand.handle_line(line).map_err(CliError::from)? {
        LineOutcome::Applied(opcode) => {
            info!(%opcode, "command applied");
            Ok(())
        }
        LineOutcome::Discarded(err) => Err(CliError::MalformedCommand(err).into()),
    }
}

pub fn preset<B: RegisterBus, D: DelayNs>(
    hand: &mut HandController<B, D>,
    name: Option<&str>,
    assignments: Option<&str>,
) -> Result<()> {
    let preset = resolve_preset(name, assignments)?;
    hand.init().map_err(CliError::from)?;
    let report = hand.apply_preset(&preset).map_err(CliError::from)?;
    output::print_preset_report(preset.name(), &report);
    Ok(())
}

pub fn presets(json: bool) -> Result<()> {
    output::print_presets(&PositionPreset::builtins(), json)
}

fn resolve_preset(name: Option<&str>, assignments: Option<&str>) -> Result<PositionPreset, CliError> {
    match (name, assignments) {
        (_, Some(assignments)) => Ok(PositionPreset::parse_assignments("custom", assignments)?),
        (Some(name), None) => PositionPreset::builtin(name)
            .ok_or_else(|| CliError::UnknownPreset(name.to_string())),
        (None, None) => Err(CliError::InvalidConfiguration(
            "a preset name or --set is required".into(),
        )),
    }
}

//! handctl - Bionic hand servo control CLI
//!
//! Drives the two PCA9685 expanders of the hand from command lines, named
//! presets and calibration routines, on hardware or against a simulated bus.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod config;
mod error;
mod hardware;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use bionic_hand_controller::{CancelToken, HandController};
use bionic_hand_pca9685::mock::{MockBus, NoopDelay};
use bionic_hand_pca9685::{PwmDriver, RegisterBus, StdDelay};
use bionic_hand_protocol::{CommandParser, ServoMap};
use clap::Parser;
use embedded_hal::delay::DelayNs;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Commands;
use crate::commands::calibrate::RoutineArgs;
use crate::commands::drive::ServeSource;
use crate::config::HandConfig;
use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "handctl")]
#[command(about = "Bionic hand servo control CLI")]
#[command(version)]
#[command(long_about = "
handctl drives the servos of a bionic hand through two PCA9685 PWM
expanders on one I2C bus. Joints are moved by protocol lines such as
`command3,270,270,400`, by named presets, or by calibration routines.

Use --simulate to run any command against an in-memory bus and print the
resulting channel pulses instead of touching hardware.
")]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true, env = "HANDCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory bus instead of the I2C device
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("handctl={log_level},bionic_hand={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error_human(&e);
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    let config = HandConfig::load(cli.config.as_deref())?;
    debug!(?config, "effective configuration");

    if cli.command.is_offline() {
        return run(&cli.command, None::<&mut HandController<MockBus, NoopDelay>>, &config);
    }

    if cli.simulate {
        let mut hand = build_hand(MockBus::new(), NoopDelay::new(), &config);
        let result = run(&cli.command, Some(&mut hand), &config);
        output::print_simulated_channels(hand.driver().bus(), hand.map());
        result
    } else {
        let bus = hardware::open_i2c(&config.i2c_device)?;
        let mut hand = build_hand(bus, StdDelay, &config);
        run(&cli.command, Some(&mut hand), &config)
    }
}

fn build_hand<B: RegisterBus, D: DelayNs>(
    bus: B,
    delay: D,
    config: &HandConfig,
) -> HandController<B, D> {
    HandController::new(
        PwmDriver::new(bus, delay),
        ServoMap::standard(),
        CommandParser::new(config.parser_config()),
    )
}

/// Ctrl-C trips the returned token so long-running commands wind down.
fn install_cancel_handler() -> CancelToken {
    let token = CancelToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
    token
}

fn run<B: RegisterBus, D: DelayNs>(
    command: &Commands,
    hand: Option<&mut HandController<B, D>>,
    config: &HandConfig,
) -> Result<()> {
    let hand = match (command, hand) {
        (Commands::Presets { json }, _) => return commands::drive::presets(*json),
        (_, Some(hand)) => hand,
        (_, None) => {
            return Err(CliError::HardwareUnavailable("no servo bus available".into()).into());
        }
    };

    match command {
        Commands::Serve { port, baud, stdin } => {
            let source = if *stdin {
                ServeSource::Stdin
            } else {
                ServeSource::Serial {
                    port: port.as_deref(),
                    baud: *baud,
                }
            };
            commands::drive::serve(hand, config, &install_cancel_handler(), source)
        }
        Commands::Send { line } => commands::drive::send(hand, line),
        Commands::Preset { name, set } => {
            commands::drive::preset(hand, name.as_deref(), set.as_deref())
        }
        Commands::Presets { json } => commands::drive::presets(*json),
        Commands::Calibrate {
            routine,
            cycles,
            joint,
            finger,
        } => {
            let args = RoutineArgs {
                routine: *routine,
                cycles: *cycles,
                joint: *joint,
                finger: *finger,
            };
            commands::calibrate::execute(
                hand,
                config.calibration,
                &install_cancel_handler(),
                &args,
            )
        }
    }
}

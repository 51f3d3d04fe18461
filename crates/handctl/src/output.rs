//! Output formatting for handctl

use anyhow::Error;
use bionic_hand_controller::{PresetReport, ProbeResult, RoutineReport, SessionStats};
use bionic_hand_pca9685::mock::MockBus;
use bionic_hand_protocol::{PositionPreset, ServoMap};
use colored::*;

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

pub fn print_presets(presets: &[PositionPreset], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(presets)?);
        return Ok(());
    }
    for preset in presets {
        println!("{} ({} joints)", preset.name().bold(), preset.len());
        for (joint, pulse) in preset.entries() {
            println!("  {:<8} {:>4}", joint.to_string(), pulse.ticks());
        }
    }
    Ok(())
}

pub fn print_preset_report(name: &str, report: &PresetReport) {
    println!(
        "{} applied {} to {} joints",
        "✓".green(),
        name.bold(),
        report.applied
    );
    for joint in &report.skipped {
        println!("  {} {joint} has no servo, skipped", "!".yellow());
    }
}

pub fn print_session_stats(stats: &SessionStats) {
    println!(
        "{} lines: {} applied, {} discarded, {} too long, {} bus errors",
        stats.lines,
        stats.applied.to_string().green(),
        stats.discarded,
        stats.overflowed,
        stats.bus_errors.to_string().red()
    );
}

pub fn print_routine_report(routine: &str, report: &RoutineReport) {
    let status = if report.cancelled {
        "cancelled".yellow()
    } else {
        "done".green()
    };
    println!(
        "{routine}: {status} after {} cycles, {} channel writes",
        report.cycles, report.writes
    );
}

pub fn print_probe(results: &[ProbeResult]) {
    for result in results {
        match &result.mode1 {
            Ok(mode) if result.is_responsive() => {
                println!("  {} {} MODE1={mode:#04x}", "●".green(), result.address);
            }
            Ok(mode) => {
                println!(
                    "  {} {} MODE1={mode:#04x} (not configured)",
                    "●".yellow(),
                    result.address
                );
            }
            Err(e) => println!("  {} {} {e}", "●".red(), result.address),
        }
    }
}

/// Final pulse of every joint on the simulated bus.
pub fn print_simulated_channels(bus: &MockBus, map: &ServoMap) {
    println!("{}", "Simulated channels:".bold());
    for entry in map.entries() {
        let target = entry.target;
        let pulse = bus.channel_pulse(target.address, target.channel);
        println!(
            "  {:<8} {} {:<4} {:>4}",
            entry.joint.to_string(),
            target.address,
            target.channel.to_string(),
            pulse.ticks()
        );
    }
}

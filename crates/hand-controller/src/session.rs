//! Serial command session loop.
//!
//! One sequential flow: read bytes, assemble lines, apply each completed
//! line before reading more. Nothing else touches the driver while a
//! session runs, so bus access is serialized by construction.

use std::io::{ErrorKind, Read};

use bionic_hand_pca9685::RegisterBus;
use bionic_hand_protocol::{DEFAULT_MAX_LINE_LEN, LineAssembler, ProtocolError};
use embedded_hal::delay::DelayNs;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::controller::{HandController, LineOutcome};
use crate::error::{ControllerError, ControllerResult};

const READ_CHUNK: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Longest accepted command line, excluding the terminator.
    pub max_line_len: usize,
    /// Stop the session on the first hardware fault instead of counting it
    /// and reading on.
    pub halt_on_bus_error: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            halt_on_bus_error: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Completed lines, including dropped ones.
    pub lines: u64,
    pub applied: u64,
    /// Malformed lines.
    pub discarded: u64,
    /// Lines longer than the limit.
    pub overflowed: u64,
    /// Well-formed commands that failed at the driver.
    pub bus_errors: u64,
}

/// Line assembly plus dispatch, fed from any byte source.
pub struct Session<'a, B, D> {
    controller: &'a mut HandController<B, D>,
    lines: LineAssembler,
    config: SessionConfig,
    stats: SessionStats,
}

impl<'a, B: RegisterBus, D: DelayNs> Session<'a, B, D> {
    pub fn new(controller: &'a mut HandController<B, D>, config: SessionConfig) -> Self {
        Self {
            controller,
            lines: LineAssembler::new(config.max_line_len),
            config,
            stats: SessionStats::default(),
        }
    }

    /// Feeds received bytes, applying every line they complete.
    ///
    /// # Errors
    ///
    /// With `halt_on_bus_error`, returns the first hardware fault; bytes
    /// after the failing line are not processed.
    pub fn feed(&mut self, bytes: &[u8]) -> ControllerResult<()> {
        for &byte in bytes {
            if let Some(line) = self.lines.push(byte) {
                self.dispatch(line)?;
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    fn dispatch(&mut self, line: Result<String, ProtocolError>) -> ControllerResult<()> {
        self.stats.lines += 1;
        let line = match line {
            Ok(line) => line,
            Err(ProtocolError::LineTooLong { limit }) => {
                warn!(limit, "discarding over-long command line");
                self.stats.overflowed += 1;
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "discarding command line");
                self.stats.discarded += 1;
                return Ok(());
            }
        };

        match self.controller.handle_line(&line) {
            Ok(LineOutcome::Applied(_)) => self.stats.applied += 1,
            Ok(LineOutcome::Discarded(_)) => self.stats.discarded += 1,
            Err(e) => {
                error!(line = %line, error = %e, "command failed at the driver");
                self.stats.bus_errors += 1;
                if self.config.halt_on_bus_error {
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

fn is_idle(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}

/// Runs a command session until EOF or cancellation.
///
/// Read timeouts and interrupted reads count as idle time. The cancel token
/// is checked before and after every read, so a source with a read timeout
/// (a serial port, or a [`PolledReader`](crate::PolledReader)) is needed for
/// cancellation to take effect while the line is quiet.
///
/// # Errors
///
/// Returns a non-timeout I/O error from `reader`, or the first hardware
/// fault when `config.halt_on_bus_error` is set.
pub fn run_session<R, B, D>(
    mut reader: R,
    controller: &mut HandController<B, D>,
    config: &SessionConfig,
    cancel: &CancelToken,
) -> ControllerResult<SessionStats>
where
    R: Read,
    B: RegisterBus,
    D: DelayNs,
{
    let mut session = Session::new(controller, *config);
    let mut buf = [0u8; READ_CHUNK];
    info!(max_line_len = config.max_line_len, "command session started");

    while !cancel.is_cancelled() {
        let n = match reader.read(&mut buf) {
            Ok(0) => {
                debug!("command stream closed");
                break;
            }
            Ok(n) => n,
            Err(e) if is_idle(e.kind()) => continue,
            Err(e) => return Err(ControllerError::Io(e)),
        };
        // Bytes that arrive after cancellation are never applied.
        if cancel.is_cancelled() {
            debug!(bytes = n, "dropping input received after cancellation");
            break;
        }
        if let Err(e) = session.feed(buf.get(..n).unwrap_or_default()) {
            let stats = session.stats();
            error!(?stats, "command session halted");
            return Err(e);
        }
    }

    let stats = session.stats();
    info!(
        lines = stats.lines,
        applied = stats.applied,
        discarded = stats.discarded,
        overflowed = stats.overflowed,
        bus_errors = stats.bus_errors,
        cancelled = cancel.is_cancelled(),
        "command session ended"
    );
    Ok(stats)
}

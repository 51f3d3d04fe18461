//! Byte source adapter that turns a blocking reader into one with a read
//! timeout.
//!
//! Standard input has no read timeout, so a session on it would never get
//! back to its cancel check while the stream is quiet. [`PolledReader`]
//! moves the blocking reads onto a helper thread and hands the chunks over
//! a channel polled with `recv_timeout`.

use std::io::{self, ErrorKind, Read};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use tracing::debug;

const CHUNK: usize = 256;
const QUEUE_DEPTH: usize = 16;

/// Default wait before a quiet read reports [`ErrorKind::TimedOut`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct PolledReader {
    rx: Receiver<io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    offset: usize,
    poll: Duration,
}

impl PolledReader {
    /// Starts the helper thread reading from `inner`.
    ///
    /// The thread exits at EOF, on the first read error, or once the
    /// `PolledReader` is dropped and its next chunk has nowhere to go.
    ///
    /// # Errors
    ///
    /// Returns an error if the helper thread cannot be spawned.
    pub fn spawn<R>(inner: R, poll: Duration) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = channel::bounded(QUEUE_DEPTH);
        thread::Builder::new()
            .name("command-reader".into())
            .spawn(move || {
                let mut inner = inner;
                let mut buf = [0u8; CHUNK];
                loop {
                    let chunk = match inner.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => Ok(buf.get(..n).unwrap_or_default().to_vec()),
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => Err(e),
                    };
                    let failed = chunk.is_err();
                    if tx.send(chunk).is_err() || failed {
                        break;
                    }
                }
                debug!("command reader thread finished");
            })?;
        Ok(Self {
            rx,
            pending: Vec::new(),
            offset: 0,
            poll,
        })
    }
}

impl Read for PolledReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.offset >= self.pending.len() {
            self.pending = match self.rx.recv_timeout(self.poll) {
                Ok(chunk) => chunk?,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(io::Error::new(ErrorKind::TimedOut, "no input"));
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            };
            self.offset = 0;
        }
        let rest = self.pending.get(self.offset..).unwrap_or_default();
        let n = rest.len().min(buf.len());
        if let (Some(dst), Some(src)) = (buf.get_mut(..n), rest.get(..n)) {
            dst.copy_from_slice(src);
        }
        self.offset += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Never yields a byte until the test ends.
    struct Silent(Receiver<()>);

    impl Read for Silent {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _closed = self.0.recv();
            Ok(0)
        }
    }

    #[test]
    fn test_passes_bytes_through_then_eof() -> io::Result<()> {
        let mut reader = PolledReader::spawn(&b"command3,1,2,3\n"[..], DEFAULT_POLL_INTERVAL)?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        assert_eq!(out, b"command3,1,2,3\n");
        Ok(())
    }

    #[test]
    fn test_small_buffer_drains_chunk() -> io::Result<()> {
        let mut reader = PolledReader::spawn(&b"abcdef"[..], DEFAULT_POLL_INTERVAL)?;
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf)?, 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.read(&mut buf)?, 2);
        assert_eq!(buf.get(..2), Some(&b"ef"[..]));
        Ok(())
    }

    #[test]
    fn test_quiet_source_times_out() -> io::Result<()> {
        let (hold, release) = channel::bounded::<()>(0);
        let mut reader = PolledReader::spawn(Silent(release), Duration::from_millis(10))?;
        let err = reader.read(&mut [0u8; 8]).err().map(|e| e.kind());
        assert_eq!(err, Some(ErrorKind::TimedOut));
        drop(hold);
        Ok(())
    }
}

use std::io::{self, Write};

use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

/// Default filter when `RUST_LOG` isn't set.
const DEFAULT_LOG_FILTER: &str = "info";

/// Writer turning `\n` into `\r\n`.
///
/// Raw mode turns off output post-processing, so a bare `\n` would only move the cursor down.
pub struct CrlfWriter<W: Write>(W);

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (i, byte) in buf.iter().enumerate() {
            if *byte == b'\n' {
                self.0.write_all(&buf[start..i])?;
                self.0.write_all(b"\r\n")?;
                start = i + 1;
            }
        }
        self.0.write_all(&buf[start..])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Stderr, readable whether or not the terminal is in raw mode.
pub struct RawModeStderr;

impl<'a> MakeWriter<'a> for RawModeStderr {
    type Writer = CrlfWriter<io::StderrLock<'static>>;

    fn make_writer(&'a self) -> Self::Writer {
        CrlfWriter(io::stderr().lock())
    }
}

/// Installs the global subscriber, filtered by `RUST_LOG`.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(RawModeStderr)
        .init();
}

//! Log file setup.
//!
//! Events append to the engine's log file, unbuffered. A runaway engine
//! that logs more than a million events aborts with a message on
//! stderr: at that volume something is looping and the log is the only
//! witness.

use std::fs::File;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::LogSettings;

const MAX_LOG_EVENTS: u64 = 1_000_000;

/// Append-mode file writer that counts events and dies past the cap.
#[derive(Clone)]
struct LogWriter {
    file: Arc<File>,
    events: Arc<AtomicU64>,
}

struct FileHandle(Arc<File>);

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self.0).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self.0).flush()
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = FileHandle;

    fn make_writer(&'a self) -> Self::Writer {
        let n = self.events.fetch_add(1, Ordering::Relaxed);
        if n >= MAX_LOG_EVENTS {
            eprintln!("too many messages written to the log file (maximum {MAX_LOG_EVENTS})");
            std::process::exit(1);
        }
        FileHandle(Arc::clone(&self.file))
    }
}

/// Install the global subscriber writing to the configured file.
///
/// The filter comes from `TENGEN_LOG` when set, else from the config
/// level.
pub fn init(settings: &LogSettings) -> Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(&settings.file)
        .with_context(|| format!("cannot open log file {}", settings.file.display()))?;
    let writer = LogWriter {
        file: Arc::new(file),
        events: Arc::new(AtomicU64::new(0)),
    };
    let filter = EnvFilter::try_from_env("TENGEN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(settings.level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(())
}

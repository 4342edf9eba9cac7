// crates/trimline-ui/src/helpers/log.rs
//
// Installs the tracing subscriber for the binary.
//
// Release builds on Windows run without a console (`windows_subsystem`), so
// everything is also appended to a log file in the OS temp directory:
//
//   File: %TEMP%/trimline.log (or $TMPDIR) — append-only
//
// Filter: `RUST_LOG` when set, `info` otherwise.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("trimline.log")
}

/// Never panics; without a writable temp dir only stderr is used.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path())
        .ok()
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
}

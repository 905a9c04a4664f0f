//! Tracing setup
//!
//! `RUST_LOG` wins when set; otherwise `menusync=info` (`debug` with
//! `--verbose`). Logs go to stderr and, when a file is given, are appended to
//! it without colour.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FILE: &str = "app.log";

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "menusync=debug"
    } else {
        "menusync=info"
    }
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(verbose: bool, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let file_layer = log_file.and_then(open_log).map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init();
}

fn open_log(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return None;
        }
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

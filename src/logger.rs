//! Logger setup emitting messages based on severity levels.
//!
//! The library itself only logs through the [log] facade; binaries call
//! [init] once to install an [env_logger] backend with this crate's format.

use std::io::Write;
use std::{mem, time};

use log::{Level, LevelFilter, SetLoggerError};

/// Source of the log message.
const SOURCE: &str = "udpspoof";

/// Installs the global logger.
///
/// Messages at `default` and above are emitted; `RUST_LOG` overrides it. Each
/// line includes a local timestamp, the severity level, and the source of the
/// log (`udpspoof`).
///
/// # Errors
///
/// Returns an error if a global logger is already installed.
pub fn init(default: LevelFilter) -> Result<(), SetLoggerError> {
    env_logger::Builder::new()
        .filter_level(default)
        .parse_default_env()
        .format(|buf, record| {
            let level = match record.level() {
                Level::Error => "\x1b[1;31mERROR\x1b[0m",
                Level::Warn => "\x1b[1;33mWARN \x1b[0m",
                Level::Info => "\x1b[1;32mINFO \x1b[0m",
                Level::Debug => "\x1b[1;34mDEBUG\x1b[0m",
                Level::Trace => "\x1b[1;35mTRACE\x1b[0m",
            };

            writeln!(
                buf,
                "[\x1b[1;37m{}\x1b[0m] {level} [\x1b[1;37m{SOURCE}\x1b[0m] {}",
                timestamp(),
                record.args()
            )
        })
        .try_init()
}

/// Returns the local time formatted as `YYYY-MM-DD HH:MM:SS`.
fn timestamp() -> String {
    let now = time::SystemTime::now()
        .duration_since(time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as libc::time_t;

    // SAFETY: `tm` is plain old data, all zeroes is a valid value.
    let mut tm: libc::tm = unsafe { mem::zeroed() };

    if unsafe { libc::localtime_r(&now, &mut tm) }.is_null() {
        return "UNKNOWN".to_string();
    }

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        tm.tm_year + 1900,
        tm.tm_mon + 1,
        tm.tm_mday,
        tm.tm_hour,
        tm.tm_min,
        tm.tm_sec
    )
}

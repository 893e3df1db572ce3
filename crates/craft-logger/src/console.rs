//! Human-readable console mirror, distinct from the persisted JSON form.
//!
//! Error and Warn go to stderr, everything else to stdout, matching the
//! persisted split between the general and high-severity streams.

use chrono::Local;
use serde_json::Value;

use crate::level::LogLevel;

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const UNDERLINE: &str = "\x1b[4m";
const END: &str = "\x1b[0m";

fn color(text: &str, code: &str) -> String {
    format!("{code}{text}{END}")
}

/// Tag for a host-origin record: ` [module] ` or a single space.
pub(crate) fn host_tag(module: &str) -> String {
    if module.is_empty() {
        " ".to_string()
    } else {
        format!(" [{}] ", color(module, UNDERLINE))
    }
}

/// Tag for a client-origin record mirrored on the host: ` [window::module] `.
pub(crate) fn client_tag(window: &str, module: &str) -> String {
    format!(" [{}::{}] ", color(window, UNDERLINE), color(module, UNDERLINE))
}

pub(crate) fn mirror(level: LogLevel, tag: &str, message: &str, meta: &[Value]) {
    let label = match level {
        LogLevel::Error => color(&color("<ERROR>", RED), BOLD),
        LogLevel::Warn => color(&color("<WARN>", YELLOW), BOLD),
        LogLevel::Info => color(&color("<INFO>", GREEN), BOLD),
        LogLevel::Debug => color(&color("<DEBUG>", BLUE), BOLD),
        LogLevel::Verbose => color("<VERBOSE>", BOLD),
        LogLevel::Silly => color("<SILLY>", BOLD),
        LogLevel::None => return,
    };
    let timestamp = color(&Local::now().format("%H:%M:%S%.3f").to_string(), CYAN);

    let mut line = format!("{timestamp} {label}{tag}{message}");
    for item in meta {
        line.push(' ');
        line.push_str(&item.to_string());
    }

    if level.is_high_severity() {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

//! Minimal stderr logger for the command line tool.

use log::{Level, Log, Metadata, Record};

struct StderrLogger {
    level: Level,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("png_to_svg")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level().as_str().to_lowercase(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the logger. Verbose mode shows debug statistics, otherwise only
/// warnings and errors are printed.
pub fn init(verbose: bool) {
    let level = if verbose { Level::Debug } else { Level::Warn };
    let logger = Box::new(StderrLogger { level });
    // Only fails when a logger is already installed.
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level.to_level_filter());
    }
}

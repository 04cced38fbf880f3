use std::path::Path;

use flexi_logger::{DeferredNow, Duplicate, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Record};

//Minimal println like formatting for flexi_logger
pub fn default_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> core::result::Result<(), std::io::Error> {
    write!(
        w,
        "{}",
        record.args()
    )
}

/// `<timestamp> : <message>` lines for the log file
pub fn file_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> core::result::Result<(), std::io::Error> {
    write!(
        w,
        "{} : {}",
        now.format("%Y-%m-%d %H:%M:%S,%3f"),
        record.args()
    )
}

/// Starts the logger, must be called once before anything gets logged.
///
/// With a `log_path` everything is appended to that file and warnings are
/// repeated on stderr, otherwise all output goes to stderr. `RUST_LOG`
/// overrides the default level `info`.
pub fn init_logging(log_path: Option<&Path>) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_env_or_str("info")?
        .format_for_stderr(default_format);

    match log_path {
        Some(path) => logger
            .log_to_file(FileSpec::try_from(path)?)
            .append()
            .format_for_files(file_format)
            .duplicate_to_stderr(Duplicate::Warn)
            .start(),
        None => logger.log_to_stderr().start(),
    }
}

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{TimeZone, Utc};
use uuid::Uuid;

/// Turns a note title into something usable as a file name.
///
/// Control characters are removed and path separators are replaced, so that
/// a title can never point outside of the backup directory. Titles without
/// such characters are used as they are, because the result also serves as
/// the key that matches local files with remote notes.
pub fn file_stem_for_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !is_control_char(*c))
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

fn is_control_char(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{e}'..='\u{1f}' | '\u{7f}'..='\u{9f}')
}

pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string().to_uppercase()
}

/// Milliseconds since epoch, negative for times before 1970
pub fn system_time_to_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

pub fn millis_to_system_time(millis: i64) -> SystemTime {
    let offset = Duration::from_millis(millis.unsigned_abs());
    if millis >= 0 {
        UNIX_EPOCH + offset
    } else {
        UNIX_EPOCH - offset
    }
}

/// Human readable form of a millisecond timestamp, for log output only
pub fn display_millis(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(date) => date.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{}ms", millis),
    }
}

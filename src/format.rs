//! Human readable rendering of issues.
//!
//! [`print`] renders one issue at a given verbosity. The amount of detail
//! grows with the verbosity:
//!
//! | verbosity | adds |
//! |---|---|
//! | `> -3` | timestamp |
//! | `> -2` | severity |
//! | `> -1` | `[source position]` |
//! | any | message |
//! | `> 1` | parameters and qualifiers |
//! | `> 2` | host, user, process id, working directory |
//! | `> 3` | stack frames |
//!
//! The causal chain is always appended.

use core::fmt;

use chrono::format::{Item, StrftimeItems};
use ers_internals::keys;

use crate::{Issue, configuration::DEFAULT_TIMESTAMP_FORMAT};

const FIELD_SEPARATOR: &str = "\n\t";

/// Writes `issue` to `out` at the given verbosity.
///
/// `time_format` is a `strftime` format; an invalid one falls back to
/// [`DEFAULT_TIMESTAMP_FORMAT`].
pub fn print(
    out: &mut impl fmt::Write,
    issue: &Issue,
    verbosity: i32,
    time_format: &str,
) -> fmt::Result {
    if verbosity > -3
        && let Some(time) = issue.time()
    {
        write!(out, "{} ", time.format(checked_format(time_format)))?;
    }
    if verbosity > -2 {
        write!(out, "{} ", issue.severity())?;
    }
    if verbosity > -1 {
        let position = issue.value(keys::SOURCE_POSITION);
        match issue.values().get(keys::SOURCE_MODULE) {
            Some(module) if verbosity > 0 => write!(out, "[{module} at {position}] ")?,
            _ => write!(out, "[{position}] ")?,
        }
    }

    out.write_str(issue.message())?;

    if verbosity > 1 {
        write!(out, "{FIELD_SEPARATOR}Parameters = ")?;
        for (key, value) in issue.parameters() {
            write!(out, "'{key}={value}' ")?;
        }
        write!(out, "{FIELD_SEPARATOR}Qualifiers = ")?;
        for qualifier in issue.qualifiers() {
            write!(out, "'{qualifier}' ")?;
        }
    }

    if verbosity > 2 {
        write!(out, "{FIELD_SEPARATOR}host = {}", issue.value(keys::HOST_NAME))?;
        write!(out, "{FIELD_SEPARATOR}user = {}", issue.value(keys::USER_NAME))?;
        if let Some(uid) = issue.values().get(keys::USER_ID) {
            write!(out, " ({uid})")?;
        }
        write!(out, "{FIELD_SEPARATOR}process id = {}", issue.value(keys::PROCESS_ID))?;
        write!(out, "{FIELD_SEPARATOR}process wd = {}", issue.value(keys::PROCESS_PWD))?;
    }

    if verbosity > 3 {
        let frames = (0..)
            .map_while(|ordinal| issue.values().get(&keys::stack_frame(ordinal)))
            .enumerate();
        let mut frames = frames.peekable();
        if frames.peek().is_some() {
            write!(out, "{FIELD_SEPARATOR}stack trace of the raising thread:")?;
        }
        for (ordinal, frame) in frames {
            write!(out, "{FIELD_SEPARATOR}  #{ordinal:<3} {frame}")?;
        }
    }

    write_cause(out, issue)
}

/// The description of `issue` used by [`Issue::human_description`]: its
/// message followed by its causal chain.
pub fn describe(issue: &Issue) -> String {
    let mut description = issue.message().to_owned();
    // Writing into a String cannot fail.
    let _ = write_cause(&mut description, issue);
    description
}

fn write_cause(out: &mut impl fmt::Write, issue: &Issue) -> fmt::Result {
    match issue.cause() {
        Some(cause) => write!(out, "{FIELD_SEPARATOR}was caused by: {cause}"),
        None => match issue.values().get(keys::CAUSE_TEXT) {
            Some(text) => write!(out, "{FIELD_SEPARATOR}was caused by: {text}"),
            None => Ok(()),
        },
    }
}

fn checked_format(format: &str) -> &str {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        DEFAULT_TIMESTAMP_FORMAT
    } else {
        format
    }
}

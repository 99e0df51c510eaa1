//! String codecs for the derived attributes of an issue.
//!
//! Severity, responsibility and transience are never stored natively. They
//! are encoded into the value table when set and decoded from it on every
//! read, so the table stays the single source of truth. Decoding never fails:
//! strings that are not recognized decode to an explicit sentinel.

use core::{fmt, str::FromStr};

/// Severity of an issue, ordered from least to most severe.
///
/// [`Severity::Unknown`] is only produced when decoding a string that is not
/// one of the known tokens.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Debug message of level 0, shown by default.
    Debug0,
    /// Debug message of level 1.
    Debug1,
    /// Debug message of level 2.
    Debug2,
    /// Debug message of level 3, the most verbose.
    Debug3,
    /// Informational message.
    Information,
    /// Something unexpected that does not prevent the program from working.
    Warning,
    /// An error the program can recover from.
    Error,
    /// An error the program cannot recover from.
    Fatal,
    /// Decoding sentinel.
    Unknown,
}

impl Severity {
    /// All severities that own a slot in a routing table, in order.
    pub const ROUTED: [Severity; 8] = [
        Severity::Debug0,
        Severity::Debug1,
        Severity::Debug2,
        Severity::Debug3,
        Severity::Information,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Returns the debug severity of the given level, clamped to `0..=3`.
    pub const fn debug(level: u8) -> Self {
        match level {
            0 => Severity::Debug0,
            1 => Severity::Debug1,
            2 => Severity::Debug2,
            _ => Severity::Debug3,
        }
    }

    /// Returns the debug level if this is a debug severity.
    pub const fn debug_level(self) -> Option<u8> {
        match self {
            Severity::Debug0 => Some(0),
            Severity::Debug1 => Some(1),
            Severity::Debug2 => Some(2),
            Severity::Debug3 => Some(3),
            _ => None,
        }
    }

    /// Index of the routing slot for this severity.
    ///
    /// [`Severity::Unknown`] shares the slot of [`Severity::Error`].
    pub const fn slot(self) -> usize {
        match self {
            Severity::Debug0 => 0,
            Severity::Debug1 => 1,
            Severity::Debug2 => 2,
            Severity::Debug3 => 3,
            Severity::Information => 4,
            Severity::Warning => 5,
            Severity::Error | Severity::Unknown => 6,
            Severity::Fatal => 7,
        }
    }

    /// The string form stored in the value table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Debug0 => "debug_0",
            Severity::Debug1 => "debug_1",
            Severity::Debug2 => "debug_2",
            Severity::Debug3 => "debug_3",
            Severity::Information => "information",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
            Severity::Unknown => "unknown",
        }
    }

    /// Decodes a stored string, never failing.
    pub fn parse(value: &str) -> Self {
        Self::ROUTED
            .into_iter()
            .find(|s| s.as_str() == value)
            .unwrap_or(Severity::Unknown)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Which side is responsible for an issue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Responsibility {
    /// The caller violated a contract, for instance a precondition.
    Client,
    /// The callee failed to do its job.
    Server,
    /// Decoding sentinel, also the value of issues that never set one.
    Unknown,
}

impl Responsibility {
    /// The string form stored in the value table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Responsibility::Client => "client",
            Responsibility::Server => "server",
            Responsibility::Unknown => "unknown",
        }
    }

    /// Decodes a stored string, never failing.
    pub fn parse(value: &str) -> Self {
        match value {
            "client" => Responsibility::Client,
            "server" => Responsibility::Server,
            _ => Responsibility::Unknown,
        }
    }
}

impl fmt::Display for Responsibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encodes a transience flag.
pub const fn encode_transience(transient: bool) -> &'static str {
    if transient { "true" } else { "false" }
}

/// Decodes a transience flag; `None` means unknown.
pub fn decode_transience(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

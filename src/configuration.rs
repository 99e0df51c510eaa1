//! Process-wide settings.
//!
//! Every setting is resolved with the same precedence: a value set explicitly
//! (through the `with_*`/`set_*` methods or [`Configuration::update`]) wins
//! over the environment, which wins over the built-in default.
//!
//! # Environment Variables
//!
//! - `ERS_DEBUG_LEVEL` - Highest debug level that is dispatched (default `0`)
//! - `ERS_VERBOSITY_LEVEL` - Verbosity of console streams (default `0`)
//! - `ERS_STREAM_LIBS` - Colon separated list of plugin modules to load
//! - `ERS_DEBUG`, `ERS_INFO`, `ERS_WARNING`, `ERS_ERROR`, `ERS_FATAL` -
//!   Stream specification for the given severity
//! - `ERS_TIMESTAMP_FORMAT` - `strftime`-style format of printed timestamps
//!
//! Malformed numbers are reported with a warning and the default is kept.

use core::fmt;

use spin::{Once, RwLock};

use crate::Severity;

/// Environment variable holding the debug level.
pub const DEBUG_LEVEL_VAR: &str = "ERS_DEBUG_LEVEL";
/// Environment variable holding the verbosity level.
pub const VERBOSITY_LEVEL_VAR: &str = "ERS_VERBOSITY_LEVEL";
/// Environment variable holding the plugin module list.
pub const STREAM_LIBS_VAR: &str = "ERS_STREAM_LIBS";
/// Environment variable holding the timestamp format.
pub const TIMESTAMP_FORMAT_VAR: &str = "ERS_TIMESTAMP_FORMAT";

/// Format used to print timestamps when none is configured.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%b-%d %H:%M:%S%.3f";

/// Environment variable holding the stream specification of a severity.
///
/// All debug levels share one variable.
pub const fn stream_var(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug0 | Severity::Debug1 | Severity::Debug2 | Severity::Debug3 => "ERS_DEBUG",
        Severity::Information => "ERS_INFO",
        Severity::Warning => "ERS_WARNING",
        Severity::Error | Severity::Unknown => "ERS_ERROR",
        Severity::Fatal => "ERS_FATAL",
    }
}

/// Stream specification used for a severity when none is configured.
pub const fn default_stream(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug0
        | Severity::Debug1
        | Severity::Debug2
        | Severity::Debug3
        | Severity::Information => "stdout",
        Severity::Warning | Severity::Error | Severity::Fatal | Severity::Unknown => "stderr",
    }
}

/// Settings of the reporting service.
///
/// # Examples
///
/// ```
/// use ers::{Configuration, Severity};
///
/// let config = Configuration::from_lookup(|name| match name {
///     "ERS_DEBUG_LEVEL" => Some("2".to_string()),
///     "ERS_WARNING" => Some("null".to_string()),
///     _ => None,
/// })
/// .with_verbosity_level(1);
///
/// assert_eq!(config.debug_level(), 2);
/// assert_eq!(config.verbosity_level(), 1);
/// assert_eq!(config.stream(Severity::Warning), "null");
/// assert_eq!(config.stream(Severity::Error), "stderr");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    debug_level: i32,
    verbosity_level: i32,
    stream_libs: Option<String>,
    streams: [Option<String>; Severity::ROUTED.len()],
    timestamp_format: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            debug_level: 0,
            verbosity_level: 0,
            stream_libs: None,
            streams: Default::default(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_owned(),
        }
    }
}

impl Configuration {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(level) = read_int(&lookup, DEBUG_LEVEL_VAR) {
            config.debug_level = level;
        }
        if let Some(level) = read_int(&lookup, VERBOSITY_LEVEL_VAR) {
            config.verbosity_level = level;
        }
        config.stream_libs = lookup(STREAM_LIBS_VAR);
        for severity in Severity::ROUTED {
            config.streams[severity.slot()] = lookup(stream_var(severity));
        }
        if let Some(format) = lookup(TIMESTAMP_FORMAT_VAR) {
            config.timestamp_format = format;
        }
        config
    }

    /// Returns a snapshot of the global configuration.
    ///
    /// The global configuration is read from the environment on first use.
    pub fn get() -> Self {
        global().read().clone()
    }

    /// Modifies the global configuration in place.
    ///
    /// Streams that are already installed keep the settings they were built
    /// with.
    pub fn update(f: impl FnOnce(&mut Configuration)) {
        f(&mut global().write());
    }

    /// Highest debug level that is dispatched.
    pub fn debug_level(&self) -> i32 {
        self.debug_level
    }

    /// Verbosity of console streams.
    pub fn verbosity_level(&self) -> i32 {
        self.verbosity_level
    }

    /// Configured plugin module list, if any.
    pub fn stream_libs(&self) -> Option<&str> {
        self.stream_libs.as_deref()
    }

    /// Stream specification for `severity`, falling back to the default.
    pub fn stream(&self, severity: Severity) -> &str {
        self.streams[severity.slot()]
            .as_deref()
            .unwrap_or(default_stream(severity))
    }

    /// Format of printed timestamps.
    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    /// Sets the debug level.
    pub fn set_debug_level(&mut self, level: i32) {
        self.debug_level = level;
    }

    /// Sets the verbosity level.
    pub fn set_verbosity_level(&mut self, level: i32) {
        self.verbosity_level = level;
    }

    /// Sets the plugin module list.
    pub fn set_stream_libs(&mut self, libs: impl Into<String>) {
        self.stream_libs = Some(libs.into());
    }

    /// Sets the stream specification of a severity.
    ///
    /// Debug severities each own a slot, so this can silence one debug level
    /// while keeping the others.
    pub fn set_stream(&mut self, severity: Severity, spec: impl Into<String>) {
        self.streams[severity.slot()] = Some(spec.into());
    }

    /// Sets the timestamp format.
    pub fn set_timestamp_format(&mut self, format: impl Into<String>) {
        self.timestamp_format = format.into();
    }

    /// Builder form of [`set_debug_level`](Self::set_debug_level).
    #[must_use]
    pub fn with_debug_level(mut self, level: i32) -> Self {
        self.set_debug_level(level);
        self
    }

    /// Builder form of [`set_verbosity_level`](Self::set_verbosity_level).
    #[must_use]
    pub fn with_verbosity_level(mut self, level: i32) -> Self {
        self.set_verbosity_level(level);
        self
    }

    /// Builder form of [`set_stream_libs`](Self::set_stream_libs).
    #[must_use]
    pub fn with_stream_libs(mut self, libs: impl Into<String>) -> Self {
        self.set_stream_libs(libs);
        self
    }

    /// Builder form of [`set_stream`](Self::set_stream).
    #[must_use]
    pub fn with_stream(mut self, severity: Severity, spec: impl Into<String>) -> Self {
        self.set_stream(severity, spec);
        self
    }

    /// Builder form of [`set_timestamp_format`](Self::set_timestamp_format).
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.set_timestamp_format(format);
        self
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "debug level = {} verbosity level = {}",
            self.debug_level, self.verbosity_level
        )
    }
}

static GLOBAL: Once<RwLock<Configuration>> = Once::new();

fn global() -> &'static RwLock<Configuration> {
    GLOBAL.call_once(|| RwLock::new(Configuration::from_env()))
}

fn read_int(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<i32> {
    let value = lookup(name)?;
    match value.trim().parse() {
        Ok(level) => Some(level),
        Err(_) => {
            tracing::warn!(variable = name, %value, "wrong value is given for the environment variable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn test_defaults() {
        let config = Configuration::from_lookup(|_| None);
        assert_eq!(config, Configuration::default());
        assert_eq!(config.stream(Severity::Debug2), "stdout");
        assert_eq!(config.stream(Severity::Fatal), "stderr");
        assert_eq!(config.timestamp_format(), DEFAULT_TIMESTAMP_FORMAT);
        assert_eq!(config.to_string(), "debug level = 0 verbosity level = 0");
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let config = Configuration::from_lookup(lookup(&[
            ("ERS_DEBUG_LEVEL", "3"),
            ("ERS_VERBOSITY_LEVEL", " 2 "),
            ("ERS_STREAM_LIBS", "a:b"),
            ("ERS_DEBUG", "null"),
            ("ERS_ERROR", "stderr,throw"),
        ]));
        assert_eq!(config.debug_level(), 3);
        assert_eq!(config.verbosity_level(), 2);
        assert_eq!(config.stream_libs(), Some("a:b"));
        assert_eq!(config.stream(Severity::Debug0), "null");
        assert_eq!(config.stream(Severity::Debug3), "null");
        assert_eq!(config.stream(Severity::Error), "stderr,throw");
        assert_eq!(config.stream(Severity::Unknown), "stderr,throw");
    }

    #[test]
    fn test_explicit_overrides_environment() {
        let config = Configuration::from_lookup(lookup(&[
            ("ERS_DEBUG_LEVEL", "3"),
            ("ERS_WARNING", "stdout"),
        ]))
        .with_debug_level(1)
        .with_stream(Severity::Warning, "null");
        assert_eq!(config.debug_level(), 1);
        assert_eq!(config.stream(Severity::Warning), "null");
    }

    #[test]
    fn test_malformed_values_keep_defaults() {
        let config = Configuration::from_lookup(lookup(&[
            ("ERS_DEBUG_LEVEL", "loud"),
            ("ERS_VERBOSITY_LEVEL", ""),
            ("ERS_INFO", "   "),
        ]));
        assert_eq!(config.debug_level(), 0);
        assert_eq!(config.verbosity_level(), 0);
        assert_eq!(config.stream(Severity::Information), "stdout");
    }
}

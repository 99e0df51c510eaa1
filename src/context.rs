//! Snapshots of the place where an issue is raised.
//!
//! An issue never keeps its context. The [`Context`] is read once, while the
//! issue is constructed, and copied into the issue's value table.
//!
//! [`LocalContext`] is the implementation used by the [`here!`] macro. It
//! records the caller's source position and module, and shares a
//! [`ProcessContext`] that is computed once per process.
//!
//! With the `backtrace` feature enabled, [`LocalContext::capture`] also
//! records the symbols of the calling stack.
//!
//! [`here!`]: crate::here

use spin::Once;

use crate::Configuration;

/// Read-only view of the raising site.
///
/// Only the position, host, process and user accessors are required; build
/// metadata is optional because most raising sites cannot know it.
pub trait Context {
    /// Source position of the raising site, `file:line:column`.
    fn position(&self) -> String;

    /// Module path of the raising site.
    fn module(&self) -> Option<&str> {
        None
    }

    /// Compiler used to build the raising code.
    fn compiler(&self) -> Option<&str> {
        None
    }

    /// Build time of the raising code.
    fn compilation(&self) -> Option<&str> {
        None
    }

    /// Host name.
    fn host_name(&self) -> &str;

    /// Operating system and architecture of the host.
    fn host_type(&self) -> &str;

    /// Process id.
    fn process_id(&self) -> u32;

    /// Program name of the process.
    fn program_name(&self) -> &str;

    /// User id of the process, when the platform exposes one.
    fn user_id(&self) -> Option<u32>;

    /// User name of the process.
    fn user_name(&self) -> &str;

    /// Working directory of the process.
    fn cwd(&self) -> &str;

    /// Symbols of the calling stack, innermost first.
    fn stack_frames(&self) -> &[String] {
        &[]
    }

    /// Debug level of the raising context, negative if unavailable.
    fn debug_level(&self) -> i32 {
        -1
    }
}

/// Host, process and user identity, computed once per process.
#[derive(Debug)]
pub struct ProcessContext {
    host_name: String,
    host_type: String,
    process_id: u32,
    program_name: String,
    user_id: Option<u32>,
    user_name: String,
    cwd: String,
}

static PROCESS: Once<ProcessContext> = Once::new();

impl ProcessContext {
    /// Returns the snapshot of the current process.
    pub fn current() -> &'static ProcessContext {
        PROCESS.call_once(ProcessContext::collect)
    }

    fn collect() -> Self {
        Self {
            host_name: host_name(),
            host_type: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            process_id: std::process::id(),
            program_name: program_name(),
            user_id: user_id(),
            user_name: env_first(&["USER", "LOGNAME", "USERNAME"]).unwrap_or_default(),
            cwd: std::env::current_dir()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
        }
    }
}

fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
}

fn host_name() -> String {
    env_first(&["HOSTNAME", "COMPUTERNAME"])
        .or_else(|| {
            ["/proc/sys/kernel/hostname", "/etc/hostname"]
                .into_iter()
                .find_map(|path| std::fs::read_to_string(path).ok())
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_owned())
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .map(std::path::PathBuf::from)
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

#[cfg(unix)]
fn user_id() -> Option<u32> {
    use std::os::unix::fs::MetadataExt;

    std::fs::metadata("/proc/self").ok().map(|meta| meta.uid())
}

#[cfg(not(unix))]
fn user_id() -> Option<u32> {
    None
}

/// Context of a raising site inside this process.
///
/// Prefer the [`here!`](crate::here) macro, which also records the module
/// path.
///
/// # Examples
///
/// ```
/// use ers::{Context, LocalContext};
///
/// let context = LocalContext::capture();
/// assert!(context.position().contains(".rs:"));
/// assert_eq!(context.process_id(), std::process::id());
/// ```
#[derive(Debug, Clone)]
pub struct LocalContext {
    file: &'static str,
    line: u32,
    column: u32,
    module: Option<&'static str>,
    frames: Vec<String>,
    debug_level: i32,
    process: &'static ProcessContext,
}

impl LocalContext {
    /// Captures the context of the caller.
    #[track_caller]
    pub fn capture() -> Self {
        let location = core::panic::Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
            module: None,
            frames: stack_frames(),
            debug_level: Configuration::get().debug_level(),
            process: ProcessContext::current(),
        }
    }

    /// Records the module path of the raising site.
    #[must_use]
    pub fn with_module(mut self, module: &'static str) -> Self {
        self.module = Some(module);
        self
    }

    /// Source file of the raising site.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Line of the raising site.
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Context for LocalContext {
    fn position(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }

    fn module(&self) -> Option<&str> {
        self.module
    }

    fn host_name(&self) -> &str {
        &self.process.host_name
    }

    fn host_type(&self) -> &str {
        &self.process.host_type
    }

    fn process_id(&self) -> u32 {
        self.process.process_id
    }

    fn program_name(&self) -> &str {
        &self.process.program_name
    }

    fn user_id(&self) -> Option<u32> {
        self.process.user_id
    }

    fn user_name(&self) -> &str {
        &self.process.user_name
    }

    fn cwd(&self) -> &str {
        &self.process.cwd
    }

    fn stack_frames(&self) -> &[String] {
        &self.frames
    }

    fn debug_level(&self) -> i32 {
        self.debug_level
    }
}

#[cfg(feature = "backtrace")]
fn stack_frames() -> Vec<String> {
    let backtrace = backtrace::Backtrace::new();
    backtrace
        .frames()
        .iter()
        .flat_map(|frame| frame.symbols())
        .map(|symbol| {
            let name = symbol
                .name()
                .map(|name| name.to_string())
                .unwrap_or_else(|| "<unknown>".to_owned());
            match (symbol.filename(), symbol.lineno()) {
                (Some(file), Some(line)) => format!("{name} at {}:{line}", file.display()),
                _ => name,
            }
        })
        .skip_while(|frame| !frame.contains("LocalContext::capture"))
        .skip(1)
        .collect()
}

#[cfg(not(feature = "backtrace"))]
fn stack_frames() -> Vec<String> {
    Vec::new()
}

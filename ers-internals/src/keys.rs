//! Reserved keys of the value table.
//!
//! Every key listed here carries a fixed meaning shared by all issues. Any
//! other key stored in a [`ValueTable`] is a *parameter* of the concrete issue
//! type that stored it.
//!
//! [`ValueTable`]: crate::ValueTable

/// Class key used by the issue factory to reconstruct the concrete type.
pub const CLASS: &str = "ISSUE_CLASS";
/// Fully qualified Rust type name of the issue type that raised the issue.
pub const RUST_TYPE: &str = "ISSUE_RUST_TYPE";
/// Version of the reporting library that built the issue.
pub const ERS_VERSION: &str = "ERS_VERSION";
/// Compiler used to build the raising code, when known.
pub const COMPILER: &str = "COMPILER";
/// Build time of the raising code, when known.
pub const COMPILATION_TIME: &str = "COMPILATION_TIME";
/// Target the raising code was built for.
pub const COMPILATION_TARGET: &str = "COMPILATION_TARGET";
/// Debug level of the raising context.
pub const COMPILATION_DEBUG_LVL: &str = "COMPILATION_DEBUG_LVL";
/// Host name of the raising process.
pub const HOST_NAME: &str = "HOST_NAME";
/// Operating system and architecture of the raising host.
pub const HOST_TYPE: &str = "HOST_TYPE";
/// Human readable message.
pub const MESSAGE: &str = "MESSAGE";
/// Process id of the raising process.
pub const PROCESS_ID: &str = "PROCESS_ID";
/// Working directory of the raising process.
pub const PROCESS_PWD: &str = "PROCESS_PWD";
/// Program name of the raising process.
pub const PROGRAM_NAME: &str = "PROGRAM_NAME";
/// Responsibility, see [`Responsibility`](crate::Responsibility).
pub const RESPONSIBILITY: &str = "RESPONSIBILITY";
/// Severity, see [`Severity`](crate::Severity).
pub const SEVERITY: &str = "SEVERITY";
/// Source position (`file:line:column`) of the raising site.
pub const SOURCE_POSITION: &str = "SOURCE_POSITION";
/// Module path of the raising site.
pub const SOURCE_MODULE: &str = "SOURCE_MODULE";
/// Time the issue was raised, RFC 3339.
pub const TIME: &str = "TIME";
/// Transience of the issue, `true` or `false`.
pub const TRANSIENCE: &str = "TRANSIENCE";
/// User id of the raising process.
pub const USER_ID: &str = "USER_ID";
/// User name of the raising process.
pub const USER_NAME: &str = "USER_NAME";
/// Rendered description of the cause.
pub const CAUSE_TEXT: &str = "CAUSE_TEXT";
/// Space delimited set of qualifiers.
pub const QUALIFIERS: &str = "QUALIFIERS";

/// Prefix of the per stack frame keys.
pub const STACK_FRAME_PREFIX: &str = "SOURCE-STACK-";

const RESERVED: &[&str] = &[
    CLASS,
    RUST_TYPE,
    ERS_VERSION,
    COMPILER,
    COMPILATION_TIME,
    COMPILATION_TARGET,
    COMPILATION_DEBUG_LVL,
    HOST_NAME,
    HOST_TYPE,
    MESSAGE,
    PROCESS_ID,
    PROCESS_PWD,
    PROGRAM_NAME,
    RESPONSIBILITY,
    SEVERITY,
    SOURCE_POSITION,
    SOURCE_MODULE,
    TIME,
    TRANSIENCE,
    USER_ID,
    USER_NAME,
    CAUSE_TEXT,
    QUALIFIERS,
];

/// Returns the key of the stack frame with the given ordinal.
///
/// ```
/// assert_eq!(ers_internals::keys::stack_frame(10), "SOURCE-STACK-00a");
/// ```
pub fn stack_frame(ordinal: usize) -> String {
    format!("{STACK_FRAME_PREFIX}{ordinal:03x}")
}

/// Returns `true` if the key carries a fixed meaning for all issues.
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(STACK_FRAME_PREFIX) || RESERVED.contains(&key)
}

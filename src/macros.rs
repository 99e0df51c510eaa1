/// Captures the [`LocalContext`](crate::LocalContext) of the invocation site,
/// including its module path.
///
/// # Examples
///
/// ```
/// use ers::{Context, Issue, Severity, here};
///
/// let context = here!();
/// assert_eq!(context.module(), Some(module_path!()));
///
/// let issue = Issue::new(&here!(), Severity::Warning, "low disk space");
/// assert!(issue.value("SOURCE_POSITION").contains(file!()));
/// ```
#[macro_export]
macro_rules! here {
    () => {
        $crate::LocalContext::capture().with_module(::core::module_path!())
    };
}

/// Dispatches a debug message of the given level through the global
/// [`StreamFactory`](crate::StreamFactory).
///
/// Nothing is built when the level is above the configured debug level. An
/// issue returned by the debug pipeline (for instance by a `throw` stage) is
/// dropped.
///
/// # Examples
///
/// ```
/// ers::debug!(1, "connection {} opened", 42);
/// ```
#[macro_export]
macro_rules! debug {
    ($level:expr, $($arg:tt)+) => {{
        let factory = $crate::StreamFactory::instance();
        let level: u8 = $level;
        if factory.debug_enabled(level) {
            let issue = $crate::Issue::new(
                &$crate::here!(),
                $crate::Severity::debug(level),
                ::std::format!($($arg)+),
            );
            let _ = factory.debug(level, issue);
        }
    }};
}

/// Dispatches an informational message through the global
/// [`StreamFactory`](crate::StreamFactory).
///
/// # Examples
///
/// ```
/// ers::info!("listening on port {}", 8080);
/// ```
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {{
        let issue = $crate::Issue::new(
            &$crate::here!(),
            $crate::Severity::Information,
            ::std::format!($($arg)+),
        );
        let _ = $crate::StreamFactory::instance().information(issue);
    }};
}

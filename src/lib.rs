#![deny(
    missing_docs,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! An error reporting service: structured issues routed by severity through
//! configurable streams.
//!
//! ## Overview
//!
//! Application code raises **issues** rather than plain error codes. An
//! [`Issue`] carries a human message, a [`Severity`], a [`Responsibility`],
//! an optional causal chain and a string table of attributes captured from
//! the raising site: source position, host, process, user and, with the
//! `backtrace` feature, the calling stack.
//!
//! Issues are then **dispatched**. The [`StreamFactory`] selects the pipeline
//! configured for the issue's severity and sends the issue through it. Each
//! stage of a pipeline is an [`OutputStream`] that decides on its own whether
//! to pass the issue on: print it, write it to a file, filter it by
//! qualifier, swallow it, or hand it back to the caller as an error.
//!
//! ## Quick Example
//!
//! ```
//! use ers::{Issue, Severity, here};
//!
//! fn open(path: &str) -> Result<std::fs::File, Issue> {
//!     std::fs::File::open(path)
//!         .map_err(|error| Issue::from_error(&here!(), Severity::Error, &error))
//! }
//!
//! if let Err(issue) = open("/nonexistent/config.toml") {
//!     ers::warning(issue).ok();
//! }
//! ```
//!
//! ## Core Concepts
//!
//! - **Value table.** Every attribute of an issue is a string stored in its
//!   [`ValueTable`], keyed by the reserved [`keys`] or by the issue type's own
//!   parameter names. Severity, responsibility, transience and qualifiers are
//!   decoded from the table on every read, so the table alone fully describes
//!   the issue.
//! - **Issue types.** Concrete kinds of issues implement [`IssueType`]. The
//!   class key they store lets the [`IssueFactory`] rebuild an issue of the
//!   right type from its table or from an [`IssueRecord`].
//! - **Streams.** Output streams are created by name from specification
//!   strings such as `filter(db),stderr(2),throw`. Constructors are registered
//!   by plugin modules, see [`plugin`].
//! - **Catcher.** A single [`IssueCatcher`] may intercept every dispatched
//!   issue; see [`set_issue_catcher`].
//!
//! ## Configuration
//!
//! Settings come from [`Configuration`], which reads the `ERS_*` environment
//! variables on first use. The routing of a severity can also be changed at
//! run time with [`StreamFactory::set_stream`].
//!
//! ## Diagnostics
//!
//! Problems inside the service itself, such as a stream that cannot be
//! created or a malformed environment variable, are reported through
//! [`tracing`](https://docs.rs/tracing). No subscriber is installed by this
//! crate.
//!
//! For the serialized representation, see the [`ers-internals`] crate.
//!
//! [`ers-internals`]: ers_internals

mod macros;

pub mod builtin_issues;
pub mod catcher;
pub mod configuration;
pub mod context;
pub mod format;
pub mod plugin;
pub mod prelude;
pub mod streams;

mod issue;
mod issue_factory;
mod stream;
mod stream_factory;

pub use ers_internals::{IssueRecord, Responsibility, Severity, ValueTable, keys};

pub use self::{
    builtin_issues::{
        CannotOpenFile, DefaultIssue, GenericIssue, InvalidFormat, IssueCatcherAlreadySet,
    },
    catcher::{IssueCatcher, IssueCatcherHandle},
    configuration::Configuration,
    context::{Context, LocalContext},
    issue::{Issue, IssueClass, IssueType},
    issue_factory::{IssueCreator, IssueFactory},
    stream::{
        Chain, InputStream, InputStreamCreator, Issues, OutputStream, OutputStreamCreator,
        Pipeline, StreamSpec, split_pipeline,
    },
    stream_factory::StreamFactory,
};

/// Dispatches `issue` through the global [`StreamFactory`].
///
/// See [`StreamFactory::dispatch`].
pub fn dispatch(issue: &Issue) -> Result<(), Issue> {
    StreamFactory::instance().dispatch(issue)
}

/// Dispatches `issue` as a warning through the global [`StreamFactory`].
pub fn warning(issue: Issue) -> Result<(), Issue> {
    StreamFactory::instance().warning(issue)
}

/// Dispatches `issue` as an error through the global [`StreamFactory`].
pub fn error(issue: Issue) -> Result<(), Issue> {
    StreamFactory::instance().error(issue)
}

/// Installs `catcher` on the global [`StreamFactory`].
///
/// See [`StreamFactory::set_issue_catcher`].
pub fn set_issue_catcher(
    catcher: impl IssueCatcher,
) -> Result<IssueCatcherHandle<'static>, Issue> {
    StreamFactory::instance().set_issue_catcher(catcher)
}

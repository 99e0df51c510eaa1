//! Commonly used items for convenient importing.
//!
//! ```
//! use ers::prelude::*;
//!
//! let mut issue = Issue::new(&here!(), Severity::Warning, "cache is cold");
//! issue.set_responsibility(Responsibility::Server);
//! ers::dispatch(&issue).unwrap();
//! ```

pub use crate::{
    Context, Issue, IssueFactory, IssueType, Responsibility, Severity, StreamFactory, ValueTable,
    debug, here, info,
};

//! Issue types raised by the library itself.
//!
//! All of them are registered with the global
//! [`IssueFactory`](crate::IssueFactory) on first use.

use ers_internals::{ValueTable, keys};

use crate::IssueType;

/// An issue carrying nothing but a message.
///
/// This is the subtype of issues built with [`Issue::new`](crate::Issue::new)
/// and [`Issue::from_error`](crate::Issue::from_error).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericIssue {
    message: String,
}

impl GenericIssue {
    /// Creates a generic issue.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IssueType for GenericIssue {
    const CLASS_NAME: &'static str = "ers::Issue";

    fn message(&self) -> String {
        self.message.clone()
    }

    fn load(values: &ValueTable) -> Option<Self> {
        Some(Self::new(values.value(keys::MESSAGE)))
    }
}

/// Stand-in for issues whose class key is not registered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultIssue;

impl IssueType for DefaultIssue {
    const CLASS_NAME: &'static str = "ers::DefaultIssue";

    fn message(&self) -> String {
        "issue of an unregistered class".to_owned()
    }

    fn load(_values: &ValueTable) -> Option<Self> {
        Some(Self)
    }
}

/// A stream could not be created from its specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidFormat {
    key: String,
}

impl InvalidFormat {
    const KEY: &'static str = "key";

    /// Creates the issue for the stream named `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Name of the stream that could not be created.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl IssueType for InvalidFormat {
    const CLASS_NAME: &'static str = "ers::InvalidFormat";

    fn message(&self) -> String {
        format!("Creator for the \"{}\" stream is not found or failed", self.key)
    }

    fn store(&self, values: &mut ValueTable) {
        values.set(Self::KEY, self.key.as_str());
    }

    fn load(values: &ValueTable) -> Option<Self> {
        values.get(Self::KEY).map(Self::new)
    }
}

/// An issue catcher is already installed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IssueCatcherAlreadySet;

impl IssueType for IssueCatcherAlreadySet {
    const CLASS_NAME: &'static str = "ers::IssueCatcherAlreadySet";

    fn message(&self) -> String {
        "Local error catcher has been already set".to_owned()
    }

    fn load(_values: &ValueTable) -> Option<Self> {
        Some(Self)
    }
}

/// A file used by a stream could not be opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CannotOpenFile {
    path: String,
}

impl CannotOpenFile {
    const FILE_NAME: &'static str = "file_name";

    /// Creates the issue for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl IssueType for CannotOpenFile {
    const CLASS_NAME: &'static str = "ers::CannotOpenFile";

    fn message(&self) -> String {
        format!("Can not open \"{}\" file", self.path)
    }

    fn store(&self, values: &mut ValueTable) {
        values.set(Self::FILE_NAME, self.path.as_str());
    }

    fn load(values: &ValueTable) -> Option<Self> {
        values.get(Self::FILE_NAME).map(Self::new)
    }
}

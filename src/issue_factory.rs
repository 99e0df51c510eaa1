//! Reconstruction of issues from their class key.
//!
//! Every [`IssueType`] that may travel through a stream must be registered
//! with the [`IssueFactory`], otherwise it comes back as a
//! [`DefaultIssue`](crate::DefaultIssue) that still carries the original table
//! but can no longer be downcast.
//!
//! ```
//! use ers::{Issue, IssueFactory, IssueType, Severity, ValueTable, here};
//!
//! struct Timeout;
//!
//! impl IssueType for Timeout {
//!     const CLASS_NAME: &'static str = "doc::Timeout";
//!
//!     fn message(&self) -> String {
//!         "timed out".to_owned()
//!     }
//!
//!     fn load(_: &ValueTable) -> Option<Self> {
//!         Some(Timeout)
//!     }
//! }
//!
//! IssueFactory::instance().register::<Timeout>();
//!
//! let issue = Issue::from_type(&here!(), Severity::Warning, Timeout);
//! let rebuilt = IssueFactory::instance().from_record(&issue.to_record());
//! assert!(rebuilt.is::<Timeout>());
//! assert_eq!(rebuilt, issue);
//! ```

use core::fmt;

use ers_internals::{IssueRecord, keys};
use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use spin::{Once, RwLock};

use crate::{
    Issue, IssueType, LocalContext, Severity,
    builtin_issues::{
        CannotOpenFile, DefaultIssue, GenericIssue, InvalidFormat, IssueCatcherAlreadySet,
    },
};

/// Zero-argument constructor of a blank issue.
pub type IssueCreator = fn() -> Issue;

/// Registry from class keys to issue constructors.
pub struct IssueFactory {
    creators: RwLock<HashMap<String, IssueCreator, FxBuildHasher>>,
}

static INSTANCE: Once<IssueFactory> = Once::new();

impl IssueFactory {
    /// Creates a factory with no registered types.
    pub fn new() -> Self {
        Self {
            creators: RwLock::new(HashMap::default()),
        }
    }

    /// Creates a factory with the library's own issue types registered.
    pub fn with_builtins() -> Self {
        let factory = Self::new();
        factory.register::<GenericIssue>();
        factory.register::<DefaultIssue>();
        factory.register::<InvalidFormat>();
        factory.register::<IssueCatcherAlreadySet>();
        factory.register::<CannotOpenFile>();
        factory
    }

    /// The process-wide factory.
    pub fn instance() -> &'static IssueFactory {
        INSTANCE.call_once(Self::with_builtins)
    }

    /// Registers `creator` under `key`, replacing any previous registration.
    pub fn register_issue(&self, key: impl Into<String>, creator: IssueCreator) {
        let key = key.into();
        if self.creators.write().insert(key.clone(), creator).is_some() {
            tracing::warn!(class = %key, "creator for the issue has been already registered");
        }
    }

    /// Registers `T` under its class key.
    pub fn register<T: IssueType>(&self) {
        self.register_issue(T::CLASS_NAME, Issue::blank::<T>);
    }

    /// Returns `true` if a creator is registered under `key`.
    pub fn is_registered(&self, key: &str) -> bool {
        self.creators.read().contains_key(key)
    }

    /// Registered class keys, sorted.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.creators.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Builds a blank issue of the type registered under `key`.
    ///
    /// An unknown key yields a [`DefaultIssue`] carrying the caller's context.
    #[track_caller]
    pub fn create(&self, key: &str) -> Issue {
        let creator = self.creators.read().get(key).copied();
        match creator {
            Some(creator) => creator(),
            None => Issue::from_type(&LocalContext::capture(), Severity::Error, DefaultIssue),
        }
    }

    /// Deep copy of `issue`, rebuilt from its class key.
    pub fn build_from(&self, issue: &Issue) -> Issue {
        let mut copy = self.create(issue.class_name());
        copy.set_values(issue.values().clone());
        copy.restore_cause(issue.cause().map(|cause| self.build_from(cause)));
        copy
    }

    /// Rebuilds an issue and its causal chain from a record.
    pub fn from_record(&self, record: &IssueRecord) -> Issue {
        let mut issue = self.create(record.values.value(keys::CLASS));
        issue.set_values(record.values.clone());
        issue.restore_cause(record.cause.as_deref().map(|cause| self.from_record(cause)));
        issue
    }
}

impl Default for IssueFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IssueFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueFactory")
            .field("classes", &self.class_names())
            .finish()
    }
}

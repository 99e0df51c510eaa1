//! Interception of dispatched issues.
//!
//! At most one [`IssueCatcher`] is installed per [`StreamFactory`]. While it
//! is installed, every dispatched issue is handed to the catcher instead of
//! being routed by severity. The catcher can still route an issue itself
//! with [`StreamFactory::route`].
//!
//! Installing returns an [`IssueCatcherHandle`]; dropping the handle
//! uninstalls the catcher.
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use ers::{Issue, Severity, here};
//!
//! static CAUGHT: AtomicUsize = AtomicUsize::new(0);
//!
//! let handle = ers::set_issue_catcher(|_: &Issue| {
//!     CAUGHT.fetch_add(1, Ordering::SeqCst);
//! })
//! .unwrap();
//!
//! assert!(ers::set_issue_catcher(|_: &Issue| {}).is_err());
//! ers::dispatch(&Issue::new(&here!(), Severity::Error, "caught")).unwrap();
//! assert_eq!(CAUGHT.load(Ordering::SeqCst), 1);
//!
//! drop(handle);
//! let again = ers::set_issue_catcher(|_: &Issue| {});
//! assert!(again.is_ok());
//! ```
//!
//! [`StreamFactory`]: crate::StreamFactory
//! [`StreamFactory::route`]: crate::StreamFactory::route

use core::fmt;

use crate::{Issue, StreamFactory};

/// Callback receiving every dispatched issue while installed.
pub trait IssueCatcher: Send + Sync + 'static {
    /// Handles `issue`.
    ///
    /// Dispatching from here, with [`StreamFactory::dispatch`] or
    /// [`ers::dispatch`](crate::dispatch), hands the issue back to this
    /// catcher and recurses until the stack overflows. Use
    /// [`StreamFactory::route`] to send an issue to its severity's pipeline.
    ///
    /// ```
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// use ers::{Issue, Severity, StreamFactory, here};
    ///
    /// static SEEN: AtomicUsize = AtomicUsize::new(0);
    ///
    /// let _handle = ers::set_issue_catcher(|issue: &Issue| {
    ///     SEEN.fetch_add(1, Ordering::SeqCst);
    ///     StreamFactory::instance().route(issue).ok();
    /// })
    /// .unwrap();
    ///
    /// ers::dispatch(&Issue::new(&here!(), Severity::Information, "passed on")).unwrap();
    /// assert_eq!(SEEN.load(Ordering::SeqCst), 1);
    /// ```
    fn catch(&self, issue: &Issue);
}

impl<F> IssueCatcher for F
where
    F: Fn(&Issue) + Send + Sync + 'static,
{
    fn catch(&self, issue: &Issue) {
        self(issue)
    }
}

/// Keeps an [`IssueCatcher`] installed until dropped.
#[must_use = "dropping the handle uninstalls the catcher"]
pub struct IssueCatcherHandle<'a> {
    factory: &'a StreamFactory,
}

impl<'a> IssueCatcherHandle<'a> {
    pub(crate) fn new(factory: &'a StreamFactory) -> Self {
        Self { factory }
    }
}

impl Drop for IssueCatcherHandle<'_> {
    fn drop(&mut self) {
        self.factory.remove_issue_catcher();
    }
}

impl fmt::Debug for IssueCatcherHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueCatcherHandle").finish_non_exhaustive()
    }
}

//! The at-rest and on-the-wire form of an issue.

use serde::{Deserialize, Serialize};

use crate::ValueTable;

/// Serializable form of an issue and its causal chain.
///
/// The value table alone is enough to rebuild an issue of the right type;
/// the nested `cause` record additionally preserves the typed cause, which
/// the table only keeps as rendered text.
///
/// # Examples
///
/// ```
/// use ers_internals::{IssueRecord, ValueTable};
///
/// let values: ValueTable = [("ISSUE_CLASS", "ers::Issue"), ("MESSAGE", "boom")]
///     .into_iter()
///     .collect();
/// let record = IssueRecord::new(values);
/// assert_eq!(record.depth(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Every attribute of the issue.
    pub values: ValueTable,
    /// Record of the issue's cause, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<IssueRecord>>,
}

impl IssueRecord {
    /// Creates a record without a cause.
    pub fn new(values: ValueTable) -> Self {
        Self {
            values,
            cause: None,
        }
    }

    /// Number of records in the chain, this one included.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self;
        while let Some(cause) = &current.cause {
            depth += 1;
            current = cause;
        }
        depth
    }
}

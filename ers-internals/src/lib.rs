#![forbid(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    unused_doc_comments
)]
//! Internal data crate for [`ers`].
//!
//! # Overview
//!
//! This crate contains the serialized representation of an issue: the
//! [`ValueTable`] holding every attribute as a string, the reserved [`keys`]
//! that give some of those attributes a meaning, the string codecs for
//! [`Severity`] and [`Responsibility`], and the [`IssueRecord`] used to move
//! an issue (and its causal chain) in and out of a process.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`ers`] crate, not
//! this one.
//!
//! # Architecture
//!
//! - **[`values`]**: The [`ValueTable`] itself. Empty values are never stored.
//! - **[`keys`]**: Reserved key names and helpers for stack frame keys.
//! - **[`severity`]**: [`Severity`], [`Responsibility`] and the transience
//!   codec. Decoding never fails; unknown strings map to sentinels.
//! - **[`record`]**: The serde [`IssueRecord`].
//!
//! [`ers`]: https://docs.rs/ers

pub mod keys;
pub mod record;
pub mod severity;
pub mod values;

pub use self::{
    record::IssueRecord,
    severity::{Responsibility, Severity},
    values::ValueTable,
};

//! Publish a directory of markdown documents as a hierarchy of wiki pages.
//!
//! `tree` folds the directory into a forest of [`PublishNode`]s, `title`
//! names every page, and `orchestrator` hands prepared pages to a
//! [`Publisher`] parent-first.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod page;
pub mod publisher;
pub mod title;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, SyncError};
pub use orchestrator::{Orchestrator, PublishReport, PublishedPage};
pub use page::{PageBuilder, PreparedPage, SourceLink};
pub use publisher::{DryRunPublisher, MarkPublisher, Publisher};
pub use title::TitleResolver;
pub use tree::{FsSourceTree, PublishNode, SourceTree, build_forest};

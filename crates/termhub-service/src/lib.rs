//! # termhub-service
//!
//! Query facade over a [`SnapshotRegistry`](termhub_loader::SnapshotRegistry).
//!
//! Every query reads one snapshot for its whole duration, so a concurrent
//! refresh never produces a mixed answer.

#![warn(missing_docs)]

mod config;
mod error;
mod service;

pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use service::{parse_codeset_ids, CsetDownload, CsetListing, HierarchyResponse, TermhubService};

// Re-export the engine for convenience
pub use termhub_loader;

//! Shared types used across the mediashelf crates.
//!
//! This crate holds the vocabulary every other crate speaks: typed UUID
//! identifiers, the core enums for indexes and library items, the unified
//! error type, and file-extension helpers.

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::{IndexId, ItemId, PartId, ScanJobId, VersionId};
pub use types::{ItemKind, MediaType, ScanStatus};

//! Typed ID wrappers for type safety across mediashelf.
//!
//! Newtype wrappers around UUIDs prevent mixing different kinds of
//! identifiers (e.g. using an IndexId where an ItemId is expected).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse from a string UUID representation.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a media index (a named collection of root folders).
    IndexId
);

define_id!(
    /// Unique identifier for a video item (show, season, episode, movie, ...).
    ItemId
);

define_id!(
    /// Unique identifier for a video version (a specific encode of an item).
    VersionId
);

define_id!(
    /// Unique identifier for a video part (a physical file backing a version).
    PartId
);

define_id!(
    /// Unique identifier for a scan job.
    ScanJobId
);

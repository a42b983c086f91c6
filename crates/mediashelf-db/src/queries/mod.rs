//! Database query modules.
//!
//! One module per table. All functions take `&Connection`, so composite
//! operations (hierarchy upserts, migrations, flushes) can run inside a
//! transaction scoped by the caller.

pub mod indexes;
pub mod scan_jobs;
pub mod video_items;
pub mod video_parts;
pub mod video_versions;

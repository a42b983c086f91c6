//! Filesystem probe for the scanner.
//!
//! Reads the identity triple `(size, mtime, fast_hash)` for a file. The
//! fast hash is an xxh3-128 fingerprint of the file's leading 8 KiB: cheap
//! enough to compute for every file on every scan, and together with the
//! size it identifies a file across renames and moves. It is an identity
//! key, not an integrity check.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::UNIX_EPOCH;
use xxhash_rust::xxh3::xxh3_128;

/// Number of leading bytes fed into the fast hash.
const FAST_HASH_CHUNK: usize = 8 * 1024;

/// Identity probe of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProbe {
    pub size: i64,
    /// Modification time, unix seconds.
    pub mtime: i64,
    pub fast_hash: String,
}

/// Probe a file for its identity triple.
pub fn probe(path: &Path) -> std::io::Result<FileProbe> {
    let metadata = std::fs::metadata(path)?;
    let size = metadata.len() as i64;
    let mtime = metadata
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let fast_hash = fast_hash_of(path)?;

    Ok(FileProbe {
        size,
        mtime,
        fast_hash,
    })
}

/// Compute the fast hash of a file's leading chunk.
pub fn fast_hash_of(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; FAST_HASH_CHUNK];
    let mut filled = 0;

    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }

    let hash = xxh3_128(&buffer[..filled]);
    Ok(format!("{:032x}", hash))
}

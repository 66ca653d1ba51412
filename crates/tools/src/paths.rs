//! Path helpers shared by file tools.

use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Bytes inspected when sniffing for binary content.
pub const BINARY_SNIFF_BYTES: u64 = 8192;

/// Resolve `path` against `base`.
///
/// Absolute paths are canonicalized when they exist; relative paths are
/// joined onto the canonical form of `base`. Missing files resolve to the
/// joined path unchanged so callers can report them.
pub async fn resolve_path(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return canonical_or_self(path).await;
    }
    canonical_or_self(base).await.join(path)
}

async fn canonical_or_self(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

/// A file is binary when a NUL byte appears in its first 8 KiB.
///
/// Unreadable files are reported as text; the subsequent read surfaces the
/// real error.
pub async fn is_binary_file(path: &Path) -> bool {
    let Ok(file) = tokio::fs::File::open(path).await else {
        return false;
    };
    let mut head = Vec::with_capacity(BINARY_SNIFF_BYTES as usize);
    if file.take(BINARY_SNIFF_BYTES).read_to_end(&mut head).await.is_err() {
        return false;
    }
    head.contains(&0)
}

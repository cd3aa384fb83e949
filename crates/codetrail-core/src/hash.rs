//! Content hashing: the streaming 128-bit file digest used by the change
//! detector, and the 64-bit path digest used to name collections and
//! snapshot files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use xxhash_rust::xxh3::{Xxh3, xxh3_64};

use crate::error::{CoreError, Result};

const STREAM_CHUNK: usize = 64 * 1024;

/// Stream a file's content through XXH3-128 in 64 KiB chunks and return the
/// digest as a lowercase hex string. Never loads the whole file into memory.
pub fn hash_file_contents(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|source| CoreError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut hasher = Xxh3::new();
    let mut buf = [0u8; STREAM_CHUNK];
    loop {
        let n = reader.read(&mut buf).map_err(|source| CoreError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:032x}", hasher.digest128()))
}

/// Hash arbitrary in-memory bytes with the same 128-bit family used for
/// file content, for tests and small in-memory inputs.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Xxh3::new();
    hasher.update(bytes);
    format!("{:032x}", hasher.digest128())
}

/// 64-bit digest of an absolute path's UTF-8 bytes, used for collection and
/// snapshot-file naming. Returns the full 16-hex-digit value; callers take
/// the leading prefix they need (8 hex for collections, 16 for snapshots).
pub fn hash_path_64(absolute_path_utf8: &str) -> String {
    format!("{:016x}", xxh3_64(absolute_path_utf8.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn same_content_same_hash() {
        let mut f1 = NamedTempFile::new().unwrap();
        f1.write_all(b"hello world").unwrap();
        let mut f2 = NamedTempFile::new().unwrap();
        f2.write_all(b"hello world").unwrap();

        assert_eq!(
            hash_file_contents(f1.path()).unwrap(),
            hash_file_contents(f2.path()).unwrap()
        );
    }

    #[test]
    fn different_content_different_hash() {
        let mut f1 = NamedTempFile::new().unwrap();
        f1.write_all(b"hello world").unwrap();
        let mut f2 = NamedTempFile::new().unwrap();
        f2.write_all(b"goodbye world").unwrap();

        assert_ne!(
            hash_file_contents(f1.path()).unwrap(),
            hash_file_contents(f2.path()).unwrap()
        );
    }

    #[test]
    fn streams_content_larger_than_chunk_size() {
        let mut f = NamedTempFile::new().unwrap();
        let big = vec![b'x'; STREAM_CHUNK * 3 + 17];
        f.write_all(&big).unwrap();
        let hash = hash_file_contents(f.path()).unwrap();
        assert_eq!(hash.len(), 32);
        assert_eq!(hash, hash_bytes(&big));
    }

    #[test]
    fn path_hash_is_deterministic_and_16_hex() {
        let a = hash_path_64("/repo/project");
        let b = hash_path_64("/repo/project");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, hash_path_64("/repo/other"));
    }
}

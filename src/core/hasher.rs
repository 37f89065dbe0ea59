//! BLAKE3 digests of generated output.

use crate::error::{Error, Result};
use std::io::Read;
use std::path::Path;

const STREAM_BUF_SIZE: usize = 65536;

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Hash a file's contents, or `None` when the file does not exist.
pub fn hash_existing(path: &Path) -> Result<Option<String>> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; STREAM_BUF_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Some(format!("blake3:{}", hasher.finalize().to_hex())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_string_format() {
        let h = hash_string("hello");
        assert!(h.starts_with("blake3:"));
        assert_eq!(h.len(), "blake3:".len() + 64);
        assert_eq!(h, hash_string("hello"));
        assert_ne!(h, hash_string("hello "));
    }

    #[test]
    fn test_hash_existing_matches_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        assert_eq!(hash_existing(&path).unwrap(), None);
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(hash_existing(&path).unwrap(), Some(hash_string("{}")));
    }
}

//! BLAKE3 hashing for artifact verification

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake3::Hasher;

use crate::error::{PixGpuError, Result, file_read_failed};

/// Hash prefix for BLAKE3 hashes
pub const HASH_PREFIX: &str = "blake3:";

/// Calculate BLAKE3 hash of a file
pub fn hash_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| file_read_failed(path, e))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| file_read_failed(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{}{}", HASH_PREFIX, hasher.finalize().to_hex()))
}

/// Check `path` against a pinned digest (with or without the prefix)
pub fn verify_file(path: &Path, expected: &str) -> Result<()> {
    let actual = hash_file(path)?;
    let expected = if expected.starts_with(HASH_PREFIX) {
        expected.to_string()
    } else {
        format!("{HASH_PREFIX}{expected}")
    };

    if actual.eq_ignore_ascii_case(&expected) {
        Ok(())
    } else {
        Err(PixGpuError::ChecksumMismatch {
            path: path.display().to_string(),
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::create_temp_dir;

    #[test]
    fn test_hash_file_prefix_and_determinism() {
        let temp = create_temp_dir();
        let path = temp.path().join("artifact.tar.xz");
        std::fs::write(&path, b"payload").unwrap();

        let first = hash_file(&path).unwrap();
        assert!(first.starts_with(HASH_PREFIX));
        assert_eq!(first, hash_file(&path).unwrap());
        assert_eq!(
            first,
            format!("{HASH_PREFIX}{}", blake3::hash(b"payload").to_hex())
        );
    }

    #[test]
    fn test_verify_accepts_bare_hex() {
        let temp = create_temp_dir();
        let path = temp.path().join("artifact");
        std::fs::write(&path, b"payload").unwrap();
        let hex = blake3::hash(b"payload").to_hex().to_string();

        assert!(verify_file(&path, &hex).is_ok());
    }

    #[test]
    fn test_verify_rejects_mismatch() {
        let temp = create_temp_dir();
        let path = temp.path().join("artifact");
        std::fs::write(&path, b"tampered").unwrap();
        let hex = blake3::hash(b"payload").to_hex().to_string();

        let err = verify_file(&path, &hex).unwrap_err();
        assert!(matches!(err, PixGpuError::ChecksumMismatch { .. }));
    }
}

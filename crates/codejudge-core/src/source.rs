//! The C submission under review

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{JudgeError, Result};

/// Source text plus the path it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| JudgeError::read_input(path, e))?;
        Ok(Self::new(path, text))
    }

    /// Hex SHA-256 of the source text
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable() {
        let a = SourceUnit::new("a.c", "int main(void) { return 0; }\n");
        let b = SourceUnit::new("b.c", "int main(void) { return 0; }\n");
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceUnit::load(&dir.path().join("nope.c")).unwrap_err();
        assert!(matches!(err, JudgeError::ReadInput { .. }));
    }
}

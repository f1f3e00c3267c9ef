use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Opaque fingerprint of a document's content: lowercase hex SHA-256.
///
/// Equal content always yields an equal revision and a full-width digest
/// keeps differing content from sharing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn of(content: &str) -> Self {
        let digest = Sha256::digest(content.as_bytes());
        let mut hex = String::with_capacity(64);
        for byte in digest {
            hex.push_str(&format!("{byte:02x}"));
        }
        Revision(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Revision {
    fn from(s: String) -> Self {
        Revision(s)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Revision(s.to_string())
    }
}

/// What a writer last observed. An empty `rev` means "I saw no document",
/// which is only satisfied when the target does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precondition {
    pub rev: String,
    pub mtime: Option<i64>,
}

impl Precondition {
    pub fn new(rev: impl Into<String>) -> Self {
        Self {
            rev: rev.into(),
            mtime: None,
        }
    }

    pub fn with_mtime(mut self, mtime: Option<i64>) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn expects_absent(&self) -> bool {
        self.rev.is_empty()
    }

    /// Whether this precondition still holds for the stored snapshot.
    pub fn matches(&self, current: &Revision, current_mtime: i64) -> bool {
        if self.rev != current.as_str() {
            return false;
        }
        match self.mtime {
            Some(m) => m == current_mtime,
            None => true,
        }
    }
}

/// File modification time as whole Unix seconds.
pub fn mtime_secs(path: &Path) -> std::io::Result<i64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let secs = match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    };
    Ok(secs)
}

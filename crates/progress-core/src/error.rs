use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("path escapes the project root: {0}")]
    PathOutsideRoot(String),

    #[error("path not in writable whitelist: {0}")]
    NotWritable(String),

    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("conflict: {path} was modified (current rev {current_rev})")]
    Conflict {
        path: String,
        current_rev: String,
        current_mtime: i64,
    },

    #[error("line_index {index} out of bounds (document has {len} lines)")]
    LineOutOfRange { index: usize, len: usize },

    #[error("line {0} does not contain a checkbox")]
    NotACheckbox(usize),

    #[error("unsupported marker '{0}': must be one of ' ', '/', 'x', '-', '!', '?'")]
    UnsupportedMarker(String),

    #[error("unsupported key '{0}': must be 1-6")]
    UnsupportedKey(String),

    #[error("marker '{0}' is not part of the primary cycle")]
    NotInPrimaryCycle(char),

    #[error("unknown panel '{0}': must be one of progress, next, plan, risk, snapshot")]
    UnknownPanel(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ProgressError {
    /// True for rejections a caller should treat as a possible attack on the
    /// root boundary.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            ProgressError::PathOutsideRoot(_) | ProgressError::NotWritable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProgressError>;

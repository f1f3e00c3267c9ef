use crate::error::{ProgressError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Comma-separated extra writable directories, appended to the configured
/// list.
pub const WRITABLE_PATHS_ENV: &str = "PROGRESS_UI_WRITABLE_PATHS";

// ---------------------------------------------------------------------------
// PortRange
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    #[serde(default = "default_port_start")]
    pub start: u16,
    #[serde(default = "default_port_end")]
    pub end: u16,
}

fn default_port_start() -> u16 {
    3737
}

fn default_port_end() -> u16 {
    3747
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: default_port_start(),
            end: default_port_end(),
        }
    }
}

impl PortRange {
    /// Inclusive iterator over the candidate ports.
    pub fn ports(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directories scanned for documents, relative to the project root.
    #[serde(default = "default_dirs")]
    pub documents: Vec<String>,
    /// Directories whose files may be written.
    #[serde(default = "default_dirs")]
    pub writable: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub port_range: PortRange,
}

fn default_dirs() -> Vec<String> {
    vec![paths::CLAUDE_DIR.to_string()]
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "markdown".to_string(), "txt".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            documents: default_dirs(),
            writable: default_dirs(),
            extensions: default_extensions(),
            port_range: PortRange::default(),
        }
    }
}

impl Config {
    /// Load `.claude/progress-ui.yaml` (defaults when absent), then apply
    /// `PROGRESS_UI_WRITABLE_PATHS` and validate.
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::load_file(root)?;
        if let Ok(raw) = std::env::var(WRITABLE_PATHS_ENV) {
            config = config.with_extra_writable(&raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn load_file(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    /// Append writable directories from a comma-separated list.
    pub fn with_extra_writable(mut self, raw: &str) -> Result<Self> {
        for extra in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            validate_dir(WRITABLE_PATHS_ENV, extra)?;
            if !self.writable.iter().any(|w| w == extra) {
                self.writable.push(extra.to_string());
            }
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.documents.is_empty() {
            return Err(ProgressError::InvalidConfig(
                "documents: at least one directory required".into(),
            ));
        }
        for d in &self.documents {
            validate_dir("documents", d)?;
        }
        for w in &self.writable {
            validate_dir("writable", w)?;
        }
        if self.extensions.is_empty() {
            return Err(ProgressError::InvalidConfig(
                "extensions: at least one extension required".into(),
            ));
        }
        if let Some(bad) = self
            .extensions
            .iter()
            .find(|e| e.is_empty() || e.contains('.') || e.contains('/'))
        {
            return Err(ProgressError::InvalidConfig(format!(
                "extensions: '{bad}' must be a bare extension like 'md'"
            )));
        }
        let range = self.port_range;
        if range.start == 0 || range.start > range.end {
            return Err(ProgressError::InvalidConfig(format!(
                "port_range: {}-{} is not a valid range",
                range.start, range.end
            )));
        }
        Ok(())
    }
}

fn validate_dir(field: &str, dir: &str) -> Result<()> {
    let invalid = |why: &str| {
        Err(ProgressError::InvalidConfig(format!(
            "{field}: {why}: {dir}"
        )))
    };
    if dir.starts_with('/') || dir.starts_with('~') || dir.starts_with('\\') {
        return invalid("absolute path not allowed");
    }
    if dir == "." || dir.split(['/', '\\']).any(|part| part == "..") {
        return invalid("dangerous path");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

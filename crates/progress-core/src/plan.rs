//! Compliance checks for the active feature plan (`docs/plans/<name>.md`).
//!
//! A plan is either in the strict template (Tasks, Acceptance mapping, Risks
//! sections) or in the lighter template that carries `**Goal:**` and
//! `**Architecture:**` header fields plus a Tasks section. Tasks are always
//! required.

use crate::paths;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::OnceLock;

pub const PLAN_PATH_PREFIX: &str = "docs/plans/";

// ---------------------------------------------------------------------------
// Path check
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCheck {
    pub valid: bool,
    pub normalized_path: Option<String>,
    pub error: Option<String>,
}

impl PathCheck {
    fn ok(normalized: String) -> Self {
        Self {
            valid: true,
            normalized_path: Some(normalized),
            error: None,
        }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            normalized_path: None,
            error: Some(error.into()),
        }
    }
}

/// Validate the shape of a plan path and, when `require_exists`, that it
/// names a file under `root`.
pub fn check_path(root: &Path, plan_path: &str, require_exists: bool) -> PathCheck {
    let normalized = plan_path.trim().replace('\\', "/");
    if normalized.is_empty() {
        return PathCheck::fail("plan_path is empty");
    }
    if normalized.starts_with('/') || normalized.starts_with('~') {
        return PathCheck::fail("plan_path must be relative (absolute paths are not allowed)");
    }
    if !normalized.starts_with(PLAN_PATH_PREFIX) {
        return PathCheck::fail(format!("plan_path must be under '{PLAN_PATH_PREFIX}'"));
    }
    if !normalized.ends_with(".md") {
        return PathCheck::fail("plan_path must end with .md");
    }
    let Ok(rel) = paths::normalize_relative(&normalized) else {
        return PathCheck::fail("plan_path cannot contain '..' segments");
    };
    if require_exists {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        match paths::resolve_under(&root, &rel) {
            Ok(full) if full.is_file() => {}
            Ok(_) => return PathCheck::fail(format!("plan_path does not exist: {normalized}")),
            Err(_) => return PathCheck::fail("plan_path escapes the project root"),
        }
    }
    PathCheck::ok(normalized)
}

// ---------------------------------------------------------------------------
// Document check
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Strict,
    Superpowers,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentCheck {
    pub valid: bool,
    pub errors: Vec<String>,
    pub missing_sections: Vec<&'static str>,
    pub warnings: Vec<String>,
    pub profile: Profile,
}

impl DocumentCheck {
    fn invalid(errors: Vec<String>, missing_sections: Vec<&'static str>) -> Self {
        Self {
            valid: false,
            errors,
            missing_sections,
            warnings: Vec::new(),
            profile: Profile::Invalid,
        }
    }
}

struct SectionPatterns {
    tasks: Regex,
    acceptance: Regex,
    risks: Regex,
    goal: Regex,
    architecture: Regex,
}

static PATTERNS: OnceLock<SectionPatterns> = OnceLock::new();

fn patterns() -> &'static SectionPatterns {
    PATTERNS.get_or_init(|| SectionPatterns {
        tasks: Regex::new(r"(?im)^##+\s+Tasks\b").unwrap(),
        acceptance: Regex::new(r"(?im)^##+\s+Acceptance(\s+Criteria)?(\s+Mapping)?\b").unwrap(),
        risks: Regex::new(r"(?im)^##+\s+Risks?\b").unwrap(),
        goal: Regex::new(r"(?m)^\*\*Goal:\*\*\s+.+").unwrap(),
        architecture: Regex::new(r"(?m)^\*\*Architecture:\*\*\s+.+").unwrap(),
    })
}

/// Classify plan text against the two accepted templates.
pub fn check_content(content: &str) -> DocumentCheck {
    let p = patterns();
    let missing: Vec<&'static str> = [
        ("tasks", &p.tasks),
        ("acceptance_mapping", &p.acceptance),
        ("risks", &p.risks),
    ]
    .into_iter()
    .filter(|(_, re)| !re.is_match(content))
    .map(|(name, _)| name)
    .collect();

    if missing.contains(&"tasks") {
        return DocumentCheck::invalid(
            vec!["Missing required plan sections: tasks".to_string()],
            missing,
        );
    }
    if missing.is_empty() {
        return DocumentCheck {
            valid: true,
            errors: Vec::new(),
            missing_sections: Vec::new(),
            warnings: Vec::new(),
            profile: Profile::Strict,
        };
    }
    if p.goal.is_match(content) && p.architecture.is_match(content) {
        let warnings = vec![format!(
            "Plan accepted with header fields; recommended sections missing: {}",
            missing.join(", ")
        )];
        return DocumentCheck {
            valid: true,
            errors: Vec::new(),
            missing_sections: missing,
            warnings,
            profile: Profile::Superpowers,
        };
    }
    DocumentCheck::invalid(
        vec![format!(
            "Missing required plan sections: {}",
            missing.join(", ")
        )],
        missing,
    )
}

/// Check the plan file at `plan_path` under `root`.
pub fn check_document(root: &Path, plan_path: &str) -> DocumentCheck {
    let path = check_path(root, plan_path, true);
    let Some(normalized) = path.normalized_path else {
        return DocumentCheck::invalid(path.error.into_iter().collect(), Vec::new());
    };
    match std::fs::read_to_string(root.join(&normalized)) {
        Ok(content) => check_content(&content),
        Err(e) => DocumentCheck::invalid(vec![format!("Unable to read plan: {e}")], Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "INVALID")]
    Invalid,
    #[serde(rename = "N/A")]
    NotApplicable,
}

/// Plan indicator for the status summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanHealth {
    pub status: HealthStatus,
    pub plan_path: Option<String>,
    pub message: String,
}

impl PlanHealth {
    pub fn no_plan() -> Self {
        Self {
            status: HealthStatus::NotApplicable,
            plan_path: None,
            message: "No active plan".to_string(),
        }
    }
}

/// Health of the active plan; `None` means no feature has a plan.
pub fn health(root: &Path, plan_path: Option<&str>) -> PlanHealth {
    let Some(plan_path) = plan_path.filter(|p| !p.trim().is_empty()) else {
        return PlanHealth::no_plan();
    };
    let with = |status, message: String| PlanHealth {
        status,
        plan_path: Some(plan_path.to_string()),
        message,
    };

    let path = check_path(root, plan_path, true);
    if let Some(err) = path.error {
        return with(HealthStatus::Warn, err);
    }
    let doc = check_document(root, plan_path);
    if !doc.valid {
        let message = if doc.missing_sections.is_empty() {
            doc.errors.join("; ")
        } else {
            format!("Missing required sections: {}", doc.missing_sections.join(", "))
        };
        return with(HealthStatus::Invalid, message);
    }
    with(HealthStatus::Ok, "Plan file complete and compliant".to_string())
}

/// Full answer for an explicit plan path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    pub plan_path: String,
    pub path_validation: PathCheck,
    pub document_validation: Option<DocumentCheck>,
    pub overall_status: HealthStatus,
}

pub fn report(root: &Path, plan_path: &str) -> PlanReport {
    let path_validation = check_path(root, plan_path, false);
    let document_validation = path_validation
        .valid
        .then(|| check_document(root, plan_path));
    let overall_status = match &document_validation {
        None => HealthStatus::Warn,
        Some(doc) if !doc.valid => HealthStatus::Invalid,
        Some(_) => HealthStatus::Ok,
    };
    PlanReport {
        plan_path: plan_path.to_string(),
        path_validation,
        document_validation,
        overall_status,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

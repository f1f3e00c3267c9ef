//! Read-only digest of the tracker's `progress.json` and `checkpoints.json`
//! for the UI header. Missing or unreadable files degrade to an empty
//! summary instead of failing the request.

use crate::paths;
use crate::plan::{self, PlanHealth};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Source data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressData {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub current_feature_id: Option<i64>,
    #[serde(default)]
    pub bugs: Vec<Bug>,
    #[serde(default)]
    pub workflow_state: Option<WorkflowState>,
}

impl ProgressData {
    /// Plan path of the feature being worked on, if any.
    pub fn plan_path(&self) -> Option<&str> {
        self.workflow_state.as_ref()?.plan_path.as_deref()
    }

    pub fn current_feature(&self) -> Option<&Feature> {
        let id = self.current_feature_id?;
        self.features.iter().find(|f| f.id == Some(id))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowState {
    #[serde(default)]
    pub plan_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub development_stage: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub test_steps: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bug {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Checkpoints {
    #[serde(default)]
    pub last_checkpoint_at: Option<String>,
    /// Appended oldest first.
    #[serde(default)]
    pub entries: Vec<CheckpointEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckpointEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub feature_id: Option<i64>,
    #[serde(default)]
    pub feature_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub progress: ProgressCount,
    pub next_action: NextAction,
    pub risk_blocker: RiskBlocker,
    pub recent_snapshot: RecentSnapshot,
    pub plan_health: PlanHealth,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressCount {
    pub completed: usize,
    pub total: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextAction {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub feature_id: Option<i64>,
    pub feature_name: String,
    pub development_stage: Option<&'static str>,
    pub stage_label: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskBlocker {
    pub has_risk: bool,
    pub high_priority_bugs: usize,
    pub blocked_count: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentSnapshot {
    pub exists: bool,
    pub timestamp: Option<String>,
    pub relative_time: String,
}

/// Build the summary for the project at `root`.
pub fn load(root: &Path, now: DateTime<Utc>) -> StatusSummary {
    let progress = read_progress(root);
    let checkpoints = read_checkpoints(root);
    let plan_health = plan::health(root, progress.plan_path());
    summarize(&progress, checkpoints.as_ref(), plan_health, now)
}

pub(crate) fn read_progress(root: &Path) -> ProgressData {
    read_json(&paths::progress_json_path(root)).unwrap_or_default()
}

pub(crate) fn read_checkpoints(root: &Path) -> Option<Checkpoints> {
    read_json(&paths::checkpoints_json_path(root))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let data = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&data) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable tracker file");
            None
        }
    }
}

pub fn summarize(
    progress: &ProgressData,
    checkpoints: Option<&Checkpoints>,
    plan_health: PlanHealth,
    now: DateTime<Utc>,
) -> StatusSummary {
    let total = progress.features.len();
    let completed = progress.features.iter().filter(|f| f.completed).count();
    let percentage = if total > 0 {
        (completed * 100 / total) as u32
    } else {
        0
    };

    StatusSummary {
        progress: ProgressCount {
            completed,
            total,
            percentage,
        },
        next_action: next_action(progress),
        risk_blocker: risk_blocker(progress),
        recent_snapshot: recent_snapshot(checkpoints, now),
        plan_health,
        updated_at: now,
    }
}

/// Completed features are "completed"; a known stage is kept; anything else
/// (including legacy files with no stage) counts as "developing".
pub fn normalize_stage(feature: &Feature) -> &'static str {
    if feature.completed {
        return "completed";
    }
    match feature.development_stage.as_deref() {
        Some("planning") => "planning",
        Some("completed") => "completed",
        _ => "developing",
    }
}

pub fn stage_label(stage: &str) -> &'static str {
    match stage {
        "planning" => "Planning",
        "developing" => "Developing",
        "completed" => "Completed",
        "pending" => "Pending",
        _ => "Unknown",
    }
}

pub(crate) fn feature_name(feature: &Feature) -> String {
    feature.name.clone().unwrap_or_else(|| "Unknown".to_string())
}

fn next_action(progress: &ProgressData) -> NextAction {
    if let Some(feature) = progress.current_feature() {
        let stage = normalize_stage(feature);
        return NextAction {
            kind: "feature",
            feature_id: feature.id,
            feature_name: feature_name(feature),
            development_stage: Some(stage),
            stage_label: Some(stage_label(stage)),
        };
    }

    match next_pending(progress) {
        Some(feature) => NextAction {
            kind: "feature",
            feature_id: feature.id,
            feature_name: feature_name(feature),
            development_stage: Some("pending"),
            stage_label: Some(stage_label("pending")),
        },
        None => NextAction {
            kind: "none",
            feature_id: None,
            feature_name: "No pending features".to_string(),
            development_stage: None,
            stage_label: None,
        },
    }
}

/// Lowest-id feature not yet completed.
pub(crate) fn next_pending(progress: &ProgressData) -> Option<&Feature> {
    progress
        .features
        .iter()
        .filter(|f| !f.completed)
        .min_by_key(|f| f.id.unwrap_or(i64::MAX))
}

/// Open high-priority bugs; fixed ones no longer count.
pub(crate) fn is_open_high_priority(bug: &Bug) -> bool {
    bug.priority.as_deref() == Some("high") && bug.status.as_deref() != Some("fixed")
}

pub(crate) fn is_blocked(bug: &Bug) -> bool {
    bug.status.as_deref() == Some("blocked")
}

fn risk_blocker(progress: &ProgressData) -> RiskBlocker {
    let high_priority = progress.bugs.iter().filter(|b| is_open_high_priority(b)).count();
    let blocked = progress.bugs.iter().filter(|b| is_blocked(b)).count();

    if high_priority > 0 || blocked > 0 {
        RiskBlocker {
            has_risk: true,
            high_priority_bugs: high_priority,
            blocked_count: blocked,
            message: format!("{high_priority} high priority bug(s)"),
        }
    } else {
        RiskBlocker {
            has_risk: false,
            high_priority_bugs: 0,
            blocked_count: 0,
            message: "OK".to_string(),
        }
    }
}

fn recent_snapshot(checkpoints: Option<&Checkpoints>, now: DateTime<Utc>) -> RecentSnapshot {
    match checkpoints.and_then(|c| c.last_checkpoint_at.clone()) {
        Some(ts) => RecentSnapshot {
            relative_time: relative_time(&ts, now),
            exists: true,
            timestamp: Some(ts),
        },
        None => RecentSnapshot {
            exists: false,
            timestamp: None,
            relative_time: "no snapshots yet".to_string(),
        },
    }
}

/// "3 days ago", "2 hours ago", "5 minutes ago", "just now". Unparseable
/// timestamps are echoed back unchanged.
pub fn relative_time(iso: &str, now: DateTime<Utc>) -> String {
    let Ok(ts) = DateTime::parse_from_rfc3339(iso) else {
        return iso.to_string();
    };
    let delta = now.signed_duration_since(ts.with_timezone(&Utc));
    if delta.num_days() > 0 {
        format!("{} days ago", delta.num_days())
    } else if delta.num_hours() > 0 {
        format!("{} hours ago", delta.num_hours())
    } else if delta.num_minutes() > 0 {
        format!("{} minutes ago", delta.num_minutes())
    } else {
        "just now".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

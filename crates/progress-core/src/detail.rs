//! Drill-down views behind each status indicator in the UI header.

use crate::error::{ProgressError, Result};
use crate::paths;
use crate::plan::{self, HealthStatus};
use crate::summary::{
    self, feature_name, is_blocked, is_open_high_priority, next_pending, normalize_stage,
    relative_time, stage_label, Checkpoints, ProgressData,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const DETAIL_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    Progress,
    Next,
    Plan,
    Risk,
    Snapshot,
}

impl Panel {
    pub fn as_str(self) -> &'static str {
        match self {
            Panel::Progress => "progress",
            Panel::Next => "next",
            Panel::Plan => "plan",
            Panel::Risk => "risk",
            Panel::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Panel {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "progress" => Ok(Panel::Progress),
            "next" => Ok(Panel::Next),
            "plan" => Ok(Panel::Plan),
            "risk" => Ok(Panel::Risk),
            "snapshot" => Ok(Panel::Snapshot),
            other => Err(ProgressError::UnknownPanel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelDetail {
    pub panel: Panel,
    pub title: String,
    pub summary: String,
    pub sections: Vec<Section>,
    pub sources: Vec<Source>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        content: String,
    },
    List {
        title: String,
        content: Vec<String>,
    },
    Table {
        title: String,
        content: Vec<TableRow>,
    },
    FeatureList {
        title: String,
        content: Vec<FeatureRow>,
    },
}

impl Section {
    fn text(content: impl Into<String>) -> Self {
        Section::Text {
            title: None,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRow {
    pub id: Option<i64>,
    pub name: String,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub development_stage: &'static str,
    pub stage_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub path: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Command text the user copies into their assistant session.
    Copy,
    /// Project-relative document the UI opens.
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub label: String,
    pub command: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
}

fn copy(label: &str, command: &str) -> Action {
    Action {
        label: label.to_string(),
        command: command.to_string(),
        kind: ActionKind::Copy,
    }
}

fn progress_source() -> Source {
    Source {
        path: paths::PROGRESS_JSON.to_string(),
        label: "Progress data".to_string(),
    }
}

/// Build the detail view for `panel` from the tracker files under `root`.
pub fn load(root: &Path, panel: Panel, now: DateTime<Utc>) -> PanelDetail {
    match panel {
        Panel::Progress => progress_detail(&summary::read_progress(root)),
        Panel::Next => next_detail(&summary::read_progress(root)),
        Panel::Plan => plan_detail(root, &summary::read_progress(root)),
        Panel::Risk => risk_detail(&summary::read_progress(root)),
        Panel::Snapshot => snapshot(summary::read_checkpoints(root).as_ref(), now),
    }
}

pub fn progress_detail(progress: &ProgressData) -> PanelDetail {
    let total = progress.features.len();
    let completed = progress.features.iter().filter(|f| f.completed).count();
    let rows = progress
        .features
        .iter()
        .map(|f| {
            let stage = normalize_stage(f);
            FeatureRow {
                id: f.id,
                name: feature_name(f),
                completed: f.completed,
                completed_at: f.completed_at.clone(),
                development_stage: stage,
                stage_label: stage_label(stage),
            }
        })
        .collect();

    PanelDetail {
        panel: Panel::Progress,
        title: "Progress".to_string(),
        summary: format!("{completed} completed, {} pending", total - completed),
        sections: vec![Section::FeatureList {
            title: "Features".to_string(),
            content: rows,
        }],
        sources: vec![progress_source()],
        actions: vec![copy("Refresh progress", "/prog")],
    }
}

pub fn next_detail(progress: &ProgressData) -> PanelDetail {
    let (feature, active) = match progress.current_feature() {
        Some(f) => (f, true),
        None => match next_pending(progress) {
            Some(f) => (f, false),
            None => {
                return PanelDetail {
                    panel: Panel::Next,
                    title: "Next action".to_string(),
                    summary: "All features are complete".to_string(),
                    sections: vec![Section::text("Every feature in this project is done.")],
                    sources: Vec::new(),
                    actions: Vec::new(),
                }
            }
        },
    };

    let name = feature_name(feature);
    let id = feature.id.map_or_else(|| "?".to_string(), |id| id.to_string());
    let mut sections = vec![Section::Text {
        title: Some("Feature".to_string()),
        content: name.clone(),
    }];
    if !feature.test_steps.is_empty() {
        sections.push(Section::List {
            title: "Test steps".to_string(),
            content: feature.test_steps.iter().take(DETAIL_LIMIT).cloned().collect(),
        });
    }

    if !active {
        return PanelDetail {
            panel: Panel::Next,
            title: "Next action".to_string(),
            summary: format!("Start Feature #{id}: {name}"),
            sections,
            sources: vec![progress_source()],
            actions: vec![copy("Start this feature", "/prog next")],
        };
    }

    let stage = normalize_stage(feature);
    let actions = match stage {
        "planning" => vec![copy("Start development", "/prog start")],
        "developing" => vec![copy("Complete this feature", "/prog done")],
        _ => Vec::new(),
    };
    PanelDetail {
        panel: Panel::Next,
        title: "Current feature".to_string(),
        summary: format!("{} Feature #{id}: {name}", stage_label(stage)),
        sections,
        sources: vec![progress_source()],
        actions,
    }
}

pub fn plan_detail(root: &Path, progress: &ProgressData) -> PanelDetail {
    let title = "Plan compliance".to_string();
    let Some(plan_path) = progress.plan_path().filter(|p| !p.trim().is_empty()) else {
        return PanelDetail {
            panel: Panel::Plan,
            title,
            summary: "No active plan".to_string(),
            sections: vec![Section::text(
                "No feature is in progress, so there is no active plan. Use /prog next to start the next feature.",
            )],
            sources: Vec::new(),
            actions: vec![copy("Start next feature", "/prog next")],
        };
    };

    let path = plan::check_path(root, plan_path, true);
    let mut rows = vec![TableRow {
        key: "Plan path".to_string(),
        value: plan_path.to_string(),
    }];
    rows.push(TableRow {
        key: "Path".to_string(),
        value: match &path.error {
            None => "✓ ok".to_string(),
            Some(err) => format!("✗ {err}"),
        },
    });
    let mut status = HealthStatus::Warn;
    if path.valid {
        let doc = plan::check_document(root, plan_path);
        let value = if doc.valid {
            status = HealthStatus::Ok;
            "✓ has Tasks/Acceptance/Risks".to_string()
        } else {
            status = HealthStatus::Invalid;
            format!("✗ missing: {}", doc.missing_sections.join(", "))
        };
        rows.push(TableRow {
            key: "Structure".to_string(),
            value,
        });
    }

    PanelDetail {
        panel: Panel::Plan,
        title,
        summary: if status == HealthStatus::Ok {
            "Plan file complete and compliant".to_string()
        } else {
            "Plan file has problems".to_string()
        },
        sections: vec![Section::Table {
            title: "Checks".to_string(),
            content: rows,
        }],
        sources: vec![Source {
            path: plan_path.to_string(),
            label: "Plan document".to_string(),
        }],
        actions: vec![Action {
            label: "Open plan".to_string(),
            command: plan_path.to_string(),
            kind: ActionKind::Link,
        }],
    }
}

pub fn risk_detail(progress: &ProgressData) -> PanelDetail {
    let high: Vec<_> = progress.bugs.iter().filter(|b| is_open_high_priority(b)).collect();
    let blocked: Vec<_> = progress.bugs.iter().filter(|b| is_blocked(b)).collect();
    let title = "Risks and blockers".to_string();

    if high.is_empty() && blocked.is_empty() {
        return PanelDetail {
            panel: Panel::Risk,
            title,
            summary: "No open high-risk issues".to_string(),
            sections: vec![Section::text("Nothing is blocking the project.")],
            sources: Vec::new(),
            actions: Vec::new(),
        };
    }

    let describe = |tag: &str, bug: &summary::Bug| {
        format!(
            "[{tag}] {}",
            bug.description.as_deref().unwrap_or("Unknown bug")
        )
    };
    let items = high
        .iter()
        .map(|b| describe("high priority", *b))
        .chain(blocked.iter().map(|b| describe("blocked", *b)))
        .collect();

    PanelDetail {
        panel: Panel::Risk,
        title,
        summary: format!(
            "{} high priority issue(s), {} blocked",
            high.len(),
            blocked.len()
        ),
        sections: vec![Section::List {
            title: "Issues".to_string(),
            content: items,
        }],
        sources: vec![progress_source()],
        actions: vec![copy("List issues", "/prog-fix list")],
    }
}

/// Newest entries first, at most five.
pub fn snapshot(checkpoints: Option<&Checkpoints>, now: DateTime<Utc>) -> PanelDetail {
    let entries = checkpoints.map(|c| c.entries.as_slice()).unwrap_or_default();
    let title = "Snapshots".to_string();
    let Some(latest) = entries.last() else {
        return PanelDetail {
            panel: Panel::Snapshot,
            title,
            summary: "No snapshots yet".to_string(),
            sections: vec![Section::text("No progress snapshot has been recorded.")],
            sources: Vec::new(),
            actions: Vec::new(),
        };
    };

    let when = |ts: Option<&String>| relative_time(ts.map_or("", String::as_str), now);
    let items = entries
        .iter()
        .rev()
        .take(DETAIL_LIMIT)
        .map(|e| {
            format!(
                "{} - Feature #{}: {}",
                when(e.timestamp.as_ref()),
                e.feature_id.map_or_else(|| "?".to_string(), |id| id.to_string()),
                e.feature_name.as_deref().unwrap_or("Unknown"),
            )
        })
        .collect();

    PanelDetail {
        panel: Panel::Snapshot,
        title,
        summary: format!("Latest snapshot: {}", when(latest.timestamp.as_ref())),
        sections: vec![Section::List {
            title: "Recent snapshots".to_string(),
            content: items,
        }],
        sources: vec![Source {
            path: paths::CHECKPOINTS_JSON.to_string(),
            label: "Snapshot data".to_string(),
        }],
        actions: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

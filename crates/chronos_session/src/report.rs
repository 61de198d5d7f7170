//! Save audit: checks every snapshot under a directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::persistence::{decode_snapshot, RestoreKind};

const SNAPSHOT_EXTENSIONS: [&str; 2] = ["dat", "json"];
const IGNORED_DIRS: [&str; 3] = ["target", ".git", "reports"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAuditReport {
    pub id: String,
    pub timestamp: String,
    pub root: PathBuf,
    pub summary: ReportSummary,
    pub checks: Vec<CheckResult>,
}

impl SaveAuditReport {
    pub fn new(id: impl Into<String>, root: PathBuf, checks: Vec<CheckResult>) -> Self {
        let (status, score) = summarize_checks(&checks);
        let notes = if checks.is_empty() {
            "no snapshots found".to_string()
        } else {
            format!("{} snapshot(s) audited", checks.len())
        };
        Self {
            id: id.into(),
            timestamp: Utc::now().to_rfc3339(),
            root,
            summary: ReportSummary {
                status,
                score,
                notes,
            },
            checks,
        }
    }
}

fn summarize_checks(checks: &[CheckResult]) -> (ReportStatus, f32) {
    if checks.iter().any(|c| c.status == CheckStatus::Fail) {
        (ReportStatus::Fail, 0.0)
    } else if checks.iter().any(|c| c.status == CheckStatus::Warn) {
        (ReportStatus::Warn, 0.7)
    } else {
        (ReportStatus::Pass, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub status: ReportStatus,
    pub score: f32,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pass,
    Fail,
    Warn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: String,
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
}

/// Intact snapshots pass, repaired ones warn, and unreadable or reset ones
/// fail.
pub fn audit_saves(root: &Path, run_id: impl Into<String>) -> Result<SaveAuditReport> {
    let mut checks = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| filter_entry(e.path().strip_prefix(root).unwrap_or(e.path())))
    {
        let entry = entry?;
        let path = entry.path();
        let is_snapshot = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SNAPSHOT_EXTENSIONS.contains(&ext));
        if entry.file_type().is_file() && is_snapshot {
            checks.push(audit_file(root, path));
        }
    }
    Ok(SaveAuditReport::new(run_id, root.to_path_buf(), checks))
}

fn audit_file(root: &Path, path: &Path) -> CheckResult {
    let name = path
        .strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string();
    let (status, details) = match fs::read_to_string(path) {
        Err(err) => (CheckStatus::Fail, format!("unreadable: {err}")),
        Ok(raw) => {
            let restored = decode_snapshot(&raw);
            match restored.kind {
                RestoreKind::Intact => (
                    CheckStatus::Pass,
                    format!("intact at turn {}", restored.state.turn_count),
                ),
                RestoreKind::Repaired => (
                    CheckStatus::Warn,
                    format!(
                        "repaired by sanitize (hp {}/{})",
                        restored.state.player_hp, restored.state.player_max_hp
                    ),
                ),
                RestoreKind::Reset | RestoreKind::Missing => (
                    CheckStatus::Fail,
                    "unrecoverable; would reset to the initial state".to_string(),
                ),
            }
        }
    };
    CheckResult {
        name,
        status,
        details,
        log_path: Some(path.to_path_buf()),
    }
}

fn filter_entry(path: &Path) -> bool {
    !path.components().any(|part| match part {
        Component::Normal(os_str) => os_str
            .to_str()
            .is_some_and(|part| IGNORED_DIRS.contains(&part)),
        _ => false,
    })
}

//! Requirement projection and aggregate statistics
//!
//! The projection file (`requirement.json`) caches per-requirement task
//! counts for dashboards and listings. It is derived state: every read path
//! that matters recomputes from the live task lists, and losing or
//! corrupting the file only costs the cached copy. Refreshing it must never
//! fail the mutation that triggered the refresh.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::repo::TaskVault;
use crate::task::{Task, TaskStatus};

/// Cached per-requirement counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub task_count: usize,
    pub completed_count: usize,
    pub in_progress_count: usize,
    pub pending_count: usize,
}

/// Aggregate statistics across every requirement, computed live
#[derive(Debug, Clone, Serialize)]
pub struct RequirementStats {
    pub requirements: Vec<RequirementInfo>,
    pub total_requirements: usize,
    pub total_tasks: usize,
    pub total_completed: usize,
}

/// On-disk shape of the projection file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct InfoDoc {
    #[serde(default)]
    requirements: BTreeMap<String, RequirementInfo>,
}

fn status_counts(tasks: &[Task]) -> (usize, usize, usize) {
    let completed = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();
    let in_progress = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count();
    let pending = tasks.iter().filter(|t| t.status == TaskStatus::Pending).count();
    (completed, in_progress, pending)
}

impl TaskVault {
    /// Recompute one requirement's projection entry and store it
    ///
    /// The projection file is read defensively: missing or unparseable
    /// content starts from an empty document rather than failing, since the
    /// file is rebuildable by construction.
    pub(crate) async fn refresh_requirement_info(&self, requirement: &str) -> Result<()> {
        let tasks = self.list_tasks(requirement).await?;
        let (completed, in_progress, pending) = status_counts(&tasks);

        let info_file = self.namespace().info_file();
        let file = self.records().exclusive(&info_file).await;

        let mut doc = if file.exists().await? {
            file.read().await.unwrap_or_else(|err| {
                tracing::warn!(error = %err, "projection file unreadable; rebuilding");
                InfoDoc::default()
            })
        } else {
            InfoDoc::default()
        };

        let now = Utc::now();
        let entry = doc
            .requirements
            .entry(requirement.to_string())
            .or_insert_with(|| RequirementInfo {
                name: requirement.to_string(),
                created_at: now,
                updated_at: now,
                task_count: 0,
                completed_count: 0,
                in_progress_count: 0,
                pending_count: 0,
            });
        entry.updated_at = now;
        entry.task_count = tasks.len();
        entry.completed_count = completed;
        entry.in_progress_count = in_progress;
        entry.pending_count = pending;

        file.write(&doc).await
    }

    /// Compute aggregate statistics across all requirements
    ///
    /// Counts come from the live task lists, never from the projection file.
    pub async fn requirement_stats(&self) -> Result<RequirementStats> {
        let names = self.list_requirements().await?;

        let mut requirements = Vec::with_capacity(names.len());
        for name in names {
            let tasks = self.list_tasks(&name).await?;
            let (completed, in_progress, pending) = status_counts(&tasks);
            let now = Utc::now();
            requirements.push(RequirementInfo {
                name,
                created_at: now,
                updated_at: now,
                task_count: tasks.len(),
                completed_count: completed,
                in_progress_count: in_progress,
                pending_count: pending,
            });
        }

        let total_requirements = requirements.len();
        let total_tasks = requirements.iter().map(|info| info.task_count).sum();
        let total_completed = requirements.iter().map(|info| info.completed_count).sum();

        Ok(RequirementStats {
            requirements,
            total_requirements,
            total_tasks,
            total_completed,
        })
    }
}

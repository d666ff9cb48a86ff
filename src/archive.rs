//! Archival snapshots
//!
//! `clear_all_tasks` is the one producer of the archive corpus the search
//! engine scans: it snapshots a requirement's completed tasks into a
//! timestamped document under `<root>/archive/`, then truncates the live
//! list. The task file stays locked for the whole sequence so no concurrent
//! writer can slip a task in between the snapshot and the truncation.

use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::repo::TaskVault;
use crate::task::TaskListDoc;

/// Prefix of snapshot document filenames
pub const SNAPSHOT_PREFIX: &str = "tasks_";

/// Outcome of a clear-and-archive operation
#[derive(Debug, Clone, Serialize)]
pub struct ClearReport {
    pub success: bool,
    pub message: String,
    /// Snapshot filename inside the archive directory, when one was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_file: Option<String>,
    pub removed_tasks: usize,
    pub archived_tasks: usize,
}

impl TaskVault {
    /// Archive a requirement's completed tasks and empty its live list
    ///
    /// An empty requirement is a success no-op. Otherwise a snapshot holding
    /// only the completed tasks is written first, then the live list is
    /// truncated; the counts and the snapshot name come back in the report.
    pub async fn clear_all_tasks(&self, requirement: &str) -> Result<ClearReport> {
        let tasks_file = self.ensure(requirement).await?;
        let locked = self.records().exclusive(&tasks_file).await;

        let doc: TaskListDoc = locked.read().await?;
        if doc.tasks.is_empty() {
            return Ok(ClearReport {
                success: true,
                message: "no tasks to clear".to_string(),
                backup_file: None,
                removed_tasks: 0,
                archived_tasks: 0,
            });
        }

        let completed: Vec<_> = doc
            .tasks
            .iter()
            .filter(|task| task.is_completed())
            .cloned()
            .collect();
        let removed_tasks = doc.tasks.len();
        let archived_tasks = completed.len();

        let archive_dir = self.namespace().ensure_archive_dir().await?;
        let snapshot_name = format!(
            "{SNAPSHOT_PREFIX}{}.json",
            Utc::now().format("%Y-%m-%dT%H-%M-%S")
        );
        self.records()
            .write_json(
                &archive_dir.join(&snapshot_name),
                &TaskListDoc { tasks: completed },
            )
            .await?;

        locked.write(&TaskListDoc::default()).await?;
        drop(locked);

        self.refresh_projection(requirement).await;

        Ok(ClearReport {
            success: true,
            message: format!(
                "cleared {removed_tasks} tasks; archived {archived_tasks} completed tasks to {snapshot_name}"
            ),
            backup_file: Some(snapshot_name),
            removed_tasks,
            archived_tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::CreateTask;
    use crate::task::TaskStatus;
    use tempfile::TempDir;

    #[tokio::test]
    async fn clearing_an_empty_requirement_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let vault = TaskVault::new(dir.path());

        let report = vault.clear_all_tasks("auth").await.unwrap();
        assert!(report.success);
        assert!(report.backup_file.is_none());
        assert_eq!(report.removed_tasks, 0);
        assert!(!vault.namespace().archive_dir().exists());
    }

    #[tokio::test]
    async fn clear_archives_only_completed_tasks_and_empties_the_list() {
        let dir = TempDir::new().unwrap();
        let vault = TaskVault::new(dir.path());

        let done = vault
            .create_task(
                "auth",
                CreateTask {
                    name: "done".to_string(),
                    description: "d".to_string(),
                    ..CreateTask::default()
                },
            )
            .await
            .unwrap();
        vault
            .update_task_status("auth", done.id, TaskStatus::Completed)
            .await
            .unwrap();
        vault
            .create_task(
                "auth",
                CreateTask {
                    name: "pending".to_string(),
                    description: "d".to_string(),
                    ..CreateTask::default()
                },
            )
            .await
            .unwrap();

        let report = vault.clear_all_tasks("auth").await.unwrap();
        assert!(report.success);
        assert_eq!(report.removed_tasks, 2);
        assert_eq!(report.archived_tasks, 1);

        assert!(vault.list_tasks("auth").await.unwrap().is_empty());

        let snapshot = vault
            .namespace()
            .archive_dir()
            .join(report.backup_file.unwrap());
        let doc: TaskListDoc = vault.records().read_json(&snapshot).await.unwrap();
        assert_eq!(doc.tasks.len(), 1);
        assert_eq!(doc.tasks[0].name, "done");
    }
}

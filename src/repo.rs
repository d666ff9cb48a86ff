//! Task repository
//!
//! CRUD, status transitions, and dependency gating over a single
//! requirement's task list. All operations validate the requirement name,
//! initialize the namespace on first use, and run their read-modify-write
//! under the task file's lock. Lookup misses return `None`; state conflicts
//! (completed-task guards, delete guards) come back as structured reports,
//! never as errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::namespace::Namespace;
use crate::store::RecordStore;
use crate::task::{RelatedFile, Task, TaskDependency, TaskListDoc, TaskStatus};

/// Fields allowed to change on a completed task
const COMPLETED_MUTABLE_FIELDS: &str = "summary, related_files";

/// File-backed task store for one data directory
///
/// Cheap to clone; clones share the same lock registry, so concurrent use of
/// clones keeps the per-file ordering guarantee.
#[derive(Debug, Clone)]
pub struct TaskVault {
    records: RecordStore,
    namespace: Namespace,
    config: StoreConfig,
}

impl TaskVault {
    /// Build a vault over `root` with default configuration
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self::with_config(root, StoreConfig::default())
    }

    /// Build a vault over `root` with an explicit configuration
    pub fn with_config(root: impl Into<std::path::PathBuf>, config: StoreConfig) -> Self {
        Self {
            records: RecordStore::new(),
            namespace: Namespace::new(root),
            config,
        }
    }

    /// Build a vault over `root`, loading `taskvault.toml` from the root if
    /// present
    pub async fn open(root: impl Into<std::path::PathBuf>) -> Result<Self> {
        let namespace = Namespace::new(root);
        let config = StoreConfig::load_or_default(namespace.root()).await?;
        Ok(Self {
            records: RecordStore::new(),
            namespace,
            config,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Names of all requirements under this vault's root
    pub async fn list_requirements(&self) -> Result<Vec<String>> {
        self.namespace.list_requirements().await
    }

    /// Full task list of a requirement
    pub async fn list_tasks(&self, requirement: &str) -> Result<Vec<Task>> {
        let file = self.ensure(requirement).await?;
        let doc: TaskListDoc = self.records.read_json(&file).await?;
        Ok(doc.tasks)
    }

    /// Look a task up by id
    pub async fn get_task(&self, requirement: &str, id: Uuid) -> Result<Option<Task>> {
        let tasks = self.list_tasks(requirement).await?;
        Ok(tasks.into_iter().find(|task| task.id == id))
    }

    /// Append a new pending task
    ///
    /// Dependency ids are stored as given; existence is validated upstream by
    /// the batch reconciliation path, not here.
    pub async fn create_task(&self, requirement: &str, draft: CreateTask) -> Result<Task> {
        let file = self.ensure(requirement).await?;

        let mut task = Task::new(draft.name, draft.description);
        task.notes = draft.notes;
        task.dependencies = draft
            .dependencies
            .into_iter()
            .map(|task_id| TaskDependency { task_id })
            .collect();
        task.related_files = draft.related_files;

        let created = task.clone();
        self.records
            .update_json(&file, move |doc: &mut TaskListDoc| {
                doc.tasks.push(task);
                Ok(())
            })
            .await?;

        self.refresh_projection(requirement).await;
        Ok(created)
    }

    /// Merge a partial update into a task and bump `updated_at`
    ///
    /// Returns `None` when the task does not exist, or when it is completed
    /// and the patch touches anything outside the allowed fields (summary and
    /// related files); in that case the stored task is left unchanged.
    pub async fn update_task(
        &self,
        requirement: &str,
        id: Uuid,
        patch: TaskPatch,
    ) -> Result<Option<Task>> {
        let file = self.ensure(requirement).await?;

        let updated = self
            .records
            .update_json(&file, move |doc: &mut TaskListDoc| {
                let Some(task) = doc.tasks.iter_mut().find(|task| task.id == id) else {
                    return Ok(None);
                };
                if task.is_completed() && patch.touches_locked_fields() {
                    tracing::debug!(
                        task = %id,
                        "refusing update of completed task outside {COMPLETED_MUTABLE_FIELDS}"
                    );
                    return Ok(None);
                }
                patch.apply(task);
                task.updated_at = Utc::now();
                Ok(Some(task.clone()))
            })
            .await?;

        if updated.is_some() {
            self.refresh_projection(requirement).await;
        }
        Ok(updated)
    }

    /// Set a task's status; stamps `completed_at` exactly on the transition
    /// into `Completed`
    pub async fn update_task_status(
        &self,
        requirement: &str,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Task>> {
        let patch = TaskPatch {
            status: Some(status),
            completed_at: (status == TaskStatus::Completed).then(Utc::now),
            ..TaskPatch::default()
        };
        self.update_task(requirement, id, patch).await
    }

    /// Set a task's summary (allowed on completed tasks)
    pub async fn update_task_summary(
        &self,
        requirement: &str,
        id: Uuid,
        summary: impl Into<String>,
    ) -> Result<Option<Task>> {
        let patch = TaskPatch {
            summary: Some(summary.into()),
            ..TaskPatch::default()
        };
        self.update_task(requirement, id, patch).await
    }

    /// Update a task's content fields, reporting the outcome
    ///
    /// Completed tasks are refused wholesale here; an empty patch is a
    /// success no-op.
    pub async fn update_task_content(
        &self,
        requirement: &str,
        id: Uuid,
        content: ContentPatch,
    ) -> Result<ContentUpdateReport> {
        let Some(task) = self.get_task(requirement, id).await? else {
            return Ok(ContentUpdateReport::fail("task not found"));
        };
        if task.is_completed() {
            return Ok(ContentUpdateReport::fail(
                "cannot update the content of a completed task",
            ));
        }
        if content.is_empty() {
            return Ok(ContentUpdateReport {
                success: true,
                message: "nothing to update".to_string(),
                task: Some(task),
            });
        }

        let patch = TaskPatch {
            name: content.name,
            description: content.description,
            notes: content.notes,
            implementation_guide: content.implementation_guide,
            verification_criteria: content.verification_criteria,
            dependencies: content.dependencies.map(|ids| {
                ids.into_iter()
                    .map(|task_id| TaskDependency { task_id })
                    .collect()
            }),
            related_files: content.related_files,
            ..TaskPatch::default()
        };

        match self.update_task(requirement, id, patch).await? {
            Some(task) => Ok(ContentUpdateReport {
                success: true,
                message: "task content updated".to_string(),
                task: Some(task),
            }),
            None => Ok(ContentUpdateReport::fail("task update failed")),
        }
    }

    /// Replace a task's related-files list, reporting the outcome
    pub async fn update_task_related_files(
        &self,
        requirement: &str,
        id: Uuid,
        related_files: Vec<RelatedFile>,
    ) -> Result<ContentUpdateReport> {
        let Some(task) = self.get_task(requirement, id).await? else {
            return Ok(ContentUpdateReport::fail("task not found"));
        };
        if task.is_completed() {
            return Ok(ContentUpdateReport::fail(
                "cannot update the related files of a completed task",
            ));
        }

        let count = related_files.len();
        let patch = TaskPatch {
            related_files: Some(related_files),
            ..TaskPatch::default()
        };
        match self.update_task(requirement, id, patch).await? {
            Some(task) => Ok(ContentUpdateReport {
                success: true,
                message: format!("related files updated ({count} entries)"),
                task: Some(task),
            }),
            None => Ok(ContentUpdateReport::fail("task update failed")),
        }
    }

    /// Whether a task is ready to execute
    ///
    /// Not executable when missing or already completed. A task with no
    /// dependencies is always ready; otherwise every dependency must resolve
    /// to a completed task. Unresolved references count as blocking, and
    /// `blocked_by` lists every blocking dependency id.
    pub async fn can_execute(&self, requirement: &str, id: Uuid) -> Result<ExecutionGate> {
        let tasks = self.list_tasks(requirement).await?;
        let Some(task) = tasks.iter().find(|task| task.id == id) else {
            return Ok(ExecutionGate::blocked(Vec::new()));
        };
        if task.is_completed() {
            return Ok(ExecutionGate::blocked(Vec::new()));
        }
        if task.dependencies.is_empty() {
            return Ok(ExecutionGate::ready());
        }

        let blocked_by: Vec<Uuid> = task
            .dependencies
            .iter()
            .filter(|dep| {
                !tasks
                    .iter()
                    .any(|candidate| candidate.id == dep.task_id && candidate.is_completed())
            })
            .map(|dep| dep.task_id)
            .collect();

        if blocked_by.is_empty() {
            Ok(ExecutionGate::ready())
        } else {
            Ok(ExecutionGate::blocked(blocked_by))
        }
    }

    /// Delete a task
    ///
    /// Refused when the task is missing, completed, or referenced as a
    /// dependency by any other live task (the report names the dependents).
    pub async fn delete_task(&self, requirement: &str, id: Uuid) -> Result<ActionReport> {
        let file = self.ensure(requirement).await?;

        let report = self
            .records
            .update_json(&file, move |doc: &mut TaskListDoc| {
                let Some(index) = doc.tasks.iter().position(|task| task.id == id) else {
                    return Ok(ActionReport::fail("task not found"));
                };
                if doc.tasks[index].is_completed() {
                    return Ok(ActionReport::fail("cannot delete a completed task"));
                }

                let dependents: Vec<String> = doc
                    .tasks
                    .iter()
                    .filter(|task| task.id != id && task.depends_on(id))
                    .map(|task| format!("\"{}\" (id {})", task.name, task.id))
                    .collect();
                if !dependents.is_empty() {
                    return Ok(ActionReport::fail(format!(
                        "cannot delete this task; the following tasks depend on it: {}",
                        dependents.join(", ")
                    )));
                }

                doc.tasks.remove(index);
                Ok(ActionReport::ok("task deleted"))
            })
            .await?;

        if report.success {
            self.refresh_projection(requirement).await;
        }
        Ok(report)
    }

    /// Validate the requirement and make sure its storage exists
    pub(crate) async fn ensure(&self, requirement: &str) -> Result<std::path::PathBuf> {
        self.namespace
            .ensure_requirement(&self.records, requirement)
            .await
    }

    /// Recompute and store the requirement projection, swallowing failures
    ///
    /// The projection is advisory; a failed refresh never fails the mutation
    /// that triggered it.
    pub(crate) async fn refresh_projection(&self, requirement: &str) {
        if let Err(err) = self.refresh_requirement_info(requirement).await {
            tracing::warn!(requirement, error = %err, "requirement projection refresh failed");
        }
    }
}

/// Payload for a single-task create
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateTask {
    pub name: String,
    pub description: String,
    pub notes: Option<String>,
    pub dependencies: Vec<Uuid>,
    pub related_files: Option<Vec<RelatedFile>>,
}

/// Partial update merged into a stored task; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub implementation_guide: Option<String>,
    pub verification_criteria: Option<String>,
    pub status: Option<TaskStatus>,
    pub dependencies: Option<Vec<TaskDependency>>,
    pub related_files: Option<Vec<RelatedFile>>,
    pub analysis_result: Option<String>,
    pub summary: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    /// Whether the patch touches any field a completed task locks down
    fn touches_locked_fields(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.notes.is_some()
            || self.implementation_guide.is_some()
            || self.verification_criteria.is_some()
            || self.status.is_some()
            || self.dependencies.is_some()
            || self.analysis_result.is_some()
            || self.completed_at.is_some()
    }

    fn apply(self, task: &mut Task) {
        if let Some(name) = self.name {
            task.name = name;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(notes) = self.notes {
            task.notes = Some(notes);
        }
        if let Some(guide) = self.implementation_guide {
            task.implementation_guide = Some(guide);
        }
        if let Some(criteria) = self.verification_criteria {
            task.verification_criteria = Some(criteria);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(dependencies) = self.dependencies {
            task.dependencies = dependencies;
        }
        if let Some(related_files) = self.related_files {
            task.related_files = Some(related_files);
        }
        if let Some(analysis) = self.analysis_result {
            task.analysis_result = Some(analysis);
        }
        if let Some(summary) = self.summary {
            task.summary = Some(summary);
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = Some(completed_at);
        }
    }
}

/// Content-field update payload for `update_task_content`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub implementation_guide: Option<String>,
    pub verification_criteria: Option<String>,
    pub dependencies: Option<Vec<Uuid>>,
    pub related_files: Option<Vec<RelatedFile>>,
}

impl ContentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.notes.is_none()
            && self.implementation_guide.is_none()
            && self.verification_criteria.is_none()
            && self.dependencies.is_none()
            && self.related_files.is_none()
    }
}

/// Outcome of an operation that can be refused for state reasons
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub success: bool,
    pub message: String,
}

impl ActionReport {
    pub(crate) fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub(crate) fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Outcome of a content update, carrying the task on success
#[derive(Debug, Clone, Serialize)]
pub struct ContentUpdateReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
}

impl ContentUpdateReport {
    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            task: None,
        }
    }
}

/// Readiness verdict for one task
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionGate {
    pub can_execute: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<Uuid>,
}

impl ExecutionGate {
    fn ready() -> Self {
        Self {
            can_execute: true,
            blocked_by: Vec::new(),
        }
    }

    fn blocked(blocked_by: Vec<Uuid>) -> Self {
        Self {
            can_execute: false,
            blocked_by,
        }
    }
}

/// Convenience: read a raw task list document from an arbitrary path
///
/// Used by the archival search when scanning snapshot documents.
pub(crate) async fn read_task_doc(store: &RecordStore, path: &Path) -> Result<TaskListDoc> {
    store.read_json(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault() -> (TempDir, TaskVault) {
        let dir = TempDir::new().unwrap();
        let vault = TaskVault::new(dir.path());
        (dir, vault)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (_dir, vault) = vault();
        let created = vault
            .create_task(
                "auth",
                CreateTask {
                    name: "add login".to_string(),
                    description: "session endpoint".to_string(),
                    notes: Some("reuse middleware".to_string()),
                    ..CreateTask::default()
                },
            )
            .await
            .unwrap();

        let fetched = vault.get_task("auth", created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "add login");
        assert_eq!(fetched.status, TaskStatus::Pending);
        assert_eq!(fetched.notes.as_deref(), Some("reuse middleware"));
    }

    #[tokio::test]
    async fn status_transition_stamps_completed_at_once() {
        let (_dir, vault) = vault();
        let task = vault
            .create_task(
                "auth",
                CreateTask {
                    name: "t".to_string(),
                    description: "d".to_string(),
                    ..CreateTask::default()
                },
            )
            .await
            .unwrap();
        assert!(task.completed_at.is_none());

        let started = vault
            .update_task_status("auth", task.id, TaskStatus::InProgress)
            .await
            .unwrap()
            .unwrap();
        assert!(started.completed_at.is_none());

        let done = vault
            .update_task_status("auth", task.id, TaskStatus::Completed)
            .await
            .unwrap()
            .unwrap();
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn completed_task_rejects_updates_outside_allowlist() {
        let (_dir, vault) = vault();
        let task = vault
            .create_task(
                "auth",
                CreateTask {
                    name: "t".to_string(),
                    description: "d".to_string(),
                    ..CreateTask::default()
                },
            )
            .await
            .unwrap();
        vault
            .update_task_status("auth", task.id, TaskStatus::Completed)
            .await
            .unwrap();

        let refused = vault
            .update_task(
                "auth",
                task.id,
                TaskPatch {
                    description: Some("rewritten".to_string()),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(refused.is_none());

        let stored = vault.get_task("auth", task.id).await.unwrap().unwrap();
        assert_eq!(stored.description, "d");

        // Summary stays mutable after completion.
        let summarized = vault
            .update_task_summary("auth", task.id, "done and verified")
            .await
            .unwrap();
        assert!(summarized.is_some());
    }

    #[tokio::test]
    async fn delete_refuses_depended_upon_tasks() {
        let (_dir, vault) = vault();
        let base = vault
            .create_task(
                "auth",
                CreateTask {
                    name: "base".to_string(),
                    description: "d".to_string(),
                    ..CreateTask::default()
                },
            )
            .await
            .unwrap();
        vault
            .create_task(
                "auth",
                CreateTask {
                    name: "follow-up".to_string(),
                    description: "d".to_string(),
                    dependencies: vec![base.id],
                    ..CreateTask::default()
                },
            )
            .await
            .unwrap();

        let report = vault.delete_task("auth", base.id).await.unwrap();
        assert!(!report.success);
        assert!(report.message.contains("follow-up"));
        assert!(vault.get_task("auth", base.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_missing_and_completed_are_refused() {
        let (_dir, vault) = vault();
        let report = vault.delete_task("auth", Uuid::new_v4()).await.unwrap();
        assert!(!report.success);

        let task = vault
            .create_task(
                "auth",
                CreateTask {
                    name: "t".to_string(),
                    description: "d".to_string(),
                    ..CreateTask::default()
                },
            )
            .await
            .unwrap();
        vault
            .update_task_status("auth", task.id, TaskStatus::Completed)
            .await
            .unwrap();
        let report = vault.delete_task("auth", task.id).await.unwrap();
        assert!(!report.success);
    }

    #[tokio::test]
    async fn can_execute_treats_unresolved_dependencies_as_blocking() {
        let (_dir, vault) = vault();
        let ghost = Uuid::new_v4();
        let task = vault
            .create_task(
                "auth",
                CreateTask {
                    name: "t".to_string(),
                    description: "d".to_string(),
                    dependencies: vec![ghost],
                    ..CreateTask::default()
                },
            )
            .await
            .unwrap();

        let gate = vault.can_execute("auth", task.id).await.unwrap();
        assert!(!gate.can_execute);
        assert_eq!(gate.blocked_by, vec![ghost]);
    }

    #[tokio::test]
    async fn content_update_reports_not_found_and_noop() {
        let (_dir, vault) = vault();
        let report = vault
            .update_task_content("auth", Uuid::new_v4(), ContentPatch::default())
            .await
            .unwrap();
        assert!(!report.success);

        let task = vault
            .create_task(
                "auth",
                CreateTask {
                    name: "t".to_string(),
                    description: "d".to_string(),
                    ..CreateTask::default()
                },
            )
            .await
            .unwrap();
        let report = vault
            .update_task_content("auth", task.id, ContentPatch::default())
            .await
            .unwrap();
        assert!(report.success);
        assert_eq!(report.message, "nothing to update");
    }
}

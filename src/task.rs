//! Task data model
//!
//! Tasks are persisted per requirement as a `{ "tasks": [...] }` document.
//! The schema is strict with one declared exception: a stored task missing
//! `created_at` or `updated_at` gets "now" at deserialization time. Any
//! other shape violation is a parse error, not something to paper over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a task
///
/// Normal flow is one-way: pending, then in progress, then completed. The
/// standard update path never transitions a task out of `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

/// Reference to another task in the same requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub task_id: Uuid,
}

/// How a related file matters to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedFileType {
    ToModify,
    Reference,
    Create,
    Dependency,
    Other,
}

/// File associated with a task, optionally narrowed to a line range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedFile {
    pub path: String,
    #[serde(rename = "type")]
    pub file_type: RelatedFileType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
}

/// A unit of work with status, dependencies, and descriptive metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_guide: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_criteria: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub dependencies: Vec<TaskDependency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_files: Option<Vec<RelatedFile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build a fresh pending task with a new v4 id
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            notes: None,
            implementation_guide: None,
            verification_criteria: None,
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            related_files: None,
            analysis_result: None,
            summary: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Whether this task lists `id` among its dependencies
    pub fn depends_on(&self, id: Uuid) -> bool {
        self.dependencies.iter().any(|dep| dep.task_id == id)
    }
}

/// On-disk shape of a requirement's task list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskListDoc {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

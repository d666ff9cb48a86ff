//! Batch reconciliation
//!
//! Merges a submitted task batch into a requirement's existing state under
//! one of four policies, resolving dependency references given either as ids
//! or as task names. The core is a pure function over task lists; the store
//! wiring runs it inside a single locked read-modify-write, so a batch is
//! all-or-nothing with respect to validation failures.
//!
//! Unresolvable dependency references are dropped, not rejected. That
//! tolerates partially sketched plans during iterative splitting, at the
//! cost of a typo failing silently.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::repo::TaskVault;
use crate::task::{RelatedFile, Task, TaskDependency, TaskListDoc};

/// Policy for merging a submitted batch into existing tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchMode {
    /// Keep every existing task; all submitted tasks are new
    Append,
    /// Keep only completed existing tasks; all submitted tasks are new
    Overwrite,
    /// Update non-completed existing tasks by name, keep the rest
    Selective,
    /// Discard all existing tasks (archive beforehand via clear-all)
    ClearAllTasks,
}

/// One submitted task in a batch
///
/// Dependencies are free-form references: either a task id or a task name,
/// resolved during reconciliation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub notes: Option<String>,
    pub dependencies: Vec<String>,
    pub related_files: Option<Vec<RelatedFile>>,
    pub implementation_guide: Option<String>,
    pub verification_criteria: Option<String>,
}

/// Result of reconciling a batch
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Full task list to persist (kept tasks followed by batch tasks)
    pub tasks: Vec<Task>,
    /// Tasks created or updated by this batch, in draft order
    pub submitted: Vec<Task>,
}

/// Reconcile `drafts` against `existing` under `mode`
///
/// Rejects the whole batch when two drafts share a name; nothing else fails.
/// `analysis_result` is stamped onto every task the batch touches.
pub fn reconcile(
    existing: Vec<Task>,
    drafts: &[TaskDraft],
    mode: BatchMode,
    analysis_result: Option<&str>,
) -> Result<ReconcileOutcome> {
    let mut seen = HashSet::new();
    for draft in drafts {
        if !seen.insert(draft.name.as_str()) {
            return Err(Error::DuplicateTaskName(draft.name.clone()));
        }
    }

    let draft_names: HashSet<&str> = drafts.iter().map(|draft| draft.name.as_str()).collect();
    let mut tasks_to_keep: Vec<Task> = match mode {
        BatchMode::Append => existing.clone(),
        BatchMode::Overwrite => existing
            .iter()
            .filter(|task| task.is_completed())
            .cloned()
            .collect(),
        BatchMode::Selective => existing
            .iter()
            .filter(|task| !draft_names.contains(task.name.as_str()))
            .cloned()
            .collect(),
        BatchMode::ClearAllTasks => Vec::new(),
    };

    // Name -> id map used to resolve dependency references. Seeding order
    // matters: pre-existing tasks first (selective only), then kept tasks,
    // then each batch task as it is assigned an id, so a later draft can
    // depend on an earlier one by name.
    let mut name_to_id: HashMap<String, Uuid> = HashMap::new();
    if mode == BatchMode::Selective {
        for task in &existing {
            name_to_id.insert(task.name.clone(), task.id);
        }
    }
    for task in &tasks_to_keep {
        name_to_id.insert(task.name.clone(), task.id);
    }

    let now = Utc::now();
    let mut submitted: Vec<Task> = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let updatable = (mode == BatchMode::Selective)
            .then(|| name_to_id.get(draft.name.as_str()))
            .flatten()
            .and_then(|id| existing.iter().find(|task| task.id == *id))
            .filter(|task| !task.is_completed());

        if let Some(current) = updatable {
            // Merge into the live task: id, created_at, and status survive;
            // descriptive fields are replaced wholesale. Completed tasks
            // never reach this branch, so a matching completed name falls
            // through and becomes a new task.
            let mut updated = current.clone();
            updated.description = draft.description.clone();
            updated.notes = draft.notes.clone();
            updated.implementation_guide = draft.implementation_guide.clone();
            updated.verification_criteria = draft.verification_criteria.clone();
            updated.analysis_result = analysis_result.map(str::to_string);
            if let Some(files) = &draft.related_files {
                updated.related_files = Some(files.clone());
            }
            updated.updated_at = now;

            tasks_to_keep.retain(|task| task.id != updated.id);
            submitted.push(updated);
        } else {
            let mut task = Task::new(draft.name.clone(), draft.description.clone());
            task.notes = draft.notes.clone();
            task.implementation_guide = draft.implementation_guide.clone();
            task.verification_criteria = draft.verification_criteria.clone();
            task.related_files = draft.related_files.clone();
            task.analysis_result = analysis_result.map(str::to_string);

            name_to_id.insert(task.name.clone(), task.id);
            submitted.push(task);
        }
    }

    // Dependency resolution over the final id universe: kept tasks plus
    // everything this batch produced.
    let known_ids: HashSet<Uuid> = tasks_to_keep
        .iter()
        .chain(submitted.iter())
        .map(|task| task.id)
        .collect();

    for (draft, task) in drafts.iter().zip(submitted.iter_mut()) {
        if draft.dependencies.is_empty() {
            // No references submitted: an updated task keeps its current
            // dependency list, a new task has none.
            continue;
        }

        let mut resolved = Vec::new();
        for reference in &draft.dependencies {
            if is_uuid_shaped(reference) {
                if let Ok(id) = Uuid::parse_str(reference) {
                    if known_ids.contains(&id) {
                        resolved.push(TaskDependency { task_id: id });
                    }
                }
            } else if let Some(id) = name_to_id.get(reference.as_str()) {
                resolved.push(TaskDependency { task_id: *id });
            }
            // Unresolved references are dropped.
        }
        task.dependencies = resolved;
    }

    let mut tasks = tasks_to_keep;
    tasks.extend(submitted.iter().cloned());

    Ok(ReconcileOutcome { tasks, submitted })
}

/// Whether `value` has the canonical hyphenated UUID shape
///
/// Only this shape is treated as an id reference; anything else is looked up
/// as a task name.
fn is_uuid_shaped(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(index, byte)| match index {
        8 | 13 | 18 | 23 => *byte == b'-',
        _ => byte.is_ascii_hexdigit(),
    })
}

impl TaskVault {
    /// Reconcile a submitted batch into a requirement under `mode`
    ///
    /// Validation failures (duplicate names in the batch) leave storage
    /// untouched. Returns the tasks created or updated by the batch.
    pub async fn apply_batch(
        &self,
        requirement: &str,
        drafts: Vec<TaskDraft>,
        mode: BatchMode,
        analysis_result: Option<String>,
    ) -> Result<Vec<Task>> {
        let file = self.ensure(requirement).await?;

        let submitted = self
            .records()
            .update_json(&file, move |doc: &mut TaskListDoc| {
                let outcome = reconcile(
                    std::mem::take(&mut doc.tasks),
                    &drafts,
                    mode,
                    analysis_result.as_deref(),
                )?;
                doc.tasks = outcome.tasks;
                Ok(outcome.submitted)
            })
            .await?;

        self.refresh_projection(requirement).await;
        Ok(submitted)
    }
}

//! Search across live and archived tasks
//!
//! Two query modes: exact id, or whitespace-tokenized keywords where every
//! token must match at least one searchable field (AND across tokens, OR
//! across fields). The corpus is the requirement's live list unioned with
//! archival snapshots; a live task shadows an archived copy with the same
//! id. Archive scanning is an in-process document scan, bounded by
//! configuration: newest snapshots first, unreadable ones skipped.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::repo::{read_task_doc, TaskVault};
use crate::task::{Task, TaskListDoc};

/// Page descriptor for a search result
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_results: usize,
    pub has_more: bool,
}

/// One page of matching tasks
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

impl TaskVault {
    /// Search a requirement's live tasks and the archive corpus
    ///
    /// `page` is 1-indexed and clamped into the valid range; a `page_size`
    /// of `None` uses the configured default.
    pub async fn search_tasks(
        &self,
        requirement: &str,
        query: &str,
        is_id: bool,
        page: usize,
        page_size: Option<usize>,
    ) -> Result<SearchPage> {
        let page_size = page_size
            .unwrap_or(self.config().search.default_page_size)
            .max(1);

        let live = self.list_tasks(requirement).await?;
        let mut merged: HashMap<Uuid, Task> = HashMap::new();
        for task in live {
            if matches_query(&task, query, is_id) {
                merged.insert(task.id, task);
            }
        }
        for task in self.scan_archives(query, is_id).await? {
            merged.entry(task.id).or_insert(task);
        }

        let mut results: Vec<Task> = merged.into_values().collect();
        results.sort_by(compare_for_ranking);

        let total_results = results.len();
        let total_pages = total_results.div_ceil(page_size).max(1);
        let current_page = page.clamp(1, total_pages);
        let start = (current_page - 1) * page_size;
        let end = (start + page_size).min(total_results);
        let tasks = if start < total_results {
            results[start..end].to_vec()
        } else {
            Vec::new()
        };

        Ok(SearchPage {
            tasks,
            pagination: Pagination {
                current_page,
                total_pages,
                total_results,
                has_more: current_page < total_pages,
            },
        })
    }

    /// Fetch one task's full detail: an id-mode query with page size 1
    ///
    /// Unlike `get_task`, this also finds tasks that only survive in the
    /// archive.
    pub async fn get_task_detail(&self, requirement: &str, id: Uuid) -> Result<Option<Task>> {
        let page = self
            .search_tasks(requirement, &id.to_string(), true, 1, Some(1))
            .await?;
        Ok(page.tasks.into_iter().next())
    }

    /// Collect matching tasks from archival snapshots, newest first, up to
    /// the configured document budget
    async fn scan_archives(&self, query: &str, is_id: bool) -> Result<Vec<Task>> {
        let archive_dir = self.namespace().archive_dir();
        let mut entries = match tokio::fs::read_dir(&archive_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") {
                names.push(name);
            }
        }
        // Timestamped filenames: lexicographic descending = newest first.
        names.sort();
        names.reverse();
        names.truncate(self.config().search.max_archive_scan);

        let mut matches = Vec::new();
        for name in names {
            let path = archive_dir.join(&name);
            let doc: TaskListDoc = match read_task_doc(self.records(), &path).await {
                Ok(doc) => doc,
                Err(err) => {
                    tracing::debug!(snapshot = %name, error = %err, "skipping unreadable snapshot");
                    continue;
                }
            };
            matches.extend(
                doc.tasks
                    .into_iter()
                    .filter(|task| matches_query(task, query, is_id)),
            );
        }
        Ok(matches)
    }
}

/// Ranking order: completed tasks by completion time descending, completed
/// before incomplete, incomplete by update time descending
fn compare_for_ranking(a: &Task, b: &Task) -> Ordering {
    match (a.completed_at, b.completed_at) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.updated_at.cmp(&a.updated_at),
    }
}

/// Whether a task matches the query
///
/// Id mode compares the canonical id string exactly. Keyword mode requires
/// every token (case-insensitive) to appear in at least one of: name,
/// description, notes, implementation guide, summary. An all-whitespace
/// query matches everything.
fn matches_query(task: &Task, query: &str, is_id: bool) -> bool {
    if is_id {
        return task.id.to_string() == query;
    }

    query.split_whitespace().all(|keyword| {
        let keyword = keyword.to_lowercase();
        let fields = [
            Some(task.name.as_str()),
            Some(task.description.as_str()),
            task.notes.as_deref(),
            task.implementation_guide.as_deref(),
            task.summary.as_deref(),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&keyword))
    })
}

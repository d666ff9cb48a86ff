//! Requirement namespace resolution
//!
//! Maps a (data directory, requirement name) pair onto the on-disk layout and
//! polices the names themselves. Layout per data directory root:
//!
//! ```text
//! <root>/
//!   requirement.json          # projection of per-requirement counts
//!   archive/                  # snapshot documents from clear operations
//!   <requirementName>/
//!     tasks.json              # { "tasks": [Task, ...] }
//! ```
//!
//! Requirement names share the root with system entries, so reserved names,
//! hidden names, and path-control characters are rejected before anything is
//! created.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::store::RecordStore;
use crate::task::TaskListDoc;

/// Directory holding archival snapshots
pub const ARCHIVE_DIR: &str = "archive";

/// Per-requirement task list file
pub const TASKS_FILE: &str = "tasks.json";

/// Projection file with per-requirement counts
pub const INFO_FILE: &str = "requirement.json";

/// Names that collide with system entries, compared case-insensitively
const RESERVED_NAMES: [&str; 10] = [
    ARCHIVE_DIR,
    "backup",
    "temp",
    "cache",
    "logs",
    ".git",
    ".svn",
    "node_modules",
    ".ds_store",
    "thumbs.db",
];

/// Characters that cannot appear in a path component
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Resolver for one data directory root
#[derive(Debug, Clone)]
pub struct Namespace {
    root: PathBuf,
}

impl Namespace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a requirement's data
    pub fn requirement_dir(&self, requirement: &str) -> PathBuf {
        self.root.join(requirement)
    }

    /// Path to a requirement's task list file
    pub fn tasks_file(&self, requirement: &str) -> PathBuf {
        self.requirement_dir(requirement).join(TASKS_FILE)
    }

    /// Path to the archival snapshot directory
    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(ARCHIVE_DIR)
    }

    /// Path to the requirement projection file
    pub fn info_file(&self) -> PathBuf {
        self.root.join(INFO_FILE)
    }

    /// Whether a name collides with a system entry or is hidden
    pub fn is_reserved(name: &str) -> bool {
        let lowered = name.to_lowercase();
        RESERVED_NAMES.contains(&lowered.as_str()) || name.starts_with('.')
    }

    /// Validate a requirement name against the namespace rules
    ///
    /// Rejected: empty or whitespace-only names, reserved names
    /// (case-insensitive), hidden names, and names containing characters
    /// illegal in path components. Failures carry a rename suggestion where
    /// one makes sense.
    pub fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::invalid_name(name, "name must not be empty", None));
        }

        if Self::is_reserved(name) {
            return Err(Error::invalid_name(
                name,
                "name collides with a reserved entry",
                Some(format!("use something like \"{name}_requirement\"")),
            ));
        }

        if name
            .chars()
            .any(|ch| ILLEGAL_CHARS.contains(&ch) || ch.is_control())
        {
            return Err(Error::invalid_name(
                name,
                "name contains characters illegal in a path component",
                Some("use letters, digits, underscores, and hyphens".to_string()),
            ));
        }

        Ok(())
    }

    /// Validate `requirement` and make sure its directory and task list
    /// document exist; returns the task file path
    ///
    /// Safe to call on every operation: existing documents are left alone.
    pub async fn ensure_requirement(
        &self,
        store: &RecordStore,
        requirement: &str,
    ) -> Result<PathBuf> {
        Self::validate_name(requirement)?;

        let dir = self.requirement_dir(requirement);
        tokio::fs::create_dir_all(&dir).await?;

        let tasks_file = self.tasks_file(requirement);
        store
            .write_json_if_absent(&tasks_file, &TaskListDoc::default())
            .await?;
        Ok(tasks_file)
    }

    /// Make sure the archive directory exists; returns its path
    pub async fn ensure_archive_dir(&self) -> Result<PathBuf> {
        let dir = self.archive_dir();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// List requirement names by scanning immediate subdirectories of the
    /// root, excluding reserved and hidden entries; sorted
    ///
    /// A missing root means no requirements yet, not an error.
    pub async fn list_requirements(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if Self::is_reserved(&name) {
                continue;
            }
            names.push(name);
        }

        names.sort();
        Ok(names)
    }
}

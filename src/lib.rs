//! taskvault - Requirement-Scoped Task Store
//!
//! This library persists and manipulates a graph of discrete tasks organized
//! under named requirements, driving multi-step planning workflows
//! (plan, split, execute, verify).
//!
//! # Core Concepts
//!
//! - **Requirements**: named namespaces, each holding one independent task list
//! - **Tasks**: units of work with status, dependencies, and metadata
//! - **Reconciliation**: merging a submitted batch under a selected policy
//! - **Archive**: immutable snapshots of completed tasks from clear operations
//! - **Projection**: rebuildable per-requirement counts, never authoritative
//!
//! # Module Organization
//!
//! - `archive`: snapshot-and-clear flow feeding the archive corpus
//! - `complexity`: pure task complexity scoring
//! - `config`: configuration loading from `taskvault.toml`
//! - `error`: error types and result aliases
//! - `lock`: per-path async mutual exclusion
//! - `namespace`: requirement name validation and on-disk layout
//! - `projection`: cached requirement counts and aggregate statistics
//! - `reconcile`: batch reconciliation under four update policies
//! - `repo`: task CRUD, status transitions, and dependency gating
//! - `search`: ranked, paginated search across live and archived tasks
//! - `store`: locked JSON document storage
//! - `task`: the task data model
//!
//! # Concurrency
//!
//! Everything is single-process and cooperative: operations suspend on a
//! per-path lock registry rather than blocking threads, and every
//! read-modify-write on a task file happens under that file's lock. There is
//! no cross-file atomicity and no cross-process coordination.

pub mod archive;
pub mod complexity;
pub mod config;
pub mod error;
pub mod lock;
pub mod namespace;
pub mod projection;
pub mod reconcile;
pub mod repo;
pub mod search;
pub mod store;
pub mod task;

pub use archive::ClearReport;
pub use complexity::{assess, ComplexityAssessment, ComplexityLevel};
pub use config::{SearchConfig, StoreConfig};
pub use error::{Error, Result};
pub use namespace::Namespace;
pub use projection::{RequirementInfo, RequirementStats};
pub use reconcile::{reconcile, BatchMode, TaskDraft};
pub use repo::{
    ActionReport, ContentPatch, ContentUpdateReport, CreateTask, ExecutionGate, TaskPatch,
    TaskVault,
};
pub use search::{Pagination, SearchPage};
pub use task::{RelatedFile, RelatedFileType, Task, TaskDependency, TaskListDoc, TaskStatus};

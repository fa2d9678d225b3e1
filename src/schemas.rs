//! Record types produced by the analyzers
//!
//! Every type here is a plain, serializable data record. Records are created
//! in a single pass by their analyzer and never mutated afterwards; nothing
//! in this crate persists them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;


/// Kind of source span a [`CodeChunk`] covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Function,
    Class,
    Method,
    Import,
    Module,
}

/// A contiguous, addressable unit of source text
///
/// Chunks form a forest: a method carries the id of its enclosing class in
/// `parent_id`, a free function carries none. The reference is a back-pointer
/// only, so chunks stay independently serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Stable unique identifier, assigned at creation
    pub id: Uuid,
    /// Exact source text spanning `[start_line, end_line]`
    pub content: String,
    pub chunk_type: ChunkType,
    pub file_path: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    /// Id of the enclosing chunk (methods reference their class)
    pub parent_id: Option<Uuid>,
    /// Identifiers this chunk's body references (may be empty)
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    /// Leading documentation comment, if any
    pub docstring: Option<String>,
}

/// Classification of an imported module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencySource {
    Stdlib,
    Local,
    External,
}

impl fmt::Display for DependencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencySource::Stdlib => write!(f, "stdlib"),
            DependencySource::Local => write!(f, "local"),
            DependencySource::External => write!(f, "external"),
        }
    }
}

/// One distinct imported module, keyed by its dotted name
///
/// `used_by` and `imports` only grow as more files are analyzed; they are
/// never cleared mid-run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    /// Dotted module name (unique key within one analysis run)
    pub name: String,
    /// Installed version, populated only for external nodes
    pub version: Option<String>,
    pub source: DependencySource,
    /// Resolved module file, populated only for local nodes
    pub file_path: Option<String>,
    /// Files that import this module
    pub used_by: BTreeSet<String>,
    /// Symbol names imported from this module
    pub imports: BTreeSet<String>,
    /// True once any import statement referencing this module was processed
    #[serde(default)]
    pub is_used: bool,
}

/// One raw import occurrence in a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportStatement {
    /// Dotted module name the statement targets
    pub module: String,
    /// Imported symbols; for plain `import x` this is `[x]`
    pub names: Vec<String>,
    pub alias: Option<String>,
    pub file_path: String,
    pub line_number: usize,
    /// Distinguishes `from x import y` from `import x`
    pub is_from_import: bool,
}

/// A single commit as reported by `git log`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitCommit {
    pub hash: String,
    pub author: String,
    pub date: DateTime<Utc>,
    pub message: String,
    pub files_changed: Vec<String>,
    pub insertions: u32,
    pub deletions: u32,
}

/// Git metadata for one tracked file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitFileInfo {
    pub file_path: String,
    pub last_commit_hash: String,
    pub last_author: String,
    pub last_modified: DateTime<Utc>,
    pub total_commits: u32,
    pub contributors: BTreeSet<String>,
    /// Cumulative lines added across the file's full history
    pub lines_added_total: u64,
    /// Cumulative lines removed across the file's full history
    pub lines_removed_total: u64,
    /// Date of the first commit touching the file
    pub creation_date: DateTime<Utc>,
}

/// One branch as reported by `git branch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitBranch {
    pub name: String,
    pub last_commit: String,
    pub last_commit_date: DateTime<Utc>,
    pub is_current: bool,
}

/// Whole-repository statistics, each field independently best-effort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RepositoryStats {
    pub total_commits: u32,
    pub total_authors: u32,
    pub repository_age_days: i64,
    pub current_branch: String,
    pub remote_url: String,
}

/// Attribution for a single source line, from porcelain blame output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlameLine {
    pub commit: String,
    pub author: String,
    pub date: DateTime<Utc>,
    /// The source line content, tab prefix stripped
    pub line: String,
}

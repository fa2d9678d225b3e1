//! # repolens - Structural Analysis of Source Repositories
//!
//! A library for mining the structure of a source-code repository on disk.
//! It produces three complementary, independent views:
//!
//! - **Code chunks**: each Python source file is decomposed into addressable
//!   chunks (functions, classes, methods) with precise line spans, nesting
//!   back-references, and docstrings, via tree-sitter parsing.
//! - **Dependency graph**: a project-wide usage graph of imported modules,
//!   each classified as standard library, local module, or external package,
//!   with bidirectional usage edges and installed-version resolution.
//! - **Repository history**: commit history, per-file authorship and churn,
//!   branches, and line-level blame, mined by invoking the `git` CLI and
//!   parsing its text output into typed records.
//!
//! The three analyzers are leaf components with no dependency on each other.
//! The crate performs no persistence: callers hand it paths, it hands back
//! plain data records.
//!
//! ## Modules
//!
//! - [`chunker`]: per-file code chunk extraction
//! - [`deps`]: project dependency graph construction
//! - [`git`]: repository history and blame extraction
//! - [`schemas`]: the record types all analyzers produce
//! - [`error`]: error types and result aliases
//!
//! ## Usage Example
//!
//! ```no_run
//! use repolens::chunker::ChunkExtractor;
//! use repolens::deps::DependencyGraphBuilder;
//! use repolens::git::GitMetadataExtractor;
//!
//! fn main() -> anyhow::Result<()> {
//!     let chunks = ChunkExtractor::new("src/app.py").extract();
//!     println!("{} chunks", chunks.len());
//!
//!     let graph = DependencyGraphBuilder::new(".").analyze_project()?;
//!     println!("{} modules imported", graph.nodes().len());
//!
//!     let git = GitMetadataExtractor::new(".")?;
//!     for commit in git.recent_commits(10, None) {
//!         println!("{} {}", &commit.hash[..8], commit.message);
//!     }
//!     Ok(())
//! }
//! ```

/// Per-file code chunk extraction via tree-sitter
pub mod chunker;

/// Project dependency graph construction and import classification
pub mod deps;

/// Error types and utilities
pub mod error;

/// Git history, authorship, and blame extraction via the git CLI
pub mod git;

/// Record types produced by the analyzers
pub mod schemas;

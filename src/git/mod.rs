//! Git history, authorship, and blame extraction
//!
//! Wraps the `git` command-line tool as a subprocess, one invocation per
//! query, and parses its text output into the typed records in
//! [`crate::schemas`]. The output formats of the fixed set of subcommands
//! used here are a de facto wire contract; each has a dedicated parser in
//! [`parse`].
//!
//! Error policy: construction fails when the path is not a repository;
//! everything after that degrades. A failed or missing subprocess call is
//! logged and surfaces as an empty string, empty list, or `None`, never as
//! an error.

pub mod parse;

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::GitError;
use crate::schemas::{BlameLine, GitBranch, GitCommit, GitFileInfo, RepositoryStats};

/// Extracts git metadata for files and repositories
pub struct GitMetadataExtractor {
    repo_path: PathBuf,
}

impl GitMetadataExtractor {
    /// Open a repository rooted at `repo_path`
    ///
    /// Fails only when the `.git` control directory is absent. A missing git
    /// executable surfaces later, as empty query results.
    pub fn new(repo_path: impl AsRef<Path>) -> Result<Self, GitError> {
        let repo_path = repo_path.as_ref().to_path_buf();
        if !repo_path.join(".git").exists() {
            return Err(GitError::RepoNotFound(repo_path.display().to_string()));
        }
        Ok(Self { repo_path })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Run one git command, returning trimmed stdout or "" on any failure
    fn run_git<I, S>(&self, args: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<std::ffi::OsString> =
            args.into_iter().map(|a| a.as_ref().to_os_string()).collect();

        match Command::new("git")
            .args(&args)
            .current_dir(&self.repo_path)
            .output()
        {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            Ok(output) => {
                tracing::warn!(
                    "git command failed: git {:?}: {}",
                    args,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                String::new()
            }
            Err(e) => {
                tracing::warn!("git could not be run: {}", e);
                String::new()
            }
        }
    }

    /// Path relative to the repository root, as git reports it
    fn rel_path(&self, file_path: &Path) -> String {
        file_path
            .strip_prefix(&self.repo_path)
            .unwrap_or(file_path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Git metadata for a specific file; `None` when the file is untracked
    pub fn file_info(&self, file_path: impl AsRef<Path>) -> Option<GitFileInfo> {
        let rel = self.rel_path(file_path.as_ref());

        let tracked = self.run_git(["ls-files"]);
        if !tracked.lines().any(|line| line == rel) {
            return None;
        }

        let last_commit_info = self.run_git([
            "log",
            "-1",
            "--format=%H|%an|%ad",
            "--date=iso",
            "--",
            rel.as_str(),
        ]);
        if last_commit_info.is_empty() {
            return None;
        }
        let (last_commit_hash, last_author, last_modified) =
            parse::parse_log_line(&last_commit_info)?;

        let commit_count = self.run_git(["rev-list", "--count", "HEAD", "--", rel.as_str()]);
        let total_commits = commit_count.parse::<u32>().unwrap_or(0);

        let contributors_output = self.run_git(["log", "--format=%an", "--", rel.as_str()]);
        let contributors = contributors_output
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        // First commit touching the file; the most recent one is the fallback
        let creation_output = self.run_git([
            "log",
            "--format=%ad",
            "--date=iso",
            "--reverse",
            "--",
            rel.as_str(),
        ]);
        let creation_date = creation_output
            .lines()
            .next()
            .and_then(parse::parse_git_date)
            .unwrap_or(last_modified);

        let numstat = self.run_git(["log", "--numstat", "--pretty=format:", "--", rel.as_str()]);
        let (lines_added_total, lines_removed_total) = parse::parse_numstat_totals(&numstat);

        Some(GitFileInfo {
            file_path: file_path.as_ref().display().to_string(),
            last_commit_hash,
            last_author,
            last_modified,
            total_commits,
            contributors,
            lines_added_total,
            lines_removed_total,
            creation_date,
        })
    }

    /// Recent commits in reverse-chronological order, optionally scoped to
    /// one file
    pub fn recent_commits(&self, limit: usize, file_path: Option<&Path>) -> Vec<GitCommit> {
        let mut args = vec![
            "log".to_string(),
            format!("--max-count={limit}"),
            "--format=%H|%an|%ad|%s".to_string(),
            "--date=iso".to_string(),
        ];
        if let Some(path) = file_path {
            args.push("--".to_string());
            args.push(self.rel_path(path));
        }

        let output = self.run_git(&args);
        let mut commits = Vec::new();

        for line in output.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((hash, author, date, message)) = parse::parse_commit_line(line) else {
                tracing::warn!("Skipping malformed log line: {}", line);
                continue;
            };

            let files_changed: Vec<String> = self
                .run_git(["diff-tree", "--no-commit-id", "--name-only", "-r", hash.as_str()])
                .lines()
                .filter(|f| !f.trim().is_empty())
                .map(str::to_string)
                .collect();

            let stats = self.run_git(["show", "--stat", "--format=", hash.as_str()]);
            let (insertions, deletions) = parse::parse_stat_summary(&stats);

            commits.push(GitCommit {
                hash,
                author,
                date,
                message,
                files_changed,
                insertions,
                deletions,
            });
        }

        commits
    }

    /// All branches, with the currently checked-out one flagged
    pub fn branches(&self) -> Vec<GitBranch> {
        let output = self.run_git([
            "branch",
            "-v",
            "--format=%(refname:short)|%(objectname)|%(committerdate:iso)|%(HEAD)",
        ]);
        let current_branch = self.run_git(["branch", "--show-current"]);

        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| parse::parse_branch_line(line, &current_branch))
            .collect()
    }

    /// Overall repository statistics, each field independently best-effort
    pub fn repository_stats(&self) -> RepositoryStats {
        let total_commits = self
            .run_git(["rev-list", "--count", "HEAD"])
            .parse::<u32>()
            .unwrap_or(0);

        let shortlog = self.run_git(["shortlog", "-sn", "--all"]);
        let total_authors = parse::parse_shortlog_author_count(&shortlog);

        let first_commit = self.run_git(["log", "--reverse", "--format=%ad", "--date=iso"]);
        let last_commit = self.run_git(["log", "-1", "--format=%ad", "--date=iso"]);
        let repository_age_days = match (
            first_commit.lines().next().and_then(parse::parse_git_date),
            parse::parse_git_date(&last_commit),
        ) {
            (Some(first), Some(last)) => (last - first).num_days(),
            _ => 0,
        };

        RepositoryStats {
            total_commits,
            total_authors,
            repository_age_days,
            current_branch: self.run_git(["branch", "--show-current"]),
            remote_url: self.run_git(["config", "--get", "remote.origin.url"]),
        }
    }

    /// Line-by-line attribution for a file, keyed by 1-based line number
    ///
    /// Empty output (untracked, empty, or binary files) yields an empty map.
    pub fn file_blame(&self, file_path: impl AsRef<Path>) -> BTreeMap<usize, BlameLine> {
        let rel = self.rel_path(file_path.as_ref());
        let output = self.run_git(["blame", "--line-porcelain", "--", rel.as_str()]);
        parse::parse_blame(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_rejects_non_repository() {
        let dir = TempDir::new().unwrap();
        let result = GitMetadataExtractor::new(dir.path());
        assert!(matches!(result, Err(GitError::RepoNotFound(_))));
    }

    #[test]
    fn test_new_accepts_repository_marker() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(GitMetadataExtractor::new(dir.path()).is_ok());
    }

    #[test]
    fn test_rel_path_strips_repo_prefix() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let git = GitMetadataExtractor::new(dir.path()).unwrap();

        let abs = dir.path().join("src").join("app.py");
        assert_eq!(git.rel_path(&abs), "src/app.py");
        assert_eq!(git.rel_path(Path::new("already/relative.py")), "already/relative.py");
    }
}

//! Integration tests for git metadata extraction against real repositories
//!
//! Each test builds a throwaway repository with the git CLI in a TempDir.
//! Tests are skipped (not failed) when git is unavailable in the environment.

use std::path::Path;
use std::process::Command;

use repolens::error::GitError;
use repolens::git::GitMetadataExtractor;
use tempfile::TempDir;

fn init_tracing() {
    // Repeated init across tests in one binary is fine; only the first wins
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(repo: &Path, args: &[&str], date: &str) {
    let status = Command::new("git")
        .args(args)
        .current_dir(repo)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {:?} failed", args);
}

/// Two commits in a fresh repo: the first adds a 3-line file, the second
/// replaces one of its lines (1 insertion, 1 deletion).
fn fixture_repo() -> TempDir {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let repo = dir.path();
    let d1 = "2024-01-01 10:00:00 +0000";
    let d2 = "2024-01-02 10:00:00 +0000";

    git(repo, &["init", "--quiet"], d1);
    git(repo, &["config", "user.name", "Test User"], d1);
    git(repo, &["config", "user.email", "test@example.com"], d1);

    std::fs::write(repo.join("app.py"), "line one\nline two\nline three\n").unwrap();
    git(repo, &["add", "app.py"], d1);
    git(repo, &["commit", "--quiet", "-m", "Add app"], d1);

    std::fs::write(repo.join("app.py"), "line one\nline 2 changed\nline three\n").unwrap();
    git(repo, &["add", "app.py"], d2);
    git(repo, &["commit", "--quiet", "-m", "Change line two"], d2);

    dir
}

#[test]
fn test_recent_commits_match_fixture() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = fixture_repo();
    let git = GitMetadataExtractor::new(dir.path()).unwrap();

    let commits = git.recent_commits(2, None);
    assert_eq!(commits.len(), 2);

    // Reverse-chronological order
    assert_eq!(commits[0].message, "Change line two");
    assert_eq!(commits[1].message, "Add app");
    assert!(commits[0].date > commits[1].date);

    assert_eq!(commits[0].author, "Test User");
    assert_eq!(commits[0].hash.len(), 40);

    // Second commit replaced one line
    assert_eq!(commits[0].insertions, 1);
    assert_eq!(commits[0].deletions, 1);
    assert_eq!(commits[0].files_changed, vec!["app.py".to_string()]);

    // First commit added three lines
    assert_eq!(commits[1].insertions, 3);
    assert_eq!(commits[1].deletions, 0);
}

#[test]
fn test_recent_commits_respects_limit() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = fixture_repo();
    let git = GitMetadataExtractor::new(dir.path()).unwrap();

    let commits = git.recent_commits(1, None);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message, "Change line two");
}

#[test]
fn test_file_info_for_tracked_file() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = fixture_repo();
    let git = GitMetadataExtractor::new(dir.path()).unwrap();

    let info = git.file_info(dir.path().join("app.py")).unwrap();

    assert_eq!(info.total_commits, 2);
    assert_eq!(info.last_author, "Test User");
    assert_eq!(info.contributors.len(), 1);
    assert!(info.contributors.contains("Test User"));
    // 3 lines added initially plus 1 replaced later
    assert_eq!(info.lines_added_total, 4);
    assert_eq!(info.lines_removed_total, 1);
    assert!(info.creation_date < info.last_modified);
    assert_eq!(info.last_commit_hash.len(), 40);
}

#[test]
fn test_file_info_for_untracked_file_is_none() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = fixture_repo();
    std::fs::write(dir.path().join("scratch.py"), "temp\n").unwrap();
    let git = GitMetadataExtractor::new(dir.path()).unwrap();

    assert!(git.file_info(dir.path().join("scratch.py")).is_none());
    assert!(git.file_info(dir.path().join("never_existed.py")).is_none());
}

#[test]
fn test_repository_stats() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = fixture_repo();
    let git = GitMetadataExtractor::new(dir.path()).unwrap();

    let stats = git.repository_stats();
    assert_eq!(stats.total_commits, 2);
    assert_eq!(stats.total_authors, 1);
    // Fixture commits are exactly one day apart
    assert_eq!(stats.repository_age_days, 1);
    assert!(!stats.current_branch.is_empty());
    // No remote configured: best-effort empty, not an error
    assert!(stats.remote_url.is_empty());
}

#[test]
fn test_branches_flag_current() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = fixture_repo();
    let git = GitMetadataExtractor::new(dir.path()).unwrap();

    let branches = git.branches();
    assert!(!branches.is_empty());

    let current: Vec<_> = branches.iter().filter(|b| b.is_current).collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].last_commit.len(), 40);
}

#[test]
fn test_file_blame_single_author() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    init_tracing();
    let dir = TempDir::new().unwrap();
    let repo = dir.path();
    let date = "2024-01-01 10:00:00 +0000";

    git(repo, &["init", "--quiet"], date);
    git(repo, &["config", "user.name", "Test User"], date);
    git(repo, &["config", "user.email", "test@example.com"], date);
    std::fs::write(repo.join("three.py"), "a = 1\nb = 2\nc = 3\n").unwrap();
    git(repo, &["add", "three.py"], date);
    git(repo, &["commit", "--quiet", "-m", "Add three lines"], date);

    let git = GitMetadataExtractor::new(repo).unwrap();
    let blame = git.file_blame(repo.join("three.py"));

    assert_eq!(blame.len(), 3);
    for line_num in 1..=3usize {
        assert!(blame.contains_key(&line_num), "line {line_num} missing");
    }
    assert_eq!(blame[&1].commit, blame[&2].commit);
    assert_eq!(blame[&2].commit, blame[&3].commit);
    assert!(blame.values().all(|b| b.author == "Test User"));
    assert_eq!(blame[&1].line, "a = 1");
    assert_eq!(blame[&3].line, "c = 3");
}

#[test]
fn test_blame_on_untracked_file_is_empty() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = fixture_repo();
    let git = GitMetadataExtractor::new(dir.path()).unwrap();

    let blame = git.file_blame(dir.path().join("not_tracked.py"));
    assert!(blame.is_empty());
}

#[test]
fn test_missing_repository_is_a_hard_error() {
    let dir = TempDir::new().unwrap();
    let result = GitMetadataExtractor::new(dir.path());
    assert!(matches!(result, Err(GitError::RepoNotFound(_))));
}

//! Parsers for git subcommand text output
//!
//! Each git subcommand this crate invokes has a small ad hoc wire format.
//! Every format gets its own parser with the expected contract documented
//! next to it, so format drift shows up in targeted tests instead of being
//! silently misparsed.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::schemas::{BlameLine, GitBranch};

static INSERTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) insertions?\(\+\)").unwrap());
static DELETIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) deletions?\(-\)").unwrap());

/// Parse a `--date=iso` date string, e.g. `2024-01-05 14:30:00 +0100`
///
/// The single space before the time component is replaced with `T` to form
/// an ISO-8601 string; a trailing UTC offset is honored when present.
pub fn parse_git_date(raw: &str) -> Option<DateTime<Utc>> {
    let iso = raw.trim().replacen(' ', "T", 1);

    if let Ok(dt) = DateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse one `--format=%H|%an|%ad` line into (hash, author, date)
///
/// Split on the first two pipes only; the author name never contains a pipe
/// in practice but the date field ends the record regardless.
pub fn parse_log_line(line: &str) -> Option<(String, String, DateTime<Utc>)> {
    let mut parts = line.splitn(3, '|');
    let hash = parts.next()?.to_string();
    let author = parts.next()?.to_string();
    let date = parse_git_date(parts.next()?)?;
    Some((hash, author, date))
}

/// Parse one `--format=%H|%an|%ad|%s` line into (hash, author, date, subject)
///
/// Split on the first three pipes only: the subject may itself contain pipes.
pub fn parse_commit_line(line: &str) -> Option<(String, String, DateTime<Utc>, String)> {
    let mut parts = line.splitn(4, '|');
    let hash = parts.next()?.to_string();
    let author = parts.next()?.to_string();
    let date = parse_git_date(parts.next()?)?;
    let subject = parts.next()?.to_string();
    Some((hash, author, date, subject))
}

/// Sum the numeric columns of `git log --numstat` output
///
/// Each data line is `<added>\t<removed>\t<path>`; binary files report `-`
/// in the numeric columns and are skipped.
pub fn parse_numstat_totals(output: &str) -> (u64, u64) {
    let mut added_total = 0u64;
    let mut removed_total = 0u64;

    for line in output.lines() {
        if !line.contains('\t') {
            continue;
        }
        let mut cols = line.split('\t');
        let added = cols.next().and_then(|c| c.parse::<u64>().ok());
        let removed = cols.next().and_then(|c| c.parse::<u64>().ok());
        if let (Some(added), Some(removed)) = (added, removed) {
            added_total += added;
            removed_total += removed;
        }
    }

    (added_total, removed_total)
}

/// Extract insertions/deletions from `git show --stat` summary output
///
/// Matches the phrases `N insertion(s)(+)` and `N deletion(s)(-)` in the
/// trailing summary line, defaulting to 0 when a phrase is absent.
pub fn parse_stat_summary(output: &str) -> (u32, u32) {
    let first_capture = |re: &Regex| {
        re.captures(output)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };

    (first_capture(&INSERTIONS_RE), first_capture(&DELETIONS_RE))
}

/// Parse one `git branch --format=%(refname:short)|%(objectname)|%(committerdate:iso)|%(HEAD)` line
///
/// `is_current` comes from string equality against the checked-out branch
/// name. A malformed date falls back to the current timestamp rather than
/// failing the whole listing.
pub fn parse_branch_line(line: &str, current_branch: &str) -> Option<GitBranch> {
    if !line.contains('|') {
        return None;
    }
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 3 {
        return None;
    }

    let name = parts[0].to_string();
    let last_commit = parts[1].to_string();
    let last_commit_date = match parse_git_date(parts[2]) {
        Some(date) => date,
        None => {
            tracing::warn!("Error parsing branch date '{}'", parts[2]);
            Utc::now()
        }
    };

    Some(GitBranch {
        is_current: name == current_branch,
        name,
        last_commit,
        last_commit_date,
    })
}

/// Count authors in `git shortlog -sn --all` output (one author per line)
pub fn parse_shortlog_author_count(output: &str) -> u32 {
    output.lines().filter(|line| !line.trim().is_empty()).count() as u32
}

/// Parse `git blame --line-porcelain` output into per-line attributions
///
/// State machine: a header line (first token a 7-40 char hex hash, optionally
/// `^`-prefixed, followed by numeric fields) starts a new attribution block;
/// `author ` / `author-time ` lines update the current attribution; a
/// tab-prefixed line is the actual source line and is the only thing that
/// advances the line counter. Output with no content lines (empty or binary
/// files) yields an empty map.
pub fn parse_blame(output: &str) -> BTreeMap<usize, BlameLine> {
    let mut blame = BTreeMap::new();
    let mut current_commit: Option<String> = None;
    let mut current_author = String::new();
    let mut current_date = DateTime::<Utc>::UNIX_EPOCH;
    let mut line_num = 1usize;

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix('\t') {
            if let Some(commit) = &current_commit {
                blame.insert(
                    line_num,
                    BlameLine {
                        commit: commit.clone(),
                        author: current_author.clone(),
                        date: current_date,
                        line: rest.to_string(),
                    },
                );
            }
            line_num += 1;
        } else if let Some(hash) = blame_header_hash(line) {
            current_commit = Some(hash);
        } else if let Some(author) = line.strip_prefix("author ") {
            current_author = author.to_string();
        } else if let Some(timestamp) = line.strip_prefix("author-time ") {
            if let Some(date) = timestamp
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            {
                current_date = date;
            }
        }
    }

    blame
}

/// Extract the commit hash from a blame header line, if this is one
///
/// A header is `<hash> <orig-line> <final-line> [<group-size>]`; boundary
/// commits carry a `^` prefix on the hash.
fn blame_header_hash(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    let hash = first.strip_prefix('^').unwrap_or(first);

    if hash.len() < 7 || hash.len() > 40 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    // At least two trailing numeric fields distinguish a header from any
    // porcelain keyword line
    let numeric_fields = tokens
        .take(3)
        .filter(|t| t.chars().all(|c| c.is_ascii_digit()))
        .count();
    if numeric_fields < 2 {
        return None;
    }

    Some(hash.to_string())
}

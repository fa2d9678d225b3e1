//! Installed-package version lookup
//!
//! Resolves the installed version of an external package by reading the
//! metadata directories Python installers leave behind
//! (`<name>-<version>.dist-info` or `<name>-<version>.egg-info`) in
//! site-packages-style directories. Package names are normalized per PEP 503
//! so `Foo_Bar`, `foo.bar`, and `foo-bar` all resolve to the same entry.

use std::collections::HashMap;
use std::path::Path;

/// Index of installed package versions, keyed by normalized package name
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    versions: HashMap<String, String>,
}

impl PackageIndex {
    /// An index that resolves nothing (every lookup yields `None`)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index by scanning site-packages-style directories
    ///
    /// Unreadable directories and entries that do not look like metadata
    /// directories are skipped silently; the index is always best-effort.
    pub fn discover<P: AsRef<Path>>(site_dirs: &[P]) -> Self {
        let mut versions = HashMap::new();

        for dir in site_dirs {
            let entries = match std::fs::read_dir(dir.as_ref()) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!(
                        "Skipping unreadable package directory {}: {}",
                        dir.as_ref().display(),
                        e
                    );
                    continue;
                }
            };

            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                if let Some((package, version)) = parse_metadata_dir_name(name) {
                    versions.insert(normalize_name(&package), version);
                }
            }
        }

        tracing::debug!("Package index holds {} entries", versions.len());
        Self { versions }
    }

    /// Insert one package directly; used for tests and for callers that
    /// already know their environment
    pub fn insert(&mut self, name: &str, version: impl Into<String>) {
        self.versions.insert(normalize_name(name), version.into());
    }

    /// Resolve the installed version of a module
    ///
    /// Tries the module's root segment first (the usual case: `requests.auth`
    /// is distributed as `requests`), then the full dotted name. `None` when
    /// neither is installed.
    pub fn version(&self, module: &str) -> Option<&str> {
        let root = module.split('.').next().unwrap_or(module);
        self.versions
            .get(&normalize_name(root))
            .or_else(|| self.versions.get(&normalize_name(module)))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Split `requests-2.31.0.dist-info` into ("requests", "2.31.0")
fn parse_metadata_dir_name(dir_name: &str) -> Option<(String, String)> {
    let stem = dir_name
        .strip_suffix(".dist-info")
        .or_else(|| dir_name.strip_suffix(".egg-info"))?;

    // Version starts at the last '-' whose following segment begins with a digit
    let (name, version) = stem.rsplit_once('-')?;
    if name.is_empty() || !version.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some((name.to_string(), version.to_string()))
}

/// PEP 503 name normalization: lowercase, runs of `-`, `_`, `.` fold to `-`
fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for c in name.chars() {
        if c == '-' || c == '_' || c == '.' {
            if !last_was_sep {
                out.push('-');
            }
            last_was_sep = true;
        } else {
            out.push(c.to_ascii_lowercase());
            last_was_sep = false;
        }
    }
    out
}

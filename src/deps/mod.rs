//! Project dependency graph construction
//!
//! Walks a Python project tree, extracts every import statement, classifies
//! each target module as standard library, local module, or external package,
//! and aggregates a usage graph keyed by dotted module name.
//!
//! The analysis runs in two phases over the tree: local-module discovery
//! first (the classification universe), then import extraction. State
//! accumulates in an explicit [`DependencyGraphBuilder`]; finalization is a
//! pure step that yields an immutable [`DependencyGraph`].

mod package_index;
mod stdlib;

pub use package_index::PackageIndex;
pub use stdlib::{STDLIB_MODULES, is_stdlib_module};

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};
use walkdir::{DirEntry, WalkDir};

use crate::error::{DependencyError, Result};
use crate::schemas::{DependencyNode, DependencySource, ImportStatement};

/// Directories never descended into during project walks
const SKIP_DIRS: &[&str] = &["__pycache__", "node_modules", "target"];

/// Mutable accumulator for one dependency analysis run
pub struct DependencyGraphBuilder {
    project_root: PathBuf,
    local_modules: BTreeSet<String>,
    nodes: BTreeMap<String, DependencyNode>,
    imports: Vec<ImportStatement>,
    package_index: PackageIndex,
}

impl DependencyGraphBuilder {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
            local_modules: BTreeSet::new(),
            nodes: BTreeMap::new(),
            imports: Vec::new(),
            package_index: PackageIndex::empty(),
        }
    }

    /// Supply an installed-package index for external version resolution
    pub fn with_package_index(mut self, index: PackageIndex) -> Self {
        self.package_index = index;
        self
    }

    /// Run the full two-phase analysis and finalize the graph
    pub fn analyze_project(mut self) -> Result<DependencyGraph> {
        if !self.project_root.exists() {
            return Err(
                DependencyError::RootNotFound(self.project_root.display().to_string()).into(),
            );
        }
        if !self.project_root.is_dir() {
            return Err(
                DependencyError::NotADirectory(self.project_root.display().to_string()).into(),
            );
        }

        self.discover_local_modules();

        let files: Vec<PathBuf> = python_files(&self.project_root).collect();
        for file in &files {
            self.analyze_file(file);
        }
        tracing::debug!(
            "Analyzed {} files, {} import statements",
            files.len(),
            self.imports.len()
        );

        Ok(self.finish())
    }

    /// Phase one: every `.py` file registers its dotted module name and all
    /// dotted prefixes (package names)
    pub fn discover_local_modules(&mut self) -> &BTreeSet<String> {
        for file in python_files(&self.project_root) {
            let rel = file.strip_prefix(&self.project_root).unwrap_or(&file);
            let module_name = module_name_from_path(rel);
            if module_name.is_empty() {
                continue;
            }

            let parts: Vec<&str> = module_name.split('.').collect();
            for i in 1..=parts.len() {
                self.local_modules.insert(parts[..i].join("."));
            }
        }
        &self.local_modules
    }

    /// Extract all import statements from one file and record them
    ///
    /// Unreadable or unparsable files are skipped with a diagnostic and
    /// contribute nothing; they never abort the walk.
    pub fn analyze_file(&mut self, file_path: &Path) -> Vec<ImportStatement> {
        let source = match fs::read_to_string(file_path) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("Error reading {}: {}", file_path.display(), e);
                return Vec::new();
            }
        };

        let tree = match parse_python(&source) {
            Some(tree) => tree,
            None => {
                tracing::warn!("Syntax error in {}", file_path.display());
                return Vec::new();
            }
        };

        let mut imports = Vec::new();
        let file_path_str = file_path.display().to_string();
        collect_imports(tree.root_node(), &source, &file_path_str, &mut imports);

        self.imports.extend(imports.clone());
        imports
    }

    /// Pure finalization: process accumulated imports, fold in declared
    /// manifests, and freeze the graph
    pub fn finish(mut self) -> DependencyGraph {
        let imports = std::mem::take(&mut self.imports);
        for stmt in &imports {
            self.process_import(stmt);
        }
        self.imports = imports;

        self.load_declared_dependencies();

        DependencyGraph {
            project_root: self.project_root,
            nodes: self.nodes,
            imports: self.imports,
        }
    }

    /// Fold one import statement into the node map
    fn process_import(&mut self, stmt: &ImportStatement) {
        let module = &stmt.module;
        let source = self.determine_source(module);

        if !self.nodes.contains_key(module) {
            let version = match source {
                DependencySource::External => {
                    self.package_index.version(module).map(str::to_string)
                }
                _ => None,
            };
            let file_path = match source {
                DependencySource::Local => self.module_file_path(module),
                _ => None,
            };
            self.nodes.insert(
                module.clone(),
                DependencyNode {
                    name: module.clone(),
                    version,
                    source,
                    file_path,
                    used_by: BTreeSet::new(),
                    imports: BTreeSet::new(),
                    is_used: false,
                },
            );
        }

        // Monotonic union: used_by and imports only grow
        if let Some(node) = self.nodes.get_mut(module) {
            node.used_by.insert(stmt.file_path.clone());
            node.imports.extend(stmt.names.iter().cloned());
            node.is_used = true;
        }
    }

    /// Classification precedence: local > stdlib > external
    fn determine_source(&self, module: &str) -> DependencySource {
        if self
            .local_modules
            .iter()
            .any(|local| module.starts_with(local.as_str()))
        {
            return DependencySource::Local;
        }

        let root_module = module.split('.').next().unwrap_or(module);
        if is_stdlib_module(root_module) {
            return DependencySource::Stdlib;
        }

        DependencySource::External
    }

    /// Resolve a local module to its file (`a/b.py` or `a/b/__init__.py`)
    fn module_file_path(&self, module: &str) -> Option<String> {
        let mut base = self.project_root.clone();
        for part in module.split('.') {
            base.push(part);
        }

        let as_file = base.with_extension("py");
        if as_file.exists() {
            return Some(as_file.display().to_string());
        }
        let as_package = base.join("__init__.py");
        if as_package.exists() {
            return Some(as_package.display().to_string());
        }
        None
    }

    /// Register dependencies declared in requirements files and pyproject.toml
    ///
    /// Declared but never-imported packages become external nodes with
    /// `is_used = false`, which is what unused-dependency reporting surfaces.
    fn load_declared_dependencies(&mut self) {
        let mut declared = Vec::new();

        for name in ["requirements.txt", "requirements.in"] {
            let path = self.project_root.join(name);
            if let Ok(content) = fs::read_to_string(&path) {
                declared.extend(parse_requirements(&content));
            }
        }

        let pyproject = self.project_root.join("pyproject.toml");
        if let Ok(content) = fs::read_to_string(&pyproject) {
            match parse_pyproject_dependencies(&content) {
                Ok(names) => declared.extend(names),
                Err(e) => tracing::warn!("Failed to parse {}: {}", pyproject.display(), e),
            }
        }

        for name in declared {
            self.register_declared(&name);
        }
    }

    fn register_declared(&mut self, name: &str) {
        // Declared names use '-', import names use '_'; compare both folded
        let canon = canonical_package_name(name);
        let already_imported = self.nodes.values().any(|node| {
            let root = node.name.split('.').next().unwrap_or(&node.name);
            canonical_package_name(root) == canon
        });
        if already_imported || self.nodes.contains_key(name) {
            return;
        }

        let version = self.package_index.version(name).map(str::to_string);
        self.nodes.insert(
            name.to_string(),
            DependencyNode {
                name: name.to_string(),
                version,
                source: DependencySource::External,
                file_path: None,
                used_by: BTreeSet::new(),
                imports: BTreeSet::new(),
                is_used: false,
            },
        );
    }
}

/// Immutable result of one dependency analysis run
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    project_root: PathBuf,
    nodes: BTreeMap<String, DependencyNode>,
    imports: Vec<ImportStatement>,
}

/// Summary counts by classification source, derived from the node map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DependencySummary {
    pub total: usize,
    pub stdlib: usize,
    pub local: usize,
    pub external: usize,
}

impl DependencyGraph {
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// All dependency nodes, keyed by dotted module name
    pub fn nodes(&self) -> &BTreeMap<String, DependencyNode> {
        &self.nodes
    }

    pub fn get(&self, module: &str) -> Option<&DependencyNode> {
        self.nodes.get(module)
    }

    /// Every raw import occurrence observed, in analysis order
    pub fn imports(&self) -> &[ImportStatement] {
        &self.imports
    }

    /// Declared dependencies no import ever referenced
    pub fn unused_dependencies(&self) -> Vec<&DependencyNode> {
        self.nodes.values().filter(|n| !n.is_used).collect()
    }

    /// Counts per classification source
    pub fn summary(&self) -> DependencySummary {
        let count = |source| {
            self.nodes
                .values()
                .filter(|n| n.source == source)
                .count()
        };
        DependencySummary {
            total: self.nodes.len(),
            stdlib: count(DependencySource::Stdlib),
            local: count(DependencySource::Local),
            external: count(DependencySource::External),
        }
    }

    /// External dependencies ordered by how many files use them
    pub fn most_used_external(&self, limit: usize) -> Vec<&DependencyNode> {
        let mut external: Vec<&DependencyNode> = self
            .nodes
            .values()
            .filter(|n| n.source == DependencySource::External)
            .collect();
        external.sort_by(|a, b| b.used_by.len().cmp(&a.used_by.len()).then(a.name.cmp(&b.name)));
        external.truncate(limit);
        external
    }

    /// Write the whole analysis as pretty-printed JSON
    pub fn export_json(&self, output_path: impl AsRef<Path>) -> Result<()> {
        #[derive(Serialize)]
        struct Export<'a> {
            project_root: String,
            dependencies: &'a BTreeMap<String, DependencyNode>,
            imports: &'a [ImportStatement],
        }

        let export = Export {
            project_root: self.project_root.display().to_string(),
            dependencies: &self.nodes,
            imports: &self.imports,
        };

        let json = serde_json::to_string_pretty(&export).map_err(|e| {
            DependencyError::ExportFailed {
                path: output_path.as_ref().display().to_string(),
                reason: e.to_string(),
            }
        })?;
        fs::write(output_path.as_ref(), json).map_err(|e| DependencyError::ExportFailed {
            path: output_path.as_ref().display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(
            "Dependency analysis exported to {}",
            output_path.as_ref().display()
        );
        Ok(())
    }
}

/// Walk the tree, skipping hidden directories and build/artifact directories
fn python_files(root: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(keep_entry)
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.ends_with(".py") && !name.starts_with('.')
        })
}

fn keep_entry(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !name.starts_with('.') && !SKIP_DIRS.contains(&name.as_ref())
}

/// Path separators become dots, suffix stripped: `a/b/c.py` -> `a.b.c`
fn module_name_from_path(rel_path: &Path) -> String {
    let stem = rel_path.with_extension("");
    stem.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(".")
}

fn parse_python(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .ok()?;
    let tree = parser.parse(source, None)?;
    if tree.root_node().has_error() {
        return None;
    }
    Some(tree)
}

/// Recursive walk collecting both plain and from-style import statements
fn collect_imports(node: Node, source: &str, file_path: &str, imports: &mut Vec<ImportStatement>) {
    match node.kind() {
        "import_statement" => extract_plain_import(node, source, file_path, imports),
        "import_from_statement" => extract_from_import(node, source, file_path, imports),
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_imports(child, source, file_path, imports);
            }
        }
    }
}

/// `import a.b as c, d` produces one statement per comma-separated target
fn extract_plain_import(
    node: Node,
    source: &str,
    file_path: &str,
    imports: &mut Vec<ImportStatement>,
) {
    let line_number = node.start_position().row + 1;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                if let Some(module) = node_text(child, source) {
                    imports.push(ImportStatement {
                        names: vec![module.clone()],
                        module,
                        alias: None,
                        file_path: file_path.to_string(),
                        line_number,
                        is_from_import: false,
                    });
                }
            }
            "aliased_import" => {
                let module = child
                    .child_by_field_name("name")
                    .and_then(|n| node_text(n, source));
                let alias = child
                    .child_by_field_name("alias")
                    .and_then(|n| node_text(n, source));
                if let Some(module) = module {
                    imports.push(ImportStatement {
                        names: vec![module.clone()],
                        module,
                        alias,
                        file_path: file_path.to_string(),
                        line_number,
                        is_from_import: false,
                    });
                }
            }
            _ => {}
        }
    }
}

/// `from a.b import x as y, z` produces one statement carrying all names
///
/// Pure relative imports (`from . import x`) have no module name to classify
/// and are skipped, matching how the target module would be unresolvable.
fn extract_from_import(
    node: Node,
    source: &str,
    file_path: &str,
    imports: &mut Vec<ImportStatement>,
) {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };
    let Some(raw_module) = node_text(module_node, source) else {
        return;
    };
    let module = raw_module.trim_start_matches('.').to_string();
    if module.is_empty() {
        return;
    }

    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.id() == module_node.id() {
            continue;
        }
        match child.kind() {
            "dotted_name" | "identifier" => {
                if let Some(name) = node_text(child, source) {
                    names.push(name);
                }
            }
            "aliased_import" => {
                if let Some(name) = child
                    .child_by_field_name("name")
                    .and_then(|n| node_text(n, source))
                {
                    names.push(name);
                }
            }
            "wildcard_import" => names.push("*".to_string()),
            _ => {}
        }
    }

    imports.push(ImportStatement {
        module,
        names,
        alias: None,
        file_path: file_path.to_string(),
        line_number: node.start_position().row + 1,
        is_from_import: true,
    });
}

fn node_text(node: Node, source: &str) -> Option<String> {
    node.utf8_text(source.as_bytes()).ok().map(str::to_string)
}

/// Strip one requirement line down to its package name
///
/// `requests>=2.0 ; python_version > "3.8"` -> `requests`. Comment lines,
/// blank lines, and pip option lines yield nothing.
fn parse_requirement_name(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
        return None;
    }
    let end = line
        .find(|c: char| " <>=!~;[(#".contains(c))
        .unwrap_or(line.len());
    let name = &line[..end];
    (!name.is_empty()).then(|| name.to_string())
}

fn parse_requirements(content: &str) -> Vec<String> {
    content.lines().filter_map(parse_requirement_name).collect()
}

/// Names from `[project].dependencies` in pyproject.toml
fn parse_pyproject_dependencies(content: &str) -> anyhow::Result<Vec<String>> {
    let value: toml::Value = content.parse()?;
    let deps = value
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array());

    Ok(deps
        .map(|list| {
            list.iter()
                .filter_map(|v| v.as_str())
                .filter_map(parse_requirement_name)
                .collect()
        })
        .unwrap_or_default())
}

fn canonical_package_name(name: &str) -> String {
    name.to_ascii_lowercase().replace(['-', '.'], "_")
}

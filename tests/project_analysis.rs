//! End-to-end analysis of a small synthetic Python project
//!
//! Exercises chunk extraction and dependency-graph construction together
//! the way a calling indexer would: one chunker pass per file, one graph
//! build per project root.

use std::fs;
use std::path::Path;

use repolens::chunker::ChunkExtractor;
use repolens::deps::{DependencyGraphBuilder, PackageIndex};
use repolens::schemas::{ChunkType, DependencySource};
use tempfile::TempDir;

fn init_tracing() {
    // Repeated init across tests in one binary is fine; only the first wins
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn build_project(root: &Path) {
    init_tracing();
    write_file(
        root,
        "pkg/__init__.py",
        "\"\"\"Demo package.\"\"\"\n",
    );
    write_file(
        root,
        "pkg/models.py",
        "\
import json
from dataclasses import dataclass


@dataclass
class User:
    \"\"\"A user record.\"\"\"

    name: str

    def to_json(self):
        return json.dumps({\"name\": self.name})

    def display(self):
        return self.name.title()
",
    );
    write_file(
        root,
        "app.py",
        "\
import os
import requests
from pkg.models import User


def fetch(url):
    \"\"\"Fetch a URL.\"\"\"
    return requests.get(url)


def main():
    user = User(name=os.environ.get(\"USER\", \"anonymous\"))
    print(user.to_json())
",
    );
    write_file(root, "requirements.txt", "requests>=2.0\nclick\n");
}

#[test]
fn test_chunking_every_project_file() {
    let dir = TempDir::new().unwrap();
    build_project(dir.path());

    let chunks = ChunkExtractor::new(dir.path().join("pkg/models.py")).extract();

    // One class and its two methods
    assert_eq!(chunks.len(), 3);
    let class_chunk = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Class)
        .unwrap();
    assert_eq!(class_chunk.docstring.as_deref(), Some("A user record."));

    let methods: Vec<_> = chunks
        .iter()
        .filter(|c| c.chunk_type == ChunkType::Method)
        .collect();
    assert_eq!(methods.len(), 2);
    assert!(methods.iter().all(|m| m.parent_id == Some(class_chunk.id)));
    assert_eq!(class_chunk.end_line, methods[0].start_line - 1);

    let app_chunks = ChunkExtractor::new(dir.path().join("app.py")).extract();
    let functions: Vec<_> = app_chunks
        .iter()
        .filter(|c| c.chunk_type == ChunkType::Function)
        .collect();
    assert_eq!(functions.len(), 2);
    assert_eq!(functions[0].docstring.as_deref(), Some("Fetch a URL."));
}

#[test]
fn test_dependency_graph_over_project() {
    let dir = TempDir::new().unwrap();
    build_project(dir.path());

    let mut index = PackageIndex::empty();
    index.insert("requests", "2.31.0");

    let graph = DependencyGraphBuilder::new(dir.path())
        .with_package_index(index)
        .analyze_project()
        .unwrap();

    // Local package import resolves to its file
    let local = graph.get("pkg.models").unwrap();
    assert_eq!(local.source, DependencySource::Local);
    assert!(local.file_path.as_deref().unwrap().ends_with("models.py"));
    assert!(local.imports.contains("User"));

    // Stdlib: os and json imported from different files
    assert_eq!(graph.get("os").unwrap().source, DependencySource::Stdlib);
    assert_eq!(graph.get("json").unwrap().source, DependencySource::Stdlib);

    // External with installed version
    let requests = graph.get("requests").unwrap();
    assert_eq!(requests.source, DependencySource::External);
    assert_eq!(requests.version.as_deref(), Some("2.31.0"));
    assert!(requests.is_used);

    // Declared in requirements.txt but never imported
    let unused = graph.unused_dependencies();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].name, "click");

    let summary = graph.summary();
    assert_eq!(summary.local, 1);
    assert_eq!(summary.external, 2); // requests + click
    assert_eq!(summary.stdlib, 3); // os, json, dataclasses
    assert_eq!(summary.total, 6);
}

#[test]
fn test_graph_export_roundtrips_through_json() {
    let dir = TempDir::new().unwrap();
    build_project(dir.path());

    let graph = DependencyGraphBuilder::new(dir.path())
        .analyze_project()
        .unwrap();

    let out = dir.path().join("deps.json");
    graph.export_json(&out).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let deps = value["dependencies"].as_object().unwrap();
    assert!(deps.contains_key("requests"));
    assert!(deps.contains_key("pkg.models"));
    assert_eq!(deps["pkg.models"]["source"], "local");
    assert!(!value["imports"].as_array().unwrap().is_empty());
}

#[test]
fn test_broken_file_does_not_poison_the_batch() {
    let dir = TempDir::new().unwrap();
    build_project(dir.path());
    write_file(dir.path(), "broken.py", "def (:\n");

    // Chunking the broken file yields nothing; the rest still works
    assert!(ChunkExtractor::new(dir.path().join("broken.py")).extract().is_empty());

    let graph = DependencyGraphBuilder::new(dir.path())
        .analyze_project()
        .unwrap();
    assert!(graph.get("requests").is_some());
}

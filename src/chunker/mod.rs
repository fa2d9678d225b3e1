//! Per-file code chunk extraction
//!
//! Parses one Python source file with tree-sitter and decomposes it into
//! [`CodeChunk`] records: one chunk per function, one per class header, one
//! per method. A class chunk spans from the `class` line to the line before
//! its first method; methods carry the class chunk's id as `parent_id`.
//!
//! Failure is always local to the file: an unreadable or unparsable file
//! yields zero chunks and a log entry, never an error.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};
use uuid::Uuid;

use crate::schemas::{ChunkType, CodeChunk};

/// Extracts code chunks from a single Python source file
pub struct ChunkExtractor {
    file_path: PathBuf,
    source_lines: Vec<String>,
}

impl ChunkExtractor {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            source_lines: Vec::new(),
        }
    }

    /// Extract all chunks from the file, in source order
    ///
    /// Returns an empty vec (not an error) when the file cannot be read or
    /// fails to parse, so one bad file never aborts a batch.
    pub fn extract(&mut self) -> Vec<CodeChunk> {
        let source = match fs::read_to_string(&self.file_path) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("Error reading {}: {}", self.file_path.display(), e);
                return Vec::new();
            }
        };
        self.source_lines = source.lines().map(String::from).collect();

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
            tracing::warn!("Failed to set parser language: {}", e);
            return Vec::new();
        }

        let tree = match parser.parse(&source, None) {
            Some(tree) => tree,
            None => {
                tracing::warn!("Failed to parse {}", self.file_path.display());
                return Vec::new();
            }
        };

        let root = tree.root_node();
        if root.has_error() {
            tracing::warn!("Syntax error in {}", self.file_path.display());
            return Vec::new();
        }

        let mut chunks = Vec::new();
        self.collect(root, &source, &mut chunks);
        chunks
    }

    /// Recursive traversal over all named nodes
    fn collect(&self, node: Node, source: &str, chunks: &mut Vec<CodeChunk>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if let Some(func) = as_function_def(child) {
                chunks.push(self.function_chunk(func, source, None));
                // Nested defs inside a free function are functions themselves
                if let Some(body) = func.child_by_field_name("body") {
                    self.collect(body, source, chunks);
                }
            } else if let Some(class) = as_class_def(child) {
                self.class_chunks(class, source, chunks);
            } else {
                self.collect(child, source, chunks);
            }
        }
    }

    /// Emit one class chunk plus one method chunk per direct method
    fn class_chunks(&self, class_node: Node, source: &str, chunks: &mut Vec<CodeChunk>) {
        let (class_start, class_end) = line_span(class_node);
        let body = class_node.child_by_field_name("body");

        let methods: Vec<Node> = body
            .map(|b| {
                let mut cursor = b.walk();
                b.named_children(&mut cursor)
                    .filter_map(as_function_def)
                    .collect()
            })
            .unwrap_or_default();

        // The class header stops where its first method begins; a class with
        // no methods spans to its own end line.
        let header_end = methods
            .first()
            .map(|m| m.start_position().row.max(1))
            .unwrap_or(class_end);

        let class_id = Uuid::new_v4();
        chunks.push(CodeChunk {
            id: class_id,
            content: self.slice_lines(class_start, header_end),
            chunk_type: ChunkType::Class,
            file_path: self.file_path.display().to_string(),
            start_line: class_start,
            end_line: header_end,
            parent_id: None,
            dependencies: BTreeSet::new(),
            docstring: self.docstring(class_node, source),
        });

        for method in &methods {
            chunks.push(self.function_chunk(*method, source, Some(class_id)));
            if let Some(body) = method.child_by_field_name("body") {
                self.collect(body, source, chunks);
            }
        }

        // Nested classes, decorated or not, recurse with the same
        // header-span rule
        if let Some(body) = body {
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                if let Some(class) = as_class_def(child) {
                    self.class_chunks(class, source, chunks);
                }
            }
        }
    }

    fn function_chunk(&self, node: Node, source: &str, parent_id: Option<Uuid>) -> CodeChunk {
        let (start_line, end_line) = line_span(node);
        CodeChunk {
            id: Uuid::new_v4(),
            content: self.slice_lines(start_line, end_line),
            chunk_type: if parent_id.is_some() {
                ChunkType::Method
            } else {
                ChunkType::Function
            },
            file_path: self.file_path.display().to_string(),
            start_line,
            end_line,
            parent_id,
            dependencies: BTreeSet::new(),
            docstring: self.docstring(node, source),
        }
    }

    /// Join source lines `start..=end` (1-based, inclusive)
    fn slice_lines(&self, start: usize, end: usize) -> String {
        let start = start.saturating_sub(1).min(self.source_lines.len());
        let end = end.min(self.source_lines.len());
        self.source_lines[start..end].join("\n")
    }

    /// Leading docstring of a function or class definition, if any
    fn docstring(&self, def_node: Node, source: &str) -> Option<String> {
        let body = def_node.child_by_field_name("body")?;
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string_node = first.named_child(0)?;
        if string_node.kind() != "string" {
            return None;
        }
        string_literal_content(string_node, source)
    }
}

/// Unwrap a definition node to its function, looking through decorators
fn as_function_def(node: Node) -> Option<Node> {
    match node.kind() {
        "function_definition" => Some(node),
        "decorated_definition" => {
            let def = node.child_by_field_name("definition")?;
            (def.kind() == "function_definition").then_some(def)
        }
        _ => None,
    }
}

/// Unwrap a definition node to its class, looking through decorators
fn as_class_def(node: Node) -> Option<Node> {
    match node.kind() {
        "class_definition" => Some(node),
        "decorated_definition" => {
            let def = node.child_by_field_name("definition")?;
            (def.kind() == "class_definition").then_some(def)
        }
        _ => None,
    }
}

/// 1-based inclusive line span; end falls back to start when the parser
/// reports nothing past the first line
fn line_span(node: Node) -> (usize, usize) {
    let start = node.start_position().row + 1;
    let end = (node.end_position().row + 1).max(start);
    (start, end)
}

/// Text of a string literal with quotes stripped and whitespace trimmed
fn string_literal_content(node: Node, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "string_content" {
            let text = child.utf8_text(source.as_bytes()).ok()?;
            return Some(text.trim().to_string());
        }
    }

    // Fallback for grammars without a string_content node: trim quote pairs
    let text = node.utf8_text(source.as_bytes()).ok()?;
    let text = text.trim_start_matches(|c: char| c.is_ascii_alphabetic()); // r"", f"", b""
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if text.starts_with(quote) && text.ends_with(quote) && text.len() >= 2 * quote.len() {
            return Some(text[quote.len()..text.len() - quote.len()].trim().to_string());
        }
    }
    Some(text.trim().to_string())
}

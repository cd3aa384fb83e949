//! `CodeChunk`: the unit the splitter emits and the reference-graph builder
//! and indexing orchestrator consume.

use serde::{Deserialize, Serialize};

use crate::language::Language;

/// A semantically meaningful slice of a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChunk {
    /// 32-hex-char (16-byte) content-addressed id. See [`chunk_id`].
    pub id: String,
    pub content: String,
    pub start_line: u32,
    pub end_line: u32,
    pub language: String,
    pub file_path: String,
    pub doc: Option<String>,
    pub parent_chunk_id: Option<String>,
}

impl CodeChunk {
    pub fn language_tag(&self) -> Option<Language> {
        match self.language.as_str() {
            "python" => Some(Language::Python),
            "javascript" => Some(Language::JavaScript),
            "typescript" => Some(Language::TypeScript),
            "rust" => Some(Language::Rust),
            "go" => Some(Language::Go),
            "c" => Some(Language::C),
            "cpp" => Some(Language::Cpp),
            "csharp" => Some(Language::CSharp),
            "java" => Some(Language::Java),
            "php" => Some(Language::Php),
            "ruby" => Some(Language::Ruby),
            "swift" => Some(Language::Swift),
            "kotlin" => Some(Language::Kotlin),
            "scala" => Some(Language::Scala),
            _ => None,
        }
    }
}

/// Normalize a path to the forward-slash, relative form the id scheme and
/// payload schema expect.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// `xxh3_128_hex(normalized_path \x1f node_type \x1f parent_id_or_empty \x1f identifier)`
pub fn chunk_id(normalized_path: &str, node_type: &str, parent_id: Option<&str>, identifier: &str) -> String {
    let mut buf = String::with_capacity(
        normalized_path.len() + node_type.len() + identifier.len() + parent_id.map_or(0, str::len) + 4,
    );
    buf.push_str(normalized_path);
    buf.push('\u{1f}');
    buf.push_str(node_type);
    buf.push('\u{1f}');
    buf.push_str(parent_id.unwrap_or(""));
    buf.push('\u{1f}');
    buf.push_str(identifier);
    crate::hash::hash_bytes(buf.as_bytes())
}

//! Dispatches a file to a per-language tree-sitter grammar and emits
//! semantically meaningful [`CodeChunk`]s: functions, classes, methods and
//! the like, with attached documentation and oversize refinement. Falls
//! back to line-bounded splitting for languages without a linked grammar,
//! or when parsing fails outright.

pub mod doc;
pub mod extract;
pub mod fallback;
pub mod refine;

use std::path::Path;

use tracing::warn;
use tree_sitter::Parser;

use crate::chunk::{chunk_id, normalize_path, CodeChunk};
use crate::language::Language;

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub extract_docs: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        SplitterConfig {
            chunk_size: 2500,
            chunk_overlap: 300,
            extract_docs: true,
        }
    }
}

/// One file's splitter output: the emitted chunks, plus the oversize-split
/// groups the reference-graph builder chains together with CONTINUES edges.
/// Each inner `Vec<String>` is one originating AST node's sub-chunk ids, in
/// emission order.
#[derive(Debug, Default)]
pub struct SplitOutcome {
    pub chunks: Vec<CodeChunk>,
    pub continuation_groups: Vec<Vec<String>>,
}

/// Split one file's source into chunks. `relative_path` is used for id
/// derivation and the chunk's `file_path`; it need not exist on disk.
pub fn split_file(relative_path: &str, source: &str, config: &SplitterConfig) -> SplitOutcome {
    let normalized_path = normalize_path(relative_path);

    let Some(language) = Language::from_path(Path::new(relative_path)) else {
        return SplitOutcome::default();
    };

    let Some(ts_language) = language.tree_sitter_language() else {
        let chunks = fallback::fallback_split(source, &normalized_path, language.as_str(), config.chunk_size);
        return SplitOutcome {
            chunks,
            continuation_groups: Vec::new(),
        };
    };

    let mut parser = Parser::new();
    let tree = parser
        .set_language(&ts_language)
        .ok()
        .and_then(|()| parser.parse(source, None));

    let Some(tree) = tree else {
        warn!("tree-sitter failed to parse {relative_path}, falling back to line-bounded split");
        let chunks = fallback::fallback_split(source, &normalized_path, language.as_str(), config.chunk_size);
        return SplitOutcome {
            chunks,
            continuation_groups: Vec::new(),
        };
    };

    let mut drafts = extract::extract_chunks(tree.root_node(), language, source, &normalized_path, config.extract_docs);

    if drafts.is_empty() {
        return whole_file_chunk(source, &normalized_path, language, config);
    }

    for draft in &mut drafts {
        draft.chunk.language = language.as_str().to_string();
    }

    let mut chunks = Vec::new();
    let mut continuation_groups = Vec::new();
    for draft in drafts {
        let parent_id = draft.chunk.parent_chunk_id.clone();
        let (sub_chunks, group) = refine::refine(
            draft.chunk,
            &normalized_path,
            &draft.node_type,
            parent_id.as_deref(),
            &draft.base_identifier,
            config.chunk_size,
            config.chunk_overlap,
        );
        if let Some(group) = group {
            continuation_groups.push(group);
        }
        chunks.extend(sub_chunks);
    }

    SplitOutcome {
        chunks,
        continuation_groups,
    }
}

fn whole_file_chunk(source: &str, normalized_path: &str, language: Language, config: &SplitterConfig) -> SplitOutcome {
    let content = source.trim();
    if content.is_empty() {
        return SplitOutcome::default();
    }

    let whole = CodeChunk {
        id: chunk_id(normalized_path, "file", None, normalized_path),
        content: content.to_string(),
        start_line: 1,
        end_line: source.lines().count().max(1) as u32,
        language: language.as_str().to_string(),
        file_path: normalized_path.to_string(),
        doc: None,
        parent_chunk_id: None,
    };

    let (chunks, group) = refine::refine(
        whole,
        normalized_path,
        "file",
        None,
        normalized_path,
        config.chunk_size,
        config.chunk_overlap,
    );

    SplitOutcome {
        chunks,
        continuation_groups: group.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_inline_docstring_excised_from_content() {
        let source = "def greet(name):\n    \"\"\"Return a friendly greeting.\"\"\"\n    return f\"Hello, {name}\"\n";
        let outcome = split_file("a.py", source, &SplitterConfig::default());
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.chunks[0].doc.as_deref(), Some("Return a friendly greeting."));
        assert!(!outcome.chunks[0].content.contains("friendly greeting"));
    }

    #[test]
    fn typescript_leading_doc_comment() {
        let source = "/** Adds two numbers */\nexport function add(a: number, b: number) { return a + b; }\n";
        let outcome = split_file("a.ts", source, &SplitterConfig::default());
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.chunks[0].doc.as_deref(), Some("Adds two numbers"));
    }

    #[test]
    fn unsupported_extension_falls_back() {
        let outcome = split_file("a.php", "<?php\nfunction f() { return 1; }\n", &SplitterConfig::default());
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.chunks[0].language, "php");
    }

    #[test]
    fn no_splittable_nodes_emits_whole_file_chunk() {
        let outcome = split_file("a.py", "x = 1\ny = 2\n", &SplitterConfig::default());
        assert_eq!(outcome.chunks.len(), 1);
        assert!(outcome.chunks[0].content.contains("x = 1"));
    }

    #[test]
    fn oversize_function_produces_continuation_group() {
        let mut body = String::from("def big():\n");
        for i in 0..200 {
            body.push_str(&format!("    x{i} = {i}\n"));
        }
        body.push_str("    return x0\n");
        let config = SplitterConfig {
            chunk_size: 200,
            chunk_overlap: 20,
            extract_docs: true,
        };
        let outcome = split_file("a.py", &body, &config);
        assert!(outcome.chunks.len() > 1);
        assert_eq!(outcome.continuation_groups.len(), 1);
        assert_eq!(outcome.continuation_groups[0].len(), outcome.chunks.len());
    }

    #[test]
    fn empty_file_yields_no_chunks() {
        let outcome = split_file("a.py", "", &SplitterConfig::default());
        assert!(outcome.chunks.is_empty());
        assert!(outcome.continuation_groups.is_empty());
    }

    #[test]
    fn nested_function_gets_parent_link() {
        let source = "class Outer:\n    def inner(self):\n        return 1\n";
        let outcome = split_file("a.py", source, &SplitterConfig::default());
        assert_eq!(outcome.chunks.len(), 2);
        let class_chunk = outcome.chunks.iter().find(|c| c.parent_chunk_id.is_none()).unwrap();
        let method_chunk = outcome.chunks.iter().find(|c| c.parent_chunk_id.is_some()).unwrap();
        assert_eq!(method_chunk.parent_chunk_id.as_deref(), Some(class_chunk.id.as_str()));
    }
}

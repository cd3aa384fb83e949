//! AST traversal: walks a parsed file and emits one `CodeChunk` draft per
//! splittable node, tracking the enclosing chunk for `parent_chunk_id` and
//! the raw id-formula inputs each draft was built from.

use tree_sitter::Node;

use crate::chunk::{chunk_id, CodeChunk};
use crate::language::Language;

use super::doc::{extract_inline_docstring, extract_leading_doc_comment};

/// A chunk alongside the inputs that produced its id, needed later by
/// [`super::refine::refine`] to derive disambiguated sub-chunk ids. Carries
/// the originating AST node for callers (the reference-graph builder) that
/// need to re-walk it; [`split_file`](super::split_file) only reads
/// `chunk`/`node_type`/`base_identifier` and lets `node` drop with the tree.
pub struct ChunkDraft<'tree> {
    pub chunk: CodeChunk,
    pub node_type: String,
    pub base_identifier: String,
    pub node: Node<'tree>,
}

/// Walk `root`, emitting a [`ChunkDraft`] for every node whose type is in
/// `lang`'s splittable set. Returns an empty vector if none are found;
/// callers fall back to a whole-file chunk in that case. Drafts come back
/// with `chunk.language` unset; the caller fills it in since it already
/// knows `lang` and doesn't need it threaded through the recursion.
pub fn extract_chunks<'tree>(
    root: Node<'tree>,
    lang: Language,
    source: &str,
    normalized_path: &str,
    extract_docs: bool,
) -> Vec<ChunkDraft<'tree>> {
    let splittable = lang.splittable_node_types();
    let mut out = Vec::new();
    walk(root, splittable, source, normalized_path, extract_docs, None, &mut out);
    out
}

#[allow(clippy::too_many_arguments)]
fn walk<'tree>(
    node: Node<'tree>,
    splittable: &[&str],
    source: &str,
    normalized_path: &str,
    extract_docs: bool,
    parent_id: Option<&str>,
    out: &mut Vec<ChunkDraft<'tree>>,
) {
    let is_splittable = splittable.contains(&node.kind());
    let mut next_parent = parent_id.map(|s| s.to_string());

    if is_splittable {
        if let Some(draft) = build_draft(node, source, normalized_path, extract_docs, parent_id) {
            next_parent = Some(draft.chunk.id.clone());
            out.push(draft);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, splittable, source, normalized_path, extract_docs, next_parent.as_deref(), out);
    }
}

fn build_draft<'tree>(
    node: Node<'tree>,
    source: &str,
    normalized_path: &str,
    extract_docs: bool,
    parent_id: Option<&str>,
) -> Option<ChunkDraft<'tree>> {
    let source_bytes = source.as_bytes();
    let start_line = node.start_position().row as u32 + 1;
    let end_line = node.end_position().row as u32 + 1;

    let (mut content, doc) = if extract_docs {
        if let Some((doc, content)) = extract_inline_docstring(node, source_bytes) {
            (content, Some(doc))
        } else {
            let raw = node.utf8_text(source_bytes).ok()?.to_string();
            let doc = extract_leading_doc_comment(node, source_bytes);
            (raw, doc)
        }
    } else {
        (node.utf8_text(source_bytes).ok()?.to_string(), None)
    };

    content = content.trim().to_string();
    if content.is_empty() {
        return None;
    }

    let base_identifier = node_identifier(node, source_bytes);
    let node_type = node.kind().to_string();
    let id = chunk_id(normalized_path, &node_type, parent_id, &base_identifier);

    let chunk = CodeChunk {
        id,
        content,
        start_line,
        end_line,
        language: String::new(),
        file_path: normalized_path.to_string(),
        doc,
        parent_chunk_id: parent_id.map(|s| s.to_string()),
    };

    Some(ChunkDraft {
        chunk,
        node_type,
        base_identifier,
        node,
    })
}

/// The id-formula `identifier`: the node's `name` field, else the first
/// identifier-shaped descendant, else the node's own source text.
fn node_identifier(node: Node, source: &[u8]) -> String {
    if let Some(name) = node.child_by_field_name("name") {
        if let Ok(text) = name.utf8_text(source) {
            return text.to_string();
        }
    }
    if let Some(id_node) = first_identifier_descendant(node) {
        if let Ok(text) = id_node.utf8_text(source) {
            return text.to_string();
        }
    }
    node.utf8_text(source).unwrap_or_default().to_string()
}

fn first_identifier_descendant(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "identifier" || child.kind().ends_with("_identifier") {
            return Some(child);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_identifier_descendant(child) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(lang: Language, source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser.set_language(&lang.tree_sitter_language().unwrap()).unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn extracts_top_level_python_function() {
        let source = "def f():\n    return 1\n";
        let tree = parse(Language::Python, source);
        let drafts = extract_chunks(tree.root_node(), Language::Python, source, "a.py", true);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].base_identifier, "f");
        assert_eq!(drafts[0].node_type, "function_definition");
        assert!(drafts[0].chunk.parent_chunk_id.is_none());
    }

    #[test]
    fn nested_method_gets_class_as_parent() {
        let source = "class C:\n    def m(self):\n        return 1\n";
        let tree = parse(Language::Python, source);
        let drafts = extract_chunks(tree.root_node(), Language::Python, source, "a.py", true);
        assert_eq!(drafts.len(), 2);
        let class_draft = drafts.iter().find(|d| d.node_type == "class_definition").unwrap();
        let method_draft = drafts.iter().find(|d| d.node_type == "function_definition").unwrap();
        assert_eq!(method_draft.chunk.parent_chunk_id.as_deref(), Some(class_draft.chunk.id.as_str()));
    }

    #[test]
    fn no_splittable_nodes_yields_empty() {
        let source = "x = 1\n";
        let tree = parse(Language::Python, source);
        let drafts = extract_chunks(tree.root_node(), Language::Python, source, "a.py", true);
        assert!(drafts.is_empty());
    }
}

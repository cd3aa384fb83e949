//! Documentation extraction: inline docstrings and leading comment blocks.

use tree_sitter::Node;

/// If `node` has a body whose first statement is a bare string-literal
/// expression, treat it as an inline docstring. Returns the unquoted doc
/// text and `node`'s source text with that literal excised (everything
/// else byte-for-byte unchanged).
pub fn extract_inline_docstring(node: Node, source: &[u8]) -> Option<(String, String)> {
    let body = node.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first_stmt = body.named_children(&mut cursor).next()?;
    if first_stmt.kind() != "expression_statement" {
        return None;
    }
    let mut cursor = first_stmt.walk();
    let literal = first_stmt.named_children(&mut cursor).next()?;
    if !literal.kind().contains("string") {
        return None;
    }

    let raw = literal.utf8_text(source).ok()?;
    let doc = unquote_string_literal(raw);

    let node_start = node.start_byte();
    let rel_start = literal.start_byte() - node_start;
    let rel_end = literal.end_byte() - node_start;
    let node_text = node.utf8_text(source).ok()?;
    let excised = format!("{}{}", &node_text[..rel_start], &node_text[rel_end..]);

    Some((doc, excised))
}

/// Strip a Python/JS-style string literal's quote delimiters and prefix
/// letters (`r`, `b`, `u`, `f`, any case or combination).
fn unquote_string_literal(raw: &str) -> String {
    let quote_start = raw.find(['"', '\'']).unwrap_or(0);
    let body = &raw[quote_start..];
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].trim().to_string();
        }
    }
    body.trim().to_string()
}

/// Walk `node`'s immediately preceding, contiguous `comment` siblings and,
/// if they look like documentation, normalize and join them.
///
/// Accepted as documentation if any line carries a recognized doc-comment
/// prefix (`/**`, `/*!`, `///`, `//!`, `##`), or at least two consecutive
/// `//`/`#` line comments precede the node.
pub fn extract_leading_doc_comment(node: Node, source: &[u8]) -> Option<String> {
    let mut comments = Vec::new();
    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        if s.kind() != "comment" {
            break;
        }
        comments.push(s);
        sibling = s.prev_sibling();
    }
    if comments.is_empty() {
        return None;
    }
    comments.reverse();

    let texts: Vec<&str> = comments.iter().filter_map(|c| c.utf8_text(source).ok()).collect();
    if texts.len() != comments.len() {
        return None;
    }

    let has_doc_prefix = texts.iter().any(|t| {
        let t = t.trim_start();
        t.starts_with("/**") || t.starts_with("/*!") || t.starts_with("///") || t.starts_with("//!") || t.starts_with("##")
    });
    let has_two_consecutive_line_comments = texts.len() >= 2
        && texts.iter().all(|t| {
            let t = t.trim_start();
            (t.starts_with("//") && !t.starts_with("///") && !t.starts_with("//!")) || t.starts_with('#')
        });
    if !has_doc_prefix && !has_two_consecutive_line_comments {
        return None;
    }

    let normalized: Vec<String> = texts.iter().map(|t| normalize_doc_line(t)).collect();
    let joined = normalized.join("\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalize one `comment` node's text, which may span several source
/// lines (a multi-line `/** ... */` block arrives as a single node). Each
/// line is stripped of its comment-opener/closer and any leading `*`/`#`
/// decoration independently, then the lines are rejoined with `\n` so
/// internal structure survives.
fn normalize_doc_line(raw: &str) -> String {
    let lines: Vec<String> = raw
        .lines()
        .map(|line| {
            let mut s = line.trim();
            for marker in ["/**", "*/", "/*!", "///", "//!", "//", "##"] {
                if let Some(rest) = s.strip_prefix(marker) {
                    s = rest;
                }
                if let Some(rest) = s.strip_suffix(marker) {
                    s = rest;
                }
            }
            s.trim_start_matches('*').trim_start_matches('#').trim().to_string()
        })
        .collect();
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use tree_sitter::Parser;

    fn parse(lang: Language, source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser.set_language(&lang.tree_sitter_language().unwrap()).unwrap();
        parser.parse(source, None).unwrap()
    }

    fn find_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if let Some(found) = find_kind(child, kind) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn extracts_python_inline_docstring() {
        let source = "def greet(name):\n    \"\"\"Return a friendly greeting.\"\"\"\n    return name\n";
        let tree = parse(Language::Python, source);
        let func = find_kind(tree.root_node(), "function_definition").unwrap();
        let (doc, content) = extract_inline_docstring(func, source.as_bytes()).unwrap();
        assert_eq!(doc, "Return a friendly greeting.");
        assert!(!content.contains("friendly greeting"));
    }

    #[test]
    fn no_docstring_when_body_is_code() {
        let source = "def f():\n    return 1\n";
        let tree = parse(Language::Python, source);
        let func = find_kind(tree.root_node(), "function_definition").unwrap();
        assert!(extract_inline_docstring(func, source.as_bytes()).is_none());
    }

    #[test]
    fn extracts_leading_block_comment() {
        let source = "/** Adds two numbers */\nexport function add(a, b) { return a + b; }\n";
        let tree = parse(Language::JavaScript, source);
        let func = find_kind(tree.root_node(), "function_declaration").unwrap();
        let doc = extract_leading_doc_comment(func, source.as_bytes());
        assert_eq!(doc.as_deref(), Some("Adds two numbers"));
    }

    #[test]
    fn extracts_multi_line_jsdoc_block_strips_star_decoration() {
        let source = "/**\n * Adds two numbers\n * and returns them\n */\nexport function add(a, b) { return a + b; }\n";
        let tree = parse(Language::JavaScript, source);
        let func = find_kind(tree.root_node(), "function_declaration").unwrap();
        let doc = extract_leading_doc_comment(func, source.as_bytes());
        assert_eq!(doc.as_deref(), Some("Adds two numbers\nand returns them"));
    }

    #[test]
    fn single_plain_line_comment_is_not_doc() {
        let source = "// just a note\nfunction add(a, b) { return a + b; }\n";
        let tree = parse(Language::JavaScript, source);
        let func = find_kind(tree.root_node(), "function_declaration").unwrap();
        assert!(extract_leading_doc_comment(func, source.as_bytes()).is_none());
    }

    #[test]
    fn two_consecutive_line_comments_count_as_doc() {
        let source = "// line one\n// line two\nfunction add(a, b) { return a + b; }\n";
        let tree = parse(Language::JavaScript, source);
        let func = find_kind(tree.root_node(), "function_declaration").unwrap();
        let doc = extract_leading_doc_comment(func, source.as_bytes());
        assert_eq!(doc.as_deref(), Some("line one\nline two"));
    }
}

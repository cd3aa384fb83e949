//! Oversize-chunk refinement: split a too-large chunk along line boundaries
//! and stitch the pieces back together with character overlap.

use crate::chunk::{chunk_id, CodeChunk};

struct Pending {
    lines: Vec<String>,
    start_line: u32,
}

/// Refine `chunk` if its content exceeds `chunk_size`, else return it
/// untouched. When a split occurs, the first sub-chunk keeps `chunk`'s id;
/// later sub-chunks get an id derived from `base_identifier` suffixed with
/// a split ordinal, since the plain `(path, node_type, parent_id,
/// identifier)` tuple is identical across all of them. Also returns the
/// ordered list of sub-chunk ids when a split happened, for the reference
/// graph's CONTINUES edges.
pub fn refine(
    chunk: CodeChunk,
    normalized_path: &str,
    node_type: &str,
    parent_id: Option<&str>,
    base_identifier: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> (Vec<CodeChunk>, Option<Vec<String>>) {
    if chunk.content.len() <= chunk_size {
        return (vec![chunk], None);
    }

    let lines: Vec<&str> = chunk.content.lines().collect();
    let mut pendings: Vec<Pending> = Vec::new();
    let mut buf: Vec<String> = Vec::new();
    let mut buf_len = 0usize;
    let mut buf_start = chunk.start_line;
    let mut line_no = chunk.start_line;

    for line in &lines {
        let joiner = if buf.is_empty() { 0 } else { 1 };
        if buf_len + joiner + line.len() > chunk_size && !buf.is_empty() {
            pendings.push(Pending {
                lines: std::mem::take(&mut buf),
                start_line: buf_start,
            });
            buf_len = 0;
            buf_start = line_no;
        }
        if !buf.is_empty() {
            buf_len += 1;
        }
        buf_len += line.len();
        buf.push((*line).to_string());
        line_no += 1;
    }
    if !buf.is_empty() {
        pendings.push(Pending {
            lines: buf,
            start_line: buf_start,
        });
    }

    let mut sub_chunks: Vec<CodeChunk> = pendings
        .into_iter()
        .map(|p| {
            let end_line = p.start_line + p.lines.len() as u32 - 1;
            CodeChunk {
                id: String::new(),
                content: p.lines.join("\n").trim().to_string(),
                start_line: p.start_line,
                end_line,
                language: chunk.language.clone(),
                file_path: chunk.file_path.clone(),
                doc: chunk.doc.clone(),
                parent_chunk_id: chunk.parent_chunk_id.clone(),
            }
        })
        .collect();

    add_overlap(&mut sub_chunks, chunk_overlap);

    let mut ids = Vec::with_capacity(sub_chunks.len());
    for (i, sub) in sub_chunks.iter_mut().enumerate() {
        sub.id = if i == 0 {
            chunk.id.clone()
        } else {
            let identifier = format!("{base_identifier}:split{i}");
            chunk_id(normalized_path, node_type, parent_id, &identifier)
        };
        ids.push(sub.id.clone());
    }

    (sub_chunks, Some(ids))
}

/// For each sub-chunk after the first, prepend the last `chunk_overlap`
/// characters of the (already-overlapped) previous sub-chunk's content,
/// and pull `start_line` back by however many lines that overlap spans,
/// floored at 1.
fn add_overlap(sub_chunks: &mut [CodeChunk], chunk_overlap: usize) {
    if sub_chunks.len() <= 1 || chunk_overlap == 0 {
        return;
    }
    // Overlap text always comes from each sub-chunk's pristine, pre-overlap
    // content, not from a neighbor that has already had overlap prepended.
    let pristine: Vec<String> = sub_chunks.iter().map(|c| c.content.clone()).collect();

    for i in 1..sub_chunks.len() {
        let prev_content = &pristine[i - 1];
        if prev_content.is_empty() {
            continue;
        }
        let overlap_start = prev_content.len().saturating_sub(chunk_overlap);
        let overlap_text = char_boundary_slice(prev_content, overlap_start);
        let overlap_lines = overlap_text.lines().count().max(1) as i64;

        let cur = &mut sub_chunks[i];
        cur.content = format!("{overlap_text}\n{}", cur.content);
        cur.start_line = (cur.start_line as i64 - overlap_lines).max(1) as u32;
    }
}

/// Slice `s[byte_start..]`, nudging `byte_start` forward to the nearest
/// char boundary if it lands mid-codepoint.
fn char_boundary_slice(s: &str, mut byte_start: usize) -> &str {
    while byte_start < s.len() && !s.is_char_boundary(byte_start) {
        byte_start += 1;
    }
    &s[byte_start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, start_line: u32, end_line: u32) -> CodeChunk {
        CodeChunk {
            id: chunk_id("a.py", "function_definition", None, "f"),
            content: content.to_string(),
            start_line,
            end_line,
            language: "python".to_string(),
            file_path: "a.py".to_string(),
            doc: Some("doc".to_string()),
            parent_chunk_id: None,
        }
    }

    #[test]
    fn under_size_chunk_is_unchanged() {
        let c = chunk("small", 1, 1);
        let id_before = c.id.clone();
        let (out, groups) = refine(c, "a.py", "function_definition", None, "f", 2500, 300);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, id_before);
        assert!(groups.is_none());
    }

    #[test]
    fn oversize_chunk_splits_and_first_id_is_preserved() {
        let lines: Vec<String> = (1..=50).map(|i| format!("line number {i} of the function body")).collect();
        let content = lines.join("\n");
        let c = chunk(&content, 10, 59);
        let original_id = c.id.clone();
        let (out, groups) = refine(c, "a.py", "function_definition", None, "f", 200, 20);
        assert!(out.len() > 1);
        assert_eq!(out[0].id, original_id);
        let groups = groups.unwrap();
        assert_eq!(groups.len(), out.len());
        assert_eq!(groups[0], original_id);
        // sub-chunk ids beyond the first are distinct from each other and from the original.
        let unique: std::collections::HashSet<_> = groups.iter().collect();
        assert_eq!(unique.len(), groups.len());
        for sub in &out[1..] {
            assert!(!sub.content.is_empty());
        }
        assert!(out.iter().all(|c| c.doc.as_deref() == Some("doc")));
    }

    #[test]
    fn zero_overlap_on_single_chunk_is_identity() {
        let c = chunk("small", 1, 1);
        let (out, _) = refine(c, "a.py", "function_definition", None, "f", 2500, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "small");
    }

    #[test]
    fn overlap_start_line_is_floored_at_one() {
        let lines: Vec<String> = (1..=10).map(|i| format!("x{i}")).collect();
        let content = lines.join("\n");
        let c = chunk(&content, 1, 10);
        let (out, _) = refine(c, "a.py", "function_definition", None, "f", 5, 1000);
        assert!(out.iter().all(|c| c.start_line >= 1));
    }
}

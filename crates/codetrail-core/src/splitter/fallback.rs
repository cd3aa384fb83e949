//! Line-bounded text splitter used when a file's extension has no grammar,
//! or when parsing fails. No overlap is added between fallback chunks.

use crate::chunk::{chunk_id, CodeChunk};

pub fn fallback_split(content: &str, normalized_path: &str, language: &str, chunk_size: usize) -> Vec<CodeChunk> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut buf_start = 1u32;
    let mut index = 0usize;

    for (i, line) in lines.iter().enumerate() {
        let with_newline_len = line.len() + if i < lines.len() - 1 { 1 } else { 0 };
        if buf.len() + with_newline_len > chunk_size && !buf.trim().is_empty() {
            out.push(make_chunk(&buf, buf_start, i as u32, normalized_path, language, index));
            index += 1;
            buf.clear();
            buf_start = i as u32 + 1;
        }
        buf.push_str(line);
        if i < lines.len() - 1 {
            buf.push('\n');
        }
    }
    if !buf.trim().is_empty() {
        out.push(make_chunk(&buf, buf_start, lines.len() as u32, normalized_path, language, index));
    }
    out
}

fn make_chunk(buf: &str, start_line: u32, end_line: u32, normalized_path: &str, language: &str, index: usize) -> CodeChunk {
    let identifier = format!("block{index}");
    CodeChunk {
        id: chunk_id(normalized_path, "text_block", None, &identifier),
        content: buf.trim().to_string(),
        start_line,
        end_line,
        language: language.to_string(),
        file_path: normalized_path.to_string(),
        doc: None,
        parent_chunk_id: None,
    }
}

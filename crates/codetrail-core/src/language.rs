//! Supported source languages, extension dispatch, and the per-language
//! splittable-AST-node-type tables that the tree-sitter splitter walks.
//!
//! The extension-to-tag mapping and the splittable node sets are a stable
//! wire contract: changing them changes chunk ids for existing codebases.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use tree_sitter::Language as TsLanguage;

/// A language tag recognized by the splitter. Not every tag has a
/// tree-sitter grammar behind it: `Php`, `Ruby`, `Swift`, `Kotlin`, and
/// `Scala` are always routed to the line-bounded fallback splitter, since
/// no grammar for them is part of this crate's dependency set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Rust,
    Go,
    C,
    Cpp,
    CSharp,
    Java,
    Php,
    Ruby,
    Swift,
    Kotlin,
    Scala,
}

impl Language {
    /// The language tag as stored on `CodeChunk::language` and in point payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "typescript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Java => "java",
            Language::Php => "php",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
        }
    }

    /// The tree-sitter grammar backing this language, if any is linked in.
    pub fn tree_sitter_language(&self) -> Option<TsLanguage> {
        match self {
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
            Language::C => Some(tree_sitter_c::LANGUAGE.into()),
            Language::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
            Language::CSharp => Some(tree_sitter_c_sharp::LANGUAGE.into()),
            Language::Java => Some(tree_sitter_java::LANGUAGE.into()),
            Language::Php
            | Language::Ruby
            | Language::Swift
            | Language::Kotlin
            | Language::Scala => None,
        }
    }

    /// Detect a language tag from a lowercase extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        extension_map().get(ext.to_lowercase().as_str()).copied()
    }

    /// Detect a language tag from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// The closed set of AST node type names this language splits on.
    /// Empty for languages with no linked grammar; the splitter falls back
    /// to line-bounded chunking for those regardless of this table.
    pub fn splittable_node_types(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &[
                "function_definition",
                "class_definition",
                "decorated_definition",
                "async_function_definition",
            ],
            Language::TypeScript | Language::Tsx => &[
                "function_declaration",
                "class_declaration",
                "method_definition",
                "interface_declaration",
                "type_alias_declaration",
                "arrow_function",
            ],
            Language::JavaScript => &[
                "function_declaration",
                "class_declaration",
                "method_definition",
                "arrow_function",
            ],
            Language::Rust => &[
                "function_item",
                "impl_item",
                "struct_item",
                "enum_item",
                "trait_item",
                "mod_item",
            ],
            Language::Go => &[
                "function_declaration",
                "method_declaration",
                "type_declaration",
            ],
            Language::Java => &[
                "method_declaration",
                "class_declaration",
                "interface_declaration",
                "constructor_declaration",
            ],
            Language::Cpp => &["function_definition", "class_specifier", "namespace_definition"],
            Language::C => &["function_definition"],
            Language::CSharp => &[
                "method_declaration",
                "class_declaration",
                "interface_declaration",
                "struct_declaration",
                "enum_declaration",
            ],
            Language::Scala => &[
                "method_declaration",
                "class_declaration",
                "interface_declaration",
                "constructor_declaration",
            ],
            Language::Php | Language::Ruby | Language::Swift | Language::Kotlin => &[],
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static EXTENSION_MAP: OnceLock<HashMap<&'static str, Language>> = OnceLock::new();

fn extension_map() -> &'static HashMap<&'static str, Language> {
    EXTENSION_MAP.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("ts", Language::TypeScript);
        map.insert("tsx", Language::Tsx);
        map.insert("js", Language::JavaScript);
        map.insert("jsx", Language::JavaScript);
        map.insert("py", Language::Python);
        map.insert("java", Language::Java);
        map.insert("cpp", Language::Cpp);
        map.insert("hpp", Language::Cpp);
        map.insert("c", Language::C);
        map.insert("h", Language::C);
        map.insert("cs", Language::CSharp);
        map.insert("go", Language::Go);
        map.insert("rs", Language::Rust);
        map.insert("php", Language::Php);
        map.insert("rb", Language::Ruby);
        map.insert("swift", Language::Swift);
        map.insert("kt", Language::Kotlin);
        map.insert("scala", Language::Scala);
        map
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn dispatches_known_extensions() {
        assert_eq!(Language::from_path(&PathBuf::from("a.py")), Some(Language::Python));
        assert_eq!(Language::from_path(&PathBuf::from("a.tsx")), Some(Language::Tsx));
        assert_eq!(Language::from_path(&PathBuf::from("a.rs")), Some(Language::Rust));
        assert_eq!(Language::from_path(&PathBuf::from("a.kt")), Some(Language::Kotlin));
    }

    #[test]
    fn unknown_extension_is_none() {
        assert_eq!(Language::from_path(&PathBuf::from("a.xyz")), None);
    }

    #[test]
    fn fallback_only_languages_have_no_grammar_and_no_node_types() {
        for lang in [Language::Php, Language::Ruby, Language::Swift, Language::Kotlin] {
            assert!(lang.tree_sitter_language().is_none());
            assert!(lang.splittable_node_types().is_empty());
        }
    }

    #[test]
    fn tag_for_tsx_matches_typescript() {
        assert_eq!(Language::Tsx.as_str(), "typescript");
    }
}

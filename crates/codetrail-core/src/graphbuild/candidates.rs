//! Per-file reference resolution: classifies identifiers inside a definition
//! node as bindings, aliases or call/use candidates, and resolves member
//! accesses to an owner name where possible. Grounded in the reference
//! implementation's default resolver, with a Python-specific override for
//! dotted names, walrus bindings and nested-class owner chains.

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use crate::language::Language;

use super::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Call,
    Identifier,
}

#[derive(Debug, Clone)]
pub struct ReferenceCandidate {
    pub name: String,
    pub kind: CandidateKind,
    pub owner: Option<String>,
}

pub struct ChunkContext {
    pub definition_ids: HashSet<usize>,
    pub bound_names: HashSet<String>,
    pub alias_map: HashMap<String, String>,
    pub extra_candidates: Vec<ReferenceCandidate>,
    pub owner_name: Option<String>,
    field_cache: HashMap<usize, Option<String>>,
}

fn node_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").trim().to_string()
}

fn iter_named<'a>(node: Node<'a>, out: &mut Vec<Node<'a>>) {
    out.push(node);
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        iter_named(child, out);
    }
}

fn find_first_identifier<'a>(node: Node<'a>) -> Option<Node<'a>> {
    let mut all = Vec::new();
    iter_named(node, &mut all);
    all.into_iter().skip(1).find(|n| IDENTIFIER_NODE_TYPES.contains(&n.kind()))
}

fn build_field_cache(root: Node) -> HashMap<usize, Option<String>> {
    let mut cache = HashMap::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                cache.insert(child.id(), cursor.field_name().map(|s| s.to_string()));
                stack.push(child);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }
    cache
}

fn is_import_binding(parent: Option<Node>, field_name: Option<&str>) -> bool {
    parent.is_some_and(|p| IMPORT_ALIAS_PARENT_TYPES.contains(&p.kind())) && field_name == Some("alias")
}

fn is_member_attribute_identifier(parent: Option<Node>, field_name: Option<&str>) -> bool {
    parent.is_some_and(|p| MEMBER_NODE_TYPES.contains(&p.kind())) && field_name.is_some_and(|f| MEMBER_ATTRIBUTE_FIELDS.contains(&f))
}

/// Per-language overrides of the default resolution rules. `Default` covers
/// every grammar without a dedicated override.
#[derive(Debug, Clone, Copy)]
pub enum LangBehavior {
    Default,
    Python,
}

pub fn behavior_for(language: Language) -> LangBehavior {
    match language {
        Language::Python => LangBehavior::Python,
        _ => LangBehavior::Default,
    }
}

impl LangBehavior {
    fn is_binding_identifier(&self, parent: Option<Node>, field_name: Option<&str>) -> bool {
        if matches!(self, LangBehavior::Python) {
            if let (Some(p), Some(f)) = (parent, field_name) {
                let pk = p.kind();
                let additional = matches!(
                    (pk, f),
                    ("with_item", "alias") | ("except_clause", "name") | ("as_pattern", "alias") | ("capture_pattern", "name")
                );
                if additional || (pk == "named_expression" && f == "name") {
                    return true;
                }
            }
        }
        default_is_binding_identifier(parent, field_name)
    }

    fn symbol_name_from_node(&self, node: Option<Node>, source: &[u8]) -> Option<String> {
        if matches!(self, LangBehavior::Python) {
            if let Some(n) = node {
                if n.kind() == "dotted_name" {
                    let mut cursor = n.walk();
                    let parts: Vec<String> = n.named_children(&mut cursor).map(|c| node_text(c, source)).filter(|s| !s.is_empty()).collect();
                    return if parts.is_empty() { None } else { Some(parts.join(".")) };
                }
            }
        }
        default_symbol_name_from_node(node, source)
    }

    fn owner_name(&self, node: Node, source: &[u8]) -> Option<String> {
        if matches!(self, LangBehavior::Python) {
            let mut names = Vec::new();
            let mut current = Some(node);
            while let Some(n) = current {
                if n.kind() == "class_definition" {
                    if let Some(name_node) = n.child_by_field_name("name") {
                        let name = node_text(name_node, source);
                        if !name.is_empty() {
                            names.push(name);
                        }
                    }
                }
                current = n.parent();
            }
            if !names.is_empty() {
                names.reverse();
                return Some(names.join("."));
            }
        }
        default_owner_name(node, source)
    }
}

fn default_is_binding_identifier(parent: Option<Node>, field_name: Option<&str>) -> bool {
    let Some(parent) = parent else { return false };
    let pk = parent.kind();
    if PARAMETER_PARENT_TYPES.contains(&pk) || PATTERN_PARENT_TYPES.contains(&pk) {
        return true;
    }
    if let Some(fname) = field_name {
        if ASSIGNMENT_PARENT_TYPES.contains(&pk) && matches!(fname, "left" | "name" | "pattern" | "identifier") {
            return true;
        }
        if LOOP_TARGET_PARENT_TYPES.contains(&pk) && matches!(fname, "left" | "value" | "index" | "name") {
            return true;
        }
        if matches!(pk, "pair" | "property_assignment") && matches!(fname, "key" | "property") {
            return true;
        }
        if pk == "keyword_argument" && fname == "name" {
            return true;
        }
    }
    if CATCH_PARENT_TYPES.contains(&pk) {
        return true;
    }
    is_import_binding(Some(parent), field_name)
}

fn default_symbol_name_from_node(node: Option<Node>, source: &[u8]) -> Option<String> {
    let node = node?;
    let kind = node.kind();
    if IDENTIFIER_NODE_TYPES.contains(&kind) {
        return Some(node_text(node, source));
    }
    if matches!(kind, "dotted_name" | "qualified_identifier" | "scoped_identifier") {
        let mut cursor = node.walk();
        if let Some(last) = node.named_children(&mut cursor).last() {
            return Some(node_text(last, source));
        }
        return Some(node_text(node, source));
    }
    if TYPE_REFERENCE_NODE_TYPES.contains(&kind) {
        let inner = node
            .child_by_field_name("type")
            .or_else(|| node.child_by_field_name("name"))
            .or_else(|| find_first_identifier(node))?;
        return Some(node_text(inner, source));
    }
    if CALL_NODE_TYPES.contains(&kind) {
        let func = node
            .child_by_field_name("function")
            .or_else(|| node.child_by_field_name("name"))
            .or_else(|| find_first_identifier(node))?;
        return Some(node_text(func, source));
    }
    if MEMBER_NODE_TYPES.contains(&kind) {
        let prop = node
            .child_by_field_name("attribute")
            .or_else(|| node.child_by_field_name("property"))
            .or_else(|| node.child_by_field_name("name"))?;
        let text = node_text(prop, source);
        return if text.is_empty() { None } else { Some(text) };
    }
    None
}

fn default_owner_name(node: Node, source: &[u8]) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if OWNER_NODE_TYPES.contains(&n.kind()) {
            if let Some(name_node) = n.child_by_field_name("name") {
                let name = node_text(name_node, source);
                if !name.is_empty() {
                    return Some(name);
                }
            }
        }
        current = n.parent();
    }
    None
}

fn alias_target(parent: Option<Node>, field_name: Option<&str>, source: &[u8], behavior: LangBehavior) -> Option<String> {
    let parent = parent?;
    if ALIAS_PARENT_TYPES.contains(&parent.kind()) {
        let rhs = ["value", "right", "initializer", "assignment", "expression"]
            .iter()
            .find_map(|f| parent.child_by_field_name(f));
        return behavior.symbol_name_from_node(rhs, source);
    }
    if IMPORT_ALIAS_PARENT_TYPES.contains(&parent.kind()) && field_name == Some("alias") {
        let src = ["name", "module", "source", "value"].iter().find_map(|f| parent.child_by_field_name(f));
        return behavior.symbol_name_from_node(src, source);
    }
    None
}

fn base_identifier_name(node: Node, source: &[u8]) -> Option<String> {
    let kind = node.kind();
    if IDENTIFIER_NODE_TYPES.contains(&kind) {
        return Some(node_text(node, source));
    }
    if MEMBER_NODE_TYPES.contains(&kind) {
        let base = node
            .child_by_field_name("object")
            .or_else(|| node.child_by_field_name("value"))
            .or_else(|| node.child_by_field_name("operand"))
            .or_else(|| node.child_by_field_name("receiver"))?;
        return base_identifier_name(base, source);
    }
    if CALL_NODE_TYPES.contains(&kind) {
        let func = node
            .child_by_field_name("function")
            .or_else(|| node.child_by_field_name("name"))
            .or_else(|| find_first_identifier(node))?;
        return base_identifier_name(func, source);
    }
    None
}

fn resolve_owner_for_base(base_name: &str, context: &ChunkContext) -> Option<String> {
    if SELF_RECEIVER_NAMES.contains(&base_name) {
        return context.owner_name.clone();
    }
    if let Some(v) = context.alias_map.get(base_name) {
        return Some(v.clone());
    }
    if context.bound_names.contains(base_name) {
        return None;
    }
    Some(base_name.to_string())
}

fn definition_name_nodes<'a>(node: Node<'a>) -> Vec<Node<'a>> {
    if let Some(name) = node.child_by_field_name("name") {
        return vec![name];
    }
    find_first_identifier(node).into_iter().collect()
}

/// Computes the bindings, aliases and owner name visible inside `node`,
/// ahead of extracting its reference candidates.
pub fn chunk_context(node: Node, source: &[u8], behavior: LangBehavior) -> ChunkContext {
    let definition_ids: HashSet<usize> = definition_name_nodes(node).iter().map(|n| n.id()).collect();
    let field_cache = build_field_cache(node);

    let mut bound_names = HashSet::new();
    let mut alias_map = HashMap::new();
    let mut extra_candidates = Vec::new();
    let mut extra_seen = HashSet::new();

    let mut all = Vec::new();
    iter_named(node, &mut all);
    for n in all {
        if !IDENTIFIER_NODE_TYPES.contains(&n.kind()) {
            continue;
        }
        let name = node_text(n, source);
        if name.is_empty() {
            continue;
        }
        let parent = n.parent();
        let field_name = field_cache.get(&n.id()).cloned().flatten();

        if behavior.is_binding_identifier(parent, field_name.as_deref()) {
            bound_names.insert(name.clone());
        }

        let target = alias_target(parent, field_name.as_deref(), source, behavior);
        if let Some(target) = &target {
            if *target != name {
                alias_map.insert(name.clone(), target.clone());
            }
        }

        if is_import_binding(parent, field_name.as_deref()) {
            if let Some(target) = target {
                if extra_seen.insert(target.clone()) {
                    extra_candidates.push(ReferenceCandidate {
                        name: target,
                        kind: CandidateKind::Identifier,
                        owner: None,
                    });
                }
            }
        }
    }

    let owner_name = behavior.owner_name(node, source);
    ChunkContext {
        definition_ids,
        bound_names,
        alias_map,
        extra_candidates,
        owner_name,
        field_cache,
    }
}

fn call_candidate(node: Node, source: &[u8], context: &ChunkContext) -> Option<ReferenceCandidate> {
    let func = node
        .child_by_field_name("function")
        .or_else(|| node.child_by_field_name("name"))
        .or_else(|| find_first_identifier(node))?;
    if MEMBER_NODE_TYPES.contains(&func.kind()) {
        return member_candidate(func, source, context, CandidateKind::Call);
    }
    let name = node_text(func, source);
    let target = context.alias_map.get(&name).cloned().unwrap_or(name);
    Some(ReferenceCandidate {
        name: target,
        kind: CandidateKind::Call,
        owner: None,
    })
}

fn member_candidate(node: Node, source: &[u8], context: &ChunkContext, kind: CandidateKind) -> Option<ReferenceCandidate> {
    let base = ["object", "value", "operand", "receiver"].iter().find_map(|f| node.child_by_field_name(f))?;
    let attr = ["attribute", "property", "name"]
        .iter()
        .find_map(|f| node.child_by_field_name(f))
        .or_else(|| find_first_identifier(node))?;
    let attr_name = node_text(attr, source);
    let base_name = base_identifier_name(base, source)?;
    let owner = resolve_owner_for_base(&base_name, context)?;
    Some(ReferenceCandidate {
        name: attr_name,
        kind,
        owner: Some(owner),
    })
}

fn identifier_candidate(node: Node, source: &[u8], context: &ChunkContext, behavior: LangBehavior) -> Option<ReferenceCandidate> {
    let name = node_text(node, source);
    if name.is_empty() {
        return None;
    }
    let parent = node.parent();
    let field_name = context.field_cache.get(&node.id()).cloned().flatten();
    if behavior.is_binding_identifier(parent, field_name.as_deref()) {
        return None;
    }
    if is_member_attribute_identifier(parent, field_name.as_deref()) {
        return None;
    }
    if let Some(target) = context.alias_map.get(&name) {
        return Some(ReferenceCandidate {
            name: target.clone(),
            kind: CandidateKind::Identifier,
            owner: None,
        });
    }
    if context.bound_names.contains(&name) {
        return None;
    }
    Some(ReferenceCandidate {
        name,
        kind: CandidateKind::Identifier,
        owner: None,
    })
}

fn type_reference_candidate(node: Node, source: &[u8]) -> Option<ReferenceCandidate> {
    let name_node = node
        .child_by_field_name("type")
        .or_else(|| node.child_by_field_name("name"))
        .or_else(|| find_first_identifier(node))?;
    Some(ReferenceCandidate {
        name: node_text(name_node, source),
        kind: CandidateKind::Identifier,
        owner: None,
    })
}

fn is_call_function_node(node: Node) -> bool {
    let Some(parent) = node.parent() else { return false };
    if !CALL_NODE_TYPES.contains(&parent.kind()) {
        return false;
    }
    let func = parent.child_by_field_name("function").or_else(|| parent.child_by_field_name("name"));
    func.is_some_and(|f| f.id() == node.id())
}

/// Every candidate reference `node` makes: calls, member accesses,
/// identifier lookups and type references, skipping its own definition
/// name(s).
pub fn reference_candidates(node: Node, context: &ChunkContext, source: &[u8], behavior: LangBehavior) -> Vec<ReferenceCandidate> {
    let mut out = context.extra_candidates.clone();
    let mut all = Vec::new();
    iter_named(node, &mut all);
    for n in all {
        if context.definition_ids.contains(&n.id()) {
            continue;
        }
        let kind = n.kind();
        if CALL_NODE_TYPES.contains(&kind) {
            if let Some(c) = call_candidate(n, source, context) {
                out.push(c);
            }
        } else if MEMBER_NODE_TYPES.contains(&kind) && !is_call_function_node(n) {
            if let Some(c) = member_candidate(n, source, context, CandidateKind::Identifier) {
                out.push(c);
            }
        } else if IDENTIFIER_NODE_TYPES.contains(&kind) {
            if let Some(c) = identifier_candidate(n, source, context, behavior) {
                out.push(c);
            }
        } else if TYPE_REFERENCE_NODE_TYPES.contains(&kind) {
            if let Some(c) = type_reference_candidate(n, source) {
                out.push(c);
            }
        }
    }
    out
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
    fn resolves_self_member_call_owner() {
        let source = "class Greeter:\n    def hello(self):\n        return self.shout(1)\n";
        let tree = parse(Language::Python, source);
        let source_bytes = source.as_bytes();
        let method = find_kind(tree.root_node(), "function_definition").unwrap();
        let behavior = behavior_for(Language::Python);
        let context = chunk_context(method, source_bytes, behavior);
        assert_eq!(context.owner_name.as_deref(), Some("Greeter"));
        let candidates = reference_candidates(method, &context, source_bytes, behavior);
        let call = candidates.iter().find(|c| c.name == "shout").unwrap();
        assert_eq!(call.owner.as_deref(), Some("Greeter"));
    }

    #[test]
    fn parameter_is_not_a_reference_candidate() {
        let source = "def f(x):\n    return x\n";
        let tree = parse(Language::Python, source);
        let source_bytes = source.as_bytes();
        let func = find_kind(tree.root_node(), "function_definition").unwrap();
        let behavior = behavior_for(Language::Python);
        let context = chunk_context(func, source_bytes, behavior);
        assert!(context.bound_names.contains("x"));
        let candidates = reference_candidates(func, &context, source_bytes, behavior);
        assert!(candidates.iter().all(|c| c.name != "x"));
    }

    #[test]
    fn import_alias_becomes_extra_identifier_candidate() {
        let source = "import numpy as np\n";
        let tree = parse(Language::Python, source);
        let source_bytes = source.as_bytes();
        let behavior = behavior_for(Language::Python);
        let context = chunk_context(tree.root_node(), source_bytes, behavior);
        assert!(context.extra_candidates.iter().any(|c| c.name == "numpy"));
    }
}

//! AST node-kind vocabularies used to classify bindings, calls, member
//! accesses and type references across the supported grammars. Ported
//! directly from the reference implementation's node-type tables; these are
//! unlikely to need per-grammar tuning since tree-sitter grammars converge on
//! similar kind names for these constructs.

pub const IDENTIFIER_NODE_TYPES: &[&str] = &[
    "identifier",
    "type_identifier",
    "field_identifier",
    "property_identifier",
    "shorthand_property_identifier",
    "attribute_identifier",
];

pub const CALL_NODE_TYPES: &[&str] = &[
    "call_expression",
    "call",
    "function_call",
    "method_invocation",
    "decorated_call_expression",
];

pub const TYPE_REFERENCE_NODE_TYPES: &[&str] = &[
    "scoped_type_identifier",
    "qualified_type_identifier",
    "generic_type",
    "object_creation_expression",
    "new_expression",
];

pub const MEMBER_NODE_TYPES: &[&str] = &[
    "attribute",
    "member_expression",
    "field_expression",
    "scoped_field_expression",
    "optional_field_expression",
    "optional_member_expression",
];

pub const SELF_RECEIVER_NAMES: &[&str] = &["self", "this", "cls", "super"];

pub const PARAMETER_PARENT_TYPES: &[&str] = &[
    "parameters",
    "parameter_list",
    "formal_parameters",
    "lambda_parameters",
    "typed_parameter",
    "default_parameter",
    "self_parameter",
    "required_parameter",
    "posonly_parameters",
    "kwonly_parameters",
];

pub const ASSIGNMENT_PARENT_TYPES: &[&str] = &[
    "assignment",
    "assignment_expression",
    "augmented_assignment_expression",
    "assignment_statement",
    "variable_assignment",
    "variable_declarator",
    "lexical_declaration",
    "const_declaration",
    "let_declaration",
    "short_var_declaration",
];

pub const ALIAS_PARENT_TYPES: &[&str] = &[
    "assignment",
    "assignment_expression",
    "augmented_assignment_expression",
    "assignment_statement",
    "variable_assignment",
    "variable_declarator",
    "lexical_declaration",
    "const_declaration",
    "let_declaration",
    "short_var_declaration",
    "variable_declaration",
    "equals_value_clause",
];

pub const MEMBER_ATTRIBUTE_FIELDS: &[&str] = &["attribute", "property", "name", "field"];

pub const PATTERN_PARENT_TYPES: &[&str] = &[
    "pattern",
    "tuple_pattern",
    "list_pattern",
    "destructuring_pattern",
    "object_pattern",
    "array_pattern",
    "binding_pattern",
    "structured_binding_declaration",
];

pub const LOOP_TARGET_PARENT_TYPES: &[&str] = &[
    "for_statement",
    "for_in_clause",
    "for_in_statement",
    "enhanced_for_statement",
    "for_range_loop",
    "foreach_statement",
];

pub const CATCH_PARENT_TYPES: &[&str] = &["catch_clause", "catch_formal_parameter", "catch_declaration"];

pub const OWNER_NODE_TYPES: &[&str] = &[
    "class_definition",
    "class_declaration",
    "interface_declaration",
    "struct_declaration",
    "enum_declaration",
    "impl_item",
    "trait_item",
    "object_definition",
    "namespace_definition",
];

pub const IMPORT_ALIAS_PARENT_TYPES: &[&str] = &[
    "aliased_import",
    "import_specifier",
    "import_clause",
    "namespace_import",
    "import_as_clause",
    "import_clause_entry",
    "imported_binding",
    "use_clause",
    "use_as_clause",
];

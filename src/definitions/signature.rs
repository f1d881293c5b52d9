//! Structural signatures: a deterministic hash over the declared
//! symbol structure of a file, independent of bodies, comments, and
//! whitespace. Drives the edge-only incremental fast path.

use tree_sitter::Node;

use crate::parsing::ast::{collect_nodes, enclosing_class, field_text, has_class_ancestor};
use crate::parsing::{Language, language_spec};
use crate::paths::content_hash;

/// Hash of the sorted multiset of `class:<name>`, `function:<name>`,
/// and `method:<class>.<name>` items declared in the file.
pub fn compute_structure_signature(root: Node, source: &str, language: Language) -> String {
    let spec = language_spec(language);
    let mut items: Vec<String> = Vec::new();

    for class_node in collect_nodes(root, spec.class_node_types) {
        let name = if language == Language::Rust && class_node.kind() == "impl_item" {
            field_text(class_node, "type", source)
        } else {
            field_text(class_node, spec.name_field, source)
        };
        if let Some(name) = name {
            items.push(format!("class:{name}"));
        }
    }

    for func_node in collect_nodes(root, spec.function_node_types) {
        let name = if matches!(language, Language::C | Language::Cpp) {
            super::functions::extract_cpp_function_name(func_node, source)
        } else {
            field_text(func_node, spec.name_field, source).map(String::from)
        };
        let Some(name) = name else { continue };

        if has_class_ancestor(func_node, spec) {
            match enclosing_class(func_node, spec)
                .and_then(|class| field_text(class, spec.name_field, source))
            {
                Some(class_name) => items.push(format!("method:{class_name}.{name}")),
                None => items.push(format!("method:{name}")),
            }
        } else {
            items.push(format!("function:{name}"));
        }
    }

    items.sort();
    content_hash(items.join("|").as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::new_parser;

    fn signature_of(source: &str, language: Language) -> String {
        let mut parser = new_parser(language, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        compute_structure_signature(tree.root_node(), source, language)
    }

    #[test]
    fn same_bytes_same_signature() {
        let source = "class A:\n    def m(self):\n        pass\n\ndef f():\n    pass\n";
        assert_eq!(
            signature_of(source, Language::Python),
            signature_of(source, Language::Python)
        );
    }

    #[test]
    fn whitespace_and_bodies_do_not_change_it() {
        let one = "def f(x):\n    return x + 1\n";
        let two = "# a comment\n\ndef f(y):\n\n    value = y * 2\n    return value\n";
        assert_eq!(
            signature_of(one, Language::Python),
            signature_of(two, Language::Python)
        );
    }

    #[test]
    fn adding_a_declaration_changes_it() {
        let one = "def f():\n    pass\n";
        let two = "def f():\n    pass\n\ndef g():\n    pass\n";
        assert_ne!(
            signature_of(one, Language::Python),
            signature_of(two, Language::Python)
        );
    }

    #[test]
    fn method_items_carry_class_context() {
        let in_class = "class A:\n    def run(self):\n        pass\n";
        let top_level = "def run():\n    pass\n";
        assert_ne!(
            signature_of(in_class, Language::Python),
            signature_of(top_level, Language::Python)
        );
    }
}

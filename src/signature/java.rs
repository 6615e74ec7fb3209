use tree_sitter::{Node, Parser};

use super::{MethodSignature, ParseError, SignatureParser};

/// Java method signature extraction backed by tree-sitter.
///
/// Every `method_declaration` in the file is reported, including those in
/// interfaces, enums, nested and anonymous classes. Constructors and
/// annotation elements are not methods and are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaSignatureParser;

impl JavaSignatureParser {
    pub fn new() -> Self {
        Self
    }
}

impl SignatureParser for JavaSignatureParser {
    fn parse(&self, source: &str) -> Result<Vec<MethodSignature>, ParseError> {
        // tree_sitter::Parser is not Sync, so each call gets its own.
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ParseError::Unavailable(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseError::Unavailable("parser produced no tree".to_string()))?;
        let root = tree.root_node();

        if root.has_error() {
            let position = first_error(root)
                .unwrap_or(root)
                .start_position();
            return Err(ParseError::Syntax {
                line: position.row + 1,
                column: position.column + 1,
            });
        }

        let src = source.as_bytes();
        let mut signatures = Vec::new();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            if node.kind() == "method_declaration" {
                signatures.push(method_signature(node, src)?);
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            pending.extend(children.into_iter().rev());
        }

        Ok(signatures)
    }
}

fn method_signature(node: Node, src: &[u8]) -> Result<MethodSignature, ParseError> {
    let return_type = field_text(node, "type", src)?;
    let name = field_text(node, "name", src)?;

    let mut parameters = Vec::new();
    if let Some(list) = node.child_by_field_name("parameters") {
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            match param.kind() {
                "formal_parameter" => {
                    let mut ty = field_text(param, "type", src)?;
                    // `int values[]` keeps its dimensions on the declarator
                    if let Some(dims) = param.child_by_field_name("dimensions") {
                        ty.push_str(&node_text(dims, src)?);
                    }
                    parameters.push(ty);
                }
                "spread_parameter" => {
                    let mut inner = param.walk();
                    let ty = param
                        .named_children(&mut inner)
                        .find(|child| !matches!(child.kind(), "modifiers" | "variable_declarator"));
                    if let Some(ty) = ty {
                        // varargs are reported by element type, `String... rest` as "String"
                        parameters.push(node_text(ty, src)?);
                    }
                }
                _ => {}
            }
        }
    }

    Ok(MethodSignature::new(
        ancestor_count(node),
        return_type,
        name,
        parameters,
    ))
}

fn ancestor_count(node: Node) -> usize {
    let mut depth = 0;
    let mut current = node;
    while let Some(parent) = current.parent() {
        depth += 1;
        current = parent;
    }
    depth
}

fn field_text(node: Node, field: &str, src: &[u8]) -> Result<String, ParseError> {
    let child = node.child_by_field_name(field).ok_or_else(|| {
        let position = node.start_position();
        ParseError::Syntax {
            line: position.row + 1,
            column: position.column + 1,
        }
    })?;
    node_text(child, src)
}

fn node_text(node: Node, src: &[u8]) -> Result<String, ParseError> {
    let text = node
        .utf8_text(src)
        .map_err(|e| ParseError::Unavailable(e.to_string()))?;
    Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn first_error<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<MethodSignature> {
        JavaSignatureParser::new().parse(source).unwrap()
    }

    #[test]
    fn test_simple_class() {
        let sigs = parse(
            r#"
package demo;

public class Calculator {
    public int add(int a, int b) { return a + b; }
    void reset() {}
}
"#,
        );
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0].report_text(), "int:add:int,int");
        assert_eq!(sigs[1].report_text(), "void:reset:");
        // program > class_declaration > class_body > method_declaration
        assert_eq!(sigs[0].scope_depth, 3);
        assert_eq!(sigs[0].scope_depth, sigs[1].scope_depth);
    }

    #[test]
    fn test_nested_class_is_deeper() {
        let sigs = parse(
            r#"
class Outer {
    void run() {}
    static class Inner {
        void run() {}
    }
}
"#,
        );
        assert_eq!(sigs.len(), 2);
        assert!(sigs[1].scope_depth > sigs[0].scope_depth);
        assert_ne!(sigs[0].key(), sigs[1].key());
    }

    #[test]
    fn test_constructors_are_skipped() {
        let sigs = parse(
            r#"
class Point {
    Point(int x, int y) {}
    int x() { return 0; }
}
"#,
        );
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].name, "x");
    }

    #[test]
    fn test_parameter_type_spellings() {
        let sigs = parse(
            r#"
class Util {
    public static <T> List<T> wrap(Map<String,   Integer> m, int[] xs, long legacy[], String... rest) {
        return null;
    }
}
"#,
        );
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].return_type, "List<T>");
        assert_eq!(
            sigs[0].parameters,
            vec!["Map<String, Integer>", "int[]", "long[]", "String"]
        );
    }

    #[test]
    fn test_varargs_reported_by_element_type() {
        let sigs = parse("class Log { void log(String fmt, final Object... args) {} }");
        assert_eq!(sigs[0].parameters, vec!["String", "Object"]);
        assert_eq!(sigs[0].report_text(), "void:log:String,Object");
    }

    #[test]
    fn test_parameter_modifiers_are_not_part_of_type() {
        let sigs = parse(
            r#"
class Service {
    void handle(@Deprecated final String name) {}
}
"#,
        );
        assert_eq!(sigs[0].parameters, vec!["String"]);
    }

    #[test]
    fn test_interface_and_enum_methods() {
        let sigs = parse(
            r#"
interface Shape {
    double area();
}

enum Color {
    RED;
    String label(boolean upper) { return ""; }
}
"#,
        );
        let names: Vec<_> = sigs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["area", "label"]);
    }

    #[test]
    fn test_empty_source() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_syntax_error_reports_position() {
        let err = JavaSignatureParser::new()
            .parse("class Broken {\n    int add(int a { return a; }\n")
            .unwrap_err();
        match err {
            ParseError::Syntax { line, .. } => assert!(line >= 1),
            other => panic!("unexpected error: {other}"),
        }
    }
}

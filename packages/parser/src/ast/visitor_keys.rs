//! Child-key table for template and script nodes, consumed by lint-side
//! traversal.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub static VISITOR_KEYS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let entries: &[(&'static str, &'static [&'static str])] = &[
        ("VDocumentFragment", &["children"]),
        ("VElement", &["startTag", "children", "endTag"]),
        ("VStartTag", &["attributes"]),
        ("VEndTag", &[]),
        ("VAttribute", &["key", "value"]),
        ("VDirectiveKey", &["argument"]),
        ("VIdentifier", &[]),
        ("VLiteral", &[]),
        ("VText", &[]),
        ("VExpressionContainer", &["expression"]),
        ("VForExpression", &["left", "right"]),
        ("VSlotScopeExpression", &["params"]),
        ("Program", &["body"]),
        ("ExpressionStatement", &["expression"]),
        ("BlockStatement", &["body"]),
        ("EmptyStatement", &[]),
        ("VariableDeclaration", &["declarations"]),
        ("VariableDeclarator", &["id", "init"]),
        ("FunctionDeclaration", &["id", "params", "body"]),
        ("FunctionExpression", &["id", "params", "body"]),
        ("ArrowFunctionExpression", &["params", "body"]),
        ("ReturnStatement", &["argument"]),
        ("IfStatement", &["test", "consequent", "alternate"]),
        ("ForOfStatement", &["left", "right", "body"]),
        ("ForInStatement", &["left", "right", "body"]),
        ("ImportDeclaration", &["specifiers", "source"]),
        ("ImportSpecifier", &["imported", "local"]),
        ("ImportDefaultSpecifier", &["local"]),
        ("ImportNamespaceSpecifier", &["local"]),
        ("ExportNamedDeclaration", &["declaration", "specifiers", "source"]),
        ("ExportDefaultDeclaration", &["declaration"]),
        ("ExportSpecifier", &["local", "exported"]),
        ("Identifier", &[]),
        ("Literal", &[]),
        ("TemplateLiteral", &["quasis", "expressions"]),
        ("TemplateElement", &[]),
        ("ThisExpression", &[]),
        ("ArrayExpression", &["elements"]),
        ("ObjectExpression", &["properties"]),
        ("Property", &["key", "value"]),
        ("SpreadElement", &["argument"]),
        ("UnaryExpression", &["argument"]),
        ("UpdateExpression", &["argument"]),
        ("BinaryExpression", &["left", "right"]),
        ("LogicalExpression", &["left", "right"]),
        ("AssignmentExpression", &["left", "right"]),
        ("ConditionalExpression", &["test", "consequent", "alternate"]),
        ("CallExpression", &["callee", "arguments"]),
        ("NewExpression", &["callee", "arguments"]),
        ("MemberExpression", &["object", "property"]),
        ("SequenceExpression", &["expressions"]),
        ("AwaitExpression", &["argument"]),
        ("ArrayPattern", &["elements"]),
        ("ObjectPattern", &["properties"]),
        ("AssignmentPattern", &["left", "right"]),
        ("RestElement", &["argument"]),
    ];
    entries.iter().copied().collect()
});

pub fn keys_of(node_type: &str) -> &'static [&'static str] {
    VISITOR_KEYS.get(node_type).copied().unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_keys() {
        assert_eq!(keys_of("VElement"), &["startTag", "children", "endTag"]);
        assert_eq!(keys_of("VText"), &[] as &[&str]);
        assert_eq!(keys_of("Unknown"), &[] as &[&str]);
    }
}

use std::fmt::Write;

use arbor_tree::SyntaxTree;

/// One line per visible node, indented by depth:
/// `field: kind [row:col - row:col]`, followed by the text of named leaves.
pub(crate) fn dump(tree: &SyntaxTree, source: &[u8]) -> String {
    let mut out = String::new();
    let mut cursor = tree.walk();
    loop {
        let node = cursor.node();
        if node.is_named() || node.is_missing() {
            let indent = "  ".repeat(cursor.depth());
            let field = cursor.field_name().map(|name| format!("{name}: ")).unwrap_or_default();
            let kind = if node.is_missing() {
                format!("MISSING {}", node.kind_name())
            } else {
                node.kind_name().to_owned()
            };
            let _ = write!(out, "{indent}{field}{kind} [{} - {}]", node.start_point(), node.end_point());
            if node.is_named() && node.child_count() == 0 && !node.is_missing() {
                let _ = write!(out, " {:?}", String::from_utf8_lossy(&node.text(source)));
            }
            out.push('\n');
        }

        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return out;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::dump;

    #[test]
    fn dumps_trees_of_non_utf8_input() {
        let source = b"USE main\xff";
        let tree = arbor_parse::parse(source.as_slice(), arbor_fekal::language());
        let dump = dump(&tree, source);

        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines[0], "source_file [0:0 - 0:9]");
        assert!(lines.contains(&"    policy: identifier [0:4 - 0:8] \"main\""), "{dump}");
        assert!(lines.iter().any(|line| line.starts_with("  ERROR [0:8 - 0:9]")), "{dump}");
    }
}

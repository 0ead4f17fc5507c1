use std::fmt::Display;

pub use annotate_snippets::Renderer;
use annotate_snippets::{Level, Snippet};
use arbor_tree::{SyntaxTree, WalkEvent};
pub use text_size::TextRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    message: String,
    range: TextRange,
}

impl Diagnostic {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn error(message: impl Into<String>, range: TextRange) -> Self {
        Self { message: message.into(), range }
    }

    pub fn render<'a>(
        &'a self,
        renderer: &'a Renderer,
        path: &'a str,
        text: &'a str,
    ) -> impl Display + 'a {
        let message = Level::Error.title(&self.message).snippet(
            Snippet::source(text)
                .origin(path)
                .annotation(Level::Error.span(self.range.into()).label("here"))
                .fold(true),
        );
        renderer.render(message)
    }
}

/// One diagnostic per ERROR node and per MISSING token, in text order.
/// Errors nested in an ERROR node are covered by it.
pub fn syntax_errors(tree: &SyntaxTree, text: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if !tree.root().has_error() {
        return diagnostics;
    }

    let mut preorder = tree.root().preorder();
    while let Some(event) = preorder.next() {
        let WalkEvent::Enter(node) = event else { continue };
        if !node.has_error() {
            preorder.skip_subtree();
            continue;
        }
        let range = node.byte_range();
        if node.is_error() {
            let message = match text.get(usize::from(range.start())..usize::from(range.end())).map(str::trim) {
                Some(snippet) if !snippet.is_empty() && snippet.len() <= 24 && !snippet.contains('\n') => {
                    format!("unexpected `{snippet}`")
                }
                _ => "unexpected input".to_owned(),
            };
            diagnostics.push(Diagnostic::error(message, range));
            preorder.skip_subtree();
        } else if node.is_missing() {
            let message = if node.is_named() {
                format!("missing {}", node.kind_name())
            } else {
                format!("missing `{}`", node.kind_name())
            };
            diagnostics.push(Diagnostic::error(message, range));
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use arbor_generate::{Grammar, field, lit, repeat, seq, sym};
    use expect_test::expect;

    use super::*;

    fn check(text: &str, expect: expect_test::Expect) {
        let language = Grammar::new("items")
            .skip(r"\s+")
            .token("identifier", "[a-z]+")
            .rule("source_file", repeat(sym("item")))
            .rule("item", seq([lit("("), field("name", sym("identifier")), lit(")")]))
            .build()
            .unwrap();
        let tree = arbor_parse::parse(text, &language);
        let actual = syntax_errors(&tree, text)
            .iter()
            .map(|diagnostic| format!("{:?} {}\n", diagnostic.range(), diagnostic.message()))
            .collect::<String>();
        expect.assert_eq(&actual);
    }

    #[test]
    fn clean_tree_has_no_errors() {
        check("(a) (b)", expect![[r#""#]]);
    }

    #[test]
    fn missing_and_unexpected_tokens() {
        check(
            "(a (b) $",
            expect![[r#"
                2..2 missing `)`
                7..8 unexpected `$`
            "#]],
        );
    }

    #[test]
    fn render_points_at_the_range() {
        let diagnostic = Diagnostic::error("missing `)`", TextRange::new(2.into(), 2.into()));
        let rendered = diagnostic.render(&Renderer::plain(), "main.fekal", "(a (b)").to_string();
        assert!(rendered.contains("error: missing `)`"));
        assert!(rendered.contains("main.fekal"));
    }
}

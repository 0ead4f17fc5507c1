use arbor_generate::{Grammar, field, lit, repeat, seq, sym};
use arbor_grammar::Language;
use arbor_parse::{Parser, parse};
use arbor_tree::{InputEdit, SyntaxTree, WalkEvent};
use proptest::prelude::*;
use text_size::TextRange;

fn items() -> Language {
    Grammar::new("items")
        .skip(r"\s+")
        .token("identifier", "[a-z]+")
        .token("comment", "#[^\n]*")
        .extra("comment")
        .rule("source_file", repeat(sym("item")))
        .rule("item", seq([lit("("), field("name", sym("_value")), lit(")")]))
        .rule("_value", sym("identifier"))
        .build()
        .unwrap()
}

/// Every node as `(kind, range, missing)`, in document order.
fn structure(tree: &SyntaxTree) -> Vec<(String, TextRange, bool)> {
    tree.root()
        .preorder()
        .filter_map(|event| match event {
            WalkEvent::Enter(node) => Some((node.kind_name().to_owned(), node.byte_range(), node.is_missing())),
            WalkEvent::Leave(_) => None,
        })
        .collect()
}

fn apply(text: &str, edits: &[(usize, usize, &str)]) -> (String, Vec<InputEdit>) {
    let mut new_text = text.to_owned();
    for &(start, end, insert) in edits.iter().rev() {
        new_text.replace_range(start..end, insert);
    }
    let edits = edits
        .iter()
        .map(|&(start, end, insert)| {
            let range = TextRange::new((start as u32).into(), (end as u32).into());
            InputEdit::replace(text.as_bytes(), range, insert.as_bytes())
        })
        .collect();
    (new_text, edits)
}

/// Reparses `text` after `edits` and checks the result against a fresh parse.
#[track_caller]
fn check(text: &str, edits: &[(usize, usize, &str)]) -> (SyntaxTree, usize) {
    let language = items();
    let mut parser = Parser::new(language.clone());
    let old = parser.parse(text);

    let (new_text, edits) = apply(text, edits);
    let edited = old.edit(&edits).unwrap();
    let reparsed = parser.reparse(&edited, new_text.as_str());
    let reused = parser.last_stats().reused_subtrees;

    let fresh = parse(new_text.as_str(), &language);
    assert_eq!(reparsed.root().to_sexp(), fresh.root().to_sexp(), "{new_text:?}");
    assert_eq!(structure(&reparsed), structure(&fresh), "{new_text:?}");
    assert_eq!(reparsed.revision(), old.revision() + 1);
    (reparsed, reused)
}

#[test]
fn single_byte_insertion() {
    let (tree, reused) = check("(a) (b) (c) (d)", &[(5, 5, "x")]);
    assert_eq!(tree.root().child(1).unwrap().byte_range(), TextRange::new(4.into(), 8.into()));
    assert!(reused >= 1);
}

#[test]
fn untouched_prefix_is_reused() {
    let text = "(a) (b) (c) (d) (e) (f) (g) (h)";
    let (_, reused) = check(text, &[(29, 30, "hh")]);
    assert!(reused >= 1);

    let language = items();
    let mut parser = Parser::new(language);
    let old = parser.parse(text);
    let (new_text, edits) = apply(text, &[(29, 30, "hh")]);
    parser.reparse(&old.edit(&edits).unwrap(), new_text.as_str());
    let stats = parser.last_stats();
    assert!(stats.reused_bytes >= 27);
    assert!(stats.tokens < 8);
}

#[test]
fn multiple_edits() {
    check("(a) (b) (c) (d)", &[(1, 2, "xy"), (9, 10, ""), (13, 13, "z")]);
    check("(a) (b)", &[(0, 0, "(c) "), (7, 7, " (d)")]);
}

#[test]
fn deletions_at_the_edges() {
    check("(a) (b) (c)", &[(0, 4, "")]);
    check("(a) (b) (c)", &[(7, 11, "")]);
    check("(a) (b) (c)", &[(0, 11, "")]);
}

#[test]
fn edits_inside_and_around_errors() {
    check("(a) ) (b) (c)", &[(4, 5, "")]);
    check("(a (b) (c)", &[(2, 2, ")")]);
    check("(a) (b) (c)", &[(5, 6, "")]);
    check("(a) $ (b)", &[(4, 5, "(q)")]);
}

#[test]
fn edits_near_comments() {
    check("(a) # note\n(b)", &[(6, 8, "xyz")]);
    check("(a) # note\n(b)", &[(10, 11, "")]);
    check("(a)\n(b)", &[(3, 3, " #")]);
}

#[test]
fn another_language_parses_from_scratch() {
    let language = items();
    let old = parse("(a)", &language);
    let other = items();
    let mut parser = Parser::new(other);

    let (new_text, edits) = apply("(a)", &[(1, 2, "b")]);
    let tree = parser.reparse(&old.edit(&edits).unwrap(), new_text.as_str());
    assert_eq!(tree.root().to_sexp(), "(source_file (item name: (identifier)))");
    assert_eq!(parser.last_stats().reused_subtrees, 0);
    assert_eq!(parser.last_stats().reused_bytes, 0);
}

proptest! {
    #[test]
    fn reparse_matches_fresh_parse(
        text in "[()ab #\n$]{0,24}",
        start in 0usize..32,
        len in 0usize..8,
        insert in "[()ab #\n$]{0,4}",
    ) {
        let start = start.min(text.len());
        let end = (start + len).min(text.len());
        check(&text, &[(start, end, insert.as_str())]);
    }

    #[test]
    fn reparse_after_two_edits(
        text in "[()ab #\n$]{0,24}",
        first in 0usize..32,
        second in 0usize..32,
        insert in "[()ab #\n$]{0,3}",
    ) {
        let (low, high) = (first.min(second).min(text.len()), first.max(second).min(text.len()));
        let middle = (low + high) / 2;
        let mut edits = vec![(low, middle, insert.as_str())];
        if high > middle {
            edits.push((high, high, "a"));
        }
        check(&text, &edits);
    }
}

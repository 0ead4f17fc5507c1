use arbor_generate::{Grammar, choice, field, lit, prec_dynamic, prec_left, repeat, seq, sym};
use arbor_grammar::{AmbiguityPolicy, Language};
use arbor_inputs::{ChunkedText, Point};
use expect_test::{Expect, expect};
use text_size::{TextRange, TextSize};

use crate::*;

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

/// `a * b;` is either a pointer declaration or a product.
fn statements(policy: AmbiguityPolicy) -> Language {
    Grammar::new("statements")
        .skip(r"\s+")
        .token("identifier", "[a-z]+")
        .rule("program", repeat(sym("_statement")))
        .rule("_statement", choice([sym("declaration"), sym("expression_statement")]))
        .rule(
            "declaration",
            seq([field("type", sym("identifier")), lit("*"), field("name", sym("identifier")), lit(";")]),
        )
        .rule("expression_statement", prec_dynamic(1, seq([sym("_expression"), lit(";")])))
        .rule("_expression", choice([sym("identifier"), sym("binary")]))
        .rule(
            "binary",
            prec_left(1, seq([field("left", sym("_expression")), lit("*"), field("right", sym("_expression"))])),
        )
        .conflict(&["declaration", "_expression"])
        .ambiguity(policy)
        .build()
        .unwrap()
}

fn arithmetic() -> Language {
    Grammar::new("arithmetic")
        .skip(r"\s+")
        .token("number", "[0-9]+")
        .rule("program", sym("_expression"))
        .rule("_expression", choice([sym("number"), sym("sum"), sym("product")]))
        .rule("sum", prec_left(1, seq([sym("_expression"), lit("+"), sym("_expression")])))
        .rule("product", prec_left(2, seq([sym("_expression"), lit("*"), sym("_expression")])))
        .build()
        .unwrap()
}

fn check(language: &Language, text: &str, expect: Expect) {
    let tree = parse(text, language);
    expect.assert_eq(&tree.root().to_sexp());
}

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

#[test]
fn parses_valid_input() {
    let language = items();
    check(&language, "(a) (bc)", expect![[r#"(source_file (item name: (identifier)) (item name: (identifier)))"#]]);
    check(&language, "", expect![[r#"(source_file)"#]]);
}

#[test]
fn precedence_shapes_the_tree() {
    let language = arithmetic();
    check(&language, "1 + 2 * 3", expect![[r#"(program (sum (number) (product (number) (number))))"#]]);
    check(&language, "1 * 2 + 3", expect![[r#"(program (sum (product (number) (number)) (number)))"#]]);
    check(&language, "1 + 2 + 3", expect![[r#"(program (sum (sum (number) (number)) (number)))"#]]);
}

#[test]
fn node_positions_cover_the_text() {
    let language = items();
    let text = "(a)\n(bc)  ";
    let tree = parse(text, &language);
    let root = tree.root();

    assert_eq!(root.byte_range(), range(0, 10));
    assert!(!root.has_error());
    let second = root.child(1).unwrap();
    assert_eq!(second.byte_range(), range(4, 8));
    assert_eq!(second.start_point(), Point::new(1, 0));
    assert_eq!(second.end_point(), Point::new(1, 4));
    let name = second.child_by_field_name("name").unwrap();
    assert_eq!(name.utf8_text(text.as_bytes()), Ok("bc"));
}

#[test]
fn whitespace_only_input_is_an_empty_root() {
    let language = items();
    let tree = parse("  \n", &language);

    assert_eq!(tree.root().to_sexp(), "(source_file)");
    assert_eq!(tree.root().byte_range(), range(0, 3));
    assert_eq!(tree.text_len().extent, Point::new(1, 0));
}

#[test]
fn extras_attach_where_they_appear() {
    let language = items();
    check(
        &language,
        "(a) # note\n(b)",
        expect![[r#"(source_file (item name: (identifier)) (comment) (item name: (identifier)))"#]],
    );
    check(&language, "( # inner\n a)", expect![[r#"(source_file (item (comment) name: (identifier)))"#]]);
    check(&language, "# leading\n(a)", expect![[r#"(source_file (comment) (item name: (identifier)))"#]]);
}

#[test]
fn missing_token_is_inserted() {
    let language = items();
    check(
        &language,
        "(a (b)",
        expect![[r#"(source_file (item name: (identifier) (MISSING ")")) (item name: (identifier)))"#]],
    );

    let tree = parse("(a", &language);
    expect![[r#"(source_file (item name: (identifier) (MISSING ")")))"#]].assert_eq(&tree.root().to_sexp());
    let missing = tree.root().child(0).unwrap().child(2).unwrap();
    assert!(missing.is_missing());
    assert_eq!(missing.byte_range(), range(2, 2));
    assert!(tree.root().has_error());
}

#[test]
fn stray_token_is_wrapped_in_error() {
    let language = items();
    check(
        &language,
        "(a) ) (b)",
        expect![[r#"(source_file (item name: (identifier) (ERROR)) (item name: (identifier)))"#]],
    );
    check(&language, ")", expect![[r#"(source_file (ERROR))"#]]);
}

#[test]
fn unknown_characters_become_error_tokens() {
    let language = items();
    let text = "(a) $ (b)";
    let mut parser = Parser::new(language);
    let tree = parser.parse(text);

    expect![[r#"(source_file (item name: (identifier)) (ERROR) (item name: (identifier)))"#]]
        .assert_eq(&tree.root().to_sexp());
    let error = tree.root().child(1).unwrap();
    assert!(error.is_error());
    assert_eq!(error.byte_range(), range(4, 5));
    assert_eq!(parser.last_stats().recoveries, 1);
}

#[test]
fn every_byte_stays_in_the_tree() {
    let language = items();
    for text in ["((a", "))a((", "(a)(b", "$$$", "(a) ) ) (b c)"] {
        let tree = parse(text, &language);
        assert_eq!(tree.root().byte_range(), TextRange::up_to(TextSize::of(text)), "{text:?}");
        assert!(tree.root().has_error(), "{text:?}");
    }
}

#[test]
fn chunked_sources_parse_the_same() {
    let language = items();
    let text = "(abc) # c\n (de)\n(f";
    let expected = parse(text, &language).root().to_sexp();
    for chunk_size in [1, 3, 7] {
        let chunked = ChunkedText::split(text.as_bytes(), chunk_size);
        assert_eq!(parse(&chunked, &language).root().to_sexp(), expected);
    }
}

#[test]
fn dynamic_precedence_picks_the_interpretation() {
    let language = statements(AmbiguityPolicy::DynamicPrecedence);
    let mut parser = Parser::new(language);
    let (tree, stats) = parser.parse_with_stats("a * b;");

    expect![[r#"(program (expression_statement (binary left: (identifier) right: (identifier))))"#]]
        .assert_eq(&tree.root().to_sexp());
    assert_eq!(stats.forks, 1);
    assert!(!tree.root().has_error());
}

#[test]
fn first_action_picks_the_shift() {
    let language = statements(AmbiguityPolicy::FirstAction);
    check(
        &language,
        "a * b;",
        expect![[r#"(program (declaration type: (identifier) name: (identifier)))"#]],
    );
}

#[test]
fn options_override_the_grammar_policy() {
    let language = statements(AmbiguityPolicy::DynamicPrecedence);
    let options = ParseOptions { ambiguity: Some(AmbiguityPolicy::FirstAction), ..ParseOptions::default() };
    let tree = Parser::with_options(language, options).parse("a * b;");

    expect![[r#"(program (declaration type: (identifier) name: (identifier)))"#]]
        .assert_eq(&tree.root().to_sexp());
}

#[test]
fn version_cap_keeps_the_first_fork() {
    let language = statements(AmbiguityPolicy::DynamicPrecedence);
    let options = ParseOptions { max_versions: 1, ..ParseOptions::default() };
    let tree = Parser::with_options(language, options).parse("a * b;");

    expect![[r#"(program (declaration type: (identifier) name: (identifier)))"#]]
        .assert_eq(&tree.root().to_sexp());
}

#[test]
fn failed_forks_are_dropped() {
    let language = statements(AmbiguityPolicy::DynamicPrecedence);
    let mut parser = Parser::new(language);
    let tree = parser.parse("a; b * c * d;");

    expect![[r#"(program (expression_statement (identifier)) (expression_statement (binary left: (binary left: (identifier) right: (identifier)) right: (identifier))))"#]]
        .assert_eq(&tree.root().to_sexp());
    assert_eq!(parser.last_stats().forks, 1);
}

use std::path::PathBuf;

use anyhow::Context;
use arbor_generate::{
    Grammar, Rule, choice, field, lit, optional, prec, prec_left, repeat, seq, sym,
};

const PREC_OR: i16 = 1;
const PREC_AND: i16 = 2;
const PREC_NOT: i16 = 3;
const PREC_COMPARE: i16 = 4;
const PREC_BIT_OR: i16 = 5;
const PREC_BIT_XOR: i16 = 6;
const PREC_BIT_AND: i16 = 7;
const PREC_SHIFT: i16 = 8;
const PREC_ADD: i16 = 9;
const PREC_MUL: i16 = 10;

const KEYWORDS: [&str; 11] = [
    "POLICY",
    "USE",
    "DEFAULT",
    "ALLOW",
    "LOG",
    "KILL_PROCESS",
    "KILL_THREAD",
    "USER_NOTIF",
    "ERRNO",
    "TRAP",
    "TRACE",
];

const OPERATORS: [(&str, i16); 17] = [
    ("||", PREC_OR),
    ("&&", PREC_AND),
    ("==", PREC_COMPARE),
    ("!=", PREC_COMPARE),
    ("<", PREC_COMPARE),
    ("<=", PREC_COMPARE),
    (">", PREC_COMPARE),
    (">=", PREC_COMPARE),
    ("|", PREC_BIT_OR),
    ("^", PREC_BIT_XOR),
    ("&", PREC_BIT_AND),
    ("<<", PREC_SHIFT),
    (">>", PREC_SHIFT),
    ("+", PREC_ADD),
    ("-", PREC_ADD),
    ("*", PREC_MUL),
    ("/", PREC_MUL),
];

fn comma_sep1(rule: Rule) -> Rule {
    seq([rule.clone(), repeat(seq([lit(","), rule]))])
}

fn action_with_code(keyword: &str) -> Rule {
    seq([lit(keyword), lit("("), field("code", sym("number")), lit(")")])
}

fn grammar() -> Grammar {
    let grammar = KEYWORDS.iter().fold(Grammar::new("fekal").skip(r"\s+"), |grammar, keyword| {
        grammar.literal(keyword)
    });
    let binary = OPERATORS.iter().map(|&(operator, precedence)| {
        prec_left(
            precedence,
            seq([
                field("left", sym("_expression")),
                field("operator", lit(operator)),
                field("right", sym("_expression")),
            ]),
        )
    });

    grammar
        .token("identifier", "[A-Za-z_][A-Za-z0-9_]*")
        .token("number", "0[xX][0-9a-fA-F]+|0[bB][01]+|[0-9]+")
        .token("comment", "//[^\n]*")
        .extra("comment")
        .rule("source_file", repeat(sym("_statement")))
        .rule(
            "_statement",
            choice([sym("policy"), sym("default_action"), sym("use_statement"), sym("action_block")]),
        )
        .rule(
            "policy",
            seq([
                lit("POLICY"),
                field("name", sym("identifier")),
                optional(field("version", sym("number"))),
                lit("{"),
                repeat(choice([sym("use_statement"), sym("action_block")])),
                lit("}"),
            ]),
        )
        .rule(
            "use_statement",
            seq([
                lit("USE"),
                field("policy", sym("identifier")),
                optional(field("version", sym("number"))),
            ]),
        )
        .rule("default_action", seq([lit("DEFAULT"), field("action", sym("action"))]))
        .rule(
            "action_block",
            seq([
                field("action", sym("action")),
                lit("{"),
                optional(comma_sep1(sym("syscall_filter"))),
                lit("}"),
            ]),
        )
        .rule(
            "action",
            choice([
                lit("ALLOW"),
                lit("LOG"),
                lit("KILL_PROCESS"),
                lit("KILL_THREAD"),
                lit("USER_NOTIF"),
                action_with_code("ERRNO"),
                action_with_code("TRAP"),
                action_with_code("TRACE"),
            ]),
        )
        .rule(
            "syscall_filter",
            seq([
                field("syscall", sym("identifier")),
                optional(seq([
                    field("parameters", sym("parameters")),
                    lit("{"),
                    optional(comma_sep1(field("condition", sym("_expression")))),
                    lit("}"),
                ])),
            ]),
        )
        .rule("parameters", seq([lit("("), optional(comma_sep1(sym("identifier"))), lit(")")]))
        .rule(
            "_expression",
            choice([
                sym("identifier"),
                sym("number"),
                sym("unary_expression"),
                sym("binary_expression"),
                sym("parenthesized_expression"),
            ]),
        )
        .rule(
            "unary_expression",
            prec(PREC_NOT, seq([field("operator", lit("!")), field("operand", sym("_expression"))])),
        )
        .rule("binary_expression", choice(binary))
        .rule("parenthesized_expression", seq([lit("("), sym("_expression"), lit(")")]))
}

fn main() -> anyhow::Result<()> {
    println!("cargo::rerun-if-changed=build.rs");

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").context("OUT_DIR is not set")?);
    let generated = grammar().generate().context("failed to generate the fekal grammar")?;
    for conflict in &generated.conflicts {
        println!("cargo::warning=fekal: {conflict}");
    }

    let path = out_dir.join("fekal.bin");
    std::fs::write(&path, generated.data.encode())
        .with_context(|| format!("failed to write `{}`", path.display()))?;
    Ok(())
}

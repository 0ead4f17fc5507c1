//! Grammar compiler.
//!
//! Grammars are written with the builder in this crate and compiled into the
//! descriptor bytes `arbor-grammar` loads. Grammar crates call it from their
//! build scripts; engine tests use it to build small throwaway languages.
//!
//! ```ignore
//! let bytes = Grammar::new("calc")
//!     .skip(r"\s+")
//!     .token("number", "[0-9]+")
//!     .rule("expr", choice([sym("number"), prec_left(1, seq([sym("expr"), lit("+"), sym("expr")]))]))
//!     .compile()?;
//! ```

mod error;
mod lex;
mod lower;
mod lr;
mod rule;
mod symbol_set;

use arbor_grammar::tables::LanguageData;
use arbor_grammar::{AmbiguityPolicy, LANGUAGE_VERSION, Language, Production, Symbol};

pub use error::GenerateError;
pub use lr::Conflict;
pub use rule::{
    Assoc, Rule, blank, choice, field, lit, optional, prec, prec_dynamic, prec_left, prec_right,
    repeat, repeat1, seq, sym,
};

#[derive(Debug, Clone)]
enum TokenPattern {
    Literal,
    Regex(String),
}

#[derive(Debug, Clone)]
struct TokenDef {
    name: String,
    pattern: TokenPattern,
}

/// Grammar under construction.
///
/// The first rule is the start rule. Tokens are matched longest-first; of two
/// equally long matches the one declared first wins, and literals that are
/// only spelled inside rules rank after every declared token.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    skips: Vec<String>,
    tokens: Vec<TokenDef>,
    extras: Vec<String>,
    rules: Vec<(String, Rule)>,
    conflicts: Vec<Vec<String>>,
    ambiguity: AmbiguityPolicy,
}

/// Output of [`Grammar::generate`].
#[derive(Debug, Clone)]
pub struct Generated {
    pub data: LanguageData,
    /// Conflicts that were resolved to their first action.
    pub conflicts: Vec<Conflict>,
}

impl Grammar {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            skips: Vec::new(),
            tokens: Vec::new(),
            extras: Vec::new(),
            rules: Vec::new(),
            conflicts: Vec::new(),
            ambiguity: AmbiguityPolicy::default(),
        }
    }

    /// Bytes matching `pattern` separate tokens and never reach the parser.
    pub fn skip(mut self, pattern: &str) -> Self {
        self.skips.push(pattern.to_owned());
        self
    }

    /// Declares an anonymous token at this point of the priority order.
    pub fn literal(mut self, text: &str) -> Self {
        self.tokens.push(TokenDef { name: text.to_owned(), pattern: TokenPattern::Literal });
        self
    }

    /// Declares a named token matching `pattern`.
    pub fn token(mut self, name: &str, pattern: &str) -> Self {
        self.tokens
            .push(TokenDef { name: name.to_owned(), pattern: TokenPattern::Regex(pattern.to_owned()) });
        self
    }

    /// Allows the named token anywhere between two other tokens.
    pub fn extra(mut self, name: &str) -> Self {
        self.extras.push(name.to_owned());
        self
    }

    pub fn rule(mut self, name: &str, rule: Rule) -> Self {
        self.rules.push((name.to_owned(), rule));
        self
    }

    /// Lets the parser fork where these rules conflict instead of picking
    /// one action up front.
    pub fn conflict(mut self, rules: &[&str]) -> Self {
        self.conflicts.push(rules.iter().map(|&rule| rule.to_owned()).collect());
        self
    }

    pub fn ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    pub fn generate(&self) -> Result<Generated, GenerateError> {
        let lowered = lower::lower(self)?;
        let lex = lex::build(&lowered.lex_rules)?;
        let tables = lr::build(&lowered)?;

        let productions = lowered.productions[1..]
            .iter()
            .map(|production| Production {
                lhs: Symbol(production.lhs as u16),
                child_count: production.rhs.len() as u16,
                dynamic_precedence: production.dynamic,
                fields: production.fields.clone(),
            })
            .collect();

        let data = LanguageData {
            version: LANGUAGE_VERSION,
            name: self.name.clone(),
            symbols: lowered.symbols,
            terminal_count: lowered.terminal_count as u16,
            field_names: lowered.field_names,
            lex,
            parse: tables.parse,
            productions,
            ambiguity: self.ambiguity,
        };
        tracing::debug!(
            name = %self.name,
            symbols = data.symbols.len(),
            states = data.parse.state_count,
            "generated grammar"
        );
        Ok(Generated { data, conflicts: tables.conflicts })
    }

    /// Descriptor bytes for the grammar.
    pub fn compile(&self) -> Result<Vec<u8>, GenerateError> {
        Ok(self.generate()?.data.encode())
    }

    /// Compiles and loads the grammar in one go.
    pub fn build(&self) -> Result<Language, GenerateError> {
        Ok(Language::load(&self.compile()?)?)
    }
}

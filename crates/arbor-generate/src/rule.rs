/// Associativity used to settle shift/reduce conflicts between productions of
/// equal precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assoc {
    Left,
    Right,
}

/// Right-hand side of a grammar rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Blank,
    /// Reference to a named token or rule.
    Symbol(String),
    /// Anonymous token spelled exactly like the text.
    Literal(String),
    Seq(Vec<Rule>),
    Choice(Vec<Rule>),
    Repeat(Box<Rule>),
    Repeat1(Box<Rule>),
    Field(String, Box<Rule>),
    Prec { value: i16, assoc: Option<Assoc>, rule: Box<Rule> },
    /// Ranks complete interpretations when the parser had to fork.
    PrecDynamic(i16, Box<Rule>),
}

pub fn blank() -> Rule {
    Rule::Blank
}

pub fn sym(name: &str) -> Rule {
    Rule::Symbol(name.to_owned())
}

pub fn lit(text: &str) -> Rule {
    Rule::Literal(text.to_owned())
}

pub fn seq(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::Seq(rules.into_iter().collect())
}

pub fn choice(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::Choice(rules.into_iter().collect())
}

pub fn repeat(rule: Rule) -> Rule {
    Rule::Repeat(Box::new(rule))
}

pub fn repeat1(rule: Rule) -> Rule {
    Rule::Repeat1(Box::new(rule))
}

pub fn optional(rule: Rule) -> Rule {
    Rule::Choice(vec![rule, Rule::Blank])
}

pub fn field(name: &str, rule: Rule) -> Rule {
    Rule::Field(name.to_owned(), Box::new(rule))
}

pub fn prec(value: i16, rule: Rule) -> Rule {
    Rule::Prec { value, assoc: None, rule: Box::new(rule) }
}

pub fn prec_left(value: i16, rule: Rule) -> Rule {
    Rule::Prec { value, assoc: Some(Assoc::Left), rule: Box::new(rule) }
}

pub fn prec_right(value: i16, rule: Rule) -> Rule {
    Rule::Prec { value, assoc: Some(Assoc::Right), rule: Box::new(rule) }
}

pub fn prec_dynamic(value: i16, rule: Rule) -> Rule {
    Rule::PrecDynamic(value, Box::new(rule))
}

impl Rule {
    /// Calls `f` on every literal spelled inside the rule, in order.
    pub(crate) fn for_each_literal(&self, f: &mut impl FnMut(&str)) {
        match self {
            Self::Blank | Self::Symbol(_) => {}
            Self::Literal(text) => f(text),
            Self::Seq(rules) | Self::Choice(rules) => {
                for rule in rules {
                    rule.for_each_literal(f);
                }
            }
            Self::Repeat(rule)
            | Self::Repeat1(rule)
            | Self::Field(_, rule)
            | Self::Prec { rule, .. }
            | Self::PrecDynamic(_, rule) => rule.for_each_literal(f),
        }
    }
}

//! Flattens rule trees into plain productions.
//!
//! `Seq`/`Choice` are expanded into every alternative, repetitions become
//! hidden left-recursive helper rules and fields are attached to the children
//! they cover.

use arbor_grammar::{FieldId, LexAccept, Symbol, SymbolInfo};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::rule::{Assoc, Rule};
use crate::{GenerateError, Grammar, TokenPattern};

pub(crate) struct LexRule {
    pub(crate) name: String,
    pub(crate) pattern: String,
    pub(crate) accept: LexAccept,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoweredProduction {
    pub(crate) lhs: usize,
    pub(crate) rhs: Vec<usize>,
    /// `(child index, field)` sorted by child index.
    pub(crate) fields: Vec<(u16, FieldId)>,
    pub(crate) prec: Option<i16>,
    pub(crate) assoc: Option<Assoc>,
    pub(crate) dynamic: i16,
}

pub(crate) struct Lowered {
    pub(crate) symbols: Vec<SymbolInfo>,
    pub(crate) terminal_count: usize,
    /// Rule each non-terminal was written in; helpers map to their owner.
    pub(crate) origins: Vec<usize>,
    pub(crate) field_names: Vec<String>,
    pub(crate) lex_rules: Vec<LexRule>,
    /// Production 0 is the augmented `start' -> start`, whose lhs is the
    /// one-past-the-end symbol.
    pub(crate) productions: Vec<LoweredProduction>,
    /// Declared conflict sets, as origin symbols.
    pub(crate) conflicts: Vec<Vec<usize>>,
}

impl Lowered {
    pub(crate) fn augmented(&self) -> usize {
        self.symbols.len()
    }

    pub(crate) fn is_terminal(&self, symbol: usize) -> bool {
        symbol < self.terminal_count
    }

    pub(crate) fn name(&self, symbol: usize) -> &str {
        self.symbols.get(symbol).map_or("start'", |info| &info.name)
    }
}

#[derive(Clone)]
struct Alternative {
    symbols: Vec<usize>,
    fields: Vec<(u16, u16)>,
    prec: Option<i16>,
    assoc: Option<Assoc>,
    dynamic: i16,
}

impl Alternative {
    fn empty() -> Self {
        Self { symbols: Vec::new(), fields: Vec::new(), prec: None, assoc: None, dynamic: 0 }
    }

    fn single(symbol: usize) -> Self {
        Self { symbols: vec![symbol], ..Self::empty() }
    }

    fn concat(&self, other: &Self) -> Self {
        let offset = self.symbols.len() as u16;
        Self {
            symbols: self.symbols.iter().chain(&other.symbols).copied().collect(),
            fields: self
                .fields
                .iter()
                .copied()
                .chain(other.fields.iter().map(|&(child, field)| (child + offset, field)))
                .collect(),
            prec: self.prec.or(other.prec),
            assoc: self.assoc.or(other.assoc),
            dynamic: self.dynamic.saturating_add(other.dynamic),
        }
    }
}

struct Lowerer<'g> {
    symbols: Vec<SymbolInfo>,
    origins: Vec<usize>,
    names: FxHashMap<&'g str, usize>,
    literals: FxHashMap<String, usize>,
    fields: IndexSet<String>,
    productions: Vec<LoweredProduction>,
    repeat_counts: FxHashMap<usize, u32>,
    rule_name: &'g str,
}

pub(crate) fn lower(grammar: &Grammar) -> Result<Lowered, GenerateError> {
    if grammar.rules.is_empty() {
        return Err(GenerateError::NoRules(grammar.name.clone()));
    }

    let mut lowerer = Lowerer {
        symbols: vec![SymbolInfo::new("end", false, false)],
        origins: Vec::new(),
        names: FxHashMap::default(),
        literals: FxHashMap::default(),
        fields: IndexSet::new(),
        productions: Vec::new(),
        repeat_counts: FxHashMap::default(),
        rule_name: "",
    };

    let mut lex_rules = Vec::new();
    for token in &grammar.tokens {
        let id = lowerer.symbols.len();
        let (pattern, info) = match &token.pattern {
            TokenPattern::Literal => {
                if lowerer.literals.insert(token.name.clone(), id).is_some() {
                    return Err(GenerateError::DuplicateName(token.name.clone()));
                }
                (regex_syntax::escape(&token.name), SymbolInfo::new(&token.name, false, true))
            }
            TokenPattern::Regex(pattern) => {
                lowerer.declare(&token.name, id)?;
                let visible = !token.name.starts_with('_');
                (pattern.clone(), SymbolInfo::new(&token.name, true, visible))
            }
        };
        lex_rules.push(LexRule {
            name: token.name.clone(),
            pattern,
            accept: LexAccept::Token(Symbol(id as u16)),
        });
        lowerer.symbols.push(info);
    }

    // Literals only spelled inside rules rank after every declared token.
    for (_, rule) in &grammar.rules {
        rule.for_each_literal(&mut |text| {
            if !lowerer.literals.contains_key(text) {
                let id = lowerer.symbols.len();
                lowerer.literals.insert(text.to_owned(), id);
                lowerer.symbols.push(SymbolInfo::new(text, false, true));
                lex_rules.push(LexRule {
                    name: text.to_owned(),
                    pattern: regex_syntax::escape(text),
                    accept: LexAccept::Token(Symbol(id as u16)),
                });
            }
        });
    }

    for (index, pattern) in grammar.skips.iter().enumerate() {
        lex_rules.push(LexRule {
            name: format!("skip{index}"),
            pattern: pattern.clone(),
            accept: LexAccept::Skip,
        });
    }

    let terminal_count = lowerer.symbols.len();
    lowerer.origins = vec![usize::MAX; terminal_count];

    for (name, _) in &grammar.rules {
        let id = lowerer.symbols.len();
        lowerer.declare(name, id)?;
        let visible = !name.starts_with('_');
        lowerer.symbols.push(SymbolInfo::new(name, true, visible));
        lowerer.origins.push(id);
    }

    for extra in &grammar.extras {
        match lowerer.names.get(extra.as_str()).or_else(|| lowerer.literals.get(extra)) {
            Some(&id) if id < terminal_count => lowerer.symbols[id].extra = true,
            _ => return Err(GenerateError::ExtraNotToken(extra.clone())),
        }
    }

    // The lhs is patched once every helper symbol exists.
    let start = terminal_count;
    lowerer.productions.push(LoweredProduction {
        lhs: usize::MAX,
        rhs: vec![start],
        fields: Vec::new(),
        prec: None,
        assoc: None,
        dynamic: 0,
    });

    for (offset, (name, rule)) in grammar.rules.iter().enumerate() {
        lowerer.rule_name = name.as_str();
        let owner = terminal_count + offset;
        let alternatives = lowerer.expand(rule, owner)?;
        lowerer.add_productions(owner, alternatives);
    }

    if lowerer.symbols.len() >= Symbol::ERROR.index() {
        return Err(GenerateError::TooManySymbols(lowerer.symbols.len()));
    }
    lowerer.productions[0].lhs = lowerer.symbols.len();

    for production in &lowerer.productions {
        if let Some(&extra) =
            production.rhs.iter().find(|&&symbol| lowerer.symbols[symbol].extra)
        {
            return Err(GenerateError::ExtraInRule(lowerer.symbols[extra].name.clone()));
        }
    }

    let mut conflicts = Vec::new();
    for names in &grammar.conflicts {
        let mut set = Vec::new();
        for name in names {
            match lowerer.names.get(name.as_str()) {
                Some(&id) if id >= terminal_count => set.push(id),
                _ => {
                    return Err(GenerateError::UnknownSymbol {
                        name: name.clone(),
                        rule: "conflicts".to_owned(),
                    });
                }
            }
        }
        conflicts.push(set);
    }

    Ok(Lowered {
        symbols: lowerer.symbols,
        terminal_count,
        origins: lowerer.origins,
        field_names: lowerer.fields.into_iter().collect(),
        lex_rules,
        productions: lowerer.productions,
        conflicts,
    })
}

impl<'g> Lowerer<'g> {
    fn declare(&mut self, name: &'g str, id: usize) -> Result<(), GenerateError> {
        if self.names.insert(name, id).is_some() {
            return Err(GenerateError::DuplicateName(name.to_owned()));
        }
        Ok(())
    }

    fn field_id(&mut self, name: &str) -> u16 {
        let (index, _) = self.fields.insert_full(name.to_owned());
        index as u16 + 1
    }

    fn expand(&mut self, rule: &'g Rule, owner: usize) -> Result<Vec<Alternative>, GenerateError> {
        let alternatives = match rule {
            Rule::Blank => vec![Alternative::empty()],
            Rule::Symbol(name) => match self.names.get(name.as_str()) {
                Some(&id) => vec![Alternative::single(id)],
                None => {
                    return Err(GenerateError::UnknownSymbol {
                        name: name.clone(),
                        rule: self.rule_name.to_owned(),
                    });
                }
            },
            Rule::Literal(text) => vec![Alternative::single(self.literals[text.as_str()])],
            Rule::Seq(rules) => {
                let mut product = vec![Alternative::empty()];
                for rule in rules {
                    let next = self.expand(rule, owner)?;
                    product = product
                        .iter()
                        .flat_map(|head| next.iter().map(move |tail| head.concat(tail)))
                        .collect();
                }
                product
            }
            Rule::Choice(rules) => {
                let mut alternatives = Vec::new();
                for rule in rules {
                    alternatives.extend(self.expand(rule, owner)?);
                }
                alternatives
            }
            Rule::Repeat(rule) => match self.repetition(rule, owner)? {
                Some(helper) => vec![Alternative::single(helper), Alternative::empty()],
                None => vec![Alternative::empty()],
            },
            Rule::Repeat1(rule) => match self.repetition(rule, owner)? {
                Some(helper) => vec![Alternative::single(helper)],
                None => vec![Alternative::empty()],
            },
            Rule::Field(name, rule) => {
                let field = self.field_id(name);
                let mut alternatives = self.expand(rule, owner)?;
                for alternative in &mut alternatives {
                    for child in 0..alternative.symbols.len() as u16 {
                        if !alternative.fields.iter().any(|&(index, _)| index == child) {
                            alternative.fields.push((child, field));
                        }
                    }
                }
                alternatives
            }
            Rule::Prec { value, assoc, rule } => {
                let mut alternatives = self.expand(rule, owner)?;
                for alternative in &mut alternatives {
                    alternative.prec = alternative.prec.or(Some(*value));
                    alternative.assoc = alternative.assoc.or(*assoc);
                }
                alternatives
            }
            Rule::PrecDynamic(value, rule) => {
                let mut alternatives = self.expand(rule, owner)?;
                for alternative in &mut alternatives {
                    alternative.dynamic = alternative.dynamic.saturating_add(*value);
                }
                alternatives
            }
        };
        Ok(alternatives)
    }

    /// Creates `helper -> helper body | body` and returns the helper, or
    /// `None` when the body can only match nothing.
    fn repetition(&mut self, body: &'g Rule, owner: usize) -> Result<Option<usize>, GenerateError> {
        let mut alternatives = self.expand(body, owner)?;
        alternatives.retain(|alternative| !alternative.symbols.is_empty());
        if alternatives.is_empty() {
            return Ok(None);
        }

        let count = self.repeat_counts.entry(owner).or_default();
        *count += 1;
        let name = format!("{}_repeat{count}", self.symbols[owner].name);
        let helper = self.symbols.len();
        self.symbols.push(SymbolInfo::new(name, true, false));
        self.origins.push(owner);

        let recursive = Alternative::single(helper);
        let mut productions: Vec<_> =
            alternatives.iter().map(|alternative| recursive.concat(alternative)).collect();
        productions.extend(alternatives);
        self.add_productions(helper, productions);
        Ok(Some(helper))
    }

    fn add_productions(&mut self, lhs: usize, alternatives: Vec<Alternative>) {
        let mut seen = FxHashSet::default();
        for mut alternative in alternatives {
            alternative.fields.sort_unstable();
            if !seen.insert((alternative.symbols.clone(), alternative.fields.clone())) {
                continue;
            }
            let fields = alternative
                .fields
                .into_iter()
                .filter_map(|(child, field)| Some((child, FieldId::new(field)?)))
                .collect();
            self.productions.push(LoweredProduction {
                lhs,
                rhs: alternative.symbols,
                fields,
                prec: alternative.prec,
                assoc: alternative.assoc,
                dynamic: alternative.dynamic,
            });
        }
    }
}

/// Productions grouped by left-hand side, in declaration order.
pub(crate) fn productions_by_lhs(lowered: &Lowered) -> IndexMap<usize, Vec<usize>> {
    let mut by_lhs: IndexMap<usize, Vec<usize>> = IndexMap::new();
    for (index, production) in lowered.productions.iter().enumerate() {
        by_lhs.entry(production.lhs).or_default().push(index);
    }
    by_lhs
}

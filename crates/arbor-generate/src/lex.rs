//! Token patterns → byte-class DFA.
//!
//! Every pattern is parsed to HIR, compiled into one Thompson NFA whose match
//! states remember the rule index, then determinized over byte classes. A DFA
//! state accepts the lowest rule index among its NFA matches, which is how
//! declaration order breaks ties between equally long matches.

use arbor_grammar::LexAccept;
use arbor_grammar::tables::{DEAD_STATE, LexTable};
use indexmap::IndexSet;
use regex_syntax::ParserBuilder;
use regex_syntax::hir::{Class, Hir, HirKind};

use crate::GenerateError;
use crate::lower::LexRule;

/// Bounded repetitions are unrolled; keep them small.
const MAX_REPEAT: u32 = 256;

#[derive(Debug)]
enum NfaState {
    Epsilon(Vec<usize>),
    Bytes { ranges: Vec<(u8, u8)>, next: usize },
    Match(usize),
}

#[derive(Default)]
struct Nfa {
    states: Vec<NfaState>,
}

impl Nfa {
    fn push(&mut self, state: NfaState) -> usize {
        self.states.push(state);
        self.states.len() - 1
    }

    /// Compiles `hir` so that it continues into `next`; returns the entry.
    fn compile(&mut self, hir: &Hir, next: usize, name: &str) -> Result<usize, GenerateError> {
        let unsupported =
            |feature| GenerateError::UnsupportedPattern { name: name.to_owned(), feature };

        let entry = match hir.kind() {
            HirKind::Empty => next,
            HirKind::Literal(literal) => literal.0.iter().rev().fold(next, |next, &byte| {
                self.push(NfaState::Bytes { ranges: vec![(byte, byte)], next })
            }),
            HirKind::Class(Class::Bytes(class)) => {
                let ranges = class.ranges().iter().map(|range| (range.start(), range.end()));
                self.push(NfaState::Bytes { ranges: ranges.collect(), next })
            }
            HirKind::Class(Class::Unicode(class)) => {
                let mut ranges = Vec::new();
                for range in class.ranges() {
                    let (Ok(start), Ok(end)) = (u8::try_from(range.start()), u8::try_from(range.end()))
                    else {
                        return Err(unsupported("non-ASCII classes"));
                    };
                    ranges.push((start, end));
                }
                self.push(NfaState::Bytes { ranges, next })
            }
            HirKind::Look(_) => return Err(unsupported("anchors and word boundaries")),
            HirKind::Capture(capture) => self.compile(&capture.sub, next, name)?,
            HirKind::Concat(hirs) => {
                let mut entry = next;
                for hir in hirs.iter().rev() {
                    entry = self.compile(hir, entry, name)?;
                }
                entry
            }
            HirKind::Alternation(hirs) => {
                let mut entries = Vec::with_capacity(hirs.len());
                for hir in hirs {
                    entries.push(self.compile(hir, next, name)?);
                }
                self.push(NfaState::Epsilon(entries))
            }
            HirKind::Repetition(repetition) => {
                if repetition.min > MAX_REPEAT || repetition.max.is_some_and(|max| max > MAX_REPEAT)
                {
                    return Err(unsupported("repetition counts above 256"));
                }
                let mut entry = match repetition.max {
                    None => {
                        let the_loop = self.push(NfaState::Epsilon(Vec::new()));
                        let body = self.compile(&repetition.sub, the_loop, name)?;
                        self.states[the_loop] = NfaState::Epsilon(vec![body, next]);
                        the_loop
                    }
                    Some(max) => {
                        let mut entry = next;
                        for _ in repetition.min..max {
                            let body = self.compile(&repetition.sub, entry, name)?;
                            entry = self.push(NfaState::Epsilon(vec![body, next]));
                        }
                        entry
                    }
                };
                for _ in 0..repetition.min {
                    entry = self.compile(&repetition.sub, entry, name)?;
                }
                entry
            }
        };
        Ok(entry)
    }

    fn closure(&self, seeds: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let mut set = IndexSet::new();
        let mut stack: Vec<usize> = seeds.into_iter().collect();
        while let Some(state) = stack.pop() {
            if !set.insert(state) {
                continue;
            }
            if let NfaState::Epsilon(targets) = &self.states[state] {
                stack.extend(targets.iter().copied());
            }
        }
        let mut states: Vec<_> = set.into_iter().collect();
        states.sort_unstable();
        states
    }

    fn accepted_rule(&self, states: &[usize]) -> Option<usize> {
        states
            .iter()
            .filter_map(|&state| match self.states[state] {
                NfaState::Match(rule) => Some(rule),
                _ => None,
            })
            .min()
    }
}

/// Assigns every byte to an equivalence class: bytes in the same class are
/// never distinguished by any pattern.
fn partition_bytes(nfa: &Nfa) -> ([u8; 256], u16) {
    let mut boundary = [false; 257];
    for state in &nfa.states {
        if let NfaState::Bytes { ranges, .. } = state {
            for &(start, end) in ranges {
                boundary[start as usize] = true;
                boundary[end as usize + 1] = true;
            }
        }
    }

    let mut classes = [0; 256];
    let mut class = 0u16;
    for byte in 1..256 {
        if boundary[byte] {
            class += 1;
        }
        classes[byte] = class as u8;
    }
    (classes, class + 1)
}

pub(crate) fn build(rules: &[LexRule]) -> Result<LexTable, GenerateError> {
    let mut nfa = Nfa::default();
    let mut entries = Vec::with_capacity(rules.len());
    for (index, rule) in rules.iter().enumerate() {
        // A regex-syntax parser accepts a single pattern.
        let mut parser = ParserBuilder::new().unicode(false).utf8(false).build();
        let hir = parser.parse(&rule.pattern).map_err(|error| {
            GenerateError::InvalidPattern { name: rule.name.clone(), message: error.to_string() }
        })?;
        let accept = nfa.push(NfaState::Match(index));
        let entry = nfa.compile(&hir, accept, &rule.name)?;
        if nfa.closure([entry]).contains(&accept) {
            return Err(GenerateError::EmptyMatch(rule.name.clone()));
        }
        entries.push(entry);
    }

    let (byte_classes, class_count) = partition_bytes(&nfa);
    let mut representatives = vec![0u8; class_count as usize];
    for byte in (0..=255u8).rev() {
        representatives[byte_classes[byte as usize] as usize] = byte;
    }

    let mut dfa_states = IndexSet::new();
    dfa_states.insert(nfa.closure(entries));
    let mut accept = Vec::new();
    let mut transitions = Vec::new();

    let mut index = 0;
    while let Some(current) = dfa_states.get_index(index).cloned() {
        accept.push(match nfa.accepted_rule(&current) {
            Some(rule) => rules[rule].accept,
            None => LexAccept::None,
        });

        for &byte in &representatives {
            let moved = current.iter().filter_map(|&state| match &nfa.states[state] {
                NfaState::Bytes { ranges, next }
                    if ranges.iter().any(|&(start, end)| (start..=end).contains(&byte)) =>
                {
                    Some(*next)
                }
                _ => None,
            });
            let target = nfa.closure(moved);
            if target.is_empty() {
                transitions.push(DEAD_STATE);
                continue;
            }
            let (target, _) = dfa_states.insert_full(target);
            if target >= DEAD_STATE as usize {
                return Err(GenerateError::TooManyStates { automaton: "lexer", count: target + 1 });
            }
            transitions.push(target as u16);
        }
        index += 1;
    }

    tracing::debug!(rules = rules.len(), states = accept.len(), classes = class_count, "built lexer");
    Ok(LexTable { byte_classes, class_count, accept, transitions, modes: vec![0] })
}

#[cfg(test)]
mod tests {
    use arbor_grammar::Symbol;

    use super::*;

    fn rule(name: &str, pattern: &str, symbol: u16) -> LexRule {
        LexRule {
            name: name.to_owned(),
            pattern: pattern.to_owned(),
            accept: LexAccept::Token(Symbol(symbol)),
        }
    }

    fn run(table: &LexTable, text: &[u8]) -> LexAccept {
        let mut state = table.modes[0];
        for &byte in text {
            match table.next_state(state, byte) {
                Some(next) => state = next,
                None => return LexAccept::None,
            }
        }
        table.accept[state as usize]
    }

    #[test]
    fn earlier_rules_win_ties() {
        let table =
            build(&[rule("if", "if", 1), rule("identifier", "[a-z_][a-z0-9_]*", 2)]).unwrap();

        assert_eq!(run(&table, b"if"), LexAccept::Token(Symbol(1)));
        assert_eq!(run(&table, b"iff"), LexAccept::Token(Symbol(2)));
        assert_eq!(run(&table, b"i"), LexAccept::Token(Symbol(2)));
        assert_eq!(run(&table, b"9"), LexAccept::None);
    }

    #[test]
    fn every_pattern_is_parsed_on_its_own() {
        let table = build(&[
            rule("policy", "POLICY", 1),
            rule("identifier", "[A-Za-z_]+", 2),
            rule("number", "[0-9]+", 3),
        ])
        .unwrap();
        assert_eq!(run(&table, b"POLICY"), LexAccept::Token(Symbol(1)));
        assert_eq!(run(&table, b"POLICYx"), LexAccept::Token(Symbol(2)));
        assert_eq!(run(&table, b"42"), LexAccept::Token(Symbol(3)));

        let error = build(&[rule("identifier", "[a-z]+", 1), rule("broken", "[a-", 2)]).unwrap_err();
        assert!(matches!(error, GenerateError::InvalidPattern { name, .. } if name == "broken"));
    }

    #[test]
    fn bounded_repetition_is_unrolled() {
        let table = build(&[rule("hex", "0x[0-9a-f]{1,2}", 1)]).unwrap();

        assert_eq!(run(&table, b"0x"), LexAccept::None);
        assert_eq!(run(&table, b"0xf"), LexAccept::Token(Symbol(1)));
        assert_eq!(run(&table, b"0xff"), LexAccept::Token(Symbol(1)));
        assert_eq!(run(&table, b"0xfff"), LexAccept::None);
    }

    #[test]
    fn rejects_empty_and_anchored_patterns() {
        assert!(matches!(build(&[rule("blank", "a*", 1)]), Err(GenerateError::EmptyMatch(_))));
        assert!(matches!(
            build(&[rule("line", "^a", 1)]),
            Err(GenerateError::UnsupportedPattern { .. })
        ));
        assert!(matches!(
            build(&[rule("broken", "(a", 1)]),
            Err(GenerateError::InvalidPattern { .. })
        ));
    }
}

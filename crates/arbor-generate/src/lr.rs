//! LALR(1) parse table construction.
//!
//! Builds the LR(0) item automaton, then propagates lookaheads through it
//! until nothing changes. Conflicts are settled by static precedence and
//! associativity; what is left is either kept for the parser to fork on (when
//! the grammar declares it) or reported and resolved to the first action.

use std::fmt;

use arbor_grammar::tables::ParseTable;
use arbor_grammar::{ParseAction, ProductionId, StateId};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;

use crate::GenerateError;
use crate::lower::{Lowered, productions_by_lhs};
use crate::rule::Assoc;
use crate::symbol_set::SymbolSet;

/// A conflict the grammar neither resolved with precedence nor declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: u16,
    pub lookahead: String,
    /// Rules whose productions compete, in the order they were considered.
    pub rules: Vec<String>,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state {}: conflict on `{}` between {}",
            self.state,
            self.lookahead,
            self.rules.join(", ")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Item {
    production: usize,
    dot: usize,
}

impl Item {
    fn advance(self) -> Self {
        Self { dot: self.dot + 1, ..self }
    }
}

struct ItemSet {
    /// Kernel items first, then the closure.
    items: Vec<Item>,
    positions: FxHashMap<Item, usize>,
    transitions: IndexMap<usize, usize>,
}

struct Builder<'l> {
    lowered: &'l Lowered,
    by_lhs: IndexMap<usize, Vec<usize>>,
    /// Symbol count including the augmented start symbol.
    width: usize,
}

impl Builder<'_> {
    fn next_symbol(&self, item: Item) -> Option<usize> {
        self.lowered.productions[item.production].rhs.get(item.dot).copied()
    }

    fn closure(&self, kernel: &[Item]) -> ItemSet {
        let mut items: IndexSet<Item> = kernel.iter().copied().collect();
        let mut index = 0;
        while let Some(&item) = items.get_index(index) {
            if let Some(symbol) = self.next_symbol(item)
                && let Some(productions) = self.by_lhs.get(&symbol)
            {
                for &production in productions {
                    items.insert(Item { production, dot: 0 });
                }
            }
            index += 1;
        }

        let items: Vec<Item> = items.into_iter().collect();
        let positions = items.iter().enumerate().map(|(index, &item)| (item, index)).collect();
        ItemSet { items, positions, transitions: IndexMap::new() }
    }

    fn automaton(&self) -> Vec<ItemSet> {
        let mut kernels = IndexSet::new();
        kernels.insert(vec![Item { production: 0, dot: 0 }]);

        let mut states = Vec::new();
        let mut index = 0;
        while let Some(kernel) = kernels.get_index(index) {
            let mut state = self.closure(kernel);

            let mut successors: IndexMap<usize, Vec<Item>> = IndexMap::new();
            for &item in &state.items {
                if let Some(symbol) = self.next_symbol(item) {
                    successors.entry(symbol).or_default().push(item.advance());
                }
            }
            for (symbol, mut kernel) in successors {
                kernel.sort_unstable();
                kernel.dedup();
                let (target, _) = kernels.insert_full(kernel);
                state.transitions.insert(symbol, target);
            }

            states.push(state);
            index += 1;
        }
        states
    }

    fn first_sets(&self) -> (Vec<SymbolSet>, Vec<bool>) {
        let mut first: Vec<SymbolSet> = (0..self.width)
            .map(|symbol| {
                if self.lowered.is_terminal(symbol) {
                    SymbolSet::single(self.width, symbol)
                } else {
                    SymbolSet::with_capacity(self.width)
                }
            })
            .collect();
        let mut nullable = vec![false; self.width];

        let mut changed = true;
        while changed {
            changed = false;
            for production in &self.lowered.productions {
                let mut all_nullable = true;
                for &symbol in &production.rhs {
                    let symbol_first = first[symbol].clone();
                    changed |= first[production.lhs].union_with(&symbol_first);
                    if !nullable[symbol] {
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable && !nullable[production.lhs] {
                    nullable[production.lhs] = true;
                    changed = true;
                }
            }
        }
        (first, nullable)
    }

    fn lookaheads(&self, states: &[ItemSet]) -> Vec<Vec<SymbolSet>> {
        let (first, nullable) = self.first_sets();
        let mut lookaheads: Vec<Vec<SymbolSet>> = states
            .iter()
            .map(|state| vec![SymbolSet::with_capacity(self.width); state.items.len()])
            .collect();
        lookaheads[0][0].insert(0);

        let mut changed = true;
        while changed {
            changed = false;
            for (index, state) in states.iter().enumerate() {
                for (position, &item) in state.items.iter().enumerate() {
                    let Some(next) = self.next_symbol(item) else { continue };
                    let lookahead = lookaheads[index][position].clone();

                    let target = state.transitions[&next];
                    let advanced = states[target].positions[&item.advance()];
                    changed |= lookaheads[target][advanced].union_with(&lookahead);

                    let Some(productions) = self.by_lhs.get(&next) else { continue };
                    let rest = &self.lowered.productions[item.production].rhs[item.dot + 1..];
                    let mut follow = SymbolSet::with_capacity(self.width);
                    let mut rest_nullable = true;
                    for &symbol in rest {
                        follow.union_with(&first[symbol]);
                        if !nullable[symbol] {
                            rest_nullable = false;
                            break;
                        }
                    }
                    if rest_nullable {
                        follow.union_with(&lookahead);
                    }
                    for &production in productions {
                        let start = state.positions[&Item { production, dot: 0 }];
                        changed |= lookaheads[index][start].union_with(&follow);
                    }
                }
            }
        }
        lookaheads
    }
}

pub(crate) struct Tables {
    pub(crate) parse: ParseTable,
    pub(crate) conflicts: Vec<Conflict>,
}

pub(crate) fn build(lowered: &Lowered) -> Result<Tables, GenerateError> {
    let builder =
        Builder { lowered, by_lhs: productions_by_lhs(lowered), width: lowered.augmented() + 1 };
    let states = builder.automaton();
    if states.len() >= u16::MAX as usize {
        return Err(GenerateError::TooManyStates { automaton: "parse", count: states.len() });
    }
    let lookaheads = builder.lookaheads(&states);

    let symbol_count = lowered.symbols.len();
    let mut table = TableWriter {
        lowered,
        cells: vec![0; states.len() * symbol_count],
        action_lists: vec![Vec::new()],
        list_ids: FxHashMap::default(),
        conflicts: Vec::new(),
    };
    table.list_ids.insert(Vec::new(), 0);

    for (index, state) in states.iter().enumerate() {
        let mut reductions: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for (position, &item) in state.items.iter().enumerate() {
            if builder.next_symbol(item).is_none() {
                for terminal in lookaheads[index][position].iter() {
                    reductions.entry(terminal).or_default().push(item.production);
                }
            }
        }

        for symbol in 0..symbol_count {
            let shift = state.transitions.get(&symbol).copied();
            let actions = if lowered.is_terminal(symbol) {
                let reduces = reductions.remove(&symbol).unwrap_or_default();
                table.resolve(index, state, symbol, shift, reduces)
            } else {
                shift.map(|target| vec![ParseAction::Goto(StateId(target as u16))]).unwrap_or_default()
            };
            let list = table.intern(actions);
            table.cells[index * symbol_count + symbol] = list;
        }
    }

    tracing::debug!(
        states = states.len(),
        action_lists = table.action_lists.len(),
        conflicts = table.conflicts.len(),
        "built parse table"
    );

    Ok(Tables {
        parse: ParseTable {
            state_count: states.len() as u16,
            cells: table.cells,
            action_lists: table.action_lists,
            lex_modes: vec![0; states.len()],
        },
        conflicts: table.conflicts,
    })
}

struct TableWriter<'l> {
    lowered: &'l Lowered,
    cells: Vec<u32>,
    action_lists: Vec<Vec<ParseAction>>,
    list_ids: FxHashMap<Vec<ParseAction>, u32>,
    conflicts: Vec<Conflict>,
}

impl TableWriter<'_> {
    fn intern(&mut self, actions: Vec<ParseAction>) -> u32 {
        if let Some(&id) = self.list_ids.get(&actions) {
            return id;
        }
        let id = self.action_lists.len() as u32;
        self.action_lists.push(actions.clone());
        self.list_ids.insert(actions, id);
        id
    }

    fn precedence(&self, production: usize) -> i16 {
        self.lowered.productions[production].prec.unwrap_or(0)
    }

    fn resolve(
        &mut self,
        index: usize,
        state: &ItemSet,
        terminal: usize,
        shift: Option<usize>,
        mut reduces: Vec<usize>,
    ) -> Vec<ParseAction> {
        reduces.sort_unstable();
        reduces.dedup();
        if reduces.first() == Some(&0) {
            return vec![ParseAction::Accept];
        }

        if let Some(best) = reduces.iter().map(|&production| self.precedence(production)).max() {
            reduces.retain(|&production| self.precedence(production) == best);
        }

        // Productions that would shift this terminal.
        let shifting: Vec<usize> = state
            .items
            .iter()
            .filter(|item| self.lowered.productions[item.production].rhs.get(item.dot) == Some(&terminal))
            .map(|item| item.production)
            .collect();

        let mut keep_shift = shift.is_some();
        if shift.is_some() && !reduces.is_empty() {
            let shift_precedence =
                shifting.iter().map(|&production| self.precedence(production)).max().unwrap_or(0);
            let mut kept = Vec::new();
            for &production in &reduces {
                let reduce_precedence = self.precedence(production);
                let assoc = self.lowered.productions[production].assoc;
                if reduce_precedence > shift_precedence {
                    keep_shift = false;
                    kept.push(production);
                } else if reduce_precedence < shift_precedence {
                    continue;
                } else {
                    match assoc {
                        Some(Assoc::Left) => {
                            keep_shift = false;
                            kept.push(production);
                        }
                        Some(Assoc::Right) => {}
                        None => kept.push(production),
                    }
                }
            }
            reduces = kept;
        }

        let mut actions = Vec::new();
        if keep_shift && let Some(target) = shift {
            actions.push(ParseAction::Shift(StateId(target as u16)));
        }
        actions.extend(
            reduces.iter().map(|&production| ParseAction::Reduce(ProductionId(production as u16 - 1))),
        );
        if actions.len() <= 1 {
            return actions;
        }

        let mut involved: Vec<usize> = Vec::new();
        if keep_shift {
            involved.extend(shifting.iter().map(|&production| self.lowered.productions[production].lhs));
        }
        involved.extend(reduces.iter().map(|&production| self.lowered.productions[production].lhs));
        let mut origins: Vec<usize> =
            involved.iter().map(|&symbol| self.lowered.origins[symbol]).collect();
        origins.sort_unstable();
        origins.dedup();

        let declared = self
            .lowered
            .conflicts
            .iter()
            .any(|set| origins.iter().all(|origin| set.contains(origin)));
        if declared {
            return actions;
        }

        let conflict = Conflict {
            state: index as u16,
            lookahead: self.lowered.name(terminal).to_owned(),
            rules: origins.iter().map(|&origin| self.lowered.name(origin).to_owned()).collect(),
        };
        tracing::warn!(%conflict, "unresolved conflict; keeping the first action");
        self.conflicts.push(conflict);
        actions.truncate(1);
        actions
    }
}

//! The LR driver shared by full parses and reparses.
//!
//! All live versions consume the same lookahead before the next one is
//! fetched, so they always agree on the position in the text. Forks happen
//! on multi-action cells; versions that reach the same configuration are
//! merged after every token.

use arbor_grammar::{AmbiguityPolicy, Language, ParseAction, ProductionId, StateId, Symbol};
use arbor_inputs::{TextLen, TextSource};
use arbor_lexer::{LexState, Lexer};
use arbor_tree::{GreenChild, GreenFlags, GreenHead, GreenNode, NodeInfo};

use crate::recovery::Recovery;
use crate::reuse::ReuseCursor;
use crate::stack::{self, Version};
use crate::{ParseOptions, ParseStats};

/// The next thing the parser consumes.
#[derive(Clone)]
pub(crate) struct Lookahead {
    pub(crate) node: GreenNode,
    /// Symbol the table is consulted with.
    pub(crate) symbol: Symbol,
    /// Position just past `node`.
    pub(crate) end: TextLen,
}

#[derive(Default)]
pub(crate) struct Step {
    pub(crate) shifted: Vec<Version>,
    pub(crate) accepted: Vec<Version>,
}

impl Step {
    pub(crate) fn is_empty(&self) -> bool {
        self.shifted.is_empty() && self.accepted.is_empty()
    }

    fn extend(&mut self, other: Self) {
        self.shifted.extend(other.shifted);
        self.accepted.extend(other.accepted);
    }
}

pub(crate) struct Driver<'p, S: TextSource + ?Sized> {
    pub(crate) language: &'p Language,
    pub(crate) options: &'p ParseOptions,
    pub(crate) policy: AmbiguityPolicy,
    lexer: Lexer<'p, S>,
    reuse: Option<ReuseCursor>,
    pub(crate) versions: Vec<Version>,
    /// Where the next lookahead's padding begins.
    pub(crate) position: TextLen,
    text_len: TextLen,
    pub(crate) stats: ParseStats,
}

impl<'p, S: TextSource + ?Sized> Driver<'p, S> {
    pub(crate) fn new(
        language: &'p Language,
        options: &'p ParseOptions,
        source: &'p S,
        reuse: Option<ReuseCursor>,
    ) -> Self {
        Self {
            language,
            options,
            policy: options.ambiguity.unwrap_or_else(|| language.ambiguity_policy()),
            lexer: Lexer::new(language, source),
            reuse,
            versions: vec![Version::default()],
            position: TextLen::ZERO,
            text_len: TextLen::ZERO,
            stats: ParseStats::default(),
        }
    }

    /// Parses to the end of the text. Always produces a tree.
    pub(crate) fn run(mut self) -> (GreenNode, TextLen, ParseStats) {
        loop {
            if self.reuse_subtree() {
                continue;
            }
            let lookahead = self.next_token();
            self.stats.tokens += 1;
            if let Some(root) = self.advance(lookahead) {
                return (root, self.text_len, self.stats);
            }
        }
    }

    /// Feeds one lookahead to every version, recovering when none of them
    /// can take it. Returns the root once the parse is complete.
    fn advance(&mut self, lookahead: Lookahead) -> Option<GreenNode> {
        if lookahead.node.is_extra() {
            for version in &mut self.versions {
                if version.skipped.is_empty() {
                    let state = version.top_state();
                    version.push(state, lookahead.node.clone());
                } else {
                    version.skipped.push(lookahead.node.clone());
                }
            }
            self.position = lookahead.end;
            return None;
        }

        loop {
            let versions = std::mem::take(&mut self.versions);
            let many = versions.len() > 1;
            let mut step = Step::default();
            let mut failed = Vec::new();

            for mut version in versions {
                if !version.skipped.is_empty() {
                    if !self.language.has_actions(version.top_state(), lookahead.symbol) {
                        failed.push(version);
                        continue;
                    }
                    let depth = version.entries.len();
                    self.wrap_error(&mut version, depth, lookahead.symbol);
                }
                let outcome = self.step(version.clone(), &lookahead, many);
                if outcome.is_empty() {
                    failed.push(version);
                } else {
                    step.extend(outcome);
                }
            }

            if let Some(root) = self.settle(step, &lookahead) {
                return Some(root);
            }
            if !self.versions.is_empty() {
                return None;
            }

            failed.sort_by(|a, b| stack::compare(a, b, self.policy));
            let Some(version) = failed.into_iter().next() else {
                return Some(self.error_root(Version::default()));
            };
            match self.recover(version, &lookahead) {
                Recovery::Retry => {}
                Recovery::Settled(step) => return self.settle(step, &lookahead),
                Recovery::Skipped => return None,
                Recovery::Done(root) => return Some(root),
            }
        }
    }

    /// Adopts the outcome of a step: the best accepted version finishes the
    /// parse, otherwise the shifted versions become the live set.
    pub(crate) fn settle(&mut self, mut step: Step, lookahead: &Lookahead) -> Option<GreenNode> {
        if !step.accepted.is_empty() {
            step.accepted.sort_by(|a, b| stack::compare(a, b, self.policy));
            let best = step.accepted.swap_remove(0);
            return Some(self.finish(best));
        }
        if step.shifted.is_empty() {
            return None;
        }
        let policy = self.policy;
        self.stats.merges += stack::condense(&mut step.shifted, policy, self.options.max_versions);
        self.versions = step.shifted;
        self.position = lookahead.end;
        None
    }

    /// Runs every reduction `lookahead` triggers on `version`, forking on
    /// multi-action cells, until each branch shifts, accepts or fails.
    pub(crate) fn step(&mut self, version: Version, lookahead: &Lookahead, many: bool) -> Step {
        let mut budget = (version.entries.len() + self.language.data().productions.len() + 1)
            * (self.options.max_versions + 1);
        let mut forked = false;
        let mut step = Step::default();
        let mut worklist = vec![version];

        while let Some(version) = worklist.pop() {
            let state = version.top_state();
            let actions = self.language.actions(state, lookahead.symbol);
            if actions.len() > 1 {
                forked = true;
                self.stats.forks += actions.len() - 1;
                tracing::trace!(?state, symbol = ?lookahead.symbol, count = actions.len(), "fork");
            }

            for (index, &action) in actions.iter().enumerate() {
                let mut branch = version.clone();
                if actions.len() > 1 {
                    branch.fork_path.push(index as u8);
                }
                match action {
                    ParseAction::Shift(next) => {
                        tracing::trace!(?state, ?next, symbol = ?lookahead.symbol, "shift");
                        branch.push(next, lookahead.node.clone());
                        self.stats.shifts += 1;
                        step.shifted.push(branch);
                    }
                    ParseAction::Reduce(production) => {
                        if budget == 0 {
                            tracing::debug!(?state, "reduction limit reached; dropping version");
                            continue;
                        }
                        budget -= 1;
                        let fragile = many || forked;
                        if let Some(branch) = self.reduce(branch, production, lookahead.symbol, fragile) {
                            self.stats.reductions += 1;
                            worklist.push(branch);
                        }
                    }
                    ParseAction::Accept => {
                        tracing::trace!(?state, "accept");
                        step.accepted.push(branch);
                    }
                    ParseAction::Goto(_) => {}
                }
            }
        }
        step
    }

    /// Pops the children of `production`, builds its node and pushes it with
    /// the goto state. Extras on top of the stack stay on top.
    pub(crate) fn reduce(
        &self,
        mut version: Version,
        production_id: ProductionId,
        follow: Symbol,
        fragile: bool,
    ) -> Option<Version> {
        let production = self.language.production(production_id);

        let mut trailing = Vec::new();
        while version.entries.last().is_some_and(|entry| entry.node.is_extra()) {
            trailing.extend(version.entries.pop());
        }

        let mut popped = Vec::new();
        let mut remaining = production.child_count;
        while remaining > 0 {
            let entry = version.entries.pop()?;
            if !entry.node.is_extra() {
                remaining -= 1;
            }
            popped.push(entry.node);
        }

        let mut child_index = 0;
        let children = popped
            .into_iter()
            .rev()
            .map(|node| {
                let field = if node.is_extra() {
                    None
                } else {
                    child_index += 1;
                    production.field_for_child(child_index - 1)
                };
                GreenChild { field, node }
            })
            .collect();

        let below = version.top_state();
        let next = self.language.goto(below, production.lhs)?;
        let info = NodeInfo {
            parse_state: below,
            follow,
            production: Some(production_id),
            dynamic_precedence: production.dynamic_precedence.into(),
            fragile,
        };
        tracing::trace!(?below, ?next, lhs = self.language.symbol_name(production.lhs), "reduce");
        version.push(next, GreenNode::node(production.lhs, children, info));
        for extra in trailing.into_iter().rev() {
            version.push(next, extra.node);
        }
        Some(version)
    }

    /// Builds the root from an accepted version. Extras before and after the
    /// start node become its children.
    fn finish(&self, version: Version) -> GreenNode {
        let entries = version.entries;
        let Some(index) = entries.iter().rposition(|entry| !entry.node.is_extra()) else {
            return self.error_root(Version { entries, ..Version::default() });
        };
        let start = &entries[index].node;
        if entries.len() == 1 {
            return start.clone();
        }

        let extra = |node: &GreenNode| GreenChild { field: None, node: node.clone() };
        let mut children: Vec<GreenChild> = entries[..index].iter().map(|entry| extra(&entry.node)).collect();
        children.extend(start.children().iter().cloned());
        children.extend(entries[index + 1..].iter().map(|entry| extra(&entry.node)));

        let head = start.head();
        let info = NodeInfo {
            parse_state: head.parse_state,
            follow: Symbol::END,
            production: head.production,
            dynamic_precedence: head
                .production
                .map_or(0, |production| self.language.production(production).dynamic_precedence.into()),
            fragile: start.is_fragile(),
        };
        GreenNode::node(start.symbol(), children, info)
    }

    fn next_token(&mut self) -> Lookahead {
        let state = self.versions.first().map_or(StateId::START, Version::top_state);
        let mode = self.language.lex_mode(state);

        if let Some(node) = self.reusable_leaf(mode) {
            let end = self.position + node.total_len();
            self.stats.reused_bytes += usize::from(node.total_len().bytes);
            return Lookahead { symbol: node.symbol(), node, end };
        }

        self.lexer.seek(LexState { position: self.position, mode });
        let token = self.lexer.next_token();
        let end = self.lexer.state().position;
        if token.is_end() {
            self.text_len = end;
        }

        let mut head = GreenHead::token(token.symbol, token.padding, token.size);
        head.lookahead_bytes = token.lookahead;
        head.lex_mode = token.mode;
        head.parse_state = state;
        if token.extra {
            head.flags = GreenFlags::EXTRA;
        }
        Lookahead { node: GreenNode::leaf(head), symbol: token.symbol, end }
    }

    fn reusable_leaf(&mut self, mode: u16) -> Option<GreenNode> {
        let reuse = self.reuse.as_mut()?;
        let node = reuse.leaf_at(self.position.bytes)?;
        let reusable = node.is_leaf()
            && !node.has_changes()
            && !node.has_error()
            && node.head().lex_mode == mode
            && !node.size().is_empty();
        if !reusable {
            return None;
        }
        reuse.advance();
        tracing::trace!(symbol = ?node.symbol(), "reused token");
        Some(node)
    }

    /// Pushes a whole subtree from the old tree if it parses the same way
    /// here. Only done while a single version is live.
    fn reuse_subtree(&mut self) -> bool {
        if self.versions.len() != 1 || !self.versions[0].skipped.is_empty() {
            return false;
        }
        loop {
            let Some(reuse) = self.reuse.as_mut() else { return false };
            let Some(node) = reuse.seek(self.position.bytes) else { return false };
            if node.is_leaf() {
                return false;
            }
            let candidate = node.has_changes()
                || node.has_error()
                || node.is_fragile()
                || node.is_extra()
                || node.size().is_empty();
            let pushed = if candidate { None } else { self.try_push_subtree(&node) };

            let Some(reuse) = self.reuse.as_mut() else { return false };
            match pushed {
                Some(version) => {
                    reuse.advance();
                    self.stats.reused_subtrees += 1;
                    self.stats.reused_bytes += usize::from(node.total_len().bytes);
                    self.position += node.total_len();
                    self.versions = vec![version];
                    tracing::trace!(symbol = self.language.symbol_name(node.symbol()), "reused subtree");
                    return true;
                }
                None => {
                    if !reuse.descend() {
                        return false;
                    }
                }
            }
        }
    }

    fn try_push_subtree(&mut self, node: &GreenNode) -> Option<Version> {
        let symbol = node.first_leaf_symbol()?;
        let mut version = self.versions.first()?.clone();
        let mut budget = version.entries.len() + self.language.data().productions.len() + 1;

        loop {
            match self.language.actions(version.top_state(), symbol) {
                [ParseAction::Reduce(production)] if budget > 0 => {
                    budget -= 1;
                    version = self.reduce(version, *production, symbol, false)?;
                }
                [ParseAction::Shift(_)] => break,
                _ => return None,
            }
        }

        let state = version.top_state();
        if node.head().parse_state != state {
            return None;
        }
        let next = self.language.goto(state, node.symbol())?;
        let end = self.position + node.total_len();
        if self.peek_symbol(end, self.language.lex_mode(next)) != node.head().follow {
            return None;
        }
        version.push(next, node.clone());
        Some(version)
    }

    /// First non-extra symbol the lexer produces at `position`.
    fn peek_symbol(&mut self, position: TextLen, mode: u16) -> Symbol {
        self.lexer.seek(LexState { position, mode });
        loop {
            let token = self.lexer.next_token();
            if !token.extra {
                return token.symbol;
            }
        }
    }

    /// Wraps everything above `depth` plus the skipped tokens into an ERROR
    /// node and pushes it as an extra.
    pub(crate) fn wrap_error(&self, version: &mut Version, depth: usize, follow: Symbol) {
        let mut children = Vec::new();
        let popped: Vec<_> = version.entries.drain(depth..).map(|entry| entry.node).collect();
        for node in popped.into_iter().chain(version.skipped.drain(..)) {
            push_error_child(&mut children, node);
        }
        if children.is_empty() {
            return;
        }
        let state = version.top_state();
        let node = match children.as_slice() {
            // An unknown character on its own is already an ERROR token.
            [child] if child.node.is_leaf() && child.node.symbol() == Symbol::ERROR => child.node.clone(),
            _ => error_node(children, state, follow),
        };
        version.push(state, node.with_flags(node.flags().union(GreenFlags::EXTRA)));
    }

    /// Root for a text nothing could be accepted from.
    pub(crate) fn error_root(&self, version: Version) -> GreenNode {
        let mut children = Vec::new();
        for node in version.entries.into_iter().map(|entry| entry.node).chain(version.skipped) {
            push_error_child(&mut children, node);
        }
        tracing::debug!(children = children.len(), "wrapping input in an ERROR root");
        error_node(children, StateId::START, Symbol::END)
    }
}

fn push_error_child(children: &mut Vec<GreenChild>, node: GreenNode) {
    if node.symbol() == Symbol::ERROR && node.is_extra() && !node.is_leaf() {
        children.extend(node.children().iter().cloned());
    } else {
        children.push(GreenChild { field: None, node });
    }
}

fn error_node(children: Vec<GreenChild>, state: StateId, follow: Symbol) -> GreenNode {
    let info = NodeInfo {
        parse_state: state,
        follow,
        production: None,
        dynamic_precedence: 0,
        fragile: false,
    };
    GreenNode::node(Symbol::ERROR, children, info)
}

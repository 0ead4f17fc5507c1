//! Error recovery.
//!
//! Runs when no version can take the lookahead. Recovery works on the best
//! failed version only and tries, in order: inserting one missing token,
//! popping the stack back to a state that accepts the lookahead, and skipping
//! the lookahead. Each step strictly shrinks what is left to try at the
//! current position, so recovery always terminates.

use arbor_grammar::Symbol;
use arbor_inputs::TextSource;
use arbor_tree::GreenNode;
use text_size::TextSize;

use crate::driver::{Driver, Lookahead, Step};
use crate::stack::Version;

pub(crate) enum Recovery {
    /// The stack was repaired; feed the same lookahead again.
    Retry,
    /// A missing token was inserted and the lookahead consumed after it.
    Settled(Step),
    /// The lookahead was skipped.
    Skipped,
    /// Nothing accepts the end of the input.
    Done(GreenNode),
}

impl<S: TextSource + ?Sized> Driver<'_, S> {
    pub(crate) fn recover(&mut self, mut version: Version, lookahead: &Lookahead) -> Recovery {
        let position = self.position.bytes;

        if version.skipped.is_empty() && version.missing_at != Some(position) {
            version.missing_at = Some(position);
            if let Some(step) = self.insert_missing(&version, lookahead) {
                self.stats.recoveries += 1;
                return Recovery::Settled(step);
            }
        }

        if let Some(depth) = self.resync_depth(&version, lookahead.symbol, position) {
            self.stats.recoveries += 1;
            tracing::debug!(
                position = u32::from(position),
                popped = version.entries.len() - depth,
                skipped = version.skipped.len(),
                "recovering by wrapping an ERROR node"
            );
            self.wrap_error(&mut version, depth, lookahead.symbol);
            version.resync_floor = Some((position, depth));
            self.versions = vec![version];
            return Recovery::Retry;
        }

        if lookahead.symbol == Symbol::END {
            self.stats.recoveries += 1;
            return Recovery::Done(self.error_root(version));
        }

        if version.skipped.is_empty() {
            self.stats.recoveries += 1;
        }
        tracing::debug!(position = u32::from(position), symbol = ?lookahead.symbol, "skipping token");
        version.skipped.push(lookahead.node.clone());
        if version.skipped.len() >= self.options.max_recovery_skip.max(1) {
            let depth = version.entries.len();
            self.wrap_error(&mut version, depth, Symbol::ERROR);
        }
        self.versions = vec![version];
        self.position = lookahead.end;
        Recovery::Skipped
    }

    /// Tries every terminal as a zero-width token in front of the lookahead.
    /// Succeeds only if exactly one of them lets the lookahead through.
    fn insert_missing(&mut self, version: &Version, lookahead: &Lookahead) -> Option<Step> {
        let state = version.top_state();
        let mode = self.language.lex_mode(state);
        let stats = self.stats;

        let mut found: Option<(Symbol, Step)> = None;
        let mut ambiguous = false;
        for index in 1..self.language.terminal_count() {
            let symbol = Symbol(index as u16);
            if self.language.is_extra(symbol) || !self.language.has_actions(state, symbol) {
                continue;
            }
            let missing =
                Lookahead { node: GreenNode::missing(symbol, state, mode), symbol, end: self.position };
            let inserted = self.step(version.clone(), &missing, false);

            let mut outcome = Step::default();
            for candidate in inserted.shifted {
                let after = self.step(candidate, lookahead, false);
                outcome.shifted.extend(after.shifted);
                outcome.accepted.extend(after.accepted);
            }
            if outcome.is_empty() {
                continue;
            }
            if found.is_some() {
                ambiguous = true;
                break;
            }
            found = Some((symbol, outcome));
        }

        self.stats = stats;
        if ambiguous {
            return None;
        }
        let (symbol, step) = found?;
        tracing::debug!(symbol = self.language.symbol_name(symbol), "inserted missing token");
        Some(step)
    }

    /// Largest stack depth below the current one whose state has an action
    /// for `symbol`. Repeated recoveries at one position pop strictly more.
    fn resync_depth(&self, version: &Version, symbol: Symbol, position: TextSize) -> Option<usize> {
        let limit = match version.resync_floor {
            Some((at, depth)) if at == position => depth,
            _ => version.entries.len(),
        };
        (0..limit.min(version.entries.len()))
            .rev()
            .find(|&depth| self.language.has_actions(version.state_at(depth), symbol))
    }
}

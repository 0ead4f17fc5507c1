//! Parse stack versions.
//!
//! Every version is a plain stack of `(state, subtree)` entries. Forking
//! clones the stack; two versions that end up with the same sequence of
//! states are interchangeable from then on, so only the better one is kept.

use std::cmp::Ordering;

use arbor_grammar::{AmbiguityPolicy, StateId};
use arbor_tree::GreenNode;
use text_size::TextSize;

#[derive(Clone)]
pub(crate) struct Entry {
    /// State after pushing `node`. Extras keep the state below them.
    pub(crate) state: StateId,
    pub(crate) node: GreenNode,
}

#[derive(Clone, Default)]
pub(crate) struct Version {
    pub(crate) entries: Vec<Entry>,
    /// Index of the action taken at every fork this version went through.
    pub(crate) fork_path: Vec<u8>,
    /// Tokens skipped during recovery, not yet committed to an ERROR node.
    pub(crate) skipped: Vec<GreenNode>,
    /// Position where missing-token insertion was last attempted.
    pub(crate) missing_at: Option<TextSize>,
    /// Recovery at this position must resume strictly below this depth.
    pub(crate) resync_floor: Option<(TextSize, usize)>,
}

impl Version {
    pub(crate) fn top_state(&self) -> StateId {
        self.state_at(self.entries.len())
    }

    /// State with the top `entries.len() - depth` entries popped.
    pub(crate) fn state_at(&self, depth: usize) -> StateId {
        match depth.checked_sub(1) {
            Some(index) => self.entries[index].state,
            None => StateId::START,
        }
    }

    pub(crate) fn push(&mut self, state: StateId, node: GreenNode) {
        self.entries.push(Entry { state, node });
    }

    pub(crate) fn error_cost(&self) -> u32 {
        let stacked: u32 = self.entries.iter().map(|entry| entry.node.head().error_cost).sum();
        stacked + self.skipped.len() as u32
    }

    pub(crate) fn dynamic_precedence(&self) -> i32 {
        self.entries.iter().map(|entry| entry.node.head().dynamic_precedence).sum()
    }

    /// Whether `other` will behave exactly like this version from now on.
    pub(crate) fn same_configuration(&self, other: &Self) -> bool {
        self.skipped.is_empty()
            && other.skipped.is_empty()
            && self.entries.len() == other.entries.len()
            && self.entries.iter().zip(&other.entries).all(|(a, b)| a.state == b.state)
    }
}

/// Orders versions best-first: fewer errors, then by `policy`, then by the
/// actions taken at forks.
pub(crate) fn compare(a: &Version, b: &Version, policy: AmbiguityPolicy) -> Ordering {
    a.error_cost()
        .cmp(&b.error_cost())
        .then_with(|| match policy {
            AmbiguityPolicy::DynamicPrecedence => {
                b.dynamic_precedence().cmp(&a.dynamic_precedence())
            }
            AmbiguityPolicy::FirstAction => Ordering::Equal,
        })
        .then_with(|| a.fork_path.cmp(&b.fork_path))
}

/// Sorts `versions` best-first, merges identical configurations and keeps at
/// most `max` of them. Returns how many versions were merged away.
pub(crate) fn condense(versions: &mut Vec<Version>, policy: AmbiguityPolicy, max: usize) -> usize {
    versions.sort_by(|a, b| compare(a, b, policy));

    let mut kept: Vec<Version> = Vec::with_capacity(versions.len());
    let mut merged = 0;
    for version in versions.drain(..) {
        if kept.iter().any(|better| better.same_configuration(&version)) {
            merged += 1;
            continue;
        }
        kept.push(version);
    }
    if kept.len() > max.max(1) {
        tracing::trace!(dropped = kept.len() - max.max(1), "version cap reached");
        kept.truncate(max.max(1));
    }
    *versions = kept;
    merged
}

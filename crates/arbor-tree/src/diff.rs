use text_size::{TextRange, TextSize};

use crate::green::GreenNode;
use crate::syntax::SyntaxTree;

impl SyntaxTree {
    /// Returns the ranges of `new` whose syntactic structure differs from
    /// this tree, sorted and merged. Subtrees shared between the two trees
    /// are skipped without being visited.
    pub fn changed_ranges(&self, new: &Self) -> Vec<TextRange> {
        let mut ranges = Vec::new();
        diff(self.root_green(), new.root_green(), TextSize::new(0), &mut ranges);

        ranges.sort_by_key(|range| (range.start(), range.end()));
        let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start() <= last.end() => *last = last.cover(range),
                _ => merged.push(range),
            }
        }
        merged
    }
}

/// `new_padding_start` is where `new`'s padding begins in the new text.
/// Returns `true` when the change spans no bytes, so that the caller reports
/// its own range instead.
fn diff(old: &GreenNode, new: &GreenNode, new_padding_start: TextSize, out: &mut Vec<TextRange>) -> bool {
    if old.ptr_eq(new) {
        return false;
    }
    let start = new_padding_start + new.padding().bytes;
    let range = TextRange::at(start, new.size().bytes);
    let report = |out: &mut Vec<TextRange>| {
        if range.is_empty() {
            return true;
        }
        out.push(range);
        false
    };

    let same_shape = old.symbol() == new.symbol()
        && old.children().len() == new.children().len()
        && old.is_missing() == new.is_missing()
        && old.is_extra() == new.is_extra();
    if !same_shape {
        return report(out);
    }
    if new.children().is_empty() {
        return old.size().bytes != new.size().bytes && report(out);
    }

    let mut position = new_padding_start;
    let mut unreported = false;
    for (old_child, new_child) in old.children().iter().zip(new.children()) {
        unreported |= if old_child.field == new_child.field {
            diff(&old_child.node, &new_child.node, position, out)
        } else {
            true
        };
        position += new_child.node.total_len().bytes;
    }
    unreported && report(out)
}

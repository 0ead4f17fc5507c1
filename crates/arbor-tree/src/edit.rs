//! Applying text edits to a tree before reparsing it.

use arbor_inputs::{Point, TextLen};
use text_size::{TextRange, TextSize};

use crate::green::{GreenChild, GreenNode};
use crate::syntax::SyntaxTree;

/// One replaced byte range.
///
/// All edits passed to [`SyntaxTree::edit`] together are expressed in the
/// coordinates of the text before any of them was applied; `new_end_*` is
/// where the edit ends once it alone has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEdit {
    pub start_byte: TextSize,
    pub old_end_byte: TextSize,
    pub new_end_byte: TextSize,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

impl InputEdit {
    /// Describes replacing `range` of `old_text` with `new_text`.
    pub fn replace(old_text: &[u8], range: TextRange, new_text: &[u8]) -> Self {
        let (start_byte, end_byte) = (usize::from(range.start()), usize::from(range.end()));
        let start = TextLen::of(&old_text[..start_byte]);
        let old_end = start + TextLen::of(&old_text[start_byte..end_byte]);
        let new_end = start + TextLen::of(new_text);
        Self::between(start, old_end, new_end)
    }

    fn between(start: TextLen, old_end: TextLen, new_end: TextLen) -> Self {
        Self {
            start_byte: start.bytes,
            old_end_byte: old_end.bytes,
            new_end_byte: new_end.bytes,
            start_point: start.extent,
            old_end_point: old_end.extent,
            new_end_point: new_end.extent,
        }
    }

    #[inline]
    fn start(&self) -> TextLen {
        TextLen::new(self.start_byte, self.start_point)
    }

    #[inline]
    fn old_end(&self) -> TextLen {
        TextLen::new(self.old_end_byte, self.old_end_point)
    }

    #[inline]
    fn new_end(&self) -> TextLen {
        TextLen::new(self.new_end_byte, self.new_end_point)
    }

    /// Where `position` ends up once this edit is applied. Positions inside
    /// the replaced range collapse onto its new end.
    fn map(&self, position: TextLen) -> TextLen {
        if position.bytes <= self.start_byte {
            position
        } else if position.bytes >= self.old_end_byte {
            self.new_end() + (position - self.old_end())
        } else {
            self.new_end()
        }
    }

    /// Whether a node spanning `padding_start..end` and reading `lookahead`
    /// bytes past its end may lex differently after this edit.
    fn touches(&self, padding_start: TextSize, end: TextSize, lookahead: u32) -> bool {
        self.start_byte <= end + TextSize::new(lookahead) && self.old_end_byte >= padding_start
    }
}

/// Reasons a set of edits cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("invalid edit set: {reason}")]
    InvalidEditSet { reason: String },
}

/// A tree whose subtrees have been moved to match the edited text, ready to
/// be reparsed.
#[derive(Clone)]
pub struct EditedTree {
    tree: SyntaxTree,
    root: GreenNode,
    edits: Vec<InputEdit>,
    text_len: TextLen,
}

impl EditedTree {
    /// The tree the edits were applied to.
    #[inline]
    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// The edited root. Subtrees the edits touched carry `HAS_CHANGES`.
    #[inline]
    pub fn root(&self) -> &GreenNode {
        &self.root
    }

    /// The edits, sorted and rewritten so each one is relative to the text
    /// produced by the ones before it.
    #[inline]
    pub fn edits(&self) -> &[InputEdit] {
        &self.edits
    }

    /// Length of the edited text.
    #[inline]
    pub fn text_len(&self) -> TextLen {
        self.text_len
    }

    /// The smallest range of the edited text covering every edit.
    pub fn damaged_range(&self) -> TextRange {
        match (self.edits.first(), self.edits.last()) {
            (Some(first), Some(last)) => TextRange::new(first.start_byte, last.new_end_byte),
            _ => TextRange::empty(TextSize::new(0)),
        }
    }
}

impl std::fmt::Debug for EditedTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditedTree")
            .field("edits", &self.edits)
            .field("damaged_range", &self.damaged_range())
            .finish_non_exhaustive()
    }
}

impl SyntaxTree {
    /// Applies `edits` to a copy of this tree. Subtrees no edit touches are
    /// shared with this tree unchanged.
    pub fn edit(&self, edits: &[InputEdit]) -> Result<EditedTree, EditError> {
        let edits = normalize(edits, self.text_len())?;
        let text_len = edits.iter().fold(self.text_len(), |len, edit| edit.map(len));

        let mut root = self.root_green().clone();
        for edit in &edits {
            root = apply(&root, TextLen::ZERO, edit);
        }
        tracing::debug!(edits = edits.len(), text_len = u32::from(text_len.bytes), "edited tree");
        Ok(EditedTree { tree: self.clone(), root, edits, text_len })
    }
}

/// Sorts `edits`, rejects overlaps and rewrites each edit into the
/// coordinates left behind by the ones before it.
fn normalize(edits: &[InputEdit], text_len: TextLen) -> Result<Vec<InputEdit>, EditError> {
    let mut sorted = edits.to_vec();
    sorted.sort_by_key(|edit| (edit.start_byte, edit.old_end_byte));

    for edit in &sorted {
        if edit.start_byte > edit.old_end_byte || edit.start_byte > edit.new_end_byte {
            return Err(EditError::InvalidEditSet {
                reason: format!("edit at byte {:?} ends before it starts", edit.start_byte),
            });
        }
        if edit.old_end_byte > text_len.bytes {
            return Err(EditError::InvalidEditSet {
                reason: format!(
                    "edit ending at byte {:?} is past the end of the text ({:?})",
                    edit.old_end_byte, text_len.bytes
                ),
            });
        }
    }
    for pair in sorted.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        let overlapping = after.start_byte < before.old_end_byte
            || (after.start_byte == before.start_byte && before.start_byte != before.old_end_byte);
        if overlapping {
            return Err(EditError::InvalidEditSet {
                reason: format!(
                    "edits at {:?}..{:?} and {:?}..{:?} overlap",
                    before.start_byte, before.old_end_byte, after.start_byte, after.old_end_byte
                ),
            });
        }
    }

    let mut applied: Vec<InputEdit> = Vec::with_capacity(sorted.len());
    for edit in sorted {
        let start = applied.iter().fold(edit.start(), |position, prior| prior.map(position));
        let old_end = applied.iter().fold(edit.old_end(), |position, prior| prior.map(position));
        let new_end = start + (edit.new_end() - edit.start());
        applied.push(InputEdit::between(start, old_end, new_end));
    }
    Ok(applied)
}

/// Rebuilds the parts of `node` that `edit` touches. `padding_start` is where
/// the node's padding begins in the text before `edit`.
fn apply(node: &GreenNode, padding_start: TextLen, edit: &InputEdit) -> GreenNode {
    let start = padding_start + node.padding();
    let end = start + node.size();
    if !edit.touches(padding_start.bytes, end.bytes, node.head().lookahead_bytes) {
        return node.clone();
    }

    if node.children().is_empty() {
        let new_padding_start = edit.map(padding_start);
        let new_start = edit.map(start);
        let new_end = edit.map(end);
        return node.edited_leaf(new_start - new_padding_start, new_end - new_start);
    }

    let mut position = padding_start;
    let children = node
        .children()
        .iter()
        .map(|child| {
            let edited = apply(&child.node, position, edit);
            position += child.node.total_len();
            GreenChild { field: child.field, node: edited }
        })
        .collect();
    node.edited_node(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(start: u32, old_end: u32, new_end: u32) -> InputEdit {
        InputEdit {
            start_byte: start.into(),
            old_end_byte: old_end.into(),
            new_end_byte: new_end.into(),
            start_point: Point::new(0, start),
            old_end_point: Point::new(0, old_end),
            new_end_point: Point::new(0, new_end),
        }
    }

    #[test]
    fn replace_measures_points() {
        let edit = InputEdit::replace(b"ab\ncd", TextRange::new(4.into(), 5.into()), b"x\nyz");
        assert_eq!(edit.start_point, Point::new(1, 1));
        assert_eq!(edit.old_end_point, Point::new(1, 2));
        assert_eq!(edit.new_end_byte, 8.into());
        assert_eq!(edit.new_end_point, Point::new(2, 2));
    }

    #[test]
    fn later_edits_shift_by_earlier_deltas() {
        let len = TextLen::of(&[b'x'; 20]);
        let edits = normalize(&[edit(10, 12, 15), edit(2, 4, 2)], len).unwrap();

        assert_eq!(edits[0], edit(2, 4, 2));
        assert_eq!(edits[1], edit(8, 10, 13));
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let len = TextLen::of(&[b'x'; 20]);
        assert!(matches!(
            normalize(&[edit(2, 6, 6), edit(4, 8, 8)], len),
            Err(EditError::InvalidEditSet { .. })
        ));
        assert!(normalize(&[edit(2, 6, 6), edit(6, 8, 8)], len).is_ok());
        assert!(normalize(&[edit(2, 2, 4), edit(2, 2, 3)], len).is_ok());
        assert!(normalize(&[edit(18, 22, 22)], len).is_err());
    }

    #[test]
    fn positions_inside_a_replacement_collapse() {
        let edit = edit(4, 8, 6);
        assert_eq!(edit.map(TextLen::of(b"abc")).bytes, 3.into());
        assert_eq!(edit.map(TextLen::of(b"abcdef")).bytes, 6.into());
        assert_eq!(edit.map(TextLen::of(b"abcdefghij")).bytes, 8.into());
    }
}

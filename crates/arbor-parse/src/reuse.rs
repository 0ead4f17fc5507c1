use arbor_inputs::TextLen;
use arbor_tree::GreenNode;
use text_size::TextSize;

struct Frame {
    node: GreenNode,
    /// Index of `node` among its parent's children.
    index: usize,
    /// Where `node`'s padding begins in the edited text.
    offset: TextLen,
}

/// Walks the subtrees of an edited tree in text order, offering them to the
/// parser for reuse.
pub(crate) struct ReuseCursor {
    stack: Vec<Frame>,
}

impl ReuseCursor {
    pub(crate) fn new(root: GreenNode) -> Self {
        Self { stack: vec![Frame { node: root, index: 0, offset: TextLen::ZERO }] }
    }

    /// The subtree under the cursor and where its padding begins.
    pub(crate) fn current(&self) -> Option<(&GreenNode, TextLen)> {
        self.stack.last().map(|frame| (&frame.node, frame.offset))
    }

    /// Moves to the first child of the current subtree.
    pub(crate) fn descend(&mut self) -> bool {
        let Some(frame) = self.stack.last() else { return false };
        let Some(child) = frame.node.child(0) else { return false };
        let next = Frame { node: child.node.clone(), index: 0, offset: frame.offset };
        self.stack.push(next);
        true
    }

    /// Moves past the current subtree to whatever follows it.
    pub(crate) fn advance(&mut self) {
        let Some(mut frame) = self.stack.pop() else { return };
        loop {
            let end = frame.offset + frame.node.total_len();
            let Some(parent) = self.stack.last() else { return };
            if let Some(sibling) = parent.node.child(frame.index + 1) {
                let next = Frame { node: sibling.node.clone(), index: frame.index + 1, offset: end };
                self.stack.push(next);
                return;
            }
            match self.stack.pop() {
                Some(parent) => frame = parent,
                None => return,
            }
        }
    }

    /// Positions the cursor on the outermost non-empty subtree whose padding
    /// begins exactly at `position`, skipping everything that ends before it.
    pub(crate) fn seek(&mut self, position: TextSize) -> Option<GreenNode> {
        loop {
            let (node, offset) = self.current()?;
            let end = offset.bytes + node.total_len().bytes;
            if offset.bytes > position {
                return None;
            }
            if offset.bytes < position || end == offset.bytes {
                if end <= position || !self.descend() {
                    self.advance();
                }
                continue;
            }
            return Some(node.clone());
        }
    }

    /// Like [`Self::seek`], then descends to the first token.
    pub(crate) fn leaf_at(&mut self, position: TextSize) -> Option<GreenNode> {
        loop {
            let node = self.seek(position)?;
            if node.is_leaf() || !self.descend() {
                return Some(node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use arbor_grammar::{ProductionId, StateId, Symbol};
    use arbor_tree::{GreenChild, GreenHead, NodeInfo};

    use super::*;

    fn token(symbol: u16, padding: &str, text: &str) -> GreenChild {
        let head = GreenHead::token(Symbol(symbol), TextLen::of(padding.as_bytes()), TextLen::of(text.as_bytes()));
        GreenChild { field: None, node: GreenNode::leaf(head) }
    }

    fn node(symbol: u16, children: Vec<GreenChild>) -> GreenChild {
        let info = NodeInfo {
            parse_state: StateId::START,
            follow: Symbol::END,
            production: Some(ProductionId(0)),
            dynamic_precedence: 0,
            fragile: false,
        };
        GreenChild { field: None, node: GreenNode::node(Symbol(symbol), children, info) }
    }

    // (1 "ab" " c") (2 "" empty) (3 " d")
    fn sample() -> GreenNode {
        let first = node(10, vec![token(1, "", "ab"), token(2, " ", "c")]);
        let empty = node(11, Vec::new());
        let last = node(12, vec![token(3, " ", "d")]);
        node(20, vec![first, empty, last]).node
    }

    #[test]
    fn seek_finds_outermost_subtree() {
        let mut cursor = ReuseCursor::new(sample());

        assert_eq!(cursor.seek(0.into()).map(|node| node.symbol()), Some(Symbol(20)));
        assert!(cursor.descend());
        assert_eq!(cursor.seek(0.into()).map(|node| node.symbol()), Some(Symbol(10)));
        assert_eq!(cursor.seek(2.into()).map(|node| node.symbol()), Some(Symbol(2)));
        assert_eq!(cursor.seek(4.into()).map(|node| node.symbol()), Some(Symbol(12)));
        assert_eq!(cursor.seek(6.into()), None);
        assert!(cursor.current().is_none());
    }

    #[test]
    fn seek_between_tokens_waits() {
        let mut cursor = ReuseCursor::new(sample());

        assert_eq!(cursor.seek(1.into()), None);
        assert_eq!(cursor.current().map(|(node, offset)| (node.symbol(), offset.bytes)), Some((Symbol(2), 2.into())));
        assert_eq!(cursor.leaf_at(4.into()).map(|node| node.symbol()), Some(Symbol(3)));
    }
}

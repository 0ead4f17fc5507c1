use text_size::TextSize;

use crate::syntax::{Children, SyntaxNode};

/// Stateful walker over a subtree.
///
/// The cursor never moves above the node it was created at.
#[derive(Clone)]
pub struct TreeCursor<'a> {
    root: SyntaxNode<'a>,
    stack: Vec<SyntaxNode<'a>>,
}

impl<'a> TreeCursor<'a> {
    #[inline]
    pub(crate) fn new(root: SyntaxNode<'a>) -> Self {
        Self { root, stack: vec![root] }
    }

    /// Returns the node under the cursor.
    #[inline]
    pub fn node(&self) -> SyntaxNode<'a> {
        self.stack.last().copied().unwrap_or(self.root)
    }

    /// Returns how many levels below its starting node the cursor is.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Returns the field name of the current node, if it fills one.
    #[inline]
    pub fn field_name(&self) -> Option<&'a str> {
        if self.depth() == 0 {
            return None;
        }
        self.node().field_name()
    }

    /// Moves back to the starting node.
    pub fn reset(&mut self) {
        self.stack.truncate(1);
    }

    pub fn goto_first_child(&mut self) -> bool {
        match self.node().child(0) {
            Some(child) => {
                self.stack.push(child);
                true
            }
            None => false,
        }
    }

    pub fn goto_parent(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        self.stack.pop();
        true
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        self.replace_current(SyntaxNode::next_sibling)
    }

    pub fn goto_prev_sibling(&mut self) -> bool {
        self.replace_current(SyntaxNode::prev_sibling)
    }

    /// Moves to the first child that ends after `byte`, returning its index.
    pub fn goto_first_child_for_byte(&mut self, byte: TextSize) -> Option<usize> {
        let child = self.node().children().find(|child| child.end_byte() > byte)?;
        self.stack.push(child);
        Some(child.index())
    }

    fn replace_current(&mut self, step: impl FnOnce(SyntaxNode<'a>) -> Option<SyntaxNode<'a>>) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        match step(self.node()) {
            Some(sibling) => {
                if let Some(last) = self.stack.last_mut() {
                    *last = sibling;
                }
                true
            }
            None => false,
        }
    }
}

/// Preorder traversal over nodes.
#[derive(Clone)]
pub struct Preorder<'a> {
    stack: Vec<(SyntaxNode<'a>, Children<'a>)>,
    root: Option<SyntaxNode<'a>>,
}

impl<'a> Preorder<'a> {
    #[inline]
    pub(crate) fn new(start: SyntaxNode<'a>) -> Self {
        Self { stack: Vec::with_capacity(64), root: Some(start) }
    }

    /// Skips the current subtree during traversal.
    #[inline]
    pub fn skip_subtree(&mut self) {
        self.stack.pop();
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = WalkEvent<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let Some((_, active_node)) = self.stack.last_mut() else {
            let root = self.root.take()?;
            self.stack.push((root, root.children()));
            return Some(WalkEvent::Enter(root));
        };
        match active_node.next() {
            Some(child) => {
                self.stack.push((child, child.children()));
                Some(WalkEvent::Enter(child))
            }
            None => {
                let (exited_node, _) = self.stack.pop()?;
                Some(WalkEvent::Leave(exited_node))
            }
        }
    }
}

/// Preorder walk event.
#[derive(Debug, Clone, Copy)]
pub enum WalkEvent<'a> {
    Enter(SyntaxNode<'a>),
    Leave(SyntaxNode<'a>),
}

//! Immutable syntax trees with structurally shared subtrees.
//!
//! A parse produces a tree of position-independent green subtrees. The
//! [`SyntaxTree`] lays the visible ones out in an arena so they can be
//! navigated through cheap, lifetime-bound [`SyntaxNode`] handles. Editing a
//! tree rebuilds only the subtrees an edit touches; everything else is shared
//! with the previous revision.

mod cursor;
mod diff;
mod edit;
mod green;
mod syntax;

/// Traversal over a subtree.
pub use cursor::{Preorder, TreeCursor, WalkEvent};
/// Edits and the trees they produce.
pub use edit::{EditError, EditedTree, InputEdit};
/// Shared subtree storage, as built by the parser.
pub use green::{GreenChild, GreenFlags, GreenHead, GreenNode, NodeInfo};
/// Positioned tree API.
pub use syntax::{Children, SyntaxNode, SyntaxTree};

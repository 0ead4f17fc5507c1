//! Public syntax tree API built on an arena of parent-linked nodes.

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::str::Utf8Error;

use arbor_grammar::{FieldId, Language, Symbol};
use arbor_inputs::{Point, TextLen, TextSource};
use la_arena::{Arena, Idx, IdxRange, RawIdx};
use text_size::{TextRange, TextSize};
use triomphe::Arc;

use crate::cursor::{Preorder, TreeCursor};
use crate::green::GreenNode;

pub(crate) type NodeId = Idx<NodeData>;

/// One visible node, positioned in the text.
pub(crate) struct NodeData {
    pub(crate) green: GreenNode,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: IdxRange<NodeData>,
    pub(crate) index: u32,
    /// Start of the node's first token, after its padding.
    pub(crate) start: TextLen,
    pub(crate) field: Option<FieldId>,
}

pub(crate) struct TreeInner {
    pub(crate) language: Language,
    pub(crate) root: GreenNode,
    pub(crate) nodes: Arena<NodeData>,
    pub(crate) text_len: TextLen,
    pub(crate) revision: u32,
}

/// Immutable syntax tree for one revision of a text.
///
/// Cloning is cheap; clones share the same nodes.
#[derive(Clone)]
pub struct SyntaxTree {
    pub(crate) inner: Arc<TreeInner>,
}

impl SyntaxTree {
    /// Lays out the visible nodes of `root`. Hidden nodes are flattened into
    /// their parent and pass their field on to the children they contribute.
    pub fn new(language: Language, root: GreenNode, text_len: TextLen, revision: u32) -> Self {
        let mut nodes = Arena::new();
        let root_start = root.padding();
        let root_id = nodes.alloc(NodeData {
            green: root.clone(),
            parent: None,
            children: empty_range(0),
            index: 0,
            start: root_start,
            field: None,
        });

        let mut queue = VecDeque::from([(root_id, TextLen::ZERO)]);
        let mut visible = Vec::new();
        while let Some((id, padding_start)) = queue.pop_front() {
            visible.clear();
            collect_visible(&language, &nodes[id].green, padding_start, None, &mut visible);

            let first = nodes.len();
            for (index, (green, child_padding_start, field)) in visible.drain(..).enumerate() {
                let start = child_padding_start + green.padding();
                let child = nodes.alloc(NodeData {
                    green,
                    parent: Some(id),
                    children: empty_range(0),
                    index: index as u32,
                    start,
                    field,
                });
                queue.push_back((child, child_padding_start));
            }
            nodes[id].children = IdxRange::new(raw(first)..raw(nodes.len()));
        }

        Self { inner: Arc::new(TreeInner { language, root, nodes, text_len, revision }) }
    }

    /// Returns the root node.
    #[inline]
    pub fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode { tree: &self.inner, id: raw(0) }
    }

    #[inline]
    pub fn language(&self) -> &Language {
        &self.inner.language
    }

    /// Number of reparses between the first parse and this tree.
    #[inline]
    pub fn revision(&self) -> u32 {
        self.inner.revision
    }

    /// Length of the text the tree was parsed from.
    #[inline]
    pub fn text_len(&self) -> TextLen {
        self.inner.text_len
    }

    /// The root subtree, shared with later revisions.
    #[inline]
    pub fn root_green(&self) -> &GreenNode {
        &self.inner.root
    }

    /// Number of visible nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.inner.nodes.len()
    }

    /// Returns a cursor positioned at the root.
    #[inline]
    pub fn walk(&self) -> TreeCursor<'_> {
        TreeCursor::new(self.root())
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("revision", &self.revision())
            .field("text_len", &self.text_len().bytes)
            .finish_non_exhaustive()
    }
}

fn collect_visible(
    language: &Language,
    green: &GreenNode,
    padding_start: TextLen,
    inherited: Option<FieldId>,
    out: &mut Vec<(GreenNode, TextLen, Option<FieldId>)>,
) {
    let mut position = padding_start;
    for child in green.children() {
        let field = child.field.or(inherited);
        let node = &child.node;
        if node.symbol() == Symbol::ERROR || language.is_visible(node.symbol()) {
            out.push((node.clone(), position, field));
        } else if !node.is_leaf() {
            collect_visible(language, node, position, field, out);
        }
        position += node.total_len();
    }
}

#[inline]
fn raw(index: usize) -> NodeId {
    Idx::from_raw(RawIdx::from(index as u32))
}

fn empty_range(index: usize) -> IdxRange<NodeData> {
    IdxRange::new(raw(index)..raw(index))
}

/// Node handle tied to the lifetime of the tree.
#[derive(Clone, Copy)]
pub struct SyntaxNode<'a> {
    tree: &'a TreeInner,
    id: NodeId,
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

impl<'a> SyntaxNode<'a> {
    #[inline]
    fn data(self) -> &'a NodeData {
        &self.tree.nodes[self.id]
    }

    #[inline]
    fn at(self, id: NodeId) -> Self {
        Self { tree: self.tree, id }
    }

    /// Returns the underlying subtree.
    #[inline]
    pub fn green(self) -> &'a GreenNode {
        &self.data().green
    }

    /// Returns a number identifying this node within its tree.
    #[inline]
    pub fn id(self) -> usize {
        self.id.into_raw().into_u32() as usize
    }

    /// Returns this node's symbol.
    #[inline]
    pub fn kind(self) -> Symbol {
        self.green().symbol()
    }

    /// Returns the name of this node's symbol.
    #[inline]
    pub fn kind_name(self) -> &'a str {
        self.tree.language.symbol_name(self.kind())
    }

    /// Returns `true` for nodes of named rules and tokens, `false` for
    /// literal tokens.
    #[inline]
    pub fn is_named(self) -> bool {
        self.kind() == Symbol::ERROR || self.tree.language.is_named(self.kind())
    }

    #[inline]
    pub fn is_error(self) -> bool {
        self.kind() == Symbol::ERROR
    }

    #[inline]
    pub fn is_missing(self) -> bool {
        self.green().is_missing()
    }

    #[inline]
    pub fn is_extra(self) -> bool {
        self.green().is_extra()
    }

    /// Returns `true` if this node or any descendant is an ERROR or MISSING
    /// node.
    #[inline]
    pub fn has_error(self) -> bool {
        self.green().has_error()
    }

    /// Returns the byte range of this node, excluding leading padding. The
    /// root always spans the whole text.
    #[inline]
    pub fn byte_range(self) -> TextRange {
        if self.data().parent.is_none() {
            return TextRange::up_to(self.tree.text_len.bytes);
        }
        TextRange::at(self.data().start.bytes, self.green().size().bytes)
    }

    #[inline]
    pub fn start_byte(self) -> TextSize {
        self.byte_range().start()
    }

    #[inline]
    pub fn end_byte(self) -> TextSize {
        self.byte_range().end()
    }

    #[inline]
    pub fn start_point(self) -> Point {
        if self.data().parent.is_none() {
            return Point::ZERO;
        }
        self.data().start.extent
    }

    #[inline]
    pub fn end_point(self) -> Point {
        if self.data().parent.is_none() {
            return self.tree.text_len.extent;
        }
        (self.data().start + self.green().size()).extent
    }

    /// Returns the text of this node, or an error if it is not valid UTF-8.
    pub fn utf8_text<'s>(self, source: &'s [u8]) -> Result<&'s str, Utf8Error> {
        let range = self.byte_range();
        let end = usize::from(range.end()).min(source.len());
        let start = usize::from(range.start()).min(end);
        std::str::from_utf8(&source[start..end])
    }

    /// Copies the bytes of this node out of any source, chunked or not.
    pub fn text<S: TextSource + ?Sized>(self, source: &S) -> Vec<u8> {
        let range = self.byte_range();
        let mut out = Vec::with_capacity(usize::from(range.len()));
        source.read_into(usize::from(range.start()), usize::from(range.end()), &mut out);
        out
    }

    /// Returns the parent node if any.
    #[inline]
    pub fn parent(self) -> Option<Self> {
        Some(self.at(self.data().parent?))
    }

    /// Returns an iterator of ancestors starting from this node.
    #[inline]
    pub fn ancestors(self) -> impl Iterator<Item = SyntaxNode<'a>> + Clone {
        std::iter::successors(Some(self), |it| it.parent())
    }

    /// Returns the number of visible children.
    #[inline]
    pub fn child_count(self) -> usize {
        self.data().children.len()
    }

    /// Returns the child at `index`.
    #[inline]
    pub fn child(self, index: usize) -> Option<Self> {
        Some(self.at(self.data().children.clone().nth(index)?))
    }

    /// Iterates over the visible children.
    #[inline]
    pub fn children(self) -> Children<'a> {
        Children { tree: self.tree, ids: self.data().children.clone() }
    }

    /// Iterates over the named children.
    #[inline]
    pub fn named_children(self) -> impl Iterator<Item = SyntaxNode<'a>> {
        self.children().filter(|child| child.is_named())
    }

    #[inline]
    pub fn named_child_count(self) -> usize {
        self.named_children().count()
    }

    /// Returns the `index`-th named child.
    #[inline]
    pub fn named_child(self, index: usize) -> Option<Self> {
        self.named_children().nth(index)
    }

    /// Returns this node's position among its parent's children.
    #[inline]
    pub fn index(self) -> usize {
        self.data().index as usize
    }

    /// Returns the next sibling if any.
    #[inline]
    pub fn next_sibling(self) -> Option<Self> {
        self.parent()?.child(self.index() + 1)
    }

    /// Returns the previous sibling if any.
    #[inline]
    pub fn prev_sibling(self) -> Option<Self> {
        self.parent()?.child(self.index().checked_sub(1)?)
    }

    #[inline]
    pub fn next_named_sibling(self) -> Option<Self> {
        std::iter::successors(self.next_sibling(), |it| it.next_sibling()).find(|it| it.is_named())
    }

    #[inline]
    pub fn prev_named_sibling(self) -> Option<Self> {
        std::iter::successors(self.prev_sibling(), |it| it.prev_sibling()).find(|it| it.is_named())
    }

    /// Returns the id of the field this node fills in its parent.
    #[inline]
    pub fn field(self) -> Option<FieldId> {
        self.data().field
    }

    /// Returns the name of the field this node fills in its parent.
    #[inline]
    pub fn field_name(self) -> Option<&'a str> {
        self.tree.language.field_name(self.field()?)
    }

    /// Returns the first child filling field `name`.
    pub fn child_by_field_name(self, name: &str) -> Option<Self> {
        let field = self.tree.language.field_id_for_name(name)?;
        self.children().find(|child| child.field() == Some(field))
    }

    /// Iterates over every child filling field `name`.
    pub fn children_by_field_name(self, name: &str) -> impl Iterator<Item = SyntaxNode<'a>> {
        let field = self.tree.language.field_id_for_name(name);
        self.children().filter(move |child| field.is_some() && child.field() == field)
    }

    /// Returns the smallest node in this subtree whose range contains
    /// `start..end`. Among equally small candidates the earliest-starting
    /// and then the deepest one wins.
    pub fn descendant_for_byte_range(self, start: TextSize, end: TextSize) -> Option<Self> {
        self.descendant_matching(start, end, |_| true)
    }

    /// Like [`Self::descendant_for_byte_range`], skipping anonymous nodes.
    pub fn named_descendant_for_byte_range(self, start: TextSize, end: TextSize) -> Option<Self> {
        self.descendant_matching(start, end, |node| node.is_named())
    }

    fn descendant_matching(
        self,
        start: TextSize,
        end: TextSize,
        accept: impl Fn(Self) -> bool,
    ) -> Option<Self> {
        let range = self.byte_range();
        if start > end || start < range.start() || end > range.end() {
            return None;
        }

        let mut node = self;
        let mut best = self;
        'descend: loop {
            for child in node.children() {
                let child_range = child.byte_range();
                if child_range.start() > start {
                    break;
                }
                let touches = child_range.end() > start || child_range.is_empty();
                if end <= child_range.end() && touches {
                    node = child;
                    if accept(child) {
                        best = child;
                    }
                    continue 'descend;
                }
            }
            return Some(best);
        }
    }

    /// Returns a preorder iterator over nodes.
    #[inline]
    pub fn preorder(self) -> Preorder<'a> {
        Preorder::new(self)
    }

    /// Returns a cursor positioned at this node.
    #[inline]
    pub fn walk(self) -> TreeCursor<'a> {
        TreeCursor::new(self)
    }

    /// Renders the named nodes below and including this one as an
    /// S-expression.
    pub fn to_sexp(self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out, None);
        out
    }

    fn write_sexp(self, out: &mut String, field: Option<&str>) {
        let visible = self.is_named() || self.is_missing();
        if visible {
            if !out.is_empty() {
                out.push(' ');
            }
            if let Some(field) = field {
                let _ = write!(out, "{field}: ");
            }
            out.push('(');
            if self.is_missing() {
                if self.is_named() {
                    let _ = write!(out, "MISSING {}", self.kind_name());
                } else {
                    let _ = write!(out, "MISSING {:?}", self.kind_name());
                }
            } else {
                out.push_str(self.kind_name());
            }
        }
        for child in self.children() {
            child.write_sexp(out, child.field_name());
        }
        if visible {
            out.push(')');
        }
    }
}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:?}", self.kind_name(), self.byte_range())
    }
}

/// Iterator over visible child nodes.
#[derive(Clone)]
pub struct Children<'a> {
    tree: &'a TreeInner,
    ids: IdxRange<NodeData>,
}

impl<'a> Iterator for Children<'a> {
    type Item = SyntaxNode<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        Some(SyntaxNode { tree: self.tree, id: self.ids.next()? })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl DoubleEndedIterator for Children<'_> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        Some(SyntaxNode { tree: self.tree, id: self.ids.next_back()? })
    }
}

impl ExactSizeIterator for Children<'_> {}

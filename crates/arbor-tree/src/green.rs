use std::fmt;

use arbor_grammar::{FieldId, ProductionId, StateId, Symbol};
use arbor_inputs::TextLen;
use triomphe::ThinArc;

/// Per-node flag bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GreenFlags(u8);

impl GreenFlags {
    pub const EXTRA: Self = Self(1 << 0);
    pub const MISSING: Self = Self(1 << 1);
    /// Built while the parser was tracking more than one version.
    pub const FRAGILE: Self = Self(1 << 2);
    /// Touched by an edit since the tree was parsed.
    pub const HAS_CHANGES: Self = Self(1 << 3);
    /// This node or a descendant is an ERROR or MISSING node.
    pub const HAS_ERROR: Self = Self(1 << 4);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl fmt::Debug for GreenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::EXTRA, "extra"),
            (Self::MISSING, "missing"),
            (Self::FRAGILE, "fragile"),
            (Self::HAS_CHANGES, "has_changes"),
            (Self::HAS_ERROR, "has_error"),
        ];
        f.debug_list()
            .entries(names.iter().filter(|(flag, _)| self.contains(*flag)).map(|(_, name)| name))
            .finish()
    }
}

/// Everything a subtree knows about itself apart from its children.
///
/// Nothing in here depends on where the subtree sits in the text, so the same
/// subtree can be shared by several tree revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GreenHead {
    pub symbol: Symbol,
    /// Skipped bytes before the first token.
    pub padding: TextLen,
    pub size: TextLen,
    /// Bytes past the end the lexer examined while producing the last token.
    pub lookahead_bytes: u32,
    pub flags: GreenFlags,
    /// Parser state below this subtree when it was built.
    pub parse_state: StateId,
    /// First non-extra lookahead symbol seen when the subtree was completed.
    pub follow: Symbol,
    pub lex_mode: u16,
    pub production: Option<ProductionId>,
    pub dynamic_precedence: i32,
    pub error_cost: u32,
}

impl GreenHead {
    /// Head of a token produced by the lexer.
    pub fn token(symbol: Symbol, padding: TextLen, size: TextLen) -> Self {
        Self {
            symbol,
            padding,
            size,
            lookahead_bytes: 0,
            flags: GreenFlags::empty(),
            parse_state: StateId::START,
            follow: Symbol::END,
            lex_mode: 0,
            production: None,
            dynamic_precedence: 0,
            error_cost: 0,
        }
    }
}

/// A child edge: the subtree plus the field name its parent gave it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GreenChild {
    pub field: Option<FieldId>,
    pub node: GreenNode,
}

/// Extra information the parser records when it reduces a production.
#[derive(Debug, Clone, Copy)]
pub struct NodeInfo {
    pub parse_state: StateId,
    pub follow: Symbol,
    pub production: Option<ProductionId>,
    pub dynamic_precedence: i32,
    pub fragile: bool,
}

/// Immutable, reference-counted subtree.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GreenNode {
    ptr: ThinArc<GreenHead, GreenChild>,
}

impl GreenNode {
    pub fn from_parts(head: GreenHead, children: Vec<GreenChild>) -> Self {
        Self { ptr: ThinArc::from_header_and_iter(head, children.into_iter()) }
    }

    pub fn leaf(head: GreenHead) -> Self {
        let mut head = head;
        let error = head.symbol == Symbol::ERROR || head.flags.contains(GreenFlags::MISSING);
        head.flags.set(GreenFlags::HAS_ERROR, error);
        if error {
            head.error_cost = head.error_cost.max(1);
        }
        Self::from_parts(head, Vec::new())
    }

    /// Zero-width token the parser inserted to recover from an error.
    pub fn missing(symbol: Symbol, parse_state: StateId, lex_mode: u16) -> Self {
        let mut head = GreenHead::token(symbol, TextLen::ZERO, TextLen::ZERO);
        head.flags = GreenFlags::MISSING;
        head.parse_state = parse_state;
        head.lex_mode = lex_mode;
        Self::leaf(head)
    }

    /// Builds an interior node. Its padding is the padding of its first
    /// child, and its size spans everything after that.
    pub fn node(symbol: Symbol, children: Vec<GreenChild>, info: NodeInfo) -> Self {
        let (padding, size, lookahead_bytes) = measure(&children);
        let mut flags = GreenFlags::empty();
        let mut dynamic_precedence = info.dynamic_precedence;
        let mut error_cost = u32::from(symbol == Symbol::ERROR);

        for child in &children {
            let head = child.node.head();
            if head.flags.contains(GreenFlags::HAS_ERROR) {
                flags = flags.union(GreenFlags::HAS_ERROR);
            }
            dynamic_precedence += head.dynamic_precedence;
            error_cost += head.error_cost;
        }

        flags.set(GreenFlags::HAS_ERROR, flags.contains(GreenFlags::HAS_ERROR) || symbol == Symbol::ERROR);
        flags.set(GreenFlags::FRAGILE, info.fragile);

        let head = GreenHead {
            symbol,
            padding,
            size,
            lookahead_bytes,
            flags,
            parse_state: info.parse_state,
            follow: info.follow,
            lex_mode: children.first().map_or(0, |child| child.node.head().lex_mode),
            production: info.production,
            dynamic_precedence,
            error_cost,
        };
        Self::from_parts(head, children)
    }

    /// Copy of a leaf moved by an edit.
    pub(crate) fn edited_leaf(&self, padding: TextLen, size: TextLen) -> Self {
        let mut head = *self.head();
        head.padding = padding;
        head.size = size;
        head.flags = head.flags.union(GreenFlags::HAS_CHANGES);
        Self::from_parts(head, Vec::new())
    }

    /// Copy of an interior node whose children were edited.
    pub(crate) fn edited_node(&self, children: Vec<GreenChild>) -> Self {
        let mut head = *self.head();
        (head.padding, head.size, head.lookahead_bytes) = measure(&children);
        head.flags = head.flags.union(GreenFlags::HAS_CHANGES);
        Self::from_parts(head, children)
    }

    /// Copy of this subtree with different flags.
    pub fn with_flags(&self, flags: GreenFlags) -> Self {
        let mut head = *self.head();
        head.flags = flags;
        Self::from_parts(head, self.children().to_vec())
    }

    #[inline]
    pub fn head(&self) -> &GreenHead {
        &self.ptr.header.header
    }

    #[inline]
    pub fn children(&self) -> &[GreenChild] {
        &self.ptr.slice
    }

    #[inline]
    pub fn child(&self, index: usize) -> Option<&GreenChild> {
        self.children().get(index)
    }

    #[inline]
    pub fn symbol(&self) -> Symbol {
        self.head().symbol
    }

    #[inline]
    pub fn padding(&self) -> TextLen {
        self.head().padding
    }

    #[inline]
    pub fn size(&self) -> TextLen {
        self.head().size
    }

    /// Padding plus size.
    #[inline]
    pub fn total_len(&self) -> TextLen {
        self.head().padding + self.head().size
    }

    #[inline]
    pub fn flags(&self) -> GreenFlags {
        self.head().flags
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children().is_empty() && self.head().production.is_none()
    }

    #[inline]
    pub fn is_extra(&self) -> bool {
        self.flags().contains(GreenFlags::EXTRA)
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.flags().contains(GreenFlags::MISSING)
    }

    #[inline]
    pub fn has_error(&self) -> bool {
        self.flags().contains(GreenFlags::HAS_ERROR)
    }

    #[inline]
    pub fn has_changes(&self) -> bool {
        self.flags().contains(GreenFlags::HAS_CHANGES)
    }

    #[inline]
    pub fn is_fragile(&self) -> bool {
        self.flags().contains(GreenFlags::FRAGILE)
    }

    /// Symbol of the first token inside this subtree, skipping empty nodes.
    pub fn first_leaf_symbol(&self) -> Option<Symbol> {
        if self.is_leaf() {
            return Some(self.symbol());
        }
        self.children().iter().find_map(|child| child.node.first_leaf_symbol())
    }

    /// Same allocation, not just equal contents.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ptr.ptr(), other.ptr.ptr())
    }
}

/// Padding, size and lookahead of a node made of `children`.
fn measure(children: &[GreenChild]) -> (TextLen, TextLen, u32) {
    let mut padding = TextLen::ZERO;
    let mut size = TextLen::ZERO;
    let mut lookahead_end = 0u32;
    for (index, child) in children.iter().enumerate() {
        let head = child.node.head();
        if index == 0 {
            padding = head.padding;
            size = head.size;
        } else {
            size += head.padding + head.size;
        }
        let end = u32::from(size.bytes);
        lookahead_end = lookahead_end.max(end + head.lookahead_bytes);
    }
    (padding, size, lookahead_end.saturating_sub(u32::from(size.bytes)))
}

impl fmt::Debug for GreenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenNode")
            .field("symbol", &self.symbol())
            .field("padding", &self.padding().bytes)
            .field("size", &self.size().bytes)
            .field("flags", &self.flags())
            .field("children", &self.children().len())
            .finish()
    }
}

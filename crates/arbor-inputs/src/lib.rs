//! Caller-owned text buffers and the positions used to address them.
//!
//! The engine never owns source text. It reads bytes through [`TextSource`],
//! which only has to hand out contiguous chunks starting at an offset.

mod point;
mod source;

pub use line_index::{LineCol, LineIndex};
/// Row/column positions and combined byte/extent lengths.
pub use point::{Point, TextLen};
/// Random-access byte sources.
pub use source::{ChunkedText, TextSource};
pub use text_size::{TextRange, TextSize};

/// Converts a byte offset into a [`Point`] using a precomputed line index.
pub fn point_at(index: &LineIndex, offset: TextSize) -> Point {
    let LineCol { line, col } = index.line_col(offset);
    Point::new(line, col)
}

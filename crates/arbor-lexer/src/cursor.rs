use arbor_inputs::{TextLen, TextSource};

/// Byte cursor over a chunked source that keeps the current row/column.
pub(crate) struct Cursor<'s, S: ?Sized> {
    source: &'s S,
    chunk: &'s [u8],
    chunk_start: usize,
    position: TextLen,
}

impl<'s, S: TextSource + ?Sized> Cursor<'s, S> {
    pub(crate) fn new(source: &'s S, position: TextLen) -> Self {
        let offset = usize::from(position.bytes);
        Self { source, chunk: source.chunk(offset), chunk_start: offset, position }
    }

    pub(crate) fn source(&self) -> &'s S {
        self.source
    }

    pub(crate) fn len(&self) -> usize {
        self.source.len()
    }

    pub(crate) fn offset(&self) -> usize {
        usize::from(self.position.bytes)
    }

    pub(crate) fn position(&self) -> TextLen {
        self.position
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.offset() >= self.len()
    }

    /// Reads the byte at `offset` without moving the cursor.
    #[inline]
    pub(crate) fn byte_at(&mut self, offset: usize) -> Option<u8> {
        if let Some(index) = offset.checked_sub(self.chunk_start)
            && let Some(&byte) = self.chunk.get(index)
        {
            return Some(byte);
        }
        let chunk = self.source.chunk(offset);
        let byte = chunk.first().copied()?;
        self.chunk = chunk;
        self.chunk_start = offset;
        Some(byte)
    }

    /// Moves forward to `end`, updating the row/column.
    pub(crate) fn advance_to(&mut self, end: usize) {
        while self.offset() < end {
            let Some(byte) = self.byte_at(self.offset()) else { break };
            self.position.push(byte);
        }
    }
}

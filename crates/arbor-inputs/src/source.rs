/// A random-access byte source supplied by the caller.
///
/// `chunk(offset)` returns the longest contiguous run of bytes the source can
/// hand out starting at `offset`. It is empty exactly when `offset >= len()`.
pub trait TextSource {
    fn len(&self) -> usize;

    fn chunk(&self, offset: usize) -> &[u8];

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn byte_at(&self, offset: usize) -> Option<u8> {
        self.chunk(offset).first().copied()
    }

    /// Copies `start..end` into `out`, clamped to the source length.
    fn read_into(&self, start: usize, end: usize, out: &mut Vec<u8>) {
        let end = end.min(self.len());
        let mut offset = start;
        while offset < end {
            let chunk = self.chunk(offset);
            if chunk.is_empty() {
                break;
            }
            let take = chunk.len().min(end - offset);
            out.extend_from_slice(&chunk[..take]);
            offset += take;
        }
    }
}

impl TextSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn chunk(&self, offset: usize) -> &[u8] {
        self.get(offset..).unwrap_or_default()
    }
}

impl TextSource for str {
    fn len(&self) -> usize {
        str::len(self)
    }

    fn chunk(&self, offset: usize) -> &[u8] {
        self.as_bytes().chunk(offset)
    }
}

impl TextSource for String {
    fn len(&self) -> usize {
        String::len(self)
    }

    fn chunk(&self, offset: usize) -> &[u8] {
        self.as_bytes().chunk(offset)
    }
}

impl TextSource for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn chunk(&self, offset: usize) -> &[u8] {
        self.as_slice().chunk(offset)
    }
}

impl<T: TextSource + ?Sized> TextSource for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn chunk(&self, offset: usize) -> &[u8] {
        (**self).chunk(offset)
    }
}

/// Text stored as a sequence of non-empty chunks, like a rope's leaves.
#[derive(Debug, Clone, Default)]
pub struct ChunkedText {
    chunks: Vec<Box<[u8]>>,
    /// Start offset of every chunk.
    starts: Vec<usize>,
    len: usize,
}

impl ChunkedText {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        let mut text = Self::default();
        for chunk in chunks {
            let chunk: Vec<u8> = chunk.into();
            if chunk.is_empty() {
                continue;
            }
            text.starts.push(text.len);
            text.len += chunk.len();
            text.chunks.push(chunk.into_boxed_slice());
        }
        text
    }

    /// Splits `text` into chunks of at most `chunk_size` bytes.
    pub fn split(text: &[u8], chunk_size: usize) -> Self {
        Self::new(text.chunks(chunk_size.max(1)).map(<[u8]>::to_vec))
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl TextSource for ChunkedText {
    fn len(&self) -> usize {
        self.len
    }

    fn chunk(&self, offset: usize) -> &[u8] {
        if offset >= self.len {
            return &[];
        }
        let index = match self.starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        &self.chunks[index][offset - self.starts[index]..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_text_serves_offsets_inside_chunks() {
        let text = ChunkedText::new(["ab", "", "cde", "f"]);
        assert_eq!(text.len(), 6);
        assert_eq!(text.chunk_count(), 3);
        assert_eq!(text.chunk(0), b"ab");
        assert_eq!(text.chunk(1), b"b");
        assert_eq!(text.chunk(2), b"cde");
        assert_eq!(text.chunk(4), b"e");
        assert_eq!(text.chunk(5), b"f");
        assert!(text.chunk(6).is_empty());
        assert_eq!(text.byte_at(3), Some(b'd'));
    }

    #[test]
    fn read_into_crosses_chunk_boundaries() {
        let text = ChunkedText::split(b"POLICY Aio 0 {}", 4);
        let mut out = Vec::new();
        text.read_into(2, 11, &mut out);
        assert_eq!(out, b"LICY Aio ");

        let mut out = Vec::new();
        "short".read_into(3, 100, &mut out);
        assert_eq!(out, b"rt");
    }
}

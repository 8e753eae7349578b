/// Tracks where the next value of each width bucket goes in the data segment.
///
/// Values of one byte and two bytes are packed into the gaps of 4-byte-aligned blocks, while
/// everything else (including length prefixes and strings) goes through the 4-byte cursor. A
/// smaller bucket keeps filling its current block until it reaches a 4-byte boundary, at which
/// point the next alignment pulls it forward to wherever the 4-byte cursor is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteOffsets {
    offset1: usize,
    offset2: usize,
    offset4: usize,
}

impl ByteOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset1(&self) -> usize {
        self.offset1
    }

    pub fn offset2(&self) -> usize {
        self.offset2
    }

    pub fn offset4(&self) -> usize {
        self.offset4
    }

    /// Update the cursors after reading or writing up to `position` in the data segment.
    pub fn align(&mut self, position: usize) {
        let aligned = (position + 3) & !3;
        self.offset4 = self.offset4.max(aligned);
        if self.offset2 % 4 == 0 {
            self.offset2 = self.offset4;
        }
        if self.offset1 % 4 == 0 {
            self.offset1 = self.offset4;
        }
    }

    /// Pick the cursor for a payload of `size` bytes.
    pub fn cursor_for(&mut self, size: usize) -> &mut usize {
        match size {
            1 => &mut self.offset1,
            2 => &mut self.offset2,
            _ => &mut self.offset4,
        }
    }

    /// Claim `size` bytes from the matching bucket, returning where they start. The caller must
    /// follow up with [`align`](Self::align) once the bytes are read or written.
    pub fn claim(&mut self, size: usize) -> usize {
        let cursor = self.cursor_for(size);
        let start = *cursor;
        *cursor += size;
        start
    }
}

//! Line/column <-> offset conversion.

/// Zero-based line and column (byte) position.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl LineCol {
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// Pre-computed line start offsets for a particular text snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = Vec::with_capacity(64);
        line_starts.push(0);

        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line_starts.push(i + 1);
                    i += 1;
                }
                b'\r' => {
                    if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                        line_starts.push(i + 2);
                        i += 2;
                    } else {
                        line_starts.push(i + 1);
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }

        Self {
            line_starts,
            text_len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    /// Offset of `pos`; `None` if the line does not exist. Columns past the end of a line are
    /// clamped to the text length.
    pub fn offset(&self, pos: LineCol) -> Option<usize> {
        let start = *self.line_starts.get(pos.line as usize)?;
        Some((start + pos.col as usize).min(self.text_len))
    }

    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        LineCol {
            line: line as u32,
            col: (offset - self.line_starts[line]) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_line_starts() {
        let index = LineIndex::new("ab\ncd\r\nef");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.offset(LineCol::new(0, 1)), Some(1));
        assert_eq!(index.offset(LineCol::new(1, 0)), Some(3));
        assert_eq!(index.offset(LineCol::new(2, 1)), Some(8));
        assert_eq!(index.offset(LineCol::new(3, 0)), None);
        assert_eq!(index.line_col(8), LineCol::new(2, 1));
        assert_eq!(index.line_col(4), LineCol::new(1, 1));
    }

    #[test]
    fn column_past_end_is_clamped() {
        let index = LineIndex::new("abc");
        assert_eq!(index.offset(LineCol::new(0, 99)), Some(3));
    }
}

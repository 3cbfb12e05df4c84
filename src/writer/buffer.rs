//! Byte accumulators for page content and the final file.
//!
//! Page content is appended operator by operator while the layout runs.
//! Some operators (cell borders and fills, centred HTML lines) can only be
//! computed after the content they decorate has been written; those are
//! inserted afterwards at a named [`Mark`] with [`PageBuffer::splice_at`],
//! which is the only way bytes are ever inserted into the middle of a page.

use indexmap::IndexMap;
use log::trace;

/// Named insertion points inside a page buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    /// Start of the page body, after the header. Borders and fills of
    /// multi-page cells go here so they are painted behind the text.
    Insertion,
    /// Start of the footer block.
    Footer,
    /// Just after the `q` of the innermost open transformation.
    Transform,
    /// Start of the HTML line currently being laid out.
    LineStart,
}

/// Content stream of a single page with its insertion marks.
#[derive(Debug, Clone, Default)]
pub struct PageBuffer {
    data: Vec<u8>,
    marks: IndexMap<Mark, usize>,
}

impl PageBuffer {
    /// Create an empty page buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append an operator line (the text followed by a newline).
    pub fn push_line(&mut self, line: &str) {
        self.data.extend_from_slice(line.as_bytes());
        self.data.push(b'\n');
    }

    /// Current length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing was written yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The page content so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Record `mark` at the current end of the buffer.
    pub fn set_mark(&mut self, mark: Mark) {
        let len = self.data.len();
        self.marks.insert(mark, len);
    }

    /// Record `mark` at an explicit offset, clamped to the buffer length.
    pub fn set_mark_at(&mut self, mark: Mark, offset: usize) {
        self.marks.insert(mark, offset.min(self.data.len()));
    }

    /// Forget a mark.
    pub fn clear_mark(&mut self, mark: Mark) {
        self.marks.shift_remove(&mark);
    }

    /// Offset of a mark, if set.
    pub fn mark(&self, mark: Mark) -> Option<usize> {
        self.marks.get(&mark).copied()
    }

    /// Insert `bytes` at the offset of `mark`.
    ///
    /// Every mark at or after the insertion point, the used mark included,
    /// moves forward by the inserted length. Returns the insertion offset, or
    /// `None` when the mark is not set.
    pub fn splice_at(&mut self, mark: Mark, bytes: &[u8]) -> Option<usize> {
        let offset = self.mark(mark)?;
        self.splice_at_offset(offset, bytes);
        Some(offset)
    }

    /// Insert `bytes` at a raw offset, shifting the marks that follow it.
    pub fn splice_at_offset(&mut self, offset: usize, bytes: &[u8]) {
        let offset = offset.min(self.data.len());
        trace!("splice {} bytes at offset {}", bytes.len(), offset);
        self.data.splice(offset..offset, bytes.iter().copied());
        for pos in self.marks.values_mut() {
            if *pos >= offset {
                *pos += bytes.len();
            }
        }
    }

    /// Remove everything from `offset` to the end and return it.
    ///
    /// Marks past the new end are clamped to it.
    pub fn take_tail(&mut self, offset: usize) -> Vec<u8> {
        let offset = offset.min(self.data.len());
        let tail = self.data.split_off(offset);
        for pos in self.marks.values_mut() {
            if *pos > offset {
                *pos = offset;
            }
        }
        tail
    }

    /// Consume the buffer, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Global output buffer for the serialized file.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    data: Vec<u8>,
}

impl OutputBuffer {
    /// Create an empty output buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line (text + newline).
    pub fn push_line(&mut self, line: &str) {
        self.data.extend_from_slice(line.as_bytes());
        self.data.push(b'\n');
    }

    /// Current length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing was written yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl std::io::Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_splice_inserts_before_later_content() {
        let mut page = PageBuffer::new();
        page.push_line("q");
        page.set_mark(Mark::Insertion);
        page.push_line("BT /F1 12.00 Tf ET");

        assert_eq!(page.splice_at(Mark::Insertion, b"0 0 10 10 re S\n"), Some(2));
        assert_eq!(
            String::from_utf8_lossy(page.as_bytes()),
            "q\n0 0 10 10 re S\nBT /F1 12.00 Tf ET\n"
        );
    }

    #[test]
    fn test_splice_shifts_used_and_later_marks() {
        let mut page = PageBuffer::new();
        page.push_line("header");
        page.set_mark(Mark::Insertion);
        page.push_line("body");
        page.set_mark(Mark::Footer);
        page.push_line("footer");

        let footer_before = page.mark(Mark::Footer).unwrap();
        page.splice_at(Mark::Insertion, b"XY");

        assert_eq!(page.mark(Mark::Insertion), Some(9));
        assert_eq!(page.mark(Mark::Footer), Some(footer_before + 2));
        let footer_at = page.mark(Mark::Footer).unwrap();
        assert!(page.as_bytes()[footer_at..].starts_with(b"footer"));
    }

    #[test]
    fn test_successive_splices_keep_call_order() {
        let mut page = PageBuffer::new();
        page.set_mark(Mark::Insertion);
        page.push_line("text");
        page.splice_at(Mark::Insertion, b"a\n");
        page.splice_at(Mark::Insertion, b"b\n");
        assert_eq!(page.as_bytes(), b"a\nb\ntext\n");
    }

    #[test]
    fn test_splice_without_mark() {
        let mut page = PageBuffer::new();
        page.push_line("text");
        assert_eq!(page.splice_at(Mark::Transform, b"x"), None);
        assert_eq!(page.as_bytes(), b"text\n");
    }

    #[test]
    fn test_take_tail_clamps_marks() {
        let mut page = PageBuffer::new();
        page.push_line("a");
        page.set_mark(Mark::LineStart);
        page.push_line("bc");
        page.set_mark(Mark::Footer);

        let tail = page.take_tail(2);
        assert_eq!(tail, b"bc\n");
        assert_eq!(page.mark(Mark::LineStart), Some(2));
        assert_eq!(page.mark(Mark::Footer), Some(2));
    }

    #[test]
    fn test_output_buffer_write() {
        use std::io::Write;
        let mut out = OutputBuffer::new();
        out.push_line("%PDF-1.7");
        writeln!(out, "{:010} 00000 n ", 15).unwrap();
        assert_eq!(out.as_bytes(), b"%PDF-1.7\n0000000015 00000 n \n");
    }

    proptest! {
        #[test]
        fn prop_splice_shifts_exactly_marks_at_or_after(
            content in proptest::collection::vec(any::<u8>(), 0..64),
            insert in proptest::collection::vec(any::<u8>(), 0..16),
            positions in proptest::collection::vec(0usize..64, 4),
            which in 0usize..4,
        ) {
            let marks = [Mark::Insertion, Mark::Footer, Mark::Transform, Mark::LineStart];
            let mut page = PageBuffer::new();
            page.append(&content);
            for (mark, pos) in marks.iter().zip(&positions) {
                page.set_mark_at(*mark, *pos);
            }
            let before: Vec<usize> = marks.iter().map(|m| page.mark(*m).unwrap()).collect();
            let at = before[which];

            page.splice_at(marks[which], &insert);

            let mut expected = content.clone();
            expected.splice(at..at, insert.iter().copied());
            prop_assert_eq!(page.as_bytes(), &expected[..]);
            for (mark, old) in marks.iter().zip(&before) {
                let new = page.mark(*mark).unwrap();
                if *old >= at {
                    prop_assert_eq!(new, old + insert.len());
                } else {
                    prop_assert_eq!(new, *old);
                }
            }
        }
    }
}

//! Pattern buffer with tail-search optimization.
//!
//! Prompts always sit at the very end of the accumulated output, so only the
//! last `search_depth` bytes are searched for them. Error patterns may appear
//! anywhere in the output, so the buffer also tracks how far it has already
//! been scanned for errors and hands out only the unscanned region.

use bytes::BytesMut;

use super::patterns::PatternMatcher;

/// Buffer for accumulating command output and searching it for patterns.
#[derive(Debug)]
pub struct PatternBuffer {
    /// The accumulated output buffer.
    buffer: BytesMut,

    /// How many bytes from the end to search for prompt patterns.
    search_depth: usize,

    /// Start of the region not yet scanned for error patterns.
    scan_mark: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            scan_mark: 0,
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Offset of the tail region within the buffer.
    pub fn tail_start(&self) -> usize {
        self.buffer.len().saturating_sub(self.search_depth)
    }

    /// The last `search_depth` bytes of the buffer.
    pub fn tail(&self) -> &[u8] {
        &self.buffer[self.tail_start()..]
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains<P: PatternMatcher + ?Sized>(&self, pattern: &P) -> bool {
        pattern.find_span(self.tail()).is_some()
    }

    /// Output received since the last [`mark_scanned`](Self::mark_scanned).
    ///
    /// Always starts at a line boundary, so a line split across two reads is
    /// presented whole on the next scan.
    pub fn unscanned(&self) -> &[u8] {
        &self.buffer[self.scan_mark..]
    }

    /// Record that everything up to the last complete line has been scanned.
    pub fn mark_scanned(&mut self) {
        if let Some(pos) = memchr::memrchr(b'\n', &self.buffer[self.scan_mark..]) {
            self.scan_mark += pos + 1;
        }
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.scan_mark = 0;
        self.buffer.split().to_vec()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scan_mark = 0;
    }

    /// Get the search depth setting.
    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::bytes::Regex;

    #[test]
    fn test_basic_extend() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Hello, switch!");
        assert_eq!(buffer.as_slice(), b"Hello, switch!");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mEthernet1\x1b[0m");
        assert_eq!(buffer.as_slice(), b"Ethernet1");
    }

    #[test]
    fn test_tail_search() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nswitch#");

        let pattern = Regex::new(r"switch#").unwrap();
        assert!(buffer.tail_contains(&pattern));
        assert_eq!(buffer.tail_start(), 88);
    }

    #[test]
    fn test_tail_search_not_in_tail() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"switch#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"switch#").unwrap();
        assert!(!buffer.tail_contains(&pattern));
    }

    #[test]
    fn test_scan_mark_keeps_partial_line() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"line one\n% Err");
        buffer.mark_scanned();
        assert_eq!(buffer.unscanned(), b"% Err");

        buffer.extend(b"or: bad\n");
        assert_eq!(buffer.unscanned(), b"% Error: bad\n");

        buffer.mark_scanned();
        assert!(buffer.unscanned().is_empty());
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"show version\n");
        buffer.mark_scanned();
        assert_eq!(buffer.take(), b"show version\n");
        assert!(buffer.is_empty());
        assert!(buffer.unscanned().is_empty());
    }
}

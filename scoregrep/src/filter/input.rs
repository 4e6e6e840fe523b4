use std::borrow::Cow;
use std::io::BufRead;
use tracing::warn;

use crate::config::EncodingMode;
use crate::errors::{FilterError, FilterResult};

// Initial capacity of the reusable read buffer
const LINE_BUFFER_CAPACITY: usize = 256;

/// A sequential source of input lines.
///
/// `Ok(None)` is end-of-stream, a normal terminal condition.
pub trait LineSource {
    fn next_line(&mut self) -> FilterResult<Option<String>>;
}

/// Reads `\n`-terminated lines from any buffered reader.
///
/// The terminator and an optional preceding `\r` are stripped. A final line
/// without a terminator is still returned.
#[derive(Debug)]
pub struct LineReader<R> {
    reader: R,
    encoding_mode: EncodingMode,
    buffer: Vec<u8>,
    line_number: u64,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R, encoding_mode: EncodingMode) -> Self {
        Self {
            reader,
            encoding_mode,
            buffer: Vec::with_capacity(LINE_BUFFER_CAPACITY),
            line_number: 0,
        }
    }

    /// Number of lines returned so far
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

impl<R: BufRead> LineSource for LineReader<R> {
    fn next_line(&mut self) -> FilterResult<Option<String>> {
        self.buffer.clear();
        if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        if self.buffer.last() == Some(&b'\n') {
            self.buffer.pop();
            if self.buffer.last() == Some(&b'\r') {
                self.buffer.pop();
            }
        }

        decode_line(&self.buffer, self.line_number, self.encoding_mode).map(Some)
    }
}

/// Decodes one line according to the encoding mode
fn decode_line(bytes: &[u8], line_number: u64, encoding_mode: EncodingMode) -> FilterResult<String> {
    match encoding_mode {
        EncodingMode::FailFast => String::from_utf8(bytes.to_vec())
            .map_err(|e| FilterError::encoding_error(line_number, e)),
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            // Owned means at least one invalid sequence was replaced
            if let Cow::Owned(_) = cow {
                warn!("Invalid UTF-8 replaced on input line {}", line_number);
            }
            Ok(cow.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(input: &[u8], mode: EncodingMode) -> FilterResult<Vec<String>> {
        let mut reader = LineReader::new(Cursor::new(input.to_vec()), mode);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line()? {
            lines.push(line);
        }
        Ok(lines)
    }

    #[test]
    fn test_splits_lines() {
        let lines = read_all(b"abc\nbcd\nxyz\n", EncodingMode::FailFast).unwrap();
        assert_eq!(lines, vec!["abc", "bcd", "xyz"]);
    }

    #[test]
    fn test_final_line_without_newline() {
        let lines = read_all(b"one\ntwo", EncodingMode::FailFast).unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_strips_crlf() {
        let lines = read_all(b"one\r\ntwo\r\n", EncodingMode::FailFast).unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_keeps_empty_lines() {
        let lines = read_all(b"\n\nx\n", EncodingMode::FailFast).unwrap();
        assert_eq!(lines, vec!["", "", "x"]);
    }

    #[test]
    fn test_empty_input() {
        let lines = read_all(b"", EncodingMode::FailFast).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_invalid_utf8_failfast() {
        let err = read_all(b"ok\n\xff\xfe\n", EncodingMode::FailFast).unwrap_err();
        assert!(matches!(err, FilterError::EncodingError { line: 2, .. }));
    }

    #[test]
    fn test_invalid_utf8_lossy() {
        let lines = read_all(b"ok\nbad\xffbyte\n", EncodingMode::Lossy).unwrap();
        assert_eq!(lines, vec!["ok".to_string(), "bad\u{FFFD}byte".to_string()]);
    }

    #[test]
    fn test_line_number_tracking() {
        let mut reader = LineReader::new(Cursor::new(b"a\nb\n".to_vec()), EncodingMode::FailFast);
        assert_eq!(reader.line_number(), 0);
        reader.next_line().unwrap();
        reader.next_line().unwrap();
        assert!(reader.next_line().unwrap().is_none());
        assert_eq!(reader.line_number(), 2);
    }
}

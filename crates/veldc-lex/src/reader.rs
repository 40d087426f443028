//! Byte-oriented source reader with pushback.
//!
//! The tokenizer works on raw bytes, one at a time, and frequently needs
//! to put a byte back after looking at it. `ungetc`-style one-byte
//! pushback is not enough (operator scanning looks ahead up to three
//! bytes), so the reader keeps its own pushback stack.

use veldc_util::{fail, CompileResult, Location};

/// Reads a source file byte by byte.
///
/// End of file is represented by the zero byte, which is why a literal
/// zero byte inside the source is rejected. A CRLF pair is reported once
/// as LF; a CR on its own is an error.
///
/// # Example
///
/// ```
/// use veldc_lex::SourceReader;
///
/// let mut reader = SourceReader::new("test.veld", b"ab".to_vec());
/// assert_eq!(reader.read_byte().unwrap(), b'a');
/// reader.unread_byte(b'a');
/// assert_eq!(reader.read_byte().unwrap(), b'a');
/// assert_eq!(reader.read_byte().unwrap(), b'b');
/// assert_eq!(reader.read_byte().unwrap(), 0);
/// ```
pub struct SourceReader {
    bytes: Vec<u8>,
    pos: usize,
    pushback: Vec<u8>,
    location: Location,
}

impl SourceReader {
    /// Creates a reader over the contents of a file. Line numbers start
    /// at 1.
    pub fn new(filename: impl Into<std::rc::Rc<str>>, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            pos: 0,
            pushback: Vec::new(),
            location: Location::new(filename, 1),
        }
    }

    /// The location of the byte about to be read.
    pub fn location(&self) -> &Location {
        &self.location
    }

    fn next_raw(&mut self) -> CompileResult<u8> {
        if self.pos >= self.bytes.len() {
            return Ok(0);
        }
        let b = self.bytes[self.pos];
        self.pos += 1;
        if b == 0 {
            fail!(self.location.clone(), "source file contains a zero byte");
        }
        Ok(b)
    }

    /// Returns the next byte, or 0 at end of file.
    ///
    /// Each LF this produces moves the line counter forward; unreading
    /// the LF moves it back, so the current location is always the line
    /// of the byte about to be read.
    pub fn read_byte(&mut self) -> CompileResult<u8> {
        let c = match self.pushback.pop() {
            Some(c) => c,
            None => {
                let mut c = self.next_raw()?;
                if c == b'\r' {
                    c = self.next_raw()?;
                    if c != b'\n' {
                        fail!(
                            self.location.clone(),
                            "source file contains a CR byte ('\\r') that isn't a part of a CRLF line ending"
                        );
                    }
                }
                c
            }
        };
        if c == b'\n' {
            self.location.lineno += 1;
        }
        Ok(c)
    }

    /// Pushes a byte back so the next [`read_byte`](Self::read_byte)
    /// returns it again. Unreading the end-of-file byte is a no-op.
    /// Any number of pushbacks is supported.
    pub fn unread_byte(&mut self, c: u8) {
        if c == 0 {
            return;
        }
        debug_assert_ne!(c, b'\r'); // c should come from read_byte()
        self.pushback.push(c);
        if c == b'\n' {
            self.location.lineno -= 1;
        }
    }
}

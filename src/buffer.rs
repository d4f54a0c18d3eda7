use std::collections::VecDeque;
use std::io::{self, BufRead};

use crate::chars::{CR, LF};

/// The last character returned by any read on a [`CharReader`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Last {
    /// Nothing has been read yet.
    None,
    /// The last read hit end of input.
    Eof,
    /// The last read returned this character.
    Char(char),
}

impl Last {
    pub(crate) fn is_line_break(self) -> bool {
        matches!(self, Last::Char(CR) | Last::Char(LF))
    }
}

/// A buffered character reader with the extended state the lexer needs:
/// a one-character lookahead, a mark/reset snapshot, the last character
/// returned, a count of characters consumed and a count of line endings
/// seen.
///
/// The underlying stream must be UTF-8; an invalid sequence surfaces as an
/// `InvalidData` I/O error. Characters, not bytes, are the unit for both
/// `position` and the delimiter lookahead, so multi-byte delimiters and
/// field content behave alike.
#[derive(Debug)]
pub(crate) struct CharReader<R> {
    rdr: io::BufReader<R>,
    /// Characters pushed back by `peek` or replayed by `reset`, in stream
    /// order.
    pending: VecDeque<char>,
    /// Consumed characters recorded since the active `mark`, if any.
    recording: Option<Vec<char>>,
    mark: Option<Snapshot>,
    last: Last,
    line_number: u64,
    position: u64,
}

#[derive(Clone, Copy, Debug)]
struct Snapshot {
    last: Last,
    line_number: u64,
    position: u64,
}

impl<R: io::Read> CharReader<R> {
    pub(crate) fn new(rdr: R) -> CharReader<R> {
        CharReader {
            rdr: io::BufReader::new(rdr),
            pending: VecDeque::new(),
            recording: None,
            mark: None,
            last: Last::None,
            line_number: 0,
            position: 0,
        }
    }

    /// The last character returned by `read`, `read_chars` or `read_line`.
    /// `peek` does not affect it.
    pub(crate) fn last_char(&self) -> Last {
        self.last
    }

    /// The number of line endings consumed, adjusted to name the line
    /// currently being read: while the last character is neither a line
    /// break nor end of input, the count reported is one ahead of the
    /// endings seen.
    pub(crate) fn line_number(&self) -> u64 {
        match self.last {
            Last::None | Last::Eof => self.line_number,
            Last::Char(c) if c == CR || c == LF => self.line_number,
            Last::Char(_) => self.line_number + 1,
        }
    }

    /// The absolute count of characters consumed.
    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    /// Consume and return the next character, or `None` at end of input.
    ///
    /// Line accounting: a CR counts as an ending; an LF counts unless it
    /// follows a CR (so CRLF is one ending); end of input counts once
    /// unless the stream already ended on a line break.
    pub(crate) fn read(&mut self) -> io::Result<Option<char>> {
        match self.next_raw()? {
            Some(c) => {
                if c == CR || (c == LF && self.last != Last::Char(CR)) {
                    self.line_number += 1;
                }
                self.position += 1;
                if let Some(rec) = self.recording.as_mut() {
                    rec.push(c);
                }
                self.last = Last::Char(c);
                Ok(Some(c))
            }
            None => {
                if !self.last.is_line_break() && self.last != Last::Eof {
                    self.line_number += 1;
                }
                self.last = Last::Eof;
                Ok(None)
            }
        }
    }

    /// Bulk read into `buf`, applying the same accounting as `read`.
    /// Returns the number of characters stored; 0 means end of input.
    pub(crate) fn read_chars(
        &mut self,
        buf: &mut [char],
    ) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.read()? {
                Some(c) => {
                    buf[n] = c;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    /// Return the next character without consuming it.
    pub(crate) fn peek(&mut self) -> io::Result<Option<char>> {
        if let Some(&c) = self.pending.front() {
            return Ok(Some(c));
        }
        match self.decode()? {
            Some(c) => {
                self.pending.push_front(c);
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }

    /// Snapshot the reader state. A later `reset` replays every character
    /// consumed in between. Only one mark is live at a time; marking again
    /// moves it.
    pub(crate) fn mark(&mut self) {
        self.mark = Some(Snapshot {
            last: self.last,
            line_number: self.line_number,
            position: self.position,
        });
        self.recording = Some(Vec::new());
    }

    /// Restore the state saved by the last `mark` and arrange for the
    /// characters consumed since then to be read again.
    pub(crate) fn reset(&mut self) {
        let snapshot = match self.mark.take() {
            Some(s) => s,
            None => {
                debug_assert!(false, "reset without a mark");
                return;
            }
        };
        if let Some(rec) = self.recording.take() {
            for c in rec.into_iter().rev() {
                self.pending.push_front(c);
            }
        }
        self.last = snapshot.last;
        self.line_number = snapshot.line_number;
        self.position = snapshot.position;
    }

    /// Drop the active mark, keeping everything consumed since it.
    pub(crate) fn clear_mark(&mut self) {
        self.mark = None;
        self.recording = None;
    }

    /// Consume through the next LF, CR or CRLF and return the text before
    /// it, or `None` at end of input. The terminator is dropped. Only used
    /// for comment bodies; field content never goes through here.
    pub(crate) fn read_line(&mut self) -> io::Result<Option<String>> {
        if self.peek()?.is_none() {
            return Ok(None);
        }
        let mut line = String::new();
        while let Some(c) = self.read()? {
            if c == CR {
                if self.peek()? == Some(LF) {
                    self.read()?;
                }
                break;
            }
            if c == LF {
                break;
            }
            line.push(c);
        }
        Ok(Some(line))
    }

    fn next_raw(&mut self) -> io::Result<Option<char>> {
        if let Some(c) = self.pending.pop_front() {
            return Ok(Some(c));
        }
        self.decode()
    }

    /// Decode one UTF-8 character from the underlying bytes.
    fn decode(&mut self) -> io::Result<Option<char>> {
        let first = {
            let buf = self.rdr.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            buf[0]
        };
        let len = match utf8_len(first) {
            Some(len) => len,
            None => return Err(invalid_utf8()),
        };
        self.rdr.consume(1);
        if len == 1 {
            return Ok(Some(first as char));
        }
        let mut bytes = [first, 0, 0, 0];
        for slot in bytes.iter_mut().take(len).skip(1) {
            let b = {
                let buf = self.rdr.fill_buf()?;
                if buf.is_empty() {
                    return Err(invalid_utf8());
                }
                buf[0]
            };
            *slot = b;
            self.rdr.consume(1);
        }
        match std::str::from_utf8(&bytes[..len]) {
            Ok(s) => Ok(s.chars().next()),
            Err(_) => Err(invalid_utf8()),
        }
    }
}

fn utf8_len(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7f => Some(1),
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

fn invalid_utf8() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        "stream did not contain valid UTF-8",
    )
}

#[cfg(test)]
mod tests {
    use super::{CharReader, Last};

    fn rdr(s: &str) -> CharReader<&[u8]> {
        CharReader::new(s.as_bytes())
    }

    fn drain(r: &mut CharReader<&[u8]>) -> String {
        let mut out = String::new();
        while let Some(c) = r.read().unwrap() {
            out.push(c);
        }
        out
    }

    #[test]
    fn read_tracks_position_and_last() {
        let mut r = rdr("abc");
        assert_eq!(r.last_char(), Last::None);
        assert_eq!(r.read().unwrap(), Some('a'));
        assert_eq!(r.last_char(), Last::Char('a'));
        assert_eq!(r.position(), 1);
        assert_eq!(drain(&mut r), "bc");
        assert_eq!(r.position(), 3);
        assert_eq!(r.read().unwrap(), None);
        assert_eq!(r.last_char(), Last::Eof);
        // Position counts characters, not reads at end of input.
        assert_eq!(r.position(), 3);
    }

    #[test]
    fn crlf_counts_as_one_line() {
        let mut r = rdr("a\r\nb\nc\rd");
        drain(&mut r);
        r.read().unwrap();
        // Three terminators plus the final unterminated line.
        assert_eq!(r.line_number(), 4);
    }

    #[test]
    fn line_number_names_the_current_line() {
        let mut r = rdr("a\nb");
        assert_eq!(r.line_number(), 0);
        r.read().unwrap();
        assert_eq!(r.line_number(), 1);
        r.read().unwrap(); // the LF
        assert_eq!(r.line_number(), 1);
        r.read().unwrap(); // 'b'
        assert_eq!(r.line_number(), 2);
        r.read().unwrap(); // EOF
        assert_eq!(r.line_number(), 2);
        r.read().unwrap(); // EOF is sticky
        assert_eq!(r.line_number(), 2);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut r = rdr("xy");
        assert_eq!(r.peek().unwrap(), Some('x'));
        assert_eq!(r.peek().unwrap(), Some('x'));
        assert_eq!(r.position(), 0);
        assert_eq!(r.last_char(), Last::None);
        assert_eq!(r.read().unwrap(), Some('x'));
        assert_eq!(r.read().unwrap(), Some('y'));
        assert_eq!(r.peek().unwrap(), None);
    }

    #[test]
    fn mark_reset_replays() {
        let mut r = rdr("one\ntwo");
        r.read().unwrap();
        r.mark();
        assert_eq!(drain(&mut r), "ne\ntwo");
        r.reset();
        assert_eq!(r.position(), 1);
        assert_eq!(r.last_char(), Last::Char('o'));
        assert_eq!(r.line_number(), 1);
        assert_eq!(drain(&mut r), "ne\ntwo");
        assert_eq!(r.position(), 7);
    }

    #[test]
    fn read_line_drops_any_terminator() {
        let mut r = rdr("one\r\ntwo\nthree\rfour");
        assert_eq!(r.read_line().unwrap().as_deref(), Some("one"));
        assert_eq!(r.read_line().unwrap().as_deref(), Some("two"));
        assert_eq!(r.read_line().unwrap().as_deref(), Some("three"));
        assert_eq!(r.read_line().unwrap().as_deref(), Some("four"));
        assert_eq!(r.read_line().unwrap(), None);
        assert_eq!(r.line_number(), 4);
        assert_eq!(r.position(), 19);
    }

    #[test]
    fn bulk_read_accounts_lines() {
        let mut r = rdr("a\r\nb\nc");
        let mut buf = ['\0'; 4];
        assert_eq!(r.read_chars(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], &['a', '\r', '\n', 'b']);
        assert_eq!(r.line_number(), 2);
        assert_eq!(r.read_chars(&mut buf).unwrap(), 2);
        assert_eq!(r.read_chars(&mut buf).unwrap(), 0);
        assert_eq!(r.position(), 6);
    }

    #[test]
    fn multibyte_characters_count_once() {
        let mut r = rdr("ä,日\n");
        assert_eq!(r.read().unwrap(), Some('ä'));
        assert_eq!(r.position(), 1);
        assert_eq!(drain(&mut r), ",日\n");
        assert_eq!(r.position(), 4);
    }

    #[test]
    fn invalid_utf8_is_an_io_error() {
        let mut r = CharReader::new(&b"a\xffb"[..]);
        assert_eq!(r.read().unwrap(), Some('a'));
        let err = r.read().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}

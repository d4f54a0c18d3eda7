use std::io;

use log::trace;

use crate::buffer::{CharReader, Last};
use crate::chars::{
    self, BACKSPACE, CR, CRLF, CR_STR, FF, LF, LF_STR, TAB,
};
use crate::error::{new_error, ErrorKind, Result};
use crate::format::Format;

/// What a token stands for in the stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TokenKind {
    /// Nothing decided yet; never escapes the lexer.
    Invalid,
    /// A field, with more fields following in the same record.
    Field,
    /// A field that closes its record.
    EndOfRecord,
    /// A comment line body.
    Comment,
    /// End of input.
    Eof,
}

/// Mutable scratch filled by [`Lexer::next_token`]. Callers keep one
/// around and hand it back in so the content buffer is reused.
#[derive(Debug)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) content: String,
    /// The field exactly as it appeared on input: quotes kept, escape
    /// sequences unexpanded, surrounding whitespace already dropped. The
    /// null-string comparison runs against this, so an escaped or quoted
    /// rendition of the sentinel stays a literal value.
    pub(crate) raw: String,
    /// True when an `Eof` token still carries a final field (content
    /// accumulated, or an empty field owed after a trailing delimiter).
    pub(crate) is_ready: bool,
}

impl Token {
    pub(crate) fn new() -> Token {
        Token {
            kind: TokenKind::Invalid,
            content: String::new(),
            raw: String::new(),
            is_ready: false,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.kind = TokenKind::Invalid;
        self.content.clear();
        self.raw.clear();
        self.is_ready = false;
    }
}

/// Transforms a character stream into a token stream under the rules of
/// one [`Format`].
///
/// The scan runs in two modes, unquoted and quoted, switching on the
/// quote character at field starts. All position and line reporting comes
/// from the underlying [`CharReader`].
#[derive(Debug)]
pub(crate) struct Lexer<R> {
    reader: CharReader<R>,
    delimiter: Vec<char>,
    delimiter_text: String,
    quote: Option<char>,
    escape: Option<char>,
    comment: Option<char>,
    ignore_surrounding_spaces: bool,
    ignore_empty_lines: bool,
    lenient_eof: bool,
    trailing_data: bool,
    /// The first record terminator seen on input.
    first_eol: Option<&'static str>,
    /// Whether the previous token ended at a delimiter; an EOF right
    /// after one still owes an empty final field.
    last_token_was_delimiter: bool,
}

fn is_start_of_line(last: Last) -> bool {
    matches!(last, Last::None | Last::Char(CR) | Last::Char(LF))
}

impl<R: io::Read> Lexer<R> {
    pub(crate) fn new(format: &Format, reader: CharReader<R>) -> Lexer<R> {
        Lexer {
            reader,
            delimiter: format.delimiter.chars().collect(),
            delimiter_text: format.delimiter.clone(),
            quote: format.quote,
            escape: format.escape,
            comment: format.comment,
            ignore_surrounding_spaces: format.ignore_surrounding_spaces,
            ignore_empty_lines: format.ignore_empty_lines,
            lenient_eof: format.lenient_eof,
            trailing_data: format.trailing_data,
            first_eol: None,
            last_token_was_delimiter: false,
        }
    }

    pub(crate) fn line_number(&self) -> u64 {
        self.reader.line_number()
    }

    pub(crate) fn position(&self) -> u64 {
        self.reader.position()
    }

    /// The first record terminator encountered: `"\n"`, `"\r"` or
    /// `"\r\n"`.
    pub(crate) fn first_end_of_line(&self) -> Option<&'static str> {
        self.first_eol
    }

    /// Produce the next token into `token`.
    pub(crate) fn next_token(&mut self, token: &mut Token) -> Result<()> {
        token.reset();

        let mut last = self.reader.last_char();
        let mut c = self.reader.read()?;
        let mut eol = self.read_end_of_line(c)?;

        if self.ignore_empty_lines {
            while eol && is_start_of_line(last) {
                last = self.reader.last_char();
                c = self.reader.read()?;
                eol = self.read_end_of_line(c)?;
                if c.is_none() {
                    token.kind = TokenKind::Eof;
                    return Ok(());
                }
            }
        }

        if last == Last::Eof
            || (!self.last_token_was_delimiter && c.is_none())
        {
            token.kind = TokenKind::Eof;
            return Ok(());
        }

        if is_start_of_line(last) && self.is_comment_start(c) {
            let line = match self.reader.read_line()? {
                None => {
                    token.kind = TokenKind::Eof;
                    return Ok(());
                }
                Some(line) => line,
            };
            // One leading space separates the marker from the body.
            let body = line.strip_prefix(' ').unwrap_or(&line);
            token.content.push_str(body);
            token.kind = TokenKind::Comment;
            trace!("comment token: {:?}", token.content);
            return Ok(());
        }

        while token.kind == TokenKind::Invalid {
            if self.ignore_surrounding_spaces {
                while !eol && self.is_field_whitespace(c) {
                    c = self.reader.read()?;
                    eol = self.read_end_of_line(c)?;
                }
            }
            if self.is_delimiter(c)? {
                token.kind = TokenKind::Field;
            } else if eol {
                token.kind = TokenKind::EndOfRecord;
            } else if self.is_quote(c) {
                if let Some(q) = c {
                    token.raw.push(q);
                }
                self.parse_encapsulated(token)?;
            } else if c.is_none() {
                token.kind = TokenKind::Eof;
                token.is_ready = true;
            } else {
                self.parse_simple(token, c)?;
            }
        }
        Ok(())
    }

    /// Scan an unquoted field starting at `c`.
    fn parse_simple(
        &mut self,
        token: &mut Token,
        mut c: Option<char>,
    ) -> Result<()> {
        loop {
            if self.read_end_of_line(c)? {
                token.kind = TokenKind::EndOfRecord;
                break;
            }
            let ch = match c {
                None => {
                    token.kind = TokenKind::Eof;
                    token.is_ready = true;
                    break;
                }
                Some(ch) => ch,
            };
            if self.is_delimiter(c)? {
                token.kind = TokenKind::Field;
                break;
            }
            if self.is_escape(ch) {
                token.raw.push(ch);
                self.append_escaped(token)?;
            } else {
                token.content.push(ch);
                token.raw.push(ch);
            }
            c = self.reader.read()?;
        }
        if self.ignore_surrounding_spaces {
            trim_trailing_spaces(&mut token.content);
            trim_trailing_spaces(&mut token.raw);
        }
        Ok(())
    }

    /// Scan a quoted field; the opening quote has been consumed.
    fn parse_encapsulated(&mut self, token: &mut Token) -> Result<()> {
        let start_line = self.reader.line_number();
        loop {
            let c = self.reader.read()?;
            match c {
                Some(ch) if self.is_quote(Some(ch)) => {
                    token.raw.push(ch);
                    let peeked = self.reader.peek()?;
                    if self.is_quote(peeked) {
                        // Doubled quote: one literal quote.
                        if let Some(q) = self.reader.read()? {
                            token.content.push(q);
                            token.raw.push(q);
                        }
                    } else {
                        return self.finish_encapsulated(token);
                    }
                }
                Some(ch) if self.is_escape(ch) => {
                    token.raw.push(ch);
                    self.append_escaped(token)?;
                }
                Some(ch) => {
                    token.content.push(ch);
                    token.raw.push(ch);
                }
                None => {
                    if self.lenient_eof {
                        token.kind = TokenKind::Eof;
                        token.is_ready = true;
                        return Ok(());
                    }
                    return Err(self.parse_error(format!(
                        "end of input reached before the quoted field \
                         starting on line {} was closed",
                        start_line
                    )));
                }
            }
        }
    }

    /// Consume what follows a closing quote, up to the delimiter or
    /// record terminator.
    fn finish_encapsulated(&mut self, token: &mut Token) -> Result<()> {
        loop {
            let c = self.reader.read()?;
            if self.is_delimiter(c)? {
                token.kind = TokenKind::Field;
                return Ok(());
            }
            let ch = match c {
                None => {
                    token.kind = TokenKind::Eof;
                    token.is_ready = true;
                    return Ok(());
                }
                Some(ch) => ch,
            };
            if self.read_end_of_line(c)? {
                token.kind = TokenKind::EndOfRecord;
                return Ok(());
            }
            if self.trailing_data {
                token.content.push(ch);
                token.raw.push(ch);
            } else if !chars::is_trim_char(ch) {
                return Err(self.parse_error(format!(
                    "invalid character {:?} between a quoted field and \
                     the next delimiter",
                    ch
                )));
            }
        }
    }

    /// Decode the character following an escape char and append the
    /// translation; the escape char itself is already in `raw`.
    fn append_escaped(&mut self, token: &mut Token) -> Result<()> {
        let c = match self.reader.read()? {
            None => {
                return Err(self
                    .parse_error("escape at end of input".to_string()));
            }
            Some(c) => c,
        };
        token.raw.push(c);
        match c {
            'r' => token.content.push(CR),
            'n' => token.content.push(LF),
            't' => token.content.push(TAB),
            'b' => token.content.push(BACKSPACE),
            'f' => token.content.push(FF),
            CR | LF | FF | TAB | BACKSPACE => token.content.push(c),
            c if self.is_meta_char(c) => token.content.push(c),
            // Unknown sequence: both characters pass through, so MySQL's
            // \N marker survives the scan.
            c => {
                if let Some(escape) = self.escape {
                    token.content.push(escape);
                }
                token.content.push(c);
            }
        }
        Ok(())
    }

    /// Collapse CRLF and answer whether `c` terminated a record. Records
    /// the first terminator seen.
    fn read_end_of_line(&mut self, c: Option<char>) -> Result<bool> {
        let mut ch = match c {
            None => return Ok(false),
            Some(ch) => ch,
        };
        if ch == CR && self.reader.peek()? == Some(LF) {
            self.reader.read()?;
            ch = LF;
            if self.first_eol.is_none() {
                self.first_eol = Some(CRLF);
            }
        }
        if self.first_eol.is_none() {
            if ch == LF {
                self.first_eol = Some(LF_STR);
            } else if ch == CR {
                self.first_eol = Some(CR_STR);
            }
        }
        Ok(ch == CR || ch == LF)
    }

    /// Whether the delimiter string starts at `c`; consumes the remaining
    /// delimiter characters on a full match, restores them otherwise.
    fn is_delimiter(&mut self, c: Option<char>) -> Result<bool> {
        self.last_token_was_delimiter = false;
        let c = match c {
            None => return Ok(false),
            Some(c) => c,
        };
        if c != self.delimiter[0] {
            return Ok(false);
        }
        if self.delimiter.len() == 1 {
            self.last_token_was_delimiter = true;
            return Ok(true);
        }
        self.reader.mark();
        for i in 1..self.delimiter.len() {
            if self.reader.read()? != Some(self.delimiter[i]) {
                self.reader.reset();
                return Ok(false);
            }
        }
        self.reader.clear_mark();
        self.last_token_was_delimiter = true;
        Ok(true)
    }

    fn is_quote(&self, c: Option<char>) -> bool {
        c.is_some() && c == self.quote
    }

    fn is_escape(&self, c: char) -> bool {
        Some(c) == self.escape
    }

    fn is_comment_start(&self, c: Option<char>) -> bool {
        c.is_some() && c == self.comment
    }

    fn is_field_whitespace(&self, c: Option<char>) -> bool {
        match c {
            Some(c) => chars::is_whitespace(c, &self.delimiter_text),
            None => false,
        }
    }

    fn is_meta_char(&self, c: char) -> bool {
        c == self.delimiter[0]
            || Some(c) == self.escape
            || Some(c) == self.quote
            || Some(c) == self.comment
    }

    fn parse_error(&self, message: String) -> crate::Error {
        new_error(ErrorKind::Parse {
            line: self.reader.line_number(),
            position: self.reader.position(),
            message,
        })
    }
}

fn trim_trailing_spaces(content: &mut String) {
    let keep = content.trim_end_matches(chars::is_trim_char).len();
    content.truncate(keep);
}

use std::collections::HashSet;
use std::io;
use std::sync::Arc;

use log::debug;

use crate::buffer::CharReader;
use crate::error::{new_error, ErrorKind, Result};
use crate::format::{DuplicateHeaderMode, Format, Header};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::record::{Headers, Record};

/// A streaming parser producing [`Record`]s from a character source under
/// one [`Format`].
///
/// A parser is built over any [`io::Read`] yielding UTF-8. The header,
/// when the format defines one, is read (or installed) at construction;
/// records then come one at a time from [`next_record`](Parser::next_record)
/// or through the [`records`](Parser::records) iterator.
///
/// # Example
///
/// ```
/// use charsep::{Format, Parser};
///
/// # fn example() -> Result<(), charsep::Error> {
/// let data = "\
/// city,country,pop
/// Boston,United States,4628910
/// ";
/// let format = Format::builder()
///     .header(Some(charsep::Header::FirstRecord))
///     .build()?;
/// let mut parser = Parser::new(data.as_bytes(), format)?;
/// for result in parser.records() {
///     let record = result?;
///     assert_eq!(record.get_by_name("city")?, Some("Boston"));
/// }
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
///
/// A parser is single-pass: the record sequence cannot be restarted, and
/// dropping the parser is what releases the underlying source. To resume
/// a stream mid-way, position the source at a previously recorded offset
/// and use [`Parser::with_position`].
#[derive(Debug)]
pub struct Parser<R> {
    lexer: Lexer<R>,
    format: Format,
    token: Token,
    headers: Option<Arc<Headers>>,
    header_comment: Option<String>,
    trailer_comment: Option<String>,
    record_number: u64,
    char_offset_base: u64,
}

impl<R: io::Read> Parser<R> {
    /// Create a parser reading from the start of `rdr`.
    ///
    /// Fails on header errors: a missing name (unless
    /// `allow_missing_column_names`), or a duplicate one under the active
    /// [`DuplicateHeaderMode`].
    pub fn new(rdr: R, format: Format) -> Result<Parser<R>> {
        Parser::with_position(rdr, format, 0, 0)
    }

    /// Create a parser resuming a stream mid-way.
    ///
    /// `rdr` must already be positioned at a record boundary;
    /// `record_number` is how many records precede that point and
    /// `char_offset` its absolute character position. The next record
    /// parsed reports `record_number + 1`, and all positions are reported
    /// relative to the original stream.
    pub fn with_position(
        rdr: R,
        format: Format,
        record_number: u64,
        char_offset: u64,
    ) -> Result<Parser<R>> {
        let lexer = Lexer::new(&format, CharReader::new(rdr));
        let mut parser = Parser {
            lexer,
            format,
            token: Token::new(),
            headers: None,
            header_comment: None,
            trailer_comment: None,
            record_number: 0,
            char_offset_base: char_offset,
        };
        parser.init_headers()?;
        // Header consumption above is not part of the record count.
        parser.record_number = record_number;
        Ok(parser)
    }

    /// The format this parser runs under.
    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Parse the next record, or `Ok(None)` at end of input.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let mut fields: Vec<Option<String>> = Vec::new();
        let mut comment: Option<String> = None;
        let start_offset = self.char_offset_base + self.lexer.position();
        loop {
            self.lexer.next_token(&mut self.token)?;
            match self.token.kind {
                TokenKind::Field => self.add_value(&mut fields, false),
                TokenKind::EndOfRecord => {
                    self.add_value(&mut fields, true);
                    break;
                }
                TokenKind::Eof => {
                    if self.token.is_ready {
                        self.add_value(&mut fields, true);
                    } else if comment.is_some() {
                        self.trailer_comment = comment.take();
                    }
                    break;
                }
                TokenKind::Comment => match comment.as_mut() {
                    None => comment = Some(self.token.content.clone()),
                    Some(s) => {
                        s.push('\n');
                        s.push_str(&self.token.content);
                    }
                },
                TokenKind::Invalid => {
                    return Err(new_error(ErrorKind::Parse {
                        line: self.lexer.line_number(),
                        position: self.lexer.position(),
                        message: "invalid parse sequence".to_string(),
                    }));
                }
            }
        }
        if fields.is_empty() {
            return Ok(None);
        }
        self.record_number += 1;
        Ok(Some(Record::new(
            fields,
            self.record_number,
            start_offset,
            comment,
            self.headers.clone(),
        )))
    }

    /// A borrowed iterator over the remaining records.
    ///
    /// The sequence is lazy, finite and single-pass; it serves exactly one
    /// consumer.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { parser: self }
    }

    /// An owned iterator over the remaining records.
    pub fn into_records(self) -> IntoRecords<R> {
        IntoRecords { parser: self }
    }

    /// The header lookup, when the format defines a header.
    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_deref()
    }

    /// The header names in column order, when the format defines a
    /// header.
    pub fn header_names(&self) -> Option<&[String]> {
        self.headers.as_deref().map(Headers::names)
    }

    /// The comment lines preceding the header, joined with `\n`.
    pub fn header_comment(&self) -> Option<&str> {
        self.header_comment.as_deref()
    }

    /// The comment lines after the last record, joined with `\n`. Only
    /// populated once the stream has been read to its end.
    pub fn trailer_comment(&self) -> Option<&str> {
        self.trailer_comment.as_deref()
    }

    /// The line currently being read.
    pub fn line_number(&self) -> u64 {
        self.lexer.line_number()
    }

    /// The absolute character position of the parser.
    pub fn position(&self) -> u64 {
        self.char_offset_base + self.lexer.position()
    }

    /// The number of records returned so far.
    pub fn record_number(&self) -> u64 {
        self.record_number
    }

    /// The first record terminator seen on input: `"\n"`, `"\r"` or
    /// `"\r\n"`.
    pub fn first_end_of_line(&self) -> Option<&str> {
        self.lexer.first_end_of_line()
    }

    /// Close the parser, releasing the underlying source.
    ///
    /// Dropping the parser does the same; this form only makes the intent
    /// explicit. The source is released exactly once either way.
    pub fn close(self) {}

    /// Trim, drop a trailing-delimiter artifact, map the null string, and
    /// push one field value.
    fn add_value(&mut self, fields: &mut Vec<Option<String>>, last: bool) {
        let cooked = self.format.trim_value(&self.token.content);
        if last && cooked.is_empty() && self.format.trailing_delimiter {
            return;
        }
        // Null is exchanged on the raw rendition: an escaped or quoted
        // spelling of the sentinel stays a literal value.
        let raw = self.format.trim_value(&self.token.raw);
        if self.format.is_null_string(raw) {
            fields.push(None);
        } else {
            fields.push(Some(cooked.to_string()));
        }
    }

    fn init_headers(&mut self) -> Result<()> {
        let cfg = match self.format.header.clone() {
            None => return Ok(()),
            Some(cfg) => cfg,
        };
        let names = match cfg {
            Header::FirstRecord => match self.next_record()? {
                // Nothing to read: no header map at all.
                None => return Ok(()),
                Some(rec) => {
                    self.header_comment =
                        rec.comment().map(str::to_string);
                    rec.iter()
                        .map(|f| f.unwrap_or("").to_string())
                        .collect()
                }
            },
            Header::Names(names) => {
                if self.format.skip_header_record {
                    if let Some(rec) = self.next_record()? {
                        self.header_comment =
                            rec.comment().map(str::to_string);
                    }
                }
                names
            }
        };
        self.validate_header_names(&names)?;
        debug!("header map built: {:?}", names);
        self.headers = Some(Arc::new(Headers::new(
            names,
            self.format.ignore_header_case,
        )));
        Ok(())
    }

    fn validate_header_names(&self, names: &[String]) -> Result<()> {
        let mode = self.format.duplicate_header_mode;
        let mut seen = HashSet::with_capacity(names.len());
        for name in names {
            let blank = name.trim().is_empty();
            if blank && !self.format.allow_missing_column_names {
                return Err(new_error(ErrorKind::Header(format!(
                    "a header name is missing in {:?}",
                    names
                ))));
            }
            let key = if blank {
                String::new()
            } else if self.format.ignore_header_case {
                name.to_lowercase()
            } else {
                name.clone()
            };
            let duplicate = !seen.insert(key);
            if duplicate
                && mode != DuplicateHeaderMode::AllowAll
                && !(blank && mode == DuplicateHeaderMode::AllowEmpty)
            {
                return Err(new_error(ErrorKind::Header(format!(
                    "the header contains a duplicate name: {:?} in {:?}",
                    name, names
                ))));
            }
        }
        Ok(())
    }
}

/// A borrowed iterator over records; see [`Parser::records`].
#[derive(Debug)]
pub struct Records<'r, R> {
    parser: &'r mut Parser<R>,
}

impl<'r, R: io::Read> Iterator for Records<'r, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        match self.parser.next_record() {
            Err(err) => Some(Err(err)),
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
        }
    }
}

/// An owned iterator over records; see [`Parser::into_records`].
#[derive(Debug)]
pub struct IntoRecords<R> {
    parser: Parser<R>,
}

impl<R: io::Read> IntoRecords<R> {
    /// The parser driving this iterator.
    pub fn parser(&self) -> &Parser<R> {
        &self.parser
    }
}

impl<R: io::Read> Iterator for IntoRecords<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        match self.parser.next_record() {
            Err(err) => Some(Err(err)),
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
        }
    }
}

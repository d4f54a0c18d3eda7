use std::fmt;
use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::write::EncoderWriter;
use log::debug;

use crate::buffer::CharReader;
use crate::chars;
use crate::error::Result;
use crate::format::{Format, Header, QuoteMode};

/// One output field, tagged by how the printer should treat it.
///
/// Numbers print unquoted under [`QuoteMode::NonNumeric`]; streams copy
/// through without buffering the whole value.
pub enum Field<'a> {
    /// The null value; printed as the format's null string.
    Null,
    /// Plain text.
    Text(&'a str),
    /// An integer, formatted without allocation.
    Int(i64),
    /// A float, formatted without allocation.
    Float(f64),
    /// A streaming producer of UTF-8 text, copied to the sink with
    /// quoting or escaping applied on the fly.
    CharStream(&'a mut dyn io::Read),
    /// A streaming producer of raw bytes, base64-encoded between quotes.
    ByteStream(&'a mut dyn io::Read),
}

impl fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Null => f.write_str("Null"),
            Field::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Field::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Field::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Field::CharStream(_) => f.write_str("CharStream(..)"),
            Field::ByteStream(_) => f.write_str("ByteStream(..)"),
        }
    }
}

impl<'a> From<&'a str> for Field<'a> {
    fn from(s: &'a str) -> Field<'a> {
        Field::Text(s)
    }
}

impl<'a> From<&'a String> for Field<'a> {
    fn from(s: &'a String) -> Field<'a> {
        Field::Text(s)
    }
}

impl<'a> From<Option<&'a str>> for Field<'a> {
    fn from(s: Option<&'a str>) -> Field<'a> {
        match s {
            None => Field::Null,
            Some(s) => Field::Text(s),
        }
    }
}

impl<'a> From<i64> for Field<'a> {
    fn from(n: i64) -> Field<'a> {
        Field::Int(n)
    }
}

impl<'a> From<i32> for Field<'a> {
    fn from(n: i32) -> Field<'a> {
        Field::Int(n as i64)
    }
}

impl<'a> From<u32> for Field<'a> {
    fn from(n: u32) -> Field<'a> {
        Field::Int(n as i64)
    }
}

impl<'a> From<f64> for Field<'a> {
    fn from(x: f64) -> Field<'a> {
        Field::Float(x)
    }
}

impl<'a> From<f32> for Field<'a> {
    fn from(x: f32) -> Field<'a> {
        Field::Float(x as f64)
    }
}

/// Emits records to a character sink, quoting and escaping fields as the
/// active [`Format`] demands.
///
/// Construction writes the configured header comments and the header row
/// (unless `skip_header_record`). Each record is then one
/// [`print_record`](Printer::print_record) call, or a run of
/// [`print_field`](Printer::print_field)s closed by
/// [`println`](Printer::println).
///
/// # Example
///
/// ```
/// use charsep::{Format, Printer};
///
/// # fn example() -> Result<(), charsep::Error> {
/// let mut printer = Printer::new(Vec::new(), Format::default())?;
/// printer.print_record(["a", "b,c"])?;
/// let out = printer.into_inner()?;
/// assert_eq!(out, b"a,\"b,c\"\r\n");
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
///
/// The sink is buffered internally and released exactly once, by
/// [`into_inner`](Printer::into_inner) or by drop. With `auto_flush` set
/// on the format, dropping the printer flushes first.
pub struct Printer<W: io::Write> {
    /// `None` only after `into_inner` has taken the sink.
    wtr: Option<io::BufWriter<W>>,
    format: Format,
    record_count: u64,
    new_record: bool,
}

impl<W: io::Write> Printer<W> {
    /// Create a printer over `wtr`, emitting header comments and the
    /// header row as configured.
    pub fn new(wtr: W, format: Format) -> Result<Printer<W>> {
        let mut printer = Printer {
            wtr: Some(io::BufWriter::new(wtr)),
            format,
            record_count: 0,
            new_record: true,
        };
        if printer.format.comment.is_some()
            && !printer.format.header_comments.is_empty()
        {
            let comments = printer.format.header_comments.clone();
            for line in &comments {
                printer.print_comment(line)?;
            }
        }
        if let Some(Header::Names(names)) = printer.format.header.clone() {
            if !printer.format.skip_header_record {
                debug!("writing header row: {:?}", names);
                printer.print_record(names.iter().map(Field::from))?;
            }
        }
        Ok(printer)
    }

    /// The format this printer runs under.
    pub fn format(&self) -> &Format {
        &self.format
    }

    /// The number of records written, the header row included.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Print the fields of one record and close it with
    /// [`println`](Printer::println).
    pub fn print_record<'f, I, F>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = F>,
        F: Into<Field<'f>>,
    {
        for field in fields {
            self.print_field(field)?;
        }
        self.println()
    }

    /// Print one field, preceded by the delimiter when it is not the
    /// first of its record.
    pub fn print_field<'f, F: Into<Field<'f>>>(
        &mut self,
        field: F,
    ) -> Result<()> {
        let field = field.into();
        let new_record = self.new_record;
        if !new_record {
            self.write_delimiter()?;
        }
        self.new_record = false;
        match field {
            Field::Null => self.write_null()?,
            Field::Text(s) => self.print_text(s, false, new_record)?,
            Field::Int(n) => {
                let mut buf = itoa::Buffer::new();
                let s = buf.format(n);
                self.print_text(s, true, new_record)?;
            }
            Field::Float(x) => {
                let mut buf = ryu::Buffer::new();
                let s = buf.format(x);
                self.print_text(s, true, new_record)?;
            }
            Field::CharStream(rdr) => self.print_char_stream(rdr)?,
            Field::ByteStream(rdr) => self.print_byte_stream(rdr)?,
        }
        Ok(())
    }

    /// Close the current record: the trailing delimiter when configured,
    /// then the record separator when one is set.
    pub fn println(&mut self) -> Result<()> {
        if self.format.trailing_delimiter {
            self.write_delimiter()?;
        }
        let w = sink(&mut self.wtr);
        if let Some(ref sep) = self.format.record_separator {
            w.write_all(sep.as_bytes())?;
        }
        self.record_count += 1;
        self.new_record = true;
        Ok(())
    }

    /// Print `comment` as comment lines, one per embedded line break.
    ///
    /// Does nothing when the format has no comment marker.
    pub fn print_comment(&mut self, comment: &str) -> Result<()> {
        let marker = match self.format.comment {
            None => return Ok(()),
            Some(marker) => marker,
        };
        let normalized =
            comment.replace(chars::CRLF, "\n").replace(chars::CR, "\n");
        for line in normalized.split('\n') {
            self.write_char(marker)?;
            self.write_char(chars::SP)?;
            self.write_str(line)?;
            let w = sink(&mut self.wtr);
            if let Some(ref sep) = self.format.record_separator {
                w.write_all(sep.as_bytes())?;
            }
        }
        self.new_record = true;
        Ok(())
    }

    /// Flush buffered output through to the sink.
    pub fn flush(&mut self) -> io::Result<()> {
        match self.wtr.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }

    /// Flush and return the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        let wtr = match self.wtr.take() {
            Some(wtr) => wtr,
            None => unreachable!(),
        };
        wtr.into_inner().map_err(|err| err.into_error().into())
    }

    fn write_str(&mut self, s: &str) -> Result<()> {
        sink(&mut self.wtr).write_all(s.as_bytes())?;
        Ok(())
    }

    fn write_char(&mut self, c: char) -> Result<()> {
        let mut buf = [0; 4];
        sink(&mut self.wtr)
            .write_all(c.encode_utf8(&mut buf).as_bytes())?;
        Ok(())
    }

    fn write_delimiter(&mut self) -> Result<()> {
        let w = sink(&mut self.wtr);
        w.write_all(self.format.delimiter.as_bytes())?;
        Ok(())
    }

    /// The null value: the null string when one is configured (wrapped in
    /// quotes only under [`QuoteMode::All`]), otherwise nothing.
    fn write_null(&mut self) -> Result<()> {
        let w = sink(&mut self.wtr);
        let ns = match self.format.null_string {
            None => return Ok(()),
            Some(ref ns) => ns,
        };
        let mut buf = [0; 4];
        if let (Some(QuoteMode::All), Some(quote)) =
            (self.format.quote_mode, self.format.quote)
        {
            let quote = quote.encode_utf8(&mut buf).as_bytes();
            w.write_all(quote)?;
            w.write_all(ns.as_bytes())?;
            w.write_all(quote)?;
        } else {
            w.write_all(ns.as_bytes())?;
        }
        Ok(())
    }

    fn print_text(
        &mut self,
        value: &str,
        numeric: bool,
        new_record: bool,
    ) -> Result<()> {
        let value = self.format.trim_value(value);
        match self.format.quote {
            Some(quote) => {
                self.print_with_quotes(value, numeric, new_record, quote)
            }
            None if self.format.escape.is_some() => {
                self.print_with_escapes(value)
            }
            None => self.write_str(value),
        }
    }

    fn print_with_quotes(
        &mut self,
        value: &str,
        numeric: bool,
        new_record: bool,
        quote: char,
    ) -> Result<()> {
        let mode = self.format.quote_mode.unwrap_or(QuoteMode::Minimal);
        if mode == QuoteMode::None {
            return self.print_with_escapes(value);
        }
        // Without an escape char, the quote escapes itself by doubling.
        let escape = self.format.escape.unwrap_or(quote);
        let wrap = match mode {
            QuoteMode::All | QuoteMode::AllNonNull => true,
            QuoteMode::NonNumeric => !numeric,
            QuoteMode::Minimal => minimal_needs_quotes(
                value,
                new_record,
                quote,
                escape,
                &self.format.delimiter,
            ),
            QuoteMode::None => unreachable!(),
        };
        if !wrap {
            return self.write_str(value);
        }
        self.write_char(quote)?;
        for c in value.chars() {
            if c == quote || c == escape {
                self.write_char(escape)?;
            }
            self.write_char(c)?;
        }
        self.write_char(quote)
    }

    fn print_with_escapes(&mut self, value: &str) -> Result<()> {
        let escape = match self.format.escape {
            None => return self.write_str(value),
            Some(escape) => escape,
        };
        let delimiter = self.format.delimiter.clone();
        let mut idx = 0;
        while idx < value.len() {
            let rest = &value[idx..];
            if rest.starts_with(&*delimiter) {
                for c in delimiter.chars() {
                    self.write_char(escape)?;
                    self.write_char(c)?;
                }
                idx += delimiter.len();
                continue;
            }
            let c = match rest.chars().next() {
                Some(c) => c,
                None => break,
            };
            match c {
                chars::CR => {
                    self.write_char(escape)?;
                    self.write_char('r')?;
                }
                chars::LF => {
                    self.write_char(escape)?;
                    self.write_char('n')?;
                }
                c if c == escape => {
                    self.write_char(escape)?;
                    self.write_char(escape)?;
                }
                c => self.write_char(c)?,
            }
            idx += c.len_utf8();
        }
        Ok(())
    }

    /// Copy a character stream to the sink under the quoting policy,
    /// without buffering the value.
    fn print_char_stream(&mut self, rdr: &mut dyn io::Read) -> Result<()> {
        match self.format.quote {
            Some(_) if self.format.quote_mode == Some(QuoteMode::None) => {
                self.escape_stream(rdr)
            }
            Some(quote) => {
                self.write_char(quote)?;
                let mut stream = CharReader::new(rdr);
                while let Some(c) = stream.read()? {
                    self.write_char(c)?;
                    if c == quote {
                        self.write_char(quote)?;
                    }
                }
                self.write_char(quote)
            }
            None if self.format.escape.is_some() => self.escape_stream(rdr),
            None => {
                io::copy(rdr, sink(&mut self.wtr))?;
                Ok(())
            }
        }
    }

    fn escape_stream(&mut self, rdr: &mut dyn io::Read) -> Result<()> {
        let escape = match self.format.escape {
            None => {
                io::copy(rdr, sink(&mut self.wtr))?;
                return Ok(());
            }
            Some(escape) => escape,
        };
        let delimiter: Vec<char> = self.format.delimiter.chars().collect();
        let mut stream = CharReader::new(rdr);
        while let Some(c) = stream.read()? {
            if c == delimiter[0] {
                let matched = if delimiter.len() == 1 {
                    true
                } else {
                    stream.mark();
                    let mut all = true;
                    for &expected in &delimiter[1..] {
                        if stream.read()? != Some(expected) {
                            all = false;
                            break;
                        }
                    }
                    if all {
                        stream.clear_mark();
                    } else {
                        stream.reset();
                    }
                    all
                };
                if matched {
                    for &d in &delimiter {
                        self.write_char(escape)?;
                        self.write_char(d)?;
                    }
                    continue;
                }
            }
            match c {
                chars::CR => {
                    self.write_char(escape)?;
                    self.write_char('r')?;
                }
                chars::LF => {
                    self.write_char(escape)?;
                    self.write_char('n')?;
                }
                c if c == escape => {
                    self.write_char(escape)?;
                    self.write_char(escape)?;
                }
                c => self.write_char(c)?,
            }
        }
        Ok(())
    }

    /// Base64-encode a byte stream between quotes, streaming through a
    /// fixed-size encoder rather than buffering the value.
    fn print_byte_stream(&mut self, rdr: &mut dyn io::Read) -> Result<()> {
        if let Some(quote) = self.format.quote {
            self.write_char(quote)?;
        }
        {
            let w = sink(&mut self.wtr);
            let mut enc = EncoderWriter::new(&mut *w, &BASE64);
            io::copy(rdr, &mut enc)?;
            enc.finish()?;
        }
        if let Some(quote) = self.format.quote {
            self.write_char(quote)?;
        }
        Ok(())
    }
}

impl<W: io::Write> Drop for Printer<W> {
    fn drop(&mut self) {
        if self.format.auto_flush {
            let _ = self.flush();
        }
    }
}

impl<W: io::Write> fmt::Debug for Printer<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Printer")
            .field("format", &self.format)
            .field("record_count", &self.record_count)
            .finish()
    }
}

fn sink<W: io::Write>(
    wtr: &mut Option<io::BufWriter<W>>,
) -> &mut io::BufWriter<W> {
    match wtr.as_mut() {
        Some(w) => w,
        // Only into_inner empties the slot, and it consumes the printer.
        None => unreachable!(),
    }
}

/// The `Minimal` decision: quote an empty field opening a record, a field
/// starting at or below `#`, any field containing a special character or
/// the delimiter, and a field ending in a trim character.
fn minimal_needs_quotes(
    value: &str,
    new_record: bool,
    quote: char,
    escape: char,
    delimiter: &str,
) -> bool {
    let first = match value.chars().next() {
        // An empty field opening a record must be quoted, or the line
        // would read as no record at all.
        None => return new_record,
        Some(first) => first,
    };
    if first <= chars::COMMENT {
        return true;
    }
    for (i, c) in value.char_indices() {
        if c == chars::CR
            || c == chars::LF
            || c == quote
            || c == escape
            || value[i..].starts_with(delimiter)
        {
            return true;
        }
    }
    match value.chars().last() {
        Some(last) => chars::is_trim_char(last),
        None => false,
    }
}

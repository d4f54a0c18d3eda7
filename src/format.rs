use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chars;
use crate::error::{new_error, ErrorKind, Result};
use crate::printer::{Field, Printer};

/// The policy governing when an output field is wrapped in quotes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum QuoteMode {
    /// Quote every field.
    All,
    /// Quote every field that is not the null value.
    AllNonNull,
    /// Quote only fields that need it: an empty field at the start of a
    /// record, a field starting at or below `#`, a field containing the
    /// quote char, the escape char, a line break or the delimiter, or a
    /// field ending in a trim character.
    ///
    /// This is the behavior of an unset quote mode.
    Minimal,
    /// Quote every field that was not supplied as a number.
    NonNumeric,
    /// Never quote; special characters are escaped instead. Requires an
    /// escape char.
    None,
}

/// The policy governing repeated column names in an explicit or parsed
/// header.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DuplicateHeaderMode {
    /// Any name may repeat.
    AllowAll,
    /// Only blank names may repeat.
    AllowEmpty,
    /// No name may repeat.
    Disallow,
}

/// The header configuration of a [`Format`].
///
/// An unset header is represented as `None` at the `Format` level; this
/// type distinguishes the two set variants.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Header {
    /// Take the column names from the first record of the input.
    FirstRecord,
    /// Use this fixed list of column names.
    Names(Vec<String>),
}

/// An immutable, validated dialect configuration.
///
/// A `Format` carries everything the lexer, parser and printer need to
/// agree on one CSV dialect: the delimiter, quoting and escaping rules,
/// comment handling, header configuration and output policies. Values are
/// built with a [`FormatBuilder`] (see [`Format::builder`]) or taken from
/// one of the predefined dialects such as [`Format::rfc4180`] or
/// [`Format::mysql`].
///
/// # Example
///
/// ```
/// use charsep::Format;
///
/// let format = Format::builder()
///     .delimiter(";")
///     .quote(Some('\''))
///     .build()
///     .unwrap();
/// assert_eq!(format.delimiter(), ";");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Format {
    pub(crate) delimiter: String,
    pub(crate) quote: Option<char>,
    pub(crate) escape: Option<char>,
    pub(crate) comment: Option<char>,
    pub(crate) record_separator: Option<String>,
    pub(crate) null_string: Option<String>,
    pub(crate) header: Option<Header>,
    pub(crate) header_comments: Vec<String>,
    pub(crate) skip_header_record: bool,
    pub(crate) ignore_surrounding_spaces: bool,
    pub(crate) ignore_empty_lines: bool,
    pub(crate) ignore_header_case: bool,
    pub(crate) trim: bool,
    pub(crate) trailing_delimiter: bool,
    pub(crate) quote_mode: Option<QuoteMode>,
    pub(crate) duplicate_header_mode: DuplicateHeaderMode,
    pub(crate) allow_missing_column_names: bool,
    pub(crate) lenient_eof: bool,
    pub(crate) trailing_data: bool,
    pub(crate) auto_flush: bool,
}

impl Default for Format {
    /// The comma-separated default dialect: `,` delimiter, `"` quote, CRLF
    /// record separator, empty lines ignored, duplicate header names
    /// allowed.
    fn default() -> Format {
        Format {
            delimiter: ",".to_string(),
            quote: Some('"'),
            escape: None,
            comment: None,
            record_separator: Some(chars::CRLF.to_string()),
            null_string: None,
            header: None,
            header_comments: Vec::new(),
            skip_header_record: false,
            ignore_surrounding_spaces: false,
            ignore_empty_lines: true,
            ignore_header_case: false,
            trim: false,
            trailing_delimiter: false,
            quote_mode: None,
            duplicate_header_mode: DuplicateHeaderMode::AllowAll,
            allow_missing_column_names: false,
            lenient_eof: false,
            trailing_data: false,
            auto_flush: false,
        }
    }
}

impl Format {
    /// Start configuring a format from the default dialect.
    pub fn builder() -> FormatBuilder {
        FormatBuilder::new()
    }

    /// Reopen this format for modification.
    ///
    /// The returned builder is seeded with every setting of `self`.
    pub fn to_builder(&self) -> FormatBuilder {
        FormatBuilder { format: self.clone() }
    }

    /// The RFC 4180 dialect: the default, except that empty lines between
    /// records are kept (as empty one-field records).
    pub fn rfc4180() -> Format {
        Format { ignore_empty_lines: false, ..Format::default() }
    }

    /// The dialect of spreadsheet CSV exports.
    ///
    /// Locale note: a spreadsheet's actual delimiter follows the locale of
    /// the machine that exported the file; use `to_builder()` to override
    /// it when targeting such files.
    pub fn excel() -> Format {
        Format {
            ignore_empty_lines: false,
            allow_missing_column_names: true,
            trailing_data: true,
            lenient_eof: true,
            ..Format::default()
        }
    }

    /// The tab-delimited dialect.
    pub fn tdf() -> Format {
        Format {
            delimiter: "\t".to_string(),
            ignore_surrounding_spaces: true,
            ..Format::default()
        }
    }

    /// The dialect of MySQL `SELECT INTO OUTFILE` / `LOAD DATA INFILE`:
    /// tab-delimited, unquoted, backslash-escaped, `\N` for null.
    pub fn mysql() -> Format {
        Format {
            delimiter: "\t".to_string(),
            quote: None,
            escape: Some('\\'),
            record_separator: Some(chars::LF_STR.to_string()),
            null_string: Some("\\N".to_string()),
            ignore_empty_lines: false,
            quote_mode: Some(QuoteMode::AllNonNull),
            ..Format::default()
        }
    }

    /// The dialect of PostgreSQL `COPY ... FORMAT text`.
    pub fn postgresql_text() -> Format {
        Format {
            delimiter: "\t".to_string(),
            quote: None,
            escape: Some('\\'),
            record_separator: Some(chars::LF_STR.to_string()),
            null_string: Some("\\N".to_string()),
            ignore_empty_lines: false,
            quote_mode: Some(QuoteMode::AllNonNull),
            ..Format::default()
        }
    }

    /// The dialect of PostgreSQL `COPY ... FORMAT csv`. Null is the
    /// empty string; an empty text value is told apart by its quotes.
    pub fn postgresql_csv() -> Format {
        Format {
            record_separator: Some(chars::LF_STR.to_string()),
            null_string: Some(String::new()),
            ignore_empty_lines: false,
            quote_mode: Some(QuoteMode::AllNonNull),
            ..Format::default()
        }
    }

    /// The dialect of Oracle SQL*Loader control files: comma-delimited,
    /// backslash-escaped, `\N` for null, values trimmed, platform record
    /// separator.
    pub fn oracle() -> Format {
        let eol = if cfg!(windows) { chars::CRLF } else { chars::LF_STR };
        Format {
            escape: Some('\\'),
            record_separator: Some(eol.to_string()),
            null_string: Some("\\N".to_string()),
            ignore_empty_lines: false,
            trim: true,
            quote_mode: Some(QuoteMode::Minimal),
            ..Format::default()
        }
    }

    /// The dialect of Informix `UNLOAD`: pipe-delimited with backslash
    /// escapes.
    pub fn informix_unload() -> Format {
        Format {
            delimiter: "|".to_string(),
            escape: Some('\\'),
            record_separator: Some(chars::LF_STR.to_string()),
            ..Format::default()
        }
    }

    /// The dialect of Informix `UNLOAD CSV`.
    pub fn informix_unload_csv() -> Format {
        Format {
            record_separator: Some(chars::LF_STR.to_string()),
            ..Format::default()
        }
    }

    /// The dialect of `mongoexport --type=csv`. The quote char doubles as
    /// the escape char, as mongoexport writes `""` for a literal quote.
    pub fn mongodb_csv() -> Format {
        Format {
            escape: Some('"'),
            quote_mode: Some(QuoteMode::Minimal),
            skip_header_record: false,
            ..Format::default()
        }
    }

    /// The dialect of `mongoexport --type=tsv`.
    pub fn mongodb_tsv() -> Format {
        Format {
            delimiter: "\t".to_string(),
            escape: Some('"'),
            quote_mode: Some(QuoteMode::Minimal),
            skip_header_record: false,
            ..Format::default()
        }
    }

    /// The field delimiter, possibly more than one character.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// The quote character, if quoting is enabled.
    pub fn quote(&self) -> Option<char> {
        self.quote
    }

    /// The escape character, if escape processing is enabled.
    pub fn escape(&self) -> Option<char> {
        self.escape
    }

    /// The comment marker, if comment lines are recognized.
    pub fn comment(&self) -> Option<char> {
        self.comment
    }

    /// The record separator written between output records. Parsing always
    /// accepts LF, CR and CRLF regardless of this setting.
    pub fn record_separator(&self) -> Option<&str> {
        self.record_separator.as_deref()
    }

    /// The sentinel exchanged for the null value, if one is configured.
    pub fn null_string(&self) -> Option<&str> {
        self.null_string.as_deref()
    }

    /// The header configuration.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// The comment lines written before the header on output.
    pub fn header_comments(&self) -> &[String] {
        &self.header_comments
    }

    /// Whether the first input record is consumed and discarded.
    pub fn skip_header_record(&self) -> bool {
        self.skip_header_record
    }

    /// Whether spaces and tabs around unquoted fields are dropped.
    pub fn ignore_surrounding_spaces(&self) -> bool {
        self.ignore_surrounding_spaces
    }

    /// Whether blank lines between records are dropped.
    pub fn ignore_empty_lines(&self) -> bool {
        self.ignore_empty_lines
    }

    /// Whether header name lookups fold case.
    pub fn ignore_header_case(&self) -> bool {
        self.ignore_header_case
    }

    /// Whether every field value is trimmed.
    pub fn trim(&self) -> bool {
        self.trim
    }

    /// Whether an extra delimiter precedes each record separator on
    /// output.
    pub fn trailing_delimiter(&self) -> bool {
        self.trailing_delimiter
    }

    /// The quoting policy, if one was set explicitly. An unset policy
    /// behaves as [`QuoteMode::Minimal`] on output.
    pub fn quote_mode(&self) -> Option<QuoteMode> {
        self.quote_mode
    }

    /// The duplicate-header policy.
    pub fn duplicate_header_mode(&self) -> DuplicateHeaderMode {
        self.duplicate_header_mode
    }

    /// Whether blank header names are tolerated.
    pub fn allow_missing_column_names(&self) -> bool {
        self.allow_missing_column_names
    }

    /// Whether end of input inside an open quoted field closes the field
    /// instead of failing.
    pub fn lenient_eof(&self) -> bool {
        self.lenient_eof
    }

    /// Whether characters between a closing quote and the next delimiter
    /// are folded into the field instead of rejected.
    pub fn trailing_data(&self) -> bool {
        self.trailing_data
    }

    /// Whether the printer flushes its sink when closing.
    pub fn auto_flush(&self) -> bool {
        self.auto_flush
    }

    /// Render one record under this dialect, with no record separator.
    ///
    /// # Example
    ///
    /// ```
    /// use charsep::Format;
    ///
    /// let line = Format::default()
    ///     .format_record(["a", "b,c"])
    ///     .unwrap();
    /// assert_eq!(line, "a,\"b,c\"");
    /// ```
    pub fn format_record<'a, I, F>(&self, fields: I) -> Result<String>
    where
        I: IntoIterator<Item = F>,
        F: Into<Field<'a>>,
    {
        let mut format = self.clone();
        format.record_separator = None;
        format.header = None;
        format.header_comments = Vec::new();
        let mut printer = Printer::new(Vec::new(), format)?;
        printer.print_record(fields)?;
        let buf = printer.into_inner()?;
        // The printer only writes what we feed it, which is UTF-8.
        String::from_utf8(buf).map_err(|err| {
            new_error(ErrorKind::Config(format!(
                "record is not valid UTF-8: {}",
                err
            )))
        })
    }

    pub(crate) fn is_null_string(&self, value: &str) -> bool {
        self.null_string.as_deref() == Some(value)
    }

    pub(crate) fn trim_value<'v>(&self, value: &'v str) -> &'v str {
        if self.trim {
            value.trim_matches(chars::is_trim_char)
        } else {
            value
        }
    }

    fn validate(&self) -> Result<()> {
        fn fail(msg: String) -> Result<()> {
            Err(new_error(ErrorKind::Config(msg)))
        }

        if self.delimiter.is_empty() {
            return fail("the delimiter cannot be empty".to_string());
        }
        if self.delimiter.chars().any(chars::is_line_break) {
            return fail("the delimiter cannot be a line break".to_string());
        }
        for (c, what) in [
            (self.quote, "quote char"),
            (self.escape, "escape char"),
            (self.comment, "comment marker"),
        ] {
            if let Some(c) = c {
                if chars::is_line_break(c) {
                    return fail(format!(
                        "the {} cannot be a line break",
                        what
                    ));
                }
                if self.delimiter.contains(c) {
                    return fail(format!(
                        "the {} and the delimiter cannot be the same ({:?})",
                        what, c
                    ));
                }
            }
        }
        // Quote and escape may coincide (the MongoDB dialects rely on it);
        // the comment marker must differ from both.
        if let Some(comment) = self.comment {
            if self.quote == Some(comment) {
                return fail(format!(
                    "the comment marker and the quote char cannot be the \
                     same ({:?})",
                    comment
                ));
            }
            if self.escape == Some(comment) {
                return fail(format!(
                    "the comment marker and the escape char cannot be the \
                     same ({:?})",
                    comment
                ));
            }
        }
        if self.quote_mode == Some(QuoteMode::None) && self.escape.is_none() {
            return fail(
                "quote mode NONE requires an escape char".to_string(),
            );
        }
        if let Some(Header::Names(ref names)) = self.header {
            self.validate_header_names(names)?;
        }
        Ok(())
    }

    fn validate_header_names(&self, names: &[String]) -> Result<()> {
        if self.duplicate_header_mode == DuplicateHeaderMode::AllowAll {
            return Ok(());
        }
        let empty_ok =
            self.duplicate_header_mode == DuplicateHeaderMode::AllowEmpty;
        let mut seen = HashSet::with_capacity(names.len());
        for name in names {
            let blank = name.trim().is_empty();
            // Blank names all collide on "" for duplicate checking.
            let key = if blank { "" } else { name.as_str() };
            if !seen.insert(key) && !(blank && empty_ok) {
                return Err(new_error(ErrorKind::Config(format!(
                    "the header contains a duplicate name: {:?} in {:?}",
                    name, names
                ))));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Delimiter=<{}>", self.delimiter)?;
        if let Some(c) = self.escape {
            write!(f, " Escape=<{}>", c)?;
        }
        if let Some(c) = self.quote {
            write!(f, " QuoteChar=<{}>", c)?;
        }
        if let Some(mode) = self.quote_mode {
            write!(f, " QuoteMode=<{:?}>", mode)?;
        }
        if let Some(c) = self.comment {
            write!(f, " CommentStart=<{}>", c)?;
        }
        if let Some(ref s) = self.null_string {
            write!(f, " NullString=<{}>", s)?;
        }
        if let Some(ref s) = self.record_separator {
            write!(f, " RecordSeparator=<{}>", s.escape_debug())?;
        }
        if self.ignore_empty_lines {
            write!(f, " EmptyLines:ignored")?;
        }
        if self.ignore_surrounding_spaces {
            write!(f, " SurroundingSpaces:ignored")?;
        }
        if self.ignore_header_case {
            write!(f, " HeaderCase:ignored")?;
        }
        write!(f, " SkipHeaderRecord:{}", self.skip_header_record)?;
        if !self.header_comments.is_empty() {
            write!(f, " HeaderComments:{:?}", self.header_comments)?;
        }
        match self.header {
            Some(Header::Names(ref names)) => {
                write!(f, " Header:{:?}", names)?
            }
            Some(Header::FirstRecord) => write!(f, " Header:<first record>")?,
            None => {}
        }
        Ok(())
    }
}

/// Builds a [`Format`] with one mutator per dialect field.
///
/// The builder starts from the default dialect and validates the combined
/// configuration in [`build`](FormatBuilder::build).
///
/// # Example
///
/// ```
/// use charsep::{Format, QuoteMode};
///
/// let format = Format::builder()
///     .delimiter("\t")
///     .quote(None)
///     .escape(Some('\\'))
///     .quote_mode(Some(QuoteMode::None))
///     .build()
///     .unwrap();
/// assert_eq!(format.delimiter(), "\t");
/// assert_eq!(format.quote(), None);
/// ```
#[derive(Clone, Debug)]
pub struct FormatBuilder {
    format: Format,
}

impl Default for FormatBuilder {
    fn default() -> FormatBuilder {
        FormatBuilder { format: Format::default() }
    }
}

impl FormatBuilder {
    /// Create a new builder seeded with the default dialect.
    pub fn new() -> FormatBuilder {
        FormatBuilder::default()
    }

    /// Finalize the configuration.
    ///
    /// This runs the dialect invariants: a non-empty delimiter free of
    /// line breaks, distinctness of the special characters (quote and
    /// escape may coincide), an escape char when quote mode is `None`, and
    /// duplicate-header rules for an explicit header.
    pub fn build(&self) -> Result<Format> {
        self.format.validate()?;
        Ok(self.format.clone())
    }

    /// The field delimiter. May be longer than one character.
    pub fn delimiter(&mut self, delimiter: &str) -> &mut FormatBuilder {
        self.format.delimiter = delimiter.to_string();
        self
    }

    /// The quote character; `None` disables quoting.
    pub fn quote(&mut self, quote: Option<char>) -> &mut FormatBuilder {
        self.format.quote = quote;
        self
    }

    /// The escape character; `None` disables escape processing.
    pub fn escape(&mut self, escape: Option<char>) -> &mut FormatBuilder {
        self.format.escape = escape;
        self
    }

    /// The comment marker; `None` disables comment lines. A comment is
    /// only recognized at the start of a line.
    pub fn comment(&mut self, comment: Option<char>) -> &mut FormatBuilder {
        self.format.comment = comment;
        self
    }

    /// The record separator to write between output records.
    ///
    /// Parsing is not affected: LF, CR and CRLF are always accepted.
    pub fn record_separator(
        &mut self,
        sep: Option<&str>,
    ) -> &mut FormatBuilder {
        self.format.record_separator = sep.map(str::to_string);
        self
    }

    /// The sentinel exchanged for the null value: fields equal to it parse
    /// as null, and null prints as it.
    pub fn null_string(&mut self, null: Option<&str>) -> &mut FormatBuilder {
        self.format.null_string = null.map(str::to_string);
        self
    }

    /// The header configuration; `None` disables the header map.
    pub fn header(&mut self, header: Option<Header>) -> &mut FormatBuilder {
        self.format.header = header;
        self
    }

    /// Configure an explicit header from anything yielding names.
    pub fn header_names<I, S>(&mut self, names: I) -> &mut FormatBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.format.header = Some(Header::Names(
            names.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Comment lines written before the header on output. They are only
    /// written when a comment marker is configured.
    pub fn header_comments<I, S>(&mut self, comments: I) -> &mut FormatBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.format.header_comments =
            comments.into_iter().map(Into::into).collect();
        self
    }

    /// When true and the header is explicit, the first input record is
    /// consumed and discarded.
    pub fn skip_header_record(&mut self, yes: bool) -> &mut FormatBuilder {
        self.format.skip_header_record = yes;
        self
    }

    /// When true, spaces and tabs around unquoted fields are dropped.
    pub fn ignore_surrounding_spaces(
        &mut self,
        yes: bool,
    ) -> &mut FormatBuilder {
        self.format.ignore_surrounding_spaces = yes;
        self
    }

    /// When true, fully blank lines between records are dropped.
    pub fn ignore_empty_lines(&mut self, yes: bool) -> &mut FormatBuilder {
        self.format.ignore_empty_lines = yes;
        self
    }

    /// When true, header name lookups fold case.
    pub fn ignore_header_case(&mut self, yes: bool) -> &mut FormatBuilder {
        self.format.ignore_header_case = yes;
        self
    }

    /// When true, every field value is trimmed; the trim set is every
    /// character at or below space.
    pub fn trim(&mut self, yes: bool) -> &mut FormatBuilder {
        self.format.trim = yes;
        self
    }

    /// When true, an extra delimiter is written before each record
    /// separator, and an empty last field produced by one is dropped on
    /// input.
    pub fn trailing_delimiter(&mut self, yes: bool) -> &mut FormatBuilder {
        self.format.trailing_delimiter = yes;
        self
    }

    /// The quoting policy. `None` behaves as [`QuoteMode::Minimal`] on
    /// output but compares unequal to an explicit `Minimal`.
    pub fn quote_mode(
        &mut self,
        mode: Option<QuoteMode>,
    ) -> &mut FormatBuilder {
        self.format.quote_mode = mode;
        self
    }

    /// The duplicate-header policy for explicit and parsed headers.
    pub fn duplicate_header_mode(
        &mut self,
        mode: DuplicateHeaderMode,
    ) -> &mut FormatBuilder {
        self.format.duplicate_header_mode = mode;
        self
    }

    /// When true, blank header names reserve an unaddressable column
    /// instead of failing.
    pub fn allow_missing_column_names(
        &mut self,
        yes: bool,
    ) -> &mut FormatBuilder {
        self.format.allow_missing_column_names = yes;
        self
    }

    /// When true, end of input inside an open quoted field closes the
    /// field instead of failing.
    pub fn lenient_eof(&mut self, yes: bool) -> &mut FormatBuilder {
        self.format.lenient_eof = yes;
        self
    }

    /// When true, characters between a closing quote and the next
    /// delimiter are appended to the field instead of rejected.
    pub fn trailing_data(&mut self, yes: bool) -> &mut FormatBuilder {
        self.format.trailing_data = yes;
        self
    }

    /// When true, the printer flushes its sink when it is closed.
    pub fn auto_flush(&mut self, yes: bool) -> &mut FormatBuilder {
        self.format.auto_flush = yes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn config_err(res: Result<Format>) -> String {
        match res.unwrap_err().into_kind() {
            ErrorKind::Config(msg) => msg,
            kind => panic!("expected Config error, got {:?}", kind),
        }
    }

    #[test]
    fn default_dialect() {
        let f = Format::default();
        assert_eq!(f.delimiter(), ",");
        assert_eq!(f.quote(), Some('"'));
        assert_eq!(f.escape(), None);
        assert_eq!(f.record_separator(), Some("\r\n"));
        assert!(f.ignore_empty_lines());
        assert_eq!(f.duplicate_header_mode(), DuplicateHeaderMode::AllowAll);
    }

    #[test]
    fn presets_match_their_deltas() {
        assert!(!Format::rfc4180().ignore_empty_lines());

        let excel = Format::excel();
        assert!(excel.allow_missing_column_names());
        assert!(excel.trailing_data());
        assert!(excel.lenient_eof());

        let mysql = Format::mysql();
        assert_eq!(mysql.delimiter(), "\t");
        assert_eq!(mysql.quote(), None);
        assert_eq!(mysql.escape(), Some('\\'));
        assert_eq!(mysql.null_string(), Some("\\N"));
        assert_eq!(mysql.record_separator(), Some("\n"));
        assert_eq!(mysql.quote_mode(), Some(QuoteMode::AllNonNull));

        let pg = Format::postgresql_csv();
        assert_eq!(pg.delimiter(), ",");
        assert_eq!(pg.null_string(), Some(""));

        let mongo = Format::mongodb_csv();
        assert_eq!(mongo.quote(), Some('"'));
        assert_eq!(mongo.escape(), Some('"'));

        assert!(Format::oracle().trim());
        assert_eq!(Format::informix_unload().delimiter(), "|");
    }

    #[test]
    fn rejects_empty_delimiter() {
        let msg = config_err(Format::builder().delimiter("").build());
        assert!(msg.contains("empty"));
    }

    #[test]
    fn rejects_line_break_specials() {
        assert!(Format::builder().delimiter("\n").build().is_err());
        assert!(Format::builder().quote(Some('\r')).build().is_err());
        assert!(Format::builder().escape(Some('\n')).build().is_err());
        assert!(Format::builder().comment(Some('\r')).build().is_err());
    }

    #[test]
    fn rejects_clashing_specials() {
        assert!(Format::builder().quote(Some(',')).build().is_err());
        assert!(Format::builder().escape(Some(',')).build().is_err());
        assert!(Format::builder().comment(Some(',')).build().is_err());
        assert!(Format::builder()
            .comment(Some('"'))
            .build()
            .is_err());
        assert!(Format::builder()
            .escape(Some('!'))
            .comment(Some('!'))
            .build()
            .is_err());
        // A multi-char delimiter clashes on any of its characters.
        assert!(Format::builder()
            .delimiter("~|~")
            .quote(Some('|'))
            .build()
            .is_err());
    }

    #[test]
    fn quote_may_equal_escape() {
        let format = Format::builder()
            .quote(Some('"'))
            .escape(Some('"'))
            .build()
            .unwrap();
        assert_eq!(format.quote(), format.escape());
    }

    #[test]
    fn quote_mode_none_needs_escape() {
        let msg = config_err(
            Format::builder().quote_mode(Some(QuoteMode::None)).build(),
        );
        assert!(msg.contains("escape"));

        Format::builder()
            .quote_mode(Some(QuoteMode::None))
            .escape(Some('\\'))
            .build()
            .unwrap();
    }

    #[test]
    fn duplicate_headers_per_mode() {
        let mut builder = Format::builder();
        builder.header_names(["a", "b", "a"]);

        builder.duplicate_header_mode(DuplicateHeaderMode::AllowAll);
        builder.build().unwrap();

        builder.duplicate_header_mode(DuplicateHeaderMode::AllowEmpty);
        let msg = config_err(builder.build());
        assert!(msg.contains("\"a\""));

        builder.duplicate_header_mode(DuplicateHeaderMode::Disallow);
        assert!(builder.build().is_err());
    }

    #[test]
    fn blank_duplicate_headers() {
        let mut builder = Format::builder();
        builder.header_names(["a", "", " ", "b"]);

        builder.duplicate_header_mode(DuplicateHeaderMode::AllowEmpty);
        builder.build().unwrap();

        builder.duplicate_header_mode(DuplicateHeaderMode::Disallow);
        assert!(builder.build().is_err());
    }

    #[test]
    fn builder_round_trips_format() {
        let format = Format::mysql();
        assert_eq!(format.to_builder().build().unwrap(), format);
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(Format::default(), Format::default());
        assert_ne!(Format::default(), Format::rfc4180());
        // An unset quote mode is not the same value as explicit Minimal.
        let explicit = Format::builder()
            .quote_mode(Some(QuoteMode::Minimal))
            .build()
            .unwrap();
        assert_ne!(Format::default(), explicit);
    }

    #[test]
    fn display_summarizes_dialect() {
        let text = Format::mysql().to_string();
        assert!(text.contains("Delimiter=<\t>"));
        assert!(text.contains("Escape=<\\>"));
        assert!(text.contains("NullString=<\\N>"));
        let text = Format::default().to_string();
        assert!(text.contains("QuoteChar=<\">"));
        assert!(text.contains("EmptyLines:ignored"));
    }

    #[test]
    fn serde_round_trip() {
        let format = Format::oracle();
        let json = serde_json::to_string(&format).unwrap();
        let back: Format = serde_json::from_str(&json).unwrap();
        assert_eq!(format, back);
    }
}

/*!
Reading and writing character-separated values, one dialect at a time.

Real-world "CSV" is a family of dialects: RFC 4180, spreadsheet exports,
the bulk-load formats of MySQL, PostgreSQL, Oracle and Informix, MongoDB
exports, and plain tab-separated files. This crate drives them all
through one engine configured by a [`Format`]: a validated, immutable
description of the delimiter, quoting, escaping, comments, headers, null
handling and output policies of one dialect.

A [`Parser`] turns a character source into [`Record`]s; a [`Printer`]
turns field values back into text. Both are streaming and single-pass.

# Reading

```
use charsep::{Format, Header, Parser};

# fn example() -> Result<(), charsep::Error> {
let data = "\
city,country,pop
Boston,United States,4628910
Concord,United States,42695
";
let format = Format::builder()
    .header(Some(Header::FirstRecord))
    .build()?;
let mut parser = Parser::new(data.as_bytes(), format)?;
for result in parser.records() {
    let record = result?;
    println!(
        "{:?} has population {:?}",
        record.get_by_name("city")?,
        record.get_by_name("pop")?,
    );
}
# Ok(())
# }
# example().unwrap();
```

# Writing

```
use charsep::{Format, Printer};

# fn example() -> Result<(), charsep::Error> {
let mut printer = Printer::new(Vec::new(), Format::default())?;
printer.print_record(["city", "pop"])?;
printer.print_record(["Boston", "4628910"])?;
let data = String::from_utf8(printer.into_inner()?).unwrap();
assert_eq!(data, "city,pop\r\nBoston,4628910\r\n");
# Ok(())
# }
# example().unwrap();
```

# Dialects

The predefined dialects are constructors on [`Format`]:
[`Format::default`] (the common comma dialect), [`Format::rfc4180`],
[`Format::excel`], [`Format::tdf`], [`Format::mysql`],
[`Format::postgresql_text`], [`Format::postgresql_csv`],
[`Format::oracle`], [`Format::informix_unload`],
[`Format::informix_unload_csv`], [`Format::mongodb_csv`] and
[`Format::mongodb_tsv`]. Any of them can be reopened with
[`Format::to_builder`] and adjusted.

Parsing accepts `\n`, `\r` and `\r\n` record terminators in any mixture,
whatever the format's output separator says; the first one seen is
reported by [`Parser::first_end_of_line`].

The input must already be decoded UTF-8 text. Transport concerns such as
charset detection or byte-order-mark stripping belong to the caller.
*/

#![deny(missing_docs)]

mod buffer;
mod chars;
mod error;
mod format;
mod lexer;
mod parser;
mod printer;
mod record;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::format::{
    DuplicateHeaderMode, Format, FormatBuilder, Header, QuoteMode,
};
pub use crate::parser::{IntoRecords, Parser, Records};
pub use crate::printer::{Field, Printer};
pub use crate::record::{Headers, Iter, Record};

//! End-to-end dialect scenarios driven through the public API only.

use charsep::{Field, Format, Header, Parser, Printer, QuoteMode, Record};

fn parse(input: &str, format: Format) -> Vec<Record> {
    Parser::new(input.as_bytes(), format)
        .unwrap()
        .into_records()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn values(records: &[Record]) -> Vec<Vec<Option<&str>>> {
    records.iter().map(Record::values).collect()
}

#[test]
fn rfc4180_embedded_newlines_and_doubled_quotes() {
    let records = parse("\"aaa\",\"b\"\"bb\",\"ccc\"", Format::rfc4180());
    assert_eq!(
        values(&records),
        vec![vec![Some("aaa"), Some("b\"bb"), Some("ccc")]]
    );

    let records = parse("\"a\nb\",c\r\nd,e\r\n", Format::rfc4180());
    assert_eq!(
        values(&records),
        vec![vec![Some("a\nb"), Some("c")], vec![Some("d"), Some("e")]]
    );
}

#[test]
fn default_with_surrounding_spaces_and_multiline_quotes() {
    let format = Format::builder()
        .ignore_surrounding_spaces(true)
        .build()
        .unwrap();
    let input = "a,b,c,d\n a , b , 1 2 \n\"foo baar\", b,\n   \
                 \"foo\n,,\n\"\",,\n\"\"\",d,e\n";
    let records = parse(input, format);
    assert_eq!(
        values(&records),
        vec![
            vec![Some("a"), Some("b"), Some("c"), Some("d")],
            vec![Some("a"), Some("b"), Some("1 2")],
            vec![Some("foo baar"), Some("b"), Some("")],
            vec![Some("foo\n,,\n\",,\n\""), Some("d"), Some("e")],
        ]
    );
}

#[test]
fn excel_preserves_blank_lines() {
    let records = parse("hello,\r\n\r\n\r\n", Format::excel());
    assert_eq!(
        values(&records),
        vec![
            vec![Some("hello"), Some("")],
            vec![Some("")],
            vec![Some("")],
        ]
    );
}

#[test]
fn slash_escape_single_quote_minimal() {
    let format = Format::builder()
        .quote(Some('\''))
        .escape(Some('/'))
        .quote_mode(Some(QuoteMode::Minimal))
        .ignore_empty_lines(true)
        .build()
        .unwrap();
    let records = parse("/',/'\n'/'','/''", format);
    assert_eq!(
        values(&records),
        vec![
            vec![Some("'"), Some("'")],
            vec![Some("'"), Some("'")],
        ]
    );
}

#[test]
fn mysql_null_round_trip() {
    // The literal two-character \N is escaped; null is the bare marker.
    let mut printer = Printer::new(Vec::new(), Format::mysql()).unwrap();
    printer.print_field("\\N").unwrap();
    printer.print_field(Field::Null).unwrap();
    printer.println().unwrap();
    let out = String::from_utf8(printer.into_inner().unwrap()).unwrap();
    assert_eq!(out, "\\\\N\t\\N\n");

    let records = parse(&out, Format::mysql());
    assert_eq!(values(&records), vec![vec![Some("\\N"), None]]);
}

#[test]
fn auto_header_with_header_comment() {
    let format = Format::builder()
        .comment(Some('#'))
        .header(Some(Header::FirstRecord))
        .build()
        .unwrap();
    let mut parser = Parser::new(
        "# header comment\r\nA,B\r\n1,2\r\n".as_bytes(),
        format,
    )
    .unwrap();
    assert_eq!(parser.header_comment(), Some("header comment"));
    assert_eq!(
        parser.header_names(),
        Some(&["A".to_string(), "B".to_string()][..])
    );
    let records: Vec<Record> =
        parser.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(values(&records), vec![vec![Some("1"), Some("2")]]);
}

#[test]
fn trailing_data_after_closing_quote() {
    let input = "\"a\" b,\"a\" \" b,\"a\" b \"\"";
    let lenient = Format::builder().trailing_data(true).build().unwrap();
    let records = parse(input, lenient);
    assert_eq!(
        values(&records),
        vec![vec![Some("a b"), Some("a \" b"), Some("a b \"\"")]]
    );

    let strict = Format::builder().trailing_data(false).build().unwrap();
    let mut parser = Parser::new(input.as_bytes(), strict).unwrap();
    let err = parser.next_record().unwrap_err();
    assert!(err.is_parse_error());
}

#[test]
fn resume_from_recorded_offset() {
    let input = "one,1\ntwo,2\nthree,3\n";
    let mut parser =
        Parser::new(input.as_bytes(), Format::default()).unwrap();
    parser.next_record().unwrap().unwrap();
    parser.next_record().unwrap().unwrap();
    let third = parser.next_record().unwrap().unwrap();
    let offset = third.char_offset();

    let rest: String = input.chars().skip(offset as usize).collect();
    let mut resumed = Parser::with_position(
        rest.as_bytes(),
        Format::default(),
        2,
        offset,
    )
    .unwrap();
    let replay = resumed.next_record().unwrap().unwrap();
    assert_eq!(replay.record_number(), 3);
    assert_eq!(replay.char_offset(), offset);
    assert_eq!(replay.values(), third.values());
}

#[test]
fn character_accounting_matches_input_length() {
    let input = "a,b\n\"x\ny\",z\r\nlast,line";
    let mut parser =
        Parser::new(input.as_bytes(), Format::default()).unwrap();
    while parser.next_record().unwrap().is_some() {}
    assert_eq!(parser.position(), input.chars().count() as u64);
}

#[test]
fn eol_unification() {
    let mut expected: Option<Vec<Vec<Option<String>>>> = None;
    for sep in ["\n", "\r", "\r\n"] {
        let input = format!("a,b{sep}c,d{sep}");
        let records = parse(&input, Format::rfc4180());
        let owned: Vec<Vec<Option<String>>> = records
            .iter()
            .map(|r| {
                r.iter()
                    .map(|f| f.map(str::to_string))
                    .collect()
            })
            .collect();
        match expected {
            None => expected = Some(owned),
            Some(ref exp) => assert_eq!(&owned, exp, "separator {:?}", sep),
        }
    }
}

#[test]
fn final_terminator_is_optional() {
    for input in ["a,b\nc,d", "a,b\nc,d\n", "a,b\nc,d\r\n", "a,b\nc,d\r"] {
        let records = parse(input, Format::default());
        assert_eq!(
            values(&records),
            vec![
                vec![Some("a"), Some("b")],
                vec![Some("c"), Some("d")],
            ],
            "input {:?}",
            input
        );
    }
}

#[test]
fn monotonic_observability() {
    let input = "a\nb\nc\nd\n";
    let mut parser =
        Parser::new(input.as_bytes(), Format::default()).unwrap();
    let (mut last_line, mut last_pos, mut last_num) = (0, 0, 0);
    while let Some(record) = parser.next_record().unwrap() {
        assert!(parser.line_number() >= last_line);
        assert!(parser.position() >= last_pos);
        assert!(record.record_number() == last_num + 1);
        last_line = parser.line_number();
        last_pos = parser.position();
        last_num = record.record_number();
    }
}

#[test]
fn null_string_idempotence() {
    let format = Format::builder()
        .null_string(Some("\\N"))
        .escape(Some('\\'))
        .record_separator(Some("\n"))
        .build()
        .unwrap();

    let records = parse("\\N\n", format.clone());
    assert_eq!(values(&records), vec![vec![None]]);

    let mut printer = Printer::new(Vec::new(), format).unwrap();
    printer.print_record([Field::Null]).unwrap();
    let out = String::from_utf8(printer.into_inner().unwrap()).unwrap();
    assert_eq!(out, "\\N\n");
}

#[test]
fn quote_doubling_on_output() {
    let format = Format::builder()
        .quote_mode(Some(QuoteMode::All))
        .record_separator(Some("\n"))
        .build()
        .unwrap();
    let mut printer = Printer::new(Vec::new(), format).unwrap();
    printer.print_record(["say \"hi\" \"now\""]).unwrap();
    let out = String::from_utf8(printer.into_inner().unwrap()).unwrap();
    assert_eq!(out, "\"say \"\"hi\"\" \"\"now\"\"\"\n");
}

#[test]
fn predefined_dialects_round_trip_a_table() {
    let table: Vec<Vec<&str>> = vec![
        vec!["id", "name", "notes"],
        vec!["1", "plain", "nothing special"],
        vec!["2", "spaced value", "keeps inner  runs"],
        vec!["3", "unicode ✓", "ä日本語"],
    ];
    for format in [
        Format::default(),
        Format::rfc4180(),
        Format::excel(),
        Format::tdf(),
        Format::mysql(),
        Format::postgresql_text(),
        Format::postgresql_csv(),
        Format::informix_unload(),
        Format::informix_unload_csv(),
        Format::mongodb_csv(),
        Format::mongodb_tsv(),
    ] {
        let mut printer =
            Printer::new(Vec::new(), format.clone()).unwrap();
        for row in &table {
            printer.print_record(row.iter().copied()).unwrap();
        }
        let out =
            String::from_utf8(printer.into_inner().unwrap()).unwrap();
        let records = parse(&out, format.clone());
        let got: Vec<Vec<&str>> = records
            .iter()
            .map(|r| r.iter().map(|f| f.unwrap_or("<null>")).collect())
            .collect();
        assert_eq!(got, table, "format {}", format);
    }
}

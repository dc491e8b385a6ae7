use chrono::NaiveDate;
use csv_bulk_loader::LoadError;
use csv_bulk_loader::ingestion::csv::coerce_record;
use csv_bulk_loader::ingestion::schema::{column_specs, loaded_columns};
use csv_bulk_loader::ingestion::{Charset, CsvOptions, Delimiter, RowStream};
use csv_bulk_loader::types::{TemporalFormats, TypeSpec, Value};

fn comma() -> CsvOptions {
    CsvOptions::default()
}

fn collect_fields<R: std::io::Read>(rows: RowStream<R>) -> Vec<Vec<String>> {
    rows.map(|r| r.unwrap().fields.iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn reads_header_and_records() {
    let input = "id,name,amount\n1,Alice,\"10,5\"\n2,Bob,\"20,0\"\n";
    let rows = RowStream::open(input.as_bytes(), 3, &comma()).unwrap();
    assert_eq!(rows.header(), ["id", "name", "amount"]);
    assert_eq!(
        collect_fields(rows),
        vec![vec!["1", "Alice", "10,5"], vec!["2", "Bob", "20,0"]]
    );
}

#[test]
fn skip_rows_tolerate_banner_lines_with_any_field_count() {
    let input = "REPORT,GENERATED,ON,MONDAY,EXTRA\nonly one\nid,name\n7,Zed\n";
    let options = CsvOptions {
        skip_rows: 2,
        ..comma()
    };
    let mut rows = RowStream::open(input.as_bytes(), 2, &options).unwrap();
    assert_eq!(rows.header(), ["id", "name"]);

    let record = rows.next().unwrap().unwrap();
    assert_eq!(record.row, 4);
    assert_eq!(&record.fields[1], "Zed");
    assert!(rows.next().is_none());
}

#[test]
fn field_count_mismatch_after_header_is_fatal() {
    let input = "id,name\n1,Ada\n2,Bob,extra\n3,Cy\n";
    let mut rows = RowStream::open(input.as_bytes(), 2, &comma()).unwrap();
    assert!(rows.next().unwrap().is_ok());

    let err = rows.next().unwrap().unwrap_err();
    match err {
        LoadError::ReadRecord { row, message } => {
            assert_eq!(row, 3);
            assert!(message.contains("expected 2, got 3"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn header_width_must_match_type_spec() {
    let input = "id,name,amount\n1,Alice,3\n";
    let err = RowStream::open(input.as_bytes(), 2, &comma()).err().unwrap();
    assert!(matches!(err, LoadError::Config { .. }));
    assert!(err.to_string().contains("type specification has 2 codes but header has 3 columns"));

    let err = RowStream::open(input.as_bytes(), 4, &comma()).err().unwrap();
    assert!(matches!(err, LoadError::Config { .. }));
}

#[test]
fn empty_input_has_no_header() {
    let err = RowStream::open("".as_bytes(), 1, &comma()).err().unwrap();
    assert!(err.to_string().contains("no header row"));
}

#[test]
fn stray_quotes_inside_fields_are_kept() {
    let input = "id,note\n1,5\" floppy\n";
    let rows = RowStream::open(input.as_bytes(), 2, &comma()).unwrap();
    assert_eq!(collect_fields(rows), vec![vec!["1", "5\" floppy"]]);
}

#[test]
fn leading_space_trimming_is_opt_in() {
    let input = "id, name\n1,  Ada  \n";

    let rows = RowStream::open(input.as_bytes(), 2, &comma()).unwrap();
    assert_eq!(rows.header(), ["id", " name"]);
    assert_eq!(collect_fields(rows), vec![vec!["1", "  Ada  "]]);

    let options = CsvOptions {
        trim_leading_space: true,
        ..comma()
    };
    let rows = RowStream::open(input.as_bytes(), 2, &options).unwrap();
    assert_eq!(rows.header(), ["id", "name"]);
    assert_eq!(collect_fields(rows), vec![vec!["1", "Ada  "]]);
}

#[test]
fn tab_delimited_with_byte_order_mark() {
    let bytes = std::fs::read("tests/fixtures/labels_bom.tsv").unwrap();
    let options = CsvOptions {
        delimiter: "t".parse::<Delimiter>().unwrap(),
        ..comma()
    };
    let rows = RowStream::open(bytes.as_slice(), 3, &options).unwrap();
    assert_eq!(rows.header(), ["code", "label", "created"]);
    assert_eq!(collect_fields(rows).len(), 2);
}

#[test]
fn windows_1251_file_with_banner() {
    let bytes = std::fs::read("tests/fixtures/payments_cp1251.csv").unwrap();
    let options = CsvOptions {
        delimiter: ";".parse().unwrap(),
        charset: Charset::Windows1251,
        skip_rows: 2,
        ..comma()
    };
    let spec: TypeSpec = "is fdw".parse().unwrap();
    let rows = RowStream::open(bytes.as_slice(), spec.len(), &options).unwrap();
    assert_eq!(
        rows.header(),
        ["номер", "плательщик", "примечание", "сумма", "дата", "время"]
    );

    let specs = column_specs(rows.header(), &spec).unwrap();
    let loaded = loaded_columns(&specs);
    let formats = TemporalFormats::default();
    let typed: Vec<Vec<Value>> = rows
        .map(|r| coerce_record(&r.unwrap(), &loaded, &formats).unwrap())
        .collect();

    let march_14 = NaiveDate::from_ymd_opt(2021, 3, 14).unwrap();
    assert_eq!(
        typed[0],
        vec![
            Value::Int64(1),
            Value::Utf8("Иванов".to_string()),
            Value::Float64(1500.25),
            Value::Date(march_14),
            Value::Timestamp(march_14.and_hms_opt(9, 15, 0).unwrap()),
        ]
    );
    assert_eq!(
        typed[1],
        vec![
            Value::Int64(2),
            Value::Utf8("Петрова".to_string()),
            Value::Null,
            Value::Date(NaiveDate::from_ymd_opt(2021, 3, 15).unwrap()),
            Value::Null,
        ]
    );
    assert_eq!(typed[2][3], Value::Null);
}

#[test]
fn coerce_reports_row_column_and_raw_text() {
    let input = "id,name,amount\n1,Alice,10.5\n2,Bob,twenty\n";
    let spec: TypeSpec = "isf".parse().unwrap();
    let mut rows = RowStream::open(input.as_bytes(), 3, &comma()).unwrap();
    let loaded = loaded_columns(&column_specs(rows.header(), &spec).unwrap());
    let formats = TemporalFormats::default();

    let first = rows.next().unwrap().unwrap();
    assert!(coerce_record(&first, &loaded, &formats).is_ok());

    let second = rows.next().unwrap().unwrap();
    let err = coerce_record(&second, &loaded, &formats).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("failed to parse value at row 3"));
    assert!(msg.contains("column 'amount'"));
    assert!(msg.contains("raw='twenty'"));
}

#[test]
fn crlf_row_numbers_count_physical_lines() {
    let input = "id,name\r\n1,a\r\n\r\n2,b\r\n";
    let rows = RowStream::open(input.as_bytes(), 2, &comma()).unwrap();
    let numbers: Vec<u64> = rows.map(|r| r.unwrap().row).collect();
    assert_eq!(numbers, vec![2, 4]);
}

#[test]
fn crlf_errors_report_the_same_row_as_lf() {
    for ending in ["\n", "\r\n"] {
        let lines = ["banner", "id,amount", "1,1.5", "2,oops", "3,1,extra"];
        let input = lines.join(ending) + ending;
        let options = CsvOptions {
            skip_rows: 1,
            ..comma()
        };
        let spec: TypeSpec = "if".parse().unwrap();
        let mut rows = RowStream::open(input.as_bytes(), 2, &options).unwrap();
        let loaded = loaded_columns(&column_specs(rows.header(), &spec).unwrap());
        let formats = TemporalFormats::default();

        let first = rows.next().unwrap().unwrap();
        assert_eq!(first.row, 3, "{ending:?}");
        assert!(coerce_record(&first, &loaded, &formats).is_ok());

        let second = rows.next().unwrap().unwrap();
        let err = coerce_record(&second, &loaded, &formats).unwrap_err();
        assert!(
            matches!(err, LoadError::ParseError { row: 4, .. }),
            "{ending:?}: {err}"
        );

        let err = rows.next().unwrap().unwrap_err();
        assert!(
            matches!(err, LoadError::ReadRecord { row: 5, .. }),
            "{ending:?}: {err}"
        );
    }
}

#[test]
fn row_numbers_follow_multiline_quoted_fields() {
    let input = "id,note\r\n1,\"two\r\nlines\"\r\n2,x\r\n";
    let rows = RowStream::open(input.as_bytes(), 2, &comma()).unwrap();
    let records: Vec<(u64, String)> = rows
        .map(|r| {
            let r = r.unwrap();
            (r.row, r.fields[1].to_string())
        })
        .collect();
    assert_eq!(
        records,
        vec![(2, "two\r\nlines".to_string()), (4, "x".to_string())]
    );
}

#[test]
fn malformed_utf8_is_replaced_not_rejected() {
    let input = b"id,name\n1,ab\xFFcd\n";
    let rows = RowStream::open(&input[..], 2, &comma()).unwrap();
    assert_eq!(collect_fields(rows), vec![vec!["1", "ab\u{FFFD}cd"]]);
}

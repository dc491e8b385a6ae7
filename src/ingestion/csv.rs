//! Delimited-text row stream.
//!
//! Rules:
//!
//! - `skip_rows` physical lines are discarded before the header. They are not parsed, so banner
//!   lines with any number of fields are tolerated.
//! - The header must have exactly as many columns as the type specification has codes.
//! - Every data record after the header must have that same field count; a mismatch is fatal.
//! - Quoting is permissive: stray quote characters inside unquoted fields are kept as text.
//! - Rows are numbered by physical `\n`-terminated line, counting skipped lines and the header.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, BufReader, Chain, Cursor, Read};
use std::str::FromStr;

use csv::{ByteRecord, StringRecord};
use tracing::warn;

use crate::error::{LoadError, LoadResult};
use crate::types::{ColumnSpec, TemporalFormats, TypedRow};

use super::encoding::Charset;

/// Read buffer size between the source and the CSV parser.
pub const READ_BUFFER_CAPACITY: usize = 4 * 1024 * 1024;

/// Field delimiter.
///
/// Parsed from the configured token: `t` selects a tab, any other single ASCII character is used
/// literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter(u8);

impl Delimiter {
    pub const COMMA: Delimiter = Delimiter(b',');
    pub const TAB: Delimiter = Delimiter(b'\t');

    pub fn as_byte(self) -> u8 {
        self.0
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::COMMA
    }
}

impl FromStr for Delimiter {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some('t'), None) | (Some('\t'), None) => Ok(Self::TAB),
            (Some(c), None) if c.is_ascii() && c != '\n' && c != '\r' && c != '"' => {
                Ok(Delimiter(c as u8))
            }
            _ => Err(LoadError::config(format!(
                "comma must be a single ASCII character or 't' for tabs (got '{s}')"
            ))),
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            b'\t' => f.write_str("t"),
            b => write!(f, "{}", b as char),
        }
    }
}

/// Parser settings for the row stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: Delimiter,
    pub charset: Charset,
    /// Physical lines discarded before the header row.
    pub skip_rows: usize,
    /// Strip leading whitespace from every field (header included).
    pub trim_leading_space: bool,
}

/// One data record with its 1-based physical row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub row: u64,
    pub fields: StringRecord,
}

/// Maps byte offsets handed to the CSV parser back to physical line numbers.
///
/// The parser's own line counter drifts on `\r\n` terminators and its record offsets point at
/// the terminator bytes left over from the previous record. Here every line's first content
/// byte (anything but `\r` or `\n`) is remembered with its line number until the parser has
/// moved past it.
struct LineTracker<R> {
    inner: R,
    offset: u64,
    line: u64,
    at_line_start: bool,
    starts: VecDeque<(u64, u64)>,
}

impl<R> LineTracker<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            line: 1,
            at_line_start: true,
            starts: VecDeque::new(),
        }
    }

    /// Line of the first content byte at or after `byte`.
    fn line_at(&mut self, byte: u64) -> u64 {
        while self.starts.front().is_some_and(|&(offset, _)| offset < byte) {
            self.starts.pop_front();
        }
        self.starts.front().map_or(self.line, |&(_, line)| line)
    }
}

impl<R: Read> Read for LineTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for &b in &buf[..n] {
            match b {
                b'\n' => {
                    self.line += 1;
                    self.at_line_start = true;
                }
                b'\r' => self.at_line_start = true,
                _ if self.at_line_start => {
                    self.starts.push_back((self.offset, self.line));
                    self.at_line_start = false;
                }
                _ => {}
            }
            self.offset += 1;
        }
        Ok(n)
    }
}

type Source<R> = LineTracker<BufReader<Chain<Cursor<Vec<u8>>, R>>>;

/// Forward-only stream of data records following the header.
pub struct RowStream<R: Read> {
    reader: csv::Reader<Source<R>>,
    header: Vec<String>,
    expected_fields: usize,
    skipped: u64,
    charset: Charset,
    trim_leading_space: bool,
    record: ByteRecord,
}

impl<R: Read> RowStream<R> {
    /// Skip the configured rows and read the header.
    ///
    /// Fails with a configuration error when the header's column count differs from
    /// `expected_fields`.
    pub fn open(source: R, expected_fields: usize, options: &CsvOptions) -> LoadResult<Self> {
        let source = options.charset.strip_bom(source)?;
        let mut buffered = BufReader::with_capacity(READ_BUFFER_CAPACITY, source);
        skip_lines(&mut buffered, options.skip_rows)?;

        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter.as_byte())
            .from_reader(LineTracker::new(buffered));

        let mut stream = Self {
            reader,
            header: Vec::new(),
            expected_fields,
            skipped: options.skip_rows as u64,
            charset: options.charset,
            trim_leading_space: options.trim_leading_space,
            record: ByteRecord::new(),
        };

        let header = match stream.read_decoded(false)? {
            Some((_, header)) => header,
            None => {
                return Err(LoadError::SchemaMismatch {
                    message: "input has no header row".to_string(),
                });
            }
        };
        stream.header = header.iter().map(str::to_owned).collect();

        if stream.header.len() != expected_fields {
            return Err(LoadError::config(format!(
                "type specification has {expected_fields} codes but header has {} columns: {:?}",
                stream.header.len(),
                stream.header
            )));
        }
        Ok(stream)
    }

    /// Header column names, in file order.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Read the next record and decode its fields, returning it with its physical row number.
    fn read_decoded(&mut self, check_width: bool) -> LoadResult<Option<(u64, StringRecord)>> {
        if !self.reader.read_byte_record(&mut self.record)? {
            return Ok(None);
        }
        let start = self.record.position().map_or(0, |p| p.byte());
        let row = self.skipped + self.reader.get_mut().line_at(start);

        if check_width && self.record.len() != self.expected_fields {
            return Err(LoadError::ReadRecord {
                row,
                message: format!(
                    "wrong number of fields: expected {}, got {}",
                    self.expected_fields,
                    self.record.len()
                ),
            });
        }

        let mut fields =
            StringRecord::with_capacity(self.record.as_slice().len(), self.record.len());
        for (i, raw) in self.record.iter().enumerate() {
            let (text, had_errors) = self.charset.decode_field(raw);
            if had_errors {
                warn!(
                    row,
                    field = i + 1,
                    charset = %self.charset,
                    "malformed byte sequence replaced with U+FFFD"
                );
            }
            fields.push_field(trim_field(&text, self.trim_leading_space));
        }
        Ok(Some((row, fields)))
    }
}

impl<R: Read> Iterator for RowStream<R> {
    type Item = LoadResult<SourceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_decoded(true)
            .map(|next| next.map(|(row, fields)| SourceRecord { row, fields }))
            .transpose()
    }
}

fn trim_field(field: &str, trim_leading_space: bool) -> &str {
    if trim_leading_space {
        field.trim_start()
    } else {
        field
    }
}

fn skip_lines<B: BufRead>(reader: &mut B, count: usize) -> LoadResult<()> {
    let mut line = Vec::new();
    for i in 0..count {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Err(LoadError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("skip rows: input ended after {i} of {count} rows"),
            )));
        }
    }
    Ok(())
}

/// Coerce the loaded columns of `record` into a typed row.
///
/// `columns` must contain only non-skip columns; the row follows their order.
pub fn coerce_record(
    record: &SourceRecord,
    columns: &[ColumnSpec],
    formats: &TemporalFormats,
) -> LoadResult<TypedRow> {
    let mut row = Vec::with_capacity(columns.len());
    for column in columns {
        let raw = record.fields.get(column.position).unwrap_or("");
        let value = column
            .field_type
            .parse(raw, formats)
            .map_err(|message| LoadError::ParseError {
                row: record.row,
                column: column.name.clone(),
                raw: raw.to_owned(),
                message,
            })?;
        row.push(value);
    }
    Ok(row)
}

//! Source charsets.
//!
//! The CSV reader splits raw bytes and each field is decoded after its record has been read.
//! Both supported charsets are ASCII-compatible, so delimiters, quotes and line ends sit at the
//! same bytes in either. A UTF-8 byte-order mark is dropped before the first line.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::str::FromStr;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};

use crate::error::LoadError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Supported source charsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// UTF-8, with an optional byte-order mark.
    #[default]
    Utf8,
    /// Windows-1251 (Cyrillic).
    Windows1251,
}

impl Charset {
    pub fn encoding(self) -> &'static Encoding {
        match self {
            Charset::Utf8 => UTF_8,
            Charset::Windows1251 => WINDOWS_1251,
        }
    }

    /// Decode one field.
    ///
    /// Malformed sequences become U+FFFD; the flag reports whether any were replaced.
    pub fn decode_field(self, bytes: &[u8]) -> (Cow<'_, str>, bool) {
        self.encoding().decode_without_bom_handling(bytes)
    }

    /// Drop a leading byte-order mark from a UTF-8 `source`. Other charsets pass through.
    pub fn strip_bom<R: Read>(self, mut source: R) -> io::Result<io::Chain<Cursor<Vec<u8>>, R>> {
        let mut head = Vec::with_capacity(UTF8_BOM.len());
        if self == Charset::Utf8 {
            (&mut source)
                .take(UTF8_BOM.len() as u64)
                .read_to_end(&mut head)?;
            if head == UTF8_BOM {
                head.clear();
            }
        }
        Ok(Cursor::new(head).chain(source))
    }
}

impl FromStr for Charset {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Charset::Utf8),
            "win1251" | "windows-1251" | "cp1251" => Ok(Charset::Windows1251),
            _ => Err(LoadError::config(format!("unknown encoding: {s}"))),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charset::Utf8 => f.write_str("utf8"),
            Charset::Windows1251 => f.write_str("win1251"),
        }
    }
}

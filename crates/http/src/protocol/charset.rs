use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Text encodings supported for response bodies and WebSocket text frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    #[default]
    Utf8,
    UsAscii,
    Iso8859_1,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {charset} byte sequence at offset {offset}")]
pub struct CharsetError {
    charset: Charset,
    offset: usize,
}

impl CharsetError {
    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Charset {
    /// The IANA name, as written into a `Content-Type` charset parameter.
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::UsAscii => "US-ASCII",
            Charset::Iso8859_1 => "ISO-8859-1",
        }
    }

    /// Encodes `text`, replacing characters outside the charset with `?`.
    pub fn encode(self, text: &str) -> Cow<'_, [u8]> {
        match self {
            Charset::Utf8 => Cow::Borrowed(text.as_bytes()),
            _ if text.is_ascii() => Cow::Borrowed(text.as_bytes()),
            Charset::UsAscii => Cow::Owned(text.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' }).collect()),
            Charset::Iso8859_1 => Cow::Owned(text.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')).collect()),
        }
    }

    /// Decodes `bytes`, failing on the first sequence that is invalid for the charset.
    pub fn decode(self, bytes: &[u8]) -> Result<Cow<'_, str>, CharsetError> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes)
                .map(Cow::Borrowed)
                .map_err(|e| CharsetError { charset: self, offset: e.valid_up_to() }),
            Charset::UsAscii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(CharsetError { charset: self, offset }),
                // ascii is valid utf-8
                None => Ok(String::from_utf8_lossy(bytes)),
            },
            Charset::Iso8859_1 => {
                if bytes.is_ascii() {
                    Ok(String::from_utf8_lossy(bytes))
                } else {
                    Ok(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()))
                }
            }
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            n if n.eq_ignore_ascii_case("utf-8") || n.eq_ignore_ascii_case("utf8") => Ok(Charset::Utf8),
            n if n.eq_ignore_ascii_case("us-ascii") || n.eq_ignore_ascii_case("ascii") => Ok(Charset::UsAscii),
            n if n.eq_ignore_ascii_case("iso-8859-1") || n.eq_ignore_ascii_case("latin1") => Ok(Charset::Iso8859_1),
            other => Err(format!("unsupported charset: {other}")),
        }
    }
}

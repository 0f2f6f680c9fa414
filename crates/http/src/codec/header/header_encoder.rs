//! HTTP response head encoder.
//!
//! Serializes the status line, `Content-Type` (with its optional charset parameter),
//! caller supplied headers and the computed `Content-Length` into raw bytes.
//! Only HTTP/1.1 responses are produced.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::StatusCode;
use mime::Mime;
use tokio_util::codec::Encoder;

use crate::protocol::{Charset, KeyValueList, SendError};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 256;

/// Everything that precedes the body of a response.
#[derive(Debug, Clone, Copy)]
pub struct ResponseHead<'a> {
    pub status: StatusCode,
    pub content_type: Option<&'a Mime>,
    pub charset: Option<Charset>,
    pub headers: Option<&'a KeyValueList>,
    /// `None` omits the header, which is only valid for bodiless responses like `101`.
    pub content_length: Option<usize>,
}

impl<'a> ResponseHead<'a> {
    pub fn new(status: StatusCode) -> Self {
        Self { status, content_type: None, charset: None, headers: None, content_length: None }
    }
}

/// Encoder for HTTP response heads implementing the [`Encoder`] trait.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderEncoder;

impl Encoder<ResponseHead<'_>> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, head: ResponseHead<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEADER_SIZE);

        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", head.status.as_str(), head.status.canonical_reason().unwrap_or(""))?;

        if let Some(content_type) = head.content_type {
            write!(FastWrite(dst), "Content-Type: {content_type}")?;
            if let Some(charset) = head.charset {
                write!(FastWrite(dst), "; charset={charset}")?;
            }
            dst.put_slice(b"\r\n");
        }

        if let Some(headers) = head.headers {
            headers.append_to(dst);
        }

        if let Some(content_length) = head.content_length {
            write!(FastWrite(dst), "Content-Length: {content_length}\r\n")?;
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Adapter for using `write!` against a `BytesMut`.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

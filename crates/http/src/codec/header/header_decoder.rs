//! Request header decoder.
//!
//! Parses the start-line and header fields of a request from raw bytes into a
//! [`RequestHead`], and determines the length of the body that follows.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Only HTTP/1.0 and HTTP/1.1
//! - Only `Content-Length` delimited bodies, any `Transfer-Encoding` is rejected
//!
//! The decoder is stateless: when the header section is incomplete it leaves the
//! buffer untouched and is re-run on the next read, which keeps partial header
//! lines across any number of read events without copying them.

use std::mem::MaybeUninit;

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Method, Uri, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{KeyValueList, ParseError, RequestHead};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for HTTP request headers implementing the [`Decoder`] trait.
///
/// Produces the parsed head together with the body length announced by `Content-Length`
/// (zero when absent).
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHead, u64);
    type Error = ParseError;

    /// Attempts to decode a request head from the provided bytes buffer.
    ///
    /// On success the header section is split off `src`, leaving any body bytes in place.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - The number of headers exceeds `MAX_HEADER_NUM`
    /// - The header section exceeds `MAX_HEADER_BYTES`, complete or not
    /// - The start-line or a header line is malformed
    /// - The body is announced through `Transfer-Encoding` or an invalid `Content-Length`
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut req = httparse::Request::new(&mut []);
        let mut headers: [MaybeUninit<httparse::Header>; MAX_HEADER_NUM] = [const { MaybeUninit::uninit() }; MAX_HEADER_NUM];

        let parsed_result = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(header_size) => {
                trace!(header_size, "parsed request header");
                ensure!(header_size <= MAX_HEADER_BYTES, ParseError::too_large_header(header_size, MAX_HEADER_BYTES));

                let version = match req.version {
                    Some(0) => Version::HTTP_10,
                    Some(1) => Version::HTTP_11,
                    v => return Err(ParseError::InvalidVersion(v)),
                };

                let method = req.method.ok_or(ParseError::InvalidMethod)?;
                let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
                let uri = req.path.ok_or(ParseError::InvalidUri)?;
                let uri = Uri::try_from(uri).map_err(|_| ParseError::InvalidUri)?;

                let mut fields = KeyValueList::with_capacity(req.headers.len());
                for header in req.headers.iter() {
                    let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
                    let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
                    fields.push(name, value);
                }

                let content_length = parse_content_length(&fields)?;

                let head = RequestHead::new(method, uri, version, fields);
                let _ = src.split_to(header_size);
                Ok(Some((head, content_length)))
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}

/// Reads the body length from `Content-Length`.
///
/// Repeated `Content-Length` fields must agree, and any `Transfer-Encoding` field
/// makes the request unacceptable since only length-delimited bodies are supported.
fn parse_content_length(headers: &KeyValueList) -> Result<u64, ParseError> {
    ensure!(!headers.contains(http::header::TRANSFER_ENCODING.as_str()), ParseError::UnsupportedTransferEncoding);

    let mut length = None;
    for value in headers.get_all(http::header::CONTENT_LENGTH.as_str()) {
        let value = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
        let parsed =
            value.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {value} is not u64")))?;

        match length {
            Some(previous) if previous != parsed => {
                return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {parsed}")));
            }
            _ => length = Some(parsed),
        }
    }

    Ok(length.unwrap_or(0))
}

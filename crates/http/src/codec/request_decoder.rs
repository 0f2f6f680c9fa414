//! HTTP request decoder module
//!
//! Turns the byte stream of a connection into complete [`HttpRequest`]s. Header lines
//! and body bytes may arrive split across any number of reads; the decoder keeps its
//! state between calls and resets after every request so the next request on a
//! keep-alive connection starts fresh.
//!
//! The three outcomes of [`Decoder::decode`] map to the parser states used by the
//! connection:
//!
//! - `Ok(None)`: need more data
//! - `Ok(Some(request))`: a request is ready
//! - `Err(_)`: the input is malformed
//!
//! # Example
//!
//! ```
//! use nio_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new("127.0.0.1:9000".parse().unwrap());
//! let mut buffer = BytesMut::from("POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel");
//! assert!(decoder.decode(&mut buffer).unwrap().is_none());
//!
//! buffer.extend_from_slice(b"lo");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(&request.body()[..], b"hello");
//! ```

use std::net::SocketAddr;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::header::HeaderDecoder;
use crate::ensure;
use crate::protocol::{HttpRequest, ParseError, RequestHead};

/// Default upper bound for a request body.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// A decoder for complete HTTP requests.
///
/// # State Machine
///
/// The decoder maintains its state through the `pending` field:
/// - `None`: currently parsing headers
/// - `Some((head, length))`: headers done, waiting until `length` body bytes are buffered
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    pending: Option<(RequestHead, usize)>,
    remote_addr: SocketAddr,
    max_body_size: usize,
}

impl RequestDecoder {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self::with_max_body_size(remote_addr, DEFAULT_MAX_BODY_SIZE)
    }

    pub fn with_max_body_size(remote_addr: SocketAddr, max_body_size: usize) -> Self {
        Self { header_decoder: HeaderDecoder, pending: None, remote_addr, max_body_size }
    }
}

impl Decoder for RequestDecoder {
    type Item = HttpRequest;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let body_len = match &self.pending {
            Some((_, body_len)) => *body_len,
            None => match self.header_decoder.decode(src)? {
                Some((head, content_length)) => {
                    let body_len = usize::try_from(content_length).unwrap_or(usize::MAX);
                    ensure!(body_len <= self.max_body_size, ParseError::too_large_body(content_length, self.max_body_size));
                    self.pending = Some((head, body_len));
                    body_len
                }
                None => return Ok(None),
            },
        };

        if src.len() < body_len {
            src.reserve(body_len - src.len());
            return Ok(None);
        }

        let body = src.split_to(body_len).freeze();
        match self.pending.take() {
            Some((head, _)) => Ok(Some(head.into_request(body, self.remote_addr))),
            None => Ok(None),
        }
    }
}

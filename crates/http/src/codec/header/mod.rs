//! HTTP header processing for requests and responses.
//!
//! - [`HeaderDecoder`]: decodes request start-line and header fields from raw bytes
//!   - Supports HTTP/1.0 and HTTP/1.1
//!   - Enforces header size and count limits
//!   - Resolves the `Content-Length` of the body
//!
//! - [`HeaderEncoder`]: encodes a [`ResponseHead`] to bytes
//!   - Writes the status line, `Content-Type` and caller headers
//!   - Appends the computed `Content-Length`

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
pub use header_encoder::ResponseHead;

//! Wire codecs for the HTTP stage of a connection.
//!
//! - Request handling:
//!   - [`RequestDecoder`]: incremental decoder producing complete requests
//!   - Header parsing via the [`header`] module
//!
//! - Response handling:
//!   - [`HttpResponse`]: the send capability handed to handlers
//!   - [`HttpResponseExt`]: framing helpers building status line, headers and body
//!     into one buffer
//!
//! The WebSocket frame codec lives in [`crate::websocket`].

pub mod header;
mod request_decoder;
mod response_writer;

pub use request_decoder::DEFAULT_MAX_BODY_SIZE;
pub use request_decoder::RequestDecoder;
pub use response_writer::HttpResponse;
pub use response_writer::HttpResponseExt;

#[cfg(test)]
pub(crate) use response_writer::tests::RecordingResponse;

//! Core protocol types shared by the HTTP and WebSocket stages of a connection.
//!
//! - [`HttpRequest`]: a fully parsed request, immutable once produced by the decoder
//! - [`KeyValueList`]: ordered header list with case-insensitive lookup
//! - [`SendResult`]: outcome of a single non-blocking write attempt
//! - [`Charset`]: text encodings understood by responses and WebSocket text frames
//!
//! # Error Handling
//!
//! - [`HttpError`]: Top-level error type
//! - [`ParseError`]: Request parsing errors
//! - [`SendError`]: Response sending errors
//! - [`HandlerError`]: Errors raised by application callbacks

mod charset;
pub use charset::Charset;
pub use charset::CharsetError;

mod key_value;
pub use key_value::KeyValueList;

mod request;
pub use request::HttpRequest;
pub use request::RequestHead;

mod send_result;
pub use send_result::SendResult;

mod error;
pub use error::HandlerError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

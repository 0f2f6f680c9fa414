//! Server side of the RFC 6455 opening handshake.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::Method;
use sha1::{Digest, Sha1};

use crate::ensure;
use crate::protocol::HttpRequest;
use crate::websocket::HandshakeError;

/// Magic string appended to the client key before hashing.
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this server speaks.
pub const WS_VERSION: &str = "13";

/// `base64(sha1(key + GUID))`, the value of `Sec-WebSocket-Accept`.
pub fn compute_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Checks that `request` is a well formed upgrade and returns the accept key to send back.
pub fn validate(request: &HttpRequest) -> Result<String, HandshakeError> {
    ensure!(request.method() == Method::GET, HandshakeError::InvalidMethod(request.method().clone()));

    let headers = request.headers();
    ensure!(headers.contains("upgrade"), HandshakeError::MissingHeader("Upgrade"));
    ensure!(headers.contains_token("upgrade", "websocket"), HandshakeError::InvalidUpgrade);
    ensure!(headers.contains("connection"), HandshakeError::MissingHeader("Connection"));
    ensure!(headers.contains_token("connection", "upgrade"), HandshakeError::InvalidConnection);

    let version = headers.get_str("sec-websocket-version").ok_or(HandshakeError::MissingHeader("Sec-WebSocket-Version"))?;
    ensure!(version.trim() == WS_VERSION, HandshakeError::UnsupportedVersion(version.to_string()));

    let key = headers.get_str("sec-websocket-key").ok_or(HandshakeError::MissingHeader("Sec-WebSocket-Key"))?.trim();
    match STANDARD.decode(key) {
        Ok(decoded) if decoded.len() == 16 => Ok(compute_accept_key(key)),
        _ => Err(HandshakeError::InvalidKey),
    }
}

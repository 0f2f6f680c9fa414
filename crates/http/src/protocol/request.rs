//! HTTP request representation.
//!
//! A request is produced in two steps: the header decoder builds a [`RequestHead`]
//! once the header section is complete, then the request decoder attaches the
//! `Content-Length` delimited body and the peer address to form an [`HttpRequest`].

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderValue, Method, Uri, Version};

use crate::protocol::KeyValueList;

/// The start-line and header section of a request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) version: Version,
    pub(crate) headers: KeyValueList,
}

impl RequestHead {
    pub fn new(method: Method, uri: Uri, version: Version, headers: KeyValueList) -> Self {
        Self { method, uri, version, headers }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &KeyValueList {
        &self.headers
    }

    /// Attaches the body and peer address, completing the request.
    pub fn into_request(self, body: Bytes, remote_addr: SocketAddr) -> HttpRequest {
        HttpRequest { head: self, body, remote_addr }
    }
}

/// A fully received HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    head: RequestHead,
    body: Bytes,
    remote_addr: SocketAddr,
}

impl HttpRequest {
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// The request target exactly as sent on the request line.
    pub fn request_uri(&self) -> &Uri {
        &self.head.uri
    }

    /// The path component used for routing, without the query string.
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.head.uri.query()
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &KeyValueList {
        &self.head.headers
    }

    /// Shortcut for a case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.head.headers.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    /// Whether the client asked to close the connection after this exchange.
    pub fn wants_close(&self) -> bool {
        match self.head.version {
            Version::HTTP_10 => !self.head.headers.contains_token(http::header::CONNECTION.as_str(), "keep-alive"),
            _ => self.head.headers.contains_token(http::header::CONNECTION.as_str(), "close"),
        }
    }
}

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use nio_http::codec::{HttpResponse, RequestDecoder};
use nio_http::protocol::{HttpRequest, SendResult};
use tokio_util::codec::Decoder;

pub(crate) fn remote_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40000))
}

/// Decodes one complete request from `raw`.
pub(crate) fn request(raw: &str) -> HttpRequest {
    let mut buf = BytesMut::from(raw);
    RequestDecoder::new(remote_addr()).decode(&mut buf).unwrap().unwrap()
}

/// Response capability that records every frame and accepts it in full.
#[derive(Debug, Default)]
pub(crate) struct RecordingResponse {
    pub(crate) frames: Vec<Bytes>,
}

impl RecordingResponse {
    pub(crate) fn text(&self) -> String {
        self.frames.iter().map(|frame| String::from_utf8_lossy(frame).into_owned()).collect()
    }
}

impl HttpResponse for RecordingResponse {
    fn send(&mut self, full_response: Bytes) -> SendResult {
        self.frames.push(full_response);
        SendResult::Full
    }

    fn remote_addr(&self) -> SocketAddr {
        remote_addr()
    }
}

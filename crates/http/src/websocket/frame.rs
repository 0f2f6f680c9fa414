//! WebSocket frame codec.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```
//!
//! The decoder is stateless across calls: an incomplete frame leaves the buffer
//! untouched and is parsed again once more bytes arrive.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::ensure;
use crate::websocket::{WsError, close_code};

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Result<Self, WsError> {
        match value {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            _ => Err(WsError::InvalidOpcode(value)),
        }
    }

    /// Close, Ping and Pong.
    #[inline]
    pub fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: Opcode,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(fin: bool, opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self { fin, opcode, payload: payload.into() }
    }

    pub fn text(payload: impl Into<Bytes>) -> Self {
        Self::new(true, Opcode::Text, payload)
    }

    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::new(true, Opcode::Binary, payload)
    }

    pub fn ping(payload: impl Into<Bytes>) -> Self {
        Self::new(true, Opcode::Ping, payload)
    }

    pub fn pong(payload: impl Into<Bytes>) -> Self {
        Self::new(true, Opcode::Pong, payload)
    }

    /// A close frame with an optional status code and reason.
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = match code {
            Some(code) => {
                let mut buf = BytesMut::with_capacity(2 + reason.len());
                buf.put_u16(code);
                buf.put_slice(reason.as_bytes());
                buf.freeze()
            }
            None => Bytes::new(),
        };
        Self::new(true, Opcode::Close, payload)
    }

    /// Status code of a close frame: `Ok(None)` for an empty payload.
    ///
    /// Fails when the code may not appear on the wire or the reason is not UTF-8.
    pub fn close_code(&self) -> Result<Option<u16>, WsError> {
        match self.payload.len() {
            0 => Ok(None),
            1 => Err(WsError::InvalidClosePayload),
            _ => {
                let code = u16::from_be_bytes([self.payload[0], self.payload[1]]);
                ensure!(close_code::is_valid(code), WsError::InvalidClosePayload);
                ensure!(std::str::from_utf8(&self.payload[2..]).is_ok(), WsError::InvalidClosePayload);
                Ok(Some(code))
            }
        }
    }

    /// Serializes the frame; `mask` must be set for client to server frames only.
    pub fn write_to(&self, mask: Option<[u8; 4]>, dst: &mut BytesMut) {
        let len = self.payload.len();
        dst.reserve(14 + len);

        let fin_bit = if self.fin { 0x80 } else { 0x00 };
        dst.put_u8(fin_bit | self.opcode as u8);

        let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
        match len {
            0..=125 => dst.put_u8(mask_bit | len as u8),
            126..=0xFFFF => {
                dst.put_u8(mask_bit | 126);
                dst.put_u16(len as u16);
            }
            _ => {
                dst.put_u8(mask_bit | 127);
                dst.put_u64(len as u64);
            }
        }

        match mask {
            Some(key) => {
                dst.put_slice(&key);
                let start = dst.len();
                dst.put_slice(&self.payload);
                apply_mask(&mut dst[start..], key);
            }
            None => dst.put_slice(&self.payload),
        }
    }
}

/// XORs `buf` in place with the 4-byte masking key; applying it twice restores the input.
pub fn apply_mask(buf: &mut [u8], key: [u8; 4]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= key[i & 3];
    }
}

/// Which side of the connection the codec runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Inbound frames must be masked.
    Server,
    /// Inbound frames must not be masked.
    Client,
}

#[derive(Debug, Clone)]
pub struct FrameCodec {
    role: Role,
    max_payload_size: usize,
}

impl FrameCodec {
    /// Default maximum payload size (16 MB).
    pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

    pub fn new(role: Role) -> Self {
        Self { role, max_payload_size: Self::DEFAULT_MAX_PAYLOAD_SIZE }
    }

    pub fn server() -> Self {
        Self::new(Role::Server)
    }

    pub fn client() -> Self {
        Self::new(Role::Client)
    }

    #[must_use]
    pub fn max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = size;
        self
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = WsError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 2 {
            return Ok(None);
        }

        let (first, second) = (src[0], src[1]);
        ensure!(first & 0x70 == 0, WsError::ReservedBitsSet);

        let fin = first & 0x80 != 0;
        let opcode = Opcode::from_u8(first & 0x0F)?;
        let masked = second & 0x80 != 0;
        match (self.role, masked) {
            (Role::Server, false) => return Err(WsError::UnmaskedClientFrame),
            (Role::Client, true) => return Err(WsError::MaskedServerFrame),
            _ => {}
        }

        let (payload_len, mut header_len) = match second & 0x7F {
            126 => {
                if src.len() < 4 {
                    return Ok(None);
                }
                (u64::from(u16::from_be_bytes([src[2], src[3]])), 4)
            }
            127 => {
                if src.len() < 10 {
                    return Ok(None);
                }
                let mut len = [0u8; 8];
                len.copy_from_slice(&src[2..10]);
                (u64::from_be_bytes(len), 10)
            }
            n => (u64::from(n), 2),
        };

        if opcode.is_control() {
            ensure!(fin, WsError::FragmentedControlFrame);
            ensure!(payload_len <= MAX_CONTROL_PAYLOAD as u64, WsError::ControlFrameTooLarge(payload_len));
        }

        let payload_len = match usize::try_from(payload_len) {
            Ok(len) if len <= self.max_payload_size => len,
            _ => return Err(WsError::PayloadTooLarge { size: payload_len, max: self.max_payload_size }),
        };

        let mask_key = if masked {
            if src.len() < header_len + 4 {
                return Ok(None);
            }
            let key = [src[header_len], src[header_len + 1], src[header_len + 2], src[header_len + 3]];
            header_len += 4;
            Some(key)
        } else {
            None
        };

        let frame_len = header_len + payload_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(header_len);
        let mut payload = src.split_to(payload_len);
        if let Some(key) = mask_key {
            apply_mask(&mut payload, key);
        }

        Ok(Some(Frame { fin, opcode, payload: payload.freeze() }))
    }
}

/// Writes frames without a mask, as a server must.
impl Encoder<Frame> for FrameCodec {
    type Error = WsError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        frame.write_to(None, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASK: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

    fn masked(frame: &Frame) -> BytesMut {
        let mut buf = BytesMut::new();
        frame.write_to(Some(MASK), &mut buf);
        buf
    }

    #[test]
    fn rfc_masked_hello() {
        // RFC 6455 section 5.7
        let mut buf = BytesMut::from(&[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58][..]);
        let frame = FrameCodec::server().decode(&mut buf).unwrap().unwrap();

        assert!(frame.fin);
        assert_eq!(frame.opcode, Opcode::Text);
        assert_eq!(&frame.payload[..], b"Hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn masked_payloads_across_length_encodings() {
        for len in [0usize, 1, 125, 126, 127, 1000, 65535, 65536, 70000] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let mut buf = masked(&Frame::binary(payload.clone()));

            let header_len = match len {
                0..=125 => 6,
                126..=65535 => 8,
                _ => 14,
            };
            assert_eq!(buf.len(), header_len + len, "header size for {len}");

            let frame = FrameCodec::server().decode(&mut buf).unwrap().unwrap();
            assert_eq!(frame.payload.len(), len);
            assert_eq!(&frame.payload[..], &payload[..], "payload for {len}");
        }
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let whole = masked(&Frame::text(vec![b'x'; 300]));
        let mut codec = FrameCodec::server();
        let mut buf = BytesMut::new();

        for chunk in whole.chunks(7) {
            assert!(buf.is_empty() || codec.decode(&mut buf).unwrap().is_none());
            buf.extend_from_slice(chunk);
        }

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.payload.len(), 300);
    }

    #[test]
    fn server_frames_are_unmasked() {
        let mut dst = BytesMut::new();
        FrameCodec::server().encode(Frame::text("hello"), &mut dst).unwrap();
        assert_eq!(&dst[..], b"\x81\x05hello");

        let frame = FrameCodec::client().decode(&mut dst).unwrap().unwrap();
        assert_eq!(&frame.payload[..], b"hello");
    }

    #[test]
    fn reject_unmasked_client_frame() {
        let mut buf = BytesMut::from(&b"\x81\x05hello"[..]);
        assert!(matches!(FrameCodec::server().decode(&mut buf), Err(WsError::UnmaskedClientFrame)));
    }

    #[test]
    fn reject_invalid_opcode_and_reserved_bits() {
        let mut buf = BytesMut::from(&[0x83, 0x80, 0, 0, 0, 0][..]);
        assert!(matches!(FrameCodec::server().decode(&mut buf), Err(WsError::InvalidOpcode(3))));

        let mut buf = BytesMut::from(&[0xC1, 0x80, 0, 0, 0, 0][..]);
        assert!(matches!(FrameCodec::server().decode(&mut buf), Err(WsError::ReservedBitsSet)));
    }

    #[test]
    fn reject_bad_control_frames() {
        let mut buf = masked(&Frame::new(false, Opcode::Ping, "x"));
        assert!(matches!(FrameCodec::server().decode(&mut buf), Err(WsError::FragmentedControlFrame)));

        let mut buf = masked(&Frame::ping(vec![0u8; 126]));
        assert!(matches!(FrameCodec::server().decode(&mut buf), Err(WsError::ControlFrameTooLarge(126))));
    }

    #[test]
    fn reject_oversized_payload_from_header() {
        let mut buf = BytesMut::from(&[0x82, 0xFF, 0, 0, 0, 0, 0, 1, 0, 0][..]);
        let result = FrameCodec::server().max_payload_size(1024).decode(&mut buf);
        assert!(matches!(result, Err(WsError::PayloadTooLarge { size: 65536, max: 1024 })));
    }

    #[test]
    fn close_frame_code() {
        let frame = Frame::close(Some(1000), "bye");
        assert_eq!(frame.close_code().unwrap(), Some(1000));
        assert_eq!(&frame.payload[2..], b"bye");
        assert!(Frame::new(true, Opcode::Close, vec![3u8]).close_code().is_err());
    }

    #[test]
    fn close_frame_rejects_reserved_codes_and_bad_reason() {
        for code in [0u16, 999, 1004, 1005, 1006, 1015, 2999, 5000] {
            let frame = Frame::new(true, Opcode::Close, code.to_be_bytes().to_vec());
            assert!(matches!(frame.close_code(), Err(WsError::InvalidClosePayload)), "code {code}");
        }
        for code in [1000u16, 1003, 1007, 1011, 3000, 4999] {
            assert_eq!(Frame::close(Some(code), "").close_code().unwrap(), Some(code));
        }

        let frame = Frame::new(true, Opcode::Close, vec![0x03, 0xe8, 0xff, 0xfe]);
        assert!(matches!(frame.close_code(), Err(WsError::InvalidClosePayload)));
    }
}

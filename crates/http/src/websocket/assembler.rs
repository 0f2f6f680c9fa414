use bytes::{Bytes, BytesMut};

use crate::ensure;
use crate::websocket::{Frame, Opcode, WsError};

/// A complete data message, reassembled from one or more frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(Bytes),
    Binary(Bytes),
}

/// Joins fragmented data frames back into whole messages.
///
/// Control frames never reach the assembler; the stream handles them as they arrive,
/// even between the fragments of a data message.
#[derive(Debug)]
pub struct MessageAssembler {
    kind: Option<Opcode>,
    fragments: BytesMut,
    max_message_size: usize,
}

impl MessageAssembler {
    pub fn new(max_message_size: usize) -> Self {
        Self { kind: None, fragments: BytesMut::new(), max_message_size }
    }

    pub fn is_assembling(&self) -> bool {
        self.kind.is_some()
    }

    /// Feeds one data frame; returns the message once its final fragment arrived.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>, WsError> {
        match frame.opcode {
            Opcode::Continuation => {
                let Some(kind) = self.kind else {
                    return Err(WsError::UnexpectedContinuation);
                };
                let size = self.fragments.len() + frame.payload.len();
                ensure!(size <= self.max_message_size, WsError::PayloadTooLarge { size: size as u64, max: self.max_message_size });
                self.fragments.extend_from_slice(&frame.payload);

                if !frame.fin {
                    return Ok(None);
                }
                self.kind = None;
                Ok(Some(to_message(kind, self.fragments.split().freeze())))
            }
            Opcode::Text | Opcode::Binary => {
                ensure!(self.kind.is_none(), WsError::InterleavedDataFrame);
                if frame.fin {
                    return Ok(Some(to_message(frame.opcode, frame.payload)));
                }
                self.kind = Some(frame.opcode);
                self.fragments.extend_from_slice(&frame.payload);
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}

fn to_message(kind: Opcode, payload: Bytes) -> Message {
    match kind {
        Opcode::Text => Message::Text(payload),
        _ => Message::Binary(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_message() {
        let mut assembler = MessageAssembler::new(1024);
        assert_eq!(assembler.push(Frame::text("hi")).unwrap(), Some(Message::Text(Bytes::from_static(b"hi"))));
        assert!(!assembler.is_assembling());
    }

    #[test]
    fn fragmented_message() {
        let mut assembler = MessageAssembler::new(1024);
        assert_eq!(assembler.push(Frame::new(false, Opcode::Binary, "ab")).unwrap(), None);
        assert_eq!(assembler.push(Frame::new(false, Opcode::Continuation, "cd")).unwrap(), None);
        assert!(assembler.is_assembling());

        let message = assembler.push(Frame::new(true, Opcode::Continuation, "ef")).unwrap();
        assert_eq!(message, Some(Message::Binary(Bytes::from_static(b"abcdef"))));
        assert!(!assembler.is_assembling());
    }

    #[test]
    fn reject_out_of_order_frames() {
        let mut assembler = MessageAssembler::new(1024);
        assert!(matches!(assembler.push(Frame::new(true, Opcode::Continuation, "x")), Err(WsError::UnexpectedContinuation)));

        assembler.push(Frame::new(false, Opcode::Text, "x")).unwrap();
        assert!(matches!(assembler.push(Frame::text("y")), Err(WsError::InterleavedDataFrame)));
    }

    #[test]
    fn reject_oversized_message() {
        let mut assembler = MessageAssembler::new(4);
        assembler.push(Frame::new(false, Opcode::Text, "abc")).unwrap();
        let result = assembler.push(Frame::new(true, Opcode::Continuation, "de"));
        assert!(matches!(result, Err(WsError::PayloadTooLarge { size: 5, max: 4 })));
    }
}

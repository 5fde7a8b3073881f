//! Byte-at-a-time packet assembly.

use heapless::Vec;

use crate::mount::AxisId;

use super::{payload_len, ErrorCode, Packet, PACKET_START, TERMINATOR};

enum State {
    /// Discarding bytes until a start marker.
    Idle,
    /// Accumulating command, axis and payload.
    Collecting,
}

/// Incremental parser for `:<cmd><axis><payload><cr>` packets.
///
/// Feed it one received byte at a time; a start marker anywhere restarts
/// packet assembly, so a garbled line costs at most one error reply.
pub struct PacketParser {
    state: State,
    buf: Vec<u8, 9>,
}

/// Result of feeding one byte to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Packet not yet complete.
    Pending,
    /// A well-formed packet arrived.
    Packet(Packet),
    /// A terminator arrived but the packet was malformed; reply with the
    /// error code.
    Fault(ErrorCode),
}

impl PacketParser {
    /// New parser in the idle state.
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            buf: Vec::new(),
        }
    }

    /// Process one received byte.
    pub fn push(&mut self, byte: u8) -> Decoded {
        if byte == PACKET_START {
            self.state = State::Collecting;
            self.buf.clear();
            return Decoded::Pending;
        }

        match self.state {
            State::Idle => Decoded::Pending,
            State::Collecting => {
                if byte == TERMINATOR {
                    self.state = State::Idle;
                    return self.finish();
                }
                if self.buf.push(byte).is_err() {
                    // Longer than any legal packet; keep consuming until
                    // the terminator and fail there.
                }
                Decoded::Pending
            }
        }
    }

    fn finish(&mut self) -> Decoded {
        let buf = &self.buf;
        if buf.len() < 2 {
            return Decoded::Fault(ErrorCode::InvalidLength);
        }

        let command = buf[0];
        let expected = match payload_len(command) {
            Some(len) => len,
            None => return Decoded::Fault(ErrorCode::UnknownCommand),
        };

        let axis = match buf[1] {
            b'1' => AxisId::Ra,
            b'2' => AxisId::Dec,
            _ => return Decoded::Fault(ErrorCode::InvalidCharacter),
        };

        let payload = &buf[2..];
        if payload.len() != expected {
            return Decoded::Fault(ErrorCode::InvalidLength);
        }

        Decoded::Packet(Packet {
            command,
            axis,
            payload: Vec::from_slice(payload).unwrap_or_default(),
        })
    }
}

impl Default for PacketParser {
    fn default() -> Self {
        Self::new()
    }
}

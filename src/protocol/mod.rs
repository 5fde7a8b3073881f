//! The Synta/Skywatcher serial protocol.
//!
//! Command packets arrive as ASCII `:<cmd><axis><payload><cr>` where the
//! axis selector is `1` (RA) or `2` (DEC) and the payload is hex. Replies
//! are `=<payload><cr>` on success and `!<code><cr>` on error. Multi-byte
//! hex values travel least-significant byte first.

mod parser;
mod wire;

pub use parser::{Decoded, PacketParser};
pub use wire::{decode_value, encode_value};

use crate::mount::AxisId;

/// Packet start marker.
pub const PACKET_START: u8 = b':';
/// Success reply marker.
pub const REPLY_OK: u8 = b'=';
/// Error reply marker.
pub const REPLY_ERR: u8 = b'!';
/// Packet and reply terminator.
pub const TERMINATOR: u8 = b'\r';

/// Reply buffer: large enough for `=` + 6 hex chars + `<cr>`.
pub type Reply = heapless::String<10>;

/// Protocol-level fault codes carried in `!<code>` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// Command letter not recognised.
    UnknownCommand = 0,
    /// Payload length wrong for the command.
    InvalidLength = 1,
    /// Command refused while the motor is in the wrong state (e.g. `F` in
    /// programming mode).
    MotorBusy = 2,
    /// Axis selector or payload character out of range.
    InvalidCharacter = 3,
    /// Motion command while the mount is unconfigured.
    NotInitialized = 4,
}

/// A validated command packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Command letter.
    pub command: u8,
    /// Addressed axis.
    pub axis: AxisId,
    /// Raw payload characters.
    pub payload: heapless::Vec<u8, 6>,
}

impl Packet {
    /// Decode the hex payload. `None` when a character is not hex.
    pub fn value(&self) -> Option<u32> {
        wire::decode_value(&self.payload)
    }
}

/// Payload length the host sends with a command, or `None` for an unknown
/// command letter.
pub fn payload_len(command: u8) -> Option<usize> {
    match command {
        // Read-only queries and bare controls.
        b'e' | b'a' | b'b' | b'g' | b's' | b'f' | b'j' | b'n' | b'd' | b'z' | b'c' | b'q'
        | b'x' | b'J' | b'K' | b'L' | b'F' | b'R' | b'T' => Some(0),
        // Single-digit settings.
        b'C' | b'O' => Some(1),
        // Single-byte settings.
        b'G' | b'D' | b'Z' | b'Q' | b'Y' => Some(2),
        // 24-bit settings.
        b'E' | b'H' | b'I' | b'M' | b'A' | b'B' | b'S' | b'N' | b'X' => Some(6),
        _ => None,
    }
}

/// Width of the data field in a successful reply to a command.
pub fn reply_len(command: u8) -> usize {
    match command {
        b'e' | b'a' | b'b' | b's' | b'j' | b'n' | b'x' => 6,
        b'f' => 3,
        b'g' | b'd' | b'z' | b'c' | b'q' => 2,
        _ => 0,
    }
}

/// Build an empty success reply.
pub fn empty_reply() -> Reply {
    let mut reply = Reply::new();
    let _ = reply.push(REPLY_OK as char);
    let _ = reply.push(TERMINATOR as char);
    reply
}

/// Build a success reply carrying `value` at the width the command calls
/// for.
pub fn data_reply(command: u8, value: u32) -> Reply {
    let mut reply = Reply::new();
    let _ = reply.push(REPLY_OK as char);
    wire::encode_value(&mut reply, value, reply_len(command));
    let _ = reply.push(TERMINATOR as char);
    reply
}

/// Build an error reply.
pub fn error_reply(code: ErrorCode) -> Reply {
    let mut reply = Reply::new();
    let _ = reply.push(REPLY_ERR as char);
    let _ = reply.push((b'0' + code as u8) as char);
    let _ = reply.push(TERMINATOR as char);
    reply
}

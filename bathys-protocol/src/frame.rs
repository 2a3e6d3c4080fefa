//! Frame encoding and payload decoding for the probe telemetry protocol.
//!
//! Frame format:
//! - SYNC (2 bytes): 0x40 0x46 synchronization marker
//! - CMD (1 byte): always 0x09
//! - LENGTH (1 byte): number of bytes from SUB_CMD to the end of the payload
//! - SUB_CMD (1 byte): payload shape (pump, field sample, message)
//! - PAYLOAD (LENGTH - 1 bytes): shape-specific data
//! - CHECKSUM (1 byte): XOR of all preceding bytes

use heapless::{String, Vec};

/// Frame synchronization marker
pub const SYNC_MARKER: [u8; 2] = [0x40, 0x46];

/// The only command value accepted on this link
pub const CMD_TELEMETRY: u8 = 0x09;

/// SYNC + CMD + LENGTH
pub const HEADER_LEN: usize = 4;

/// Smallest frame worth looking at (header + checksum)
pub const MIN_FRAME_LEN: usize = HEADER_LEN + 1;

/// Largest LENGTH value accepted
pub const MAX_BODY_LEN: usize = 200;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = MAX_BODY_LEN + MIN_FRAME_LEN;

/// Maximum bytes kept from a field sample label
pub const MAX_LABEL_LEN: usize = 64;

/// Maximum bytes kept from an operator message
pub const MAX_MESSAGE_LEN: usize = 122;

/// SUB_CMD + two floats
const PUMP_BODY_LEN: usize = 9;

/// SUB_CMD + field id + one float
const TAGGED_BODY_LEN: usize = 6;

// Sub-command wire values
const SUB_PUMP: u8 = 0x01;
const SUB_FIELD_SAMPLE: u8 = 0x02;
const SUB_MESSAGE: u8 = 0x03;

/// Errors that can occur while building or encoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Encoded body would exceed `MAX_BODY_LEN`
    PayloadTooLarge,
    /// Label or message text exceeds its capacity
    TextTooLong,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Payload shape selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubCommand {
    /// Two pump pressure readings
    Pump,
    /// One identified measurement
    FieldSample,
    /// Operator message with auto-close time
    Message,
}

impl SubCommand {
    /// Parse a sub-command from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SUB_PUMP => Some(SubCommand::Pump),
            SUB_FIELD_SAMPLE => Some(SubCommand::FieldSample),
            SUB_MESSAGE => Some(SubCommand::Message),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            SubCommand::Pump => SUB_PUMP,
            SubCommand::FieldSample => SUB_FIELD_SAMPLE,
            SubCommand::Message => SUB_MESSAGE,
        }
    }
}

/// Decoded payload of a validated frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    Pump {
        pressure_a: f32,
        pressure_b: f32,
    },
    FieldSample {
        field_id: u8,
        value: f32,
        /// Display fallback only; may be empty
        label: String<MAX_LABEL_LEN>,
    },
    Message {
        /// Placeholder, not interpreted
        field_id: u8,
        auto_close_s: f32,
        text: String<MAX_MESSAGE_LEN>,
    },
}

impl Payload {
    /// Decode the bytes covered by LENGTH (SUB_CMD first)
    ///
    /// Returns `None` for unknown sub-commands or bodies too short for
    /// their shape. Text beyond the destination capacity is truncated.
    pub fn decode(body: &[u8]) -> Option<Self> {
        let (&sub, rest) = body.split_first()?;

        match SubCommand::from_byte(sub)? {
            SubCommand::Pump => {
                if body.len() < PUMP_BODY_LEN {
                    return None;
                }
                Some(Payload::Pump {
                    pressure_a: read_f32(rest.get(0..4)?)?,
                    pressure_b: read_f32(rest.get(4..8)?)?,
                })
            }
            SubCommand::FieldSample => {
                if body.len() < TAGGED_BODY_LEN {
                    return None;
                }
                Some(Payload::FieldSample {
                    field_id: rest[0],
                    value: read_f32(rest.get(1..5)?)?,
                    label: text_from_bytes(rest.get(5..).unwrap_or(&[])),
                })
            }
            SubCommand::Message => {
                if body.len() < TAGGED_BODY_LEN {
                    return None;
                }
                Some(Payload::Message {
                    field_id: rest[0],
                    auto_close_s: read_f32(rest.get(1..5)?)?,
                    text: text_from_bytes(rest.get(5..).unwrap_or(&[])),
                })
            }
        }
    }

    /// Sub-command this payload is carried under
    pub fn sub_command(&self) -> SubCommand {
        match self {
            Payload::Pump { .. } => SubCommand::Pump,
            Payload::FieldSample { .. } => SubCommand::FieldSample,
            Payload::Message { .. } => SubCommand::Message,
        }
    }

    /// Write SUB_CMD and payload into `out`, returning the body length
    fn encode_body(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        let mut body = Vec::<u8, MAX_BODY_LEN>::new();

        put(&mut body, &[self.sub_command().to_byte()])?;
        match self {
            Payload::Pump {
                pressure_a,
                pressure_b,
            } => {
                put(&mut body, &pressure_a.to_le_bytes())?;
                put(&mut body, &pressure_b.to_le_bytes())?;
            }
            Payload::FieldSample {
                field_id,
                value,
                label,
            } => {
                put(&mut body, &[*field_id])?;
                put(&mut body, &value.to_le_bytes())?;
                put(&mut body, label.as_bytes())?;
            }
            Payload::Message {
                field_id,
                auto_close_s,
                text,
            } => {
                put(&mut body, &[*field_id])?;
                put(&mut body, &auto_close_s.to_le_bytes())?;
                put(&mut body, text.as_bytes())?;
            }
        }

        if out.len() < body.len() {
            return Err(FrameError::BufferTooSmall);
        }
        out[..body.len()].copy_from_slice(&body);
        Ok(body.len())
    }
}

/// Append to a frame body, failing once LENGTH would exceed `MAX_BODY_LEN`
fn put(body: &mut Vec<u8, MAX_BODY_LEN>, bytes: &[u8]) -> Result<(), FrameError> {
    body.extend_from_slice(bytes)
        .map_err(|_| FrameError::PayloadTooLarge)
}

/// A checksum-validated telemetry frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Command byte (always `CMD_TELEMETRY` once parsed)
    pub command: u8,
    /// Decoded payload
    pub payload: Payload,
}

impl Frame {
    /// Create a telemetry frame around a payload
    pub fn new(payload: Payload) -> Self {
        Self {
            command: CMD_TELEMETRY,
            payload,
        }
    }

    /// Pump pressure frame
    pub fn pump(pressure_a: f32, pressure_b: f32) -> Self {
        Self::new(Payload::Pump {
            pressure_a,
            pressure_b,
        })
    }

    /// Field sample frame with an optional label
    pub fn sample(field_id: u8, value: f32, label: &str) -> Result<Self, FrameError> {
        let label = String::try_from(label).map_err(|_| FrameError::TextTooLong)?;
        Ok(Self::new(Payload::FieldSample {
            field_id,
            value,
            label,
        }))
    }

    /// Operator message frame
    pub fn message(text: &str, auto_close_s: f32) -> Result<Self, FrameError> {
        let text = String::try_from(text).map_err(|_| FrameError::TextTooLong)?;
        Ok(Self::new(Payload::Message {
            field_id: 0,
            auto_close_s,
            text,
        }))
    }

    /// Sub-command of the carried payload
    pub fn sub_command(&self) -> SubCommand {
        self.payload.sub_command()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let mut body = [0u8; MAX_BODY_LEN];
        let body_len = self.payload.encode_body(&mut body)?;
        let frame_len = body_len + MIN_FRAME_LEN;
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[..2].copy_from_slice(&SYNC_MARKER);
        buffer[2] = self.command;
        buffer[3] = body_len as u8;
        buffer[HEADER_LEN..HEADER_LEN + body_len].copy_from_slice(&body[..body_len]);
        buffer[frame_len - 1] = checksum(&buffer[..frame_len - 1]);

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// XOR of all bytes
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}

fn read_f32(bytes: &[u8]) -> Option<f32> {
    let raw: [u8; 4] = bytes.try_into().ok()?;
    Some(f32::from_le_bytes(raw))
}

/// Build a string from wire text: stops at the first NUL, truncates to
/// capacity, and keeps only the longest valid UTF-8 prefix.
fn text_from_bytes<const N: usize>(bytes: &[u8]) -> String<N> {
    let bytes = match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    };
    let bytes = &bytes[..bytes.len().min(N)];
    let text = match core::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
    };

    let mut out = String::new();
    // Cannot overflow: text.len() <= N
    let _ = out.push_str(text);
    out
}

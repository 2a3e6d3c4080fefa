//! Deterministic frame generator

use bathys_protocol::{Frame, FrameError};
use heapless::Vec;

/// Largest burst produced by one [`StreamSimulator::next_burst`]
pub const SIM_BURST_CAP: usize = 64;

/// Field cycle: identifier and the label a probe would send with it
const FIELDS: [(u8, &str); 6] = [
    (0x00, "Sync"),
    (0x10, "Inc"),
    (0x11, "Azi"),
    (0x13, "GTF"),
    (0x14, "MTF"),
    (0x12, "TF"),
];

/// Emits one pump frame and one field sample per step
#[derive(Debug, Clone, Default)]
pub struct StreamSimulator {
    step: u32,
}

impl StreamSimulator {
    pub const fn new() -> Self {
        Self { step: 0 }
    }

    /// Steps taken so far
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Encode the next pump + sample pair
    pub fn next_burst(&mut self) -> Result<Vec<u8, SIM_BURST_CAP>, FrameError> {
        let step = self.step;
        self.step = self.step.wrapping_add(1);

        let pump_a = 15.0 + (step % 10) as f32 * 0.1;
        let pump = Frame::pump(pump_a, 0.5);

        let (field_id, label) = FIELDS[step as usize % FIELDS.len()];
        let value = (step.wrapping_mul(7) % 360) as f32;
        let sample = Frame::sample(field_id, value, label)?;

        let mut buffer = [0u8; SIM_BURST_CAP];
        let pump_len = pump.encode(&mut buffer)?;
        let sample_len = sample.encode(&mut buffer[pump_len..])?;

        Vec::from_slice(&buffer[..pump_len + sample_len]).map_err(|_| FrameError::BufferTooSmall)
    }
}

/// Split bytes into the uneven chunks a UART DMA would deliver
///
/// Chunk size is `8 + (offset % 11)`, so every chunk but the last is
/// between 8 and 18 bytes.
pub fn fragments(bytes: &[u8]) -> Fragments<'_> {
    Fragments { bytes, offset: 0 }
}

/// Iterator returned by [`fragments`]
pub struct Fragments<'b> {
    bytes: &'b [u8],
    offset: usize,
}

impl<'b> Iterator for Fragments<'b> {
    type Item = &'b [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let size = 8 + self.offset % 11;
        let end = (self.offset + size).min(self.bytes.len());
        let chunk = &self.bytes[self.offset..end];
        self.offset = end;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bathys_protocol::{FrameParser, Payload};
    use heapless::Deque;

    #[test]
    fn test_burst_decodes() {
        let mut sim = StreamSimulator::new();
        let burst = sim.next_burst().unwrap();

        let mut window: Deque<u8, 256> = Deque::new();
        for &b in burst.iter() {
            window.push_back(b).unwrap();
        }
        let mut parser = FrameParser::new();

        let pump = parser.try_parse_one(&mut window).unwrap();
        assert_eq!(pump, Frame::pump(15.0, 0.5));

        let sample = parser.try_parse_one(&mut window).unwrap();
        match sample.payload {
            Payload::FieldSample {
                field_id, label, ..
            } => {
                assert_eq!(field_id, 0x00);
                assert_eq!(label.as_str(), "Sync");
            }
            other => panic!("unexpected payload {:?}", other),
        }
        assert!(window.is_empty());
        assert_eq!(sim.step(), 1);
    }

    #[test]
    fn test_field_cycle() {
        let mut sim = StreamSimulator::new();
        let mut parser = FrameParser::new();
        let mut ids: Vec<u8, 12> = Vec::new();

        for _ in 0..12 {
            let burst = sim.next_burst().unwrap();
            let mut window: Deque<u8, 256> = Deque::new();
            for &b in burst.iter() {
                window.push_back(b).unwrap();
            }
            parser.try_parse_one(&mut window).unwrap();
            if let Some(Frame {
                payload: Payload::FieldSample { field_id, .. },
                ..
            }) = parser.try_parse_one(&mut window)
            {
                ids.push(field_id).unwrap();
            }
        }

        assert_eq!(&ids[..6], &[0x00, 0x10, 0x11, 0x13, 0x14, 0x12]);
        assert_eq!(&ids[..6], &ids[6..]);
        assert_eq!(parser.stats().frames_ok, 24);
    }

    #[test]
    fn test_fragment_sizes() {
        let bytes = [0u8; 100];
        let mut total = 0;
        let mut chunks = fragments(&bytes).peekable();

        while let Some(chunk) = chunks.next() {
            if chunks.peek().is_some() {
                assert!((8..=18).contains(&chunk.len()));
            }
            total += chunk.len();
        }
        assert_eq!(total, 100);
    }

    #[test]
    fn test_fragments_of_empty_input() {
        assert_eq!(fragments(&[]).count(), 0);
    }
}

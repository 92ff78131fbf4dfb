//! Inbound sequence tracking
//!
//! Every client packet after the first carries the next value of a counter
//! both ends derive from a shared start. The start is set by the init reply
//! and moved by each keep-alive ping.

use realm_core::{RealmError, Result};
use realm_protocol::{PacketReader, MAX1};

/// Strictly increasing sequence values from a start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceGenerator {
    start: u32,
    counter: u32,
}

impl SequenceGenerator {
    pub fn new(start: u32) -> Self {
        Self { start, counter: 0 }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    /// Restart the count from `start`.
    pub fn reseed(&mut self, start: u32) {
        self.start = start;
        self.counter = 0;
    }

    /// The value [`next`](Self::next) will return.
    pub fn peek(&self) -> u32 {
        self.start.saturating_add(self.counter)
    }

    /// Return the current value and advance.
    pub fn next(&mut self) -> u32 {
        let value = self.peek();
        self.counter = self.counter.saturating_add(1);
        value
    }
}

/// Bytes a sequence value occupies on the wire.
pub fn sequence_width(expected: u32) -> usize {
    if expected >= MAX1 {
        2
    } else {
        1
    }
}

/// Read a sequence value sized for `expected`.
pub fn read_sequence(reader: &mut PacketReader, expected: u32) -> Result<u32> {
    let value = if sequence_width(expected) == 2 {
        reader.get_short()
    } else {
        reader.get_char()
    };
    value.map_err(|e| RealmError::ProtocolViolation(format!("missing sequence value: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use realm_protocol::PacketWriter;

    #[test]
    fn test_values_strictly_increase() {
        let mut generator = SequenceGenerator::new(250);
        let values: Vec<u32> = (0..10).map(|_| generator.next()).collect();
        assert!(values.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(values[0], 250);
        assert_eq!(generator.peek(), 260);
    }

    #[test]
    fn test_reseed_restarts_count() {
        let mut generator = SequenceGenerator::new(10);
        generator.next();
        generator.next();
        generator.reseed(400);
        assert_eq!(generator.start(), 400);
        assert_eq!(generator.next(), 400);
    }

    #[test]
    fn test_width_switches_at_253() {
        assert_eq!(sequence_width(0), 1);
        assert_eq!(sequence_width(252), 1);
        assert_eq!(sequence_width(253), 2);
        assert_eq!(sequence_width(1800), 2);
    }

    #[test]
    fn test_read_sequence_both_widths() {
        let mut writer = PacketWriter::new();
        writer.add_char(17).add_short(900);
        let mut reader = PacketReader::new(Bytes::from(writer.finish()));
        assert_eq!(read_sequence(&mut reader, 17).unwrap(), 17);
        assert_eq!(read_sequence(&mut reader, 900).unwrap(), 900);
        assert!(matches!(read_sequence(&mut reader, 5), Err(RealmError::ProtocolViolation(_))));
    }
}

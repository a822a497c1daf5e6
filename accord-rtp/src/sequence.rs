use rand::Rng;

use shared::serial::uint16_add;

/// Issues consecutive RTP sequence numbers from a random start.
#[derive(Debug, Clone)]
pub struct Sequencer {
    sequence_number: u16,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            sequence_number: rand::thread_rng().gen(),
        }
    }

    pub fn with_initial(sequence_number: u16) -> Self {
        Self { sequence_number }
    }

    pub fn next_sequence_number(&mut self) -> u16 {
        let current = self.sequence_number;
        self.sequence_number = uint16_add(self.sequence_number, 1);
        current
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sequence_wraps() {
        let mut sequencer = Sequencer::with_initial(0xFFFE);
        assert_eq!(sequencer.next_sequence_number(), 0xFFFE);
        assert_eq!(sequencer.next_sequence_number(), 0xFFFF);
        assert_eq!(sequencer.next_sequence_number(), 0);
        assert_eq!(sequencer.next_sequence_number(), 1);
    }
}

// Snowflake-style 64-bit IDs: [timestamp:42][node:10][sequence:12].
// Primary keys generated this way sort by creation time, which is what the
// feed cursors key on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    sequence: AtomicU64,
    last_timestamp: AtomicU64,
}

impl IdGenerator {
    pub fn new(node_id: u16) -> Self {
        assert!(node_id < 1024, "Node ID must be less than 1024");

        Self {
            node_id,
            sequence: AtomicU64::new(0),
            last_timestamp: AtomicU64::new(0),
        }
    }

    /// Generate the next unique ID.
    pub fn next_id(&self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        let last_ts = self.last_timestamp.load(Ordering::Relaxed);

        let sequence = if now == last_ts {
            // Same millisecond - increment sequence
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            if seq >= 4096 {
                // Sequence overflow - wait for next millisecond
                std::thread::sleep(std::time::Duration::from_millis(1));
                self.sequence.store(0, Ordering::Relaxed);
                return self.next_id();
            }
            seq
        } else {
            // New millisecond - reset sequence
            self.last_timestamp.store(now, Ordering::Relaxed);
            self.sequence.store(1, Ordering::Relaxed);
            0
        };

        let id = ((now & 0x3FFFFFFFFFF) << 22) |    // 42 bits timestamp
                 ((self.node_id as u64) << 12) |    // 10 bits node_id
                 (sequence & 0xFFF); // 12 bits sequence

        id as i64
    }

    /// Extract the creation timestamp (unix millis) from an ID.
    pub fn extract_timestamp(id: i64) -> u64 {
        (id as u64) >> 22
    }

    pub fn extract_node_id(id: i64) -> u16 {
        ((id as u64) >> 12 & 0x3FF) as u16
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let generator = IdGenerator::new(123);

        let id1 = generator.next_id();
        let id2 = generator.next_id();
        let id3 = generator.next_id();

        // IDs should be unique and monotonically increasing
        assert!(id1 < id2);
        assert!(id2 < id3);

        // All should carry the node id
        assert_eq!(IdGenerator::extract_node_id(id1), 123);
        assert_eq!(IdGenerator::extract_node_id(id2), 123);
        assert_eq!(IdGenerator::extract_node_id(id3), 123);
    }

    #[test]
    fn test_timestamp_extraction() {
        let generator = IdGenerator::new(500);
        let before = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let id = generator.next_id();

        assert!(IdGenerator::extract_timestamp(id) >= before);
        assert_eq!(generator.node_id(), 500);
    }
}

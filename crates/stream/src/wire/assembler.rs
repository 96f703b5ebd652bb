#[derive(Debug, Default)]
pub struct FrameAssembler {
    pending: Vec<u8>,
    received: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.received += chunk.len() as u64;
        self.pending.extend_from_slice(chunk);
    }

    pub fn take(&mut self, len: usize) -> Option<Vec<u8>> {
        if self.pending.len() < len {
            return None;
        }
        let rest = self.pending.split_off(len);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_reads_are_joined() {
        let mut assembler = FrameAssembler::new();
        assembler.push(&[1, 2, 3]);
        assert!(assembler.take(5).is_none());

        assembler.push(&[4, 5, 6, 7]);
        assert_eq!(assembler.take(5).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(assembler.buffered(), 2);
        assert!(assembler.take(5).is_none());
        assert_eq!(assembler.received(), 7);
    }

    #[test]
    fn several_chunks_from_one_read() {
        let mut assembler = FrameAssembler::new();
        assembler.push(&[0; 10]);
        assert!(assembler.take(4).is_some());
        assert!(assembler.take(4).is_some());
        assert!(assembler.take(4).is_none());
        assert_eq!(assembler.buffered(), 2);
    }
}

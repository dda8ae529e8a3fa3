use rand::{rngs::SmallRng, RngCore, SeedableRng};

/// Reusable block of bytes a job writes from or reads into.
///
/// The buffer is allocated once and handed out again for every block, so the content of written
/// data repeats. Only the number of bytes moved matters for the measurement.
pub struct DataSource {
    buffer: Vec<u8>,
}

impl DataSource {
    /// Block filled with pseudorandom bytes, used as the source for writes.
    pub fn random(block_size: usize) -> Self {
        let mut buffer = vec![0u8; block_size];
        SmallRng::from_entropy().fill_bytes(&mut buffer);

        Self { buffer }
    }

    /// Zeroed block, used as the discard destination for reads.
    pub fn empty(block_size: usize) -> Self {
        Self {
            buffer: vec![0u8; block_size],
        }
    }

    pub fn block_size(&self) -> usize {
        self.buffer.len()
    }

    /// Get the first `size` bytes of the block, clamped to the block size.
    pub fn next_block(&self, size: usize) -> &[u8] {
        let size = size.min(self.buffer.len());
        &self.buffer[..size]
    }

    /// Get the first `size` bytes of the block for reading into, clamped to the block size.
    pub fn next_block_mut(&mut self, size: usize) -> &mut [u8] {
        let size = size.min(self.buffer.len());
        &mut self.buffer[..size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_block_is_not_uniform() {
        let source = DataSource::random(4096);
        let block = source.next_block(4096);

        assert_eq!(block.len(), 4096);
        assert!(block.iter().any(|b| *b != block[0]));
    }

    #[test]
    fn random_block_is_reused() {
        let source = DataSource::random(64);

        let first = source.next_block(64).to_vec();
        let second = source.next_block(64);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_block_is_zeroed() {
        let mut source = DataSource::empty(128);

        assert!(source.next_block(128).iter().all(|b| *b == 0));
        assert_eq!(source.next_block_mut(100).len(), 100);
    }

    #[test]
    fn block_requests_clamp_to_block_size() {
        let source = DataSource::empty(16);
        assert_eq!(source.next_block(64).len(), 16);
        assert_eq!(source.next_block(0).len(), 0);
    }
}

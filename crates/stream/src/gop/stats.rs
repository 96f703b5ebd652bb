#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionStats {
    pub total_frames: u64,
    pub i_frames: u64,
    pub p_frames: u64,
    pub total_bandwidth: u64,
    pub saved_bandwidth: u64,
}

impl CompressionStats {
    pub fn record_i_frame(&mut self, bytes: usize) {
        self.total_frames += 1;
        self.i_frames += 1;
        self.total_bandwidth += bytes as u64;
    }

    /// P-frames add to the saved bytes only; the total counts I-frame bytes.
    pub fn record_p_frame(&mut self, saved: usize) {
        self.total_frames += 1;
        self.p_frames += 1;
        self.saved_bandwidth += saved as u64;
    }

    pub fn compression_ratio(&self) -> f64 {
        if self.total_bandwidth == 0 {
            return 0.0;
        }
        self.saved_bandwidth as f64 / self.total_bandwidth as f64 * 100.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

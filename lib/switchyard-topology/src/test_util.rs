use rand::RngCore;

/// An RNG that yields the same word forever.
pub struct FixedRng(u64);

impl FixedRng {
    /// Creates an RNG whose `f64` draws all equal `value`.
    pub fn yielding(value: f64) -> Self {
        Self(((value * (1u64 << 53) as f64) as u64) << 11)
    }
}

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        (self.0 >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            chunk.copy_from_slice(&self.0.to_le_bytes()[..chunk.len()]);
        }
    }
}

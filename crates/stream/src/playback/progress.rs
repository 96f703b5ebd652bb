#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub cur_frame: u16,
    pub loaded_frame: u16,
    pub max_frame: u16,
}

impl Progress {
    fn span(&self) -> f32 {
        f32::from(self.max_frame.saturating_sub(1).max(1))
    }

    pub fn played(&self) -> f32 {
        (f32::from(self.cur_frame) / self.span()).min(1.0)
    }

    pub fn buffered(&self) -> f32 {
        ((f32::from(self.loaded_frame) + 1.0) / self.span()).min(1.0)
    }
}

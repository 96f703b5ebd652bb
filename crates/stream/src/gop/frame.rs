use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    I,
    P,
}

impl FrameType {
    pub fn of(frame: u16, gop_size: u16) -> Self {
        if is_i_frame(frame, gop_size) {
            FrameType::I
        } else {
            FrameType::P
        }
    }

    pub fn is_i_frame(&self) -> bool {
        matches!(self, FrameType::I)
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameType::I => f.write_str("I"),
            FrameType::P => f.write_str("P"),
        }
    }
}

#[inline]
pub fn is_i_frame(frame: u16, gop_size: u16) -> bool {
    frame == 0 || frame % gop_size == 0
}

#[inline]
pub fn gop_of(frame: u16, gop_size: u16) -> u32 {
    u32::from(frame / gop_size)
}

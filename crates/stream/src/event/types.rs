use std::sync::Arc;

use crate::wire::VertexRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Reset,
    Append,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Reset => "reset",
            EventKind::Append => "append",
        }
    }
}

/// Slice a frame's points are written to. Frame 0 wraps to the last slice.
pub fn slice_for_frame(frame: u16, slice_num: usize) -> u32 {
    (i64::from(frame) - 1).rem_euclid(slice_num as i64) as u32
}

#[derive(Debug, Clone)]
pub struct FrameEvent {
    pub frame: u16,
    pub slice_id: u32,
    pub kind: EventKind,
    pub payload: Arc<[VertexRow]>,
    pub is_i_frame: bool,
    pub reusable_indices: Option<Arc<[u32]>>,
}

impl FrameEvent {
    pub fn new(
        frame: u16,
        slice_num: usize,
        kind: EventKind,
        payload: &[VertexRow],
        is_i_frame: bool,
    ) -> Self {
        Self {
            frame,
            slice_id: slice_for_frame(frame, slice_num),
            kind,
            payload: Arc::from(payload),
            is_i_frame,
            reusable_indices: None,
        }
    }

    pub fn empty_reset(frame: u16, slice_num: usize, is_i_frame: bool) -> Self {
        Self::new(frame, slice_num, EventKind::Reset, &[], is_i_frame)
    }

    pub fn with_reusable_indices(mut self, indices: Arc<[u32]>) -> Self {
        self.reusable_indices = Some(indices);
        self
    }

    pub fn rows(&self) -> usize {
        self.payload.len()
    }
}

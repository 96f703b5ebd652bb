use crate::gop::{FrameType, PFrameError};
use crate::playback::FrameAdvance;

#[derive(Debug, Clone)]
pub enum StreamEvent {
    InitialFrameLoaded {
        points: usize,
        bytes: usize,
    },
    FrameLoaded {
        frame: u16,
        frame_type: FrameType,
        points: usize,
        events: usize,
        skipped_indices: usize,
    },
    PFrameFallback {
        frame: u16,
        error: PFrameError,
    },
    FrameAdvanced(FrameAdvance),
    BufferUnderrun {
        loaded_frame: u16,
        cur_frame: u16,
    },
    LoopRestarted {
        points: usize,
    },
    StreamEnded {
        frames_loaded: u16,
        error: Option<String>,
    },
}

impl StreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::InitialFrameLoaded { .. } => "initial-frame-loaded",
            StreamEvent::FrameLoaded { .. } => "frame-loaded",
            StreamEvent::PFrameFallback { .. } => "p-frame-fallback",
            StreamEvent::FrameAdvanced(_) => "frame-advanced",
            StreamEvent::BufferUnderrun { .. } => "buffer-underrun",
            StreamEvent::LoopRestarted { .. } => "loop-restarted",
            StreamEvent::StreamEnded { .. } => "stream-ended",
        }
    }
}

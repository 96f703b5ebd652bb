mod timeline;
mod types;

pub use timeline::EventTimeline;
pub use types::{EventKind, FrameEvent, slice_for_frame};

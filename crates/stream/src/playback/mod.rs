mod progress;
mod rate;
mod scheduler;

pub use progress::Progress;
pub use rate::PlaybackRate;
pub use scheduler::{FrameAdvance, FrameScheduler, TickOutcome};

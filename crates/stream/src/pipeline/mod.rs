mod events;
mod producer;

pub use events::StreamEvent;
pub use producer::{PipelineError, StreamingPipeline};

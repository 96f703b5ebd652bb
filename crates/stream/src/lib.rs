pub mod config;
pub mod event;
pub mod gop;
pub mod net;
pub mod pipeline;
pub mod playback;
pub mod slice;
pub mod wire;
pub mod worker;

pub use config::{ConfigError, DEFAULT_GOP_SIZE, StreamingConfig};
pub use event::{EventKind, EventTimeline, FrameEvent, slice_for_frame};
pub use gop::{
    CompressionStats, FrameIngest, FrameType, GopManager, MAX_REUSABLE_COUNT, PFrame,
    PFrameError, Reconstruction, decode_pframe, encode_pframe, gop_of, is_i_frame, reconstruct,
};
pub use net::{
    ByteSource, FileSource, HttpSource, MemorySource, ModelSource, TransportError, open_source,
};
pub use pipeline::{PipelineError, StreamEvent, StreamingPipeline};
pub use playback::{FrameAdvance, FrameScheduler, PlaybackRate, Progress, TickOutcome};
pub use slice::{SliceBuffer, SliceWrite};
pub use wire::{
    FrameAssembler, FrameSpan, GaussianRecord, STREAM_ROW_LENGTH, SortKey, SpanLayout,
    VERTEX_ROW_LENGTH, VertexBatch, VertexRow, WireError, decode_records, encode_record,
    encode_records, encode_vertices,
};
pub use worker::{
    SortThrottle, SplatWorker, WorkerDisconnected, WorkerHandle, WorkerMessage, WorkerOutput,
    WorkerSink, WorkerStats, spawn_worker,
};

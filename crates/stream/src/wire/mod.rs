mod assembler;
mod record;
mod vertex;

pub use assembler::FrameAssembler;
pub use record::{
    GaussianRecord, STREAM_ROW_LENGTH, WireError, decode_records, encode_record, encode_records,
};
pub use vertex::{
    FrameSpan, SortKey, SpanLayout, VERTEX_ROW_LENGTH, VertexBatch, VertexRow, encode_vertices,
};

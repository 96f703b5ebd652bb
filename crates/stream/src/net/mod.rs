mod source;

pub use source::{
    ByteSource, FileSource, HttpSource, MemorySource, ModelSource, TransportError, open_source,
};

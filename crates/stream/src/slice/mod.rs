mod buffer;

pub use buffer::{SliceBuffer, SliceWrite};

mod frame;
mod manager;
mod pframe;
mod stats;

pub use frame::{FrameType, gop_of, is_i_frame};
pub use manager::{FrameIngest, GopManager};
pub use pframe::{
    MAX_REUSABLE_COUNT, PFrame, PFrameError, Reconstruction, decode_pframe, encode_pframe,
    reconstruct,
};
pub use stats::CompressionStats;

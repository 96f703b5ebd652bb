mod prep;
mod protocol;
mod runner;
mod throttle;

pub use prep::{DepthSort, DepthSorter, PackedTexture, TEXTURE_WIDTH, covariance, pack_texture};
pub use protocol::{WorkerDisconnected, WorkerMessage, WorkerOutput, WorkerSink, WorkerStats};
pub use runner::{SplatWorker, WorkerHandle, spawn_worker};
pub use throttle::SortThrottle;

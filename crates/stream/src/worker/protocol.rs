use std::sync::Arc;

use glam::Mat4;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::gop::FrameType;
use crate::wire::VertexRow;

#[derive(Debug, Clone)]
pub enum WorkerMessage {
    InstallBuffer {
        rows: Vec<VertexRow>,
        vertex_count: usize,
        frame_type: FrameType,
        frame_number: u16,
    },
    ResetSlice {
        slice_id: u32,
        data: Arc<[VertexRow]>,
        frame: u16,
        is_i_frame: bool,
        gop_number: u32,
    },
    AppendSlice {
        slice_id: u32,
        data: Arc<[VertexRow]>,
        frame: u16,
        is_i_frame: bool,
    },
    ReSort {
        reset_slices: Vec<u32>,
        frame_type: FrameType,
        frame_number: u16,
        gop_number: u32,
    },
    View(Mat4),
    Shutdown,
}

impl WorkerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerMessage::InstallBuffer { .. } => "buffer",
            WorkerMessage::ResetSlice { .. } => "resetSlice",
            WorkerMessage::AppendSlice { .. } => "appendSlice",
            WorkerMessage::ReSort { .. } => "reSort",
            WorkerMessage::View(_) => "view",
            WorkerMessage::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub total_frames: u64,
    pub i_frames: u64,
    pub p_frames: u64,
    pub installs: u64,
    pub dropped_rows: u64,
    pub last_gop: u32,
}

#[derive(Debug, Clone)]
pub enum WorkerOutput {
    Texture {
        texdata: Vec<u32>,
        width: u32,
        height: u32,
    },
    DepthIndex {
        depth_index: Vec<u32>,
        view_proj: Mat4,
        vertex_count: usize,
    },
    CompressionStats(WorkerStats),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("worker channel closed")]
pub struct WorkerDisconnected;

pub trait WorkerSink {
    fn post(&mut self, message: WorkerMessage) -> Result<(), WorkerDisconnected>;
}

impl WorkerSink for mpsc::UnboundedSender<WorkerMessage> {
    fn post(&mut self, message: WorkerMessage) -> Result<(), WorkerDisconnected> {
        self.send(message).map_err(|_| WorkerDisconnected)
    }
}

impl WorkerSink for Vec<WorkerMessage> {
    fn post(&mut self, message: WorkerMessage) -> Result<(), WorkerDisconnected> {
        self.push(message);
        Ok(())
    }
}

use std::time::Instant;

use splatstream::{CompressionStats, Progress, StreamEvent, WorkerOutput, WorkerStats};
use tokio::sync::mpsc;

pub struct PlaybackReport {
    started: Instant,
    loops_wanted: Option<u32>,
    loops: u32,
    frames_played: u64,
    underruns: u64,
    fallbacks: u64,
}

impl PlaybackReport {
    pub fn new(loops_wanted: Option<u32>) -> Self {
        Self {
            started: Instant::now(),
            loops_wanted,
            loops: 0,
            frames_played: 0,
            underruns: 0,
            fallbacks: 0,
        }
    }

    /// Logs one event. Returns `true` once playback should stop.
    pub fn record(&mut self, event: &StreamEvent) -> bool {
        match event {
            StreamEvent::InitialFrameLoaded { points, bytes } => {
                log::info!("Initial I-frame: {} Gaussians ({} bytes)", points, bytes);
            }
            StreamEvent::FrameLoaded {
                frame,
                frame_type,
                points,
                skipped_indices,
                ..
            } => {
                if *skipped_indices > 0 {
                    log::warn!(
                        "Frame #{}: {} reusable indices out of range",
                        frame,
                        skipped_indices
                    );
                }
                log::debug!("Loaded {} frame #{} ({} Gaussians)", frame_type, frame, points);
            }
            StreamEvent::PFrameFallback { frame, error } => {
                self.fallbacks += 1;
                log::warn!("Frame #{} played uncompressed: {}", frame, error);
            }
            StreamEvent::FrameAdvanced(advance) => {
                self.frames_played += 1;
                log::trace!(
                    "Frame #{} ({}, GoP {}), {} events",
                    advance.frame,
                    advance.frame_type,
                    advance.gop,
                    advance.events
                );
            }
            StreamEvent::BufferUnderrun {
                loaded_frame,
                cur_frame,
            } => {
                self.underruns += 1;
                log::debug!("Waiting for frame #{} (loaded #{})", cur_frame, loaded_frame);
            }
            StreamEvent::LoopRestarted { points } => {
                self.loops += 1;
                log::info!("Loop {} finished, restarting from {} Gaussians", self.loops, points);
                if let Some(wanted) = self.loops_wanted {
                    return self.loops >= wanted;
                }
            }
            StreamEvent::StreamEnded {
                frames_loaded,
                error,
            } => match error {
                Some(error) => {
                    log::error!("Stream aborted after frame #{}: {}", frames_loaded, error)
                }
                None => log::info!("Stream finished: {} frames", frames_loaded),
            },
        }
        false
    }

    pub fn summary(&self, stats: &CompressionStats, progress: Progress, fps: f32) {
        log::info!(
            "Played {} frames in {:.1}s ({} loops, {:.1} fps), {} underruns",
            self.frames_played,
            self.started.elapsed().as_secs_f32(),
            self.loops,
            fps,
            self.underruns
        );
        log::info!(
            "Buffered {:.0}%, {} I-frames, {} P-frames ({} played uncompressed), {:.1}% bandwidth saved",
            progress.buffered() * 100.0,
            stats.i_frames,
            stats.p_frames,
            self.fallbacks,
            stats.compression_ratio()
        );
    }
}

#[derive(Debug, Default)]
pub struct OutputCounts {
    pub textures: u64,
    pub sorts: u64,
    pub last_stats: Option<WorkerStats>,
}

pub async fn count_outputs(mut outputs: mpsc::UnboundedReceiver<WorkerOutput>) -> OutputCounts {
    let mut counts = OutputCounts::default();
    while let Some(output) = outputs.recv().await {
        match output {
            WorkerOutput::Texture { .. } => counts.textures += 1,
            WorkerOutput::DepthIndex { .. } => counts.sorts += 1,
            WorkerOutput::CompressionStats(stats) => counts.last_stats = Some(stats),
        }
    }
    counts
}

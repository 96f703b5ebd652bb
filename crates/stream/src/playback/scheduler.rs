use crate::config::StreamingConfig;
use crate::event::{EventKind, EventTimeline, FrameEvent};
use crate::gop::{FrameType, GopManager, gop_of};
use crate::worker::{WorkerDisconnected, WorkerMessage, WorkerSink};

use super::progress::Progress;

/// Frames decoded ahead of playback before a tick may advance.
const SAFETY_MARGIN: u16 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAdvance {
    pub frame: u16,
    pub frame_type: FrameType,
    pub gop: u32,
    pub reset_slices: Vec<u32>,
    pub events: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Paused,
    Underrun { loaded_frame: u16, cur_frame: u16 },
    Idle { cur_frame: u16 },
    Advanced(FrameAdvance),
    Restarted { points: usize },
}

#[derive(Debug)]
pub struct FrameScheduler {
    max_frame: u16,
    gop_size: u16,
    total_cap: usize,
    cur_frame: u16,
    loaded_frame: u16,
    loading_done: bool,
    paused: bool,
    timeline: EventTimeline,
}

impl FrameScheduler {
    pub fn new(config: &StreamingConfig) -> Self {
        Self {
            max_frame: config.max_frame,
            gop_size: config.gop_size,
            total_cap: config.total_cap,
            cur_frame: 1,
            loaded_frame: 0,
            loading_done: false,
            paused: false,
            timeline: EventTimeline::new(),
        }
    }

    pub fn cur_frame(&self) -> u16 {
        self.cur_frame
    }

    pub fn loaded_frame(&self) -> u16 {
        self.loaded_frame
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn timeline(&self) -> &EventTimeline {
        &self.timeline
    }

    pub fn progress(&self) -> Progress {
        Progress {
            cur_frame: self.cur_frame,
            loaded_frame: self.loaded_frame,
            max_frame: self.max_frame,
        }
    }

    pub fn push_events(&mut self, events: impl IntoIterator<Item = FrameEvent>) {
        self.timeline.extend(events);
    }

    pub fn mark_loaded(&mut self, frame: u16) {
        self.loaded_frame = self.loaded_frame.max(frame);
    }

    /// No more frames will be loaded. Playback loops over what is buffered.
    pub fn finish_loading(&mut self) {
        self.loading_done = true;
    }

    pub fn is_loading_done(&self) -> bool {
        self.loading_done
    }

    pub fn reset(&mut self) {
        self.cur_frame = 1;
        self.loaded_frame = 0;
        self.loading_done = false;
        self.timeline.clear();
    }

    pub fn tick(
        &mut self,
        gop: &GopManager,
        sink: &mut impl WorkerSink,
    ) -> Result<TickOutcome, WorkerDisconnected> {
        if self.paused {
            return Ok(TickOutcome::Paused);
        }

        let ran_out = self.loading_done && self.cur_frame > self.loaded_frame;
        if ran_out && self.loaded_frame == 0 {
            // Only the installed reference exists; keep showing it.
            return Ok(TickOutcome::Idle {
                cur_frame: self.cur_frame,
            });
        }
        if self.cur_frame >= self.max_frame || ran_out {
            return self.restart(gop, sink);
        }

        let needed = self
            .cur_frame
            .min(self.max_frame.saturating_sub(SAFETY_MARGIN));
        if self.loaded_frame < needed {
            log::debug!(
                "Buffer underrun: loaded {} < playing {}",
                self.loaded_frame,
                self.cur_frame
            );
            return Ok(TickOutcome::Underrun {
                loaded_frame: self.loaded_frame,
                cur_frame: self.cur_frame,
            });
        }

        let frame = self.cur_frame;
        let events = self.timeline.events_for(frame);
        if events.is_empty() {
            return Ok(TickOutcome::Idle { cur_frame: frame });
        }

        let gop_number = gop_of(frame, self.gop_size);
        let mut reset_slices = Vec::new();
        for event in events {
            let message = match event.kind {
                EventKind::Reset => {
                    reset_slices.push(event.slice_id);
                    WorkerMessage::ResetSlice {
                        slice_id: event.slice_id,
                        data: event.payload.clone(),
                        frame,
                        is_i_frame: event.is_i_frame,
                        gop_number,
                    }
                }
                EventKind::Append => WorkerMessage::AppendSlice {
                    slice_id: event.slice_id,
                    data: event.payload.clone(),
                    frame,
                    is_i_frame: event.is_i_frame,
                },
            };
            sink.post(message)?;
        }

        let frame_type = gop.frame_type(frame);
        sink.post(WorkerMessage::ReSort {
            reset_slices: reset_slices.clone(),
            frame_type,
            frame_number: frame,
            gop_number,
        })?;

        if frame_type.is_i_frame() {
            log::info!("GoP {} started at frame #{}", gop_number, frame);
        }

        let applied = events.len();
        self.cur_frame += 1;

        Ok(TickOutcome::Advanced(FrameAdvance {
            frame,
            frame_type,
            gop: gop_number,
            reset_slices,
            events: applied,
        }))
    }

    fn restart(
        &mut self,
        gop: &GopManager,
        sink: &mut impl WorkerSink,
    ) -> Result<TickOutcome, WorkerDisconnected> {
        let Some(batch) = gop.restart_batch(self.total_cap) else {
            return Ok(TickOutcome::Idle {
                cur_frame: self.cur_frame,
            });
        };

        let points = batch.len();
        sink.post(WorkerMessage::InstallBuffer {
            rows: batch.rows,
            vertex_count: points,
            frame_type: FrameType::I,
            frame_number: 0,
        })?;
        self.cur_frame = 1;

        log::info!("Playback looped: reinstalled {} Gaussians", points);
        Ok(TickOutcome::Restarted { points })
    }
}

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::{ConfigError, StreamingConfig};
use crate::gop::{CompressionStats, FrameType, GopManager};
use crate::net::{ByteSource, TransportError};
use crate::playback::{FrameScheduler, PlaybackRate, Progress, TickOutcome};
use crate::wire::{FrameAssembler, WireError, decode_records};
use crate::worker::{WorkerDisconnected, WorkerMessage, WorkerSink};

use super::events::StreamEvent;

const READ_AHEAD: usize = 8;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Worker(#[from] WorkerDisconnected),
}

pub struct StreamingPipeline<S: WorkerSink> {
    config: StreamingConfig,
    gop: GopManager,
    scheduler: FrameScheduler,
    assembler: FrameAssembler,
    rate: PlaybackRate,
    sink: S,
    running: Arc<AtomicBool>,
    pending_events: VecDeque<StreamEvent>,
}

impl<S: WorkerSink> StreamingPipeline<S> {
    pub fn new(config: StreamingConfig, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;

        log::info!(
            "Streaming config: {} frames, {} slices of {}, GoP {}, {} fps, compression {}, ~{} Mbps",
            config.max_frame,
            config.slice_num,
            config.slice_cap(),
            config.gop_size,
            config.fps,
            if config.compression_enabled { "on" } else { "off" },
            config.minimal_bandwidth_mbps()
        );

        Ok(Self {
            gop: GopManager::new(&config),
            scheduler: FrameScheduler::new(&config),
            assembler: FrameAssembler::new(),
            rate: PlaybackRate::new(config.fps as f32),
            sink,
            running: Arc::new(AtomicBool::new(true)),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn gop(&self) -> &GopManager {
        &self.gop
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = StreamEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn progress(&self) -> Progress {
        self.scheduler.progress()
    }

    pub fn stats(&self) -> &CompressionStats {
        self.gop.stats()
    }

    pub fn compression_ratio(&self) -> f64 {
        self.gop.stats().compression_ratio()
    }

    pub fn playback_fps(&self) -> f32 {
        self.rate.fps()
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.scheduler.set_paused(paused);
        if !paused {
            self.rate.resume();
        }
    }

    /// Reads the opening I-frame and installs it in the worker. Any failure
    /// here is fatal: there is nothing to play without it.
    pub async fn load_initial(
        &mut self,
        source: &mut impl ByteSource,
    ) -> Result<usize, PipelineError> {
        self.gop.reset();
        self.scheduler.reset();
        self.assembler.clear();

        let needed = self.config.initial_bytes();
        let bytes = loop {
            if let Some(bytes) = self.assembler.take(needed) {
                break bytes;
            }
            match source.next_chunk().await? {
                Some(chunk) => self.assembler.push(&chunk),
                None => {
                    return Err(TransportError::UnexpectedEnd {
                        received: self.assembler.received(),
                        expected: needed as u64,
                    }
                    .into());
                }
            }
        };

        let records = decode_records(&bytes)?;
        let batch = self.gop.load_initial(records);
        let points = batch.len();

        self.sink.post(WorkerMessage::InstallBuffer {
            rows: batch.rows,
            vertex_count: points,
            frame_type: FrameType::I,
            frame_number: 0,
        })?;
        if let Some(view) = self.config.initial_view() {
            self.sink.post(WorkerMessage::View(view))?;
        }
        self.scheduler.mark_loaded(0);

        self.pending_events.push_back(StreamEvent::InitialFrameLoaded {
            points,
            bytes: bytes.len(),
        });
        Ok(points)
    }

    pub fn ingest_chunk(&mut self, chunk: &[u8]) -> Result<usize, PipelineError> {
        self.assembler.push(chunk);

        let frame_bytes = self.config.frame_bytes();
        let mut ingested = 0;

        while !self.scheduler.is_loading_done() {
            let frame = self.scheduler.loaded_frame() + 1;
            if frame >= self.config.max_frame {
                self.finish_stream(None);
                break;
            }
            let Some(bytes) = self.assembler.take(frame_bytes) else {
                break;
            };

            let ingest = self.gop.ingest_frame(frame, &bytes)?;
            if let Some(error) = ingest.fallback.clone() {
                self.pending_events
                    .push_back(StreamEvent::PFrameFallback { frame, error });
            }

            let events = ingest.events.len();
            self.scheduler.push_events(ingest.events);
            self.scheduler.mark_loaded(frame);
            ingested += 1;

            log::debug!(
                "Loaded {} frame #{}: {} Gaussians, {} events",
                ingest.frame_type,
                frame,
                ingest.points,
                events
            );
            self.pending_events.push_back(StreamEvent::FrameLoaded {
                frame,
                frame_type: ingest.frame_type,
                points: ingest.points,
                events,
                skipped_indices: ingest.skipped_indices.len(),
            });
        }

        Ok(ingested)
    }

    pub fn finish_stream(&mut self, error: Option<TransportError>) {
        if self.scheduler.is_loading_done() {
            return;
        }
        self.scheduler.finish_loading();

        let frames_loaded = self.scheduler.loaded_frame();
        match &error {
            Some(err) => log::warn!("Stream failed after frame #{}: {}", frames_loaded, err),
            None => log::info!("Stream complete: {} frames loaded", frames_loaded),
        }
        if self.assembler.buffered() > 0 {
            log::debug!("Ignoring {} unread bytes", self.assembler.buffered());
            self.assembler.clear();
        }

        self.pending_events.push_back(StreamEvent::StreamEnded {
            frames_loaded,
            error: error.map(|e| e.to_string()),
        });
    }

    pub fn tick(&mut self) -> Result<TickOutcome, PipelineError> {
        let outcome = self.scheduler.tick(&self.gop, &mut self.sink)?;

        match &outcome {
            TickOutcome::Advanced(advance) => {
                self.rate.record_frame(Instant::now());
                self.pending_events
                    .push_back(StreamEvent::FrameAdvanced(advance.clone()));
            }
            TickOutcome::Underrun {
                loaded_frame,
                cur_frame,
            } => {
                self.pending_events.push_back(StreamEvent::BufferUnderrun {
                    loaded_frame: *loaded_frame,
                    cur_frame: *cur_frame,
                });
            }
            TickOutcome::Restarted { points } => {
                self.pending_events
                    .push_back(StreamEvent::LoopRestarted { points: *points });
            }
            TickOutcome::Paused | TickOutcome::Idle { .. } => {}
        }

        Ok(outcome)
    }

    pub async fn run<B>(&mut self, source: B) -> Result<(), PipelineError>
    where
        B: ByteSource + Send + 'static,
    {
        self.run_with(source, |_| {}).await
    }

    pub async fn run_with<B, F>(&mut self, source: B, mut on_event: F) -> Result<(), PipelineError>
    where
        B: ByteSource + Send + 'static,
        F: FnMut(StreamEvent),
    {
        let mut chunks = spawn_reader(source);
        let mut reading = !self.scheduler.is_loading_done();

        let mut interval = tokio::time::interval(self.config.tick_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                chunk = chunks.recv(), if reading => match chunk {
                    Some(Ok(bytes)) => {
                        self.ingest_chunk(&bytes)?;
                        reading = !self.scheduler.is_loading_done();
                    }
                    Some(Err(err)) => {
                        self.finish_stream(Some(err));
                        reading = false;
                    }
                    None => {
                        self.finish_stream(None);
                        reading = false;
                    }
                },
                _ = interval.tick() => {
                    self.tick()?;
                }
            }

            for event in self.pending_events.drain(..) {
                on_event(event);
            }
        }

        Ok(())
    }
}

fn spawn_reader<B>(mut source: B) -> mpsc::Receiver<Result<Vec<u8>, TransportError>>
where
    B: ByteSource + Send + 'static,
{
    let (tx, rx) = mpsc::channel(READ_AHEAD);

    tokio::spawn(async move {
        loop {
            let item = match source.next_chunk().await {
                Ok(Some(chunk)) => Ok(chunk),
                Ok(None) => break,
                Err(err) => Err(err),
            };
            let failed = item.is_err();
            if tx.send(item).await.is_err() || failed {
                break;
            }
        }
    });

    rx
}

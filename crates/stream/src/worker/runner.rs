use std::ops::ControlFlow;
use std::time::Instant;

use glam::Mat4;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::gop::FrameType;
use crate::slice::SliceBuffer;

use super::prep::{DepthSorter, pack_texture};
use super::protocol::{WorkerMessage, WorkerOutput, WorkerStats};
use super::throttle::SortThrottle;

pub struct SplatWorker {
    buffer: SliceBuffer,
    sorter: DepthSorter,
    throttle: SortThrottle,
    view: Option<Mat4>,
    dirty: bool,
    force_sort: bool,
    stats: WorkerStats,
    output: mpsc::UnboundedSender<WorkerOutput>,
}

impl SplatWorker {
    pub fn new(
        slice_num: usize,
        slice_cap: usize,
        output: mpsc::UnboundedSender<WorkerOutput>,
    ) -> Self {
        Self {
            buffer: SliceBuffer::new(slice_num, slice_cap),
            sorter: DepthSorter::new(),
            throttle: SortThrottle::new(),
            view: None,
            dirty: false,
            force_sort: false,
            stats: WorkerStats::default(),
            output,
        }
    }

    pub fn buffer(&self) -> &SliceBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    pub fn is_busy(&self) -> bool {
        self.throttle.is_in_flight()
    }

    pub fn handle(&mut self, message: WorkerMessage) -> ControlFlow<()> {
        match message {
            WorkerMessage::InstallBuffer {
                rows,
                vertex_count,
                frame_type,
                frame_number,
            } => {
                let kept = self.buffer.install(&rows);
                self.stats.installs += 1;
                log::debug!(
                    "Installed {} frame #{}: {} of {} vertices",
                    frame_type,
                    frame_number,
                    kept,
                    vertex_count
                );
                self.buffer_changed();
            }
            WorkerMessage::ResetSlice {
                slice_id,
                data,
                frame,
                ..
            } => {
                let write = self.buffer.reset_slice(slice_id as usize, &data);
                if write.overflowed() {
                    log::warn!(
                        "Frame #{}: slice {} overflow, dropped {} rows",
                        frame,
                        slice_id,
                        write.dropped
                    );
                    self.stats.dropped_rows += write.dropped as u64;
                }
                self.dirty = true;
            }
            WorkerMessage::AppendSlice {
                slice_id,
                data,
                frame,
                ..
            } => {
                let write = self.buffer.append_slice(slice_id as usize, &data);
                if write.overflowed() {
                    log::warn!(
                        "Frame #{}: slice {} full, dropped {} rows",
                        frame,
                        slice_id,
                        write.dropped
                    );
                    self.stats.dropped_rows += write.dropped as u64;
                }
                self.dirty = true;
            }
            WorkerMessage::ReSort {
                reset_slices,
                frame_type,
                frame_number,
                gop_number,
            } => {
                self.stats.total_frames += 1;
                match frame_type {
                    FrameType::I => self.stats.i_frames += 1,
                    FrameType::P => self.stats.p_frames += 1,
                }
                self.stats.last_gop = gop_number;
                log::debug!(
                    "Re-sort for {} frame #{} (GoP {}), reset slices {:?}",
                    frame_type,
                    frame_number,
                    gop_number,
                    reset_slices
                );
                self.emit(WorkerOutput::CompressionStats(self.stats));
                self.buffer_changed();
            }
            WorkerMessage::View(view_proj) => {
                self.view = Some(view_proj);
                self.throttle.request();
            }
            WorkerMessage::Shutdown => return ControlFlow::Break(()),
        }

        ControlFlow::Continue(())
    }

    fn buffer_changed(&mut self) {
        self.dirty = true;
        self.force_sort = true;
        self.throttle.request();
    }

    pub fn compute(&mut self) {
        let start = Instant::now();

        if self.dirty {
            let texture = pack_texture(self.buffer.rows());
            self.emit(WorkerOutput::Texture {
                texdata: texture.texdata,
                width: texture.width,
                height: texture.height,
            });
            self.dirty = false;
        }

        let Some(view_proj) = self.view else {
            return;
        };

        let live: Vec<u32> = self.buffer.live_indices().collect();
        let force = std::mem::take(&mut self.force_sort);
        if let Some(sort) = self
            .sorter
            .sort(self.buffer.rows(), &live, &view_proj, force)
        {
            log::debug!(
                "Sorted {} vertices in {:?}",
                sort.vertex_count,
                start.elapsed()
            );
            self.emit(WorkerOutput::DepthIndex {
                depth_index: sort.depth_index,
                view_proj,
                vertex_count: sort.vertex_count,
            });
        }
    }

    pub fn settle(&mut self, inbox: &mut mpsc::UnboundedReceiver<WorkerMessage>) -> ControlFlow<()> {
        self.drain(inbox)?;
        while self.throttle.is_in_flight() {
            self.compute();
            self.drain(inbox)?;
            self.throttle.complete();
        }
        ControlFlow::Continue(())
    }

    fn drain(&mut self, inbox: &mut mpsc::UnboundedReceiver<WorkerMessage>) -> ControlFlow<()> {
        while let Ok(message) = inbox.try_recv() {
            self.handle(message)?;
        }
        ControlFlow::Continue(())
    }

    pub fn run(mut self, mut inbox: mpsc::UnboundedReceiver<WorkerMessage>) -> WorkerStats {
        while let Some(message) = inbox.blocking_recv() {
            if self.handle(message).is_break() || self.settle(&mut inbox).is_break() {
                break;
            }
        }

        log::info!(
            "Worker stopped: {} frames ({} I, {} P), {} rows dropped",
            self.stats.total_frames,
            self.stats.i_frames,
            self.stats.p_frames,
            self.stats.dropped_rows
        );
        self.stats
    }

    fn emit(&self, output: WorkerOutput) {
        if self.output.send(output).is_err() {
            log::trace!("Worker output dropped, no receiver");
        }
    }
}

pub struct WorkerHandle {
    pub sender: mpsc::UnboundedSender<WorkerMessage>,
    pub outputs: mpsc::UnboundedReceiver<WorkerOutput>,
    task: JoinHandle<WorkerStats>,
}

impl WorkerHandle {
    pub fn sender(&self) -> mpsc::UnboundedSender<WorkerMessage> {
        self.sender.clone()
    }

    /// Hands the output channel to another task. Later calls get a closed
    /// receiver.
    pub fn take_outputs(&mut self) -> mpsc::UnboundedReceiver<WorkerOutput> {
        let (_, closed) = mpsc::unbounded_channel();
        std::mem::replace(&mut self.outputs, closed)
    }

    pub async fn shutdown(self) -> Result<WorkerStats, tokio::task::JoinError> {
        let _ = self.sender.send(WorkerMessage::Shutdown);
        self.task.await
    }
}

pub fn spawn_worker(slice_num: usize, slice_cap: usize) -> WorkerHandle {
    let (sender, inbox) = mpsc::unbounded_channel();
    let (output_tx, outputs) = mpsc::unbounded_channel();
    let worker = SplatWorker::new(slice_num, slice_cap, output_tx);
    let task = tokio::task::spawn_blocking(move || worker.run(inbox));

    WorkerHandle {
        sender,
        outputs,
        task,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::wire::VertexRow;

    fn row(z: f32) -> VertexRow {
        VertexRow {
            position: [0.0, 0.0, z],
            scale: [1.0; 3],
            rgba: [255; 4],
            rotation: [255, 128, 128, 128],
        }
    }

    fn outputs(rx: &mut mpsc::UnboundedReceiver<WorkerOutput>) -> Vec<WorkerOutput> {
        let mut out = Vec::new();
        while let Ok(o) = rx.try_recv() {
            out.push(o);
        }
        out
    }

    #[test]
    fn view_burst_coalesces_into_one_sort() {
        let (tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, mut inbox) = mpsc::unbounded_channel();
        let mut worker = SplatWorker::new(2, 4, tx);

        let _ = worker.handle(WorkerMessage::InstallBuffer {
            rows: vec![row(1.0), row(2.0), row(3.0)],
            vertex_count: 3,
            frame_type: FrameType::I,
            frame_number: 0,
        });
        let _ = worker.handle(WorkerMessage::View(Mat4::IDENTITY));
        for angle in 1..20 {
            in_tx
                .send(WorkerMessage::View(Mat4::from_rotation_y(angle as f32 * 0.3)))
                .unwrap();
        }
        assert!(worker.settle(&mut inbox).is_continue());
        assert!(!worker.is_busy());

        let sorts = outputs(&mut out_rx)
            .into_iter()
            .filter(|o| matches!(o, WorkerOutput::DepthIndex { .. }))
            .count();
        assert_eq!(sorts, 1);
    }

    #[test]
    fn slice_messages_update_buffer() {
        let (tx, mut out_rx) = mpsc::unbounded_channel();
        let mut worker = SplatWorker::new(2, 2, tx);

        let data: Arc<[VertexRow]> = Arc::from(vec![row(1.0), row(2.0), row(3.0)]);
        let _ = worker.handle(WorkerMessage::ResetSlice {
            slice_id: 1,
            data,
            frame: 2,
            is_i_frame: false,
            gop_number: 0,
        });
        assert_eq!(worker.buffer().slice_ptr(1), 2);
        assert_eq!(worker.stats().dropped_rows, 1);

        let _ = worker.handle(WorkerMessage::ReSort {
            reset_slices: vec![1],
            frame_type: FrameType::P,
            frame_number: 2,
            gop_number: 0,
        });
        worker.compute();

        let out = outputs(&mut out_rx);
        assert!(matches!(
            out[0],
            WorkerOutput::CompressionStats(WorkerStats { p_frames: 1, .. })
        ));
        assert!(matches!(out[1], WorkerOutput::Texture { height: 1, .. }));
    }

    #[tokio::test]
    async fn spawned_worker_answers_and_stops() {
        let mut handle = spawn_worker(1, 4);
        let sender = handle.sender();

        sender.send(WorkerMessage::View(Mat4::IDENTITY)).unwrap();
        sender
            .send(WorkerMessage::InstallBuffer {
                rows: vec![row(2.0), row(1.0)],
                vertex_count: 2,
                frame_type: FrameType::I,
                frame_number: 0,
            })
            .unwrap();

        let depth = loop {
            match handle.outputs.recv().await {
                Some(WorkerOutput::DepthIndex {
                    depth_index,
                    vertex_count,
                    ..
                }) if vertex_count == 2 => break depth_index,
                Some(_) => continue,
                None => panic!("worker exited early"),
            }
        };
        assert_eq!(depth, vec![1, 0]);

        let stats = handle.shutdown().await.unwrap();
        assert_eq!(stats.installs, 1);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::StreamingConfig;
use crate::event::{EventKind, FrameEvent};
use crate::wire::{
    GaussianRecord, STREAM_ROW_LENGTH, SortKey, VertexBatch, WireError, decode_records,
    encode_vertices,
};

use super::frame::{FrameType, gop_of};
use super::pframe::{PFrame, PFrameError, decode_pframe, reconstruct};
use super::stats::CompressionStats;

#[derive(Debug)]
pub struct FrameIngest {
    pub frame: u16,
    pub frame_type: FrameType,
    pub events: Vec<FrameEvent>,
    pub points: usize,
    pub fallback: Option<PFrameError>,
    pub skipped_indices: Vec<u32>,
}

#[derive(Debug)]
pub struct GopManager {
    gop_size: u16,
    slice_num: usize,
    compression_enabled: bool,
    i_frame_buffer: Option<Vec<GaussianRecord>>,
    current_gop: u32,
    frame_types: HashMap<u16, FrameType>,
    stats: CompressionStats,
}

impl GopManager {
    pub fn new(config: &StreamingConfig) -> Self {
        Self {
            gop_size: config.gop_size,
            slice_num: config.slice_num,
            compression_enabled: config.compression_enabled,
            i_frame_buffer: None,
            current_gop: 0,
            frame_types: HashMap::new(),
            stats: CompressionStats::default(),
        }
    }

    pub fn gop_size(&self) -> u16 {
        self.gop_size
    }

    pub fn current_gop(&self) -> u32 {
        self.current_gop
    }

    pub fn i_frame_buffer(&self) -> Option<&[GaussianRecord]> {
        self.i_frame_buffer.as_deref()
    }

    pub fn frame_type(&self, frame: u16) -> FrameType {
        self.frame_types
            .get(&frame)
            .copied()
            .unwrap_or_else(|| FrameType::of(frame, self.gop_size))
    }

    pub fn stats(&self) -> &CompressionStats {
        &self.stats
    }

    pub fn reset(&mut self) {
        self.i_frame_buffer = None;
        self.current_gop = 0;
        self.frame_types.clear();
        self.stats.reset();
    }

    pub fn store_i_frame(&mut self, records: &[GaussianRecord], frame: u16) {
        self.i_frame_buffer = Some(records.to_vec());
        self.current_gop = gop_of(frame, self.gop_size);
        self.frame_types.insert(frame, FrameType::I);
        self.stats.record_i_frame(records.len() * STREAM_ROW_LENGTH);

        log::info!(
            "I-frame #{} stored: {} Gaussians, GoP {}",
            frame,
            records.len(),
            self.current_gop
        );
    }

    pub fn load_initial(&mut self, records: Vec<GaussianRecord>) -> VertexBatch {
        self.store_i_frame(&records, 0);
        encode_vertices(records, SortKey::Reference)
    }

    pub fn restart_batch(&self, total_cap: usize) -> Option<VertexBatch> {
        let reference = self.i_frame_buffer.as_ref()?;
        let take = reference.len().min(total_cap);
        Some(encode_vertices(reference[..take].to_vec(), SortKey::Reference))
    }

    pub fn ingest_frame(&mut self, frame: u16, chunk: &[u8]) -> Result<FrameIngest, WireError> {
        let frame_type = FrameType::of(frame, self.gop_size);

        match frame_type {
            FrameType::I => self.ingest_i_frame(frame, chunk),
            FrameType::P if self.compression_enabled => match self.decode_p_frame(chunk) {
                Ok(pframe) => Ok(self.ingest_p_frame(frame, pframe)),
                Err(err) => {
                    log::warn!(
                        "P-frame #{}: {}, treating payload as uncompressed",
                        frame,
                        err
                    );
                    let mut ingest = self.ingest_plain(frame, chunk)?;
                    ingest.fallback = Some(err);
                    Ok(ingest)
                }
            },
            FrameType::P => self.ingest_plain(frame, chunk),
        }
    }

    fn decode_p_frame(&self, chunk: &[u8]) -> Result<PFrame, PFrameError> {
        if self.i_frame_buffer.is_none() {
            return Err(PFrameError::MissingReference);
        }
        decode_pframe(chunk)
    }

    fn ingest_i_frame(&mut self, frame: u16, chunk: &[u8]) -> Result<FrameIngest, WireError> {
        log::debug!("Processing I-frame #{}", frame);
        let records = decode_records(chunk)?;
        self.store_i_frame(&records, frame);

        let points = records.len();
        let batch = encode_vertices(records, SortKey::Slice);
        let events = self.events_from_spans(frame, &batch, true, None);

        Ok(FrameIngest {
            frame,
            frame_type: FrameType::I,
            events,
            points,
            fallback: None,
            skipped_indices: Vec::new(),
        })
    }

    fn ingest_p_frame(&mut self, frame: u16, pframe: PFrame) -> FrameIngest {
        log::debug!(
            "Processing P-frame #{}: {} reusable + {} residual",
            frame,
            pframe.reusable_indices.len(),
            pframe.residuals.len()
        );

        let reference = self.i_frame_buffer.as_deref().unwrap_or(&[]);
        let reference_len = reference.len();
        let residual_len = pframe.residuals.len();
        let rebuilt = reconstruct(reference, &pframe.reusable_indices, pframe.residuals);

        let saved = reference_len.saturating_sub(residual_len) * STREAM_ROW_LENGTH;
        self.stats.record_p_frame(saved);
        self.frame_types.insert(frame, FrameType::P);

        let points = rebuilt.records.len();
        let indices: Arc<[u32]> = Arc::from(pframe.reusable_indices);
        let batch = encode_vertices(rebuilt.records, SortKey::Slice);
        let events = self.events_from_spans(frame, &batch, false, Some(indices));

        log::debug!("P-frame #{}: reconstructed {} Gaussians", frame, points);

        FrameIngest {
            frame,
            frame_type: FrameType::P,
            events,
            points,
            fallback: None,
            skipped_indices: rebuilt.skipped,
        }
    }

    fn ingest_plain(&mut self, frame: u16, chunk: &[u8]) -> Result<FrameIngest, WireError> {
        let whole = chunk.len() - chunk.len() % STREAM_ROW_LENGTH;
        if whole != chunk.len() {
            log::warn!(
                "Frame #{}: dropping {} trailing bytes",
                frame,
                chunk.len() - whole
            );
        }
        let records: Vec<_> = decode_records(&chunk[..whole])?
            .into_iter()
            .filter(|r| !r.has_empty_window())
            .collect();
        let points = records.len();
        self.frame_types.insert(frame, FrameType::P);

        let batch = encode_vertices(records, SortKey::Slice);
        let mut events: Vec<_> = batch
            .spans()
            .iter()
            .map(|span| {
                FrameEvent::new(
                    span.frame,
                    self.slice_num,
                    EventKind::Reset,
                    batch.span_rows(span),
                    false,
                )
            })
            .collect();
        // Playback only moves past a frame that has at least one event.
        if !events.iter().any(|e| e.frame == frame) {
            events.push(FrameEvent::empty_reset(frame, self.slice_num, false));
        }

        Ok(FrameIngest {
            frame,
            frame_type: FrameType::P,
            events,
            points,
            fallback: None,
            skipped_indices: Vec::new(),
        })
    }

    fn events_from_spans(
        &self,
        frame: u16,
        batch: &VertexBatch,
        is_i_frame: bool,
        indices: Option<Arc<[u32]>>,
    ) -> Vec<FrameEvent> {
        let mut events = Vec::with_capacity(batch.spans().len() + 1);
        let mut overwrites_frame = false;

        for span in batch.spans() {
            let kind = if span.frame == frame {
                overwrites_frame = true;
                EventKind::Reset
            } else {
                EventKind::Append
            };

            let mut event = FrameEvent::new(
                span.frame,
                self.slice_num,
                kind,
                batch.span_rows(span),
                is_i_frame,
            );
            if let Some(indices) = &indices {
                event = event.with_reusable_indices(Arc::clone(indices));
            }
            events.push(event);
        }

        if !overwrites_frame {
            events.push(FrameEvent::empty_reset(frame, self.slice_num, is_i_frame));
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gop::encode_pframe;
    use crate::wire::encode_records;

    fn config() -> StreamingConfig {
        StreamingConfig::new("mem://test", 100, 4, 400, 30)
    }

    fn point(start_frame: u16, end_frame: u16, x: f32) -> GaussianRecord {
        GaussianRecord {
            start_frame,
            end_frame,
            xyz: [x, 0.0, 0.0],
            color: [0, 255, 0],
            opacity: 128,
            scaling: [0.1, 0.1, 0.1],
            rotation: [255, 128, 128, 128],
        }
    }

    fn reference(n: usize) -> Vec<GaussianRecord> {
        (0..n).map(|i| point(0, 24, i as f32)).collect()
    }

    #[test]
    fn i_frame_replaces_reference() {
        let mut gop = GopManager::new(&config());
        gop.load_initial(reference(400));
        assert_eq!(gop.i_frame_buffer().unwrap().len(), 400);

        let chunk = encode_records(&vec![point(24, 30, 7.0); 100]);
        let ingest = gop.ingest_frame(24, &chunk).unwrap();

        assert_eq!(ingest.frame_type, FrameType::I);
        assert_eq!(gop.i_frame_buffer().unwrap().len(), 100);
        assert_eq!(gop.current_gop(), 1);
        assert_eq!(ingest.events.len(), 1);
        assert_eq!(ingest.events[0].kind, EventKind::Reset);
        assert_eq!(ingest.events[0].rows(), 100);
        assert!(ingest.events[0].is_i_frame);
    }

    #[test]
    fn i_frame_look_ahead_spans_append() {
        let mut gop = GopManager::new(&config());
        let mut records = vec![point(26, 30, 0.0); 3];
        records.extend(vec![point(25, 30, 1.0); 2]);

        let ingest = gop.ingest_frame(24, &encode_records(&records)).unwrap();
        let kinds: Vec<_> = ingest.events.iter().map(|e| (e.frame, e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (25, EventKind::Append),
                (26, EventKind::Append),
                (24, EventKind::Reset)
            ]
        );
        assert_eq!(ingest.events[2].rows(), 0);
    }

    #[test]
    fn p_frame_reconstructs_against_reference() {
        let mut gop = GopManager::new(&config());
        gop.load_initial(reference(400));

        let payload = encode_pframe(&[0, 1, 2], &[point(1, 2, 50.0), point(1, 3, 51.0)]);
        let ingest = gop.ingest_frame(1, &payload).unwrap();

        assert_eq!(ingest.frame_type, FrameType::P);
        assert!(ingest.fallback.is_none());
        assert_eq!(ingest.points, 5);
        assert_eq!(ingest.events.len(), 1);
        let event = &ingest.events[0];
        assert_eq!(event.kind, EventKind::Reset);
        assert_eq!(event.slice_id, 0);
        assert_eq!(event.rows(), 5);
        assert_eq!(event.reusable_indices.as_deref(), Some(&[0, 1, 2][..]));

        let stats = gop.stats();
        assert_eq!(stats.p_frames, 1);
        assert_eq!(stats.saved_bandwidth, (400 - 2) * 36);
    }

    #[test]
    fn padded_p_frame_leaves_total_at_reference_bytes() {
        let mut gop = GopManager::new(&config());
        gop.load_initial(reference(400));

        let mut payload = encode_pframe(&[0, 1, 2], &[point(1, 2, 50.0), point(1, 3, 51.0)]);
        payload.resize(config().frame_bytes(), 0);
        gop.ingest_frame(1, &payload).unwrap();

        let stats = gop.stats();
        assert_eq!(stats.total_bandwidth, 400 * 36);
        assert_eq!(stats.saved_bandwidth, (400 - 2) * 36);
        assert!((stats.compression_ratio() - 99.5).abs() < 1e-9);
    }

    #[test]
    fn short_payload_falls_back() {
        let mut gop = GopManager::new(&config());
        gop.load_initial(reference(4));

        let ingest = gop.ingest_frame(1, &[0, 0]).unwrap();
        assert_eq!(ingest.fallback, Some(PFrameError::TooShort(2)));
        assert_eq!(ingest.points, 0);
        assert_eq!(ingest.events.len(), 1);
        assert_eq!(ingest.events[0].frame, 1);
        assert_eq!(ingest.events[0].rows(), 0);
    }

    #[test]
    fn missing_reference_falls_back_to_plain_records() {
        let mut gop = GopManager::new(&config());
        let chunk = encode_records(&[point(3, 5, 0.0), point(3, 5, 1.0)]);

        let ingest = gop.ingest_frame(3, &chunk).unwrap();
        assert_eq!(ingest.fallback, Some(PFrameError::MissingReference));
        assert_eq!(ingest.events.len(), 1);
        assert_eq!(ingest.events[0].kind, EventKind::Reset);
        assert_eq!(ingest.events[0].rows(), 2);
    }

    #[test]
    fn compression_disabled_treats_p_frames_as_plain() {
        let mut cfg = config();
        cfg.compression_enabled = false;
        let mut gop = GopManager::new(&cfg);
        gop.load_initial(reference(4));

        let chunk = encode_records(&[point(2, 3, 0.0)]);
        let ingest = gop.ingest_frame(2, &chunk).unwrap();
        assert!(ingest.fallback.is_none());
        assert_eq!(ingest.events[0].frame, 2);
        assert_eq!(gop.stats().p_frames, 0);
    }

    #[test]
    fn later_p_frames_use_new_reference() {
        let mut gop = GopManager::new(&config());
        gop.load_initial(reference(400));
        let new_reference: Vec<_> = (0..100).map(|i| point(24, 48, 1000.0 + i as f32)).collect();
        gop.ingest_frame(24, &encode_records(&new_reference)).unwrap();

        let payload = encode_pframe(&[99, 150], &[]);
        let ingest = gop.ingest_frame(25, &payload).unwrap();

        assert_eq!(ingest.skipped_indices, vec![150]);
        assert_eq!(ingest.points, 1);
        assert_eq!(ingest.events[0].frame, 24);
        assert_eq!(ingest.events[0].payload[0].position[0], 1099.0);
    }

    #[test]
    fn restart_batch_caps_at_total() {
        let mut gop = GopManager::new(&config());
        assert!(gop.restart_batch(10).is_none());

        gop.load_initial(reference(20));
        let batch = gop.restart_batch(10).unwrap();
        assert_eq!(batch.len(), 10);
    }
}

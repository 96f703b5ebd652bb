use bytemuck::{Pod, Zeroable};

use super::record::GaussianRecord;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct VertexRow {
    pub position: [f32; 3],
    pub scale: [f32; 3],
    pub rgba: [u8; 4],
    pub rotation: [u8; 4],
}

pub const VERTEX_ROW_LENGTH: usize = std::mem::size_of::<VertexRow>();

impl From<&GaussianRecord> for VertexRow {
    fn from(record: &GaussianRecord) -> Self {
        Self {
            position: record.xyz,
            scale: record.scaling,
            rgba: [
                record.color[0],
                record.color[1],
                record.color[2],
                record.opacity,
            ],
            rotation: record.rotation,
        }
    }
}

impl VertexRow {
    pub fn is_zeroed(&self) -> bool {
        *self == Self::zeroed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Reference,
    Slice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    pub frame: u16,
    pub from: usize,
    pub to: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanLayout {
    Reference(Vec<u16>),
    Slice(Vec<FrameSpan>),
}

#[derive(Debug, Clone)]
pub struct VertexBatch {
    pub rows: Vec<VertexRow>,
    pub layout: SpanLayout,
}

impl VertexBatch {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.rows)
    }

    pub fn spans(&self) -> &[FrameSpan] {
        match &self.layout {
            SpanLayout::Slice(spans) => spans,
            SpanLayout::Reference(_) => &[],
        }
    }

    pub fn span_rows(&self, span: &FrameSpan) -> &[VertexRow] {
        &self.rows[span.from..span.to]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sorts `records` by the chosen key (stable) and lays them out as GPU vertex
/// rows. In slice mode every record lands in exactly one span of equal
/// `start_frame`; in reference mode the layout lists each row's `end_frame`.
pub fn encode_vertices(mut records: Vec<GaussianRecord>, key: SortKey) -> VertexBatch {
    match key {
        SortKey::Reference => records.sort_by_key(|r| r.end_frame),
        SortKey::Slice => records.sort_by_key(|r| r.start_frame),
    }

    let rows: Vec<VertexRow> = records.iter().map(VertexRow::from).collect();

    let layout = match key {
        SortKey::Reference => SpanLayout::Reference(records.iter().map(|r| r.end_frame).collect()),
        SortKey::Slice => SpanLayout::Slice(slice_spans(&records)),
    };

    VertexBatch { rows, layout }
}

fn slice_spans(sorted: &[GaussianRecord]) -> Vec<FrameSpan> {
    let mut spans = Vec::new();
    let mut from = 0;

    for (i, record) in sorted.iter().enumerate() {
        if record.start_frame != sorted[from].start_frame {
            spans.push(FrameSpan {
                frame: sorted[from].start_frame,
                from,
                to: i,
                total: i - from,
            });
            from = i;
        }
    }

    if from < sorted.len() {
        spans.push(FrameSpan {
            frame: sorted[from].start_frame,
            from,
            to: sorted.len(),
            total: sorted.len() - from,
        });
    }

    spans
}

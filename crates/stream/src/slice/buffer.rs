use bytemuck::Zeroable;

use crate::wire::VertexRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceWrite {
    pub written: usize,
    pub dropped: usize,
}

impl SliceWrite {
    pub fn overflowed(&self) -> bool {
        self.dropped > 0
    }
}

/// One shared vertex buffer split into `slice_num` slices of `slice_cap`
/// rows. Each slice has a fill pointer that never exceeds `slice_cap`.
#[derive(Debug)]
pub struct SliceBuffer {
    rows: Vec<VertexRow>,
    slice_ptr: Vec<usize>,
    slice_num: usize,
    slice_cap: usize,
}

impl SliceBuffer {
    pub fn new(slice_num: usize, slice_cap: usize) -> Self {
        Self {
            rows: vec![VertexRow::zeroed(); slice_num * slice_cap],
            slice_ptr: vec![0; slice_num],
            slice_num,
            slice_cap,
        }
    }

    pub fn slice_num(&self) -> usize {
        self.slice_num
    }

    pub fn slice_cap(&self) -> usize {
        self.slice_cap
    }

    pub fn capacity(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[VertexRow] {
        &self.rows
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.rows)
    }

    pub fn slice(&self, slice_id: usize) -> &[VertexRow] {
        let start = slice_id * self.slice_cap;
        &self.rows[start..start + self.slice_cap]
    }

    pub fn slice_ptr(&self, slice_id: usize) -> usize {
        self.slice_ptr[slice_id]
    }

    pub fn live_rows(&self) -> usize {
        self.slice_ptr.iter().sum()
    }

    pub fn live_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.slice_ptr
            .iter()
            .enumerate()
            .flat_map(move |(id, &ptr)| {
                let start = id * self.slice_cap;
                (start..start + ptr).map(|i| i as u32)
            })
    }

    pub fn install(&mut self, data: &[VertexRow]) -> usize {
        let kept = data.len().min(self.rows.len());
        if kept < data.len() {
            log::warn!(
                "Buffer install truncated: {} rows, capacity {}",
                data.len(),
                self.rows.len()
            );
        }

        self.rows[..kept].copy_from_slice(&data[..kept]);
        self.rows[kept..].fill(VertexRow::zeroed());

        for (id, ptr) in self.slice_ptr.iter_mut().enumerate() {
            *ptr = kept.saturating_sub(id * self.slice_cap).min(self.slice_cap);
        }

        kept
    }

    pub fn reset_slice(&mut self, slice_id: usize, data: &[VertexRow]) -> SliceWrite {
        if slice_id >= self.slice_num {
            log::warn!("Reset of unknown slice #{}", slice_id);
            return SliceWrite {
                written: 0,
                dropped: data.len(),
            };
        }

        let cap = self.slice_cap;
        let written = data.len().min(cap);
        let start = slice_id * cap;
        let slice = &mut self.rows[start..start + cap];

        slice[..written].copy_from_slice(&data[..written]);
        slice[written..].fill(VertexRow::zeroed());
        self.slice_ptr[slice_id] = written;

        SliceWrite {
            written,
            dropped: data.len() - written,
        }
    }

    pub fn append_slice(&mut self, slice_id: usize, data: &[VertexRow]) -> SliceWrite {
        if slice_id >= self.slice_num {
            log::warn!("Append to unknown slice #{}", slice_id);
            return SliceWrite {
                written: 0,
                dropped: data.len(),
            };
        }

        let ptr = self.slice_ptr[slice_id];
        if ptr >= self.slice_cap {
            return SliceWrite {
                written: 0,
                dropped: data.len(),
            };
        }

        let written = data.len().min(self.slice_cap - ptr);
        let start = slice_id * self.slice_cap + ptr;
        self.rows[start..start + written].copy_from_slice(&data[..written]);
        self.slice_ptr[slice_id] = ptr + written;

        SliceWrite {
            written,
            dropped: data.len() - written,
        }
    }

    pub fn clear(&mut self) {
        self.rows.fill(VertexRow::zeroed());
        self.slice_ptr.fill(0);
    }
}

use glam::{Mat3, Mat4, Vec3};
use half::f16;

use crate::wire::VertexRow;

pub const TEXTURE_WIDTH: u32 = 2048;

const SORT_BUCKETS: usize = 256 * 256;
const DEPTH_SCALE: f32 = 4096.0;
const VIEW_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct PackedTexture {
    pub texdata: Vec<u32>,
    pub width: u32,
    pub height: u32,
}

pub fn pack_texture(rows: &[VertexRow]) -> PackedTexture {
    let width = TEXTURE_WIDTH;
    let height = (2 * rows.len()).div_ceil(width as usize) as u32;
    let mut texdata = vec![0u32; width as usize * height as usize * 4];

    for (i, row) in rows.iter().enumerate() {
        let texel = &mut texdata[8 * i..8 * i + 8];
        texel[0] = row.position[0].to_bits();
        texel[1] = row.position[1].to_bits();
        texel[2] = row.position[2].to_bits();

        let sigma = covariance(row);
        texel[4] = pack_half_2x16(4.0 * sigma[0], 4.0 * sigma[1]);
        texel[5] = pack_half_2x16(4.0 * sigma[2], 4.0 * sigma[3]);
        texel[6] = pack_half_2x16(4.0 * sigma[4], 4.0 * sigma[5]);
        texel[7] = u32::from_le_bytes(row.rgba);
    }

    PackedTexture {
        texdata,
        width,
        height,
    }
}

/// Upper triangle of `R S S^T R^T`, row by row.
pub fn covariance(row: &VertexRow) -> [f32; 6] {
    let [w, x, y, z] = row.rotation.map(|b| (f32::from(b) - 128.0) / 128.0);
    let [sx, sy, sz] = row.scale;

    let m = Mat3::from_cols(
        Vec3::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y + w * z),
            2.0 * (x * z - w * y),
        ) * sx,
        Vec3::new(
            2.0 * (x * y - w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z + w * x),
        ) * sy,
        Vec3::new(
            2.0 * (x * z + w * y),
            2.0 * (y * z - w * x),
            1.0 - 2.0 * (x * x + y * y),
        ) * sz,
    );
    let sigma = m * m.transpose();

    [
        sigma.x_axis.x,
        sigma.y_axis.x,
        sigma.z_axis.x,
        sigma.y_axis.y,
        sigma.z_axis.y,
        sigma.z_axis.z,
    ]
}

fn pack_half_2x16(a: f32, b: f32) -> u32 {
    u32::from(f16::from_f32(a).to_bits()) | (u32::from(f16::from_f32(b).to_bits()) << 16)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthSort {
    pub depth_index: Vec<u32>,
    pub vertex_count: usize,
}

#[derive(Debug, Default)]
pub struct DepthSorter {
    last_view: Option<Mat4>,
    last_vertex_count: usize,
    keys: Vec<i32>,
    counts: Vec<u32>,
}

impl DepthSorter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs_sort(&self, view_proj: &Mat4, vertex_count: usize) -> bool {
        let Some(last) = &self.last_view else {
            return true;
        };
        if vertex_count != self.last_vertex_count {
            return true;
        }

        let a = depth_axis(last);
        let b = depth_axis(view_proj);
        (a.dot(b) - 1.0).abs() >= VIEW_EPSILON
    }

    /// Returns `None` when the previous order is still good enough.
    pub fn sort(
        &mut self,
        rows: &[VertexRow],
        live: &[u32],
        view_proj: &Mat4,
        force: bool,
    ) -> Option<DepthSort> {
        if !force && !self.needs_sort(view_proj, live.len()) {
            return None;
        }
        self.last_view = Some(*view_proj);
        self.last_vertex_count = live.len();

        let axis = depth_axis(view_proj);
        self.keys.clear();
        self.keys.extend(live.iter().map(|&i| {
            let p = Vec3::from_array(rows[i as usize].position);
            (axis.dot(p) * DEPTH_SCALE) as i32
        }));

        let min = self.keys.iter().copied().min().unwrap_or(0);
        let max = self.keys.iter().copied().max().unwrap_or(0);
        let range = (i64::from(max) - i64::from(min)) as f64;
        let inv = if range > 0.0 {
            (SORT_BUCKETS - 1) as f64 / range
        } else {
            0.0
        };

        self.counts.clear();
        self.counts.resize(SORT_BUCKETS, 0);
        for key in self.keys.iter_mut() {
            let bucket = ((i64::from(*key) - i64::from(min)) as f64 * inv) as usize;
            *key = bucket.min(SORT_BUCKETS - 1) as i32;
            self.counts[*key as usize] += 1;
        }

        let mut start = 0;
        for count in self.counts.iter_mut() {
            let next = start + *count;
            *count = start;
            start = next;
        }

        let mut depth_index = vec![0u32; live.len()];
        for (&row, &bucket) in live.iter().zip(&self.keys) {
            let slot = &mut self.counts[bucket as usize];
            depth_index[*slot as usize] = row;
            *slot += 1;
        }

        Some(DepthSort {
            depth_index,
            vertex_count: live.len(),
        })
    }
}

fn depth_axis(view_proj: &Mat4) -> Vec3 {
    Vec3::new(
        view_proj.x_axis.z,
        view_proj.y_axis.z,
        view_proj.z_axis.z,
    )
}

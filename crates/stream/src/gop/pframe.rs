use crate::wire::{GaussianRecord, STREAM_ROW_LENGTH, WireError, decode_records, encode_records};

pub const MAX_REUSABLE_COUNT: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PFrameError {
    #[error("payload is {0} bytes, shorter than the reusable count")]
    TooShort(usize),
    #[error("reusable count {0} exceeds the sanity ceiling")]
    CountTooLarge(u32),
    #[error("{count} reusable indices need {needed} bytes, payload has {len}")]
    IndicesTruncated {
        count: u32,
        needed: usize,
        len: usize,
    },
    #[error("no I-frame has been stored yet")]
    MissingReference,
    #[error("residual records: {0}")]
    Residual(#[from] WireError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PFrame {
    pub reusable_indices: Vec<u32>,
    pub residuals: Vec<GaussianRecord>,
}

impl PFrame {
    pub fn compression_ratio(&self) -> f32 {
        let total = self.reusable_indices.len() + self.residuals.len();
        if total == 0 {
            return 0.0;
        }
        self.residuals.len() as f32 / total as f32
    }
}

#[inline]
fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Parses `[count: u32 LE][count x index: u32 LE][residual wire records]`.
pub fn decode_pframe(payload: &[u8]) -> Result<PFrame, PFrameError> {
    if payload.len() < 4 {
        return Err(PFrameError::TooShort(payload.len()));
    }

    let count = le_u32(payload, 0);
    if count > MAX_REUSABLE_COUNT {
        return Err(PFrameError::CountTooLarge(count));
    }

    let residual_offset = 4 + count as usize * 4;
    if residual_offset > payload.len() {
        return Err(PFrameError::IndicesTruncated {
            count,
            needed: residual_offset,
            len: payload.len(),
        });
    }

    let reusable_indices = payload[4..residual_offset]
        .chunks_exact(4)
        .map(|b| le_u32(b, 0))
        .collect();

    let residual = &payload[residual_offset..];
    let whole = residual.len() - residual.len() % STREAM_ROW_LENGTH;
    let residuals = decode_records(&residual[..whole])?
        .into_iter()
        .filter(|r| !r.has_empty_window())
        .collect();

    Ok(PFrame {
        reusable_indices,
        residuals,
    })
}

pub fn encode_pframe(reusable_indices: &[u32], residuals: &[GaussianRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + reusable_indices.len() * 4);
    out.extend_from_slice(&(reusable_indices.len() as u32).to_le_bytes());
    for index in reusable_indices {
        out.extend_from_slice(&index.to_le_bytes());
    }
    out.extend_from_slice(&encode_records(residuals));
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconstruction {
    pub records: Vec<GaussianRecord>,
    pub skipped: Vec<u32>,
}

/// Rebuilds a frame from the reference I-frame: reused points first, in index
/// order, then the residuals. Reused points take the first residual's validity
/// window, so one P-frame shares a single window across every reused point.
pub fn reconstruct(
    reference: &[GaussianRecord],
    reusable_indices: &[u32],
    residuals: Vec<GaussianRecord>,
) -> Reconstruction {
    let window = residuals.first().map(|r| (r.start_frame, r.end_frame));
    let mut records = Vec::with_capacity(reusable_indices.len() + residuals.len());
    let mut skipped = Vec::new();

    for &index in reusable_indices {
        match reference.get(index as usize) {
            Some(point) => {
                let point = match window {
                    Some((start, end)) => point.with_window(start, end),
                    None => *point,
                };
                records.push(point);
            }
            None => {
                log::warn!(
                    "Invalid reusable index: {} (I-frame has {} Gaussians)",
                    index,
                    reference.len()
                );
                skipped.push(index);
            }
        }
    }

    records.extend(residuals);

    Reconstruction { records, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(start_frame: u16, end_frame: u16, x: f32) -> GaussianRecord {
        GaussianRecord {
            start_frame,
            end_frame,
            xyz: [x, 0.0, 0.0],
            color: [255, 0, 0],
            opacity: 255,
            scaling: [1.0, 1.0, 1.0],
            rotation: [255, 128, 128, 128],
        }
    }

    #[test]
    fn parses_indices_little_endian() {
        let payload = encode_pframe(&[0x0102_0304, 7], &[point(3, 4, 1.0)]);
        assert_eq!(&payload[4..8], &[0x04, 0x03, 0x02, 0x01]);

        let frame = decode_pframe(&payload).unwrap();
        assert_eq!(frame.reusable_indices, vec![0x0102_0304, 7]);
        assert_eq!(frame.residuals, vec![point(3, 4, 1.0)]);
        assert_eq!(frame.compression_ratio(), 1.0 / 3.0);
    }

    #[test]
    fn two_byte_payload_is_invalid() {
        assert_eq!(decode_pframe(&[1, 2]), Err(PFrameError::TooShort(2)));
    }

    #[test]
    fn oversized_count_is_invalid() {
        let payload = (MAX_REUSABLE_COUNT + 1).to_le_bytes();
        assert_eq!(
            decode_pframe(&payload),
            Err(PFrameError::CountTooLarge(MAX_REUSABLE_COUNT + 1))
        );
    }

    #[test]
    fn truncated_indices_are_invalid() {
        let mut payload = 3u32.to_le_bytes().to_vec();
        payload.extend_from_slice(&1u32.to_le_bytes());
        assert!(matches!(
            decode_pframe(&payload),
            Err(PFrameError::IndicesTruncated { count: 3, needed: 16, len: 8 })
        ));
    }

    #[test]
    fn padding_is_ignored() {
        let mut payload = encode_pframe(&[1], &[point(5, 9, 2.0)]);
        payload.resize(payload.len() + STREAM_ROW_LENGTH * 2 + 7, 0);

        let frame = decode_pframe(&payload).unwrap();
        assert_eq!(frame.reusable_indices, vec![1]);
        assert_eq!(frame.residuals.len(), 1);
    }

    #[test]
    fn no_reuse_yields_residuals_in_order() {
        let reference = vec![point(0, 24, 0.0); 4];
        let residuals = vec![point(1, 3, 1.0), point(1, 5, 2.0), point(1, 2, 3.0)];

        let rebuilt = reconstruct(&reference, &[], residuals.clone());
        assert_eq!(rebuilt.records, residuals);
        assert!(rebuilt.skipped.is_empty());
    }

    #[test]
    fn reuse_only_keeps_reference_windows() {
        let reference = vec![point(0, 10, 0.0), point(0, 20, 1.0), point(0, 30, 2.0)];

        let rebuilt = reconstruct(&reference, &[2, 0], Vec::new());
        assert_eq!(rebuilt.records, vec![reference[2], reference[0]]);
    }

    #[test]
    fn reused_points_share_first_residual_window() {
        let reference = vec![point(0, 10, 0.0), point(0, 20, 1.0)];
        let residuals = vec![point(4, 6, 9.0), point(4, 8, 10.0)];

        let rebuilt = reconstruct(&reference, &[0, 1], residuals);
        assert_eq!(rebuilt.records.len(), 4);
        for reused in &rebuilt.records[..2] {
            assert_eq!((reused.start_frame, reused.end_frame), (4, 6));
        }
        assert_eq!(rebuilt.records[1].xyz[0], 1.0);
        assert_eq!(rebuilt.records[3].end_frame, 8);
    }

    #[test]
    fn out_of_range_index_is_skipped() {
        let reference = vec![point(0, 10, 0.0)];
        let rebuilt = reconstruct(&reference, &[0, 5, 0], vec![point(2, 3, 1.0)]);

        assert_eq!(rebuilt.records.len(), 3);
        assert_eq!(rebuilt.skipped, vec![5]);
    }

    #[test]
    fn reconstruction_does_not_touch_reference() {
        let reference = vec![point(0, 10, 0.0)];
        let rebuilt = reconstruct(&reference, &[0], vec![point(7, 8, 1.0)]);

        assert_eq!(rebuilt.records[0].start_frame, 7);
        assert_eq!(reference[0].start_frame, 0);
    }
}

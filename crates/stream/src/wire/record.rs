pub const STREAM_ROW_LENGTH: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianRecord {
    pub start_frame: u16,
    pub end_frame: u16,
    pub xyz: [f32; 3],
    pub color: [u8; 3],
    pub opacity: u8,
    pub scaling: [f32; 3],
    pub rotation: [u8; 4],
}

impl GaussianRecord {
    pub fn has_empty_window(&self) -> bool {
        self.start_frame >= self.end_frame
    }

    pub fn with_window(mut self, start_frame: u16, end_frame: u16) -> Self {
        self.start_frame = start_frame;
        self.end_frame = end_frame;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("malformed stream: {len} bytes is not a multiple of the {row_length}-byte record")]
    MalformedStream { len: usize, row_length: usize },
}

#[inline]
fn be_u16(row: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([row[at], row[at + 1]])
}

#[inline]
fn be_f32(row: &[u8], at: usize) -> f32 {
    f32::from_be_bytes([row[at], row[at + 1], row[at + 2], row[at + 3]])
}

fn decode_row(row: &[u8]) -> GaussianRecord {
    GaussianRecord {
        start_frame: be_u16(row, 0),
        end_frame: be_u16(row, 2),
        xyz: [be_f32(row, 4), be_f32(row, 8), be_f32(row, 12)],
        color: [row[16], row[17], row[18]],
        opacity: row[19],
        scaling: [be_f32(row, 20), be_f32(row, 24), be_f32(row, 28)],
        rotation: [row[32], row[33], row[34], row[35]],
    }
}

/// Decodes big-endian wire records. The input must hold whole records; callers
/// keep any partial tail buffered until the next read completes it.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<GaussianRecord>, WireError> {
    if bytes.len() % STREAM_ROW_LENGTH != 0 {
        return Err(WireError::MalformedStream {
            len: bytes.len(),
            row_length: STREAM_ROW_LENGTH,
        });
    }

    Ok(bytes.chunks_exact(STREAM_ROW_LENGTH).map(decode_row).collect())
}

pub fn encode_record(record: &GaussianRecord, out: &mut Vec<u8>) {
    out.extend_from_slice(&record.start_frame.to_be_bytes());
    out.extend_from_slice(&record.end_frame.to_be_bytes());
    for v in record.xyz {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out.extend_from_slice(&record.color);
    out.push(record.opacity);
    for v in record.scaling {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out.extend_from_slice(&record.rotation);
}

pub fn encode_records(records: &[GaussianRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * STREAM_ROW_LENGTH);
    for record in records {
        encode_record(record, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(start_frame: u16, end_frame: u16) -> GaussianRecord {
        GaussianRecord {
            start_frame,
            end_frame,
            xyz: [1.5, -2.25, 300.0],
            color: [10, 20, 30],
            opacity: 200,
            scaling: [0.01, 0.02, 0.5],
            rotation: [128, 255, 0, 64],
        }
    }

    #[test]
    fn decodes_big_endian_layout() {
        let mut bytes = vec![0u8; STREAM_ROW_LENGTH];
        bytes[0..2].copy_from_slice(&[0x01, 0x02]);
        bytes[2..4].copy_from_slice(&[0x00, 0x30]);
        bytes[4..8].copy_from_slice(&1.0f32.to_be_bytes());
        bytes[16] = 7;
        bytes[19] = 99;
        bytes[28..32].copy_from_slice(&0.25f32.to_be_bytes());
        bytes[35] = 42;

        let records = decode_records(&bytes).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.start_frame, 0x0102);
        assert_eq!(r.end_frame, 0x30);
        assert_eq!(r.xyz[0], 1.0);
        assert_eq!(r.color[0], 7);
        assert_eq!(r.opacity, 99);
        assert_eq!(r.scaling[2], 0.25);
        assert_eq!(r.rotation[3], 42);
    }

    #[test]
    fn record_count_matches_length() {
        let records: Vec<_> = (0..17).map(|i| sample(i, i + 5)).collect();
        let bytes = encode_records(&records);
        assert_eq!(bytes.len(), 17 * STREAM_ROW_LENGTH);

        let decoded = decode_records(&bytes).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn misaligned_input_is_rejected() {
        let bytes = encode_records(&[sample(0, 1), sample(1, 2)]);
        let err = decode_records(&bytes[..STREAM_ROW_LENGTH + 5]).unwrap_err();
        assert_eq!(
            err,
            WireError::MalformedStream {
                len: STREAM_ROW_LENGTH + 5,
                row_length: STREAM_ROW_LENGTH
            }
        );
    }

    #[test]
    fn empty_input_decodes_to_nothing() {
        assert!(decode_records(&[]).unwrap().is_empty());
    }

    #[test]
    fn validity_window() {
        assert!(!sample(3, 6).has_empty_window());
        assert!(sample(6, 6).has_empty_window());
        assert!(sample(7, 6).has_empty_window());
    }
}

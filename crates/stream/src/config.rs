use std::path::Path;
use std::time::Duration;

use glam::Mat4;
use serde::Deserialize;

use crate::wire::{STREAM_ROW_LENGTH, VERTEX_ROW_LENGTH};

pub const DEFAULT_GOP_SIZE: u16 = 24;

fn default_gop_size() -> u16 {
    DEFAULT_GOP_SIZE
}

fn default_compression() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StreamingConfig {
    pub max_frame: u16,
    pub slice_num: usize,
    pub total_cap: usize,
    pub stream_row_length: usize,
    pub vertex_row_length: usize,
    pub fps: u32,
    #[serde(default = "default_gop_size")]
    pub gop_size: u16,
    #[serde(default = "default_compression")]
    pub compression_enabled: bool,
    pub model_url: String,
    #[serde(default)]
    pub init_view: Option<[f32; 16]>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{field} is {actual}, this build only understands {expected}")]
    RowLength {
        field: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error("MODEL_URL is empty")]
    MissingModelUrl,
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl StreamingConfig {
    pub fn new(
        model_url: impl Into<String>,
        max_frame: u16,
        slice_num: usize,
        total_cap: usize,
        fps: u32,
    ) -> Self {
        Self {
            max_frame,
            slice_num,
            total_cap,
            stream_row_length: STREAM_ROW_LENGTH,
            vertex_row_length: VERTEX_ROW_LENGTH,
            fps,
            gop_size: DEFAULT_GOP_SIZE,
            compression_enabled: true,
            model_url: model_url.into(),
            init_view: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame == 0 {
            return Err(ConfigError::Zero("MAX_FRAME"));
        }
        if self.slice_num == 0 {
            return Err(ConfigError::Zero("SLICE_NUM"));
        }
        if self.total_cap == 0 {
            return Err(ConfigError::Zero("TOTAL_CAP"));
        }
        if self.fps == 0 {
            return Err(ConfigError::Zero("FPS"));
        }
        if self.gop_size == 0 {
            return Err(ConfigError::Zero("GOP_SIZE"));
        }
        if self.stream_row_length != STREAM_ROW_LENGTH {
            return Err(ConfigError::RowLength {
                field: "STREAM_ROW_LENGTH",
                actual: self.stream_row_length,
                expected: STREAM_ROW_LENGTH,
            });
        }
        if self.vertex_row_length != VERTEX_ROW_LENGTH {
            return Err(ConfigError::RowLength {
                field: "VERTEX_ROW_LENGTH",
                actual: self.vertex_row_length,
                expected: VERTEX_ROW_LENGTH,
            });
        }
        if self.model_url.trim().is_empty() {
            return Err(ConfigError::MissingModelUrl);
        }
        Ok(())
    }

    pub fn slice_cap(&self) -> usize {
        self.total_cap.div_ceil(self.slice_num)
    }

    pub fn buffer_rows(&self) -> usize {
        self.slice_num * self.slice_cap()
    }

    pub fn tick_period(&self) -> Duration {
        let ms = (1000.0 / self.fps as f64).round().max(1.0);
        Duration::from_millis(ms as u64)
    }

    pub fn initial_bytes(&self) -> usize {
        self.total_cap * self.stream_row_length
    }

    pub fn frame_bytes(&self) -> usize {
        self.slice_cap() * self.stream_row_length
    }

    pub fn minimal_bandwidth_mbps(&self) -> u32 {
        let bits = self.stream_row_length as f64 * self.total_cap as f64 * self.fps as f64;
        (bits / 1e6 / self.slice_num as f64).ceil() as u32
    }

    pub fn initial_view(&self) -> Option<Mat4> {
        self.init_view.as_ref().map(Mat4::from_cols_array)
    }
}

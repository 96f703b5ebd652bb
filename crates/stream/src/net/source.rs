use std::collections::VecDeque;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const FILE_READ_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{url} answered {status}")]
    Status { status: StatusCode, url: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream ended after {received} of {expected} bytes")]
    UnexpectedEnd { received: u64, expected: u64 },
}

/// An ordered, reliable byte stream read in chunks of arbitrary size.
/// `Ok(None)` means the stream is finished.
pub trait ByteSource {
    fn next_chunk(
        &mut self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;
}

pub struct HttpSource {
    response: Response,
}

impl HttpSource {
    pub async fn open(url: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let response = client.get(url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(TransportError::Status {
                status: response.status(),
                url: url.to_string(),
            });
        }

        log::info!(
            "Streaming {} ({} bytes)",
            url,
            response
                .content_length()
                .map_or_else(|| "unknown".to_string(), |len| len.to_string())
        );
        Ok(Self { response })
    }
}

impl ByteSource for HttpSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.response.chunk().await?.map(|bytes| bytes.to_vec()))
    }
}

pub struct FileSource {
    file: File,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let file = File::open(path.as_ref()).await?;
        log::info!("Streaming {}", path.as_ref().display());
        Ok(Self { file })
    }
}

impl ByteSource for FileSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut buf = vec![0; FILE_READ_SIZE];
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

#[derive(Debug, Default)]
pub struct MemorySource {
    chunks: VecDeque<Vec<u8>>,
    fail_at_end: bool,
}

impl MemorySource {
    pub fn new(bytes: &[u8], chunk_size: usize) -> Self {
        Self {
            chunks: bytes.chunks(chunk_size.max(1)).map(<[u8]>::to_vec).collect(),
            fail_at_end: false,
        }
    }

    pub fn from_chunks(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            fail_at_end: false,
        }
    }

    pub fn fail_at_end(mut self) -> Self {
        self.fail_at_end = true;
        self
    }
}

impl ByteSource for MemorySource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if self.fail_at_end => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            ))),
            None => Ok(None),
        }
    }
}

pub enum ModelSource {
    Http(HttpSource),
    File(FileSource),
    Memory(MemorySource),
}

impl ByteSource for ModelSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self {
            ModelSource::Http(source) => source.next_chunk().await,
            ModelSource::File(source) => source.next_chunk().await,
            ModelSource::Memory(source) => source.next_chunk().await,
        }
    }
}

pub async fn open_source(url: &str) -> Result<ModelSource, TransportError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(ModelSource::Http(HttpSource::open(url).await?))
    } else {
        let path = url.strip_prefix("file://").unwrap_or(url);
        Ok(ModelSource::File(FileSource::open(path).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_source_splits_and_ends() {
        let mut source = MemorySource::new(&[1, 2, 3, 4, 5], 2);
        assert_eq!(source.next_chunk().await.unwrap(), Some(vec![1, 2]));
        assert_eq!(source.next_chunk().await.unwrap(), Some(vec![3, 4]));
        assert_eq!(source.next_chunk().await.unwrap(), Some(vec![5]));
        assert_eq!(source.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn failing_source_errors_after_data() {
        let mut source = MemorySource::from_chunks([vec![9]]).fail_at_end();
        assert_eq!(source.next_chunk().await.unwrap(), Some(vec![9]));
        assert!(matches!(
            source.next_chunk().await,
            Err(TransportError::Io(_))
        ));
    }

    #[tokio::test]
    async fn file_source_reads_whole_file() {
        let path = std::env::temp_dir().join(format!("splatstream-{}.bin", std::process::id()));
        let data: Vec<u8> = (0..200_000u32).map(|i| i as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let mut source = open_source(path.to_str().unwrap()).await.unwrap();
        let mut read = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            read.extend_from_slice(&chunk);
        }
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(read, data);
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let result = open_source("/nonexistent/splatstream/model.bin").await;
        assert!(matches!(result, Err(TransportError::Io(_))));
    }
}

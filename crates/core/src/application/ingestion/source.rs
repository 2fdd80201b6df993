// Byte sources handed over by the upload boundary

use crate::error::Result;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Boxed byte stream consumed by the pipeline
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Where the uploaded CSV content lives
#[derive(Debug, Clone)]
pub enum IngestSource {
    /// File on local disk (e.g. an upload spooled to a temp directory)
    Path(PathBuf),
    /// Content already in memory
    Bytes(Vec<u8>),
}

impl IngestSource {
    /// Open the source for streaming reads
    ///
    /// Opening happens inside the ingestion task, so an unreadable file surfaces as a
    /// stream fault on the job rather than an upload error.
    pub async fn open(self) -> Result<ByteStream> {
        match self {
            IngestSource::Path(path) => {
                let file = tokio::fs::File::open(&path).await?;
                Ok(Box::pin(file))
            }
            IngestSource::Bytes(bytes) => Ok(Box::pin(std::io::Cursor::new(bytes))),
        }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            IngestSource::Path(path) => path.display().to_string(),
            IngestSource::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

//! File operations

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
#[cfg(unix)]
use tokio::net::unix::pipe;
use tracing::warn;

use crate::errors::DeployerError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Current length in bytes, zero when the file does not exist yet
    pub async fn len(&self) -> Result<u64, DeployerError> {
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, DeployerError> {
        let mut file = fs::File::open(&self.path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        Ok(contents)
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, DeployerError> {
        let contents = self.read_string().await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }

    /// Read everything appended after `offset`
    ///
    /// Returns the bytes read and the current length of the file. A missing
    /// file reads as empty.
    pub async fn read_from(&self, offset: u64) -> Result<(Vec<u8>, u64), DeployerError> {
        let mut file = match fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata().await?.len();
        if len <= offset {
            return Ok((Vec::new(), len));
        }

        file.seek(SeekFrom::Start(offset)).await?;
        let mut contents = Vec::with_capacity((len - offset) as usize);
        file.read_to_end(&mut contents).await?;
        let end = offset + contents.len() as u64;
        Ok((contents, end))
    }

    /// Check if the path is a named pipe
    #[cfg(unix)]
    pub async fn is_fifo(&self) -> bool {
        use std::os::unix::fs::FileTypeExt;

        fs::metadata(&self.path)
            .await
            .map(|meta| meta.file_type().is_fifo())
            .unwrap_or(false)
    }

    /// Truncate the file and write `contents`
    ///
    /// Named pipes are opened without blocking and fail with an I/O error
    /// when no reader is attached. The handle is released before returning,
    /// whether or not the write succeeded.
    pub async fn overwrite(&self, contents: &str) -> Result<(), DeployerError> {
        #[cfg(unix)]
        {
            if self.is_fifo().await {
                return self.write_pipe(contents).await;
            }
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await?;
        let result = async {
            file.write_all(contents.as_bytes()).await?;
            file.flush().await
        }
        .await;
        drop(file);

        result.map_err(DeployerError::from)
    }

    #[cfg(unix)]
    async fn write_pipe(&self, contents: &str) -> Result<(), DeployerError> {
        let mut pipe = pipe::OpenOptions::new()
            .open_sender(&self.path)
            .map_err(|e| {
                warn!("No reader on pipe {}: {}", self.path.display(), e);
                e
            })?;
        pipe.write_all(contents.as_bytes()).await?;
        Ok(())
    }
}

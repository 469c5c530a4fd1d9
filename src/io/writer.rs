//! PDF writing and saving operations.
//!
//! Output is written atomically: the bytes go to a hidden temp file next to
//! the destination, which is then renamed over it. A failed write never
//! leaves a truncated PDF behind.
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::io::writer::PdfWriter;
//! use std::path::Path;
//!
//! # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let writer = PdfWriter::new();
//! let stats = writer.save(bytes, Path::new("output.pdf")).await?;
//! println!("Wrote {}", stats.format_file_size());
//! # Ok(())
//! # }
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;

use crate::error::{PdfSpliceError, Result};
use crate::utils::format_file_size;

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Writes serialized PDFs to disk.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    buffer_size: usize,
}

impl PdfWriter {
    /// Create a new PDF writer.
    pub fn new() -> Self {
        Self { buffer_size: 8192 }
    }

    /// Write document bytes to `path`, replacing any existing file.
    ///
    /// Overwrite policy is the caller's concern; this only guarantees the
    /// destination is either the old file or the complete new one.
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::FailedToWrite`] if the temp file cannot be
    /// created, written or renamed.
    pub async fn save(&self, bytes: Vec<u8>, path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();
        let buffer_size = self.buffer_size;

        task::spawn_blocking(move || {
            let start = Instant::now();
            let temp_path = temp_path_for(&path_buf);

            let written = write_file(&temp_path, &bytes, buffer_size).and_then(|()| {
                std::fs::rename(&temp_path, &path_buf).map_err(|source| {
                    PdfSpliceError::FailedToWrite {
                        path: path_buf.clone(),
                        source,
                    }
                })
            });
            if written.is_err() {
                let _ = std::fs::remove_file(&temp_path);
            }
            written?;

            let file_size = std::fs::metadata(&path_buf)
                .map(|m| m.len())
                .unwrap_or(bytes.len() as u64);

            Ok::<_, PdfSpliceError>(WriteStatistics {
                write_time: start.elapsed(),
                file_size,
                output_path: path_buf,
            })
        })
        .await
        .map_err(|e| PdfSpliceError::other(format!("Write task failed: {e}")))?
    }

    /// Check if output file exists.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.pdf".to_string());

    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

fn write_file(path: &Path, bytes: &[u8], buffer_size: usize) -> Result<()> {
    let failed = |source| PdfSpliceError::FailedToWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::create(path).map_err(failed)?;
    let mut writer = std::io::BufWriter::with_capacity(buffer_size, file);
    writer.write_all(bytes).map_err(failed)?;
    writer.flush().map_err(failed)?;

    Ok(())
}

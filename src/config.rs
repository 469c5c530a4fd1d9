//! Configuration module for pdfsplice.
//!
//! This module transforms CLI arguments into a validated configuration. It
//! handles:
//! - Validation of argument combinations
//! - Cache backend and TTL selection for the service
//! - Application of defaults

use anyhow::{Result, bail};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::PdfSpliceError;
use crate::cache::{DirectoryStore, DocumentCache};

/// Default per-file upload limit: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Output file overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
    /// Prompt the user before overwriting (default).
    #[default]
    Prompt,
    /// Always overwrite without prompting.
    Force,
    /// Never overwrite, error if file exists.
    NoClobber,
}

/// Where cached uploads live.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheBackend {
    /// In process memory; entries die with the process.
    #[default]
    Memory,
    /// One file per entry under the given directory.
    Directory(PathBuf),
}

/// A time-to-live such as `90`, `90s`, `15m` or `2h`.
///
/// A bare number is read as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ttl(pub Duration);

impl FromStr for Ttl {
    type Err = PdfSpliceError;

    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        let invalid = || {
            PdfSpliceError::invalid_config(format!(
                "Invalid TTL: {s}. Expected seconds or a number with s, m, h or d suffix"
            ))
        };

        let (digits, multiplier) = match s.char_indices().last() {
            Some((idx, 's')) => (&s[..idx], 1),
            Some((idx, 'm')) => (&s[..idx], 60),
            Some((idx, 'h')) => (&s[..idx], 60 * 60),
            Some((idx, 'd')) => (&s[..idx], 24 * 60 * 60),
            Some(_) => (s, 1),
            None => return Err(invalid()),
        };

        let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
        let seconds = value.checked_mul(multiplier).ok_or_else(invalid)?;

        Ok(Self(Duration::from_secs(seconds)))
    }
}

/// Settings of the request service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Cache storage backend.
    pub cache_backend: CacheBackend,

    /// Age after which cached uploads may be evicted. `None` keeps entries
    /// until they are consumed or cleaned up.
    pub cache_ttl: Option<Duration>,

    /// Largest accepted upload, per file, in bytes.
    pub max_upload_bytes: usize,

    /// Reject named uploads without a `.pdf` extension.
    pub require_pdf_extension: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_backend: CacheBackend::Memory,
            cache_ttl: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            require_pdf_extension: true,
        }
    }
}

impl ServiceConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The upload limit is zero
    /// - The TTL is zero
    /// - The cache directory path exists but is not a directory
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            bail!(PdfSpliceError::invalid_config(
                "Maximum upload size must be at least 1 byte"
            ));
        }

        if self.cache_ttl.is_some_and(|ttl| ttl.is_zero()) {
            bail!(PdfSpliceError::invalid_config("Cache TTL must be positive"));
        }

        if let CacheBackend::Directory(dir) = &self.cache_backend
            && dir.exists()
            && !dir.is_dir()
        {
            bail!(PdfSpliceError::invalid_config(format!(
                "Cache directory is not a directory: {}",
                dir.display()
            )));
        }

        Ok(())
    }

    /// Create the cache described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn build_cache(&self) -> crate::Result<DocumentCache> {
        match &self.cache_backend {
            CacheBackend::Memory => Ok(DocumentCache::in_memory()),
            CacheBackend::Directory(dir) => Ok(DocumentCache::new(DirectoryStore::open(dir)?)),
        }
    }
}

/// Complete configuration for a CLI run.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Verbose output mode.
    pub verbose: bool,

    /// Quiet mode - suppress non-error output.
    pub quiet: bool,

    /// File overwrite behavior.
    pub overwrite_mode: OverwriteMode,

    /// Number of parallel jobs (None = auto-detect).
    pub jobs: Option<usize>,

    /// Reject page specs with malformed tokens instead of skipping them.
    pub strict: bool,

    /// Service settings.
    pub service: ServiceConfig,
}

impl Config {
    /// Validate the configuration.
    ///
    /// Checks for logical inconsistencies and invalid combinations.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Verbose and quiet modes are both enabled
    /// - Jobs count is zero
    /// - The service configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.verbose && self.quiet {
            bail!(PdfSpliceError::invalid_config(
                "Cannot use both --verbose and --quiet"
            ));
        }

        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            bail!(PdfSpliceError::invalid_config(
                "Number of jobs must be at least 1"
            ));
        }

        self.service.validate()
    }

    /// Get the effective number of parallel jobs.
    ///
    /// Returns the configured job count, or the number of CPU cores if auto-detect.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

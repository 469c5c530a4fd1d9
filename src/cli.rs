//! CLI argument parsing for pdfsplice.
//!
//! This module defines the command-line interface structure using `clap`.
//! Global flags configure output, overwrite behaviour and the upload cache;
//! each subcommand carries its own inputs.
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::cli::Cli;
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! let config = cli.to_config().expect("Invalid configuration");
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{CacheBackend, Config, OverwriteMode, ServiceConfig, Ttl};
use crate::error::{PdfSpliceError, Result};

/// Merge PDF documents or extract pages from them.
///
/// pdfsplice copies pages between documents without touching their content:
/// `merge` concatenates whole documents, `split` extracts a page selection,
/// `serve` answers the same operations as JSON requests on stdin.
#[derive(Parser, Debug)]
#[command(name = "pdfsplice")]
#[command(version)]
#[command(about = "Merge PDF documents or extract page selections", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output - show details about each step
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    ///
    /// Only errors and warnings will be printed.
    /// Useful for scripts and automation.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Force overwrite of existing output file without confirmation
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Never overwrite existing output file
    ///
    /// If the output file already exists, exit with an error
    /// instead of prompting or overwriting.
    #[arg(long, global = true, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Number of files loaded, or requests served, concurrently
    ///
    /// Default is number of CPU cores.
    #[arg(short, long, global = true, value_name = "N")]
    pub jobs: Option<usize>,

    /// Keep cached uploads as files in this directory instead of memory
    #[arg(long, global = true, env = "PDFSPLICE_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Evict cached uploads older than this (e.g. 900, 15m, 2h)
    ///
    /// Without a TTL, uploads stay cached until split or cleaned up.
    #[arg(long, global = true, env = "PDFSPLICE_CACHE_TTL", value_name = "DURATION")]
    pub cache_ttl: Option<Ttl>,

    /// Largest accepted upload, per file, in MiB
    #[arg(
        long,
        global = true,
        env = "PDFSPLICE_MAX_UPLOAD_MB",
        value_name = "MB",
        default_value_t = 50
    )]
    pub max_upload_mb: usize,

    /// Accept input files whose name does not end in .pdf
    #[arg(long, global = true)]
    pub allow_any_extension: bool,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Concatenate every page of two or more PDFs, in order
    ///
    /// Examples:
    ///   pdfsplice merge a.pdf b.pdf -o both.pdf
    ///   pdfsplice merge 'chapters/*.pdf' -o book.pdf
    Merge {
        /// Input PDF files or glob patterns (in order)
        #[arg(required = true, value_name = "FILE")]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Extract a page selection from one PDF
    ///
    /// Examples:
    ///   pdfsplice split report.pdf --pages 1,3,5-8
    ///   pdfsplice split report.pdf -p 2-4 -o middle.pdf
    Split {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Pages to extract (e.g. "1,3,5-8")
        ///
        /// Malformed tokens are skipped unless --strict is given.
        #[arg(short, long, value_name = "RANGE")]
        pages: String,

        /// Output PDF file path
        ///
        /// Defaults to split_pages_<pages>.pdf next to the input.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Reject the page selection if any token is malformed
        #[arg(long)]
        strict: bool,
    },

    /// Show page count, version and size of PDFs
    Info {
        /// Input PDF files or glob patterns
        #[arg(required = true, value_name = "FILE")]
        inputs: Vec<String>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer JSON requests, one per line, on stdin/stdout
    ///
    /// Request actions: merge, analyze, split, cleanup.
    Serve,
}

impl Cli {
    /// Convert CLI arguments into a validated Config.
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::InvalidConfig`] if:
    /// - The upload limit overflows or is zero
    /// - Configuration validation fails
    pub fn to_config(&self) -> Result<Config> {
        let overwrite_mode = if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        };

        let max_upload_bytes = self
            .max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| {
                PdfSpliceError::invalid_config(format!(
                    "Upload limit too large: {} MB",
                    self.max_upload_mb
                ))
            })?;

        let cache_backend = match &self.cache_dir {
            Some(dir) => CacheBackend::Directory(dir.clone()),
            None => CacheBackend::Memory,
        };

        let strict = matches!(self.command, Command::Split { strict: true, .. });

        let config = Config {
            verbose: self.verbose,
            quiet: self.quiet,
            overwrite_mode,
            jobs: self.jobs,
            strict,
            service: ServiceConfig {
                cache_backend,
                cache_ttl: self.cache_ttl.map(|ttl| ttl.0),
                max_upload_bytes,
                require_pdf_extension: !self.allow_any_extension,
            },
        };

        config.validate().map_err(|err| match err.downcast::<PdfSpliceError>() {
            Ok(err) => err,
            Err(err) => PdfSpliceError::invalid_config(err.to_string()),
        })?;

        Ok(config)
    }
}

//! pdfsplice - merge PDF documents or extract page selections.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use pdfsplice::cli::{Cli, Command};
use pdfsplice::config::{Config, OverwriteMode};
use pdfsplice::error::PdfSpliceError;
use pdfsplice::io::{PdfReader, PdfWriter, SourceDocument};
use pdfsplice::merge::PageSource;
use pdfsplice::output::{
    DocumentSummary, OutputFormatter, display_document_summaries, display_write_statistics,
};
use pdfsplice::pages::PageSet;
use pdfsplice::protocol::{RequestHandler, split_filename};
use pdfsplice::service::{PageRequest, PdfService};
use pdfsplice::utils::collect_paths_for_patterns;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Log to stderr; stdout carries documents and protocol responses.
fn init_tracing(cli: &Cli) {
    let default_directive = if cli.verbose {
        "pdfsplice=debug"
    } else if matches!(cli.command, Command::Serve) {
        "pdfsplice=info"
    } else {
        "pdfsplice=warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Main application logic.
async fn run(cli: Cli) -> Result<(), PdfSpliceError> {
    let config = cli.to_config()?;

    match cli.command {
        Command::Merge { inputs, output } => run_merge(&config, &inputs, output).await,
        Command::Split {
            input,
            pages,
            output,
            ..
        } => run_split(&config, input, &pages, output).await,
        Command::Info { inputs, json } => run_info(&config, &inputs, json).await,
        Command::Serve => run_serve(&config).await,
    }
}

async fn run_merge(
    config: &Config,
    inputs: &[String],
    output: PathBuf,
) -> Result<(), PdfSpliceError> {
    let formatter = OutputFormatter::from_config(config);

    let paths = collect_paths_for_patterns(inputs)?;
    if paths.iter().any(|path| path == &output) {
        return Err(PdfSpliceError::invalid_config(format!(
            "Output file cannot be the same as an input file: {}",
            output.display()
        )));
    }
    if paths.len() < 2 {
        return Err(PdfSpliceError::InvalidInputCount { count: paths.len() });
    }

    handle_output_overwrite(config, &output, &formatter).await?;

    formatter.info(&format!("Merging {} PDF files...", paths.len()));
    for (idx, path) in paths.iter().enumerate() {
        formatter.debug(&format!("{}. {}", idx + 1, path.display()));
    }

    let uploads = PdfReader::new()
        .read_all(&paths, config.effective_jobs())
        .await?;

    let service = PdfService::new(config.service.clone())?;
    let merged = tokio::task::spawn_blocking(move || service.merge(uploads))
        .await
        .map_err(|err| PdfSpliceError::other(format!("Merge task failed: {err}")))??;

    let page_count = merged.page_count;
    let stats = PdfWriter::new().save(merged.bytes, &output).await?;
    display_write_statistics(&formatter, page_count, &stats);

    Ok(())
}

async fn run_split(
    config: &Config,
    input: PathBuf,
    pages: &str,
    output: Option<PathBuf>,
) -> Result<(), PdfSpliceError> {
    let formatter = OutputFormatter::from_config(config);

    if config.strict {
        PageSet::check_strict(pages)?;
    }
    if let Some(output) = &output {
        check_split_output(&input, output)?;
        handle_output_overwrite(config, output, &formatter).await?;
    }

    let upload = PdfReader::new().read(&input).await?;

    let service = PdfService::new(config.service.clone())?;
    let request = PageRequest::spec(pages);
    let extraction = tokio::task::spawn_blocking(move || {
        let analysis = service.analyze(upload)?;
        tracing::debug!("cached {} page(s) as {}", analysis.page_count, analysis.key);
        service.split(analysis.key.as_str(), request)
    })
    .await
    .map_err(|err| PdfSpliceError::other(format!("Split task failed: {err}")))??;
    formatter.debug(&format!("Selected pages: {}", extraction.pages));

    // The default name depends on the pages actually selected.
    let output = match output {
        Some(output) => output,
        None => {
            let output = default_split_output(&input, &extraction.pages);
            check_split_output(&input, &output)?;
            handle_output_overwrite(config, &output, &formatter).await?;
            output
        }
    };

    let page_count = extraction.document.page_count;
    let stats = PdfWriter::new()
        .save(extraction.document.bytes, &output)
        .await?;
    display_write_statistics(&formatter, page_count, &stats);

    Ok(())
}

fn check_split_output(input: &Path, output: &Path) -> Result<(), PdfSpliceError> {
    if output == input {
        return Err(PdfSpliceError::invalid_config(format!(
            "Output file cannot be the same as the input file: {}",
            output.display()
        )));
    }
    Ok(())
}

fn default_split_output(input: &Path, pages: &PageSet) -> PathBuf {
    input.with_file_name(split_filename(pages))
}

async fn run_info(config: &Config, inputs: &[String], json: bool) -> Result<(), PdfSpliceError> {
    let formatter = OutputFormatter::from_config(config);

    let paths = collect_paths_for_patterns(inputs)?;
    let uploads = PdfReader::new()
        .read_all(&paths, config.effective_jobs())
        .await?;

    let summaries = tokio::task::spawn_blocking(move || {
        paths
            .into_iter()
            .zip(uploads)
            .enumerate()
            .map(|(position, (path, upload))| {
                let file_size = upload.bytes.len() as u64;
                let source = SourceDocument::from_upload(upload, position)?;
                Ok(DocumentSummary {
                    path,
                    page_count: source.page_count(),
                    version: source.version().to_string(),
                    file_size,
                })
            })
            .collect::<Result<Vec<_>, PdfSpliceError>>()
    })
    .await
    .map_err(|err| PdfSpliceError::other(format!("Info task failed: {err}")))??;

    if json {
        let encoded = serde_json::to_string_pretty(&summaries)
            .map_err(|err| PdfSpliceError::other(format!("Failed to encode summary: {err}")))?;
        println!("{encoded}");
    } else {
        display_document_summaries(&formatter, &summaries);
    }

    Ok(())
}

async fn run_serve(config: &Config) -> Result<(), PdfSpliceError> {
    let service = Arc::new(PdfService::new(config.service.clone())?);
    let handler = RequestHandler::new(Arc::clone(&service));

    tracing::info!(
        "{} v{} serving JSON requests on stdio ({} worker(s))",
        pdfsplice::NAME,
        pdfsplice::VERSION,
        config.effective_jobs()
    );

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let summary =
        pdfsplice::serve::serve(handler, input, tokio::io::stdout(), config.effective_jobs())
            .await?;

    let dropped = service.shutdown()?;
    tracing::info!(
        "input closed after {} request(s), {} failed, {} cached upload(s) dropped",
        summary.requests,
        summary.failures,
        dropped
    );

    Ok(())
}

/// Handle output file overwrite scenarios.
async fn handle_output_overwrite(
    config: &Config,
    output: &Path,
    formatter: &OutputFormatter,
) -> Result<(), PdfSpliceError> {
    if !PdfWriter::new().exists(output).await {
        return Ok(());
    }

    match config.overwrite_mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(PdfSpliceError::output_exists(output.to_path_buf())),
        OverwriteMode::Prompt => {
            // Nobody to ask in quiet mode.
            if formatter.is_quiet() {
                return Err(PdfSpliceError::output_exists(output.to_path_buf()));
            }

            formatter.warning(&format!("Output file already exists: {}", output.display()));

            use std::io::{self, Write};
            print!("Overwrite? [y/N]: ");
            io::stdout().flush().ok();

            let mut response = String::new();
            io::stdin()
                .read_line(&mut response)
                .map_err(|err| PdfSpliceError::other(format!("Failed to read input: {err}")))?;

            let response = response.trim().to_lowercase();
            if response == "y" || response == "yes" {
                Ok(())
            } else {
                Err(PdfSpliceError::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn config(overwrite_mode: OverwriteMode) -> Config {
        Config {
            overwrite_mode,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_handle_output_overwrite_force() {
        let existing = NamedTempFile::new().unwrap();
        let result = handle_output_overwrite(
            &config(OverwriteMode::Force),
            existing.path(),
            &OutputFormatter::quiet(),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_handle_output_overwrite_no_clobber() {
        let existing = NamedTempFile::new().unwrap();
        let result = handle_output_overwrite(
            &config(OverwriteMode::NoClobber),
            existing.path(),
            &OutputFormatter::quiet(),
        )
        .await;
        assert!(matches!(result, Err(PdfSpliceError::OutputExists { .. })));
    }

    #[tokio::test]
    async fn test_handle_output_overwrite_prompt_when_quiet() {
        let existing = NamedTempFile::new().unwrap();
        let result = handle_output_overwrite(
            &config(OverwriteMode::Prompt),
            existing.path(),
            &OutputFormatter::quiet(),
        )
        .await;
        assert!(matches!(result, Err(PdfSpliceError::OutputExists { .. })));
    }

    #[tokio::test]
    async fn test_handle_output_overwrite_nonexistent() {
        let dir = tempfile::tempdir().unwrap();
        let result = handle_output_overwrite(
            &config(OverwriteMode::NoClobber),
            &dir.path().join("new.pdf"),
            &OutputFormatter::quiet(),
        )
        .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_split_output_must_differ_from_input() {
        let input = Path::new("docs/report.pdf");
        assert!(check_split_output(input, Path::new("docs/out.pdf")).is_ok());
        assert!(matches!(
            check_split_output(input, input),
            Err(PdfSpliceError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_default_split_output() {
        let pages = PageSet::parse("3,1");
        assert_eq!(
            default_split_output(Path::new("docs/report.pdf"), &pages),
            PathBuf::from("docs/split_pages_1_3.pdf")
        );
    }
}

//! JSON-lines request loop.
//!
//! Reads one JSON request per line, executes up to `concurrency` requests at
//! a time on blocking threads and writes one JSON response per line, in
//! request order. Blank lines are ignored. When the service has a cache TTL,
//! a background task evicts expired uploads while the loop runs.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{PdfSpliceError, Result};
use crate::protocol::{RequestHandler, Response};
use crate::service::PdfService;

/// Counters reported when the input ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    /// Requests answered.
    pub requests: usize,
    /// Requests answered with an error status.
    pub failures: usize,
}

impl ServeSummary {
    fn record(&mut self, response: &Response) {
        self.requests += 1;
        if !response.is_success() {
            self.failures += 1;
        }
    }
}

/// Serve requests from `input` until it ends.
///
/// # Errors
///
/// Returns an error if reading the input or writing a response fails.
/// Request failures are answered, not returned.
pub async fn serve<R, W>(
    handler: RequestHandler,
    input: R,
    mut output: W,
    concurrency: usize,
) -> Result<ServeSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let sweeper = handler
        .service()
        .config()
        .cache_ttl
        .map(|ttl| spawn_sweeper(Arc::clone(handler.service()), ttl));

    let lines = stream::unfold(Some(input.lines()), |state| async move {
        let mut lines = state?;
        match lines.next_line().await {
            Ok(Some(line)) => Some((Ok(line), Some(lines))),
            Ok(None) => None,
            Err(err) => Some((Err(err), None)),
        }
    });

    let responses = lines
        .filter(|line| futures::future::ready(!matches!(line, Ok(line) if line.trim().is_empty())))
        .map(|line| {
            let handler = handler.clone();
            async move {
                let line = line?;
                Ok::<_, std::io::Error>(execute(handler, line).await)
            }
        })
        .buffered(concurrency.max(1));
    let mut responses = std::pin::pin!(responses);

    let mut summary = ServeSummary::default();
    let outcome = async {
        while let Some(response) = responses.next().await {
            let response = response?;
            summary.record(&response);

            let mut encoded = serde_json::to_vec(&response)
                .map_err(|err| PdfSpliceError::other(format!("Failed to encode response: {err}")))?;
            encoded.push(b'\n');
            output.write_all(&encoded).await?;
            output.flush().await?;
        }
        Ok::<_, PdfSpliceError>(())
    }
    .await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    outcome.map(|()| summary)
}

async fn execute(handler: RequestHandler, line: String) -> Response {
    tokio::task::spawn_blocking(move || handler.handle_json(&line))
        .await
        .unwrap_or_else(|err| {
            tracing::error!("request task failed: {err}");
            Response::error(&PdfSpliceError::other(format!("Request task failed: {err}")))
        })
}

/// How often the sweeper runs for a given TTL.
fn sweep_period(ttl: Duration) -> Duration {
    (ttl / 2).clamp(Duration::from_secs(1), Duration::from_secs(60))
}

fn spawn_sweeper(service: Arc<PdfService>, ttl: Duration) -> JoinHandle<()> {
    let period = sweep_period(ttl);
    tracing::debug!("evicting uploads older than {ttl:?} every {period:?}");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let service = Arc::clone(&service);
            match tokio::task::spawn_blocking(move || service.evict_expired()).await {
                Ok(Ok(0)) => {}
                Ok(Ok(evicted)) => tracing::info!("evicted {evicted} expired upload(s)"),
                Ok(Err(err)) => tracing::warn!("cache eviction failed: {err}"),
                Err(err) => tracing::warn!("cache eviction task failed: {err}"),
            }
        }
    })
}

//! # Transport Retry
//!
//! Wraps a provider's stream factory with exponential backoff retry.
//!
//! **Key constraint**: retries happen only while nothing has been yielded.
//! Once the first delta reaches the caller the stream cannot be restarted
//! (the viewer has already rendered text), so later failures pass through.
//!
//! This is transport-level recovery and entirely separate from the engine's
//! validation-driven refinement loop: it re-dials the same call, it never
//! rewrites the prompt.

use std::future::Future;
use std::pin::Pin;

use rand::Rng;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use mosaic_core::retry::{RetryConfig, calculate_backoff_delay};

use crate::provider::{ProviderError, TextDeltaStream};

/// Type alias for the stream factory function.
///
/// Called on each attempt to open a fresh stream.
pub type StreamFactory = Box<
    dyn Fn() -> Pin<Box<dyn Future<Output = Result<TextDeltaStream, ProviderError>> + Send>>
        + Send,
>;

/// Wrap a stream factory with transport retry.
///
/// Returns a stream that transparently retries failed dials with backoff
/// and jitter (honoring `Retry-After` when the backend sends one). Errors
/// after the first yielded delta, and non-retryable errors, pass through.
pub fn with_transport_retry(factory: StreamFactory, config: RetryConfig) -> TextDeltaStream {
    Box::pin(async_stream::stream! {
        let mut attempt = 0u32;
        let mut has_yielded = false;

        loop {
            match factory().await {
                Ok(inner) => {
                    let mut inner = std::pin::pin!(inner);
                    while let Some(item) = inner.next().await {
                        has_yielded = true;
                        yield item;
                    }
                    break;
                }
                Err(err) => {
                    if has_yielded || !err.is_retryable() || attempt >= config.max_retries {
                        yield Err(err);
                        break;
                    }

                    let random: f64 = rand::rng().random();
                    let backoff_ms = calculate_backoff_delay(
                        attempt,
                        config.base_delay_ms,
                        config.max_delay_ms,
                        config.jitter_factor,
                        random,
                    );
                    // Honor Retry-After when it asks for more than backoff would wait
                    let delay_ms = err.retry_after_ms().map_or(backoff_ms, |ra| backoff_ms.max(ra));

                    attempt += 1;
                    metrics::counter!(
                        "provider_transport_retries_total",
                        "category" => err.category().to_string()
                    )
                    .increment(1);
                    warn!(
                        attempt,
                        max_retries = config.max_retries,
                        delay_ms,
                        category = err.category(),
                        error = %err,
                        "transport error, retrying"
                    );

                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    info!(attempt, "retrying provider stream");
                }
            }
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

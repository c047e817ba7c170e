//! # Chunk buffering and flush policies
//!
//! Decouples raw delta granularity from emission granularity. Token-level
//! backends produce far more writes than a viewer needs; batching them
//! behind a policy bounds overhead without stalling progressive display.
//!
//! Three policies:
//! - [`FlushPolicy::SizeThreshold`] — emit once the buffer exceeds a length
//! - [`FlushPolicy::TimeThreshold`] — emit at most once per interval
//! - [`FlushPolicy::PassThrough`] — emit every delta immediately
//!
//! Invariant, for any policy: concatenating all emissions equals
//! concatenating all raw deltas (no loss, no duplication), and the final
//! flush at end-of-stream is unconditional.

use std::time::Duration;

use futures::Stream;
use tokio::time::Instant;
use tokio_stream::StreamExt;

use crate::provider::ProviderError;

/// When buffered deltas are emitted downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Emit once the buffered length exceeds this many bytes.
    SizeThreshold(usize),
    /// Emit when non-empty and at least this long since the last flush.
    TimeThreshold(Duration),
    /// Emit every delta as-is (source is already coarse-grained).
    PassThrough,
}

/// Reference size threshold (bytes) for chatty backends.
pub const DEFAULT_SIZE_THRESHOLD: usize = 100;
/// Reference flush interval for token-granular backends.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Accumulates deltas and decides when to emit, per policy.
///
/// Pure state machine over (`push`, `finish`); the time-threshold policy
/// takes its clock from the caller so tests can drive it deterministically.
#[derive(Debug)]
pub struct ChunkBuffer {
    policy: FlushPolicy,
    buffer: String,
    last_flush: Instant,
}

impl ChunkBuffer {
    /// Create an empty buffer with the given policy.
    #[must_use]
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            buffer: String::new(),
            last_flush: Instant::now(),
        }
    }

    /// Append a delta; returns an emission if the policy fired.
    pub fn push(&mut self, delta: &str, now: Instant) -> Option<String> {
        self.buffer.push_str(delta);
        match self.policy {
            FlushPolicy::PassThrough => self.take(now),
            FlushPolicy::SizeThreshold(threshold) => {
                (self.buffer.len() > threshold).then(|| self.take(now)).flatten()
            }
            FlushPolicy::TimeThreshold(interval) => {
                (!self.buffer.is_empty() && now.duration_since(self.last_flush) >= interval)
                    .then(|| self.take(now))
                    .flatten()
            }
        }
    }

    /// Unconditionally drain whatever remains. Must be called at
    /// end-of-stream regardless of policy.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    fn take(&mut self, now: Instant) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        self.last_flush = now;
        Some(std::mem::take(&mut self.buffer))
    }
}

/// Apply a flush policy to a raw delta stream.
///
/// Emissions preserve arrival order. On a mid-stream error the buffered
/// remainder is flushed first, then the error is surfaced and the stream
/// ends — accumulated text stays valid for the caller to keep or discard.
pub fn flushed<S>(
    deltas: S,
    policy: FlushPolicy,
) -> impl Stream<Item = Result<String, ProviderError>> + Send
where
    S: Stream<Item = Result<String, ProviderError>> + Send + Unpin + 'static,
{
    async_stream::stream! {
        let mut buffer = ChunkBuffer::new(policy);
        let mut deltas = deltas;

        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) => {
                    if let Some(out) = buffer.push(&delta, Instant::now()) {
                        yield Ok(out);
                    }
                }
                Err(e) => {
                    if let Some(out) = buffer.finish() {
                        yield Ok(out);
                    }
                    yield Err(e);
                    return;
                }
            }
        }

        if let Some(out) = buffer.finish() {
            yield Ok(out);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ok_stream(
        deltas: Vec<&str>,
    ) -> impl Stream<Item = Result<String, ProviderError>> + Unpin + use<> {
        futures::stream::iter(
            deltas
                .into_iter()
                .map(|d| Ok(d.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect_ok(
        stream: impl Stream<Item = Result<String, ProviderError>> + Send,
    ) -> Vec<String> {
        let mut out = Vec::new();
        let mut stream = std::pin::pin!(stream);
        while let Some(item) = stream.next().await {
            out.push(item.expect("no errors expected"));
        }
        out
    }

    // ── ChunkBuffer: size threshold ──────────────────────────────────────

    #[test]
    fn size_holds_until_threshold_exceeded() {
        let mut buf = ChunkBuffer::new(FlushPolicy::SizeThreshold(10));
        let now = Instant::now();
        assert_eq!(buf.push("12345", now), None);
        assert_eq!(buf.push("67890", now), None); // exactly 10, not over
        assert_eq!(buf.push("x", now), Some("1234567890x".into()));
    }

    #[test]
    fn size_final_flush_unconditional() {
        let mut buf = ChunkBuffer::new(FlushPolicy::SizeThreshold(100));
        let _ = buf.push("short", Instant::now());
        assert_eq!(buf.finish(), Some("short".into()));
        assert_eq!(buf.finish(), None);
    }

    // ── ChunkBuffer: pass-through ────────────────────────────────────────

    #[test]
    fn pass_through_emits_every_delta() {
        let mut buf = ChunkBuffer::new(FlushPolicy::PassThrough);
        let now = Instant::now();
        assert_eq!(buf.push("a", now), Some("a".into()));
        assert_eq!(buf.push("b", now), Some("b".into()));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn pass_through_skips_empty_delta() {
        let mut buf = ChunkBuffer::new(FlushPolicy::PassThrough);
        assert_eq!(buf.push("", Instant::now()), None);
    }

    // ── ChunkBuffer: time threshold ──────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn time_holds_within_interval() {
        let mut buf = ChunkBuffer::new(FlushPolicy::TimeThreshold(Duration::from_millis(100)));
        assert_eq!(buf.push("a", Instant::now()), None);

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(buf.push("b", Instant::now()), None);

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(buf.push("c", Instant::now()), Some("abc".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn time_interval_resets_after_flush() {
        let mut buf = ChunkBuffer::new(FlushPolicy::TimeThreshold(Duration::from_millis(100)));

        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(buf.push("a", Instant::now()), Some("a".into()));

        // Interval restarts from the flush
        assert_eq!(buf.push("b", Instant::now()), None);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(buf.push("c", Instant::now()), Some("bc".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn time_final_flush_unconditional() {
        let mut buf = ChunkBuffer::new(FlushPolicy::TimeThreshold(Duration::from_millis(100)));
        let _ = buf.push("tail", Instant::now());
        assert_eq!(buf.finish(), Some("tail".into()));
    }

    // ── flushed stream combinator ────────────────────────────────────────

    #[tokio::test]
    async fn flushed_pass_through_preserves_deltas() {
        let out = collect_ok(flushed(
            ok_stream(vec!["a", "b", "c"]),
            FlushPolicy::PassThrough,
        ))
        .await;
        assert_eq!(out, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn flushed_size_batches_small_deltas() {
        let out = collect_ok(flushed(
            ok_stream(vec!["aaaa", "bbbb", "cc"]),
            FlushPolicy::SizeThreshold(5),
        ))
        .await;
        assert_eq!(out, vec!["aaaabbbb", "cc"]);
    }

    #[tokio::test]
    async fn flushed_final_emission_even_below_threshold() {
        let out = collect_ok(flushed(
            ok_stream(vec!["hi"]),
            FlushPolicy::SizeThreshold(1000),
        ))
        .await;
        assert_eq!(out, vec!["hi"]);
    }

    #[tokio::test]
    async fn flushed_error_after_flushing_remainder() {
        let items: Vec<Result<String, ProviderError>> = vec![
            Ok("partial".into()),
            Err(ProviderError::Other {
                message: "mid-stream drop".into(),
            }),
        ];
        let stream = flushed(
            futures::stream::iter(items),
            FlushPolicy::SizeThreshold(1000),
        );
        let mut stream = std::pin::pin!(stream);

        let first = stream.next().await.unwrap();
        assert_eq!(first.unwrap(), "partial");
        let second = stream.next().await.unwrap();
        assert!(second.is_err());
        assert!(stream.next().await.is_none());
    }

    // ── reconstruction property ──────────────────────────────────────────

    proptest! {
        #[test]
        fn concatenation_preserved_under_any_size_policy(
            deltas in proptest::collection::vec(".*", 0..20),
            threshold in 1usize..200,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let expected: String = deltas.concat();
            let refs: Vec<&str> = deltas.iter().map(String::as_str).collect();
            let out = rt.block_on(collect_ok(flushed(
                ok_stream(refs),
                FlushPolicy::SizeThreshold(threshold),
            )));
            prop_assert_eq!(out.concat(), expected);
        }

        #[test]
        fn concatenation_preserved_under_pass_through(
            deltas in proptest::collection::vec(".*", 0..20),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let expected: String = deltas.concat();
            let refs: Vec<&str> = deltas.iter().map(String::as_str).collect();
            let out = rt.block_on(collect_ok(flushed(
                ok_stream(refs),
                FlushPolicy::PassThrough,
            )));
            prop_assert_eq!(out.concat(), expected);
        }
    }
}

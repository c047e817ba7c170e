//! # Refinement Orchestrator
//!
//! The state machine tying the pipeline together:
//!
//! ```text
//! Idle → Streaming → Validating → { Accepted | Retrying → Streaming | Exhausted }
//! ```
//!
//! One user-triggered cycle makes up to three generation attempts (the
//! initial call plus two automatic retries). Every attempt streams through
//! the provider's flush policy to the caller for progressive display while
//! the full raw text accumulates; on stream end the accumulated text is
//! normalized and validated. Invalid artifacts re-prompt the same backend
//! with synthesized error context at a lowered temperature, after a short
//! fixed delay. Acceptance persists the artifact and merges token
//! analytics; exhaustion surfaces a remediation message and leaves the
//! engine ready for a fresh cycle.
//!
//! Exactly one generation is in flight per orchestrator (`&mut self`); a
//! caller wanting concurrent lineages runs one orchestrator each.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;
use tracing::{info, instrument, warn};

use mosaic_core::ids::ArtifactId;
use mosaic_core::messages::{GenerationSettings, Message};
use mosaic_core::retry::RetryConfig;
use mosaic_llm::flush::{FlushPolicy, flushed};
use mosaic_llm::provider::{ProviderError, ProviderFactory};
use mosaic_llm::retry::{StreamFactory, with_transport_retry};
use mosaic_settings::EngineSettings;

use crate::analytics::{AnalyticsSession, CumulativeTokenAnalytics, TokenAnalytics};
use crate::normalize::{clean_fragment, normalize};
use crate::prompts::{
    EXHAUSTION_REMEDIATION, component_system_prompt, contextual_refinement_prompt,
    retry_fix_request,
};
use crate::store::{ArtifactRecord, ArtifactStore, StoreError};
use crate::validate::{ValidationError, validate};

// ─────────────────────────────────────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────────────────────────────────────

/// Orchestrator state, advanced only by [`Orchestrator::run_cycle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    /// No cycle running.
    Idle,
    /// Consuming a provider stream.
    Streaming,
    /// Normalizing and validating the accumulated text.
    Validating,
    /// Waiting out the inter-attempt delay before re-streaming.
    Retrying,
    /// Terminal: artifact accepted and persisted.
    Accepted,
    /// Terminal: retry bound hit without a valid artifact.
    Exhausted,
}

/// Progress events forwarded to the caller during a cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// A generation attempt is opening its stream.
    AttemptStarted {
        /// 0-based attempt index within the cycle.
        attempt: u32,
        /// Temperature used for this attempt.
        temperature: f64,
    },
    /// A flushed, display-cleaned text fragment.
    CodeDelta {
        /// Fragment for progressive rendering.
        text: String,
    },
    /// An attempt's artifact failed validation.
    AttemptInvalid {
        /// The failing attempt's index.
        attempt: u32,
        /// Why it failed.
        error: ValidationError,
    },
    /// The cycle accepted an artifact.
    Accepted {
        /// Lineage id the artifact was persisted under.
        artifact_id: ArtifactId,
    },
    /// The cycle exhausted its retries.
    Exhausted {
        /// User-facing remediation message.
        remediation: String,
    },
}

/// Terminal failure of a cycle.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown model or disabled provider — rejected before any stream.
    #[error("request rejected: {0}")]
    RequestRejected(#[source] ProviderError),
    /// The backend call failed.
    #[error("transport failure: {0}")]
    Transport(#[source] ProviderError),
    /// Persisting the accepted artifact failed.
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    pub(crate) fn from_provider(err: ProviderError) -> Self {
        match err {
            ProviderError::UnknownModel { .. } | ProviderError::Disabled { .. } => {
                Self::RequestRejected(err)
            }
            other => Self::Transport(other),
        }
    }
}

/// An accepted artifact plus its accounting.
#[derive(Clone, Debug)]
pub struct AcceptedArtifact {
    /// Lineage id.
    pub artifact_id: ArtifactId,
    /// Final normalized artifact text.
    pub code: String,
    /// Per-call analytics (absent when estimation failed; non-fatal).
    pub analytics: Option<TokenAnalytics>,
    /// Lineage-cumulative analytics.
    pub cumulative: Option<CumulativeTokenAnalytics>,
}

/// How a cycle ended, short of a hard error.
#[derive(Clone, Debug)]
pub enum CycleOutcome {
    /// A structurally valid artifact was accepted.
    Accepted(AcceptedArtifact),
    /// All attempts failed validation.
    Exhausted {
        /// User-facing remediation message.
        remediation: String,
        /// The final attempt's validation error.
        last_error: ValidationError,
        /// The final attempt's (invalid) normalized text.
        partial_code: String,
    },
}

/// A chat-driven refinement request against an accepted artifact.
#[derive(Clone, Debug)]
pub struct RefinementRequest {
    /// Model to drive.
    pub model: String,
    /// The user's chat message.
    pub user_message: String,
    /// Last accepted artifact text.
    pub current_code: String,
    /// The original generation intent.
    pub original_prompt: String,
    /// Last known runtime/compile error, if the user is fixing one.
    pub last_error: Option<String>,
}

/// Temperature schedule: `max(0.1, base − 0.1·attempt)`.
#[must_use]
pub fn temperature_for_attempt(base: f64, attempt: u32) -> f64 {
    (base - 0.1 * f64::from(attempt)).max(0.1)
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

/// What kind of cycle is running; decides prompt construction per attempt.
enum CycleKind {
    Generate { prompt: String },
    Refine(RefinementRequest),
}

impl CycleKind {
    /// Text counted as the prompt side in analytics.
    fn analytics_prompt(&self) -> &str {
        match self {
            Self::Generate { prompt } => prompt,
            Self::Refine(req) => &req.user_message,
        }
    }

    /// The original intent embedded in retry prompts.
    fn original_prompt(&self) -> &str {
        match self {
            Self::Generate { prompt } => prompt,
            Self::Refine(req) => &req.original_prompt,
        }
    }

    /// Messages for one attempt. Retries (attempt > 0) re-prompt with the
    /// synthesized error context and the previous attempt's artifact.
    fn messages_for_attempt(
        &self,
        attempt: u32,
        last_invalid: Option<(&ValidationError, &str)>,
    ) -> Vec<Message> {
        if let Some((error, last_code)) = last_invalid {
            debug_assert!(attempt > 0);
            let error_text = error.to_string();
            return vec![Message::user(contextual_refinement_prompt(
                &retry_fix_request(&error_text),
                last_code,
                self.original_prompt(),
                Some(&error_text),
            ))];
        }

        match self {
            Self::Generate { prompt } => vec![
                Message::system(component_system_prompt()),
                Message::user(prompt.clone()),
            ],
            Self::Refine(req) => vec![Message::user(contextual_refinement_prompt(
                &req.user_message,
                &req.current_code,
                &req.original_prompt,
                req.last_error.as_deref(),
            ))],
        }
    }
}

/// The refinement engine.
///
/// Owns the in-flight accumulation buffer and the analytics session for one
/// artifact lineage at a time.
pub struct Orchestrator {
    factory: Arc<dyn ProviderFactory>,
    store: Arc<dyn ArtifactStore>,
    settings: EngineSettings,
    transport_retry: RetryConfig,
    analytics: AnalyticsSession,
    state: CycleState,
    lineage: Option<ArtifactId>,
}

impl Orchestrator {
    /// Build an orchestrator over a provider factory and a store.
    #[must_use]
    pub fn new(
        factory: Arc<dyn ProviderFactory>,
        store: Arc<dyn ArtifactStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            factory,
            store,
            settings,
            transport_retry: RetryConfig::default(),
            analytics: AnalyticsSession::new(),
            state: CycleState::Idle,
            lineage: None,
        }
    }

    /// Override the transport retry parameters (dial retries with backoff,
    /// distinct from the validation-driven refinement loop).
    #[must_use]
    pub fn with_transport_retry_config(mut self, config: RetryConfig) -> Self {
        self.transport_retry = config;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// The active lineage id, once a generation has started.
    #[must_use]
    pub fn lineage(&self) -> Option<&ArtifactId> {
        self.lineage.as_ref()
    }

    /// Run a brand-new generation cycle.
    ///
    /// Starts a fresh lineage: the analytics session resets and a new
    /// artifact id is minted.
    #[instrument(skip_all, fields(model = %model))]
    pub async fn generate(
        &mut self,
        model: &str,
        prompt: &str,
        settings: &GenerationSettings,
        on_event: &mut (impl FnMut(EngineEvent) + Send),
    ) -> Result<CycleOutcome, EngineError> {
        self.analytics.reset();
        self.lineage = Some(ArtifactId::new());
        let kind = CycleKind::Generate {
            prompt: prompt.to_owned(),
        };
        self.run_cycle(model, settings, &kind, on_event).await
    }

    /// Run a chat-driven refinement cycle against the current lineage.
    ///
    /// The analytics session keeps accumulating; a lineage is minted only
    /// if none exists yet (refinement of an artifact restored from
    /// persistence).
    #[instrument(skip_all, fields(model = %request.model))]
    pub async fn refine(
        &mut self,
        request: RefinementRequest,
        settings: &GenerationSettings,
        on_event: &mut (impl FnMut(EngineEvent) + Send),
    ) -> Result<CycleOutcome, EngineError> {
        if self.lineage.is_none() {
            self.lineage = Some(ArtifactId::new());
        }
        let model = request.model.clone();
        let kind = CycleKind::Refine(request);
        self.run_cycle(&model, settings, &kind, on_event).await
    }

    /// Drive one full cycle: submit → stream → validate → retry/accept.
    async fn run_cycle(
        &mut self,
        model: &str,
        base_settings: &GenerationSettings,
        kind: &CycleKind,
        on_event: &mut (impl FnMut(EngineEvent) + Send),
    ) -> Result<CycleOutcome, EngineError> {
        let max_retries = self.settings.max_validation_retries;
        let mut attempt: u32 = 0;
        let mut last_invalid: Option<(ValidationError, String)> = None;

        loop {
            let temperature = temperature_for_attempt(base_settings.temperature, attempt);
            let settings = base_settings.with_temperature(temperature);
            let messages = kind.messages_for_attempt(
                attempt,
                last_invalid.as_ref().map(|(e, c)| (e, c.as_str())),
            );

            self.state = CycleState::Streaming;
            on_event(EngineEvent::AttemptStarted {
                attempt,
                temperature,
            });

            let raw = match self
                .stream_attempt(model, &messages, &settings, &mut *on_event)
                .await
            {
                Ok(raw) => raw,
                Err(err) => {
                    self.state = CycleState::Idle;
                    return Err(err);
                }
            };

            self.state = CycleState::Validating;
            let code = normalize(&raw);

            match validate(&code) {
                Ok(()) => {
                    let accepted = self.accept(model, kind, code).await?;
                    self.state = CycleState::Accepted;
                    on_event(EngineEvent::Accepted {
                        artifact_id: accepted.artifact_id.clone(),
                    });
                    metrics::counter!("engine_cycles_total", "outcome" => "accepted").increment(1);
                    return Ok(CycleOutcome::Accepted(accepted));
                }
                Err(error) => {
                    metrics::counter!(
                        "engine_validation_failures_total",
                        "kind" => error.kind()
                    )
                    .increment(1);
                    warn!(attempt, kind = error.kind(), "artifact failed validation");
                    on_event(EngineEvent::AttemptInvalid {
                        attempt,
                        error: error.clone(),
                    });

                    if attempt < max_retries {
                        self.state = CycleState::Retrying;
                        last_invalid = Some((error, code));
                        attempt += 1;
                        // Fixed pause before re-prompting the backend
                        tokio::time::sleep(Duration::from_millis(self.settings.retry_delay_ms))
                            .await;
                        continue;
                    }

                    self.state = CycleState::Exhausted;
                    on_event(EngineEvent::Exhausted {
                        remediation: EXHAUSTION_REMEDIATION.to_owned(),
                    });
                    metrics::counter!("engine_cycles_total", "outcome" => "exhausted")
                        .increment(1);
                    info!(attempts = attempt + 1, "cycle exhausted");
                    return Ok(CycleOutcome::Exhausted {
                        remediation: EXHAUSTION_REMEDIATION.to_owned(),
                        last_error: error,
                        partial_code: code,
                    });
                }
            }
        }
    }

    /// The provider picks the policy shape; the engine settings supply the
    /// thresholds.
    fn flush_policy_for(&self, provider: &dyn mosaic_llm::provider::Provider) -> FlushPolicy {
        match provider.default_flush_policy() {
            FlushPolicy::SizeThreshold(_) => {
                FlushPolicy::SizeThreshold(self.settings.flush_size_threshold)
            }
            FlushPolicy::TimeThreshold(_) => {
                FlushPolicy::TimeThreshold(Duration::from_millis(self.settings.flush_interval_ms))
            }
            FlushPolicy::PassThrough => FlushPolicy::PassThrough,
        }
    }

    /// Open one provider stream and drain it, forwarding flushed fragments.
    ///
    /// Returns the full raw accumulated text. A mid-stream failure is a
    /// premature end: whatever accumulated is returned and proceeds to
    /// validation as if the stream had ended normally.
    async fn stream_attempt(
        &mut self,
        model: &str,
        messages: &[Message],
        settings: &GenerationSettings,
        on_event: &mut (impl FnMut(EngineEvent) + Send),
    ) -> Result<String, EngineError> {
        let provider = self
            .factory
            .create_for_model(model)
            .await
            .map_err(EngineError::from_provider)?;
        let policy = self.flush_policy_for(provider.as_ref());

        // Dial with transport retry (backoff, pre-first-delta only). The
        // factory re-opens the same call; it never rewrites the prompt.
        let dial_provider = Arc::clone(&provider);
        let dial_messages: Vec<Message> = messages.to_vec();
        let dial_settings = settings.clone();
        let factory: StreamFactory = Box::new(move || {
            let provider = Arc::clone(&dial_provider);
            let messages = dial_messages.clone();
            let settings = dial_settings.clone();
            Box::pin(async move { provider.open_stream(&messages, &settings).await })
        });
        let stream = with_transport_retry(factory, self.transport_retry.clone());

        let mut emissions = pin!(flushed(stream, policy));
        let mut raw = String::new();

        while let Some(item) = emissions.next().await {
            match item {
                Ok(fragment) => {
                    raw.push_str(&fragment);
                    on_event(EngineEvent::CodeDelta {
                        text: clean_fragment(&fragment),
                    });
                }
                Err(err) if raw.is_empty() => {
                    // Nothing accumulated: the call itself failed
                    return Err(EngineError::from_provider(err));
                }
                Err(err) => {
                    warn!(error = %err, "stream ended prematurely, keeping accumulated text");
                    break;
                }
            }
        }

        Ok(raw)
    }

    /// Accept side effects: persist, compute and merge analytics.
    async fn accept(
        &mut self,
        model: &str,
        kind: &CycleKind,
        code: String,
    ) -> Result<AcceptedArtifact, EngineError> {
        let artifact_id = self
            .lineage
            .clone()
            .unwrap_or_else(ArtifactId::new);

        self.store
            .save_artifact(ArtifactRecord::new(
                artifact_id.clone(),
                kind.analytics_prompt(),
                model,
                code.clone(),
            ))
            .await?;

        // Analytics are non-fatal: estimation or upsert failure is logged
        // and the accepted artifact stands.
        let analytics = match TokenAnalytics::compute(model, kind.analytics_prompt(), &code) {
            Ok(analytics) => {
                if let Err(err) = self
                    .store
                    .upsert_analytics(&artifact_id, analytics.clone())
                    .await
                {
                    warn!(error = %err, "analytics upsert failed");
                }
                let _ = self.analytics.record(analytics.clone());
                Some(analytics)
            }
            Err(err) => {
                warn!(error = %err, "token analytics unavailable");
                None
            }
        };

        Ok(AcceptedArtifact {
            artifact_id,
            code,
            analytics,
            cumulative: self.analytics.current().cloned(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

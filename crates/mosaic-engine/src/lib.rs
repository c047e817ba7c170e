//! # mosaic-engine
//!
//! The generation and refinement core: takes a natural-language prompt,
//! drives a streaming LLM backend through `mosaic-llm`, normalizes and
//! validates the artifact, and runs a bounded self-correcting retry loop
//! that re-prompts the backend with synthesized error context.
//!
//! Components:
//! - [`normalize`] — raw text → canonical artifact form (idempotent)
//! - [`validate`] — structural contract checks, first failure wins
//! - [`error_context`] — raw error strings → structured fix context
//! - [`orchestrator`] — the submit → stream → validate → retry/accept
//!   state machine
//! - [`analytics`] — per-call and lineage-cumulative token accounting
//! - [`store`] / [`share`] — persistence and share-link boundaries
//! - [`ops`] — one-shot idea / prompt-refine / fix operations

#![deny(unsafe_code)]

pub mod analytics;
pub mod error_context;
pub mod normalize;
pub mod ops;
pub mod orchestrator;
pub mod prompts;
pub mod share;
pub mod store;
pub mod validate;

pub use analytics::{AnalyticsSession, CumulativeTokenAnalytics, TokenAnalytics};
pub use normalize::normalize;
pub use orchestrator::{
    AcceptedArtifact, CycleOutcome, CycleState, EngineError, EngineEvent, Orchestrator,
    RefinementRequest,
};
pub use store::{ArtifactRecord, ArtifactStore, MemoryStore};
pub use validate::{ValidationError, validate};

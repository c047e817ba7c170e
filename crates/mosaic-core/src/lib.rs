//! # mosaic-core
//!
//! Foundation types and utilities for the Mosaic generation engine.
//!
//! This crate provides the shared vocabulary the other Mosaic crates depend on:
//!
//! - **Messages**: role-tagged conversation messages and generation requests
//! - **Settings**: per-request sampling parameters with product defaults
//! - **Branded IDs**: `ArtifactId` newtype (UUID v7, time-ordered)
//! - **Retry math**: backoff calculation and `Retry-After` parsing
//! - **Text utilities**: log-safe string truncation

#![deny(unsafe_code)]

pub mod ids;
pub mod messages;
pub mod retry;
pub mod text;

pub use ids::ArtifactId;
pub use messages::{GenerationRequest, GenerationSettings, Message, ProviderKind, Role};

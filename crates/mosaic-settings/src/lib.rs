//! # mosaic-settings
//!
//! Process configuration for the Mosaic engine.
//!
//! Settings are loaded once at startup from three layers:
//! 1. Compiled defaults ([`MosaicSettings::default`])
//! 2. `~/.mosaic/settings.json`, deep-merged over the defaults
//! 3. Environment variable overrides (highest priority)
//!
//! Provider availability ([`EnabledProviders`]) is derived from API key
//! presence at startup and refreshed by the health sweep in `mosaic-llm`;
//! the engine only ever reads it.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{ApiSettings, EnabledProviders, EngineSettings, MosaicSettings, ProviderApiSettings};

//! `DeepSeek` adapter (`OpenAI`-compatible wire format).

pub mod provider;

pub use provider::DeepSeekProvider;

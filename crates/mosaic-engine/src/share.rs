//! # Share-link boundary
//!
//! Downstream consumer of accepted artifacts: hands out share tokens that
//! point at an artifact id, optionally expiring, view-limited, and
//! password-gated. Passwords are stored as SHA-256 digests and verified by
//! digest comparison. The artifact text itself never passes through here —
//! the token is a pointer, not a payload.

use std::collections::HashMap;
use std::sync::Mutex;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use mosaic_core::ids::ArtifactId;

/// Options for creating a share pointer.
#[derive(Clone, Debug, Default)]
pub struct ShareOptions {
    /// Time-to-live; `None` means no expiry.
    pub expires_in: Option<Duration>,
    /// Maximum redemptions; `None` means unlimited.
    pub max_views: Option<u32>,
    /// Password gate; `None` means open access.
    pub password: Option<String>,
}

/// A stored share pointer.
#[derive(Clone, Debug)]
struct SharePointer {
    artifact_id: ArtifactId,
    expires_at: Option<DateTime<Utc>>,
    remaining_views: Option<u32>,
    password_digest: Option<String>,
}

/// Ways a redemption can fail.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShareError {
    /// No pointer under that token.
    #[error("share link not found")]
    NotFound,
    /// The pointer's expiry has passed.
    #[error("share link expired")]
    Expired,
    /// Every allowed view has been used.
    #[error("share link view limit reached")]
    ViewsExhausted,
    /// The pointer is password-gated and none was supplied.
    #[error("password required")]
    PasswordRequired,
    /// The supplied password does not match.
    #[error("wrong password")]
    WrongPassword,
}

/// SHA-256 digest of a password, base64-encoded.
fn digest_password(password: &str) -> String {
    BASE64.encode(Sha256::digest(password.as_bytes()))
}

/// In-memory share store.
#[derive(Debug, Default)]
pub struct ShareStore {
    pointers: Mutex<HashMap<String, SharePointer>>,
}

impl ShareStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a share pointer; returns the share token.
    pub fn create(&self, artifact_id: ArtifactId, options: &ShareOptions) -> String {
        let token = ArtifactId::new().into_inner();
        let pointer = SharePointer {
            artifact_id,
            expires_at: options.expires_in.map(|ttl| Utc::now() + ttl),
            remaining_views: options.max_views,
            password_digest: options.password.as_deref().map(digest_password),
        };
        let mut pointers = self
            .pointers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = pointers.insert(token.clone(), pointer);
        token
    }

    /// Redeem a share token, consuming one view.
    ///
    /// Checks run in order: existence, expiry, view budget, password.
    pub fn redeem(&self, token: &str, password: Option<&str>) -> Result<ArtifactId, ShareError> {
        let mut pointers = self
            .pointers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let pointer = pointers.get_mut(token).ok_or(ShareError::NotFound)?;

        if pointer.expires_at.is_some_and(|at| Utc::now() > at) {
            return Err(ShareError::Expired);
        }
        if pointer.remaining_views == Some(0) {
            return Err(ShareError::ViewsExhausted);
        }
        if let Some(expected) = &pointer.password_digest {
            let supplied = password.ok_or(ShareError::PasswordRequired)?;
            if &digest_password(supplied) != expected {
                return Err(ShareError::WrongPassword);
            }
        }

        if let Some(views) = pointer.remaining_views.as_mut() {
            *views -= 1;
        }
        Ok(pointer.artifact_id.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

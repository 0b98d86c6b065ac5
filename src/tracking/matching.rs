//! Enhanced matching: keeps the Pixel channel initialized with the known
//! user identity so Meta's attribution match quality rises session-wide.
//!
//! The last-applied identity is held in an explicit state object owned by
//! app state, so tests can reset it deterministically.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::pixel::PixelChannel;
use super::user_data::RawUser;

/// Normalized identity subset used for enhanced matching. Values are
/// lowercased and trimmed (phone reduced to digits) but NOT hashed here;
/// the channel hashes at its own boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchingIdentity {
    pub em: Option<String>,
    pub ph: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub zp: Option<String>,
    pub ct: Option<String>,
    pub st: Option<String>,
    pub country: Option<String>,
}

fn norm(value: Option<&str>) -> Option<String> {
    let v = value?.trim().to_lowercase();
    if v.is_empty() { None } else { Some(v) }
}

fn digits(value: Option<&str>) -> Option<String> {
    let v: String = value?.chars().filter(char::is_ascii_digit).collect();
    if v.is_empty() { None } else { Some(v) }
}

impl MatchingIdentity {
    pub fn from_user(user: &RawUser) -> Self {
        Self {
            em: norm(user.email.as_deref()),
            ph: digits(user.phone.as_deref()),
            first_name: norm(user.first_name.as_deref()),
            last_name: norm(user.last_name.as_deref()),
            zp: norm(user.zip.as_deref()),
            ct: norm(user.city.as_deref()),
            st: norm(user.state.as_deref()),
            country: norm(user.country.as_deref()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.em.is_none()
            && self.ph.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.zp.is_none()
            && self.ct.is_none()
            && self.st.is_none()
            && self.country.is_none()
    }
}

/// Last-applied identity fingerprint. One per process; reset on restart.
#[derive(Default)]
pub struct MatchingState {
    last_applied: Mutex<Option<MatchingIdentity>>,
}

impl MatchingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the user's identity to the channel on login or identity
    /// change. No-ops when the identity is empty or identical to the one
    /// already applied. Returns whether the channel was re-initialized.
    pub fn setup(&self, user: &RawUser, channel: &dyn PixelChannel) -> bool {
        let identity = MatchingIdentity::from_user(user);
        if identity.is_empty() {
            return false;
        }
        let mut last = self.last_applied.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_ref() == Some(&identity) {
            debug!("enhanced matching unchanged, skipping re-init");
            return false;
        }
        channel.init(&identity);
        *last = Some(identity);
        true
    }

    /// Drops the applied identity on sign-out and re-initializes the
    /// channel with no identity data.
    pub fn clear(&self, channel: &dyn PixelChannel) {
        let mut last = self.last_applied.lock().unwrap_or_else(PoisonError::into_inner);
        *last = None;
        channel.init(&MatchingIdentity::default());
    }
}

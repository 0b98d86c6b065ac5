//! Pixel delivery channel.
//!
//! The browser Pixel is one delivery of a logical event; the server is the
//! other. This module models the Pixel side as a pluggable channel. The
//! production implementation speaks Meta's image-beacon protocol
//! (`GET /tr?id=...&ev=...&eid=...`), which is what the in-page snippet
//! itself emits; deployments without a configured pixel get a no-op channel.

use std::sync::RwLock;

use tracing::debug;

use super::event::EventName;
use super::hash::{hash_field, hash_phone};
use super::matching::MatchingIdentity;

/// One Pixel-side firing of a logical event. Carries the same `event_id` as
/// the server delivery so Meta can deduplicate the pair.
#[derive(Debug, Clone)]
pub struct PixelEvent {
    pub event_name: EventName,
    pub event_id: String,
    pub source_url: String,
}

/// Fire-and-forget Pixel channel. `fire` never blocks the caller and never
/// fails from the caller's point of view; an unloaded or unconfigured pixel
/// is a no-op, not an error.
pub trait PixelChannel: Send + Sync {
    /// Re-initializes the channel with an enhanced-matching identity bag.
    fn init(&self, identity: &MatchingIdentity);
    /// Fires one event. Must be initiated synchronously; delivery is async.
    fn fire(&self, event: &PixelEvent);
}

/// Production channel: fires Meta's `/tr` image beacon with the shared
/// event id and the hashed enhanced-matching fields applied via `init`.
pub struct BeaconPixel {
    http: reqwest::Client,
    beacon_base: String,
    pixel_id: String,
    identity: RwLock<MatchingIdentity>,
}

impl BeaconPixel {
    pub fn new(beacon_base: impl Into<String>, pixel_id: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            beacon_base: beacon_base.into(),
            pixel_id: pixel_id.into(),
            identity: RwLock::new(MatchingIdentity::default()),
        })
    }

    fn query_params(&self, event: &PixelEvent) -> Vec<(String, String)> {
        let mut params = vec![
            ("id".to_string(), self.pixel_id.clone()),
            ("ev".to_string(), event.event_name.as_str().to_string()),
            ("eid".to_string(), event.event_id.clone()),
            ("dl".to_string(), event.source_url.clone()),
            ("noscript".to_string(), "1".to_string()),
        ];
        let identity = self
            .identity
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        // The beacon carries identity fields hashed, like the snippet does.
        let hashed = [
            ("ud[em]", hash_field(identity.em.as_deref())),
            ("ud[ph]", hash_phone(identity.ph.as_deref())),
            ("ud[fn]", hash_field(identity.first_name.as_deref())),
            ("ud[ln]", hash_field(identity.last_name.as_deref())),
            ("ud[zp]", hash_field(identity.zp.as_deref())),
            ("ud[ct]", hash_field(identity.ct.as_deref())),
            ("ud[st]", hash_field(identity.st.as_deref())),
            ("ud[country]", hash_field(identity.country.as_deref())),
        ];
        for (key, value) in hashed {
            if let Some(v) = value {
                params.push((key.to_string(), v));
            }
        }
        params
    }
}

impl PixelChannel for BeaconPixel {
    fn init(&self, identity: &MatchingIdentity) {
        let mut current = self
            .identity
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *current = identity.clone();
    }

    fn fire(&self, event: &PixelEvent) {
        let url = format!("{}/tr", self.beacon_base);
        let params = self.query_params(event);
        let http = self.http.clone();
        let event_name = event.event_name;
        tokio::spawn(async move {
            if let Err(e) = http.get(&url).query(&params).send().await {
                debug!(event = event_name.as_str(), error = %e, "pixel beacon failed");
            }
        });
    }
}

/// Channel used when no pixel id is configured.
pub struct DisabledPixel;

impl PixelChannel for DisabledPixel {
    fn init(&self, _identity: &MatchingIdentity) {}
    fn fire(&self, event: &PixelEvent) {
        debug!(event = event.event_name.as_str(), "pixel channel disabled, event not fired");
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every init and fire for assertions.
    #[derive(Default)]
    pub struct RecordingPixel {
        pub inits: Mutex<Vec<MatchingIdentity>>,
        pub fired: Mutex<Vec<PixelEvent>>,
    }

    impl PixelChannel for RecordingPixel {
        fn init(&self, identity: &MatchingIdentity) {
            self.inits.lock().unwrap().push(identity.clone());
        }
        fn fire(&self, event: &PixelEvent) {
            self.fired.lock().unwrap().push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beacon_params_carry_dedup_id() {
        let pixel = BeaconPixel::new("https://www.facebook.com", "111222333").unwrap();
        let event = PixelEvent {
            event_name: EventName::ViewContent,
            event_id: "1700000000000_abcdef123".into(),
            source_url: "https://tienda.example/p/1".into(),
        };
        let params = pixel.query_params(&event);
        assert!(params.contains(&("id".into(), "111222333".into())));
        assert!(params.contains(&("ev".into(), "ViewContent".into())));
        assert!(params.contains(&("eid".into(), "1700000000000_abcdef123".into())));
        assert!(params.contains(&("dl".into(), "https://tienda.example/p/1".into())));
        // No identity applied yet: no ud[..] params.
        assert!(!params.iter().any(|(k, _)| k.starts_with("ud[")));
    }

    #[test]
    fn test_beacon_hashes_identity_after_init() {
        let pixel = BeaconPixel::new("https://www.facebook.com", "111222333").unwrap();
        pixel.init(&MatchingIdentity { em: Some("ana@example.com".into()), ..Default::default() });
        let event = PixelEvent {
            event_name: EventName::AddToCart,
            event_id: "x".into(),
            source_url: "https://tienda.example".into(),
        };
        let params = pixel.query_params(&event);
        let em = params.iter().find(|(k, _)| k == "ud[em]").map(|(_, v)| v.clone()).unwrap();
        assert_eq!(em.len(), 64);
        assert_ne!(em, "ana@example.com");
    }
}

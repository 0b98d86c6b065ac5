//! Dual-channel orchestration: one logical commerce event, delivered once
//! through the Pixel channel and once through the Conversions API under a
//! shared event id. The two deliveries are independent; Meta merges them by
//! id. Neither delivery is allowed to fail the business operation that
//! triggered it.

use std::sync::Arc;

use tracing::warn;

use super::capi::{CapiDispatcher, CapiResponse};
use super::event::{generate_event_id, CustomData, EventName, TrackedEvent};
use super::matching::MatchingState;
use super::pixel::{PixelChannel, PixelEvent};
use super::user_data::{RawUser, RequestContext, UserData};

/// Context for one logical event: who, from where, and the dedup id the
/// browser already used if its own Pixel fired first.
#[derive(Debug, Default)]
pub struct TrackContext {
    pub user: RawUser,
    pub request: RequestContext,
    pub event_source_url: String,
    pub event_id: Option<String>,
}

pub struct DualTracker {
    capi: CapiDispatcher,
    pixel: Arc<dyn PixelChannel>,
    matching: MatchingState,
}

impl DualTracker {
    pub fn new(capi: CapiDispatcher, pixel: Arc<dyn PixelChannel>) -> Self {
        Self { capi, pixel, matching: MatchingState::new() }
    }

    pub fn matching(&self) -> &MatchingState {
        &self.matching
    }

    pub fn pixel(&self) -> &dyn PixelChannel {
        self.pixel.as_ref()
    }

    /// Tracks one logical event through both channels.
    ///
    /// The Pixel fire is always initiated before the server dispatch starts;
    /// neither waits for the other. Every failure is logged and surfaces as
    /// `None`; callers never see an error from tracking.
    pub async fn track(
        &self,
        event_name: EventName,
        custom_data: Option<CustomData>,
        ctx: TrackContext,
    ) -> Option<CapiResponse> {
        if ctx.event_source_url.trim().is_empty() {
            warn!(event = event_name.as_str(), "missing event source url, event dropped");
            return None;
        }
        let event_id = ctx
            .event_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_event_id);

        // Known identity raises match quality for this and later events.
        self.matching.setup(&ctx.user, self.pixel.as_ref());

        self.pixel.fire(&PixelEvent {
            event_name,
            event_id: event_id.clone(),
            source_url: ctx.event_source_url.clone(),
        });

        let user_data = UserData::prepare(&ctx.user, &ctx.request);
        let event =
            TrackedEvent::new(event_name, event_id, ctx.event_source_url, user_data, custom_data);
        self.capi.dispatch(&event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetaConfig;
    use crate::tracking::pixel::testing::RecordingPixel;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tracker_with(server_uri: &str, pixel: Arc<RecordingPixel>) -> DualTracker {
        let capi = CapiDispatcher::new(MetaConfig {
            pixel_id: Some("111222333".into()),
            access_token: Some("EAAtoken".into()),
            test_event_code: None,
            graph_base: server_uri.to_string(),
            beacon_base: server_uri.to_string(),
        })
        .unwrap();
        DualTracker::new(capi, pixel)
    }

    fn ctx(url: &str, event_id: Option<&str>) -> TrackContext {
        TrackContext {
            user: RawUser::default(),
            request: RequestContext::default(),
            event_source_url: url.to_string(),
            event_id: event_id.map(Into::into),
        }
    }

    #[tokio::test]
    async fn test_both_channels_share_the_event_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "data": [{"event_id": "1700000000000_clientid1"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"events_received": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let pixel = Arc::new(RecordingPixel::default());
        let tracker = tracker_with(&server.uri(), pixel.clone());
        let ack = tracker
            .track(
                EventName::ViewContent,
                None,
                ctx("https://tienda.example/p/1", Some("1700000000000_clientid1")),
            )
            .await;
        assert!(ack.is_some());
        let fired = pixel.fired.lock().unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].event_id, "1700000000000_clientid1");
    }

    #[tokio::test]
    async fn test_event_id_generated_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"events_received": 1})))
            .mount(&server)
            .await;

        let pixel = Arc::new(RecordingPixel::default());
        let tracker = tracker_with(&server.uri(), pixel.clone());
        tracker.track(EventName::AddToCart, None, ctx("https://tienda.example", None)).await;
        let fired = pixel.fired.lock().unwrap();
        assert!(fired[0].event_id.contains('_'));
    }

    #[tokio::test]
    async fn test_missing_source_url_drops_event_entirely() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let pixel = Arc::new(RecordingPixel::default());
        let tracker = tracker_with(&server.uri(), pixel.clone());
        let ack = tracker.track(EventName::Purchase, None, ctx("  ", None)).await;
        assert!(ack.is_none());
        assert!(pixel.fired.lock().unwrap().is_empty());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_capi_failure_still_fires_pixel_and_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let pixel = Arc::new(RecordingPixel::default());
        let tracker = tracker_with(&server.uri(), pixel.clone());
        let ack = tracker.track(EventName::Purchase, None, ctx("https://tienda.example", None)).await;
        assert!(ack.is_none());
        assert_eq!(pixel.fired.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_identity_in_context_sets_up_matching() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"events_received": 1})))
            .mount(&server)
            .await;

        let pixel = Arc::new(RecordingPixel::default());
        let tracker = tracker_with(&server.uri(), pixel.clone());
        let mut context = ctx("https://tienda.example", None);
        context.user.email = Some("ana@example.com".into());
        tracker.track(EventName::CompleteRegistration, None, context).await;
        assert_eq!(pixel.inits.lock().unwrap().len(), 1);
    }
}

//! Server-side Conversions API dispatcher.
//!
//! Tracking must never break the business operation it rides along with:
//! every failure path here logs and returns `None`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::{MetaConfig, GRAPH_API_VERSION};

use super::event::{CapiEnvelope, TrackedEvent};

const DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Graph API acknowledgement for an event batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapiResponse {
    #[serde(default)]
    pub events_received: Option<u32>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

pub struct CapiDispatcher {
    http: reqwest::Client,
    config: MetaConfig,
}

impl CapiDispatcher {
    pub fn new(config: MetaConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(DISPATCH_TIMEOUT).build()?;
        Ok(Self { http, config })
    }

    /// Delivers one event to `POST {graph_base}/{version}/{pixel_id}/events`.
    ///
    /// Returns the parsed acknowledgement, or `None` when tracking is
    /// unconfigured, the request fails, or Meta rejects the event.
    pub async fn dispatch(&self, event: &TrackedEvent) -> Option<CapiResponse> {
        let (pixel_id, access_token) = match (&self.config.pixel_id, &self.config.access_token) {
            (Some(p), Some(t)) => (p, t),
            _ => {
                warn!(
                    event = event.event_name.as_str(),
                    "server-side tracking disabled: FB_PIXEL_ID / FB_ACCESS_TOKEN not configured"
                );
                return None;
            }
        };

        let url = format!("{}/{}/{}/events", self.config.graph_base, GRAPH_API_VERSION, pixel_id);
        let envelope = CapiEnvelope {
            data: [event],
            test_event_code: self.config.test_event_code.as_deref(),
            access_token,
        };

        let response = match self.http.post(&url).json(&envelope).send().await {
            Ok(r) => r,
            Err(e) => {
                error!(event = event.event_name.as_str(), error = %e, "conversions api request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                event = event.event_name.as_str(),
                status = status.as_u16(),
                body = %body,
                "conversions api rejected event"
            );
            return None;
        }

        match response.json::<CapiResponse>().await {
            Ok(ack) => {
                debug!(
                    event = event.event_name.as_str(),
                    event_id = %event.event_id,
                    events_received = ?ack.events_received,
                    fbtrace_id = ?ack.fbtrace_id,
                    "conversions api accepted event"
                );
                Some(ack)
            }
            Err(e) => {
                error!(event = event.event_name.as_str(), error = %e, "conversions api response unreadable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::event::{CustomData, EventName};
    use crate::tracking::user_data::UserData;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn meta_config(graph_base: &str) -> MetaConfig {
        MetaConfig {
            pixel_id: Some("111222333".to_string()),
            access_token: Some("EAAtoken".to_string()),
            test_event_code: None,
            graph_base: graph_base.to_string(),
            beacon_base: graph_base.to_string(),
        }
    }

    fn sample_event() -> TrackedEvent {
        TrackedEvent::new(
            EventName::AddToCart,
            "1700000000000_abcdef123".into(),
            "https://tienda.example/p/1".into(),
            UserData::default(),
            Some(CustomData::default()),
        )
    }

    #[tokio::test]
    async fn test_unconfigured_dispatch_makes_no_request() {
        let server = MockServer::start().await;
        // Zero expected requests: dispatch must short-circuit before HTTP.
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let mut config = meta_config(&server.uri());
        config.pixel_id = None;
        let dispatcher = CapiDispatcher::new(config).unwrap();
        assert_eq!(dispatcher.dispatch(&sample_event()).await, None);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_successful_dispatch_returns_ack() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v18.0/111222333/events"))
            .and(body_partial_json(serde_json::json!({
                "access_token": "EAAtoken",
                "data": [{"event_name": "AddToCart", "action_source": "website"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "events_received": 1,
                "fbtrace_id": "AbCdEf"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = CapiDispatcher::new(meta_config(&server.uri())).unwrap();
        let ack = dispatcher.dispatch(&sample_event()).await.unwrap();
        assert_eq!(ack.events_received, Some(1));
        assert_eq!(ack.fbtrace_id.as_deref(), Some("AbCdEf"));
    }

    #[tokio::test]
    async fn test_rejected_dispatch_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "Invalid parameter", "code": 100}
            })))
            .mount(&server)
            .await;

        let dispatcher = CapiDispatcher::new(meta_config(&server.uri())).unwrap();
        assert_eq!(dispatcher.dispatch(&sample_event()).await, None);
    }

    #[tokio::test]
    async fn test_connection_failure_returns_none() {
        // Nothing listens on the configured base.
        let dispatcher = CapiDispatcher::new(MetaConfig {
            pixel_id: Some("111222333".into()),
            access_token: Some("EAAtoken".into()),
            test_event_code: None,
            graph_base: "http://127.0.0.1:9".into(),
            beacon_base: "http://127.0.0.1:9".into(),
        })
        .unwrap();
        assert_eq!(dispatcher.dispatch(&sample_event()).await, None);
    }

    #[tokio::test]
    async fn test_test_event_code_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"test_event_code": "TEST99"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"events_received": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = meta_config(&server.uri());
        config.test_event_code = Some("TEST99".into());
        let dispatcher = CapiDispatcher::new(config).unwrap();
        assert!(dispatcher.dispatch(&sample_event()).await.is_some());
    }
}

//! Conversion event model: one tagged variant per logical commerce event,
//! serialized into Meta's Conversions API wire shape.

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_CURRENCY;

use super::user_data::UserData;

pub const ACTION_SOURCE_WEBSITE: &str = "website";
pub const DELIVERY_HOME: &str = "home_delivery";

/// Logical commerce events the storefront reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    ViewContent,
    AddToCart,
    InitiateCheckout,
    Purchase,
    CompleteRegistration,
    Search,
    Contact,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewContent => "ViewContent",
            Self::AddToCart => "AddToCart",
            Self::InitiateCheckout => "InitiateCheckout",
            Self::Purchase => "Purchase",
            Self::CompleteRegistration => "CompleteRegistration",
            Self::Search => "Search",
            Self::Contact => "Contact",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One commerce line inside `custom_data.contents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub content_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub contents: Vec<ContentItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_items: Option<u32>,
}

impl Default for CustomData {
    fn default() -> Self {
        Self {
            value: None,
            currency: DEFAULT_CURRENCY.to_string(),
            content_name: None,
            content_type: Some("product".to_string()),
            content_ids: vec![],
            contents: vec![],
            num_items: None,
        }
    }
}

/// A single event as delivered to the Conversions API. Created fresh per
/// user action and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedEvent {
    pub event_name: EventName,
    pub event_id: String,
    pub event_time: i64,
    pub event_source_url: String,
    pub action_source: &'static str,
    pub user_data: UserData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
}

impl TrackedEvent {
    pub fn new(
        event_name: EventName,
        event_id: String,
        event_source_url: String,
        user_data: UserData,
        custom_data: Option<CustomData>,
    ) -> Self {
        Self {
            event_name,
            event_id,
            event_time: Utc::now().timestamp(),
            event_source_url,
            action_source: ACTION_SOURCE_WEBSITE,
            user_data,
            custom_data,
        }
    }
}

/// Request envelope for `POST /{version}/{pixel_id}/events`. The access
/// token travels in the body and must never appear in logs.
#[derive(Debug, Serialize)]
pub struct CapiEnvelope<'a> {
    pub data: [&'a TrackedEvent; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_event_code: Option<&'a str>,
    pub access_token: &'a str,
}

const EVENT_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const EVENT_ID_SUFFIX_LEN: usize = 9;

/// Deduplication id shared by the Pixel and CAPI deliveries of one logical
/// event: `{unix_millis}_{9 base36 chars}`.
pub fn generate_event_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..EVENT_ID_SUFFIX_LEN)
        .map(|_| EVENT_ID_ALPHABET[rng.gen_range(0..EVENT_ID_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_event_name_wire_values() {
        assert_eq!(EventName::ViewContent.as_str(), "ViewContent");
        assert_eq!(
            serde_json::to_string(&EventName::InitiateCheckout).unwrap(),
            "\"InitiateCheckout\""
        );
        assert_eq!(EventName::Search.as_str(), "Search");
        assert_eq!(EventName::Contact.as_str(), "Contact");
    }

    #[test]
    fn test_event_id_shape() {
        let id = generate_event_id();
        let (millis, suffix) = id.split_once('_').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_event_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_event_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_envelope_serialization() {
        let event = TrackedEvent::new(
            EventName::Purchase,
            "1700000000000_abc123xyz".into(),
            "https://tienda.example/checkout".into(),
            UserData::default(),
            Some(CustomData::default()),
        );
        let envelope = CapiEnvelope {
            data: [&event],
            test_event_code: Some("TEST123"),
            access_token: "secret",
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["data"][0]["event_name"], "Purchase");
        assert_eq!(json["data"][0]["action_source"], "website");
        assert_eq!(json["data"][0]["event_id"], "1700000000000_abc123xyz");
        assert_eq!(json["test_event_code"], "TEST123");
        assert_eq!(json["access_token"], "secret");
    }

    #[test]
    fn test_custom_data_omits_unset_value() {
        let data = CustomData::default();
        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("value").is_none());
        assert_eq!(json["currency"], "ARS");
        assert_eq!(json["content_type"], "product");
    }
}

//! Environment configuration, resolved once at startup.

use tracing::warn;

/// Graph API version every Conversions API call targets.
pub const GRAPH_API_VERSION: &str = "v18.0";

/// Storefront currency.
pub const DEFAULT_CURRENCY: &str = "ARS";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub meta: MetaConfig,
    pub nats_url: Option<String>,
    /// Store number the checkout deep link points at, digits only
    /// (e.g. "5491112345678").
    pub whatsapp_phone: Option<String>,
}

/// Meta credentials and endpoints. Both secrets are required for
/// server-side tracking; the bases are overridable for tests.
#[derive(Debug, Clone)]
pub struct MetaConfig {
    pub pixel_id: Option<String>,
    pub access_token: Option<String>,
    pub test_event_code: Option<String>,
    pub graph_base: String,
    pub beacon_base: String,
}

impl MetaConfig {
    pub fn tracking_enabled(&self) -> bool {
        self.pixel_id.is_some() && self.access_token.is_some()
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let meta = MetaConfig {
            pixel_id: env_opt("FB_PIXEL_ID"),
            access_token: env_opt("FB_ACCESS_TOKEN"),
            test_event_code: env_opt("FB_TEST_EVENT_CODE"),
            graph_base: env_opt("FB_GRAPH_BASE")
                .unwrap_or_else(|| "https://graph.facebook.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            beacon_base: env_opt("FB_BEACON_BASE")
                .unwrap_or_else(|| "https://www.facebook.com".to_string())
                .trim_end_matches('/')
                .to_string(),
        };
        if !meta.tracking_enabled() {
            warn!("FB_PIXEL_ID / FB_ACCESS_TOKEN not set, server-side conversion tracking disabled");
        }
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")?,
            port: env_opt("PORT").and_then(|p| p.parse().ok()).unwrap_or(8083),
            meta,
            nats_url: env_opt("NATS_URL"),
            whatsapp_phone: env_opt("STORE_WHATSAPP_PHONE"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_enabled_requires_both_secrets() {
        let mut meta = MetaConfig {
            pixel_id: Some("1".into()),
            access_token: None,
            test_event_code: None,
            graph_base: "https://graph.facebook.com".into(),
            beacon_base: "https://www.facebook.com".into(),
        };
        assert!(!meta.tracking_enabled());
        meta.access_token = Some("t".into());
        assert!(meta.tracking_enabled());
    }
}

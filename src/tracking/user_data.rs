//! User-data preparation for Conversions API payloads.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use super::hash::{hash_field, hash_phone};

/// Loose user object as the storefront client sends it. Every field is
/// optional; anonymous visitors produce an all-`None` value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub user_id: Option<String>,
    pub id: Option<String>,
}

impl RawUser {
    pub fn has_identity(&self) -> bool {
        self.email.is_some() || self.phone.is_some() || self.user_id.is_some() || self.id.is_some()
    }
}

/// Ambient browser/request signals: Meta cookies, client IP, user agent.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub fbp: Option<String>,
    pub fbc: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let cookies = header("cookie").unwrap_or_default();
        // X-Forwarded-For carries the original client as its first entry.
        let client_ip = header("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
            .or_else(|| header("x-real-ip"));
        Ok(Self {
            fbp: cookie_value(&cookies, "_fbp"),
            fbc: cookie_value(&cookies, "_fbc"),
            client_ip,
            user_agent: header("user-agent"),
        })
    }
}

fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k.trim() == name).then(|| v.trim().to_string())
    })
}

/// The hashed + unhashed identity bag sent with every server event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub em: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<String>,
    #[serde(rename = "fn", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "ln", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub st: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user_agent: Option<String>,
}

impl UserData {
    /// Builds the bag from a loose user object and ambient request signals.
    ///
    /// Meta rejects events with zero matchable identity fields, so when em,
    /// ph and external_id are all absent a placeholder IP and user agent are
    /// forced in. Better-than-nothing policy, kept verbatim.
    pub fn prepare(user: &RawUser, ctx: &RequestContext) -> Self {
        let mut data = Self {
            em: hash_field(user.email.as_deref()),
            ph: hash_phone(user.phone.as_deref()),
            first_name: hash_field(user.first_name.as_deref()),
            last_name: hash_field(user.last_name.as_deref()),
            ct: hash_field(user.city.as_deref()),
            st: hash_field(user.state.as_deref()),
            zp: hash_field(user.zip.as_deref()),
            country: hash_field(user.country.as_deref()),
            fbp: ctx.fbp.clone(),
            fbc: ctx.fbc.clone(),
            external_id: user.user_id.clone().or_else(|| user.id.clone()),
            client_ip_address: ctx.client_ip.clone(),
            client_user_agent: ctx.user_agent.clone(),
        };
        if data.em.is_none() && data.ph.is_none() && data.external_id.is_none() {
            data.client_ip_address = Some("0.0.0.0".to_string());
            data.client_user_agent = Some("Unknown".to_string());
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_field_present_iff_source_present() {
        let user = RawUser { email: Some("a@b.com".into()), ..Default::default() };
        let data = UserData::prepare(&user, &RequestContext::default());
        assert!(data.em.is_some());
        assert!(data.ph.is_none());
        assert!(data.first_name.is_none());
    }

    #[test]
    fn test_email_hash_is_64_char_hex() {
        let user = RawUser { email: Some("a@b.com".into()), ..Default::default() };
        let data = UserData::prepare(&user, &RequestContext::default());
        let em = data.em.unwrap();
        assert_eq!(em.len(), 64);
        assert!(em.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_anonymous_user_gets_placeholder_signals() {
        let data = UserData::prepare(&RawUser::default(), &RequestContext::default());
        assert_eq!(data.client_ip_address.as_deref(), Some("0.0.0.0"));
        assert_eq!(data.client_user_agent.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_identified_user_keeps_real_signals() {
        let user = RawUser { user_id: Some("u1".into()), ..Default::default() };
        let ctx = RequestContext {
            client_ip: Some("203.0.113.7".into()),
            user_agent: Some("Mozilla/5.0".into()),
            ..Default::default()
        };
        let data = UserData::prepare(&user, &ctx);
        assert_eq!(data.external_id.as_deref(), Some("u1"));
        assert_eq!(data.client_ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_cookies_copied_verbatim_not_hashed() {
        let ctx = RequestContext {
            fbp: Some("fb.1.1700000000000.123456789".into()),
            fbc: Some("fb.1.1700000000000.AbCdEf".into()),
            ..Default::default()
        };
        let data = UserData::prepare(&RawUser::default(), &ctx);
        assert_eq!(data.fbp.as_deref(), Some("fb.1.1700000000000.123456789"));
        assert_eq!(data.fbc.as_deref(), Some("fb.1.1700000000000.AbCdEf"));
    }

    #[test]
    fn test_user_id_preferred_over_id() {
        let user = RawUser {
            user_id: Some("u1".into()),
            id: Some("legacy".into()),
            ..Default::default()
        };
        let data = UserData::prepare(&user, &RequestContext::default());
        assert_eq!(data.external_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_serialized_field_names_match_wire_format() {
        let user = RawUser {
            email: Some("a@b.com".into()),
            first_name: Some("Ana".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(UserData::prepare(&user, &RequestContext::default())).unwrap();
        assert!(json.get("em").is_some());
        assert!(json.get("fn").is_some());
        assert!(json.get("first_name").is_none());
        assert!(json.get("ph").is_none());
    }

    #[test]
    fn test_cookie_parsing() {
        let cookies = "theme=dark; _fbp=fb.1.1.2; _fbc=fb.1.1.x";
        assert_eq!(cookie_value(cookies, "_fbp").as_deref(), Some("fb.1.1.2"));
        assert_eq!(cookie_value(cookies, "_fbc").as_deref(), Some("fb.1.1.x"));
        assert_eq!(cookie_value(cookies, "_ga"), None);
    }
}

//! HTTP client for the marketing API.

use crate::{DeliveryError, DeliveryResult, EventSender};
use async_trait::async_trait;
use bridge_config::BentoSettings;
use mapping_rules::{Attributes, EventPayload, ResolvedEvent};
use parking_lot::Mutex;
use reqwest::{Client, Request};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long fetched field keys are reused.
pub const FIELD_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub site_uuid: String,
    pub publishable_key: String,
    pub secret_key: String,
    pub timeout_secs: u64,
    /// Attempts per event, including the first.
    pub max_attempts: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: bridge_config::DEFAULT_API_URL.to_string(),
            site_uuid: String::new(),
            publishable_key: String::new(),
            secret_key: String::new(),
            timeout_secs: bridge_config::DEFAULT_TIMEOUT_SECS,
            max_attempts: 3,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 5000,
        }
    }
}

impl From<&BentoSettings> for ClientConfig {
    fn from(settings: &BentoSettings) -> Self {
        Self {
            api_url: settings.api_url.clone(),
            site_uuid: settings.site_uuid.clone(),
            publishable_key: settings.publishable_key.clone(),
            secret_key: settings.secret_key.clone(),
            timeout_secs: settings.timeout_secs,
            ..Default::default()
        }
    }
}

impl ClientConfig {
    fn has_credentials(&self) -> bool {
        !self.site_uuid.is_empty() && !self.publishable_key.is_empty() && !self.secret_key.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct BatchEventsRequest<'a> {
    events: Vec<EventBody<'a>>,
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
    #[serde(rename = "type")]
    event_type: &'a str,
    email: &'a str,
    fields: &'a Attributes,
    details: &'a EventPayload,
}

#[derive(Debug, Deserialize)]
struct FieldsResponse {
    #[serde(default)]
    data: Vec<FieldEntry>,
}

#[derive(Debug, Deserialize)]
struct FieldEntry {
    #[serde(default)]
    attributes: FieldAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct FieldAttributes {
    #[serde(default)]
    key: String,
}

/// [`EventSender`] backed by the Bento HTTP API.
pub struct BentoClient {
    config: ClientConfig,
    client: Client,
    field_cache: Mutex<Option<(Instant, Vec<String>)>>,
}

impl BentoClient {
    pub fn new(config: ClientConfig) -> DeliveryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("bento-bridge-{}", config.site_uuid))
            .build()?;

        Ok(Self {
            config,
            client,
            field_cache: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn ensure_credentials(&self) -> DeliveryResult<()> {
        if self.config.has_credentials() {
            Ok(())
        } else {
            Err(DeliveryError::MissingCredentials)
        }
    }

    /// Build the POST for one event without sending it.
    pub fn build_event_request(&self, event: &ResolvedEvent) -> DeliveryResult<Request> {
        self.ensure_credentials()?;

        let body = BatchEventsRequest {
            events: vec![EventBody {
                event_type: &event.output_event_name,
                email: &event.email,
                fields: &event.attributes,
                details: &event.payload,
            }],
        };

        let request = self
            .client
            .post(self.endpoint("batch/events"))
            .query(&[("site_uuid", &self.config.site_uuid)])
            .basic_auth(&self.config.publishable_key, Some(&self.config.secret_key))
            .json(&body)
            .build()?;
        Ok(request)
    }

    async fn try_send(&self, event: &ResolvedEvent) -> DeliveryResult<()> {
        let request = self.build_event_request(event)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Custom field keys defined in the account, sorted. Cached for
    /// [`FIELD_CACHE_TTL`].
    pub async fn fetch_field_keys(&self) -> DeliveryResult<Vec<String>> {
        if let Some((fetched_at, keys)) = self.field_cache.lock().as_ref() {
            if fetched_at.elapsed() < FIELD_CACHE_TTL {
                return Ok(keys.clone());
            }
        }

        self.ensure_credentials()?;
        let response = self
            .client
            .get(self.endpoint("fetch/fields"))
            .query(&[("site_uuid", &self.config.site_uuid)])
            .header(reqwest::header::ACCEPT, "application/json")
            .basic_auth(&self.config.publishable_key, Some(&self.config.secret_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: FieldsResponse = response.json().await?;
        let keys = sorted_keys(body);
        debug!(count = keys.len(), "Fetched custom field keys");

        *self.field_cache.lock() = Some((Instant::now(), keys.clone()));
        Ok(keys)
    }
}

fn sorted_keys(body: FieldsResponse) -> Vec<String> {
    let mut keys: Vec<String> = body
        .data
        .into_iter()
        .map(|entry| entry.attributes.key)
        .filter(|key| !key.is_empty())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

#[async_trait]
impl EventSender for BentoClient {
    async fn send_event(&self, event: &ResolvedEvent) -> DeliveryResult<()> {
        let mut attempt = 0;
        let mut delay = self.config.initial_retry_delay_ms;

        loop {
            attempt += 1;

            match self.try_send(event).await {
                Ok(()) => {
                    info!(
                        user_id = event.user_id,
                        event_name = %event.output_event_name,
                        attempt,
                        "Event delivered"
                    );
                    return Ok(());
                }
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    warn!(
                        user_id = event.user_id,
                        event_name = %event.output_event_name,
                        attempt,
                        delay_ms = delay,
                        error = %e,
                        "Delivery failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay_ms);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapping_rules::PayloadValue;

    fn config() -> ClientConfig {
        ClientConfig {
            api_url: "https://api.example.test/v1/".to_string(),
            site_uuid: "site-1".to_string(),
            publishable_key: "pub".to_string(),
            secret_key: "secret".to_string(),
            ..Default::default()
        }
    }

    fn event() -> ResolvedEvent {
        let mut attributes = Attributes::new();
        attributes.insert("plan".to_string(), PayloadValue::from("Gold"));
        let mut payload = EventPayload::new();
        payload.insert("level_id".to_string(), PayloadValue::Int(2));

        ResolvedEvent {
            user_id: 1,
            output_event_name: "$Checkout".to_string(),
            email: "ada@example.com".to_string(),
            payload,
            attributes,
        }
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "https://app.bentonow.com/api/v1");
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_client_config_from_settings() {
        let settings = BentoSettings {
            site_uuid: "abc".to_string(),
            timeout_secs: 3,
            ..Default::default()
        };
        let config = ClientConfig::from(&settings);
        assert_eq!(config.site_uuid, "abc");
        assert_eq!(config.timeout_secs, 3);
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_build_event_request() {
        let client = BentoClient::new(config()).unwrap();
        let request = client.build_event_request(&event()).unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://api.example.test/v1/batch/events?site_uuid=site-1"
        );
        let auth = request.headers()["authorization"].to_str().unwrap();
        assert!(auth.starts_with("Basic "));

        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "events": [{
                    "type": "$Checkout",
                    "email": "ada@example.com",
                    "fields": { "plan": "Gold" },
                    "details": { "level_id": 2 }
                }]
            })
        );
    }

    #[test]
    fn test_missing_credentials() {
        let client = BentoClient::new(ClientConfig::default()).unwrap();
        let err = client.build_event_request(&event()).unwrap_err();
        assert!(matches!(err, DeliveryError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_send_without_credentials_fails_fast() {
        let client = BentoClient::new(ClientConfig::default()).unwrap();
        let err = client.send_event(&event()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::MissingCredentials));
    }

    #[test]
    fn test_sorted_keys() {
        let body: FieldsResponse = serde_json::from_str(
            r#"{"data":[
                {"attributes":{"key":"plan"}},
                {"attributes":{"key":"company"}},
                {"attributes":{"key":""}},
                {"attributes":{}},
                {"attributes":{"key":"plan"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(sorted_keys(body), vec!["company", "plan"]);
    }

    #[test]
    fn test_backoff_caps() {
        let config = ClientConfig::default();
        let mut delay = config.initial_retry_delay_ms;
        for _ in 0..5 {
            delay = std::cmp::min(delay * 2, config.max_retry_delay_ms);
        }
        assert_eq!(delay, 5000);
    }
}

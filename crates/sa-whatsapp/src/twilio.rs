//! Twilio API client for WhatsApp

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use sa_core::{MediaPayload, TwilioConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, WhatsAppError};
use crate::format::{truncate_for_whatsapp, DEFAULT_MESSAGE_LIMIT};

const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Outbound side of a chat channel
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Send a text message to `to`
    async fn send_text(&self, to: &str, body: &str) -> Result<()>;

    /// Download media the user attached
    async fn fetch_media(&self, url: &str) -> Result<MediaPayload>;
}

/// Twilio API client
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
    max_message_length: usize,
}

/// Outgoing message payload
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "Body")]
    body: &'a str,
    #[serde(rename = "MediaUrl", skip_serializing_if = "Option::is_none")]
    media_url: Option<&'a str>,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    sid: String,
}

/// Prefix a number with `whatsapp:` unless it already has it
pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with(WHATSAPP_PREFIX) {
        number.to_string()
    } else {
        format!("{WHATSAPP_PREFIX}{number}")
    }
}

impl TwilioClient {
    /// Create a new Twilio client
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            client: Client::new(),
            account_sid,
            auth_token,
            from_number: whatsapp_address(&from_number),
            base_url: "https://api.twilio.com".to_string(),
            max_message_length: DEFAULT_MESSAGE_LIMIT,
        }
    }

    /// Build from config; both credentials must be present
    pub fn from_config(config: &TwilioConfig, max_message_length: usize) -> Result<Self> {
        let (Some(sid), Some(token)) = (&config.account_sid, &config.auth_token) else {
            return Err(WhatsAppError::CredentialsNotSet);
        };

        Ok(
            Self::new(sid.clone(), token.clone(), config.whatsapp_number.clone())
                .with_base_url(&config.base_url)
                .with_max_message_length(max_message_length),
        )
    }

    /// Override the API base URL (for testing)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_message_length(mut self, limit: usize) -> Self {
        self.max_message_length = limit;
        self
    }

    pub fn from_number(&self) -> &str {
        &self.from_number
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }

    async fn create_message(&self, payload: &SendMessagePayload<'_>) -> Result<String> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api(format!(
                "Failed to send message: {} - {}",
                status, text
            )));
        }

        let result: SendMessageResponse = response.json().await?;
        Ok(result.sid)
    }

    /// Send a WhatsApp message
    pub async fn send_message(&self, to: &str, body: &str) -> Result<String> {
        let to = whatsapp_address(to);
        let body = truncate_for_whatsapp(body, self.max_message_length);
        info!("Sending WhatsApp message from {} to {}", self.from_number, to);

        let sid = self
            .create_message(&SendMessagePayload {
                from: &self.from_number,
                to: &to,
                body: &body,
                media_url: None,
            })
            .await?;

        debug!("Twilio message sent: {}", sid);
        Ok(sid)
    }

    /// Send an image with a caption
    pub async fn send_media(&self, to: &str, media_url: &str, caption: &str) -> Result<String> {
        let to = whatsapp_address(to);
        let caption = truncate_for_whatsapp(caption, self.max_message_length);
        info!("Sending WhatsApp media message to {}", to);

        let sid = self
            .create_message(&SendMessagePayload {
                from: &self.from_number,
                to: &to,
                body: &caption,
                media_url: Some(media_url),
            })
            .await?;

        debug!("Twilio media message sent: {}", sid);
        Ok(sid)
    }

    /// Download media attached to an inbound message
    pub async fn download_media(&self, url: &str) -> Result<MediaPayload> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Failed to download media: status {}", status);
            return Err(WhatsAppError::MediaDownload(status.as_u16()));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        info!("Downloaded media: {} bytes ({})", bytes.len(), mime_type);
        Ok(MediaPayload::new(mime_type, bytes))
    }

    /// Verify an `X-Twilio-Signature` header
    ///
    /// Twilio signs the full request URL followed by every POST parameter
    /// as `key` + `value`, sorted by key, with HMAC-SHA1 keyed by the auth
    /// token, base64-encoded.
    pub fn verify_signature(
        &self,
        url: &str,
        params: &BTreeMap<String, String>,
        signature: &str,
    ) -> bool {
        use hmac::{Hmac, Mac};
        use sha1::Sha1;

        let Ok(expected) = STANDARD.decode(signature.trim()) else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(self.auth_token.as_bytes()) else {
            return false;
        };

        mac.update(url.as_bytes());
        for (key, value) in params {
            mac.update(key.as_bytes());
            mac.update(value.as_bytes());
        }

        // constant-time comparison
        mac.verify_slice(&expected).is_ok()
    }
}

#[async_trait]
impl MessagingProvider for TwilioClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        self.send_message(to, body).await.map(|_| ())
    }

    async fn fetch_media(&self, url: &str) -> Result<MediaPayload> {
        self.download_media(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TwilioClient {
        TwilioClient::new(
            "AC123".to_string(),
            "token123".to_string(),
            "+14155238886".to_string(),
        )
        .with_base_url(&server.uri())
    }

    #[test]
    fn test_client_creation() {
        let client = TwilioClient::new(
            "AC123".to_string(),
            "token123".to_string(),
            "+1234567890".to_string(),
        );
        assert_eq!(client.account_sid, "AC123");
        assert_eq!(client.from_number(), "whatsapp:+1234567890");
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let mut config = TwilioConfig::default();
        assert!(matches!(
            TwilioClient::from_config(&config, 1600),
            Err(WhatsAppError::CredentialsNotSet)
        ));

        config.account_sid = Some("AC123".to_string());
        config.auth_token = Some("token".to_string());
        let client = TwilioClient::from_config(&config, 1600).unwrap();
        assert_eq!(client.from_number(), "whatsapp:+14155238886");
    }

    #[test]
    fn test_whatsapp_address() {
        assert_eq!(whatsapp_address("+15551234"), "whatsapp:+15551234");
        assert_eq!(whatsapp_address("whatsapp:+15551234"), "whatsapp:+15551234");
    }

    #[tokio::test]
    async fn test_send_message_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(basic_auth("AC123", "token123"))
            .and(body_string_contains("To=whatsapp%3A%2B15551234"))
            .and(body_string_contains("From=whatsapp%3A%2B14155238886"))
            .and(body_string_contains("Body=hello"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sid = client(&server).send_message("+15551234", "hello").await.unwrap();
        assert_eq!(sid, "SM1");
    }

    #[tokio::test]
    async fn test_send_message_truncates_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Body=aaaaaaa..."))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM2"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).with_max_message_length(10);
        client.send_message("+1", &"a".repeat(50)).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_media_includes_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("MediaUrl=https%3A%2F%2Fexample.com%2Fa.jpg"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "MM1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sid = client(&server)
            .send_media("+1", "https://example.com/a.jpg", "your sample")
            .await
            .unwrap();
        assert_eq!(sid, "MM1");
    }

    #[tokio::test]
    async fn test_send_message_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad number"))
            .mount(&server)
            .await;

        let err = client(&server).send_message("+1", "hi").await.unwrap_err();
        assert!(matches!(err, WhatsAppError::Api(msg) if msg.contains("bad number")));
    }

    #[tokio::test]
    async fn test_download_media() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/ME1"))
            .and(basic_auth("AC123", "token123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![0xFF, 0xD8, 0xFF]),
            )
            .mount(&server)
            .await;

        let media = client(&server)
            .fetch_media(&format!("{}/media/ME1", server.uri()))
            .await
            .unwrap();
        assert_eq!(media.mime_type, "image/jpeg");
        assert_eq!(media.bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn test_download_media_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .download_media(&format!("{}/media/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, WhatsAppError::MediaDownload(404)));
    }

    #[test]
    fn test_verify_signature() {
        let client = TwilioClient::new(
            "AC123".to_string(),
            "12345".to_string(),
            "+1".to_string(),
        );
        let url = "https://example.com/twilio-webhook";
        let params: BTreeMap<String, String> = [
            ("From", "whatsapp:+15551234"),
            ("Body", "hello"),
            ("NumMedia", "0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let signature = {
            use hmac::{Hmac, Mac};
            let mut mac = Hmac::<sha1::Sha1>::new_from_slice(b"12345").unwrap();
            mac.update(
                b"https://example.com/twilio-webhookBodyhelloFromwhatsapp:+15551234NumMedia0",
            );
            STANDARD.encode(mac.finalize().into_bytes())
        };

        assert!(client.verify_signature(url, &params, &signature));
        assert!(!client.verify_signature(url, &params, "invalid_signature"));
        assert!(!client.verify_signature(url, &params, "not base64!"));
        assert!(!client.verify_signature(url, &params, ""));

        // right length, wrong bytes
        let mut flipped = STANDARD.decode(&signature).unwrap();
        flipped[0] ^= 0x01;
        assert!(!client.verify_signature(url, &params, &STANDARD.encode(flipped)));

        let mut tampered = params.clone();
        tampered.insert("Body".to_string(), "bye".to_string());
        assert!(!client.verify_signature(url, &tampered, &signature));
    }
}

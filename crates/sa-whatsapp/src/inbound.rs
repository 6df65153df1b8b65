//! Inbound webhook payloads

use std::collections::BTreeMap;

/// Incoming WhatsApp message from Twilio webhook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomingMessage {
    pub from: String,
    pub to: Option<String>,
    pub body: Option<String>,
    pub num_media: Option<String>,
    pub media_url0: Option<String>,
    pub media_content_type0: Option<String>,
    pub message_sid: Option<String>,
    pub account_sid: Option<String>,
}

/// What kind of message the user sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Text(String),
    Image {
        url: String,
        mime: String,
        caption: String,
    },
    Audio {
        url: String,
        mime: String,
    },
    UnsupportedMedia(String),
    Empty,
}

impl IncomingMessage {
    /// Build from the raw form parameters Twilio posted
    pub fn from_params(params: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| params.get(key).cloned();

        Self {
            from: get("From").unwrap_or_default(),
            to: get("To"),
            body: get("Body"),
            num_media: get("NumMedia"),
            media_url0: get("MediaUrl0"),
            media_content_type0: get("MediaContentType0"),
            message_sid: get("MessageSid"),
            account_sid: get("AccountSid"),
        }
    }

    /// Sender number without the `whatsapp:` prefix
    pub fn phone_number(&self) -> &str {
        self.from.strip_prefix("whatsapp:").unwrap_or(&self.from)
    }

    pub fn num_media(&self) -> u32 {
        self.num_media
            .as_deref()
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    pub fn classify(&self) -> InboundKind {
        let media_url = self
            .media_url0
            .as_deref()
            .filter(|url| !url.trim().is_empty());

        if let (true, Some(url)) = (self.num_media() > 0, media_url) {
            let mime = self.media_content_type0.clone().unwrap_or_default();
            return if mime.starts_with("image/") {
                InboundKind::Image {
                    url: url.to_string(),
                    mime,
                    caption: self.body().trim().to_string(),
                }
            } else if mime.starts_with("audio/") {
                InboundKind::Audio {
                    url: url.to_string(),
                    mime,
                }
            } else {
                InboundKind::UnsupportedMedia(mime)
            };
        }

        let text = self.body().trim();
        if text.is_empty() {
            InboundKind::Empty
        } else {
            InboundKind::Text(text.to_string())
        }
    }
}

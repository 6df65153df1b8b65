//! Minimal TwiML messaging response

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::error::{Result, WhatsAppError};

/// Empty `<Response>` document acknowledging Twilio's webhook call.
/// Replies go out through the REST API instead of inline `<Message>` elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagingResponse;

impl MessagingResponse {
    pub fn new() -> Self {
        Self
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        let events = [
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
            Event::Start(BytesStart::new("Response")),
            Event::End(BytesEnd::new("Response")),
        ];
        for event in events {
            writer
                .write_event(event)
                .map_err(|e| WhatsAppError::Twiml(e.to_string()))?;
        }

        String::from_utf8(writer.into_inner()).map_err(|e| WhatsAppError::Twiml(e.to_string()))
    }
}

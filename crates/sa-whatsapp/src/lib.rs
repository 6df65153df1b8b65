//! sa-whatsapp: WhatsApp front end for the skill assessor via Twilio API
//!
//! Receives Twilio webhooks, relays text, images and voice notes to the
//! assessment pipeline and sends progress and results back as WhatsApp
//! messages.

pub mod bot;
pub mod error;
pub mod format;
pub mod handler;
pub mod inbound;
pub mod session;
pub mod twilio;
pub mod twiml;
pub mod webhook;

pub use bot::WhatsAppBot;
pub use error::{Result, WhatsAppError};
pub use handler::MessageHandler;
pub use inbound::{InboundKind, IncomingMessage};
pub use session::InMemorySessionStore;
pub use twilio::{MessagingProvider, TwilioClient};
pub use twiml::MessagingResponse;
pub use webhook::{WebhookServer, WebhookState};

//! Error types for sa-whatsapp

use thiserror::Error;

/// sa-whatsapp error type
#[derive(Error, Debug)]
pub enum WhatsAppError {
    #[error("Twilio credentials not set")]
    CredentialsNotSet,

    #[error("Webhook signature verification failed")]
    SignatureVerificationFailed,

    #[error("Twilio API error: {0}")]
    Api(String),

    #[error("Media download failed with status {0}")]
    MediaDownload(u16),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("TwiML error: {0}")]
    Twiml(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for WhatsAppError {
    fn from(err: reqwest::Error) -> Self {
        WhatsAppError::Http(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WhatsAppError>;

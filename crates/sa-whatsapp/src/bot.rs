//! WhatsApp bot wrapper

use std::sync::Arc;

use sa_core::{AssessmentPipeline, Config};
use tracing::info;

use crate::error::{Result, WhatsAppError};
use crate::handler::MessageHandler;
use crate::session::InMemorySessionStore;
use crate::twilio::TwilioClient;
use crate::webhook::{SignatureValidation, WebhookServer, WebhookState};

/// WhatsApp bot wrapper
pub struct WhatsAppBot {
    twilio_client: Arc<TwilioClient>,
    pipeline: Arc<AssessmentPipeline>,
    sessions: InMemorySessionStore,
    host: String,
    port: u16,
    public_url: Option<String>,
}

impl WhatsAppBot {
    /// Create a new WhatsApp bot from application config
    pub fn new(config: &Config, pipeline: Arc<AssessmentPipeline>) -> Result<Self> {
        let twilio_client = Arc::new(TwilioClient::from_config(
            &config.twilio,
            config.assessment.max_message_length,
        )?);

        let public_url = if config.webhook.validate_signature {
            let url = config.webhook.public_url.clone().ok_or_else(|| {
                WhatsAppError::Config(
                    "WEBHOOK_PUBLIC_URL is required when signature validation is enabled"
                        .to_string(),
                )
            })?;
            Some(url)
        } else {
            None
        };

        Ok(Self {
            twilio_client,
            pipeline,
            sessions: InMemorySessionStore::new(),
            host: config.server.host.clone(),
            port: config.server.port,
            public_url,
        })
    }

    fn state(&self) -> WebhookState {
        let handler = MessageHandler::new(
            Arc::clone(&self.pipeline),
            self.twilio_client.clone(),
            self.sessions.clone(),
        );

        WebhookState {
            handler: Arc::new(handler),
            signature: self.public_url.as_ref().map(|url| SignatureValidation {
                client: Arc::clone(&self.twilio_client),
                public_url: url.clone(),
            }),
        }
    }

    /// Start the bot (webhook server)
    pub async fn start(self) -> Result<()> {
        info!(
            from = self.twilio_client.from_number(),
            signature_validation = self.public_url.is_some(),
            "Starting WhatsApp skill assessment bot"
        );
        let server = WebhookServer::new(&self.host, self.port, self.state());
        server.start().await
    }

    /// Get the Twilio client for direct use
    pub fn twilio_client(&self) -> Arc<TwilioClient> {
        Arc::clone(&self.twilio_client)
    }
}

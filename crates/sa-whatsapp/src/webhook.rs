//! Webhook server for receiving WhatsApp messages from Twilio

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::{Result, WhatsAppError};
use crate::handler::MessageHandler;
use crate::inbound::IncomingMessage;
use crate::twiml::MessagingResponse;
use crate::twilio::TwilioClient;

const SIGNATURE_HEADER: &str = "x-twilio-signature";

/// Checks `X-Twilio-Signature` against the public webhook URL
pub struct SignatureValidation {
    pub client: Arc<TwilioClient>,
    pub public_url: String,
}

/// Webhook server state
pub struct WebhookState {
    pub handler: Arc<MessageHandler>,
    pub signature: Option<SignatureValidation>,
}

/// Webhook server
pub struct WebhookServer {
    addr: String,
    state: Arc<WebhookState>,
}

impl WebhookServer {
    /// Create a new webhook server listening on `host:port`
    pub fn new(host: &str, port: u16, state: WebhookState) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            state: Arc::new(state),
        }
    }

    /// Start the webhook server
    pub async fn start(self) -> Result<()> {
        info!("Starting WhatsApp webhook server on {}", self.addr);
        info!("Webhook URL: http://{}/twilio-webhook", self.addr);

        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| WhatsAppError::Config(format!("Failed to bind {}: {}", self.addr, e)))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| WhatsAppError::Http(e.to_string()))?;

        Ok(())
    }
}

/// All webhook routes
pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/twilio-webhook", post(handle_webhook))
        .route("/", get(service_info).post(handle_webhook))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "features": ["text", "images", "native_audio"],
    }))
}

async fn service_info() -> impl IntoResponse {
    Json(json!({
        "service": "skill-assessor",
        "description": "WhatsApp job skill assessment bot",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "webhook": "POST /twilio-webhook",
            "health": "GET /health",
        },
    }))
}

fn twiml(response: MessagingResponse) -> Response {
    match response.to_xml() {
        Ok(xml) => ([(header::CONTENT_TYPE, "application/xml")], xml).into_response(),
        Err(e) => {
            error!("Failed to build TwiML response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handle incoming WhatsApp webhook
async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    Form(params): Form<BTreeMap<String, String>>,
) -> Response {
    if let Some(validation) = &state.signature {
        let Some(signature) = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            warn!("Missing X-Twilio-Signature header");
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        };

        if !validation
            .client
            .verify_signature(&validation.public_url, &params, signature)
        {
            warn!("{}", WhatsAppError::SignatureVerificationFailed);
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        }
    }

    let msg = IncomingMessage::from_params(&params);
    info!(
        from = %msg.from,
        num_media = msg.num_media(),
        media_type = msg.media_content_type0.as_deref().unwrap_or(""),
        "Received WhatsApp message"
    );

    // Twilio times out webhooks after 15s; assessment runs after the ack
    let handler = Arc::clone(&state.handler);
    tokio::spawn(async move {
        handler.handle(msg).await;
    });

    twiml(MessagingResponse::new())
}

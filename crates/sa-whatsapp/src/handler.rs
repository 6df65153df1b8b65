//! Conversation flow for one inbound WhatsApp message
//!
//! Each step reports progress to the user as a separate message, so the
//! handler talks to the user through `MessagingProvider` rather than the
//! webhook's HTTP response.

use std::sync::Arc;

use sa_core::{
    mentions_stitching, AssessmentPipeline, AssessmentPlan, Error as CoreError, MediaPayload,
    UserInput,
};
use tracing::{error, info, warn};

use crate::format::{
    detailed_assessment, encouragement, final_result_line, is_greeting, welcome_message,
};
use crate::inbound::{InboundKind, IncomingMessage};
use crate::session::InMemorySessionStore;
use crate::twilio::MessagingProvider;

const DEFAULT_IMAGE_QUERY: &str = "Here is my work sample for job skill assessment";
const VOICE_QUERY: &str = "voice message";
const UNSUPPORTED_MEDIA: &str =
    "📱 I can process text messages, images, and voice messages for skill assessments.";
const SHARE_IMAGE_HINT: &str =
    "📸 Please share a clear photo of your stitching work so I can assess it!";
const RESET_DONE: &str =
    "🔄 Your session has been reset. Send a photo of your work to start a new assessment.";

pub struct MessageHandler {
    pipeline: Arc<AssessmentPipeline>,
    messenger: Arc<dyn MessagingProvider>,
    sessions: InMemorySessionStore,
}

impl MessageHandler {
    pub fn new(
        pipeline: Arc<AssessmentPipeline>,
        messenger: Arc<dyn MessagingProvider>,
        sessions: InMemorySessionStore,
    ) -> Self {
        Self {
            pipeline,
            messenger,
            sessions,
        }
    }

    pub fn sessions(&self) -> &InMemorySessionStore {
        &self.sessions
    }

    /// Process one message end to end; failures become apology messages
    pub async fn handle(&self, msg: IncomingMessage) {
        let phone = msg.phone_number().to_string();
        if phone.is_empty() {
            warn!("Ignoring webhook without a sender");
            return;
        }

        match msg.classify() {
            InboundKind::Text(text) => self.handle_text(&phone, &text).await,
            InboundKind::Image { url, mime, caption } => {
                self.handle_image(&phone, &url, &mime, &caption).await
            }
            InboundKind::Audio { url, mime } => self.handle_audio(&phone, &url, &mime).await,
            InboundKind::UnsupportedMedia(mime) => {
                info!("Unsupported media type from {}: {}", phone, mime);
                self.say(&phone, UNSUPPORTED_MEDIA).await;
            }
            InboundKind::Empty => self.say(&phone, welcome_message()).await,
        }
    }

    async fn say(&self, phone: &str, text: &str) {
        if let Err(e) = self.messenger.send_text(phone, text).await {
            error!("Failed to send message to {}: {}", phone, e);
        }
    }

    async fn handle_text(&self, phone: &str, text: &str) {
        info!("Processing text from {}: {}", phone, text);
        let command = text.trim().to_lowercase();

        if command == "/reset" {
            self.sessions.clear(phone).await;
            self.say(phone, RESET_DONE).await;
            return;
        }
        if command == "/help" || is_greeting(text) {
            self.say(phone, welcome_message()).await;
            return;
        }

        let plan = match self.pipeline.plan(&UserInput::text(text)).await {
            Ok(plan) => plan,
            Err(e) => {
                error!("Error in Master Agent text processing: {}", e);
                self.say(
                    phone,
                    "❌ I encountered an error. Please try again or send me an image/voice message of your work! 📸🎤",
                )
                .await;
                return;
            }
        };

        let response = plan.response_or("I can help you with skill assessment.");
        self.say(phone, &format!("🎯 {response}")).await;

        let image = self.sessions.last_image(phone).await;
        if plan.has_instructions() {
            self.delegate_and_respond(phone, &plan, image.as_ref()).await;
        } else if image.is_none() && mentions_stitching(response) {
            self.say(phone, SHARE_IMAGE_HINT).await;
        }
    }

    async fn handle_image(&self, phone: &str, url: &str, mime: &str, caption: &str) {
        info!("Processing image from {} with caption: {}", phone, caption);
        self.say(phone, "📥 Downloading your image...").await;

        let image = match self.messenger.fetch_media(url).await {
            Ok(media) => with_reported_mime(media, mime),
            Err(e) => {
                error!("Failed to download image: {}", e);
                self.say(phone, "❌ Sorry, I couldn't download your image. Please try again.")
                    .await;
                return;
            }
        };
        self.sessions.remember_image(phone, image.clone()).await;

        self.say(phone, "🧠 Master Agent analyzing your request...").await;
        let query = if caption.trim().is_empty() {
            DEFAULT_IMAGE_QUERY
        } else {
            caption
        };

        let input = UserInput::text(query).with_image(image.clone());
        let plan = match self.pipeline.plan(&input).await {
            Ok(plan) => plan,
            Err(e) => {
                error!("Error in Master Agent image processing: {}", e);
                self.say(phone, &format!("❌ Master Agent error: {e}. Please try again."))
                    .await;
                return;
            }
        };

        let response = plan.response_or("Processing your skill assessment...");
        self.say(phone, &format!("🎯 Master Agent: {response}")).await;

        if plan.has_instructions() {
            self.delegate_and_respond(phone, &plan, Some(&image)).await;
        } else {
            info!("No sub-agent instructions from Master Agent");
        }
    }

    async fn handle_audio(&self, phone: &str, url: &str, mime: &str) {
        info!("Processing voice message from {}", phone);
        self.say(phone, "🎤 Processing your voice message...").await;

        let audio = match self.messenger.fetch_media(url).await {
            Ok(media) => with_reported_mime(media, mime),
            Err(e) => {
                error!("Failed to download voice message: {}", e);
                self.say(
                    phone,
                    "❌ Sorry, I couldn't download your voice message. Please try again.",
                )
                .await;
                return;
            }
        };

        self.say(phone, "🧠 Analyzing audio with Master Agent...").await;
        let input = UserInput::text(VOICE_QUERY).with_audio(audio);
        let plan = match self.pipeline.plan(&input).await {
            Ok(plan) => plan,
            Err(e) => {
                error!("Error processing voice message from {}: {}", phone, e);
                self.say(
                    phone,
                    &format!("❌ An error occurred with audio analysis: {e}. Please try again."),
                )
                .await;
                return;
            }
        };

        let response = plan.response_or("I can help with skill assessment.");
        self.say(phone, &format!("🎯 {response}")).await;

        if plan.has_instructions() {
            let image = self.sessions.last_image(phone).await;
            self.delegate_and_respond(phone, &plan, image.as_ref()).await;
        }
    }

    async fn delegate_and_respond(
        &self,
        phone: &str,
        plan: &AssessmentPlan,
        image: Option<&MediaPayload>,
    ) {
        let Some(role) = plan.target_role() else {
            error!("Assessment plan has instructions but no role");
            self.say(
                phone,
                &format!("❌ Sub-agent execution error: {}", CoreError::MissingRole),
            )
            .await;
            return;
        };

        self.say(phone, "🔧 Executing specialized sub-agents...").await;

        let mut reports = Vec::with_capacity(plan.sub_agent_instructions.len());
        for instruction in &plan.sub_agent_instructions {
            self.say(
                phone,
                &format!(
                    "🤖 {} analyzing {}...",
                    instruction.agent_name,
                    instruction.task_context.skill()
                ),
            )
            .await;
            reports.push(self.pipeline.delegate_one(instruction, image).await);
        }

        self.say(phone, "⚖️ Master Agent making final decision...").await;
        let verdict = match self.pipeline.verdict(role, &reports).await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!("Error getting final verdict: {}", e);
                self.say(phone, &format!("❌ Sub-agent execution error: {e}")).await;
                return;
            }
        };

        self.say(
            phone,
            &format!(
                "🏁 **Final Assessment:**\n{}",
                verdict.response_or("Assessment completed.")
            ),
        )
        .await;

        let assessment = reports.iter().find_map(|r| r.result.assessment());
        if let Some(assessment) = &assessment {
            self.say(phone, &detailed_assessment(assessment)).await;
        }

        self.say(phone, &final_result_line(verdict.decision())).await;

        if let Some(assessment) = &assessment {
            self.say(phone, encouragement(assessment.quality_rating)).await;
        }
    }
}

/// Prefer the content type Twilio reported in the webhook
fn with_reported_mime(mut media: MediaPayload, mime: &str) -> MediaPayload {
    if !mime.trim().is_empty() {
        media.mime_type = mime.trim().to_string();
    }
    media
}


#[cfg(test)]
mod tests {
    use super::testing::{RecordingMessenger, ScriptedGenerator};
    use super::*;
    use sa_core::KnowledgeBase;

    const PLAN: &str = r#"{"response_to_user": "Let's check your stitching.",
        "sub_agent_instructions": [{"agent_name": "StitchingAssessorAgent",
        "task_context": {"role": "Tailor", "skill_to_assess": "Stitching"}}]}"#;
    const ASSESSMENT: &str = r#"{"quality_rating": 8, "stitch_type": "Back stitch",
        "technical_issues": ["Slight wobble"], "improvement_suggestions": ["Use a ruler"],
        "professional_grade": "advanced", "pass_fail": "pass"}"#;
    const VERDICT: &str = r#"{"response_to_user": "You meet the Tailor standard.",
        "final_decision_data": {"decision": "PASS", "reasoning": "8/10"}}"#;

    fn handler(
        generator: Arc<ScriptedGenerator>,
        messenger: Arc<RecordingMessenger>,
    ) -> MessageHandler {
        let pipeline =
            AssessmentPipeline::with_generator(generator, KnowledgeBase::builtin().unwrap());
        MessageHandler::new(Arc::new(pipeline), messenger, InMemorySessionStore::new())
    }

    fn inbound(pairs: &[(&str, &str)]) -> IncomingMessage {
        let params = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IncomingMessage::from_params(&params)
    }

    #[tokio::test]
    async fn test_greeting_sends_welcome_without_model() {
        let generator = Arc::new(ScriptedGenerator::replying(&[]));
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(generator.clone(), messenger.clone());

        handler
            .handle(inbound(&[("From", "whatsapp:+1555"), ("Body", "Hello")]))
            .await;

        let sent = messenger.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+1555");
        assert_eq!(sent[0].1, welcome_message());
        assert!(generator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_runs_full_assessment() {
        let generator = Arc::new(ScriptedGenerator::replying(&[PLAN, ASSESSMENT, VERDICT]));
        let messenger = Arc::new(RecordingMessenger::with_media(
            "https://media/ME1",
            MediaPayload::new("application/octet-stream", vec![1, 2, 3]),
        ));
        let handler = handler(generator.clone(), messenger.clone());

        handler
            .handle(inbound(&[
                ("From", "whatsapp:+1555"),
                ("NumMedia", "1"),
                ("MediaUrl0", "https://media/ME1"),
                ("MediaContentType0", "image/jpeg"),
            ]))
            .await;

        let texts = messenger.texts();
        assert_eq!(texts[0], "📥 Downloading your image...");
        assert_eq!(texts[1], "🧠 Master Agent analyzing your request...");
        assert_eq!(texts[2], "🎯 Master Agent: Let's check your stitching.");
        assert_eq!(texts[3], "🔧 Executing specialized sub-agents...");
        assert_eq!(texts[4], "🤖 StitchingAssessorAgent analyzing Stitching...");
        assert_eq!(texts[5], "⚖️ Master Agent making final decision...");
        assert_eq!(texts[6], "🏁 **Final Assessment:**\nYou meet the Tailor standard.");
        assert!(texts[7].contains("**Quality Rating:** 8/10"));
        assert_eq!(texts[8], "✅ **Final Result: PASS**");
        assert_eq!(texts[9], "🌟 Excellent professional quality work!");

        let plan_prompt = generator.calls.lock().unwrap()[0]
            .iter()
            .filter_map(|p| p.as_text())
            .collect::<String>();
        assert!(plan_prompt.contains(DEFAULT_IMAGE_QUERY));

        let stored = handler.sessions().last_image("+1555").await.unwrap();
        assert_eq!(stored.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_text_reuses_stored_image() {
        let generator = Arc::new(ScriptedGenerator::replying(&[PLAN, ASSESSMENT, VERDICT]));
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(generator.clone(), messenger.clone());
        handler
            .sessions()
            .remember_image("+1555", MediaPayload::new("image/png", vec![7; 8]))
            .await;

        handler
            .handle(inbound(&[("From", "whatsapp:+1555"), ("Body", "Assess me for Tailor")]))
            .await;

        assert_eq!(generator.calls.lock().unwrap().len(), 3);
        assert!(messenger.texts().contains(&"✅ **Final Result: PASS**".to_string()));
    }

    #[tokio::test]
    async fn test_text_without_instructions_hints_for_photo() {
        let generator = Arc::new(ScriptedGenerator::replying(&[
            r#"{"response_to_user": "To apply as a Tailor, send a stitching sample."}"#,
        ]));
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(generator, messenger.clone());

        handler
            .handle(inbound(&[("From", "whatsapp:+1555"), ("Body", "I want a job")]))
            .await;

        assert_eq!(
            messenger.texts(),
            vec![
                "🎯 To apply as a Tailor, send a stitching sample.".to_string(),
                SHARE_IMAGE_HINT.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_download_failure_apologises() {
        let generator = Arc::new(ScriptedGenerator::replying(&[]));
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(generator, messenger.clone());

        handler
            .handle(inbound(&[
                ("From", "whatsapp:+1555"),
                ("NumMedia", "1"),
                ("MediaUrl0", "https://media/missing"),
                ("MediaContentType0", "image/jpeg"),
            ]))
            .await;

        assert_eq!(
            messenger.texts().last().map(String::as_str),
            Some("❌ Sorry, I couldn't download your image. Please try again.")
        );
    }

    #[tokio::test]
    async fn test_audio_sends_inline_audio() {
        let generator = Arc::new(ScriptedGenerator::replying(&[
            r#"{"response_to_user": "I heard you want to be a tailor. Please send a photo."}"#,
        ]));
        let messenger = Arc::new(RecordingMessenger::with_media(
            "https://media/ME2",
            MediaPayload::new("audio/ogg", vec![4; 16]),
        ));
        let handler = handler(generator.clone(), messenger.clone());

        handler
            .handle(inbound(&[
                ("From", "whatsapp:+1555"),
                ("NumMedia", "1"),
                ("MediaUrl0", "https://media/ME2"),
                ("MediaContentType0", "audio/ogg; codecs=opus"),
            ]))
            .await;

        let texts = messenger.texts();
        assert_eq!(texts[0], "🎤 Processing your voice message...");
        assert_eq!(texts[1], "🧠 Analyzing audio with Master Agent...");
        assert!(texts[2].starts_with("🎯 I heard you"));

        let calls = generator.calls.lock().unwrap();
        assert!(calls[0].iter().any(|p| p.is_inline_data()));
    }

    #[tokio::test]
    async fn test_reset_and_unsupported() {
        let generator = Arc::new(ScriptedGenerator::replying(&[]));
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(generator, messenger.clone());
        handler
            .sessions()
            .remember_image("+1555", MediaPayload::new("image/png", vec![1]))
            .await;

        handler
            .handle(inbound(&[("From", "whatsapp:+1555"), ("Body", "/reset")]))
            .await;
        assert!(handler.sessions().last_image("+1555").await.is_none());

        handler
            .handle(inbound(&[
                ("From", "whatsapp:+1555"),
                ("NumMedia", "1"),
                ("MediaUrl0", "https://media/doc"),
                ("MediaContentType0", "application/pdf"),
            ]))
            .await;

        assert_eq!(messenger.texts(), vec![RESET_DONE.to_string(), UNSUPPORTED_MEDIA.to_string()]);
    }

    #[tokio::test]
    async fn test_plan_error_apologises() {
        let generator = Arc::new(ScriptedGenerator::replying(&[]));
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(generator, messenger.clone());

        handler
            .handle(inbound(&[("From", "whatsapp:+1555"), ("Body", "assess my seam")]))
            .await;

        let texts = messenger.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("❌ I encountered an error."));
    }
}

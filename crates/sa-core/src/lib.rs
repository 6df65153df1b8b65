//! sa-core: Skill Assessor Core Library
//!
//! Gemini client, master/sub-agent orchestration and the stitching
//! assessment model shared by the WhatsApp bot and the local CLI.

pub mod agents;
pub mod assessment;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;

pub use agents::{
    AssessmentPlan, Decision, FinalVerdict, KnowledgeBase, MasterAgent, MediaPayload, SubAgent,
    SubAgentOutcome, SubAgentRegistry, SubAgentReport, UserInput, mentions_stitching,
};
pub use assessment::{RatingBand, StitchingAssessment, Verdict};
pub use config::{
    AssessmentConfig, Config, GeminiConfig, ServerConfig, TwilioConfig, WebhookConfig,
};
pub use error::{Error, Result};
pub use llm::{ContentGenerator, GeminiClient, Part};
pub use pipeline::{AssessmentPipeline, AssessmentRun};

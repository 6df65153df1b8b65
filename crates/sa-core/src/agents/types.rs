//! Agent types and trait definitions
//!
//! - `UserInput` / `MediaPayload`: what a user submitted
//! - `AssessmentPlan`: the master agent's delegation plan
//! - `SubAgent` trait: interface for specialized assessors
//! - `FinalVerdict`: the master agent's hiring decision

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::assessment::StitchingAssessment;

/// Raw media downloaded from the messaging provider or read from disk
#[derive(Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaPayload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Mime type without parameters, e.g. `audio/ogg; codecs=opus` -> `audio/ogg`
    pub fn essence(&self) -> &str {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
    }

    pub fn is_image(&self) -> bool {
        self.essence().starts_with("image/")
    }

    pub fn is_audio(&self) -> bool {
        self.essence().starts_with("audio/")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Keep multi-megabyte payloads out of debug logs
impl fmt::Debug for MediaPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One user submission, in any combination of modalities
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub query: String,
    pub image: Option<MediaPayload>,
    pub audio: Option<MediaPayload>,
}

impl UserInput {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: MediaPayload) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_audio(mut self, audio: MediaPayload) -> Self {
        self.audio = Some(audio);
        self
    }
}

/// Context the master agent hands to a sub-agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub skill_to_assess: Option<String>,
    /// Any additional fields the model chose to include
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TaskContext {
    pub fn role(&self) -> &str {
        self.role.as_deref().unwrap_or("Unknown")
    }

    pub fn skill(&self) -> &str {
        self.skill_to_assess.as_deref().unwrap_or("Unknown")
    }
}

/// A single delegation step in the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAgentInstruction {
    #[serde(default = "unknown_agent")]
    pub agent_name: String,
    #[serde(default)]
    pub task_context: TaskContext,
}

fn unknown_agent() -> String {
    "Unknown".to_string()
}

/// Output of the master agent's planning step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentPlan {
    #[serde(default)]
    pub response_to_user: String,
    #[serde(default)]
    pub sub_agent_instructions: Vec<SubAgentInstruction>,
}

impl AssessmentPlan {
    /// Plan that only talks back to the user
    pub fn reply_only(text: impl Into<String>) -> Self {
        Self {
            response_to_user: text.into(),
            sub_agent_instructions: Vec::new(),
        }
    }

    pub fn response_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.response_to_user.trim().is_empty() {
            fallback
        } else {
            &self.response_to_user
        }
    }

    pub fn has_instructions(&self) -> bool {
        !self.sub_agent_instructions.is_empty()
    }

    /// Role named by the first instruction
    pub fn target_role(&self) -> Option<&str> {
        self.sub_agent_instructions
            .first()
            .and_then(|i| i.task_context.role.as_deref())
            .filter(|r| !r.trim().is_empty())
    }
}

/// What a sub-agent produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubAgentOutcome {
    Success { data: serde_json::Value },
    Error { message: String },
}

impl SubAgentOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Interpret successful data as a stitching assessment
    pub fn assessment(&self) -> Option<StitchingAssessment> {
        match self {
            Self::Success { data } => serde_json::from_value(data.clone()).ok(),
            Self::Error { .. } => None,
        }
    }
}

/// A sub-agent result as reported back to the master agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAgentReport {
    pub agent_name: String,
    pub skill_assessed: String,
    pub result: SubAgentOutcome,
}

/// Final hiring decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Pass,
    Fail,
    #[default]
    Pending,
}

impl Decision {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "PASS" => Self::Pass,
            "FAIL" => Self::Fail,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Pending => write!(f, "PENDING"),
        }
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionData {
    #[serde(default)]
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Output of the master agent's verdict step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalVerdict {
    #[serde(default)]
    pub response_to_user: String,
    #[serde(default)]
    pub final_decision_data: DecisionData,
}

impl FinalVerdict {
    pub fn decision(&self) -> Decision {
        self.final_decision_data.decision
    }

    pub fn response_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.response_to_user.trim().is_empty() {
            fallback
        } else {
            &self.response_to_user
        }
    }
}

/// Interface for specialized skill assessors
#[async_trait]
pub trait SubAgent: Send + Sync {
    /// Name the master agent uses to address this agent
    fn name(&self) -> &str;

    /// Short description for the sub-agent library
    fn description(&self) -> &str;

    /// Assess the work sample; never fails, errors become `SubAgentOutcome::Error`
    async fn execute(&self, image: Option<&MediaPayload>, context: &TaskContext)
    -> SubAgentOutcome;
}

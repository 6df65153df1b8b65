//! Master agent: plans delegation and issues the final verdict

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::knowledge::KnowledgeBase;
use super::types::{
    AssessmentPlan, Decision, DecisionData, FinalVerdict, SubAgentReport, UserInput,
};
use crate::error::Result;
use crate::llm::{parse_model_json, ContentGenerator, Part};

const PLAN_FORMAT: &str = r#"RESPONSE FORMAT:
Return a single JSON object and nothing else:
{
    "response_to_user": "<short WhatsApp-friendly reply to the candidate>",
    "sub_agent_instructions": [
        {
            "agent_name": "<sub-agent name from the library>",
            "task_context": {"role": "<target role>", "skill_to_assess": "<skill>"}
        }
    ]
}
Use an empty "sub_agent_instructions" list when no sub-agent should run yet."#;

const VERDICT_FORMAT: &str = r#"Weigh every sub-agent result against the pass criteria of the target role in the
competency map. A failed or missing result for a required skill means the candidate cannot
pass yet.

RESPONSE FORMAT:
Return a single JSON object and nothing else:
{
    "response_to_user": "<short WhatsApp-friendly explanation of the decision>",
    "final_decision_data": {
        "decision": "<PASS|FAIL>",
        "reasoning": "<one or two sentences>"
    }
}"#;

const AUDIO_NOTE: &str = "The user has provided an audio recording. Transcribe it and treat the transcription as their message, following your role as a master job assessor.";

const IMAGE_NOTE: &str = "The user has attached an image of their work sample.";

pub struct MasterAgent {
    generator: Arc<dyn ContentGenerator>,
    knowledge: KnowledgeBase,
}

impl MasterAgent {
    pub fn new(generator: Arc<dyn ContentGenerator>, knowledge: KnowledgeBase) -> Self {
        Self {
            generator,
            knowledge,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Decide which sub-agents should assess the user's submission
    pub async fn plan(&self, input: &UserInput) -> Result<AssessmentPlan> {
        let mut prompt = self.knowledge.instruction();
        prompt.push_str("\n\n--- USER INPUT ---\n");

        let query = input.query.trim();
        if !query.is_empty() {
            prompt.push_str(&format!("User message: \"{query}\"\n"));
        }
        if input.audio.is_some() {
            prompt.push_str(AUDIO_NOTE);
            prompt.push('\n');
        }
        if input.image.is_some() {
            prompt.push_str(IMAGE_NOTE);
            prompt.push('\n');
        }
        prompt.push('\n');
        prompt.push_str(PLAN_FORMAT);

        let mut parts = vec![Part::text(prompt)];
        if let Some(image) = &input.image {
            parts.push(Part::inline_bytes(image.essence(), &image.bytes));
        }
        if let Some(audio) = &input.audio {
            parts.push(Part::inline_bytes(audio.essence(), &audio.bytes));
        }

        debug!(
            has_image = input.image.is_some(),
            has_audio = input.audio.is_some(),
            "Requesting assessment plan"
        );
        let reply = self.generator.generate(parts).await?;

        match parse_model_json::<AssessmentPlan>(&reply) {
            Ok(plan) => {
                info!(
                    instructions = plan.sub_agent_instructions.len(),
                    "Master agent produced plan"
                );
                Ok(plan)
            }
            Err(e) => {
                warn!("Master agent plan was not valid JSON, replying with raw text: {}", e);
                Ok(AssessmentPlan::reply_only(reply.trim()))
            }
        }
    }

    /// Turn sub-agent results into a hiring decision for `role`
    pub async fn final_verdict(
        &self,
        role: &str,
        reports: &[SubAgentReport],
    ) -> Result<FinalVerdict> {
        let results = serde_json::to_string_pretty(reports)?;
        let prompt = format!(
            "{}\n\n--- FINAL VERDICT ---\n\nTARGET ROLE: {}\n\nSUB-AGENT RESULTS:\n{}\n\n{}",
            self.knowledge.instruction(),
            role,
            results,
            VERDICT_FORMAT
        );

        let reply = self.generator.generate(vec![Part::text(prompt)]).await?;

        match parse_model_json::<FinalVerdict>(&reply) {
            Ok(verdict) => {
                info!(role, decision = %verdict.decision(), "Master agent reached verdict");
                Ok(verdict)
            }
            Err(e) => {
                warn!("Master agent verdict was not valid JSON: {}", e);
                Ok(FinalVerdict {
                    response_to_user: reply.trim().to_string(),
                    final_decision_data: DecisionData {
                        decision: Decision::Pending,
                        reasoning: None,
                    },
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::{Error, Result};
    use crate::llm::{ContentGenerator, Part};

    /// Replays canned replies and records every prompt it receives
    #[derive(Default)]
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String>>>,
        pub calls: Mutex<Vec<Vec<Part>>>,
    }

    impl ScriptedGenerator {
        pub fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
        }

        pub fn prompt(&self, call: usize) -> String {
            self.calls.lock().unwrap()[call]
                .iter()
                .filter_map(|p| p.as_text())
                .collect::<Vec<_>>()
                .join("\n")
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate(&self, parts: Vec<Part>) -> Result<String> {
            self.calls.lock().unwrap().push(parts);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Other("no scripted reply left".to_string())))
        }
    }
}

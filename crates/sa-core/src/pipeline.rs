//! Plan, delegate, verdict
//!
//! The host drives the workflow; agents never call each other directly.
//! Each step is exposed on its own so a chat front end can report progress
//! between them, and `run` chains all three for batch callers.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

pub use crate::agents::{MediaPayload, SubAgentReport, UserInput};
use crate::agents::{
    AssessmentPlan, FinalVerdict, KnowledgeBase, MasterAgent, SubAgentInstruction,
    SubAgentRegistry,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::{ContentGenerator, GeminiClient};

/// Everything one pass through the pipeline produced
#[derive(Debug, Clone)]
pub struct AssessmentRun {
    pub plan: AssessmentPlan,
    pub reports: Vec<SubAgentReport>,
    /// `None` when the plan delegated nothing
    pub verdict: Option<FinalVerdict>,
}

pub struct AssessmentPipeline {
    master: MasterAgent,
    registry: SubAgentRegistry,
}

impl AssessmentPipeline {
    pub fn new(master: MasterAgent, registry: SubAgentRegistry) -> Self {
        Self { master, registry }
    }

    /// Pipeline with the built-in sub-agents sharing one generator
    pub fn with_generator(
        generator: Arc<dyn ContentGenerator>,
        knowledge: KnowledgeBase,
    ) -> Self {
        let registry = SubAgentRegistry::with_defaults(generator.clone());
        Self::new(MasterAgent::new(generator, knowledge), registry)
    }

    /// Gemini-backed pipeline from application config
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = GeminiClient::new(&config.gemini)?;
        let knowledge = KnowledgeBase::load(config.assessment.prompts_dir.as_deref().map(Path::new))?;
        info!(
            model = client.model(),
            roles = ?knowledge.roles(),
            "Assessment pipeline ready"
        );
        Ok(Self::with_generator(Arc::new(client), knowledge))
    }

    pub fn master(&self) -> &MasterAgent {
        &self.master
    }

    pub fn registry(&self) -> &SubAgentRegistry {
        &self.registry
    }

    /// Step 1: ask the master agent what to do
    pub async fn plan(&self, input: &UserInput) -> Result<AssessmentPlan> {
        self.master.plan(input).await
    }

    /// Run a single instruction and wrap the outcome for the verdict step
    pub async fn delegate_one(
        &self,
        instruction: &SubAgentInstruction,
        image: Option<&MediaPayload>,
    ) -> SubAgentReport {
        let result = self.registry.execute(instruction, image).await;
        SubAgentReport {
            agent_name: instruction.agent_name.clone(),
            skill_assessed: instruction.task_context.skill().to_string(),
            result,
        }
    }

    /// Step 2: run every instruction in order
    pub async fn delegate(
        &self,
        instructions: &[SubAgentInstruction],
        image: Option<&MediaPayload>,
    ) -> Vec<SubAgentReport> {
        let mut reports = Vec::with_capacity(instructions.len());
        for instruction in instructions {
            reports.push(self.delegate_one(instruction, image).await);
        }
        reports
    }

    /// Step 3: hand the reports back to the master agent
    pub async fn verdict(&self, role: &str, reports: &[SubAgentReport]) -> Result<FinalVerdict> {
        self.master.final_verdict(role, reports).await
    }

    #[instrument(skip_all, fields(query = %input.query))]
    pub async fn run(&self, input: &UserInput) -> Result<AssessmentRun> {
        let plan = self.plan(input).await?;
        if !plan.has_instructions() {
            return Ok(AssessmentRun {
                plan,
                reports: Vec::new(),
                verdict: None,
            });
        }

        let role = plan.target_role().ok_or(Error::MissingRole)?.to_string();
        let reports = self
            .delegate(&plan.sub_agent_instructions, input.image.as_ref())
            .await;
        let verdict = self.verdict(&role, &reports).await?;

        Ok(AssessmentRun {
            plan,
            reports,
            verdict: Some(verdict),
        })
    }
}

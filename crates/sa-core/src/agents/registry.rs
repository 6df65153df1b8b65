//! Sub-agent registry
//!
//! Maps the agent names the master agent uses to their implementations.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use super::stitching::StitchingAssessorAgent;
use super::types::{MediaPayload, SubAgent, SubAgentInstruction, SubAgentOutcome};
use crate::llm::ContentGenerator;

#[derive(Default)]
pub struct SubAgentRegistry {
    agents: HashMap<String, Arc<dyn SubAgent>>,
}

impl SubAgentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in assessor
    pub fn with_defaults(generator: Arc<dyn ContentGenerator>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(StitchingAssessorAgent::new(generator)));
        registry
    }

    pub fn register(&mut self, agent: Arc<dyn SubAgent>) {
        info!("Registering sub-agent: {}", agent.name());
        self.agents.insert(agent.name().to_string(), agent);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SubAgent>> {
        self.agents.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Run the agent an instruction names
    pub async fn execute(
        &self,
        instruction: &SubAgentInstruction,
        image: Option<&MediaPayload>,
    ) -> SubAgentOutcome {
        let Some(agent) = self.get(&instruction.agent_name) else {
            error!("Sub-agent '{}' not found in library.", instruction.agent_name);
            return SubAgentOutcome::error("Sub-agent not found.");
        };

        agent.execute(image, &instruction.task_context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::master::testing::ScriptedGenerator;
    use crate::agents::stitching::STITCHING_AGENT_NAME;
    use crate::agents::types::TaskContext;

    fn instruction(name: &str) -> SubAgentInstruction {
        SubAgentInstruction {
            agent_name: name.to_string(),
            task_context: TaskContext::default(),
        }
    }

    #[test]
    fn test_defaults_registered() {
        let registry = SubAgentRegistry::with_defaults(Arc::new(ScriptedGenerator::default()));
        assert_eq!(registry.names(), vec![STITCHING_AGENT_NAME]);
        assert!(registry.get(STITCHING_AGENT_NAME).is_some());
        assert!(!registry.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_agent() {
        let registry = SubAgentRegistry::new();
        let outcome = registry.execute(&instruction("WeldingAgent"), None).await;
        assert_eq!(outcome, SubAgentOutcome::error("Sub-agent not found."));
    }

    #[tokio::test]
    async fn test_dispatches_by_name() {
        let generator = Arc::new(ScriptedGenerator::replying(&[r#"{"quality_rating": 4}"#]));
        let registry = SubAgentRegistry::with_defaults(generator);

        let image = MediaPayload::new("image/png", vec![1, 2, 3]);
        let outcome = registry
            .execute(&instruction(STITCHING_AGENT_NAME), Some(&image))
            .await;
        assert_eq!(outcome.assessment().map(|a| a.quality_rating), Some(4));
    }
}

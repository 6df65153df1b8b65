//! Assessment agents
//!
//! ```text
//!            UserInput
//!                 │
//!                 ▼
//!   ┌────────────────────────────┐
//!   │ MasterAgent::plan          │  knowledge base + query + media
//!   └─────────────┬──────────────┘
//!                 │ SubAgentInstruction*
//!                 ▼
//!   ┌────────────────────────────┐
//!   │ SubAgentRegistry           │  StitchingAssessorAgent, ...
//!   └─────────────┬──────────────┘
//!                 │ SubAgentReport*
//!                 ▼
//!   ┌────────────────────────────┐
//!   │ MasterAgent::final_verdict │  PASS / FAIL
//!   └────────────────────────────┘
//! ```

pub mod knowledge;
pub mod master;
pub mod registry;
pub mod stitching;
pub mod types;

pub use knowledge::KnowledgeBase;
pub use master::MasterAgent;
pub use registry::SubAgentRegistry;
pub use stitching::{mentions_stitching, StitchingAssessorAgent, STITCHING_AGENT_NAME};
pub use types::{
    AssessmentPlan, Decision, DecisionData, FinalVerdict, MediaPayload, SubAgent,
    SubAgentInstruction, SubAgentOutcome, SubAgentReport, TaskContext, UserInput,
};

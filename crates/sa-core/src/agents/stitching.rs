//! Stitching quality assessor

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::types::{MediaPayload, SubAgent, SubAgentOutcome, TaskContext};
use crate::assessment::StitchingAssessment;
use crate::llm::{parse_model_json, ContentGenerator, Part};

pub const STITCHING_AGENT_NAME: &str = "StitchingAssessorAgent";

const STITCHING_KEYWORDS: &[&str] = &[
    "stitch", "sewing", "tailor", "fabric", "thread", "needle", "seam",
];

const EXPERT_PROMPT: &str = r#"You are a master tailor assessing a candidate who has completed a tailoring course and is starting a career. They have learnt traditional hand-stitching techniques, machine operation and quality control.

THE TASK THEY WERE GIVEN:
Stitch 100 squares of 1 cm by 1 cm on a 10 cm by 10 cm cloth.

PASS CRITERIA:
a. 70% or more of the squares are actually squares
b. 70% of the lines (10 horizontal parallel lines, 10 vertical parallel lines) are parallel to each other

ASSESSMENT CRITERIA:

1. STITCH QUALITY (1-10 scale):
- Evenness and consistency of stitches
- Thread tension (too tight/loose)
- Stitch length uniformity
- Seam alignment and straightness

2. TECHNICAL EXECUTION:
- Proper seam allowances
- Correct stitch type for fabric
- Finishing techniques
- Professional appearance

3. STRUCTURAL INTEGRITY:
- Seam strength
- Durability assessment
- Stress point reinforcement
- Overall construction quality

4. PROFESSIONAL STANDARDS:
- Industry acceptability
- Commercial viability
- Craftsmanship level
- Attention to detail

RATING SCALE:
- 1-2: Beginner level, major issues
- 3-4: Novice, needs significant improvement
- 5-6: Intermediate, acceptable for practice
- 7-8: Advanced, good quality work
- 9-10: Expert level, professional standard

RESPONSE FORMAT:
Return a JSON object with:
{
    "quality_rating": <1-10>,
    "stitch_type": "<identified stitch type>",
    "technical_issues": ["<max 2 key issues>"],
    "improvement_suggestions": ["<max 2 actionable tips>"],
    "professional_grade": "<beginner/novice/intermediate/advanced/expert>",
    "pass_fail": "<pass|fail>"
}

Keep each issue and suggestion under 50 characters.

Analyze the stitching with the precision of a professional tailor evaluating work for a medium size fashion house."#;

/// True when `text` talks about tailoring work
pub fn mentions_stitching(text: &str) -> bool {
    let lower = text.to_lowercase();
    STITCHING_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Grades a photo of a stitching sample with the expert-tailor prompt
pub struct StitchingAssessorAgent {
    generator: Arc<dyn ContentGenerator>,
}

impl StitchingAssessorAgent {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }

    fn prompt(context: &TaskContext) -> String {
        format!(
            "{EXPERT_PROMPT}\n\nRole context: {}\nSkill being assessed: {}",
            context.role(),
            context.skill_to_assess.as_deref().unwrap_or("Stitching")
        )
    }
}

#[async_trait]
impl SubAgent for StitchingAssessorAgent {
    fn name(&self) -> &str {
        STITCHING_AGENT_NAME
    }

    fn description(&self) -> &str {
        "Assesses stitching quality for tailor positions from a photo of a work sample"
    }

    async fn execute(
        &self,
        image: Option<&MediaPayload>,
        context: &TaskContext,
    ) -> SubAgentOutcome {
        let Some(image) = image else {
            return SubAgentOutcome::error(format!(
                "No image available for the '{}' assessment. Please send a photo of your work.",
                context.skill_to_assess.as_deref().unwrap_or("Stitching")
            ));
        };
        if image.is_empty() {
            return SubAgentOutcome::error("No image data provided");
        }
        if !image.is_image() {
            return SubAgentOutcome::error(format!(
                "Invalid image: unsupported media type {}",
                image.mime_type
            ));
        }

        info!(
            role = context.role(),
            bytes = image.len(),
            "Assessing stitching sample"
        );

        let parts = vec![
            Part::text(Self::prompt(context)),
            Part::inline_bytes(image.essence(), &image.bytes),
        ];
        let reply = match self.generator.generate(parts).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Stitching assessment failed: {}", e);
                return SubAgentOutcome::error(e.to_string());
            }
        };

        let assessment = parse_model_json::<StitchingAssessment>(&reply).unwrap_or_else(|e| {
            warn!("Stitching reply was not valid JSON, using text fallback: {}", e);
            StitchingAssessment::fallback_from_text(&reply)
        });

        info!(
            rating = assessment.quality_rating,
            verdict = %assessment.pass_fail,
            "Stitching analysis completed"
        );

        match serde_json::to_value(&assessment) {
            Ok(data) => SubAgentOutcome::Success { data },
            Err(e) => SubAgentOutcome::error(e.to_string()),
        }
    }
}

//! Chat formatting for assessment results

use sa_core::{Decision, StitchingAssessment};

/// WhatsApp's per-message body limit on Twilio
pub const DEFAULT_MESSAGE_LIMIT: usize = 1600;

const GREETINGS: &[&str] = &["hi", "hello", "start", "help"];

/// Cut `text` to at most `limit` characters, ending in "..." when shortened
pub fn truncate_for_whatsapp(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let keep = limit.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

/// Up to three bullet lines
pub fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        return "• None identified".to_string();
    }
    items
        .iter()
        .take(3)
        .map(|item| format!("• {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Up to two items on one line
pub fn format_list_compact(items: &[String]) -> String {
    if items.is_empty() {
        return "None".to_string();
    }
    items
        .iter()
        .take(2)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" | ")
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Multi-line breakdown sent after the final assessment
pub fn detailed_assessment(assessment: &StitchingAssessment) -> String {
    format!(
        "📊 **Detailed Analysis:**\n\n\
         {} **Quality Rating:** {}/10\n\
         📝 **Stitch Type:** {}\n\
         🎯 **Skill Level:** {}\n\n\
         ⚠️ **Technical Issues:**\n{}\n\n\
         💡 **Improvement Tips:**\n{}",
        assessment.band().emoji(),
        assessment.quality_rating,
        assessment.stitch_type,
        title_case(&assessment.professional_grade),
        format_list(&assessment.technical_issues),
        format_list(&assessment.improvement_suggestions),
    )
}

/// Compact single-message report
pub fn assessment_report(assessment: &StitchingAssessment) -> String {
    let band = assessment.band();
    let verdict_emoji = if assessment.pass_fail.is_pass() {
        "✅"
    } else {
        "❌"
    };

    format!(
        "🧵 STITCHING ASSESSMENT 🧵\n\n\
         {} Rating: {}/10\n\
         {} Result: {}\n\
         📝 Type: {}\n\
         🎯 Level: {}\n\n\
         ⚠️ Issues: {}\n\n\
         💡 Tips: {}\n\n\
         🎓 Feedback: {}",
        band.emoji(),
        assessment.quality_rating,
        verdict_emoji,
        assessment.pass_fail,
        title_case(&assessment.stitch_type),
        title_case(&assessment.professional_grade),
        format_list_compact(&assessment.technical_issues),
        format_list_compact(&assessment.improvement_suggestions),
        band.short_feedback(),
    )
}

pub fn encouragement(rating: u8) -> &'static str {
    if rating >= 8 {
        "🌟 Excellent professional quality work!"
    } else if rating >= 6 {
        "👍 Good progress! Focus on suggestions to reach pro level."
    } else {
        "💪 Keep practicing! Focus on fundamentals."
    }
}

pub fn decision_emoji(decision: Decision) -> &'static str {
    match decision {
        Decision::Pass => "✅",
        Decision::Fail => "❌",
        Decision::Pending => "⏳",
    }
}

pub fn final_result_line(decision: Decision) -> String {
    format!("{} **Final Result: {}**", decision_emoji(decision), decision)
}

pub fn welcome_message() -> &'static str {
    "🧵 Welcome to the Job Skill Assessment Bot!\n\n\
     I assess practical skills for job applications. Currently available role: Tailor.\n\n\
     📸 **How to use:**\n\
     1. Tell me which role you are applying for\n\
     2. Send a clear photo of your work sample\n\
     3. Get a detailed rating (1-10) and feedback\n\
     4. Receive a PASS/FAIL hiring decision\n\n\
     **What I can assess:**\n\
     • Hand stitching quality\n\
     • Machine stitch precision\n\
     • Seam construction\n\
     • Thread tension\n\
     • Professional finishing\n\n\
     You can also send a voice message. Send /reset to start over.\n\n\
     Send me your stitching photo to get started! 🪡"
}

/// Whole-word match against the greeting list
pub fn is_greeting(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETINGS.contains(&word))
}

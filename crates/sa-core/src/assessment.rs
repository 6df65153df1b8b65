//! Stitching assessment results and rating bands

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Lowest and highest rating the model may give
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

/// Rating at or above which a fallback assessment counts as a pass
const FALLBACK_PASS_RATING: u8 = 7;

static RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)rating[:\s]*(\d+)").expect("rating regex is valid")
});

/// Pass/fail verdict on a single work sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    #[default]
    Fail,
}

impl Verdict {
    /// Case-insensitive parse; anything but "pass" is a fail
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("pass") {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// Structured verdict the stitching assessor extracts from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchingAssessment {
    #[serde(deserialize_with = "deserialize_rating")]
    pub quality_rating: u8,
    #[serde(default = "unknown")]
    pub stitch_type: String,
    #[serde(default)]
    pub technical_issues: Vec<String>,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
    #[serde(default = "unknown")]
    pub professional_grade: String,
    #[serde(default, alias = "pass_fail_raw")]
    pub pass_fail: Verdict,
}

fn unknown() -> String {
    "unknown".to_string()
}

/// Accept integers, floats and numeric strings; clamp into 1..=10
fn deserialize_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    let raw = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| serde::de::Error::custom(format!("invalid quality_rating: {value}")))?;

    Ok(clamp_rating(raw.round() as i64))
}

fn clamp_rating(value: i64) -> u8 {
    value.clamp(MIN_RATING as i64, MAX_RATING as i64) as u8
}

impl StitchingAssessment {
    /// Best-effort assessment when the model ignored the JSON format
    pub fn fallback_from_text(text: &str) -> Self {
        let rating = RATING_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .map(clamp_rating)
            .unwrap_or(5);

        Self {
            quality_rating: rating,
            stitch_type: "general".to_string(),
            technical_issues: vec!["Could not parse detailed issues".to_string()],
            improvement_suggestions: vec!["Please refer to the detailed analysis".to_string()],
            professional_grade: "intermediate".to_string(),
            pass_fail: if rating >= FALLBACK_PASS_RATING {
                Verdict::Pass
            } else {
                Verdict::Fail
            },
        }
    }

    pub fn band(&self) -> RatingBand {
        RatingBand::for_rating(self.quality_rating)
    }
}

/// Skill band a 1-10 rating falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingBand {
    Beginner,
    Developing,
    Intermediate,
    Advanced,
    Expert,
}

impl RatingBand {
    /// Band for a rating; out-of-range values are clamped first
    pub fn for_rating(rating: u8) -> Self {
        match rating.clamp(MIN_RATING, MAX_RATING) {
            1..=2 => Self::Beginner,
            3..=4 => Self::Developing,
            5..=6 => Self::Intermediate,
            7..=8 => Self::Advanced,
            _ => Self::Expert,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Beginner => "🔴",
            Self::Developing => "🟠",
            Self::Intermediate => "🟡",
            Self::Advanced => "🟢",
            Self::Expert => "🏆",
        }
    }

    /// One-line feedback used in the compact report
    pub fn short_feedback(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner - Practice basic techniques",
            Self::Developing => "Developing - Work on consistency",
            Self::Intermediate => "Intermediate - Good foundation!",
            Self::Advanced => "Advanced - Professional quality emerging",
            Self::Expert => "Expert - Outstanding craftsmanship!",
        }
    }

    pub fn long_feedback(&self) -> &'static str {
        match self {
            Self::Beginner => {
                "Beginner level - Focus on basic techniques and hand positioning. Practice with simple straight lines."
            }
            Self::Developing => {
                "Developing skills - Work on consistency and tension control. Consider taking a basic tailoring course."
            }
            Self::Intermediate => {
                "Intermediate level - Good foundation! Focus on precision and finishing techniques."
            }
            Self::Advanced => {
                "Advanced work - Professional quality emerging. Refine details for commercial standards."
            }
            Self::Expert => {
                "Expert level - Outstanding craftsmanship! This meets high-end commercial standards."
            }
        }
    }
}

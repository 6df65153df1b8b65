//! Gemini API client and types

mod client;
pub mod json;
mod types;

pub use client::{ContentGenerator, GeminiClient};
pub use json::{extract_json_block, parse_model_json};
pub use types::*;

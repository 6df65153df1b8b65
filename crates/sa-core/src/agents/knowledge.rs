//! Master agent knowledge base
//!
//! The master agent is primed with a prompt template, a competency map
//! (role -> required skills) and a sub-agent library (agent -> what it
//! assesses). Defaults are compiled in; a prompts directory can replace them.

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const PROMPT_FILE: &str = "master_agent_prompt.md";
pub const COMPETENCY_MAP_FILE: &str = "competency_map.json";
pub const SUB_AGENT_LIBRARY_FILE: &str = "sub_agent_library.json";

const DEFAULT_PROMPT: &str = include_str!("../../prompts/master_agent_prompt.md");
const DEFAULT_COMPETENCY_MAP: &str = include_str!("../../prompts/competency_map.json");
const DEFAULT_SUB_AGENT_LIBRARY: &str = include_str!("../../prompts/sub_agent_library.json");

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    prompt_template: String,
    competency_map: JsonValue,
    sub_agent_library: JsonValue,
}

impl KnowledgeBase {
    /// Knowledge base compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_parts(
            DEFAULT_PROMPT,
            DEFAULT_COMPETENCY_MAP,
            DEFAULT_SUB_AGENT_LIBRARY,
        )
    }

    /// Load from `prompts_dir` if given, otherwise use the built-in defaults
    pub fn load(prompts_dir: Option<&Path>) -> Result<Self> {
        match prompts_dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::builtin(),
        }
    }

    /// Load from the first of `dir`, `../dir`, `../../dir` holding all three files
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let candidates = search_paths(dir);

        let Some(found) = candidates.iter().find(|c| has_all_files(c)) else {
            let searched = candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::KnowledgeBase(format!(
                "Could not find {PROMPT_FILE}, {COMPETENCY_MAP_FILE} and {SUB_AGENT_LIBRARY_FILE} in any of: {searched}"
            )));
        };

        info!("Loading knowledge base from {}", found.display());
        let prompt = std::fs::read_to_string(found.join(PROMPT_FILE))?;
        let competency_map = std::fs::read_to_string(found.join(COMPETENCY_MAP_FILE))?;
        let library = std::fs::read_to_string(found.join(SUB_AGENT_LIBRARY_FILE))?;

        Self::from_parts(&prompt, &competency_map, &library)
    }

    pub fn from_parts(prompt: &str, competency_map: &str, sub_agent_library: &str) -> Result<Self> {
        let competency_map = serde_json::from_str(competency_map)
            .map_err(|e| Error::KnowledgeBase(format!("Invalid competency map: {e}")))?;
        let sub_agent_library = serde_json::from_str(sub_agent_library)
            .map_err(|e| Error::KnowledgeBase(format!("Invalid sub-agent library: {e}")))?;

        Ok(Self {
            prompt_template: prompt.trim().to_string(),
            competency_map,
            sub_agent_library,
        })
    }

    /// Roles listed in the competency map
    pub fn roles(&self) -> Vec<&str> {
        self.competency_map
            .as_object()
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Sub-agent names listed in the library
    pub fn sub_agent_names(&self) -> Vec<&str> {
        self.sub_agent_library
            .as_object()
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Full system instruction: template followed by both JSON documents
    pub fn instruction(&self) -> String {
        let map = serde_json::to_string_pretty(&self.competency_map).unwrap_or_default();
        let library = serde_json::to_string_pretty(&self.sub_agent_library).unwrap_or_default();

        format!(
            "{}\n\n--- KNOWLEDGE BASE ---\n\nCompetency Map:\n{}\n\nSub-Agent Library:\n{}",
            self.prompt_template, map, library
        )
    }
}

fn search_paths(dir: &Path) -> Vec<PathBuf> {
    if dir.is_absolute() {
        return vec![dir.to_path_buf()];
    }
    vec![
        dir.to_path_buf(),
        Path::new("..").join(dir),
        Path::new("../..").join(dir),
    ]
}

fn has_all_files(dir: &Path) -> bool {
    let found = [PROMPT_FILE, COMPETENCY_MAP_FILE, SUB_AGENT_LIBRARY_FILE]
        .iter()
        .all(|f| dir.join(f).is_file());
    debug!(dir = %dir.display(), found, "Checked knowledge base directory");
    found
}

//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `skill-assessor.toml` in the working directory
//! 3. Built-in defaults
//!
//! Inside the TOML file, `${VAR_NAME}` is replaced with the value of the
//! environment variable of that name.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Default config file name looked up by [`Config::load`]
pub const CONFIG_FILE: &str = "skill-assessor.toml";

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key (`GOOGLE_API_KEY` or `GEMINI_API_KEY`)
    #[serde(default)]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_gemini_base_url(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Twilio WhatsApp configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,

    /// Sender number, with or without the `whatsapp:` prefix
    #[serde(default = "default_whatsapp_number")]
    pub whatsapp_number: String,

    #[serde(default = "default_twilio_base_url")]
    pub base_url: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            whatsapp_number: default_whatsapp_number(),
            base_url: default_twilio_base_url(),
        }
    }
}

/// Webhook server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Inbound webhook verification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Reject requests without a valid `X-Twilio-Signature`
    #[serde(default)]
    pub validate_signature: bool,

    /// Public URL Twilio posts to; required to recompute signatures behind a proxy
    pub public_url: Option<String>,
}

/// Assessment behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Directory holding `master_agent_prompt.md`, `competency_map.json`
    /// and `sub_agent_library.json`. Built-in prompts are used when unset.
    pub prompts_dir: Option<String>,

    /// WhatsApp message length limit
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            prompts_dir: None,
            max_message_length: default_max_message_length(),
        }
    }
}

/// Main configuration for skill-assessor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub twilio: TwilioConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub assessment: AssessmentConfig,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_whatsapp_number() -> String {
    // Twilio sandbox
    "whatsapp:+14155238886".to_string()
}

fn default_twilio_base_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_message_length() -> usize {
    1600
}

/// Read an environment variable, treating empty values as unset
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Config {
    /// Replace `${VAR_NAME}` with environment values (missing variables expand to "")
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file
    ///
    /// `${VAR_NAME}` references are expanded before parsing, and environment
    /// variables still take precedence over file values.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        Self::from_toml_file_with(path.as_ref(), env_var)
    }

    fn from_toml_file_with<F>(path: &Path, lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_overrides(lookup);
        cfg.check_api_key()?;

        Ok(cfg)
    }

    /// Parse TOML content (after env expansion) without applying overrides
    fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load from `skill-assessor.toml` when present, otherwise from the environment
    pub fn load() -> crate::Result<Self> {
        Self::load_with(Path::new(CONFIG_FILE), env_var)
    }

    fn load_with<F>(path: &Path, lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if path.exists() {
            return Self::from_toml_file_with(path, lookup);
        }

        Self::from_lookup(lookup)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(env_var)
    }

    fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        cfg.apply_overrides(lookup);
        cfg.check_api_key()?;
        Ok(cfg)
    }

    fn check_api_key(&self) -> crate::Result<()> {
        if self.gemini.api_key.is_empty() {
            return Err(Error::Config(
                "GOOGLE_API_KEY or GEMINI_API_KEY not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Override values with environment variables, read through `lookup`
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        // GOOGLE_API_KEY wins when both are set
        if let Some(key) = var("GEMINI_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Some(key) = var("GOOGLE_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(url) = var("GEMINI_BASE_URL") {
            self.gemini.base_url = url;
        }
        if let Some(temp) = var("GEMINI_TEMPERATURE").and_then(|t| t.parse().ok()) {
            self.gemini.temperature = Some(temp);
        }

        if let Some(sid) = var("TWILIO_ACCOUNT_SID") {
            self.twilio.account_sid = Some(sid);
        }
        if let Some(token) = var("TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = Some(token);
        }
        if let Some(number) = var("TWILIO_WHATSAPP_NUMBER") {
            self.twilio.whatsapp_number = number;
        }
        if let Some(url) = var("TWILIO_BASE_URL") {
            self.twilio.base_url = url;
        }

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(flag) = var("WEBHOOK_VALIDATE_SIGNATURE") {
            self.webhook.validate_signature = parse_bool(&flag);
        }
        if let Some(url) = var("WEBHOOK_PUBLIC_URL") {
            self.webhook.public_url = Some(url);
        }

        if let Some(dir) = var("PROMPTS_DIR") {
            self.assessment.prompts_dir = Some(dir);
        }
        if let Some(len) = var("MAX_MESSAGE_LENGTH").and_then(|l| l.parse().ok()) {
            self.assessment.max_message_length = len;
        }
    }

    /// Check the settings the webhook server needs beyond the Gemini key
    pub fn validate_for_server(&self) -> crate::Result<()> {
        let missing: Vec<&str> = [
            ("TWILIO_ACCOUNT_SID", &self.twilio.account_sid),
            ("TWILIO_AUTH_TOKEN", &self.twilio.auth_token),
        ]
        .iter()
        .filter(|(_, v)| v.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required Twilio settings: {}",
                missing.join(", ")
            )));
        }

        if self.webhook.validate_signature && self.webhook.public_url.is_none() {
            return Err(Error::Config(
                "WEBHOOK_PUBLIC_URL is required when signature validation is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_config_default() {
        let config = GeminiConfig::default();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.base_url, "https://generativelanguage.googleapis.com");
        assert_eq!(config.timeout_secs, 120);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_twilio_config_default() {
        let config = TwilioConfig::default();
        assert_eq!(config.whatsapp_number, "whatsapp:+14155238886");
        assert!(config.account_sid.is_none());
    }

    #[test]
    fn test_server_and_assessment_defaults() {
        assert_eq!(ServerConfig::default().port, 5000);
        assert_eq!(ServerConfig::default().host, "0.0.0.0");
        assert_eq!(AssessmentConfig::default().max_message_length, 1600);
        assert!(!WebhookConfig::default().validate_signature);
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("SA_CORE_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${SA_CORE_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = Config::expand_env_vars("prefix_${SA_CORE_NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("SA_CORE_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_passthrough() {
        assert_eq!(Config::expand_env_vars("no_vars_here"), "no_vars_here");
        assert_eq!(Config::expand_env_vars("${}_content"), "_content");
        assert_eq!(Config::expand_env_vars("cost: $5"), "cost: $5");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_content = r#"
[gemini]
api_key = "test_key"
model = "gemini-2.5-flash"
temperature = 0.2

[twilio]
account_sid = "AC123"
auth_token = "secret"
whatsapp_number = "+15550001111"

[server]
port = 8080

[webhook]
validate_signature = true
public_url = "https://example.com/twilio-webhook"

[assessment]
prompts_dir = "agent_prompts"
"#;

        let config = Config::from_toml_str(toml_content).unwrap();
        assert_eq!(config.gemini.api_key, "test_key");
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.temperature, Some(0.2));
        assert_eq!(config.twilio.account_sid.as_deref(), Some("AC123"));
        assert_eq!(config.twilio.whatsapp_number, "+15550001111");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.webhook.validate_signature);
        assert_eq!(config.assessment.prompts_dir.as_deref(), Some("agent_prompts"));
        assert_eq!(config.assessment.max_message_length, 1600);
        assert!(config.validate_for_server().is_ok());
    }

    #[test]
    fn test_toml_empty_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_validate_for_server_missing_twilio() {
        let config = Config::default();
        let err = config.validate_for_server().unwrap_err().to_string();
        assert!(err.contains("TWILIO_ACCOUNT_SID"));
        assert!(err.contains("TWILIO_AUTH_TOKEN"));
    }

    #[test]
    fn test_validate_for_server_signature_needs_url() {
        let mut config = Config::default();
        config.twilio.account_sid = Some("AC123".to_string());
        config.twilio.auth_token = Some("token".to_string());
        config.webhook.validate_signature = true;

        assert!(config.validate_for_server().is_err());

        config.webhook.public_url = Some("https://example.com/twilio-webhook".to_string());
        assert!(config.validate_for_server().is_ok());
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_gemini_section_without_key_uses_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[gemini]\nmodel = \"gemini-2.5-flash\"\n").unwrap();

        let config =
            Config::from_toml_file_with(&path, vars(&[("GEMINI_API_KEY", "from-env")])).unwrap();
        assert_eq!(config.gemini.api_key, "from-env");
        assert_eq!(config.gemini.model, "gemini-2.5-flash");

        let err = Config::from_toml_file_with(&path, vars(&[])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY not set"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[gemini]\napi_key = \"file-key\"\nmodel = \"file-model\"\n\n[server]\nport = 8080\n",
        )
        .unwrap();

        let config = Config::load_with(
            &path,
            vars(&[("GEMINI_MODEL", "env-model"), ("PORT", "9090"), ("HOST", "")]),
        )
        .unwrap();
        assert_eq!(config.gemini.api_key, "file-key");
        assert_eq!(config.gemini.model, "env-model");
        assert_eq!(config.server.port, 9090);
        // empty values count as unset
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_falls_back_to_env_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(CONFIG_FILE);

        let config = Config::load_with(&missing, vars(&[("GOOGLE_API_KEY", "google")])).unwrap();
        assert_eq!(config.gemini.api_key, "google");
        assert_eq!(config.server.port, 5000);

        assert!(Config::load_with(&missing, vars(&[])).is_err());
    }

    #[test]
    fn test_google_api_key_wins() {
        let config = Config::from_lookup(vars(&[
            ("GEMINI_API_KEY", "gemini"),
            ("GOOGLE_API_KEY", "google"),
        ]))
        .unwrap();
        assert_eq!(config.gemini.api_key, "google");
    }

    #[test]
    fn test_env_overrides_parse_numbers_and_flags() {
        let config = Config::from_lookup(vars(&[
            ("GEMINI_API_KEY", "key"),
            ("GEMINI_TEMPERATURE", "0.4"),
            ("PORT", "not-a-port"),
            ("MAX_MESSAGE_LENGTH", "1000"),
            ("WEBHOOK_VALIDATE_SIGNATURE", "yes"),
            ("WEBHOOK_PUBLIC_URL", "https://bot.example.com/twilio-webhook"),
            ("TWILIO_ACCOUNT_SID", "AC1"),
            ("TWILIO_AUTH_TOKEN", "tok"),
            ("TWILIO_WHATSAPP_NUMBER", "+15550001111"),
            ("PROMPTS_DIR", "prompts"),
        ]))
        .unwrap();

        assert_eq!(config.gemini.temperature, Some(0.4));
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.assessment.max_message_length, 1000);
        assert!(config.webhook.validate_signature);
        assert_eq!(config.twilio.whatsapp_number, "+15550001111");
        assert_eq!(config.assessment.prompts_dir.as_deref(), Some("prompts"));
        assert!(config.validate_for_server().is_ok());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool("YES"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("no"));
    }
}

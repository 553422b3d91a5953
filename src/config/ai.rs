// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_temperature() -> f32 {
    0.5
}
fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiConfig {
    pub enabled: bool,
    /// "groq" | "openai" (case-insensitive)
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from GROQ_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "groq".to_string(),
            model: default_model(),
            api_key: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        // Normalize provider
        cfg.provider = cfg.provider.trim().to_lowercase();

        // Resolve api key if "ENV"
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "groq" => env::var("GROQ_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing GROQ_API_KEY env var"))?,
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        if !(0.0..=2.0).contains(&cfg.temperature) {
            cfg.temperature = default_temperature();
        }
        if cfg.max_tokens == 0 {
            cfg.max_tokens = default_max_tokens();
        }

        Ok(cfg)
    }

    /// Missing or broken config disables the assistant instead of failing startup.
    pub fn load_or_disabled<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "AI config not loaded; assistant disabled");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_defaults_and_normalizes_provider() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("ai.json");
        fs::write(
            &p,
            r#"{"enabled": true, "provider": " GROQ ", "api_key": "k", "temperature": 9.0}"#,
        )
        .unwrap();
        let cfg = AiConfig::load_from_file(&p).unwrap();
        assert_eq!(cfg.provider, "groq");
        assert_eq!(cfg.model, "llama-3.1-8b-instant");
        assert_eq!(cfg.temperature, 0.5);
        assert_eq!(cfg.max_tokens, 1024);
    }

    #[serial_test::serial]
    #[test]
    fn env_key_is_resolved_by_provider() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("ai.json");
        fs::write(&p, r#"{"enabled": true, "provider": "groq", "api_key": "ENV"}"#).unwrap();

        env::remove_var("GROQ_API_KEY");
        assert!(AiConfig::load_from_file(&p).is_err());

        env::set_var("GROQ_API_KEY", "secret");
        assert_eq!(AiConfig::load_from_file(&p).unwrap().api_key, "secret");
        env::remove_var("GROQ_API_KEY");
    }

    #[test]
    fn missing_file_means_disabled() {
        let cfg = AiConfig::load_or_disabled("/no/such/ai.json");
        assert!(!cfg.enabled);
    }
}

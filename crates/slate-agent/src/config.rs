//! Agent configuration loading from file and environment variables.

use serde::Deserialize;
use slate_context::ContextConfig;
use slate_media::LiveKitConfig;
use thiserror::Error;

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    /// LiveKit connection settings. Empty URL runs the simulated room.
    #[serde(default)]
    pub livekit: LiveKitConfig,

    /// Voice engine paths and limits.
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Completion service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Conversation-context windowing settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Paths to the local voice engines.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    /// Path to the whisper.cpp-compatible STT binary.
    #[serde(default = "default_stt_binary")]
    pub stt_binary_path: String,

    /// Path to the STT model file.
    #[serde(default = "default_stt_model")]
    pub stt_model_path: String,

    /// Path to the piper-compatible TTS binary.
    #[serde(default = "default_tts_binary")]
    pub tts_binary_path: String,

    /// Path to the TTS voice model.
    #[serde(default = "default_tts_model")]
    pub tts_model_path: String,

    /// Path to the VAD model, loaded once per process.
    #[serde(default = "default_vad_model")]
    pub vad_model_path: String,
}

/// Completion service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_llm_model")]
    pub model: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "slate_agent=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_stt_binary() -> String {
    "whisper-cli".to_string()
}

fn default_stt_model() -> String {
    "models/ggml-base.en.bin".to_string()
}

fn default_tts_binary() -> String {
    "piper".to_string()
}

fn default_tts_model() -> String {
    "voices/en_US-lessac-medium.onnx".to_string()
}

fn default_vad_model() -> String {
    "models/vad.onnx".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_binary_path: default_stt_binary(),
            stt_model_path: default_stt_model(),
            tts_binary_path: default_tts_binary(),
            tts_model_path: default_tts_model(),
            vad_model_path: default_vad_model(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `SLATE_LIVEKIT_URL` / `SLATE_LIVEKIT_API_KEY` / `SLATE_LIVEKIT_API_SECRET`
/// - `SLATE_LLM_BASE_URL` / `SLATE_LLM_API_KEY` / `SLATE_LLM_MODEL`
/// - `SLATE_MAX_TURNS` overrides `context.max_turns`
/// - `SLATE_LOG_LEVEL` overrides `logging.level`
/// - `SLATE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<AgentConfig, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                AgentConfig::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => AgentConfig::default(),
    };

    // Environment variable overrides
    if let Ok(url) = std::env::var("SLATE_LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Ok(key) = std::env::var("SLATE_LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Ok(secret) = std::env::var("SLATE_LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }
    if let Ok(url) = std::env::var("SLATE_LLM_BASE_URL") {
        config.llm.base_url = url;
    }
    if let Ok(key) = std::env::var("SLATE_LLM_API_KEY") {
        config.llm.api_key = key;
    }
    if let Ok(model) = std::env::var("SLATE_LLM_MODEL") {
        config.llm.model = model;
    }
    if let Ok(max_turns) = std::env::var("SLATE_MAX_TURNS") {
        if let Ok(parsed) = max_turns.parse() {
            config.context.max_turns = parsed;
        }
    }
    if let Ok(level) = std::env::var("SLATE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("SLATE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.context.max_turns, 15);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.livekit.url.is_empty());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[context]\nmax_turns = 8\n\n[llm]\nmodel = \"gpt-4o\"\n"
        )
        .unwrap();

        let config = load_config(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.context.max_turns, 8);
        assert_eq!(config.context.frame_timeout_ms, 2_000);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Some("/nonexistent/slate.toml")).unwrap();
        assert_eq!(config.context.max_turns, 15);
    }
}

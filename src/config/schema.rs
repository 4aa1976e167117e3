use crate::session::store::{DEFAULT_MAX_TURNS, validate_max_turns};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was loaded from - not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub generation: GenerationDefaults,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

// ── Gateway ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway port (default: 3000)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Directory served at `/` (default: public)
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Request body cap, covers file uploads (default: 20 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
            static_dir: default_static_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

// ── Provider ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name (default: gemini)
    #[serde(default = "default_provider_name")]
    pub name: String,
    /// API key; GEMINI_API_KEY overrides it, GOOGLE_API_KEY fills it in when unset
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model identifier (default: gemini-2.5-flash)
    #[serde(default = "default_model")]
    pub model: String,
    /// Override the API base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds; unset means wait indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_provider_name() -> String {
    "gemini".into()
}

fn default_model() -> String {
    "gemini-2.5-flash".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_key: None,
            model: default_model(),
            base_url: None,
            timeout_secs: None,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// ── Generation defaults ───────────────────────────────────────────

/// Sampling values used when a request leaves them out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.9
}

fn default_max_output_tokens() -> u32 {
    2048
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

// ── Session ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Transcript cap in turns; must be even (default: 20)
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Session used when a request names none (default: "default")
    #[serde(default = "default_session_id")]
    pub default_session_id: String,
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_session_id() -> String {
    "default".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            default_session_id: default_session_id(),
        }
    }
}

// ── Prompt ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// File whose contents replace the built-in persona
    #[serde(default)]
    pub persona_path: Option<PathBuf>,
    /// Prompt used for file uploads that carry none
    #[serde(default)]
    pub default_file_prompt: Option<String>,
}

// ── Loading ───────────────────────────────────────────────────────

impl Config {
    /// Load config from a TOML file, apply env overrides and validate.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: &Path) -> Result<Self> {
        let content = if path.exists() {
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            String::new()
        };

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.config_path = path.to_path_buf();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    pub(crate) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // API Key: GEMINI_API_KEY, then GOOGLE_API_KEY when nothing else is set
        let configured = self
            .provider
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if let Some(key) = get("GEMINI_API_KEY") {
            self.provider.api_key = Some(key);
        } else if !configured {
            if let Some(key) = get("GOOGLE_API_KEY") {
                self.provider.api_key = Some(key);
            }
        }

        // Model: PROBOT_MODEL
        if let Some(model) = get("PROBOT_MODEL") {
            self.provider.model = model;
        }

        // Gateway host: PROBOT_HOST or HOST
        if let Some(host) = get("PROBOT_HOST").or_else(|| get("HOST")) {
            self.gateway.host = host;
        }

        // Gateway port: PROBOT_PORT or PORT
        if let Some(port_str) = get("PROBOT_PORT").or_else(|| get("PORT")) {
            match port_str.trim().parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!("Ignoring invalid port override: {port_str}"),
            }
        }

        // Static assets: PROBOT_STATIC_DIR
        if let Some(dir) = get("PROBOT_STATIC_DIR") {
            self.gateway.static_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_max_turns(self.session.max_turns)?;
        if self.session.default_session_id.trim().is_empty() {
            anyhow::bail!("session.default_session_id must not be empty");
        }
        if self.generation.max_output_tokens == 0 {
            anyhow::bail!("generation.max_output_tokens must be positive");
        }
        Ok(())
    }

    /// API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> Option<String> {
        self.provider.api_key.as_deref().map(|key| {
            let chars: Vec<char> = key.chars().collect();
            if chars.len() <= 4 {
                "***".to_string()
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("***{tail}")
            }
        })
    }
}

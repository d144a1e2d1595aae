use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// API keys that mean "no key": sample configs ship these so a fresh
/// checkout runs against the mock backend instead of failing.
const PLACEHOLDER_KEYS: &[&str] = &["", "your_api_key_here", "changeme"];

/// Configuration for the voice cloning pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Voice cloning/synthesis service settings
    pub voice: VoiceServiceConfig,

    /// Video analysis service settings (external boundary)
    pub analysis: AnalysisServiceConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceServiceConfig {
    /// API key for the voice service; absent or placeholder selects the
    /// mock backend
    pub api_key: Option<String>,

    /// Endpoint for voice clone registration (sample upload)
    pub clone_endpoint: String,

    /// Endpoint for text-to-speech synthesis
    pub tts_endpoint: String,

    /// Timeout for voice service requests (seconds)
    pub request_timeout_secs: u64,

    /// Simulated latency of the mock backend (milliseconds)
    pub mock_delay_ms: u64,
}

impl VoiceServiceConfig {
    /// The API key, if it is present and not a placeholder
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !PLACEHOLDER_KEYS.contains(key))
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisServiceConfig {
    /// API key for the analysis service
    pub api_key: Option<String>,

    /// Analysis endpoint
    pub endpoint: String,

    /// Analysis model identifier
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (tracing env-filter syntax)
    pub level: String,
}

impl Config {
    /// Load configuration from the first config file found, falling
    /// back to environment variables over defaults.
    pub fn load() -> Result<Self> {
        let config_paths = ["revoice.toml", "config/revoice.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env_overrides();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override settings from environment variables
    fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = std::env::var("REVOICE_VOICE_API_KEY") {
            self.voice.api_key = Some(api_key);
        }
        if let Ok(endpoint) = std::env::var("REVOICE_CLONE_ENDPOINT") {
            self.voice.clone_endpoint = endpoint;
        }
        if let Ok(endpoint) = std::env::var("REVOICE_TTS_ENDPOINT") {
            self.voice.tts_endpoint = endpoint;
        }
        if let Ok(level) = std::env::var("REVOICE_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.voice.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be greater than 0"));
        }

        if self.voice.resolved_api_key().is_some() {
            if self.voice.clone_endpoint.is_empty() {
                return Err(anyhow!("clone_endpoint required when an API key is set"));
            }
            if self.voice.tts_endpoint.is_empty() {
                return Err(anyhow!("tts_endpoint required when an API key is set"));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            voice: VoiceServiceConfig {
                api_key: None,
                clone_endpoint: "https://api.voice.example/v1/voices/clone".to_string(),
                tts_endpoint: "https://api.voice.example/v1/tts".to_string(),
                request_timeout_secs: 60,
                mock_delay_ms: 600,
            },
            analysis: AnalysisServiceConfig {
                api_key: None,
                endpoint: "https://api.analysis.example/v1/analyze".to_string(),
                model: "video-analyzer-1".to_string(),
            },
            logging: LoggingConfig {
                level: "revoice=info,warn".to_string(),
            },
        }
    }
}

/// Builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_voice_api_key(mut self, api_key: String) -> Self {
        self.config.voice.api_key = Some(api_key);
        self
    }

    pub fn with_clone_endpoint(mut self, endpoint: String) -> Self {
        self.config.voice.clone_endpoint = endpoint;
        self
    }

    pub fn with_tts_endpoint(mut self, endpoint: String) -> Self {
        self.config.voice.tts_endpoint = endpoint;
        self
    }

    pub fn with_mock_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.voice.mock_delay_ms = delay_ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_selects_mock() {
        let config = Config::default();
        assert!(config.voice.resolved_api_key().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_placeholder_keys_select_mock() {
        for placeholder in ["", "  ", "your_api_key_here", "changeme"] {
            let config = ConfigBuilder::new()
                .with_voice_api_key(placeholder.to_string())
                .build();
            assert!(
                config.voice.resolved_api_key().is_none(),
                "'{placeholder}' should resolve as absent"
            );
        }
    }

    #[test]
    fn test_real_key_resolves() {
        let config = ConfigBuilder::new()
            .with_voice_api_key("sk-live-123".to_string())
            .build();
        assert_eq!(
            config.voice.resolved_api_key().as_deref(),
            Some("sk-live-123")
        );
    }

    #[test]
    fn test_validation_requires_endpoints_with_key() {
        let mut config = ConfigBuilder::new()
            .with_voice_api_key("sk-live-123".to_string())
            .build();
        config.voice.clone_endpoint = String::new();
        assert!(config.validate().is_err());
    }
}

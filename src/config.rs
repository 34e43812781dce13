use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Upper bound for any configured retry attempt count
pub const MAX_RETRY_ATTEMPTS: u32 = 20;

/// Configuration for the transcript engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host page and private endpoint settings
    pub fetch: FetchConfig,

    /// Attempt counts and backoff for every retried step
    pub retry: RetryConfig,

    /// Chunk boundary thresholds
    pub chunking: ChunkingConfig,

    /// Transcript panel scraping settings
    pub panel: PanelConfig,

    /// Caption language preference
    pub language: LanguageConfig,

    /// Cooperating extension relay settings
    pub relay: RelayConfig,

    /// Notification stream settings
    pub notifications: NotificationConfig,

    /// Output and logging settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Canonical watch page URL, the video id is appended as `v`
    pub watch_url: String,

    /// Private transcript endpoint
    pub transcript_endpoint: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts for the host page fetch
    pub page_attempts: u32,

    /// Attempts for the private transcript endpoint
    pub api_attempts: u32,

    /// Attempts for reading the rendered transcript panel
    pub panel_attempts: u32,

    /// End-to-end attempts of the whole pipeline
    pub service_attempts: u32,

    /// Delay before the first retry in milliseconds
    pub base_delay_ms: u64,

    /// Multiplicative delay growth per attempt
    pub backoff_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// A gap longer than this between chunk start and segment start closes the chunk
    pub max_time_gap_seconds: u64,

    /// Above this many characters a chunk looks for a sentence boundary
    pub soft_char_limit: usize,

    /// At or above this many characters a chunk closes unconditionally
    pub hard_char_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Button that opens the transcript panel
    pub toggle_selector: String,

    /// Rendered segment rows
    pub segment_selector: String,

    /// Poll interval while waiting for the panel to render
    pub poll_interval_ms: u64,

    /// Hard ceiling for the render wait
    pub poll_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Display-name token ranked first
    pub preferred: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Endpoint of the cooperating extension component (relay disabled when unset)
    pub endpoint: Option<String>,

    /// Relay request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Server-sent event stream for quiz generation progress
    pub stream_url: Option<String>,

    /// Buffered notifications per subscriber
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Log level
    pub log_level: String,

    /// Prefix each chunk with its timestamp by default
    pub with_timestamp: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_time_gap_seconds: 60,
            soft_char_limit: 300,
            hard_char_limit: 500,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            page_attempts: 2,
            api_attempts: 3,
            panel_attempts: 3,
            service_attempts: 3,
            base_delay_ms: 500,
            backoff_factor: 1.5,
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            toggle_selector: "#primary-button > ytd-button-renderer > yt-button-shape > button".to_string(),
            segment_selector: "#segments-container > ytd-transcript-segment-renderer".to_string(),
            poll_interval_ms: 100,
            poll_timeout_ms: 3000,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let home_config = std::env::var("HOME")
            .map(|home| format!("{}/.config/snippet-transcript/config.toml", home))
            .unwrap_or_default();

        // Try to load from various locations
        let config_paths = [
            "snippet-transcript.toml".to_string(),
            "config/snippet-transcript.toml".to_string(),
            home_config,
            "/etc/snippet-transcript/config.toml".to_string(),
        ];

        for path in config_paths.iter().filter(|p| !p.is_empty()) {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config.with_env_overrides());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Cannot parse config {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config.with_env_overrides())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `SNIPPET_TRANSCRIPT_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("SNIPPET_TRANSCRIPT_RELAY_ENDPOINT") {
            self.relay.endpoint = Some(endpoint);
        }

        if let Ok(stream_url) = std::env::var("SNIPPET_TRANSCRIPT_STREAM_URL") {
            self.notifications.stream_url = Some(stream_url);
        }

        if let Ok(language) = std::env::var("SNIPPET_TRANSCRIPT_LANGUAGE") {
            self.language.preferred = language;
        }

        if let Ok(timeout) = std::env::var("SNIPPET_TRANSCRIPT_TIMEOUT") {
            self.fetch.request_timeout_seconds = timeout.parse().unwrap_or(self.fetch.request_timeout_seconds);
        }

        if let Ok(log_level) = std::env::var("SNIPPET_TRANSCRIPT_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.fetch.watch_url)
            .map_err(|e| anyhow!("watch_url is not a valid URL: {}", e))?;
        url::Url::parse(&self.fetch.transcript_endpoint)
            .map_err(|e| anyhow!("transcript_endpoint is not a valid URL: {}", e))?;

        if self.fetch.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }

        let retry = &self.retry;
        if retry.page_attempts == 0 || retry.api_attempts == 0 || retry.panel_attempts == 0 || retry.service_attempts == 0 {
            return Err(anyhow!("every retry attempt count must be greater than 0"));
        }

        let most = retry
            .page_attempts
            .max(retry.api_attempts)
            .max(retry.panel_attempts)
            .max(retry.service_attempts);
        if most > MAX_RETRY_ATTEMPTS {
            return Err(anyhow!("retry attempt counts must not exceed {} (got {})", MAX_RETRY_ATTEMPTS, most));
        }

        if !(retry.backoff_factor >= 1.0) {
            return Err(anyhow!("backoff_factor must be at least 1.0"));
        }

        if self.chunking.soft_char_limit >= self.chunking.hard_char_limit {
            return Err(anyhow!(
                "soft_char_limit ({}) must be below hard_char_limit ({})",
                self.chunking.soft_char_limit,
                self.chunking.hard_char_limit
            ));
        }

        if self.panel.poll_interval_ms == 0 || self.panel.poll_interval_ms > self.panel.poll_timeout_ms {
            return Err(anyhow!("panel poll interval must be positive and within the poll timeout"));
        }

        if self.language.preferred.trim().is_empty() {
            return Err(anyhow!("preferred language must not be empty"));
        }

        if let Some(endpoint) = &self.relay.endpoint {
            url::Url::parse(endpoint).map_err(|e| anyhow!("relay endpoint is not a valid URL: {}", e))?;
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Snippet Transcript Configuration:\n\
            - Watch URL: {}\n\
            - Preferred Language: {}\n\
            - Service Attempts: {} (base delay {}ms, x{})\n\
            - Chunking: gap {}s, soft {} chars, hard {} chars\n\
            - Relay: {}\n\
            - Notifications: {}",
            self.fetch.watch_url,
            self.language.preferred,
            self.retry.service_attempts,
            self.retry.base_delay_ms,
            self.retry.backoff_factor,
            self.chunking.max_time_gap_seconds,
            self.chunking.soft_char_limit,
            self.chunking.hard_char_limit,
            self.relay.endpoint.as_deref().unwrap_or("disabled"),
            self.notifications.stream_url.as_deref().unwrap_or("disabled"),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig {
                watch_url: "https://www.youtube.com/watch".to_string(),
                transcript_endpoint: "https://www.youtube.com/youtubei/v1/get_transcript?prettyPrint=false".to_string(),
                user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                request_timeout_seconds: 30,
            },
            retry: RetryConfig::default(),
            chunking: ChunkingConfig::default(),
            panel: PanelConfig::default(),
            language: LanguageConfig {
                preferred: "English".to_string(),
            },
            relay: RelayConfig {
                endpoint: None,
                timeout_seconds: 10,
            },
            notifications: NotificationConfig {
                stream_url: None,
                channel_capacity: 64,
            },
            output: OutputConfig {
                log_level: "info".to_string(),
                with_timestamp: true,
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_watch_url(mut self, url: impl Into<String>) -> Self {
        self.config.fetch.watch_url = url.into();
        self
    }

    pub fn with_transcript_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.fetch.transcript_endpoint = url.into();
        self
    }

    pub fn with_preferred_language(mut self, language: impl Into<String>) -> Self {
        self.config.language.preferred = language.into();
        self
    }

    pub fn with_relay_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.relay.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.retry.base_delay_ms = delay_ms;
        self
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.config.chunking = chunking;
        self
    }

    pub fn with_panel_timing(mut self, poll_interval_ms: u64, poll_timeout_ms: u64) -> Self {
        self.config.panel.poll_interval_ms = poll_interval_ms;
        self.config.panel.poll_timeout_ms = poll_timeout_ms;
        self
    }

    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.config.output.with_timestamp = enable;
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

use crate::logger::{LogLevel, LogProfile};
use crate::models::GenerationSettings;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SOCKET_ENDPOINT: &str = "tcp://127.0.0.1:5557";
pub const DEFAULT_API_URL: &str = "http://localhost:7860/sdapi/v1/txt2img";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_SOCKET_IDLE_RECONNECT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct DreamerConfig {
    pub socket_endpoint: String,
    pub socket_idle_reconnect: Duration,
    pub api_url: String,
    pub output_dir: PathBuf,
    pub use_temp_dir: bool,
    pub poll_interval: Duration,
    pub request_timeout: Option<Duration>,
    pub window_title: String,
    pub window_size: [f32; 2],
    pub log_profile: LogProfile,
    /// Overrides the profile's level when set.
    pub log_level: Option<LogLevel>,
    pub log_json: bool,
    pub log_colors: bool,
    pub log_file: Option<String>,
    pub generation: GenerationSettings,
}

impl Default for DreamerConfig {
    fn default() -> Self {
        DreamerConfig {
            socket_endpoint: DEFAULT_SOCKET_ENDPOINT.to_string(),
            socket_idle_reconnect: DEFAULT_SOCKET_IDLE_RECONNECT,
            api_url: DEFAULT_API_URL.to_string(),
            output_dir: PathBuf::from("."),
            use_temp_dir: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: None,
            window_title: "Dreamer".to_string(),
            window_size: [1200.0, 1200.0],
            log_profile: LogProfile::Standard,
            log_level: None,
            log_json: false,
            log_colors: true,
            log_file: None,
            generation: GenerationSettings::default(),
        }
    }
}

impl DreamerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `DREAMER_*` variables; anything missing or unparseable keeps its default.
    ///
    /// The logger is not set up yet when this runs, so rejected values come
    /// back as warning lines for the caller to log once it is.
    pub fn from_env() -> (Self, Vec<String>) {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<String>) {
        let mut config = Self::default();
        let mut warnings = Vec::new();
        let mut reject = |key: &str, raw: &str| {
            warnings.push(format!("Ignoring invalid {}={:?}", key, raw));
        };

        if let Some(endpoint) = lookup("DREAMER_SOCKET_ENDPOINT") {
            config.socket_endpoint = endpoint;
        }
        if let Some(url) = lookup("DREAMER_API_URL") {
            config.api_url = url;
        }
        if let Some(dir) = lookup("DREAMER_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        config.use_temp_dir = lookup("DREAMER_USE_TEMP_DIR").map_or(false, |val| val == "true");

        if let Some(raw) = lookup("DREAMER_POLL_INTERVAL_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config.poll_interval = Duration::from_millis(ms),
                _ => reject("DREAMER_POLL_INTERVAL_MS", &raw),
            }
        }
        if let Some(raw) = lookup("DREAMER_SOCKET_IDLE_RECONNECT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.socket_idle_reconnect = Duration::from_secs(secs),
                _ => reject("DREAMER_SOCKET_IDLE_RECONNECT_SECS", &raw),
            }
        }
        if let Some(raw) = lookup("DREAMER_REQUEST_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Some(Duration::from_secs(secs)),
                _ => reject("DREAMER_REQUEST_TIMEOUT_SECS", &raw),
            }
        }

        if let Some(raw) = lookup("DREAMER_LOG_PROFILE") {
            match LogProfile::parse(&raw) {
                Some(profile) => config.log_profile = profile,
                None => reject("DREAMER_LOG_PROFILE", &raw),
            }
        }
        if let Some(raw) = lookup("DREAMER_LOG_LEVEL") {
            match LogLevel::parse(&raw) {
                Some(level) => config.log_level = Some(level),
                None => reject("DREAMER_LOG_LEVEL", &raw),
            }
        }
        config.log_json = lookup("DREAMER_LOG_JSON").map_or(false, |val| val == "true");
        config.log_colors = lookup("DREAMER_LOG_COLORS").map_or(true, |val| val != "false");
        config.log_file = lookup("DREAMER_LOG_FILE").filter(|path| !path.is_empty());

        (config, warnings)
    }

    pub fn with_socket_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.socket_endpoint = endpoint.into();
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self.use_temp_dir = false;
        self
    }

    pub fn with_temp_dir(mut self) -> Self {
        self.use_temp_dir = true;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

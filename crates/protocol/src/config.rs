use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PROGRESS_STEP: u32 = 10;
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 300;
pub const DEFAULT_PROGRESS_MAX: u32 = 100;

/// Client settings shared by both sessions. Built once by the binary and
/// passed down explicitly.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_ms: Option<u64>,
    pub chat_failure_policy: ChatFailurePolicy,
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatFailurePolicy {
    /// Log the failure and leave the transcript as is.
    #[default]
    Silent,
    /// Append an assistant message flagged as `danger`.
    Notify,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProgressConfig {
    pub step: u32,
    pub interval_ms: u64,
    pub max: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: None,
            chat_failure_policy: ChatFailurePolicy::default(),
            progress: ProgressConfig::default(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_PROGRESS_STEP,
            interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            max: DEFAULT_PROGRESS_MAX,
        }
    }
}

pub fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

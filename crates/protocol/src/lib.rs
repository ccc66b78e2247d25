use serde::{Deserialize, Serialize};

pub mod config;
pub mod normalize;
pub mod report;
pub mod transcript;

pub use report::{AnalysisReport, DataCollectionDetails, ReportSection};
pub use transcript::{Message, MessageStatus, Role};

pub const CHAT_PATH: &str = "/chat/local/";
pub const PRIVACY_PATH: &str = "/analyze/privacy/";
pub const NO_RESPONSE_FALLBACK: &str = "No response from AI";
pub const RELAY_FAILURE_MESSAGE: &str = "Failed to fetch";

/// Body of both primary requests. The analyzer sends the app or site name as
/// `question` too.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRequest {
    pub question: String,
}

impl QuestionRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayErrorBody {
    pub error: String,
}

impl RelayErrorBody {
    pub fn fetch_failed() -> Self {
        Self {
            error: RELAY_FAILURE_MESSAGE.to_string(),
        }
    }
}

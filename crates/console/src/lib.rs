pub mod analysis;
pub mod chat;
pub mod client;
pub mod events;
pub mod progress;
pub mod view;

pub use analysis::{AnalysisPhase, AnalysisSession, AnalysisSnapshot, AnalyzeOutcome};
pub use chat::{ChatSession, ChatSnapshot, SubmitOutcome};
pub use client::ApiClient;
pub use events::{AnalysisEvent, ChatEvent};

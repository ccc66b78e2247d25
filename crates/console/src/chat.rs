use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use protocol::config::ChatFailurePolicy;
use protocol::normalize::{strip_reasoning, ReasoningMarkers};
use protocol::{ChatReply, Message, MessageStatus, NO_RESPONSE_FALLBACK};

use crate::client::ApiClient;
use crate::events::{ChatEvent, EVENT_CAPACITY};

const WELCOME: &str = "Hello! I'm HackAware, your AI cybersecurity assistant. How can I help protect your digital life today?";
const INTRO: &str = "You can ask me about suspicious links, privacy concerns, security best practices, or how to respond to potential threats.";
const INTRO_ICON: &str = "🛡️";
const FAILURE_NOTICE: &str =
    "I couldn't reach the HackAware service. Please try again in a moment.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank question or closed session; nothing was sent.
    Ignored,
    Replied,
    Failed,
    /// A newer submission was issued before this one settled.
    Stale,
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct ChatSnapshot {
    pub transcript: Vec<Message>,
    pub composing: bool,
}

struct ChatState {
    transcript: Vec<Message>,
    composing: bool,
    latest_seq: u64,
}

pub struct ChatSession {
    client: ApiClient,
    policy: ChatFailurePolicy,
    state: RwLock<ChatState>,
    event_tx: broadcast::Sender<ChatEvent>,
    lifetime: CancellationToken,
}

impl ChatSession {
    pub fn new(client: ApiClient, policy: ChatFailurePolicy) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            policy,
            state: RwLock::new(ChatState {
                transcript: greeting(),
                composing: false,
                latest_seq: 0,
            }),
            event_tx,
            lifetime: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let state = self.state.read().await;
        ChatSnapshot {
            transcript: state.transcript.clone(),
            composing: state.composing,
        }
    }

    pub async fn submit(&self, question: &str) -> SubmitOutcome {
        if question.trim().is_empty() || self.lifetime.is_cancelled() {
            return SubmitOutcome::Ignored;
        }
        let seq = {
            let mut state = self.state.write().await;
            state.latest_seq += 1;
            let message = Message::user(new_message_id(), question);
            state.transcript.push(message.clone());
            state.composing = true;
            let _ = self.event_tx.send(ChatEvent::MessageAppended { message });
            let _ = self
                .event_tx
                .send(ChatEvent::ComposingChanged { composing: true });
            state.latest_seq
        };
        tracing::info!(
            event = "chat.submit",
            seq,
            question_len = question.len(),
            "chat question submitted"
        );

        let result = tokio::select! {
            biased;
            _ = self.lifetime.cancelled() => {
                tracing::info!(event = "chat.cancelled", seq, "chat session closed mid-request");
                return SubmitOutcome::Cancelled;
            }
            result = self.client.chat(question) => result,
        };

        let mut state = self.state.write().await;
        if self.lifetime.is_cancelled() {
            return SubmitOutcome::Cancelled;
        }
        if seq != state.latest_seq {
            tracing::info!(
                event = "chat.stale",
                seq,
                latest = state.latest_seq,
                "dropping reply to superseded question"
            );
            return SubmitOutcome::Stale;
        }

        let (reply, outcome) = match result {
            Ok(reply) => {
                let text = reply_text(&reply);
                tracing::info!(event = "chat.reply", seq, reply_len = text.len(), "chat reply received");
                (Some(Message::assistant(new_message_id(), text)), SubmitOutcome::Replied)
            }
            Err(err) => {
                tracing::error!(
                    event = "chat.failed",
                    seq,
                    error = %format!("{err:#}"),
                    "error fetching chat response"
                );
                let notice = match self.policy {
                    ChatFailurePolicy::Silent => None,
                    ChatFailurePolicy::Notify => Some(
                        Message::assistant(new_message_id(), FAILURE_NOTICE)
                            .with_status(MessageStatus::Danger),
                    ),
                };
                (notice, SubmitOutcome::Failed)
            }
        };
        if let Some(message) = reply {
            state.transcript.push(message.clone());
            let _ = self.event_tx.send(ChatEvent::MessageAppended { message });
        }
        state.composing = false;
        let _ = self
            .event_tx
            .send(ChatEvent::ComposingChanged { composing: false });
        outcome
    }

    /// Ends the session. Requests still in flight are dropped and later
    /// submissions are ignored.
    pub async fn close(&self) {
        self.lifetime.cancel();
        let mut state = self.state.write().await;
        if state.composing {
            state.composing = false;
            let _ = self
                .event_tx
                .send(ChatEvent::ComposingChanged { composing: false });
        }
    }
}

fn reply_text(reply: &ChatReply) -> String {
    let text = reply
        .response
        .as_deref()
        .map(|text| strip_reasoning(text, ReasoningMarkers::THINK).trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        NO_RESPONSE_FALLBACK.to_string()
    } else {
        text
    }
}

fn greeting() -> Vec<Message> {
    vec![
        Message::assistant("welcome", WELCOME),
        Message::assistant("intro", INTRO).with_icon(INTRO_ICON),
    ]
}

fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

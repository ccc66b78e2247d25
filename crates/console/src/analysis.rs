use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use protocol::config::ProgressConfig;
use protocol::normalize::normalize_report;
use protocol::AnalysisReport;

use crate::client::ApiClient;
use crate::events::{AnalysisEvent, EVENT_CAPACITY};
use crate::progress::{ProgressAnimation, Tick};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisPhase {
    Idle,
    Requesting,
    Animating,
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    Ignored,
    Completed,
    /// Superseded by `reset`, `close` or a newer `analyze` call.
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct AnalysisSnapshot {
    pub phase: AnalysisPhase,
    pub subject: String,
    pub progress: u32,
    pub report: Option<AnalysisReport>,
}

impl AnalysisSnapshot {
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, AnalysisPhase::Requesting | AnalysisPhase::Animating)
    }
}

struct AnalysisState {
    phase: AnalysisPhase,
    subject: String,
    progress: u32,
    report: Option<AnalysisReport>,
}

impl AnalysisState {
    fn idle() -> Self {
        Self {
            phase: AnalysisPhase::Idle,
            subject: String::new(),
            progress: 0,
            report: None,
        }
    }
}

pub struct AnalysisSession {
    client: ApiClient,
    animation: ProgressAnimation,
    state: RwLock<AnalysisState>,
    event_tx: broadcast::Sender<AnalysisEvent>,
    lifetime: CancellationToken,
    current_run: Mutex<CancellationToken>,
}

impl AnalysisSession {
    pub fn new(client: ApiClient, progress: &ProgressConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let lifetime = CancellationToken::new();
        let current_run = Mutex::new(lifetime.child_token());
        Self {
            client,
            animation: ProgressAnimation::from_config(progress),
            state: RwLock::new(AnalysisState::idle()),
            event_tx,
            lifetime,
            current_run,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.event_tx.subscribe()
    }

    pub async fn snapshot(&self) -> AnalysisSnapshot {
        let state = self.state.read().await;
        AnalysisSnapshot {
            phase: state.phase,
            subject: state.subject.clone(),
            progress: state.progress,
            report: state.report.clone(),
        }
    }

    /// Requests a privacy report for `name`, then plays the progress
    /// animation. Reaches `Complete` whether or not a report was produced.
    pub async fn analyze(&self, name: &str) -> AnalyzeOutcome {
        if name.trim().is_empty() || self.lifetime.is_cancelled() {
            return AnalyzeOutcome::Ignored;
        }
        let run = self.start_run().await;
        {
            let mut state = self.state.write().await;
            if run.is_cancelled() {
                return AnalyzeOutcome::Cancelled;
            }
            state.phase = AnalysisPhase::Requesting;
            state.subject = name.to_string();
            state.progress = 0;
            state.report = None;
        }
        self.emit(AnalysisEvent::PhaseChanged {
            phase: AnalysisPhase::Requesting,
        });
        self.emit(AnalysisEvent::ProgressChanged { progress: 0 });
        tracing::info!(event = "analysis.request", subject = %name, "privacy analysis requested");

        let result = tokio::select! {
            biased;
            _ = run.cancelled() => return AnalyzeOutcome::Cancelled,
            result = self.client.analyze_privacy(name) => result,
        };
        let report = match result {
            Ok(payload) => normalize_report(&payload),
            Err(err) => {
                tracing::error!(
                    event = "analysis.failed",
                    subject = %name,
                    error = %format!("{err:#}"),
                    "error fetching privacy analysis"
                );
                None
            }
        };

        {
            let mut state = self.state.write().await;
            if run.is_cancelled() {
                return AnalyzeOutcome::Cancelled;
            }
            state.report = report.clone();
            state.phase = AnalysisPhase::Animating;
        }
        if let Some(report) = report.clone() {
            self.emit(AnalysisEvent::ReportReady { report });
        }
        self.emit(AnalysisEvent::PhaseChanged {
            phase: AnalysisPhase::Animating,
        });

        let mut ticker = self.animation.start();
        loop {
            match ticker.tick(&run).await {
                Tick::Frame(progress) => {
                    let mut state = self.state.write().await;
                    if run.is_cancelled() {
                        return AnalyzeOutcome::Cancelled;
                    }
                    state.progress = progress;
                    self.emit(AnalysisEvent::ProgressChanged { progress });
                }
                Tick::Finished => break,
                Tick::Cancelled => return AnalyzeOutcome::Cancelled,
            }
        }

        {
            let mut state = self.state.write().await;
            if run.is_cancelled() {
                return AnalyzeOutcome::Cancelled;
            }
            state.progress = self.animation.max();
            state.phase = AnalysisPhase::Complete;
        }
        self.emit(AnalysisEvent::PhaseChanged {
            phase: AnalysisPhase::Complete,
        });
        tracing::info!(
            event = "analysis.complete",
            subject = %name,
            has_report = report.is_some(),
            "privacy analysis complete"
        );
        AnalyzeOutcome::Completed
    }

    /// Back to the initial state. A run still in progress is abandoned and
    /// will not touch the state again.
    pub async fn reset(&self) {
        self.current_run.lock().await.cancel();
        {
            let mut state = self.state.write().await;
            *state = AnalysisState::idle();
        }
        self.emit(AnalysisEvent::PhaseChanged {
            phase: AnalysisPhase::Idle,
        });
    }

    pub fn close(&self) {
        self.lifetime.cancel();
    }

    async fn start_run(&self) -> CancellationToken {
        let mut current = self.current_run.lock().await;
        current.cancel();
        let run = self.lifetime.child_token();
        *current = run.clone();
        run
    }

    fn emit(&self, event: AnalysisEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use protocol::config::ClientConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_for(server: &MockServer, interval_ms: u64) -> AnalysisSession {
        let config = ClientConfig {
            base_url: server.uri(),
            progress: ProgressConfig {
                interval_ms,
                ..ProgressConfig::default()
            },
            ..ClientConfig::default()
        };
        AnalysisSession::new(ApiClient::new(&config).expect("client"), &config.progress)
    }

    async fn mount_payload(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/analyze/privacy/"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn blank_name_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let session = session_for(&server, 1);

        assert_eq!(session.analyze("  ").await, AnalyzeOutcome::Ignored);
        assert_eq!(session.snapshot().await.phase, AnalysisPhase::Idle);
    }

    #[tokio::test]
    async fn completes_with_normalized_report() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze/privacy/"))
            .and(body_json(json!({ "question": "Instagram" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                "<think>checking</think>\n\"{\\\"wrapper_data\\\":{\\\"security\\\":{\\\"header\\\":\\\"High\\\",\\\"body\\\":\\\"x\\\"}}}\""
            )))
            .expect(1)
            .mount(&server)
            .await;
        let session = session_for(&server, 1);

        assert_eq!(session.analyze("Instagram").await, AnalyzeOutcome::Completed);
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.phase, AnalysisPhase::Complete);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.subject, "Instagram");
        let security = snapshot.report.and_then(|report| report.security);
        assert_eq!(
            security.and_then(|section| section.header).as_deref(),
            Some("High")
        );
    }

    #[tokio::test]
    async fn transport_failure_still_completes() {
        let server = MockServer::start().await;
        mount_payload(&server, ResponseTemplate::new(500)).await;
        let session = session_for(&server, 1);

        assert_eq!(session.analyze("TikTok").await, AnalyzeOutcome::Completed);
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.phase, AnalysisPhase::Complete);
        assert!(snapshot.report.is_none());
        assert!(!snapshot.is_busy());
    }

    #[tokio::test]
    async fn malformed_payload_completes_without_report() {
        let server = MockServer::start().await;
        mount_payload(&server, ResponseTemplate::new(200).set_body_string("not json")).await;
        let session = session_for(&server, 1);

        assert_eq!(session.analyze("WhatsApp").await, AnalyzeOutcome::Completed);
        assert!(session.snapshot().await.report.is_none());
    }

    #[tokio::test]
    async fn new_analysis_replaces_previous_report() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze/privacy/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "security": { "header": "Low", "body": "y" } })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_payload(&server, ResponseTemplate::new(200).set_body_string("garbage")).await;
        let session = session_for(&server, 1);

        session.analyze("first").await;
        assert!(session.snapshot().await.report.is_some());
        session.analyze("second").await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.subject, "second");
        assert!(snapshot.report.is_none());
    }

    #[tokio::test]
    async fn reset_abandons_running_analysis() {
        let server = MockServer::start().await;
        mount_payload(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({ "security": { "header": "Low" } }))
                .set_delay(Duration::from_secs(5)),
        )
        .await;
        let session = session_for(&server, 1);

        let (outcome, ()) = tokio::join!(session.analyze("Snapchat"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.reset().await;
        });
        assert_eq!(outcome, AnalyzeOutcome::Cancelled);
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.phase, AnalysisPhase::Idle);
        assert!(snapshot.subject.is_empty());
        assert!(snapshot.report.is_none());
    }

    #[tokio::test]
    async fn reset_stops_the_animation() {
        let server = MockServer::start().await;
        mount_payload(&server, ResponseTemplate::new(200).set_body_json(json!({}))).await;
        let session = session_for(&server, 200);

        let (outcome, ()) = tokio::join!(session.analyze("Telegram"), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            session.reset().await;
        });
        assert_eq!(outcome, AnalyzeOutcome::Cancelled);
        tokio::time::sleep(Duration::from_millis(300)).await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.phase, AnalysisPhase::Idle);
        assert_eq!(snapshot.progress, 0);
    }

    #[tokio::test]
    async fn events_report_phases_and_progress() {
        let server = MockServer::start().await;
        mount_payload(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "wrapper_data": { "security": {} } })),
        )
        .await;
        let session = session_for(&server, 1);
        let mut events = session.subscribe();

        session.analyze("Facebook").await;

        let mut phases = Vec::new();
        let mut progress = Vec::new();
        let mut reports = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                AnalysisEvent::PhaseChanged { phase } => phases.push(phase),
                AnalysisEvent::ProgressChanged { progress: value } => progress.push(value),
                AnalysisEvent::ReportReady { .. } => reports += 1,
            }
        }
        assert_eq!(
            phases,
            vec![
                AnalysisPhase::Requesting,
                AnalysisPhase::Animating,
                AnalysisPhase::Complete,
            ]
        );
        assert_eq!(progress, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        assert_eq!(reports, 1);
    }
}

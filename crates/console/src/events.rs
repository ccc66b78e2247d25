use protocol::{AnalysisReport, Message};

use crate::analysis::AnalysisPhase;

pub(crate) const EVENT_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    MessageAppended { message: Message },
    ComposingChanged { composing: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisEvent {
    PhaseChanged { phase: AnalysisPhase },
    ProgressChanged { progress: u32 },
    ReportReady { report: AnalysisReport },
}

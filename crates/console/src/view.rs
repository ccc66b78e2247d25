use std::fmt::Write as _;
use std::time::SystemTime;

use humantime::format_rfc3339_seconds;

use protocol::{AnalysisReport, DataCollectionDetails, Message, MessageStatus, ReportSection, Role};

use crate::chat::ChatSnapshot;

pub const TYPING_INDICATOR: &str = "HackAware is typing...";

pub fn render_transcript(snapshot: &ChatSnapshot) -> String {
    let mut out = String::new();
    for message in &snapshot.transcript {
        out.push_str(&render_message(message));
        out.push('\n');
    }
    if snapshot.composing {
        out.push_str(TYPING_INDICATOR);
        out.push('\n');
    }
    out
}

pub fn render_message(message: &Message) -> String {
    let label = match message.role {
        Role::User => "You",
        Role::Assistant => "HackAware",
    };
    let mut out = format!("{label} [{}]", format_clock(message.timestamp));
    if let Some(tag) = message.status.and_then(status_tag) {
        let _ = write!(out, " ({tag})");
    }
    out.push('\n');
    if let Some(icon) = &message.icon {
        let _ = writeln!(out, "{icon}");
    }
    for line in message.content.lines() {
        let _ = writeln!(out, "  {line}");
    }
    out
}

/// Renders the results view. Absent sections are skipped; a missing or empty
/// report renders the heading and a "No results" line.
pub fn render_report(subject: &str, report: Option<&AnalysisReport>) -> String {
    let mut out = format!("Analysis Results: {subject}\n");
    let Some(report) = report.filter(|report| !report.is_empty()) else {
        out.push_str("\nNo results for this analysis.\n");
        return out;
    };
    if let Some(section) = &report.privacy_risk {
        render_section(&mut out, "Privacy Risk", section);
    }
    if let Some(section) = &report.security {
        render_section(&mut out, "Security", section);
    }
    if let Some(section) = &report.data_sharing {
        render_section(&mut out, "Data Sharing", section);
    }
    if let Some(details) = &report.data_collection_details {
        render_details(&mut out, details);
    }
    if let Some(recommendations) = &report.recommendations {
        out.push_str("\nRecommendations\n");
        for (key, advice) in recommendations {
            let _ = writeln!(out, "  - {}: {advice}", humanize_key(key));
        }
    }
    out
}

pub fn render_progress(progress: u32) -> String {
    format!("Analyzing privacy risks... {progress}%")
}

/// `review_app_permissions` -> `Review App Permissions`.
pub fn humanize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut at_boundary = true;
    for ch in key.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        let is_word = ch.is_alphanumeric();
        if is_word && at_boundary {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_boundary = !is_word;
    }
    out
}

fn render_section(out: &mut String, title: &str, section: &ReportSection) {
    match &section.header {
        Some(header) => {
            let _ = writeln!(out, "\n{title}: {header}");
        }
        None => {
            let _ = writeln!(out, "\n{title}");
        }
    }
    if let Some(body) = &section.body {
        let _ = writeln!(out, "  {body}");
    }
}

fn render_details(out: &mut String, details: &DataCollectionDetails) {
    out.push_str("\nData Collection Details\n");
    let rows = [
        ("Location Tracking", &details.location_tracking),
        ("Contact Access", &details.contact_access),
        ("Data Encryption", &details.data_encryption),
    ];
    for (label, value) in rows {
        if let Some(value) = value {
            let _ = writeln!(out, "  {label}: {value}");
        }
    }
}

fn status_tag(status: MessageStatus) -> Option<&'static str> {
    match status {
        MessageStatus::Normal => None,
        MessageStatus::Warning => Some("warning"),
        MessageStatus::Danger => Some("danger"),
        MessageStatus::Success => Some("success"),
    }
}

// HH:MM in UTC, taken from the RFC 3339 form.
fn format_clock(timestamp: SystemTime) -> String {
    let formatted = format_rfc3339_seconds(timestamp).to_string();
    formatted.get(11..16).unwrap_or("--:--").to_string()
}

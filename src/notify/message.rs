//! Plain-text alert bodies

use crate::record::Record;
use crate::source::BSE_ATTACHMENT_BASE;

const MAX_SUBJECT_CHARS: usize = 180;

/// Company name is the subject text before the first `-`.
pub fn company_name(subject: &str) -> &str {
    let name = subject.split('-').next().unwrap_or("").trim();
    if name.is_empty() {
        "Unknown"
    } else {
        name
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max - 3).collect();
    cut.push_str("...");
    cut
}

/// Outbound link: the record's own URL, else its attachment.
pub fn record_link(record: &Record) -> Option<String> {
    record.link.clone().or_else(|| {
        record
            .attachment_ref
            .as_ref()
            .map(|name| format!("{}{}", BSE_ATTACHMENT_BASE, name))
    })
}

pub fn render_alert(record: &Record) -> String {
    let company = company_name(&record.subject_text);
    let subject = [record.subject_text.trim(), record.headline_text.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("Corporate Announcement");

    let mut lines = vec!["🔔 New BSE Financial Result".to_string()];
    match &record.entity_code {
        Some(code) => lines.push(format!("🏢 Company: {} ({})", company, code)),
        None => lines.push(format!("🏢 Company: {}", company)),
    }
    lines.push(format!("📝 Subject: {}", truncate(subject, MAX_SUBJECT_CHARS)));
    if !record.timestamp.is_empty() {
        lines.push(format!("📅 Time: {}", record.timestamp));
    }
    if let Some(link) = record_link(record) {
        lines.push(format!("🔗 Link: {}", link));
    }
    lines.join("\n")
}

/// Summary sent once when the per-run cap withheld matches.
pub fn render_overflow(withheld: usize) -> String {
    format!(
        "⏳ {} more matching announcement(s) were withheld this run to avoid flooding the channel.",
        withheld
    )
}

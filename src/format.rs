//! Text shaping for list items and transcript entries

use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use regex::Regex;

pub const PREVIEW_CHARS: usize = 60;
pub const TITLE_CHARS: usize = 20;
pub const EMPTY_PREVIEW: &str = "Новый мир";
pub const INVALID_DATE: &str = "Invalid Date";

/// List preview: the last message (or the placeholder), cut at 60 chars.
pub fn preview(last_message: Option<&str>) -> String {
    let text = last_message.unwrap_or(EMPTY_PREVIEW);
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Title for a new chat. Always ends with "...", even for short requests.
pub fn chat_title(request: &str) -> String {
    let cut: String = request.chars().take(TITLE_CHARS).collect();
    format!("{}...", cut)
}

/// Client-side chat id: milliseconds since the Unix epoch.
pub fn chat_id_now() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

/// `dd.mm.yyyy, HH:MM` in local time, the ru-RU layout.
///
/// Timestamps without an offset are taken as local time.
pub fn list_date(last_updated: Option<&str>) -> String {
    last_updated
        .and_then(parse_timestamp)
        .map(|dt| dt.format("%d.%m.%Y, %H:%M").to_string())
        .unwrap_or_else(|| INVALID_DATE.to_string())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()?;
    Local.from_local_datetime(&naive).earliest()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Bold(&'a str),
}

fn bold_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"))
}

/// Split one line into plain and bold runs. Each `**...**` pair is matched
/// left to right, shortest first; markers inside a bold run are not nested.
pub fn segments(line: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in bold_pattern().captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            out.push(Segment::Plain(&line[last..whole.start()]));
        }
        out.push(Segment::Bold(inner.as_str()));
        last = whole.end();
    }

    if last < line.len() {
        out.push(Segment::Plain(&line[last..]));
    }
    out
}

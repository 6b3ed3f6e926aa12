use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single post as observed on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: String,
    time: DateTime<FixedOffset>,
    message: String,
    handle: String,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        time: DateTime<FixedOffset>,
        message: impl Into<String>,
        handle: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            time,
            message: message.into(),
            handle: handle.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn time(&self) -> DateTime<FixedOffset> {
        self.time
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn url(&self) -> String {
        format!("https://twitter.com/{}/status/{}", self.handle, self.id)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@{} | {} | {}", self.handle, self.time, self.url())?;
        write!(f, "\"{}\"", self.message)
    }
}

/// Position of the polling loop: either the moment it started or the last post it ingested.
#[derive(Debug, Clone, PartialEq)]
pub enum Cursor {
    Start(DateTime<Utc>),
    Seen(Record),
}

impl Cursor {
    pub fn start_now() -> Self {
        Cursor::Start(Utc::now())
    }

    /// Unix seconds used as the inclusive `since:` bound of the next search.
    pub fn since(&self) -> i64 {
        match self {
            Cursor::Start(time) => time.timestamp(),
            Cursor::Seen(record) => record.time().timestamp(),
        }
    }

    pub fn last_id(&self) -> Option<&str> {
        match self {
            Cursor::Start(_) => None,
            Cursor::Seen(record) => Some(record.id()),
        }
    }

    pub fn time(&self) -> DateTime<FixedOffset> {
        match self {
            Cursor::Start(time) => time.fixed_offset(),
            Cursor::Seen(record) => record.time(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, rfc3339: &str) -> Record {
        let time = DateTime::parse_from_rfc3339(rfc3339).unwrap();
        Record::new(id, time, "hello world", "thegrugq")
    }

    #[test]
    fn test_record_url() {
        let r = record("1299", "2020-08-20T10:00:00+00:00");
        assert_eq!(r.url(), "https://twitter.com/thegrugq/status/1299");
    }

    #[test]
    fn test_record_display_contains_message_and_url() {
        let r = record("42", "2020-08-20T10:00:00+00:00");
        let shown = r.to_string();
        assert!(shown.contains("@thegrugq"));
        assert!(shown.contains("https://twitter.com/thegrugq/status/42"));
        assert!(shown.ends_with("\"hello world\""));
    }

    #[test]
    fn test_cursor_since_and_last_id() {
        let start = Cursor::Start(DateTime::from_timestamp(1_600_000_000, 0).unwrap());
        assert_eq!(start.since(), 1_600_000_000);
        assert_eq!(start.last_id(), None);

        let seen = Cursor::Seen(record("7", "2020-09-13T12:26:40+00:00"));
        assert_eq!(seen.since(), 1_600_000_000);
        assert_eq!(seen.last_id(), Some("7"));
    }
}

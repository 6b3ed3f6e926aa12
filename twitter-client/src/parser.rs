//! Turns raw API payloads into [`Record`]s.
//!
//! The API is unofficial and unversioned, so any structural surprise is a
//! schema error rather than something to skip over.

use chrono::DateTime;
use postwatch_core::{CoreError, Record, TwitterApiError};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Default)]
pub struct ResponseParser {
    /// user id -> handle
    users: HashMap<String, String>,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the handle to user id mapping found in a `UserByScreenName` payload.
    ///
    /// Posts by users registered here are the only ones `parse_records` returns.
    pub fn resolve_handle(&mut self, handle: &str, user_json: &Value) -> Result<(), CoreError> {
        let user_id = user_json
            .pointer("/data/user/rest_id")
            .and_then(Value::as_str)
            .ok_or_else(|| TwitterApiError::schema("users"))?;

        debug!("Resolved @{} to user id {}", handle, user_id);
        self.users.insert(user_id.to_string(), handle.to_string());
        Ok(())
    }

    pub fn user_id(&self, handle: &str) -> Option<&str> {
        self.users
            .iter()
            .find(|(_, known)| known.as_str() == handle)
            .map(|(id, _)| id.as_str())
    }

    pub fn is_resolved(&self, handle: &str) -> bool {
        self.user_id(handle).is_some()
    }

    /// Converts a search response into records sorted oldest first.
    ///
    /// Embedded posts by other authors (quotes, retweeted originals) share the
    /// payload and are skipped.
    pub fn parse_records(&self, search_json: &Value, handle: &str) -> Result<Vec<Record>, CoreError> {
        let tweets = search_json
            .pointer("/globalObjects/tweets")
            .and_then(Value::as_object)
            .ok_or_else(|| TwitterApiError::schema("tweets"))?;

        let mut records = Vec::with_capacity(tweets.len());
        for (tweet_id, tweet) in tweets {
            let author_id = required_str(tweet, "user_id_str")?;
            if !self.users.contains_key(author_id) {
                continue;
            }

            let created_at = required_str(tweet, "created_at")?;
            let time = DateTime::parse_from_str(created_at, CREATED_AT_FORMAT)
                .map_err(|_| TwitterApiError::schema("a tweet"))?;
            let message = required_str(tweet, "full_text")?;

            records.push(Record::new(tweet_id.as_str(), time, message, handle));
        }

        records.sort_by(|a, b| a.time().cmp(&b.time()).then_with(|| cmp_ids(a.id(), b.id())));
        Ok(records)
    }
}

/// Post ids are decimal snowflakes, so a shorter id is the older one.
fn cmp_ids(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn required_str<'a>(tweet: &'a Value, field: &str) -> Result<&'a str, CoreError> {
    tweet
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| TwitterApiError::schema("a tweet").into())
}

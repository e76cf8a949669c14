//! Rendering of search results for the terminal.

use std::fmt::Write;

use serde_json::Value;

/// Records printed per search.
pub const MAX_DISPLAYED: usize = 5;

/// Characters of tweet text shown before truncation.
pub const TEXT_PREVIEW_CHARS: usize = 200;

const RULE_WIDTH: usize = 60;

/// Pull the record list out of a capability result.
///
/// The list is the result itself if it is an array, else its `content`
/// array, else its `result` array. Text content items whose `text` holds
/// JSON are decoded in place. Returns `None` for any other shape.
pub fn extract_records(result: &Value) -> Option<Vec<Value>> {
    let items = match result {
        Value::Array(items) => items,
        Value::Object(object) => match (object.get("content"), object.get("result")) {
            (Some(Value::Array(items)), _) | (_, Some(Value::Array(items))) => items,
            _ => return None,
        },
        _ => return None,
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match decode_text_item(item) {
            Some(Value::Array(decoded)) => records.extend(decoded),
            Some(decoded) => records.push(decoded),
            None => records.push(item.clone()),
        }
    }
    Some(records)
}

/// `{"type": "text", "text": "<json>"}` -> the decoded JSON.
fn decode_text_item(item: &Value) -> Option<Value> {
    if item.get("type").and_then(Value::as_str) != Some("text") {
        return None;
    }
    let text = item.get("text").and_then(Value::as_str)?;
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Array(_) | Value::Object(_))) => Some(value),
        _ => None,
    }
}

/// The fields shown for one tweet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetSummary {
    pub id: String,
    pub handle: String,
    pub text: String,
    pub created: String,
    pub retweets: u64,
    pub likes: u64,
}

impl TweetSummary {
    /// Read a record, accepting snake_case and camelCase field names.
    pub fn from_record(record: &Value) -> Self {
        let id = first_scalar(record, &["/id", "/id_str"]).unwrap_or_else(|| "unknown".to_string());
        let handle = first_scalar(
            record,
            &[
                "/user/username",
                "/user/screen_name",
                "/author/userName",
                "/author/username",
                "/username",
            ],
        )
        .unwrap_or_else(|| "unknown".to_string());
        let text = first_scalar(record, &["/text", "/full_text", "/fullText"]).unwrap_or_default();
        let created = first_scalar(record, &["/created_at", "/createdAt"])
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            id,
            handle,
            text: truncate(&text, TEXT_PREVIEW_CHARS),
            created,
            retweets: first_count(record, &["/retweet_count", "/retweetCount"]),
            likes: first_count(record, &["/favorite_count", "/favoriteCount", "/likeCount"]),
        }
    }
}

fn first_scalar(record: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|pointer| match record.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_count(record: &Value, pointers: &[&str]) -> u64 {
    pointers
        .iter()
        .find_map(|pointer| record.pointer(pointer)?.as_u64())
        .unwrap_or(0)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Render a capability result as terminal text.
pub fn render(result: &Value) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "\nResponse from server:");
    let _ = writeln!(out, "{}", rule);

    let Some(records) = extract_records(result) else {
        let raw = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
        let _ = writeln!(out, "Raw response: {}", raw);
        return out;
    };

    if records.is_empty() {
        let _ = writeln!(out, "No tweets found for your search");
        return out;
    }

    let _ = writeln!(out, "Found {} tweets:\n", records.len());
    for (index, record) in records.iter().take(MAX_DISPLAYED).enumerate() {
        let tweet = TweetSummary::from_record(record);
        let _ = writeln!(out, "Tweet {}:", index + 1);
        let _ = writeln!(out, "   ID: {}", tweet.id);
        let _ = writeln!(out, "   User: @{}", tweet.handle);
        let _ = writeln!(out, "   Text: {}", tweet.text);
        let _ = writeln!(out, "   Created: {}", tweet.created);
        let _ = writeln!(out, "   Retweets: {}", tweet.retweets);
        let _ = writeln!(out, "   Likes: {}", tweet.likes);
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "{}", rule);
    out
}

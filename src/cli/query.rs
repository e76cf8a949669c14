//! Interpretation of one line typed at the prompt.

use std::sync::LazyLock;

use regex::Regex;

use crate::search::{DEFAULT_QUERY_TYPE, SearchOptions};

/// `from:handle` or `@handle`. ASCII word characters only.
static USER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:from:|@)([A-Za-z0-9_]+)").expect("valid regex for user handles")
});

/// A line entered in the interactive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Help,
    Quit,
    Clear,
    /// Blank line
    Empty,
    Search(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "help" | "h" => Input::Help,
            "quit" | "q" => Input::Quit,
            "clear" | "c" => Input::Clear,
            "" => Input::Empty,
            _ => Input::Search(trimmed.to_string()),
        }
    }
}

/// Which search wrapper a query maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    /// Tweets from one account, newest first
    User { handle: String },
    /// Free-text search; `latest` pins the recency mode
    Text { query: String, latest: bool },
    /// Advanced query with date operators, sent as a single term
    Terms { terms: Vec<String> },
}

impl SearchRequest {
    /// Caller options for this request.
    pub fn options(&self) -> SearchOptions {
        match self {
            SearchRequest::User { .. } | SearchRequest::Text { latest: true, .. } => {
                SearchOptions::new().query_type(DEFAULT_QUERY_TYPE)
            }
            SearchRequest::Text { latest: false, .. } | SearchRequest::Terms { .. } => {
                SearchOptions::new()
            }
        }
    }
}

/// Classify a free-form query.
pub fn classify_query(query: &str) -> SearchRequest {
    let lower = query.to_lowercase();

    if lower.contains("from:") || lower.contains('@') {
        return match extract_handle(query) {
            Some(handle) => SearchRequest::User { handle },
            None => SearchRequest::Text {
                query: query.to_string(),
                latest: false,
            },
        };
    }

    if lower.contains("since:") || lower.contains("until:") {
        return SearchRequest::Terms {
            terms: vec![query.to_string()],
        };
    }

    SearchRequest::Text {
        query: query.to_string(),
        latest: true,
    }
}

fn extract_handle(query: &str) -> Option<String> {
    USER_PATTERN
        .captures(query)
        .and_then(|captures| captures.get(1))
        .map(|handle| handle.as_str().to_string())
}

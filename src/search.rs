//! Tweet search wrappers over [`Connection::invoke_capability`].
//!
//! Each wrapper builds the scraper's argument mapping from a few base keys
//! plus the configured defaults, then lets caller options override any key.

use serde_json::{Value, json};

use crate::bridge::Connection;
use crate::bridge::protocol::Params;
use crate::error::BridgeResult;

/// Default result cap.
pub const DEFAULT_MAX_ITEMS: u32 = 10;

/// Default recency mode.
pub const DEFAULT_QUERY_TYPE: &str = "Latest";

/// Caller-supplied arguments, merged last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions(Params);

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_items(self, max_items: u32) -> Self {
        self.set("maxItems", json!(max_items))
    }

    pub fn query_type(self, query_type: impl Into<String>) -> Self {
        self.set("queryType", Value::String(query_type.into()))
    }

    /// Set an arbitrary scraper argument.
    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }
}

impl From<Params> for SearchOptions {
    fn from(params: Params) -> Self {
        Self(params)
    }
}

/// Search front for one scraper capability on a connection.
pub struct TweetSearch<'a> {
    connection: &'a Connection,
    tool: String,
    max_items: u32,
    query_type: String,
}

impl<'a> TweetSearch<'a> {
    pub fn new(connection: &'a Connection, tool: impl Into<String>) -> Self {
        Self {
            connection,
            tool: tool.into(),
            max_items: DEFAULT_MAX_ITEMS,
            query_type: DEFAULT_QUERY_TYPE.to_string(),
        }
    }

    pub fn with_max_items(mut self, max_items: u32) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_query_type(mut self, query_type: impl Into<String>) -> Self {
        self.query_type = query_type.into();
        self
    }

    /// Free-text search: `{"searchTerms": [query], "maxItems", "queryType"}`.
    pub async fn search_tweets(&self, query: &str, options: SearchOptions) -> BridgeResult<Value> {
        self.invoke(self.text_arguments(query, options)).await
    }

    /// Tweets from one account: `{"from": handle, "maxItems", "queryType"}`.
    pub async fn search_tweets_by_user(
        &self,
        handle: &str,
        options: SearchOptions,
    ) -> BridgeResult<Value> {
        self.invoke(self.user_arguments(handle, options)).await
    }

    /// Advanced term list: `{"searchTerms": terms, "maxItems"}`.
    pub async fn search_tweets_by_terms(
        &self,
        terms: &[String],
        options: SearchOptions,
    ) -> BridgeResult<Value> {
        self.invoke(self.terms_arguments(terms, options)).await
    }

    async fn invoke(&self, arguments: Params) -> BridgeResult<Value> {
        self.connection.invoke_capability(&self.tool, arguments).await
    }

    fn text_arguments(&self, query: &str, options: SearchOptions) -> Params {
        let mut base = Params::new();
        base.insert("searchTerms".to_string(), json!([query]));
        base.insert("maxItems".to_string(), json!(self.max_items));
        base.insert("queryType".to_string(), json!(self.query_type));
        merge(base, options)
    }

    fn user_arguments(&self, handle: &str, options: SearchOptions) -> Params {
        let mut base = Params::new();
        base.insert("from".to_string(), json!(handle));
        base.insert("maxItems".to_string(), json!(self.max_items));
        base.insert("queryType".to_string(), json!(self.query_type));
        merge(base, options)
    }

    fn terms_arguments(&self, terms: &[String], options: SearchOptions) -> Params {
        let mut base = Params::new();
        base.insert("searchTerms".to_string(), json!(terms));
        base.insert("maxItems".to_string(), json!(self.max_items));
        merge(base, options)
    }
}

/// Caller options win on key collision.
fn merge(mut base: Params, options: SearchOptions) -> Params {
    base.extend(options.0);
    base
}

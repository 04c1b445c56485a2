//! Query encoding for list and watch calls
//!
//! Selectors and options are turned into a canonical query string: parameters
//! appear in a fixed order, selector pairs are sorted by key and every value
//! is URL-encoded. Encoding never fails and identical inputs always produce
//! identical output.

use crate::error::ClientError;
use crate::models::LabelSelector;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Field selector: `key=value` pairs matched against object fields,
/// e.g. `metadata.name=web-0` or `spec.nodeName=worker-1`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    pub fields: BTreeMap<String, String>,
}

impl FieldSelector {
    /// An empty selector
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key=value`, builder style
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    /// True when no field is constrained
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldSelector {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Parse `k=v,k2=v2` text. Whitespace around keys and values is ignored.
fn parse_pairs(text: &str) -> Result<BTreeMap<String, String>, ClientError> {
    let mut pairs = BTreeMap::new();
    for clause in text.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let (key, value) = clause
            .split_once('=')
            .ok_or_else(|| ClientError::InvalidArgument(format!("selector clause '{}' is not key=value", clause)))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ClientError::InvalidArgument(format!(
                "selector clause '{}' has an empty key",
                clause
            )));
        }
        pairs.insert(key.to_string(), value.trim().to_string());
    }
    Ok(pairs)
}

impl FromStr for LabelSelector {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LabelSelector {
            match_labels: parse_pairs(s)?,
        })
    }
}

impl FromStr for FieldSelector {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FieldSelector { fields: parse_pairs(s)? })
    }
}

/// Filters and paging for list calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub label_selector: Option<LabelSelector>,
    pub field_selector: Option<FieldSelector>,
    /// Page size; the server may return fewer items
    pub limit: Option<u32>,
    /// Continuation token from a previous page
    pub continue_token: Option<String>,
}

impl ListOptions {
    pub fn with_label_selector(mut self, selector: LabelSelector) -> Self {
        self.label_selector = Some(selector);
        self
    }

    pub fn with_field_selector(mut self, selector: FieldSelector) -> Self {
        self.field_selector = Some(selector);
        self
    }

    /// Set the page size
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume from a previous page
    pub fn with_continue_token(mut self, token: impl Into<String>) -> Self {
        self.continue_token = Some(token.into());
        self
    }
}

/// Filters and stream parameters for watch calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOptions {
    pub label_selector: Option<LabelSelector>,
    pub field_selector: Option<FieldSelector>,
    /// Only changes strictly newer than this version are streamed
    pub resource_version: Option<String>,
    /// Replay current state as synthetic ADDED events before live changes
    pub send_initial_events: bool,
    /// Ask the server for periodic BOOKMARK events
    pub allow_bookmarks: bool,
    /// Server-side stream lifetime
    pub timeout_seconds: Option<u32>,
}

impl WatchOptions {
    pub fn with_label_selector(mut self, selector: LabelSelector) -> Self {
        self.label_selector = Some(selector);
        self
    }

    pub fn with_field_selector(mut self, selector: FieldSelector) -> Self {
        self.field_selector = Some(selector);
        self
    }

    /// Start after this version; empty means "now"
    pub fn with_resource_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.resource_version = if version.is_empty() { None } else { Some(version) };
        self
    }

    /// Replay current state as ADDED events first
    pub fn with_initial_events(mut self) -> Self {
        self.send_initial_events = true;
        self
    }

    /// Request BOOKMARK progress events
    pub fn with_bookmarks(mut self) -> Self {
        self.allow_bookmarks = true;
        self
    }

    /// Ask the server to end the stream after `seconds`
    pub fn with_timeout_seconds(mut self, seconds: u32) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

/// `k1=v1,k2=v2` with keys in sorted order
fn join_pairs(pairs: &BTreeMap<String, String>) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

fn push_param(params: &mut Vec<String>, key: &str, value: &str) {
    params.push(format!("{}={}", key, urlencoding::encode(value)));
}

fn push_selectors(params: &mut Vec<String>, label: Option<&LabelSelector>, field: Option<&FieldSelector>) {
    if let Some(label) = label.filter(|l| !l.is_empty()) {
        push_param(params, "labelSelector", &join_pairs(&label.match_labels));
    }
    if let Some(field) = field.filter(|f| !f.is_empty()) {
        push_param(params, "fieldSelector", &join_pairs(&field.fields));
    }
}

/// Encode selectors and (optionally) watch parameters into a query string
/// without the leading `?`. All-absent input encodes to the empty string.
pub fn encode_query(
    label: Option<&LabelSelector>,
    field: Option<&FieldSelector>,
    watch: Option<&WatchOptions>,
) -> String {
    let mut params = Vec::new();
    push_selectors(&mut params, label, field);

    if let Some(opts) = watch {
        params.push("watch=true".to_string());
        if let Some(version) = opts.resource_version.as_deref().filter(|v| !v.is_empty()) {
            push_param(&mut params, "resourceVersion", version);
        }
        if opts.send_initial_events {
            params.push("resourceVersionMatch=NotOlderThan".to_string());
        }
        // The server rejects sendInitialEvents without bookmarks
        if opts.allow_bookmarks || opts.send_initial_events {
            params.push("allowWatchBookmarks=true".to_string());
        }
        if opts.send_initial_events {
            params.push("sendInitialEvents=true".to_string());
        }
        if let Some(timeout) = opts.timeout_seconds {
            params.push(format!("timeoutSeconds={}", timeout));
        }
    }

    params.join("&")
}

/// Query for a list call
pub fn list_query(opts: Option<&ListOptions>) -> String {
    let Some(opts) = opts else {
        return String::new();
    };
    let mut params = Vec::new();
    push_selectors(&mut params, opts.label_selector.as_ref(), opts.field_selector.as_ref());
    if let Some(limit) = opts.limit {
        params.push(format!("limit={}", limit));
    }
    if let Some(token) = opts.continue_token.as_deref().filter(|t| !t.is_empty()) {
        push_param(&mut params, "continue", token);
    }
    params.join("&")
}

/// Query for a watch call; absent options still request a watch stream
pub fn watch_query(opts: Option<&WatchOptions>) -> String {
    let default = WatchOptions::default();
    let opts = opts.unwrap_or(&default);
    encode_query(opts.label_selector.as_ref(), opts.field_selector.as_ref(), Some(opts))
}

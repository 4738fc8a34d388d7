//! Cache-busting for export links
//!
//! The gateway reuses the same output path when a file is re-analyzed, so
//! every rendered link carries a `t=<millis>` query parameter. Stamps are
//! strictly increasing per [`CacheBuster`], which keeps two runs inside
//! the same millisecond distinct.

use chrono::Utc;

/// Query parameter name appended to export links
pub const CACHE_BUST_PARAM: &str = "t";

#[derive(Debug, Default)]
pub struct CacheBuster {
    last_stamp: i64,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next stamp: current time in millis, bumped past the previous stamp
    pub fn next_stamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let stamp = now.max(self.last_stamp + 1);
        self.last_stamp = stamp;
        stamp
    }

    pub fn bust(&mut self, url: &str) -> String {
        let stamp = self.next_stamp();
        append_query_param(url, CACHE_BUST_PARAM, &stamp.to_string())
    }
}

/// Append `key=value` to a URL, before any `#fragment`
pub fn append_query_param(url: &str, key: &str, value: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };

    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };

    let mut out = format!("{}{}{}={}", base, separator, key, value);
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

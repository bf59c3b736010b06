//! Login cookie jar
//!
//! The login flow manages cookies by hand instead of using a client-side
//! cookie store: the jar is part of the persisted session record, and the
//! merge rule below differs from RFC cookie semantics in one point the
//! upstream relies on — an empty-valued `Set-Cookie` must not clobber an
//! existing entry.

use std::collections::HashMap;

use reqwest::header::SET_COOKIE;

/// Merge every `Set-Cookie` header of `response` into the jar.
pub fn merge_response_cookies(jar: &mut HashMap<String, String>, response: &reqwest::Response) {
    for header in response.headers().get_all(SET_COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        let pair = raw.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else { continue };
        merge_cookie(jar, name.trim(), value.trim());
    }
}

/// Merge a single cookie. An empty value never overwrites an existing entry;
/// surrounding quotes (as emitted by the registration endpoint) are stripped.
pub fn merge_cookie(jar: &mut HashMap<String, String>, name: &str, value: &str) {
    let value = value.trim_matches('"');
    if name.is_empty() || value.is_empty() {
        return;
    }
    jar.insert(name.to_string(), value.to_string());
}

/// Render the jar as a `Cookie:` header value, sorted by name so the output
/// is deterministic.
pub fn cookie_header(jar: &HashMap<String, String>) -> String {
    let mut pairs: Vec<_> = jar.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

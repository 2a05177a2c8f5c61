//! Upstream URL construction.

/// Join the configured target base URL with an inbound request path so that
/// exactly one `/` separates them, regardless of how each is terminated.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

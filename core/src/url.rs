//! Base URL joining and query appending.

/// Join `base` and `path`. Absolute (`http://`, `https://`, any case) and
/// protocol-relative (`//`) paths are returned unchanged.
pub fn resolve(base: &str, path: &str) -> String {
    if is_absolute(path) {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Append `query` with `?`, or `&` when `url` already has a query part.
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

fn is_absolute(path: &str) -> bool {
    if path.starts_with("//") {
        return true;
    }
    ["http://", "https://"].iter().any(|scheme| {
        path.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

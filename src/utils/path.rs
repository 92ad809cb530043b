//! Canonical virtual paths for the WebDAV driver.
//!
//! Every path handed to the protocol client is rooted, uses single '/'
//! separators, and ends with '/' only when it names a collection. Encoding
//! works segment by segment so separators survive; apply [`encode`] exactly
//! once on the way out and [`decode`] exactly once on the way in.

/// Canonicalize `path`. The root is always `/`.
pub fn normalize(path: &str, is_collection: bool) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }

    let mut normalized = String::with_capacity(path.len() + 2);
    for segment in &segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if is_collection {
        normalized.push('/');
    }
    normalized
}

/// Join segments into one rooted path, dropping empty pieces
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let parts: Vec<&str> = segments
        .iter()
        .map(|s| s.as_ref().trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", parts.join("/"))
}

/// Parent collection of `path`; `/` for the root and first-level entries
pub fn parent(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
    }
}

/// Last segment of `path`; empty for the root
pub fn file_name(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

pub fn is_root(path: &str) -> bool {
    path.chars().all(|c| c == '/')
}

/// Percent-encode each segment, keeping separators intact
pub fn encode(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of [`encode`]. Segments that are not valid percent-encoded UTF-8 are kept as-is.
pub fn decode(path: &str) -> String {
    path.split('/')
        .map(|segment| match urlencoding::decode(segment) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Common utilities and shared functions for the WebDAV driver

/// Build a standardized User-Agent string for all WebDAV requests
pub fn build_user_agent() -> String {
    format!("webdav-driver/{} (WebDAV-Storage)", env!("CARGO_PKG_VERSION"))
}

/// Path portion of an href that may be an absolute URL
///
/// Input:  "https://cloud.example.com/remote.php/webdav/a.txt"
/// Output: "/remote.php/webdav/a.txt"
pub fn strip_origin(href: &str) -> &str {
    match href.find("://") {
        Some(scheme_end) => {
            let after_scheme = &href[scheme_end + 3..];
            match after_scheme.find('/') {
                Some(path_start) => &after_scheme[path_start..],
                None => "/",
            }
        }
        None => href,
    }
}

/// Extract the numeric code from a `DAV:status` line such as `HTTP/1.1 200 OK`
pub fn parse_status_line(line: &str) -> Option<u16> {
    line.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
}

/// Strip surrounding quotes from an ETag value, keeping any weak `W/` marker
pub fn clean_etag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let cleaned = match trimmed.strip_prefix("W/") {
        Some(rest) => format!("W/{}", rest.trim_matches('"')),
        None => trimmed.trim_matches('"').to_string(),
    };
    if cleaned.is_empty() || cleaned == "W/" {
        None
    } else {
        Some(cleaned)
    }
}

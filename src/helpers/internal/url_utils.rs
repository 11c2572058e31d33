//! URL parsing and validation utilities
//!
//! Provides helpers for extracting filenames from URLs, deriving sidecar
//! locations and validating URL schemes.

/// Schemes the transport can fetch
const ALLOWED_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Validate that a URL uses http or https.
pub fn validate_url_scheme(url: &str) -> Result<(), String> {
    let url_lower = url.to_lowercase();
    if ALLOWED_SCHEMES.iter().any(|s| url_lower.starts_with(s)) {
        return Ok(());
    }
    Err(format!("URL must use one of: {:?}\n  got: {}", ALLOWED_SCHEMES, url))
}

/// Extract filename from a URL.
///
/// Handles query strings and fragments, returns "download" as fallback.
///
/// # Example
/// ```ignore
/// assert_eq!(extract_filename("https://example.com/foo-1.0.tar.gz"), "foo-1.0.tar.gz");
/// assert_eq!(extract_filename("https://example.com/file?v=1"), "file");
/// ```
pub fn extract_filename(url: &str) -> String {
    let clean_url = strip_query_and_fragment(url);

    // Get last path segment
    let filename = clean_url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(sanitize_filename)
        .unwrap_or_else(|| "download".to_string());

    // If it looks like a domain (common TLD, no separators), return "download"
    if filename.contains('.') {
        let ext = filename.rsplit('.').next().unwrap_or("");
        let common_tlds = [
            "com", "org", "net", "io", "dev", "co", "uk", "de", "fr", "ru",
        ];
        if common_tlds.contains(&ext) && !filename.contains('_') && !filename.contains('-') {
            return "download".to_string();
        }
    }

    filename
}

/// Location of the SCT sidecar published next to an artifact.
///
/// The suffix goes on the path, before any query string; fragments are
/// dropped since they never reach the server.
///
/// # Example
/// ```ignore
/// assert_eq!(sidecar_url("https://example.com/a.tar.gz?v=1", ".sct"),
///            "https://example.com/a.tar.gz.sct?v=1");
/// ```
pub fn sidecar_url(url: &str, suffix: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    match without_fragment.split_once('?') {
        Some((path, query)) => format!("{}{}?{}", path, suffix, query),
        None => format!("{}{}", without_fragment, suffix),
    }
}

fn strip_query_and_fragment(url: &str) -> &str {
    let clean_url = url.split('?').next().unwrap_or(url);
    clean_url.split('#').next().unwrap_or(clean_url)
}

/// Sanitize a filename for safe filesystem use.
///
/// Replaces problematic characters and handles special names.
pub fn sanitize_filename(name: &str) -> String {
    // Handle empty or special names
    if name.is_empty() || name == "." || name == ".." {
        return "download".to_string();
    }

    // Replace problematic characters
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Trim leading/trailing whitespace and dots
    let trimmed = sanitized.trim().trim_matches('.');

    if trimmed.is_empty() {
        "download".to_string()
    } else {
        trimmed.to_string()
    }
}

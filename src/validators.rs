//! Validation for form fields and configuration values.

/// Parse a rating field, falling back to `default` when it is blank.
///
/// Only blank input counts as missing. A typed `0` is a rating like any
/// other. Surrounding whitespace is ignored.
pub fn parse_rating_or_default(input: &str, default: i32) -> Result<i32, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    trimmed
        .parse::<i32>()
        .map_err(|e| rating_error_message(trimmed, e.kind()))
}

/// Validate a rating field.
/// Returns an error message if validation fails, None if valid.
pub fn validate_rating(input: &str) -> Option<String> {
    parse_rating_or_default(input, 0).err()
}

/// Convert an integer parse failure to a message for the rating field.
fn rating_error_message(input: &str, kind: &std::num::IntErrorKind) -> String {
    use std::num::IntErrorKind;
    match kind {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => "Rating is too large".to_string(),
        _ if input.contains('.') => "Rating must be a whole number".to_string(),
        _ => "Rating must be a number".to_string(),
    }
}

/// Validate that a service URL is absolute and uses http or https.
/// Returns an error message if validation fails, None if valid.
pub fn validate_service_url(url: &str) -> Option<String> {
    if url.trim().is_empty() {
        return Some("Service URL cannot be empty".to_string());
    }

    match reqwest::Url::parse(url) {
        Ok(parsed) => check_url_scheme(parsed.scheme()),
        Err(e) => Some(format!("Invalid service URL: {}", e)),
    }
}

/// Check that a URL scheme can be used to reach the service (pure function).
fn check_url_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "http" | "https" => None,
        other => Some(format!("Unsupported URL scheme: {}", other)),
    }
}

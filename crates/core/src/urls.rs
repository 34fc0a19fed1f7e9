//! Outbound peer URL normalization and validation.
//!
//! Every URL a user supplies for a peer server goes through
//! [`normalize_base_url`] before it is stored or dialed. Loopback hosts are
//! rejected by default; the caller may pass `allow_localhost = true` (an
//! explicit, logged configuration choice) to permit them for development
//! setups.

use crate::error::CoreError;

/// Maximum accepted base URL length.
const MAX_URL_LEN: usize = 2048;

/// Normalize a peer base URL.
///
/// - trims surrounding whitespace;
/// - prepends `https://` when no scheme is present;
/// - rejects schemes other than `http` / `https`;
/// - rejects empty hosts, over-long URLs, and hosts containing characters
///   outside the hostname alphabet;
/// - rejects loopback hosts unless `allow_localhost` is set;
/// - strips trailing slashes.
pub fn normalize_base_url(input: &str, allow_localhost: bool) -> Result<String, CoreError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Server URL must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_URL_LEN {
        return Err(CoreError::Validation(format!(
            "Server URL must not exceed {MAX_URL_LEN} characters"
        )));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let rest = with_scheme
        .strip_prefix("https://")
        .or_else(|| with_scheme.strip_prefix("http://"))
        .ok_or_else(|| {
            let scheme = with_scheme.split("://").next().unwrap_or("");
            CoreError::Validation(format!(
                "Unsupported URL scheme '{scheme}': only http and https are allowed"
            ))
        })?;

    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .rsplit('@')
        .next()
        .unwrap_or("");
    let (hostname, is_ipv6) = match host.strip_prefix('[') {
        Some(bracketed) => (bracketed.split(']').next().unwrap_or(""), true),
        None => (host.split(':').next().unwrap_or(""), false),
    };

    if hostname.is_empty() {
        return Err(CoreError::Validation(
            "Server URL has no host".to_string(),
        ));
    }

    let host_chars_ok = if is_ipv6 {
        hostname.chars().all(|c| c.is_ascii_hexdigit() || c == ':')
    } else {
        hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    };
    if !host_chars_ok {
        return Err(CoreError::Validation(format!(
            "Server URL has an invalid host '{hostname}'"
        )));
    }

    if is_loopback_host(hostname) && !allow_localhost {
        return Err(CoreError::Validation(format!(
            "Refusing loopback server URL '{hostname}' (set PEER_ALLOW_LOCALHOST=true to allow)"
        )));
    }

    Ok(with_scheme.trim_end_matches('/').to_string())
}

/// Whether a hostname refers to the local machine.
pub fn is_loopback_host(hostname: &str) -> bool {
    let h = hostname.to_ascii_lowercase();
    h == "localhost" || h == "::1" || h == "[::1]" || h.starts_with("127.")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

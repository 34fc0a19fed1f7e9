//! Invitation and access token generation.
//!
//! Invitation codes are meant to be read over the phone or pasted into a
//! form, so they use a base32 alphabet with the ambiguous characters
//! (`0/O`, `1/I/L`) removed and are grouped into four-character blocks.
//! Access tokens are machine-to-machine bearer secrets and use the full
//! alphanumeric alphabet at a much longer length.

use rand::Rng;

use crate::error::CoreError;

/// Alphabet for invitation codes. No `0`, `O`, `1`, `I`, `L`.
const INVITATION_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Alphabet for access token secrets.
const SECRET_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Number of random symbols in an invitation code (before grouping).
/// 16 symbols from a 31-character alphabet is ~79 bits of entropy,
/// comfortably above the 64-bit floor.
const INVITATION_CODE_LEN: usize = 16;

/// Size of each human-readable block in a formatted invitation code.
const INVITATION_BLOCK_LEN: usize = 4;

/// Length of an access token secret.
const ACCESS_TOKEN_LEN: usize = 48;

/// Maximum invitation display-name length.
const MAX_NAME_LEN: usize = 128;

/// Generate a new invitation code, formatted as `XXXX-XXXX-XXXX-XXXX`.
pub fn generate_invitation_code() -> String {
    let mut rng = rand::rng();
    let raw: String = (0..INVITATION_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..INVITATION_ALPHABET.len());
            INVITATION_ALPHABET[idx] as char
        })
        .collect();
    group_code(&raw)
}

/// Generate a new access token secret.
pub fn generate_access_token() -> String {
    let mut rng = rand::rng();
    (0..ACCESS_TOKEN_LEN)
        .map(|_| {
            let idx = rng.random_range(0..SECRET_ALPHABET.len());
            SECRET_ALPHABET[idx] as char
        })
        .collect()
}

/// Insert `-` separators every [`INVITATION_BLOCK_LEN`] characters.
fn group_code(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / INVITATION_BLOCK_LEN);
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && i % INVITATION_BLOCK_LEN == 0 {
            out.push('-');
        }
        out.push(c);
    }
    out
}

/// Canonicalize a user-supplied invitation code for lookup.
///
/// Uppercases and strips separators and whitespace so that `abcd-efgh`,
/// `ABCD EFGH`, and `ABCDEFGH` all compare equal. The canonical *stored*
/// form keeps the grouped separators, so this re-groups after cleaning.
pub fn canonicalize_invitation_code(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    group_code(&cleaned)
}

/// Mask a token for log output, showing only the last 4 characters.
pub fn token_hint(token: &str) -> String {
    if token.len() >= 4 {
        format!("...{}", &token[token.len() - 4..])
    } else {
        "****".to_string()
    }
}

/// Validate the parameters for issuing an invitation.
pub fn validate_invitation_params(
    name: Option<&str>,
    ttl_days: i64,
    max_uses: i32,
) -> Result<(), CoreError> {
    if ttl_days < 1 {
        return Err(CoreError::Validation(
            "Invitation TTL must be at least 1 day".to_string(),
        ));
    }
    if max_uses < 1 {
        return Err(CoreError::Validation(
            "Invitation must allow at least 1 use".to_string(),
        ));
    }
    if let Some(name) = name {
        if name.len() > MAX_NAME_LEN {
            return Err(CoreError::Validation(format!(
                "Invitation name must not exceed {MAX_NAME_LEN} characters"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Access tokens that stay out of logs.
//!
//! Tokens are held as [`secrecy::SecretString`]; the raw value is only
//! reachable through [`ExposeSecret::expose_secret`], which callers use to
//! feed the token to a child process over stdin.

pub use secrecy::{ExposeSecret, SecretString};

/// Placeholder printed wherever a secret would otherwise appear.
pub const REDACTED: &str = "****";

/// Read a secret from an environment variable, ignoring empty values.
pub fn from_env(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

/// Replace every whole-token occurrence of `secret` in `text` with
/// [`REDACTED`].
///
/// A match only counts when it is not embedded in a longer word, so a short
/// token cannot mangle unrelated output.
pub fn scrub(secret: &SecretString, text: &str) -> String {
    let needle = secret.expose_secret();
    if needle.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, _) in text.match_indices(needle) {
        if start < last {
            continue;
        }
        let end = start + needle.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        if before.is_some_and(is_token_char) || after.is_some_and(is_token_char) {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(REDACTED);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

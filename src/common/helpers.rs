// Helper functions for safe logging and config parsing

use chrono::Duration;

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            format!("{}***@{}", &parts[0][..1.min(parts[0].len())], parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
///
/// # Example
/// ```
/// let masked = safe_token_log("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
/// // Returns: "eyJh...VCJ9"
/// ```
#[allow(dead_code)]
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Parses a duration string like "1d", "12h", "30m" or "45s".
/// A bare number is read as seconds. Returns None for anything else.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (amount, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], Some(c)),
        _ => (value, None),
    };

    let amount: i64 = amount.parse().ok()?;
    match unit {
        Some('d') => Some(Duration::days(amount)),
        Some('h') => Some(Duration::hours(amount)),
        Some('m') => Some(Duration::minutes(amount)),
        Some('s') | None => Some(Duration::seconds(amount)),
        _ => None,
    }
}

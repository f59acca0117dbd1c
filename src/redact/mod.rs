use once_cell::sync::Lazy;
use regex::Regex;

/// SSN-like numbers (with optional `-`/`.` separators), bare 10-digit
/// numbers, and email-like tokens. Detection is best-effort.
static PII_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\b\d{3}[-.]?\d{2}[-.]?\d{4}\b|\b\d{10}\b|[\w.-]+@[\w.-]+)")
        .unwrap()
});

pub const REDACTED: &str = "[REDACTED]";

/// Replace every PII-like substring with the redaction marker. Applied to
/// transmitted and logged copies only; the UI may still display the
/// original text.
pub fn scrub(text: &str) -> String {
    PII_REGEX.replace_all(text, REDACTED).into_owned()
}

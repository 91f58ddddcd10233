//! Regex fallbacks for contact details and labelled amounts.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("Failed to compile email regex")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.\-]?)?(?:\(\d{1,4}\)[\s.\-]?)?\d{1,4}(?:[\s.\-]?\d{1,4}){1,5}")
        .expect("Failed to compile phone regex")
});

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*?):\s*(?:php|₱)?\s*([\d,]+(?:\.\d+)?)").expect("Failed to compile amount regex")
});

static NAME_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*-\s*(.+)$").expect("Failed to compile name/value regex"));

static STEP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("Failed to compile step regex"));

static AGE_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ages?\s+(\d+\s*(?:to|-|–)\s*\d+)").expect("Failed to compile age regex"));

const MIN_PHONE_DIGITS: usize = 7;

/// Distinct email addresses in first-seen order.
pub fn emails(text: &str) -> Vec<String> {
    distinct(EMAIL_RE.find_iter(text).map(|m| m.as_str().trim_end_matches('.').to_string()))
}

/// Distinct phone-like numbers with at least seven digits.
pub fn phones(text: &str) -> Vec<String> {
    distinct(
        PHONE_RE
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .filter(|p| p.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS),
    )
}

/// `"Application Fee: Php 5,000.00"` -> `("Application Fee", "5,000.00")`.
pub fn labelled_amount(line: &str) -> Option<(String, String)> {
    let caps = AMOUNT_RE.captures(line.trim())?;
    let label = caps.get(1)?.as_str().trim();
    if label.is_empty() {
        return None;
    }
    Some((label.to_string(), caps.get(2)?.as_str().to_string()))
}

/// `"Bus Fee - Php 10,000"` -> `("Bus Fee", "Php 10,000")`.
pub fn name_value(text: &str) -> Option<(String, String)> {
    let caps = NAME_VALUE_RE.captures(text.trim())?;
    Some((caps.get(1)?.as_str().trim().to_string(), caps.get(2)?.as_str().trim().to_string()))
}

/// First integer in the label, e.g. `"STEP 3: Interview"` -> 3.
pub fn step_number(label: &str) -> Option<u32> {
    STEP_RE.find(label)?.as_str().parse().ok()
}

/// `"for ages 5 to 7"` -> `"5 to 7"`.
pub fn age_range(text: &str) -> Option<String> {
    Some(AGE_RANGE_RE.captures(text)?.get(1)?.as_str().to_string())
}

fn distinct(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

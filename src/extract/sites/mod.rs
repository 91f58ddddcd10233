//! Bespoke extractors, one per school website.
//!
//! Each extractor fetches in its async methods and hands the markup to a
//! synchronous `parse_*` function, so parsed documents never live across an
//! await point.

pub mod bsm;
pub mod cism;
pub mod faith;
pub mod ism;
pub mod ris;
pub mod ssm;
pub mod vcis;

use scraper::ElementRef;
use serde_json::{Map, Value, json};

use crate::document::{ElementExt, Query, absolute_url};
use crate::extract::patterns::{emails, phones};

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Direct `li` children's collapsed text, empties dropped.
pub(crate) fn list_items(list: ElementRef<'_>) -> Vec<String> {
    list.child_elements()
        .into_iter()
        .filter(|e| e.tag() == "li")
        .map(|li| li.text_collapsed())
        .filter(|t| !t.is_empty())
        .collect()
}

/// `{name, url}` for every anchor under `scope`, resolved against `base`.
pub(crate) fn links(scope: ElementRef<'_>, base: &str) -> Vec<Value> {
    scope
        .select_all("a[href]")
        .into_iter()
        .filter_map(|a| {
            let href = a.attr_str("href")?.trim();
            if href.is_empty() || href.starts_with('#') {
                return None;
            }
            Some(json!({ "name": a.text_collapsed(), "url": absolute_url(base, href) }))
        })
        .collect()
}

/// First match of `css` whose text contains `needle` (case-insensitive).
pub(crate) fn find_containing<'a>(scope: impl Query<'a>, css: &str, needle: &str) -> Option<ElementRef<'a>> {
    let needle = needle.to_lowercase();
    scope
        .select_all(css)
        .into_iter()
        .find(|e| e.text_collapsed().to_lowercase().contains(&needle))
}

/// `mailto:` targets under `scope`, query strings dropped.
pub(crate) fn mailto_addresses(scope: ElementRef<'_>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for a in scope.select_all("a[href^='mailto:']") {
        let Some(href) = a.attr_str("href") else { continue };
        let addr = href.trim_start_matches("mailto:").split('?').next().unwrap_or("").trim().to_string();
        if !addr.is_empty() && !out.contains(&addr) {
            out.push(addr);
        }
    }
    out
}

/// `tel:` targets under `scope`.
pub(crate) fn tel_numbers(scope: ElementRef<'_>) -> Vec<String> {
    scope
        .select_all("a[href^='tel:']")
        .into_iter()
        .filter_map(|a| a.attr_str("href"))
        .map(|h| h.trim_start_matches("tel:").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Link targets first, then addresses and numbers found in the page text.
/// Empty when neither turns anything up.
pub(crate) fn scanned_contact(root: ElementRef<'_>) -> Map<String, Value> {
    let text = root.visible_text();

    let mut found_emails = mailto_addresses(root);
    merge_new(&mut found_emails, emails(&text));
    let mut found_phones = tel_numbers(root);
    merge_new(&mut found_phones, phones(&text));

    let mut out = Map::new();
    if !found_emails.is_empty() {
        out.insert("emails".into(), json!(found_emails));
    }
    if !found_phones.is_empty() {
        out.insert("phones".into(), json!(found_phones));
    }
    out
}

fn merge_new(into: &mut Vec<String>, more: Vec<String>) {
    for item in more {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

/// True when a payload holds at least one non-empty leaf.
pub(crate) fn has_content(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => a.iter().any(has_content),
        Value::Object(o) => o.values().any(has_content),
    }
}

/// Drop keys whose values carry no content.
pub(crate) fn prune_empty(map: &mut Map<String, Value>) {
    map.retain(|_, v| has_content(v));
}

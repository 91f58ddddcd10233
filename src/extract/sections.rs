//! Table/list post-processing shared by the site extractors.

use std::collections::HashMap;

use crate::extract::patterns::step_number;

// ── Section state machine ─────────────────────────────────────────────────────

/// A header row opens section `key` when its first cell contains every word
/// of `all_of` (case-insensitive).
#[derive(Debug, Clone, Copy)]
pub struct SectionRule {
    pub key: &'static str,
    pub all_of: &'static [&'static str],
}

impl SectionRule {
    fn matches(&self, header: &str) -> bool {
        let upper = header.to_uppercase();
        self.all_of.iter().all(|w| upper.contains(&w.to_uppercase()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRow {
    pub section: &'static str,
    pub cells: Vec<String>,
}

/// Walk table rows attributing each data row to the most recent header.
///
/// Rows are checked for a section header before the cell-count filter, so a
/// header spanning fewer columns still switches sections. Data rows seen
/// before any header are dropped. Rows with an empty first cell, or an empty
/// second cell when at least two are required, are treated as spacing.
pub fn attribute_rows(rows: &[Vec<String>], rules: &[SectionRule], min_cells: usize) -> Vec<SectionRow> {
    let mut current: Option<&'static str> = None;
    let mut out = Vec::new();

    for cells in rows {
        let Some(first) = cells.first() else { continue };
        if first.is_empty() {
            continue;
        }

        if let Some(rule) = rules.iter().find(|r| r.matches(first)) {
            current = Some(rule.key);
            continue;
        }

        let Some(section) = current else { continue };
        if cells.len() < min_cells {
            continue;
        }
        if min_cells >= 2 && cells.get(1).is_none_or(|c| c.is_empty()) {
            continue;
        }

        out.push(SectionRow { section, cells: cells.clone() });
    }

    out
}

// ── Common requirements ───────────────────────────────────────────────────────

/// Items present in at least `floor(lists.len() / 2)` of the lists, in the
/// order they were first seen.
pub fn common_items(lists: &[Vec<String>]) -> Vec<String> {
    if lists.is_empty() {
        return Vec::new();
    }
    let threshold = lists.len() / 2;

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for list in lists {
        let mut seen_here: Vec<&str> = Vec::new();
        for item in list {
            let item = item.as_str();
            if seen_here.contains(&item) {
                continue;
            }
            seen_here.push(item);
            let count = counts.entry(item).or_insert(0);
            if *count == 0 {
                order.push(item);
            }
            *count += 1;
        }
    }

    order
        .into_iter()
        .filter(|item| counts.get(item).copied().unwrap_or(0) >= threshold)
        .map(str::to_string)
        .collect()
}

// ── Step ordering ─────────────────────────────────────────────────────────────

/// Stable sort by the step number parsed from `label`; unnumbered steps keep
/// their relative order after the numbered ones.
pub fn sort_steps<T>(steps: &mut [T], label: impl Fn(&T) -> &str) {
    steps.sort_by_key(|s| step_number(label(s)).unwrap_or(u32::MAX));
}

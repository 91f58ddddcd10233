//! Singapore School Manila.

use async_trait::async_trait;
use scraper::ElementRef;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::{find_containing, has_content, prune_empty};
use crate::document::{ElementExt, Query, parse, row_cells};
use crate::extract::patterns::{emails, labelled_amount, step_number};
use crate::extract::sections::sort_steps;
use crate::extract::{FieldResult, SiteExtractor, SiteProfile};
use crate::fetcher::PageFetcher;
use crate::models::ExtractionResult;

const TUITION_PATH: &str = "/tuition-and-fees";
const ADMISSION_PATH: &str = "/admission/";
const CONTACT_PATH: &str = "/contact-us/";

const STEP_SPAN: &str = "span[style*='color:#283771']";
const NOTE_SPAN: &str = "span[style*='color:#9a0303']";
const HEADINGS: &str = "h1, h2, h3, h4, h5";

pub struct Ssm {
    profile: SiteProfile,
}

impl Ssm {
    pub fn new() -> Self {
        Self { profile: SiteProfile::new("Singapore School Manila", "SSM", "https://singaporeschools.ph") }
    }
}

#[async_trait]
impl SiteExtractor for Ssm {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn tuition_fees(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let admission = fetcher.get(&self.profile.url(ADMISSION_PATH)).await?;
        let tuition = match fetcher.get(&self.profile.url(TUITION_PATH)).await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!("SSM: tuition page unavailable: {}", e);
                None
            }
        };
        Ok(parse_tuition_fees(tuition.as_deref(), &admission))
    }

    async fn curriculum(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(ADMISSION_PATH)).await?;
        Ok(parse_curriculum(&html))
    }

    async fn enrollment_process(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(ADMISSION_PATH)).await?;
        Ok(parse_enrollment(&html))
    }

    async fn scholarships(&self, _fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(ExtractionResult::skipped(
            "Scholarship information is not published on the school website",
        ))
    }

    async fn contact_info(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(CONTACT_PATH)).await?;
        Ok(parse_contact(&html, &self.profile))
    }
}

// ── Fee lists ─────────────────────────────────────────────────────────────────

/// `label: Php amount` items of the list under a "Fees" heading, plus the
/// highlighted note beside it.
fn fee_block(heading: ElementRef<'_>) -> (Map<String, Value>, Option<String>) {
    let mut fees = Map::new();
    let Some(container) = heading.parent_element() else { return (fees, None) };

    if let Some(list) = container.select_first("ul, ol") {
        for item in list.texts("li") {
            if let Some((name, amount)) = labelled_amount(&item) {
                fees.insert(name, json!(format!("PHP {}", amount)));
            }
        }
    }
    let note = container
        .select_first(NOTE_SPAN)
        .map(|s| s.text_collapsed())
        .filter(|n| !n.is_empty());
    (fees, note)
}

// ── Tuition fees ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Debug)]
enum FeeTable {
    Regular,
    Additional,
    PaymentSchemes,
}

fn classify_table(table: ElementRef<'_>) -> FeeTable {
    let heading = table.find_previous(HEADINGS).map(|h| h.text_collapsed().to_lowercase()).unwrap_or_default();
    if ["payment", "scheme"].iter().any(|k| heading.contains(k)) {
        FeeTable::PaymentSchemes
    } else if ["additional", "other", "miscellaneous"].iter().any(|k| heading.contains(k)) {
        FeeTable::Additional
    } else {
        FeeTable::Regular
    }
}

pub fn parse_tuition_fees(tuition_html: Option<&str>, admission_html: &str) -> ExtractionResult {
    let admission = parse(admission_html);

    let mut application = Map::new();
    let mut notes = None;
    if let Some(heading) = find_containing(&admission, "div.column_attr h4", "Fees") {
        (application, notes) = fee_block(heading);
    }

    let mut regular = Map::new();
    let mut additional = Map::new();
    let mut schemes = Map::new();

    let doc = tuition_html.map(parse);
    let content = doc
        .as_ref()
        .and_then(|d| d.select_first("div.content-area, div.entry-content, main#main"));

    let Some(content) = content else {
        let mut data = Map::new();
        data.insert("application_fees".into(), Value::Object(application.clone()));
        if let Some(n) = &notes {
            data.insert("notes".into(), json!(n));
        }
        if !application.is_empty() {
            return ExtractionResult::partial(Value::Object(data), "Only application fees found");
        }
        return ExtractionResult::warning("Tuition content section not found");
    };

    let tables = content.select_all("table");
    if !tables.is_empty() {
        for table in tables {
            let kind = classify_table(table);
            let mut rows = table.select_all("tr");
            let headers: Vec<String> = match rows.first() {
                Some(first) if first.select_first("th").is_some() => {
                    let h = first.texts("th");
                    rows.remove(0);
                    h
                }
                _ => Vec::new(),
            };

            for row in rows {
                let cells: Vec<String> = row.select_all("td").into_iter().map(|c| c.text_collapsed()).collect();
                if cells.len() < 2 || cells[0].is_empty() {
                    continue;
                }
                let name = cells[0].clone();
                match kind {
                    FeeTable::Additional => {
                        if !cells[1].is_empty() {
                            additional.insert(name, json!(cells[1]));
                        }
                    }
                    FeeTable::Regular | FeeTable::PaymentSchemes => {
                        let mut info = Map::new();
                        if headers.is_empty() {
                            let defaults: &[&str] = match kind {
                                FeeTable::Regular => &["Tuition Fee", "Miscellaneous Fee", "Total"],
                                _ => &[],
                            };
                            for (i, value) in cells.iter().enumerate().skip(1) {
                                let key = defaults.get(i - 1).map(|s| s.to_string()).unwrap_or(format!("Detail {}", i));
                                info.insert(key, json!(value));
                            }
                        } else {
                            for i in 1..cells.len().min(headers.len()) {
                                if !headers[i].is_empty() {
                                    info.insert(headers[i].clone(), json!(cells[i]));
                                }
                            }
                        }
                        let target = if kind == FeeTable::Regular { &mut regular } else { &mut schemes };
                        target.insert(name, Value::Object(info));
                    }
                }
            }
        }
    } else {
        debug!("SSM: no fee tables, reading headings and lists");
        for heading in content.select_all(HEADINGS) {
            let title = heading.text_collapsed().to_lowercase();
            if !["fee", "tuition", "cost"].iter().any(|k| title.contains(k)) {
                continue;
            }
            let is_extra = ["additional", "other", "misc"].iter().any(|k| title.contains(k));
            let block = heading
                .following()
                .into_iter()
                .take_while(|e| !matches!(e.tag(), "h1" | "h2" | "h3" | "h4" | "h5"))
                .filter(|e| matches!(e.tag(), "p" | "li"));
            for el in block {
                let Some((name, amount)) = labelled_amount(&el.text_collapsed()) else { continue };
                let amount = format!("PHP {}", amount);
                if is_extra {
                    additional.insert(name, json!(amount));
                } else {
                    regular.insert(name, json!({ "Tuition Fee": amount }));
                }
            }
        }

        for item in content.texts("ul li, ol li") {
            let Some((name, amount)) = labelled_amount(&item) else { continue };
            let lower = name.to_lowercase();
            let amount = json!(format!("PHP {}", amount));
            if ["application", "entrance", "admission"].iter().any(|k| lower.contains(k)) {
                application.insert(name, amount);
            } else {
                additional.insert(name, amount);
            }
        }
    }

    let mut data = Map::new();
    data.insert("regular_program".into(), Value::Object(regular));
    data.insert("additional_fees".into(), Value::Object(additional));
    data.insert("payment_schemes".into(), Value::Object(schemes));
    data.insert("application_fees".into(), Value::Object(application));

    if !has_content(&Value::Object(data.clone())) {
        return ExtractionResult::warning_with("No tuition fee information extracted", Value::Object(data));
    }

    prune_empty(&mut data);
    if let Some(n) = notes {
        data.insert("notes".into(), json!(n));
    }
    ExtractionResult::success(Value::Object(data))
}

// ── Curriculum ────────────────────────────────────────────────────────────────

const LEVEL_GROUPS: [(&str, &[&str]); 4] = [
    ("preschool", &["Nursery", "Kinder 1", "Kinder 2"]),
    ("primary", &["Primary 1", "Primary 2", "Primary 3", "Primary 4", "Primary 5", "Primary 6"]),
    ("secondary", &["Secondary 1", "Secondary 2", "Secondary 3", "Secondary 4"]),
    ("pre_university", &["Cambridge AS/A and IBDP"]),
];

fn group_description(key: &str) -> &'static str {
    match key {
        "preschool" => "Preschool Education",
        "primary" => "Primary Education",
        "secondary" => "Secondary Education",
        "pre_university" => {
            "Pre-University Education offering both Cambridge Advanced Level (A Level) and International Baccalaureate Diploma Programme (IBDP)"
        }
        _ => "Other Programs",
    }
}

fn level_table<'a>(doc: &'a scraper::Html) -> Option<ElementRef<'a>> {
    doc.select_all("table").into_iter().find(|t| {
        let headers: Vec<String> = t.select_all("thead th").iter().map(|h| h.text_collapsed().to_lowercase()).collect();
        headers.len() >= 2 && headers[0].contains("level") && headers[1].contains("age")
    })
}

pub fn parse_curriculum(html: &str) -> ExtractionResult {
    let doc = parse(html);
    let mut programs = Map::new();

    if let Some(table) = level_table(&doc) {
        for row in table.select_all("tbody tr") {
            let cells = row_cells(row);
            if cells.len() < 2 {
                continue;
            }
            let group = LEVEL_GROUPS
                .iter()
                .find(|(_, levels)| levels.contains(&cells[0].as_str()))
                .map(|(key, _)| *key)
                .unwrap_or("other");

            let entry = programs
                .entry(group.to_string())
                .or_insert_with(|| json!({ "levels": [], "description": group_description(group) }));
            if let Some(levels) = entry.get_mut("levels").and_then(Value::as_array_mut) {
                levels.push(json!({ "name": cells[0], "age_requirement": cells[1] }));
            }
        }
    }

    let mut overview = Vec::new();
    let mut approach = Vec::new();
    for block in doc.select_all("div.mcb-column-inner div.column_attr") {
        let text = block.text_collapsed().to_lowercase();
        if !["curriculum", "education", "program", "approach", "methodology"].iter().any(|k| text.contains(k)) {
            continue;
        }
        for p in block.texts("p") {
            let lower = p.to_lowercase();
            if lower.contains("curriculum") || lower.contains("methodology") {
                approach.push(p);
            } else if overview.is_empty() && ["education", "program", "school"].iter().any(|k| lower.contains(k)) {
                overview.push(p);
            }
        }
    }

    let data = json!({
        "programs": programs,
        "overview": overview.join(" "),
        "curriculum_approach": approach.join(" "),
    });

    if programs_is_empty(&data) {
        return ExtractionResult::warning_with("No level/age table found", data);
    }
    ExtractionResult::success(data)
}

fn programs_is_empty(data: &Value) -> bool {
    data.get("programs").and_then(Value::as_object).is_none_or(|p| p.is_empty())
}

// ── Enrollment ────────────────────────────────────────────────────────────────

fn step_entry(num: u32, description: String, requirements: Vec<String>) -> Value {
    json!({
        "step_number": format!("STEP {}", num),
        "title": format!("Step {}", num),
        "description": description,
        "requirements": requirements,
    })
}

fn merge_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

pub fn parse_enrollment(html: &str) -> ExtractionResult {
    let doc = parse(html);
    let mut steps: Vec<Value> = Vec::new();
    let mut requirements: Vec<String> = Vec::new();
    let mut fees = Map::new();
    let mut fee_notes = None;

    if let Some(main) = doc.select_first("section.section") {
        for span in main.select_all(&format!("h3 {}", STEP_SPAN)) {
            let text = span.text_collapsed();
            if !text.to_uppercase().contains("STEP") {
                continue;
            }
            let Some(num) = step_number(&text) else { continue };
            let Some(container) = span.closest_with_class("mcb-wrap") else { continue };

            let description = container.texts("div.column_attr p").join(" ");
            let mut reqs = Vec::new();
            if num == 1 {
                reqs = container.select_first("ol, ul").map(|l| l.texts("li")).unwrap_or_default();
                merge_unique(&mut requirements, &reqs);
            }
            steps.push(step_entry(num, description, reqs));
        }

        let heading = find_containing(main, "h4", "Fees");
        if let Some(h) = heading {
            (fees, fee_notes) = fee_block(h);
        }
    }

    if steps.is_empty() {
        debug!("SSM: no steps in main section, scanning all step spans");
        for span in doc.select_all(STEP_SPAN) {
            let text = span.text_collapsed();
            if !text.to_uppercase().contains("STEP") {
                continue;
            }
            let Some(num) = step_number(&text) else { continue };
            let Some(container) = span.closest_with_class("mcb-wrap") else {
                continue;
            };
            let description = container.select_first("p").map(|p| p.text_collapsed()).unwrap_or_default();
            let reqs = container.select_first("ol, ul").map(|l| l.texts("li")).unwrap_or_default();
            if num == 1 {
                merge_unique(&mut requirements, &reqs);
            }
            steps.push(step_entry(num, description, reqs));
        }

        if fees.is_empty() {
            if let Some(h) = doc.select_first("h4").filter(|h| h.text_collapsed().contains("Fees")) {
                (fees, fee_notes) = fee_block(h);
            }
        }
    }

    sort_steps(&mut steps, |s| s["step_number"].as_str().unwrap_or(""));

    let mut data = Map::new();
    data.insert("steps".into(), json!(steps));
    data.insert("requirements".into(), json!(requirements));
    data.insert("fees".into(), Value::Object(fees));
    if let Some(n) = fee_notes {
        data.insert("fee_notes".into(), json!(n));
    }

    if steps.is_empty() {
        return ExtractionResult::warning_with("No enrollment steps found", Value::Object(data));
    }
    ExtractionResult::success(Value::Object(data))
}

// ── Contact ───────────────────────────────────────────────────────────────────

fn value_after_label(section: ElementRef<'_>, label: &str, accept: impl Fn(&str) -> bool) -> Option<String> {
    section
        .select_all("p, b, strong, span")
        .into_iter()
        .filter(|e| e.text_collapsed().contains(label))
        .filter_map(|l| l.find_next("p"))
        .map(|p| p.text_collapsed())
        .find(|t| accept(t))
}

fn campus_location(name: String, section: ElementRef<'_>) -> Value {
    let email = value_after_label(section, "Email Us", |t| t.contains('@')).or_else(|| {
        emails(&section.text_collapsed())
            .into_iter()
            .find(|e| !e.to_lowercase().contains("example"))
    });

    let phone = value_after_label(section, "Call Us", |t| t.chars().any(|c| c.is_ascii_digit())).or_else(|| {
        section
            .texts("p")
            .into_iter()
            .find(|t| t.contains('+') && t.chars().any(|c| c.is_ascii_digit()))
    });

    let person = ["Contact Person", "Administrator", "Principal", "Director"]
        .iter()
        .find_map(|label| {
            value_after_label(section, label, |t| {
                let lower = t.to_lowercase();
                !t.is_empty() && !["email", "call", "phone", "visit"].iter().any(|k| lower.contains(k))
            })
        });

    json!({ "name": name, "email": email, "phone": phone, "contact_person": person })
}

pub fn parse_contact(html: &str, profile: &SiteProfile) -> ExtractionResult {
    let doc = parse(html);
    let headers = doc.select_ladder(&[
        "div.column_attr b p, div.column_attr span b p",
        "div.column_attr b, div.column_attr strong",
    ]);

    let mut seen: Vec<String> = Vec::new();
    let mut locations = Vec::new();
    for header in headers {
        let name = header.text_collapsed();
        if !name.contains("Singapore School") || seen.contains(&name) {
            continue;
        }
        let Some(section) = header.closest_with_class("mcb-wrap") else { continue };
        seen.push(name.clone());
        locations.push(campus_location(name, section));
    }

    if locations.is_empty() {
        return ExtractionResult::warning("No campus contact blocks found");
    }
    ExtractionResult::success(json!({
        "school_name": profile.name,
        "website": profile.base_url,
        "locations": locations,
    }))
}

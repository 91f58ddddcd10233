//! International School Manila.

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::{Map, Value, json};
use std::sync::LazyLock;
use tracing::{debug, info};

use super::{find_containing, has_content, list_items, mailto_addresses, prune_empty};
use crate::document::{ElementExt, Query, collapse_whitespace, parse, row_cells};
use crate::extract::patterns::{emails, name_value, phones};
use crate::extract::sections::{SectionRule, attribute_rows, common_items};
use crate::extract::{FieldResult, SiteExtractor, SiteProfile};
use crate::fetcher::PageFetcher;
use crate::models::ExtractionResult;

const FEES_PATH: &str = "/admissions/school-fees";
const REQUIREMENTS_PATH: &str = "/admissions/application-file-forms-requirements";
const SCHOLARSHIPS_PATH: &str = "/admissions/scholarships";
const CONTACT_PATH: &str = "/contact-us";

const PROGRAM_SECTIONS: &[SectionRule] = &[
    SectionRule { key: "regular_program", all_of: &["REGULAR", "PROGRAM"] },
    SectionRule { key: "specialized_program", all_of: &["SPECIALIZED", "PROGRAM"] },
];

pub struct Ism {
    profile: SiteProfile,
}

impl Ism {
    pub fn new() -> Self {
        Self { profile: SiteProfile::new("International School Manila", "ISM", "https://www.ismanila.org") }
    }
}

#[async_trait]
impl SiteExtractor for Ism {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn tuition_fees(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(FEES_PATH)).await?;
        Ok(parse_tuition_fees(&html))
    }

    async fn curriculum(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        // Program names live in the fee table.
        let html = fetcher.get(&self.profile.url(FEES_PATH)).await?;
        Ok(parse_curriculum(&html))
    }

    async fn enrollment_process(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(REQUIREMENTS_PATH)).await?;
        Ok(parse_enrollment(&html))
    }

    async fn scholarships(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(SCHOLARSHIPS_PATH)).await?;
        Ok(parse_scholarships(&html))
    }

    async fn contact_info(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(CONTACT_PATH)).await?;
        Ok(parse_contact(&html))
    }
}

// ── Tuition fees ──────────────────────────────────────────────────────────────

fn table_rows(table: ElementRef<'_>) -> Vec<Vec<String>> {
    table.select_all("tr").into_iter().map(row_cells).collect()
}

pub fn parse_tuition_fees(html: &str) -> ExtractionResult {
    let doc = parse(html);
    let mut regular = Map::new();
    let mut specialized = Map::new();

    let primary = doc.select_first("table.table");
    if let Some(table) = primary {
        collect_fee_rows(&table_rows(table), 4, &mut regular, &mut specialized);
    }
    if regular.is_empty() && specialized.is_empty() {
        debug!("ISM: primary fee table gave nothing, scanning all tables");
        for table in doc.select_all("table") {
            collect_fee_rows(&table_rows(table), 2, &mut regular, &mut specialized);
        }
    }

    let (additional, other) = fee_lists(&doc);
    let found_any = !regular.is_empty() || !specialized.is_empty() || !additional.is_empty() || !other.is_empty();

    if !found_any {
        return ExtractionResult::warning(if primary.is_some() {
            "Tuition fee table found but no program rows matched"
        } else {
            "Tuition fee table not found"
        });
    }

    info!("ISM: {} regular, {} specialized fee rows", regular.len(), specialized.len());
    ExtractionResult::success(json!({
        "regular_program": regular,
        "specialized_program": specialized,
        "additional_fees": additional,
        "other_fees": other,
    }))
}

fn collect_fee_rows(
    rows: &[Vec<String>],
    min_cells: usize,
    regular: &mut Map<String, Value>,
    specialized: &mut Map<String, Value>,
) {
    for row in attribute_rows(rows, PROGRAM_SECTIONS, min_cells) {
        let cell = |i: usize| row.cells.get(i).cloned().unwrap_or_default();
        let entry = json!({ "annual": cell(1), "semester1": cell(2), "semester2": cell(3) });
        let target = match row.section {
            "regular_program" => &mut *regular,
            _ => &mut *specialized,
        };
        target.insert(cell(0), entry);
    }
}

/// Name/value fee lists in the rich-text block under the table.
fn fee_lists(doc: &Html) -> (Map<String, Value>, Map<String, Value>) {
    let mut additional = Map::new();
    let mut other = Map::new();

    let Some(content) = doc.select_first("section.rich-text-block div.content") else {
        return (additional, other);
    };

    if let Some(first_ul) = content.select_first("ul") {
        for item in list_items(first_ul) {
            if let Some((name, value)) = name_value(&item) {
                additional.insert(name, Value::String(value));
            }
        }
    }

    let heading = find_containing(content, "h1, h2, h3, h4", "Other Fees");
    if let Some(ul) = heading.and_then(|h| h.find_next("ul")) {
        for li in ul.child_elements().into_iter().filter(|e| e.tag() == "li") {
            let text = li.text_collapsed();
            // Sticker prices come as a nested list under one item.
            if text.contains("Car Stickers") {
                if let Some(sub) = li.select_first("ul") {
                    for sub_item in list_items(sub) {
                        if let Some((name, value)) = name_value(&sub_item) {
                            other.insert(name, Value::String(value));
                        }
                    }
                }
            } else if let Some((name, value)) = name_value(&text) {
                other.insert(name, Value::String(value));
            }
        }
    }

    (additional, other)
}

// ── Curriculum ────────────────────────────────────────────────────────────────

pub fn parse_curriculum(html: &str) -> ExtractionResult {
    let doc = parse(html);
    let mut regular = Map::new();
    let mut specialized = Map::new();
    let mut additional = Map::new();

    let tables = match doc.select_first("table.table") {
        Some(t) => vec![t],
        None => doc.select_all("table"),
    };
    for table in tables {
        for row in attribute_rows(&table_rows(table), PROGRAM_SECTIONS, 1) {
            let name = row.cells[0].clone();
            if name.to_uppercase().contains("PROGRAM") {
                continue;
            }
            match row.section {
                "regular_program" => {
                    regular.insert(name.clone(), json!({ "type": "Regular Program", "description": name }));
                }
                _ => {
                    specialized.insert(
                        name.clone(),
                        json!({ "type": "Specialized Learning Support Program", "description": name }),
                    );
                }
            }
        }
    }

    if let Some(content) = doc.select_first("section.rich-text-block div.content") {
        let heading = find_containing(content, "h1, h2, h3, h4", "Additional Program");
        if let Some(ul) = heading.and_then(|h| h.find_next("ul")) {
            for li in ul.child_elements().into_iter().filter(|e| e.tag() == "li") {
                let name = match li.select_first("strong") {
                    Some(strong) => strong.text_collapsed(),
                    None => li
                        .text()
                        .next()
                        .map(|t| collapse_whitespace(t).trim_end_matches(':').trim().to_string())
                        .unwrap_or_default(),
                };
                if !name.is_empty() {
                    additional.insert(
                        name.clone(),
                        json!({ "type": "Additional Support Program", "description": name }),
                    );
                }
            }
        }
    }

    if regular.is_empty() && specialized.is_empty() && additional.is_empty() {
        return ExtractionResult::warning("No program listing found on the fees page");
    }

    ExtractionResult::success(json!({
        "regular_program": regular,
        "specialized_program": specialized,
        "additional_programs": additional,
    }))
}

// ── Enrollment ────────────────────────────────────────────────────────────────

/// Content block of an accordion panel, trying the nested layout first.
fn accordion_content<'a>(panel: ElementRef<'a>) -> Option<ElementRef<'a>> {
    panel
        .select_first(".accordion-content .tab-content .content")
        .or_else(|| panel.select_first(".accordion-content .content"))
}

/// The list following a label such as "Forms" or "Requirements".
fn labelled_list<'a>(content: ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    find_containing(content, "p, h3, h4", label)
        .or_else(|| find_containing(content, "strong", label))
        .and_then(|l| l.find_next("ul"))
}

pub fn parse_enrollment(html: &str) -> ExtractionResult {
    let doc = parse(html);

    let overview = doc.select_first("section.lead-text").map(|s| s.text_collapsed()).unwrap_or_default();

    let titles = doc.select_all("div.tabs.style-accordion .tab-title");
    let bodies = doc.select_all("div.tabs.style-accordion .accordion-content");
    let mut steps = Vec::new();
    if !titles.is_empty() && titles.len() == bodies.len() {
        for (title, body) in titles.iter().zip(&bodies) {
            let mut step = Map::new();
            step.insert("title".into(), json!(title.text_collapsed()));
            step.insert("description".into(), json!(body.text_collapsed()));
            let items = body.texts("ol li, ul li");
            if !items.is_empty() {
                step.insert("items".into(), json!(items));
            }
            steps.push(Value::Object(step));
        }
    }

    let mut grades = Map::new();
    let mut requirement_lists = Vec::new();
    for panel in doc.select_all("div.tabs.style-standard .accordion-wrapper") {
        let Some(header) = panel.select_first(".accordion-header h4") else { continue };
        let Some(content) = accordion_content(panel) else { continue };

        let forms: Vec<Value> = labelled_list(content, "Forms")
            .map(|ul| {
                ul.select_all("li")
                    .into_iter()
                    .filter_map(|li| {
                        let a = li.select_first("a")?;
                        Some(json!({ "name": li.text_collapsed(), "url": a.attr_str("href").unwrap_or("") }))
                    })
                    .collect()
            })
            .unwrap_or_default();
        let requirements = labelled_list(content, "Requirements").map(|ul| ul.texts("li")).unwrap_or_default();

        requirement_lists.push(requirements.clone());
        grades.insert(header.text_collapsed(), json!({ "forms": forms, "requirements": requirements }));
    }

    let common = common_items(&requirement_lists);
    let data = json!({
        "overview": overview,
        "steps": steps,
        "requirements": common,
        "grade_requirements": grades,
    });

    if !has_content(&data) {
        return ExtractionResult::warning("No enrollment steps or requirements found");
    }
    ExtractionResult::success(data)
}

// ── Scholarships ──────────────────────────────────────────────────────────────

const EXAM_SECTION: &str = "Examination & Interview Information";
const WEEKDAYS: [&str; 7] = ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];
const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september", "october", "november",
    "december",
];

#[derive(Debug, Default)]
struct ExamInfo {
    assessments: Vec<String>,
    date: String,
    time: String,
    location: String,
    criteria: Vec<String>,
    interview_date: String,
}

impl ExamInfo {
    fn is_empty(&self) -> bool {
        self.assessments.is_empty() && self.criteria.is_empty()
    }

    /// Sort one loose list item into the slot its wording suggests.
    fn classify(&mut self, item: String) {
        let lower = item.to_lowercase();
        if ["assessment", "exam", "test"].iter().any(|k| lower.contains(k)) {
            self.assessments.push(item);
        } else if ["personality", "interest", "attitude", "english", "spoken", "financial"]
            .iter()
            .any(|k| lower.contains(k))
        {
            self.criteria.push(item);
        } else if WEEKDAYS.iter().any(|d| lower.contains(d)) {
            if lower.contains("interview") {
                self.interview_date = item;
            } else {
                self.date = item;
            }
        } else if lower.contains("interview day") {
            self.interview_date = item;
        } else if item.contains(':') && (item.to_uppercase().contains("AM") || item.to_uppercase().contains("PM")) {
            self.time = item;
        } else if lower.contains("campus") || lower.contains("manila") {
            self.location = item;
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "assessments": self.assessments,
            "schedule": { "date": self.date, "time": self.time, "location": self.location },
            "interview": { "criteria": self.criteria, "date": self.interview_date },
        })
    }
}

fn list_after_header<'a>(
    headers: &[ElementRef<'a>],
    pred: impl Fn(&str) -> bool,
    list_css: &str,
) -> Option<ElementRef<'a>> {
    headers
        .iter()
        .find(|h| pred(&h.text_collapsed().to_lowercase()))?
        .find_next(list_css)
}

fn parse_exam_section(content: ElementRef<'_>) -> ExamInfo {
    let mut info = ExamInfo::default();
    let headers = content.select_all("h3, h4");

    if let Some(list) = list_after_header(&headers, |t| t.contains("examination"), "ol, ul") {
        info.assessments = list.texts("li");
    }

    if let Some(list) = list_after_header(&headers, |t| t.contains("date") && t.contains("place"), "ul, ol") {
        let mut items = list.texts("li").into_iter();
        info.date = items.next().unwrap_or_default();
        info.time = items.next().unwrap_or_default();
        info.location = items.next().unwrap_or_default();
    }

    if let Some(list) = list_after_header(&headers, |t| t.contains("interview") || t.contains("appraised"), "ol, ul") {
        for item in list.texts("li") {
            let lower = item.to_lowercase();
            let is_date =
                lower.contains("interview day") || (lower.contains("day") && MONTHS.iter().any(|m| lower.contains(m)));
            if is_date {
                info.interview_date = item;
            } else {
                info.criteria.push(item);
            }
        }
    }

    if info.is_empty() {
        for item in content.texts("ol li, ul li") {
            info.classify(item);
        }
    }
    info
}

pub fn parse_scholarships(html: &str) -> ExtractionResult {
    let doc = parse(html);
    let overview = doc.select_first("section.lead-text").map(|s| s.text_collapsed()).unwrap_or_default();

    let mut details = Map::new();
    let mut forms: Vec<Value> = Vec::new();
    let mut exam: Option<ExamInfo> = None;

    if let Some(tabs) = doc.select_first("div.tabs.style-accordion") {
        for panel in tabs.select_all(".accordion-wrapper") {
            let Some(header) = panel.select_first(".accordion-header h4") else { continue };
            let Some(content) = accordion_content(panel) else { continue };
            let name = header.text_collapsed();

            if name == "Scholarship Forms" {
                for li in content.select_all("ol li, ul li") {
                    if let Some(a) = li.select_first("a") {
                        forms.push(json!({ "name": li.text_collapsed(), "url": a.attr_str("href").unwrap_or("") }));
                    }
                }
            } else if name == EXAM_SECTION {
                let info = parse_exam_section(content);
                details.insert(
                    name,
                    json!({ "description": content.text_collapsed(), "examination": info.to_value() }),
                );
                exam = Some(info);
            } else {
                details.insert(
                    name,
                    json!({ "description": content.text_collapsed(), "items": content.texts("ol li, ul li") }),
                );
            }
        }
    } else {
        debug!("ISM: no scholarship accordion, reading rich-text sections");
        for section in doc.select_all("section.rich-text-block, section.tab-content") {
            let Some(heading) = section.select_first("h2, h3, h4") else { continue };
            let name = heading.text_collapsed();
            let text = section.text_collapsed();
            let description = text.replacen(&name, "", 1).trim().to_string();
            let items = section.texts("ol li, ul li");
            if name == EXAM_SECTION {
                let mut info = ExamInfo::default();
                for item in &items {
                    info.classify(item.clone());
                }
                exam = Some(info);
            }
            details.insert(name, json!({ "description": description, "items": items }));
        }

        let candidates = doc.select_all(
            "section a[href*='pdf'], section.rich-text-block a[href*='application'], section.rich-text-block a[href*='scholarship']",
        );
        for a in candidates {
            let name = a.text_collapsed();
            let lower = name.to_lowercase();
            if ["form", "application", "checklist"].iter().any(|k| lower.contains(k)) {
                forms.push(json!({ "name": name, "url": a.attr_str("href").unwrap_or("") }));
            }
        }
    }

    let detail_items = |key: &str| details.get(key).and_then(|d| d.get("items")).cloned().unwrap_or(json!([]));
    let summary = json!({
        "eligibility": detail_items("Who May Qualify for the Scholarship?"),
        "benefits": detail_items("Nature of Scholarship"),
        "responsibilities": detail_items("Responsibilities of Awardee & Parent(s) or Guardian"),
        "selection_process": details
            .get("Selection of Awardee")
            .and_then(|d| d.get("description"))
            .cloned()
            .unwrap_or(json!("")),
        "examination_details": exam.unwrap_or_default().to_value(),
    });

    if overview.is_empty() && details.is_empty() && forms.is_empty() {
        return ExtractionResult::warning("No scholarship information found");
    }

    ExtractionResult::success(json!({
        "overview": overview,
        "details": details,
        "forms": forms,
        "summary": summary,
    }))
}

// ── Contact ───────────────────────────────────────────────────────────────────

static SUPERINTENDENT_HTML_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<strong>\s*Superintendent:\s*</strong>(.*?)</p>").expect("Failed to compile superintendent regex")
});
static TELEPHONE_HTML_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<strong>\s*School Telephone:\s*</strong>(.*?)</p>").expect("Failed to compile telephone regex")
});
static MAILTO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"mailto:([\w.+\-]+@[\w.\-]+\.\w+)").expect("Failed to compile mailto regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Failed to compile tag regex"));
static SUPERINTENDENT_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Superintendent:?\s*(.+)").expect("Failed to compile superintendent text regex"));
static TELEPHONE_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:School\s+)?Telephone:?\s*([()\d\s.\-+]+)").expect("Failed to compile telephone text regex")
});

#[derive(Debug, Default)]
struct Contact {
    email: String,
    phone: String,
    person: String,
}

impl Contact {
    fn complete(&self) -> bool {
        !self.email.is_empty() && !self.phone.is_empty() && !self.person.is_empty()
    }

    fn fill_from_text(&mut self, text: &str) {
        if self.person.is_empty() {
            if let Some(c) = SUPERINTENDENT_TEXT_RE.captures(text) {
                self.person = collapse_whitespace(&c[1]);
            }
        }
        if self.phone.is_empty() {
            if let Some(c) = TELEPHONE_TEXT_RE.captures(text) {
                self.phone = collapse_whitespace(&c[1]);
            }
        }
    }
}

fn strip_tags(fragment: &str) -> String {
    collapse_whitespace(&TAG_RE.replace_all(fragment, " "))
}

pub fn parse_contact(html: &str) -> ExtractionResult {
    let mut contact = Contact::default();

    // Labelled paragraphs in the raw markup.
    if let Some(c) = SUPERINTENDENT_HTML_RE.captures(html) {
        contact.person = strip_tags(&c[1]);
    }
    if let Some(c) = TELEPHONE_HTML_RE.captures(html) {
        contact.phone = strip_tags(&c[1]);
    }
    if let Some(c) = MAILTO_RE.captures(html) {
        contact.email = c[1].to_string();
    }

    if !contact.complete() {
        let doc = parse(html);
        let mut scopes = doc.select_all("div.content, div.accordion-content");
        scopes.extend(doc.select_first("body"));

        for scope in scopes {
            for p in scope.select_all("p") {
                contact.fill_from_text(&p.text_collapsed());
            }
            if contact.email.is_empty() {
                contact.email = mailto_addresses(scope).into_iter().next().unwrap_or_default();
            }
            if contact.complete() {
                break;
            }
        }

        if contact.email.is_empty() || contact.phone.is_empty() {
            let text = doc.root_element().visible_text();
            if contact.email.is_empty() {
                contact.email = emails(&text).into_iter().next().unwrap_or_default();
            }
            if contact.phone.is_empty() {
                contact.phone = phones(&text).into_iter().next().unwrap_or_default();
            }
        }
    }

    let mut data = Map::new();
    data.insert("email".into(), json!(contact.email));
    data.insert("phone".into(), json!(contact.phone));
    data.insert("contact_person".into(), json!(contact.person));

    let mut found = data.clone();
    prune_empty(&mut found);
    if found.is_empty() {
        return ExtractionResult::warning("No contact details found");
    }
    ExtractionResult::success(Value::Object(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::StaticFetcher;

    const FEES_HTML: &str = r#"
        <html><body>
        <table class="table">
          <tr><th>Program</th><th>Annual</th><th>Sem 1</th><th>Sem 2</th></tr>
          <tr><td colspan="4">REGULAR PROGRAM</td></tr>
          <tr><td>Grade 1 - 5</td><td>1,000,000</td><td>500,000</td><td>500,000</td></tr>
        </table>
        <section class="rich-text-block"><div class="content">
          <ul><li>Application Fee - Php 10,000</li></ul>
          <h3>Other Fees</h3>
          <ul>
            <li>Bus Service - Php 80,000</li>
            <li>Car Stickers (per vehicle)
              <ul><li>First car - Php 1,500</li><li>Second car - Php 2,000</li></ul>
            </li>
          </ul>
          <h3>Additional Program</h3>
          <ul><li><strong>English Language Learning</strong> Php 100,000</li></ul>
        </div></section>
        </body></html>"#;

    #[test]
    fn fee_table_yields_one_regular_entry() {
        let r = parse_tuition_fees(FEES_HTML);
        let data = r.data().unwrap();
        assert_eq!(r.status(), "success");
        assert_eq!(data["regular_program"].as_object().unwrap().len(), 1);
        assert_eq!(data["regular_program"]["Grade 1 - 5"]["annual"], "1,000,000");
        assert_eq!(data["additional_fees"]["Application Fee"], "Php 10,000");
        assert_eq!(data["other_fees"]["Bus Service"], "Php 80,000");
        assert_eq!(data["other_fees"]["Second car"], "Php 2,000");
    }

    #[test]
    fn missing_fee_table_is_a_warning() {
        let r = parse_tuition_fees("<html><body><p>Fees coming soon</p></body></html>");
        assert_eq!(r.status(), "warning");
    }

    #[test]
    fn parsing_is_idempotent() {
        let a = serde_json::to_string(&parse_tuition_fees(FEES_HTML)).unwrap();
        let b = serde_json::to_string(&parse_tuition_fees(FEES_HTML)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn curriculum_reads_table_and_additional_programs() {
        let r = parse_curriculum(FEES_HTML);
        let data = r.data().unwrap();
        assert_eq!(data["regular_program"]["Grade 1 - 5"]["type"], "Regular Program");
        assert_eq!(
            data["additional_programs"]["English Language Learning"]["type"],
            "Additional Support Program"
        );
    }

    #[test]
    fn enrollment_collects_grades_and_common_requirements() {
        let panel = |grade: &str, reqs: &[&str]| {
            let lis: String = reqs.iter().map(|r| format!("<li>{}</li>", r)).collect();
            format!(
                r#"<div class="accordion-wrapper">
                     <div class="accordion-header"><h4>{grade}</h4></div>
                     <div class="accordion-content"><div class="content">
                       <p><strong>Forms</strong></p><ul><li><a href="/f/{grade}.pdf">Application</a></li></ul>
                       <p><strong>Requirements</strong></p><ul>{lis}</ul>
                     </div></div>
                   </div>"#
            )
        };
        let html = format!(
            r#"<section class="lead-text">Apply early.</section>
               <div class="tabs style-accordion">
                 <div class="tab-title">Submit</div><div class="accordion-content">Send forms</div>
               </div>
               <div class="tabs style-standard">{}{}{}{}</div>"#,
            panel("Early Years", &["Birth certificate", "Photo"]),
            panel("Elementary", &["Birth certificate", "Report card"]),
            panel("Middle", &["Birth certificate", "Report card"]),
            panel("High", &["Transcript"]),
        );

        let r = parse_enrollment(&html);
        let data = r.data().unwrap();
        assert_eq!(data["overview"], "Apply early.");
        assert_eq!(data["steps"][0]["title"], "Submit");
        assert_eq!(data["grade_requirements"]["Elementary"]["forms"][0]["url"], "/f/Elementary.pdf");
        assert_eq!(data["requirements"], json!(["Birth certificate", "Report card"]));
    }

    #[test]
    fn scholarship_exam_section_is_structured() {
        let html = r#"
          <div class="tabs style-accordion">
            <div class="accordion-wrapper">
              <div class="accordion-header"><h4>Who May Qualify for the Scholarship?</h4></div>
              <div class="accordion-content"><div class="content"><ul><li>Filipino citizens</li></ul></div></div>
            </div>
            <div class="accordion-wrapper">
              <div class="accordion-header"><h4>Examination &amp; Interview Information</h4></div>
              <div class="accordion-content"><div class="content">
                <h4>Examination</h4><ol><li>Math assessment</li></ol>
                <h4>Date and Place</h4><ul><li>Saturday, 12 October</li><li>8:00 AM</li><li>ISM campus</li></ul>
                <h4>Applicants will be appraised on</h4><ul><li>Personality</li><li>Interview day: 19 October</li></ul>
              </div></div>
            </div>
          </div>"#;
        let r = parse_scholarships(html);
        let data = r.data().unwrap();
        let exam = &data["summary"]["examination_details"];
        assert_eq!(data["summary"]["eligibility"], json!(["Filipino citizens"]));
        assert_eq!(exam["assessments"], json!(["Math assessment"]));
        assert_eq!(exam["schedule"]["time"], "8:00 AM");
        assert_eq!(exam["interview"]["criteria"], json!(["Personality"]));
        assert_eq!(exam["interview"]["date"], "Interview day: 19 October");
    }

    #[test]
    fn contact_prefers_labelled_markup() {
        let html = r#"<div class="content">
            <p><strong>Superintendent:</strong> Jane Doe</p>
            <p><strong>School Telephone:</strong> (632) 8840.8400</p>
            <p><a href="mailto:admissions@ismanila.org">Email us</a></p></div>"#;
        let r = parse_contact(html);
        let data = r.data().unwrap();
        assert_eq!(data["contact_person"], "Jane Doe");
        assert_eq!(data["phone"], "(632) 8840.8400");
        assert_eq!(data["email"], "admissions@ismanila.org");
    }

    #[test]
    fn contact_falls_back_to_text_regex() {
        let html = "<main><div>Reach us at office@ismanila.org or +63 2 8840 8400</div></main>";
        let data = parse_contact(html).data().cloned().unwrap();
        assert_eq!(data["email"], "office@ismanila.org");
        assert_eq!(data["phone"], "+63 2 8840 8400");
    }

    #[tokio::test]
    async fn extractor_fetches_fee_page() {
        let ism = Ism::new();
        let fetcher = StaticFetcher::new().page("https://www.ismanila.org/admissions/school-fees", FEES_HTML);
        let r = ism.tuition_fees(&fetcher).await.unwrap();
        assert_eq!(r.status(), "success");
        assert!(ism.contact_info(&fetcher).await.is_err());
    }
}

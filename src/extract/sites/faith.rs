//! Faith Academy. Elementor pages; fee tables are keyed by widget `data-id`.

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::{Map, Value, json};
use std::sync::LazyLock;
use tracing::{debug, info};

use super::{has_content, links, scanned_contact};
use crate::document::{ElementExt, Query, absolute_url, parse};
use crate::extract::patterns::emails;
use crate::extract::{FieldResult, SiteExtractor, SiteProfile};
use crate::fetcher::PageFetcher;
use crate::models::ExtractionResult;

const FINANCES_PATH: &str = "/admissions/finances/";
const SCHOOL_LIFE_PATH: &str = "/school-life/";
const APPLY_PATH: &str = "/admissions/apply/";
const CHECKLIST_PATH: &str = "/admissions/admissions-checklist/";
const CONTACT_PATH: &str = "/contact/";

const APPLICATION_TABLE: &str = "div[data-id='a6b5222'] table.jet-table";
const TUITION_TABLE: &str = "div[data-id='04facf5'] table.jet-table";
const BOARDING_REGISTRATION_TABLE: &str = "div[data-id='df4d2f3'] table.jet-table";
const ROOM_AND_BOARD_TABLE: &str = "div[data-id='dfc91b0'] table.jet-table";
const DISCOUNT_NOTE: &str = "div[data-id='b5ebeb7']";
const EMAIL_LIST: &str = "div[data-id='535fadb']";
const PHONE_BLOCK: &str = "div[data-id='12322ac']";

static LOOSE_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+\d][\d\s\-()]{10,}").expect("Failed to compile phone block regex"));

pub struct Faith {
    profile: SiteProfile,
}

impl Faith {
    pub fn new() -> Self {
        Self { profile: SiteProfile::new("Faith Academy", "Faith", "https://faith.edu.ph") }
    }
}

#[async_trait]
impl SiteExtractor for Faith {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn tuition_fees(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(FINANCES_PATH)).await?;
        Ok(parse_tuition_fees(&html))
    }

    async fn curriculum(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let url = self.profile.url(SCHOOL_LIFE_PATH);
        let html = fetcher.get(&url).await?;
        Ok(parse_curriculum(&html, &url))
    }

    async fn enrollment_process(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let apply = fetcher.get(&self.profile.url(APPLY_PATH)).await?;
        let checklist = fetcher.get(&self.profile.url(CHECKLIST_PATH)).await?;
        Ok(parse_enrollment(&apply, &checklist, &self.profile.base_url))
    }

    async fn scholarships(&self, _fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(ExtractionResult::not_implemented("No scholarship extraction for this site"))
    }

    async fn contact_info(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(CONTACT_PATH)).await?;
        Ok(parse_contact(&html))
    }
}

// ── Tuition fees ──────────────────────────────────────────────────────────────

fn body_rows(doc: &Html, table_css: &str) -> Vec<Vec<String>> {
    doc.select_first(table_css)
        .map(|t| {
            t.select_all("tbody tr")
                .into_iter()
                .map(|row| row.select_all("td").into_iter().map(|c| c.text_collapsed()).collect())
                .collect()
        })
        .unwrap_or_default()
}

/// Four-column `period | fee | period | fee` tables: new students left,
/// returning students right.
fn split_period_table(rows: &[Vec<String>]) -> (Vec<Value>, Vec<Value>) {
    let mut new_students = Vec::new();
    let mut returning = Vec::new();
    for cells in rows.iter().filter(|c| c.len() >= 4) {
        if !cells[0].is_empty() {
            new_students.push(json!({ "time_period": cells[0], "fee": cells[1] }));
        }
        if !cells[2].is_empty() {
            returning.push(json!({ "time_period": cells[2], "fee": cells[3] }));
        }
    }
    (new_students, returning)
}

pub fn parse_tuition_fees(html: &str) -> ExtractionResult {
    let doc = parse(html);

    let (app_new, app_returning) = split_period_table(&body_rows(&doc, APPLICATION_TABLE));

    let mut regular = Map::new();
    // First body row only labels the semester/annual columns.
    for cells in body_rows(&doc, TUITION_TABLE).iter().skip(1) {
        if cells.len() < 5 || cells[0].is_empty() {
            continue;
        }
        regular.insert(
            cells[0].clone(),
            json!({
                "tuition": { "semester": cells[1], "annual": cells[2] },
                "facility_technology_fee": { "semester": cells[3], "annual": cells[4] },
            }),
        );
    }

    let (board_new, board_returning) = split_period_table(&body_rows(&doc, BOARDING_REGISTRATION_TABLE));

    let room_and_board = body_rows(&doc, ROOM_AND_BOARD_TABLE)
        .first()
        .filter(|cells| cells.len() >= 2)
        .map(|cells| json!({ "7_day_rate": cells[0], "5_day_rate": cells[1] }))
        .unwrap_or_else(|| json!({}));

    let mut data = json!({
        "application_fees": { "new_students": app_new, "returning_students": app_returning },
        "regular_tuition": regular,
        "boarding_fees": {
            "registration": { "new_students": board_new, "returning_students": board_returning },
            "room_and_board": room_and_board,
        },
    });
    if let Some(note) = doc.select_first(DISCOUNT_NOTE).map(|n| n.text_collapsed()).filter(|n| !n.is_empty()) {
        data["discounted_rates_info"] = json!(note);
    }

    if !has_content(&data) {
        return ExtractionResult::warning("No fee tables found");
    }
    info!("Faith: {} tuition divisions", regular.len());
    ExtractionResult::success(data)
}

// ── Curriculum ────────────────────────────────────────────────────────────────

/// Headed blocks of the school-life page; `Grade`/`Kindergarten` spans in
/// the heading's neighbourhood become the age range.
pub fn parse_curriculum(html: &str, page_url: &str) -> ExtractionResult {
    let doc = parse(html);
    let mut programs = Vec::new();

    for heading in doc.select_all(".elementor-widget-heading .elementor-heading-title") {
        let name = heading.text_collapsed();
        if name.chars().count() < 3 {
            continue;
        }
        let Some(text_widget) = heading.find_next(".elementor-widget-text-editor") else { continue };
        let description = text_widget.text_collapsed();
        if description.is_empty() {
            continue;
        }

        let mut program = Map::new();
        program.insert("name".into(), json!(name));
        if let Some(range) = grade_range(heading) {
            program.insert("age_range".into(), json!(range));
        }
        program.insert("description".into(), json!(description));
        program.insert("link".into(), json!(page_url));
        programs.push(Value::Object(program));
    }

    if programs.is_empty() {
        return ExtractionResult::warning("No program blocks found on the school life page");
    }
    ExtractionResult::success(json!(programs))
}

fn grade_range(heading: ElementRef<'_>) -> Option<String> {
    let column = heading.closest_with_class("elementor-column")?;
    column
        .texts("p, span, h4, h5, h6")
        .into_iter()
        .find(|t| t.chars().count() < 40 && (t.contains("Grade") || t.contains("Kindergarten")))
}

// ── Enrollment ────────────────────────────────────────────────────────────────

fn checklist(doc: &Html, field_css: &str, base_url: &str) -> Vec<Value> {
    doc.select_all(&format!("{} .gchoice", field_css))
        .into_iter()
        .filter_map(|choice| {
            let label = choice.select_first("label")?;
            let mut item = Map::new();
            item.insert("text".into(), json!(label.text_collapsed()));
            if let Some(a) = label.select_first("a") {
                let href = a.attr_str("href").unwrap_or("");
                item.insert(
                    "link".into(),
                    json!({ "text": a.text_collapsed(), "url": absolute_url(base_url, href) }),
                );
            }
            Some(Value::Object(item))
        })
        .collect()
}

pub fn parse_enrollment(apply_html: &str, checklist_html: &str, base_url: &str) -> ExtractionResult {
    let apply = parse(apply_html);
    let list_doc = parse(checklist_html);

    let policy: Vec<Value> = apply
        .select_all(".pp-timeline-item")
        .into_iter()
        .map(|item| {
            let text = |css: &str| item.select_first(css).map(|e| e.text_collapsed()).unwrap_or_default();
            let content = item.select_first(".pp-timeline-card-content");
            let step_links: Vec<Value> = content
                .map(|c| links(c, base_url))
                .unwrap_or_default()
                .into_iter()
                .filter(|l| l["name"].as_str().is_some_and(|n| !n.is_empty()))
                .collect();
            json!({
                "step": text(".pp-timeline-marker"),
                "title": text(".pp-timeline-card-title"),
                "description": text(".pp-timeline-card-content"),
                "links": step_links,
            })
        })
        .collect();

    let general = checklist(&list_doc, "#input_16_1", base_url);
    let homeschool = checklist(&list_doc, "#input_16_3", base_url);
    debug!("Faith: {} general, {} homeschool checklist items", general.len(), homeschool.len());

    let mut requirements = general;
    if !homeschool.is_empty() {
        requirements.push(json!({ "category": "Homeschool Additional Requirements" }));
        requirements.extend(homeschool);
    }

    let contact_email = emails(&apply.root_element().text_collapsed())
        .into_iter()
        .chain(emails(&list_doc.root_element().text_collapsed()))
        .next();

    let data = json!({
        "policy": policy,
        "requirements": requirements,
        "contact_email": contact_email,
    });
    if policy.is_empty() && requirements.is_empty() {
        return ExtractionResult::warning_with("No application timeline or checklist found", data);
    }
    ExtractionResult::success(data)
}

// ── Contact ───────────────────────────────────────────────────────────────────

pub fn parse_contact(html: &str) -> ExtractionResult {
    let doc = parse(html);

    let mut addresses: Vec<String> = Vec::new();
    if let Some(section) = doc.select_first(EMAIL_LIST) {
        for a in section.select_all("li.elementor-icon-list-item a") {
            let Some(text) = a.select_first(".elementor-icon-list-text").map(|t| t.text_collapsed()) else {
                continue;
            };
            if !text.contains('@') {
                continue;
            }
            // Link text is truncated on the page; the mailto target is not.
            let address = match a.attr_str("href").and_then(|h| h.strip_prefix("mailto:")) {
                Some(full) => full.to_string(),
                None => text,
            };
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }
    }

    let mut phones: Vec<String> = doc
        .select_first(PHONE_BLOCK)
        .map(|block| {
            let text = block.text_collapsed();
            LOOSE_PHONE_RE.find_iter(&text).map(|m| m.as_str().trim().to_string()).collect()
        })
        .unwrap_or_default();

    if addresses.is_empty() && phones.is_empty() {
        let scanned = scanned_contact(doc.root_element());
        let strings = |key: &str| -> Vec<String> {
            scanned
                .get(key)
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_str).map(String::from).collect())
                .unwrap_or_default()
        };
        addresses = strings("emails");
        phones = strings("phones");
    }

    if addresses.is_empty() && phones.is_empty() {
        return ExtractionResult::warning("No contact emails or phone numbers found");
    }
    ExtractionResult::success(json!({
        "email": addresses,
        "phone_numbers": phones,
        "contact_person": Value::Null,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINANCES: &str = r#"
      <div data-id="a6b5222"><table class="jet-table"><tbody>
        <tr><td>Before March 1</td><td>$100</td><td>Before Feb 1</td><td>$50</td></tr>
      </tbody></table></div>
      <div data-id="04facf5"><table class="jet-table"><tbody>
        <tr><td></td><td>Semester</td><td>Annual</td><td>Semester</td><td>Annual</td></tr>
        <tr><td>Elementary</td><td>$5,000</td><td>$10,000</td><td>$300</td><td>$600</td></tr>
      </tbody></table></div>
      <div data-id="df4d2f3"><table class="jet-table"><tbody>
        <tr><td>Anytime</td><td>$200</td><td></td><td></td></tr>
      </tbody></table></div>
      <div data-id="dfc91b0"><table class="jet-table"><tbody>
        <tr><td>$9,000</td><td>$7,000</td></tr>
      </tbody></table></div>
      <div data-id="b5ebeb7"><p>Mission families receive discounted rates.</p></div>"#;

    #[test]
    fn fee_tables_by_widget_id() {
        let data = parse_tuition_fees(FINANCES).data().cloned().unwrap();
        assert_eq!(data["application_fees"]["returning_students"][0]["fee"], "$50");
        assert_eq!(data["regular_tuition"]["Elementary"]["facility_technology_fee"]["annual"], "$600");
        assert_eq!(data["boarding_fees"]["registration"]["new_students"].as_array().unwrap().len(), 1);
        assert_eq!(data["boarding_fees"]["registration"]["returning_students"], json!([]));
        assert_eq!(data["boarding_fees"]["room_and_board"]["5_day_rate"], "$7,000");
        assert_eq!(data["discounted_rates_info"], "Mission families receive discounted rates.");
    }

    #[test]
    fn timeline_and_checklists() {
        let apply = r#"<div class="pp-timeline-item"><div class="pp-timeline-marker">1</div>
            <h3 class="pp-timeline-card-title">Apply online</h3>
            <div class="pp-timeline-card-content">Use the <a href="/portal">portal</a>. Questions: registrar@faith.edu.ph</div></div>"#;
        let checklist = r#"
            <div id="input_16_1"><div class="gchoice"><label>Copy of <a href="/forms/med.pdf">medical form</a></label></div></div>
            <div id="input_16_3"><div class="gchoice"><label>Portfolio</label></div></div>"#;
        let data = parse_enrollment(apply, checklist, "https://faith.edu.ph").data().cloned().unwrap();
        assert_eq!(data["policy"][0]["step"], "1");
        assert_eq!(data["policy"][0]["links"][0]["url"], "https://faith.edu.ph/portal");
        assert_eq!(data["requirements"][0]["link"]["url"], "https://faith.edu.ph/forms/med.pdf");
        assert_eq!(data["requirements"][1]["category"], "Homeschool Additional Requirements");
        assert_eq!(data["requirements"][2]["text"], "Portfolio");
        assert_eq!(data["contact_email"], "registrar@faith.edu.ph");
    }

    #[test]
    fn contact_prefers_mailto_targets() {
        let html = r#"
          <div data-id="535fadb"><ul>
            <li class="elementor-icon-list-item"><a href="mailto:admissions@faith.edu.ph">
              <span class="elementor-icon-list-text">admissions@faith.edu</span></a></li>
          </ul></div>
          <div data-id="12322ac"><p>Phone: +63 2 8658 0048 or +63 917 555 0199</p></div>"#;
        let data = parse_contact(html).data().cloned().unwrap();
        assert_eq!(data["email"], json!(["admissions@faith.edu.ph"]));
        assert_eq!(data["phone_numbers"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn contact_falls_back_to_page_text() {
        let html = "<footer><p>Admissions: admissions@faith.edu.ph</p><p>Tel +63 2 8658 0048</p></footer>";
        let r = parse_contact(html);
        assert_eq!(r.status(), "success");
        let data = r.data().unwrap();
        assert_eq!(data["email"], json!(["admissions@faith.edu.ph"]));
        assert_eq!(data["phone_numbers"], json!(["+63 2 8658 0048"]));

        assert_eq!(parse_contact("<p>Welcome</p>").status(), "warning");
    }

    #[tokio::test]
    async fn scholarships_are_not_implemented() {
        let fetcher = crate::fetcher::testing::StaticFetcher::new();
        let r = Faith::new().scholarships(&fetcher).await.unwrap();
        assert_eq!(r.status(), "not_implemented");
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn school_life_headings_pair_with_text() {
        let html = r#"<div class="elementor-column">
            <div class="elementor-widget-heading"><h2 class="elementor-heading-title">Middle School</h2></div>
            <p>Grades 6-8</p>
            <div class="elementor-widget-text-editor"><p>Active, purposeful engagement.</p></div>
          </div>"#;
        let r = parse_curriculum(html, "https://faith.edu.ph/school-life/");
        let first = &r.data().unwrap()[0];
        assert_eq!(first["age_range"], "Grades 6-8");
        assert_eq!(first["description"], "Active, purposeful engagement.");
    }
}

//! Reedley International School.

use async_trait::async_trait;
use regex::Regex;
use scraper::ElementRef;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

use super::{has_content, links, scanned_contact};
use crate::document::{ElementExt, Query, parse};
use crate::extract::{FieldResult, SiteExtractor, SiteProfile};
use crate::fetcher::PageFetcher;
use crate::models::ExtractionResult;

const CURRICULUM_PATH: &str = "/acad-programs/";
const APPLY_PATH: &str = "/apply/";
const CONTACT_PATH: &str = "/contact/";

static STEP_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)step\s+(\d+)").expect("Failed to compile step label regex"));

pub struct Ris {
    profile: SiteProfile,
}

impl Ris {
    pub fn new() -> Self {
        Self { profile: SiteProfile::new("Reedley International School", "RIS", "https://www.reedleyschool.edu.ph") }
    }
}

#[async_trait]
impl SiteExtractor for Ris {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn tuition_fees(&self, _fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(ExtractionResult::skipped("Tuition fees are not published on the school website"))
    }

    async fn curriculum(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(CURRICULUM_PATH)).await?;
        Ok(parse_curriculum(&html))
    }

    async fn enrollment_process(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(APPLY_PATH)).await?;
        Ok(parse_enrollment(&html, &self.profile.base_url))
    }

    async fn scholarships(&self, _fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(ExtractionResult::skipped("Scholarship information is not published on the school website"))
    }

    async fn contact_info(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(CONTACT_PATH)).await?;
        Ok(parse_contact(&html))
    }
}

// ── Curriculum ────────────────────────────────────────────────────────────────

fn titled_block(section: ElementRef<'_>) -> Map<String, Value> {
    let mut out = Map::new();
    let title = section.select_first("h2").map(|h| h.text_collapsed());
    let description = section.select_first("p").map(|p| p.text_collapsed());
    if let (Some(t), Some(d)) = (title, description) {
        out.insert("title".into(), json!(t));
        out.insert("description".into(), json!(d));
    }
    out
}

/// Accordion cards as `header -> body`, with any ordered list split out as
/// `courses` when `with_courses` is set.
fn accordion_cards(section: ElementRef<'_>, accordion: &str, with_courses: bool) -> Map<String, Value> {
    let mut out = Map::new();
    for card in section.select_all(&format!("{} .card", accordion)) {
        let Some(header) = card.select_first(".card-header h3 button span") else { continue };
        let Some(body) = card.select_first(".card-body") else { continue };
        let name = header.text_collapsed();
        let mut description = body.text_collapsed();

        if !with_courses {
            out.insert(name, json!(description));
            continue;
        }

        let courses = body.select_first("ol").map(|ol| ol.texts("li")).unwrap_or_default();
        if !courses.is_empty() {
            if let Some(list_text) = body.select_first("ol").map(|ol| ol.text_collapsed()) {
                description = description.replace(&list_text, "").trim().to_string();
            }
        }
        let mut entry = Map::new();
        entry.insert("description".into(), json!(description));
        if !courses.is_empty() {
            entry.insert("courses".into(), json!(courses));
        }
        out.insert(name, Value::Object(entry));
    }
    out
}

pub fn parse_curriculum(html: &str) -> ExtractionResult {
    let doc = parse(html);

    let kindergarten = doc.select_first("div.kinderGartenRow").map(titled_block).unwrap_or_default();
    let advanced = doc.select_first("div.juniorProgramDiv").map(titled_block).unwrap_or_default();

    let mut basic = Map::new();
    if let Some(section) = doc.select_first("div.basicEducationRow") {
        if let Some(t) = section.select_first("h2") {
            basic.insert("title".into(), json!(t.text_collapsed()));
        }
        basic.insert("subjects".into(), Value::Object(accordion_cards(section, "#accordion", false)));
    }

    let mut senior = Map::new();
    if let Some(section) = doc.select_first("div.seniorHsCurriculum") {
        if let Some(t) = section.select_first("h2") {
            senior.insert("title".into(), json!(t.text_collapsed()));
        }
        senior.insert("strands".into(), Value::Object(accordion_cards(section, "#accordion2", true)));
    }

    let mut data = json!({
        "kindergarten": kindergarten,
        "basic_education": basic,
        "advanced_placement": advanced,
        "senior_high_school": senior,
    });
    if let Some(sidebar) = doc.select_first("div.acadProgramSidebar") {
        data["grade_levels"] = json!(sidebar.texts("ul li"));
    }

    if !has_content(&data) {
        return ExtractionResult::warning("No academic program sections found");
    }
    ExtractionResult::success(data)
}

// ── Enrollment ────────────────────────────────────────────────────────────────

/// Drops the `"1 — "` numbering prefix from requirement titles.
fn strip_numbering(title: &str) -> String {
    match title.split_once('—') {
        Some((_, rest)) => rest.trim().to_string(),
        None => title.to_string(),
    }
}

pub fn parse_enrollment(html: &str, base_url: &str) -> ExtractionResult {
    let doc = parse(html);

    let mut steps = Vec::new();
    for (i, section) in doc.select_all("div.admissionRequirements_Left").into_iter().enumerate() {
        let (Some(label), Some(title)) = (section.select_first("h3"), section.select_first("h2")) else {
            continue;
        };
        let num = STEP_LABEL_RE
            .captures(&label.text_collapsed())
            .and_then(|c| c.get(1)?.as_str().parse::<u32>().ok())
            .unwrap_or(i as u32 + 1);

        let mut step = Map::new();
        step.insert("step".into(), json!(num));
        step.insert("title".into(), json!(title.text_collapsed()));

        match num {
            1 => {
                let forms: Vec<Value> = section
                    .select_all("ul li")
                    .into_iter()
                    .flat_map(|li| links(li, base_url))
                    .collect();
                if !forms.is_empty() {
                    step.insert("forms".into(), json!(forms));
                }
                if let Some(p) = section.select_first("p.border-bott-p") {
                    step.insert("description".into(), json!(p.text_collapsed()));
                }
            }
            2 | 3 => {
                if let Some(span) = section.select_first("span") {
                    step.insert("description".into(), json!(span.text_collapsed()));
                }
            }
            _ => {}
        }
        debug!("RIS: step {} `{}`", num, title.text_collapsed());
        steps.push(Value::Object(step));
    }
    steps.sort_by_key(|s| s["step"].as_u64());

    let requirements: Vec<Value> = doc
        .select_first("div.admissionRequirements_Right ul")
        .map(|ul| {
            ul.select_all("li")
                .into_iter()
                .filter_map(|li| {
                    let title = li.select_first("h3")?.text_collapsed();
                    let description = li.select_first("p").map(|p| p.text_collapsed()).unwrap_or_default();
                    Some(json!({ "title": strip_numbering(&title), "description": description }))
                })
                .collect()
        })
        .unwrap_or_default();

    let mut contact = Map::new();
    if let Some(cta) = doc.select_first("div.admissionProcessingCtaLeft") {
        contact.insert("message".into(), json!(cta.text_collapsed()));
    }
    for a in doc.select_all("div.admissionProcessingCtaRight a") {
        let text = a.text_collapsed().to_lowercase();
        let href = a.attr_str("href").unwrap_or("");
        if text.contains("call") {
            if let Some(tel) = href.strip_prefix("tel:") {
                contact.insert("phone".into(), json!(tel));
            }
        }
        if text.contains("email") {
            if let Some(mail) = href.strip_prefix("mailto:") {
                contact.insert("email".into(), json!(mail));
            }
        }
    }

    let overview = doc
        .select_first("div.admissionRequirements_Left h4")
        .map(|h| h.text_collapsed())
        .unwrap_or_default();

    let data = json!({
        "overview": overview,
        "steps": steps,
        "requirements": requirements,
        "contact_info": contact,
    });
    if steps_missing(&data) {
        return ExtractionResult::warning_with("No admission steps or requirements found", data);
    }
    ExtractionResult::success(data)
}

fn steps_missing(data: &Value) -> bool {
    ["steps", "requirements"]
        .iter()
        .all(|k| data[*k].as_array().is_none_or(|a| a.is_empty()))
}

// ── Contact ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Department {
    phone: Vec<String>,
    email: Vec<String>,
    note: Option<String>,
}

impl Department {
    fn to_value(&self) -> Value {
        let mut v = json!({ "phone": self.phone, "email": self.email });
        if let Some(n) = &self.note {
            v["note"] = json!(n);
        }
        v
    }
}

fn card_links(card: ElementRef<'_>) -> (Vec<String>, Vec<String>) {
    let mut phones = Vec::new();
    let mut emails = Vec::new();
    for a in card.select_all("a") {
        let href = a.attr_str("href").unwrap_or("");
        if href.starts_with("tel:") {
            phones.push(a.text_collapsed());
        } else if href.starts_with("mailto:") {
            emails.push(a.text_collapsed());
        }
    }
    (phones, emails)
}

pub fn parse_contact(html: &str) -> ExtractionResult {
    let doc = parse(html);

    let mut general = Map::new();
    if let Some(block) = doc.select_first("div.genInquiries") {
        let items = block.select_all("ul li");
        if items.len() >= 3 {
            general.insert("title".into(), json!(items[0].text_collapsed()));
            let phones = items[1].texts("a");
            if !phones.is_empty() {
                general.insert("phone".into(), json!(phones));
            }
            if let Some(a) = items[2].select_first("a") {
                general.insert("email".into(), json!(a.text_collapsed()));
            }
        }
    }

    let mut order: Vec<String> = Vec::new();
    let mut departments: HashMap<String, Department> = HashMap::new();
    for card in doc.select_all("div.directoryCard") {
        let (mut phones, emails) = card_links(card);
        let name = match card.select_first("h3") {
            Some(h) => h.text_collapsed(),
            // Headless cards prefix the first number with the department.
            None => {
                let prefixed = phones
                    .first()
                    .and_then(|p| p.split_once(':'))
                    .map(|(dept, number)| (dept.trim().to_string(), number.trim().to_string()));
                match prefixed {
                    Some((dept, number)) => {
                        phones[0] = number;
                        dept
                    }
                    None => "Other".to_string(),
                }
            }
        };
        if !departments.contains_key(&name) {
            order.push(name.clone());
        }
        let dept = departments.entry(name).or_default();
        dept.phone.extend(phones);
        dept.email.extend(emails);
    }

    if let Some(note) = doc.select_first("div.directoryCard p").map(|p| p.text_collapsed()) {
        if let Some(it) = departments.get_mut("IT Dept.") {
            it.note = Some(note);
        }
    }

    let mut directory = Map::new();
    for name in order {
        if let Some(d) = departments.get(&name) {
            directory.insert(name, d.to_value());
        }
    }

    if general.is_empty() && directory.is_empty() {
        let scanned = scanned_contact(doc.root_element());
        if scanned.is_empty() {
            return ExtractionResult::warning("No contact directory found");
        }
        debug!("RIS: no directory markup, using page text");
        return ExtractionResult::success(json!({ "general_inquiries": scanned, "departments": {} }));
    }
    ExtractionResult::success(json!({ "general_inquiries": general, "departments": directory }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curriculum_reads_sections_and_strands() {
        let html = r#"
          <div class="kinderGartenRow"><h2>Kindergarten</h2><p>Play-based learning.</p></div>
          <div class="basicEducationRow"><h2>Basic Education</h2>
            <div id="accordion">
              <div class="card"><div class="card-header"><h3><button><span>Math</span></button></h3></div>
                <div class="card-body">Singapore   Math approach</div></div>
            </div></div>
          <div class="seniorHsCurriculum"><h2>Senior High</h2>
            <div id="accordion2">
              <div class="card"><div class="card-header"><h3><button><span>STEM</span></button></h3></div>
                <div class="card-body">Science track. <ol><li>Physics</li><li>Calculus</li></ol></div></div>
            </div></div>
          <div class="acadProgramSidebar"><ul><li>Kinder</li><li>Grade 1</li></ul></div>"#;
        let r = parse_curriculum(html);
        let data = r.data().unwrap();
        assert_eq!(data["kindergarten"]["title"], "Kindergarten");
        assert_eq!(data["basic_education"]["subjects"]["Math"], "Singapore Math approach");
        assert_eq!(data["senior_high_school"]["strands"]["STEM"]["courses"], json!(["Physics", "Calculus"]));
        assert_eq!(data["senior_high_school"]["strands"]["STEM"]["description"], "Science track.");
        assert_eq!(data["grade_levels"], json!(["Kinder", "Grade 1"]));
    }

    #[test]
    fn enrollment_steps_requirements_and_cta() {
        let html = r#"
          <div class="admissionRequirements_Left"><h4>Three easy steps</h4><h3>Step 1</h3><h2>Download forms</h2>
            <p class="border-bott-p">Fill out the forms.</p>
            <ul><li><a href="/forms/app.pdf">Application Form</a></li></ul></div>
          <div class="admissionRequirements_Left"><h3>Step 2</h3><h2>Assessment</h2><span>Entrance exam</span></div>
          <div class="admissionRequirements_Right"><ul>
            <li><h3>1 — Birth Certificate</h3><p>PSA copy</p></li></ul></div>
          <div class="admissionProcessingCtaLeft">Questions?</div>
          <div class="admissionProcessingCtaRight">
            <a href="tel:+6328123">Call us</a><a href="mailto:admissions@reedley.ph">Email us</a></div>"#;
        let r = parse_enrollment(html, "https://www.reedleyschool.edu.ph");
        let data = r.data().unwrap();
        assert_eq!(data["overview"], "Three easy steps");
        assert_eq!(data["steps"][0]["forms"][0]["url"], "https://www.reedleyschool.edu.ph/forms/app.pdf");
        assert_eq!(data["steps"][1]["description"], "Entrance exam");
        assert_eq!(data["requirements"][0]["title"], "Birth Certificate");
        assert_eq!(data["contact_info"]["email"], "admissions@reedley.ph");
        assert_eq!(data["contact_info"]["phone"], "+6328123");
    }

    #[test]
    fn enrollment_steps_follow_step_numbers() {
        let html = r#"
          <div class="admissionRequirements_Left"><h3>Step 3</h3><h2>Enroll</h2></div>
          <div class="admissionRequirements_Left"><h3>Step 1</h3><h2>Download forms</h2></div>
          <div class="admissionRequirements_Left"><h3>Step 2</h3><h2>Assessment</h2></div>"#;
        let r = parse_enrollment(html, "https://www.reedleyschool.edu.ph");
        let steps = r.data().unwrap()["steps"].as_array().unwrap().clone();
        let order: Vec<u64> = steps.iter().filter_map(|s| s["step"].as_u64()).collect();
        assert_eq!(order, [1, 2, 3]);
        assert_eq!(steps[0]["title"], "Download forms");
    }

    #[test]
    fn contact_without_directory_reads_page_text() {
        let html = "<main><p>Write to info@reedley.ph or call +63 2 8123 4567.</p></main>";
        let r = parse_contact(html);
        assert_eq!(r.status(), "success");
        let data = r.data().unwrap();
        assert_eq!(data["general_inquiries"]["emails"], json!(["info@reedley.ph"]));
        assert_eq!(data["general_inquiries"]["phones"], json!(["+63 2 8123 4567"]));

        assert_eq!(parse_contact("<main><p>Visit us soon.</p></main>").status(), "warning");
    }

    #[test]
    fn directory_cards_without_heading_take_name_from_number() {
        let html = r#"
          <div class="genInquiries"><ul><li>General Inquiries</li>
            <li><a href="tel:1">8123-4567</a><a href="tel:2">8123-4568</a></li>
            <li><a href="mailto:info@reedley.ph">info@reedley.ph</a></li></ul></div>
          <div class="directoryCard"><h3>Admissions</h3><a href="tel:3">8000-0001</a></div>
          <div class="directoryCard"><a href="tel:4">Grade School: 8000-0002</a>
            <a href="mailto:gs@reedley.ph">gs@reedley.ph</a></div>"#;
        let r = parse_contact(html);
        let data = r.data().unwrap();
        assert_eq!(data["general_inquiries"]["phone"], json!(["8123-4567", "8123-4568"]));
        assert_eq!(data["departments"]["Grade School"]["phone"], json!(["8000-0002"]));
        assert_eq!(data["departments"]["Admissions"]["email"], json!([]));
    }

    #[tokio::test]
    async fn fees_and_scholarships_are_skipped() {
        let fetcher = crate::fetcher::testing::StaticFetcher::new();
        let ris = Ris::new();
        assert_eq!(ris.tuition_fees(&fetcher).await.unwrap().status(), "skipped");
        assert_eq!(ris.scholarships(&fetcher).await.unwrap().status(), "skipped");
        assert!(fetcher.requests().is_empty());
    }
}

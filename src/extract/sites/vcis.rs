//! Victory Christian International School.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::{links, scanned_contact};
use crate::document::{ElementExt, Query, parse};
use crate::extract::{FieldResult, SiteExtractor, SiteProfile};
use crate::fetcher::PageFetcher;
use crate::models::ExtractionResult;

const PROGRAMS_PATH: &str = "/index.php/our-programs/";
const CONTACT_PATH: &str = "/index.php/contact-us/";

pub struct Vcis {
    profile: SiteProfile,
}

impl Vcis {
    pub fn new() -> Self {
        Self { profile: SiteProfile::new("Victory Christian International School", "VCIS", "https://vcis.edu.ph") }
    }
}

#[async_trait]
impl SiteExtractor for Vcis {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn tuition_fees(&self, _fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(ExtractionResult::skipped("Tuition fees are not published on the school website"))
    }

    async fn curriculum(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(PROGRAMS_PATH)).await?;
        Ok(parse_curriculum(&html, &self.profile.base_url))
    }

    async fn enrollment_process(&self, _fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(ExtractionResult::not_implemented("No enrollment extraction for this site"))
    }

    async fn scholarships(&self, _fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(ExtractionResult::not_implemented("No scholarship extraction for this site"))
    }

    async fn contact_info(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(CONTACT_PATH)).await?;
        Ok(parse_contact(&html))
    }
}

pub fn parse_curriculum(html: &str, base_url: &str) -> ExtractionResult {
    let doc = parse(html);
    let mut programs = Vec::new();

    for heading in doc.select_all("h2.elementor-heading-title") {
        let name = heading.text_collapsed();
        if name.chars().count() < 3 {
            continue;
        }
        let Some(column) = heading.closest_with_class("elementor-column") else { continue };

        let mut program = Map::new();
        program.insert("name".into(), json!(name));
        program.insert(
            "description".into(),
            json!(
                column
                    .select_first("div.elementor-widget-text-editor p")
                    .map(|p| p.text_collapsed())
                    .unwrap_or_default()
            ),
        );
        let found: Vec<Value> = links(column, base_url)
            .into_iter()
            .filter(|l| l["name"].as_str().is_some_and(|t| !t.is_empty()))
            .collect();
        if !found.is_empty() {
            program.insert("links".into(), json!(found));
        }
        programs.push(Value::Object(program));
    }

    if programs.is_empty() {
        debug!("VCIS: no program columns, trying whole sections");
        for section in doc.select_all("section.elementor-section") {
            let Some(heading) = section.select_first("h2.elementor-heading-title") else { continue };
            let name = heading.text_collapsed();
            let description = section.texts("p").join(" ");
            if !name.is_empty() && !description.is_empty() {
                programs.push(json!({ "name": name, "description": description }));
            }
        }
    }

    if programs.is_empty() {
        return ExtractionResult::warning_with("No curriculum information found", json!([]));
    }
    ExtractionResult::success(json!(programs))
}

pub fn parse_contact(html: &str) -> ExtractionResult {
    let doc = parse(html);
    let mut phone = None;
    let mut email = None;

    for boxed in doc.select_all("div.elementor-icon-box-wrapper") {
        let (Some(icon), Some(desc)) = (
            boxed.select_first("i.fas, i.far"),
            boxed.select_first("p.elementor-icon-box-description"),
        ) else {
            continue;
        };
        let text = desc.text_collapsed();
        if text.is_empty() {
            continue;
        }
        if icon.has_class("fa-phone-alt") {
            phone = Some(text);
        } else if icon.has_class("fa-envelope") {
            // Several addresses share one box, separated by pipes or commas.
            email = text
                .split(['|', ','])
                .map(str::trim)
                .find(|e| !e.is_empty())
                .map(String::from);
        }
    }

    if phone.is_none() && email.is_none() {
        let scanned = scanned_contact(doc.root_element());
        let first = |key: &str| scanned.get(key).and_then(|v| v[0].as_str()).map(String::from);
        phone = first("phones");
        email = first("emails");
        if phone.is_some() || email.is_some() {
            debug!("VCIS: no icon boxes, contact taken from page text");
        }
    }

    let data = json!({ "contact_person": Value::Null, "phone": phone, "email": email });
    if phone.is_none() && email.is_none() {
        return ExtractionResult::warning_with("Limited contact information found", data);
    }
    ExtractionResult::success(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_headings_with_column_links() {
        let html = r#"<div class="elementor-column">
            <h2 class="elementor-heading-title">VCIS Online</h2>
            <div class="elementor-widget-text-editor"><p>Learn from home.</p></div>
            <a href="/index.php/online/">Learn more</a><a href="/x"></a>
          </div>
          <div class="elementor-column"><h2 class="elementor-heading-title">Go</h2></div>"#;
        let r = parse_curriculum(html, "https://vcis.edu.ph");
        let programs = r.data().unwrap().as_array().unwrap().clone();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0]["description"], "Learn from home.");
        assert_eq!(programs[0]["links"][0]["url"], "https://vcis.edu.ph/index.php/online/");
        assert_eq!(programs[0]["links"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn section_fallback_when_no_columns() {
        let html = r#"<section class="elementor-section"><h2 class="elementor-heading-title">Integrated Hybrid</h2>
            <p>Two days on campus.</p></section>"#;
        let r = parse_curriculum(html, "https://vcis.edu.ph");
        assert_eq!(r.data().unwrap()[0]["name"], "Integrated Hybrid");
    }

    #[test]
    fn icon_boxes_give_phone_and_primary_email() {
        let html = r#"
          <div class="elementor-icon-box-wrapper"><i class="fas fa-phone-alt"></i>
            <p class="elementor-icon-box-description">(02) 8123 4567</p></div>
          <div class="elementor-icon-box-wrapper"><i class="far fa-envelope"></i>
            <p class="elementor-icon-box-description">info@vcis.edu.ph | registrar@vcis.edu.ph</p></div>"#;
        let data = parse_contact(html).data().cloned().unwrap();
        assert_eq!(data["phone"], "(02) 8123 4567");
        assert_eq!(data["email"], "info@vcis.edu.ph");
    }

    #[test]
    fn plain_paragraphs_fill_contact_without_icon_boxes() {
        let html = "<p>Email: info@vcis.edu.ph</p><p>Phone: +63 2 8123 4567</p>";
        let r = parse_contact(html);
        assert_eq!(r.status(), "success");
        let data = r.data().unwrap();
        assert_eq!(data["email"], "info@vcis.edu.ph");
        assert_eq!(data["phone"], "+63 2 8123 4567");
    }

    #[test]
    fn no_icon_boxes_is_warning_with_nulls() {
        let r = parse_contact("<p>Nothing</p>");
        assert_eq!(r.status(), "warning");
        assert!(r.data().unwrap()["phone"].is_null());
    }
}

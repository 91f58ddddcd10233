//! British School Manila.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;
use tracing::info;

use crate::document::{ElementExt, Query, parse};
use crate::extract::patterns::{age_range, emails};
use crate::extract::{FieldResult, SiteExtractor, SiteProfile};
use crate::fetcher::PageFetcher;
use crate::models::ExtractionResult;

const KEY_STAGES_PATH: &str = "/academics/the-key-stages";
const APPLY_PATH: &str = "/admissions/how-to-apply";
const CONTACT_PATH: &str = "/contact";

static BSM_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+\d+\s*\(\d+\)\s*[\d\s]+").expect("Failed to compile BSM phone regex"));

pub struct Bsm {
    profile: SiteProfile,
}

impl Bsm {
    pub fn new() -> Self {
        Self { profile: SiteProfile::new("British School Manila", "BSM", "https://www.britishschoolmanila.org") }
    }
}

#[async_trait]
impl SiteExtractor for Bsm {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn tuition_fees(&self, _fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(ExtractionResult::skipped("Tuition fees are not published on the school website"))
    }

    async fn curriculum(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let url = self.profile.url(KEY_STAGES_PATH);
        let html = fetcher.get(&url).await?;
        Ok(parse_curriculum(&html, &url))
    }

    async fn enrollment_process(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(APPLY_PATH)).await?;
        Ok(parse_enrollment(&html))
    }

    async fn scholarships(&self, _fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(ExtractionResult::not_implemented("No scholarship extraction for this site"))
    }

    async fn contact_info(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher.get(&self.profile.url(CONTACT_PATH)).await?;
        Ok(parse_contact(&html))
    }
}

/// Key-stage accordion; `page_url` anchors each panel link.
pub fn parse_curriculum(html: &str, page_url: &str) -> ExtractionResult {
    let doc = parse(html);
    let Some(accordion) = doc.select_first("div.fsElement.fsPanelGroup.fsAccordion") else {
        return ExtractionResult::warning("Key stage accordion not found");
    };

    let mut stages = Vec::new();
    for panel in accordion.select_all("section.fsElement.fsPanel") {
        let Some(title) = panel.select_first("h2.fsElementTitle a").map(|a| a.text_collapsed()) else {
            continue;
        };
        let Some(content) = panel.select_first("div.fsElementContent div.fsElementContent") else {
            continue;
        };
        let paragraphs = content.texts("p");
        let age = paragraphs.first().and_then(|p| age_range(p)).unwrap_or_default();
        let link = match panel.attr_str("id") {
            Some(id) if !id.is_empty() => format!("{}#{}", page_url, id),
            _ => page_url.to_string(),
        };
        stages.push(json!({
            "name": title,
            "age_range": age,
            "description": paragraphs.join(" "),
            "link": link,
        }));
    }

    if stages.is_empty() {
        return ExtractionResult::warning("Key stage accordion has no panels");
    }
    info!("BSM: {} key stages", stages.len());
    ExtractionResult::success(json!(stages))
}

pub fn parse_enrollment(html: &str) -> ExtractionResult {
    let doc = parse(html);
    if doc.select_first("ul.fsTabsNav").is_none() {
        return ExtractionResult::warning("Application step tabs not found");
    }

    let mut steps: Vec<Value> = Vec::new();
    let mut requirements = Vec::new();
    let mut contact_email: Option<String> = None;

    for (i, panel) in doc.select_all("section.fsElement.fsPanel").into_iter().enumerate() {
        let Some(title) = panel.select_first("h2.fsElementTitle a").map(|a| a.text_collapsed()) else {
            continue;
        };
        let Some(content) = panel.select_first("div.fsElementContent") else { continue };

        let number = panel
            .select_first("h2.fsElementTitle span.accordion-number")
            .and_then(|s| s.text_collapsed().parse::<u32>().ok())
            .unwrap_or(i as u32 + 1);

        let description = content
            .select_first("section.fsElement.fsContent div.fsElementContent")
            .map(|inner| {
                inner
                    .texts("p")
                    .into_iter()
                    .filter(|p| !p.starts_with("ENQUIRE TODAY"))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        if contact_email.is_none() {
            contact_email = emails(&description).into_iter().next();
        }
        if title.contains("Requirements") || description.contains("Requirements") {
            requirements.extend(content.texts("ul li"));
        }

        steps.push(json!({
            "step_number": number,
            "title": title,
            "description": description,
        }));
    }

    steps.sort_by_key(|s| s["step_number"].as_u64());

    let data = json!({
        "application_process": steps,
        "requirements": requirements,
        "contact_email": contact_email,
    });
    if steps.is_empty() {
        return ExtractionResult::warning_with("Application tabs carry no panels", data);
    }
    ExtractionResult::success(data)
}

pub fn parse_contact(html: &str) -> ExtractionResult {
    let doc = parse(html);
    let Some(section) = doc.select_first("div.fsElementHeaderContent") else {
        return ExtractionResult::warning("Contact header block not found");
    };
    let text = section.text().collect::<String>();

    let phone = BSM_PHONE_RE.find(&text).map(|m| m.as_str().trim().to_string());
    let email = emails(&text).into_iter().next();
    if phone.is_none() && email.is_none() {
        return ExtractionResult::warning("No phone or email in contact header");
    }
    ExtractionResult::success(json!({
        "contact_person": Value::Null,
        "phone": phone,
        "email": email,
    }))
}

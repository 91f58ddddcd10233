//! Chinese International School Manila. Every page is client-rendered.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::document::{ElementExt, Query, absolute_url, parse, row_cells};
use crate::extract::patterns::emails;
use crate::extract::{FieldResult, SiteExtractor, SiteProfile};
use crate::fetcher::PageFetcher;
use crate::models::ExtractionResult;

const FEES_PATH: &str = "/admissions/fee-structure";
const CURRICULUM_PATH: &str = "/learning/curriculum/";
const POLICY_PATH: &str = "/admissions/admissions-policy";
const SCHOLARSHIPS_PATH: &str = "/scholarships";
const CONTACT_PATH: &str = "/contact-us";

const RENDER_WAIT_MS: u64 = 10_000;

pub struct Cism {
    profile: SiteProfile,
}

impl Cism {
    pub fn new() -> Self {
        Self { profile: SiteProfile::new("Chinese International School Manila", "CISM", "https://cismanila.org") }
    }
}

#[async_trait]
impl SiteExtractor for Cism {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn tuition_fees(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher
            .render(&self.profile.url(FEES_PATH), "div.table_content table, table", RENDER_WAIT_MS)
            .await?;
        Ok(parse_tuition_fees(&html))
    }

    async fn curriculum(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher
            .render(&self.profile.url(CURRICULUM_PATH), "div.curriculum_container", RENDER_WAIT_MS)
            .await?;
        Ok(parse_curriculum(&html, &self.profile.base_url))
    }

    async fn enrollment_process(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher
            .render(&self.profile.url(POLICY_PATH), "div.accordion_container", RENDER_WAIT_MS)
            .await?;
        Ok(parse_enrollment(&html))
    }

    async fn scholarships(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher
            .render(&self.profile.url(SCHOLARSHIPS_PATH), "div.explore_cism_container", RENDER_WAIT_MS)
            .await?;
        Ok(parse_scholarships(&html, &self.profile.base_url))
    }

    async fn contact_info(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        let html = fetcher
            .render(&self.profile.url(CONTACT_PATH), "div.address_phone_container", RENDER_WAIT_MS)
            .await?;
        Ok(parse_contact(&html))
    }
}

// ── Tuition fees ──────────────────────────────────────────────────────────────

pub fn parse_tuition_fees(html: &str) -> ExtractionResult {
    let doc = parse(html);
    let Some(table) = doc
        .select_ladder(&[
            "div.accordion_container div.item_content div.table_content table",
            "div.table_content table",
            "table",
        ])
        .into_iter()
        .next()
    else {
        return ExtractionResult::warning("Tuition fee table not found");
    };

    let mut fees = Map::new();
    for row in table.select_all("tr").into_iter().skip(1) {
        let cells = row_cells(row);
        if cells.len() < 4 || cells[0].is_empty() {
            continue;
        }
        fees.insert(
            cells[0].clone(),
            json!({ "Annual": cells[1], "Semestral": cells[2], "Quarterly": cells[3] }),
        );
    }

    if fees.is_empty() {
        return ExtractionResult::warning("Tuition fee table has no grade rows");
    }
    info!("CISM: {} grade levels", fees.len());
    ExtractionResult::success(Value::Object(fees))
}

// ── Curriculum ────────────────────────────────────────────────────────────────

pub fn parse_curriculum(html: &str, base_url: &str) -> ExtractionResult {
    let doc = parse(html);
    let blocks = doc.select_ladder(&[
        "div.curriculum_container div.__uRxj8vJrdWNc",
        "div.__HVzJCy6CJGoG > div.__uRxj8vJrdWNc",
        "div.curriculum_container > div > div",
    ]);
    if blocks.is_empty() {
        return ExtractionResult::warning("Curriculum blocks not found");
    }

    let programs: Vec<Value> = blocks
        .into_iter()
        .filter_map(|block| {
            let name = block
                .select_ladder(&["p.__sqJM8jSflkpR", r"div.__QY\+N\+pXIYT1I > p:first-child", "div p:first-child"])
                .first()
                .map(|e| e.text_collapsed())
                .filter(|n| !n.is_empty())?;
            let age_range = block
                .select_ladder(&["p.__1TExyx75Kbxq", "div > p:nth-child(2)"])
                .first()
                .map(|e| e.text_collapsed())
                .unwrap_or_default();
            let link = block
                .select_first("a[href]")
                .and_then(|a| a.attr_str("href"))
                .map(|h| absolute_url(base_url, h))
                .unwrap_or_default();
            Some(json!({ "name": name, "age_range": age_range, "link": link }))
        })
        .collect();

    if programs.is_empty() {
        return ExtractionResult::warning("Curriculum blocks carry no program names");
    }
    ExtractionResult::success(json!(programs))
}

// ── Enrollment ────────────────────────────────────────────────────────────────

pub fn parse_enrollment(html: &str) -> ExtractionResult {
    let doc = parse(html);
    let items = doc.select_all("div.accordion_container div.item");
    if items.is_empty() {
        return ExtractionResult::warning("Admissions accordion not found");
    }

    let mut policy = Vec::new();
    let mut requirements = Vec::new();
    let mut contact_email = None;

    for item in items {
        let Some(title) = item.select_first("div.item_header p.title").map(|t| t.text_collapsed()) else {
            continue;
        };
        let Some(content) = item.select_first("div.item_content") else { continue };

        if title.contains("Policy") {
            policy.extend(content.texts("ul li"));
        } else if title.contains("Requirements") {
            if contact_email.is_none() {
                contact_email = emails(&content.text_collapsed()).into_iter().next();
            }
            requirements.extend(content.texts("ul li"));
        } else {
            debug!("CISM: ignoring accordion item `{}`", title);
        }
    }

    let data = json!({
        "policy": policy,
        "requirements": requirements,
        "contact_email": contact_email,
    });
    if policy_is_empty(&data) {
        return ExtractionResult::warning_with("Admissions accordion has no policy or requirement items", data);
    }
    ExtractionResult::success(data)
}

fn policy_is_empty(data: &Value) -> bool {
    ["policy", "requirements"]
        .iter()
        .all(|k| data[*k].as_array().is_none_or(|a| a.is_empty()))
}

// ── Scholarships ──────────────────────────────────────────────────────────────

pub fn parse_scholarships(html: &str, base_url: &str) -> ExtractionResult {
    let doc = parse(html);

    let heading = doc.select_first("div.explore_cism_container h3.heading_text").map(|e| e.text_collapsed());
    let subheading = doc.select_first("div.explore_cism_container p.subheading_text").map(|e| e.text_collapsed());
    let introduction = match (heading, subheading) {
        (Some(h), Some(s)) => format!("{}: {}", h, s),
        _ => String::new(),
    };

    let cards = doc.select_all("div.__xTj7CWA-ABoj");
    let scholarships: Vec<Value> = cards
        .into_iter()
        .filter_map(|card| {
            let name = card.select_first("h2").map(|t| t.text_collapsed()).filter(|t| !t.is_empty())?;
            let description = card
                .select_ladder(&[r"div.__hc4Qy2\+wXZ2b", "p"])
                .first()
                .map(|d| d.text_collapsed())
                .unwrap_or_default();
            let link = card
                .select_first("a[href]")
                .and_then(|a| a.attr_str("href"))
                .map(|h| absolute_url(base_url, h))
                .unwrap_or_default();
            Some(json!({ "name": name, "description": description, "link": link }))
        })
        .collect();

    if scholarships.is_empty() {
        return ExtractionResult::warning("Scholarship cards not found");
    }
    ExtractionResult::success(json!({ "introduction": introduction, "scholarships": scholarships }))
}

// ── Contact ───────────────────────────────────────────────────────────────────

pub fn parse_contact(html: &str) -> ExtractionResult {
    let doc = parse(html);
    let email = emails(html).into_iter().next();

    let phones: Vec<String> = doc
        .select_all("div.address_phone_container div.text_container")
        .into_iter()
        .filter(|c| c.select_first("a[href^='sms:'], img[src*='message_logo']").is_some())
        .filter_map(|c| c.select_first("span.text"))
        .map(|s| s.text_collapsed())
        .filter(|t| !t.is_empty())
        .collect();

    if email.is_none() && phones.is_empty() {
        return ExtractionResult::warning("No contact details found");
    }
    ExtractionResult::success(json!({
        "email": email,
        "phone_numbers": phones,
        "contact_person": Value::Null,
    }))
}

//! Keyword-driven fallback over a school's catalog URLs.
//!
//! Produces plain text per category rather than structured payloads. Used
//! for schools no bespoke extractor covers and for ad-hoc category lookups.

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use serde_json::json;
use tracing::{debug, warn};

use crate::document::{ElementExt, Query, collapse_whitespace, parse, truncate_chars};
use crate::error::{ExtractError, ParseError};
use crate::extract::{FieldResult, SiteExtractor, SiteProfile};
use crate::fetcher::PageFetcher;
use crate::models::{Category, ExtractionResult, Field, SchoolDescriptor};

pub const MAX_CONTENT_CHARS: usize = 5000;
pub const GENERIC_CODE: &str = "generic";

const MIN_CONTAINER_CHARS: usize = 100;
const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

const MAIN_CONTAINERS: [&str; 13] = [
    "main",
    "#main",
    ".main",
    "article",
    ".article",
    "#article",
    ".content",
    "#content",
    ".page-content",
    ".entry-content",
    ".post-content",
    ".container",
    ".inner-container",
];

const CONTENT_TAGS: &str = "p, h1, h2, h3, h4, h5, h6, li";

pub struct GenericExtractor {
    descriptor: SchoolDescriptor,
    profile: SiteProfile,
}

impl GenericExtractor {
    pub fn new(descriptor: SchoolDescriptor) -> Self {
        let profile = SiteProfile::new(&descriptor.name, GENERIC_CODE, &descriptor.link);
        Self { descriptor, profile }
    }

    /// Fetch every URL listed for `category` and concatenate what each yields.
    pub async fn extract_category(&self, category: Category, fetcher: &dyn PageFetcher) -> ExtractionResult {
        let urls = self.descriptor.urls(category).urls();
        if urls.is_empty() {
            return ExtractionResult::skipped("No data available");
        }

        let mut chunks = Vec::new();
        let mut failures = 0;
        for url in &urls {
            match source_content(fetcher, url, category).await {
                Ok(content) => {
                    if content.is_empty() {
                        debug!("{}: nothing for {} at {}", self.descriptor.name, category, url);
                        continue;
                    }
                    chunks.push(format!("From {}:\n{}", url, content));
                }
                Err(e) => {
                    warn!("{}: {} source {} failed: {}", self.descriptor.name, category, url, e);
                    failures += 1;
                    chunks.push(format!("Error scraping {}: {}", url, e));
                }
            }
        }

        let text = chunks.join(CHUNK_SEPARATOR);
        if failures == urls.len() {
            return ExtractionResult::error(text);
        }
        if chunks.is_empty() {
            return ExtractionResult::warning("No structured data found");
        }
        if failures > 0 {
            return ExtractionResult::partial(json!(text), format!("{} of {} sources failed", failures, urls.len()));
        }
        ExtractionResult::success(json!(text))
    }
}

#[async_trait]
impl SiteExtractor for GenericExtractor {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn tuition_fees(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(self.extract_category(Field::TuitionFees.category(), fetcher).await)
    }

    async fn curriculum(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(self.extract_category(Field::Curriculum.category(), fetcher).await)
    }

    async fn enrollment_process(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(self.extract_category(Field::EnrollmentProcess.category(), fetcher).await)
    }

    async fn scholarships(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(self.extract_category(Field::Scholarships.category(), fetcher).await)
    }

    async fn contact_info(&self, fetcher: &dyn PageFetcher) -> FieldResult {
        Ok(self.extract_category(Field::ContactInfo.category(), fetcher).await)
    }
}

// ── Content extraction ────────────────────────────────────────────────────────

async fn source_content(fetcher: &dyn PageFetcher, url: &str, category: Category) -> Result<String, ExtractError> {
    let body = fetcher.get(url).await?;
    Ok(extract_content(html_body(&body)?, category))
}

/// Catalog entries sometimes point at PDFs, which carry no markup to read.
fn html_body(body: &str) -> Result<&str, ParseError> {
    if body.trim_start().starts_with("%PDF-") {
        return Err(ParseError::Structure("PDF document, not HTML".into()));
    }
    Ok(body)
}

fn text_len(el: ElementRef<'_>) -> usize {
    el.visible_text().chars().count()
}

/// A conventional content container with real text in it, else the classed
/// block with the most text.
pub fn find_main_content(doc: &Html) -> Option<ElementRef<'_>> {
    for css in MAIN_CONTAINERS {
        if let Some(el) = doc.select_first(css).filter(|el| text_len(*el) > MIN_CONTAINER_CHARS) {
            return Some(el);
        }
    }
    doc.select_all("div[class], section[class]")
        .into_iter()
        .map(|el| (text_len(el), el))
        .max_by_key(|(len, _)| *len)
        .filter(|(len, _)| *len > MIN_CONTAINER_CHARS)
        .map(|(_, el)| el)
}

fn keyword_blocks(doc: &Html, category: Category) -> Vec<String> {
    let tags = match category {
        Category::Fees => "div, section, p",
        Category::Contact => "div, section, p, li, address",
        _ => "div, section, p, li",
    };
    let keywords = category.keywords();
    doc.select_all(tags)
        .into_iter()
        .map(|el| el.visible_text())
        .filter(|t| {
            let lower = t.to_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
        .collect()
}

/// Whitespace-collapsed text for `category`, at most [`MAX_CONTENT_CHARS`]
/// characters. Empty when nothing relevant was found.
pub fn extract_content(html: &str, category: Category) -> String {
    let doc = parse(html);

    let pieces: Vec<String> = match find_main_content(&doc) {
        Some(main) => main
            .select_all(CONTENT_TAGS)
            .into_iter()
            .map(|el| el.visible_text())
            .filter(|t| !t.is_empty())
            .collect(),
        None => {
            let tables: Vec<String> = match category {
                Category::Fees => doc.select_all("table").into_iter().map(|t| t.visible_text()).collect(),
                _ => Vec::new(),
            };
            if tables.iter().any(|t| !t.is_empty()) { tables } else { keyword_blocks(&doc, category) }
        }
    };

    truncate_chars(&collapse_whitespace(&pieces.join("\n")), MAX_CONTENT_CHARS)
}

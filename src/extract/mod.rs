pub mod generic;
pub mod patterns;
pub mod sections;
pub mod sites;

use crate::error::{ExtractError, ScrapeError};
use crate::fetcher::PageFetcher;
use crate::models::{ExtractionResult, Field, SchoolRecord};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

pub type FieldResult = Result<ExtractionResult, ExtractError>;

// ── Extractor trait ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub name: String,
    /// Dispatch key, e.g. `ISM`.
    pub short_code: String,
    pub base_url: String,
}

impl SiteProfile {
    pub fn new(name: &str, short_code: &str, base_url: &str) -> Self {
        Self {
            name: name.to_string(),
            short_code: short_code.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// One website's extraction procedures. Each method is independent: a
/// failure in one never affects another.
#[async_trait]
pub trait SiteExtractor: Send + Sync {
    fn profile(&self) -> &SiteProfile;

    async fn tuition_fees(&self, fetcher: &dyn PageFetcher) -> FieldResult;
    async fn curriculum(&self, fetcher: &dyn PageFetcher) -> FieldResult;
    async fn enrollment_process(&self, fetcher: &dyn PageFetcher) -> FieldResult;
    async fn scholarships(&self, fetcher: &dyn PageFetcher) -> FieldResult;
    async fn contact_info(&self, fetcher: &dyn PageFetcher) -> FieldResult;
}

pub async fn extract_field(extractor: &dyn SiteExtractor, field: Field, fetcher: &dyn PageFetcher) -> FieldResult {
    match field {
        Field::TuitionFees => extractor.tuition_fees(fetcher).await,
        Field::Curriculum => extractor.curriculum(fetcher).await,
        Field::EnrollmentProcess => extractor.enrollment_process(fetcher).await,
        Field::Scholarships => extractor.scholarships(fetcher).await,
        Field::ContactInfo => extractor.contact_info(fetcher).await,
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Run all five fields in order over one session, then close the session.
///
/// Field errors and panics become `Error` results. With a `time_limit`, a
/// field still running at the deadline and every field after it become
/// `Error("timed out after Ns")`; fields finished before it are kept. The
/// session is closed exactly once on every path; only a failed close is
/// returned as an error.
pub async fn scrape_school(
    extractor: &dyn SiteExtractor,
    school_name: &str,
    session: &dyn PageFetcher,
    time_limit: Option<Duration>,
) -> Result<SchoolRecord, ScrapeError> {
    let code = &extractor.profile().short_code;
    info!("{}: extracting with {}", school_name, code);

    let deadline = time_limit.map(|limit| Instant::now() + limit);
    let timed_out = || format!("timed out after {}s", time_limit.unwrap_or_default().as_secs());

    // Start all-error so fields the deadline cuts off keep the timeout message.
    let mut record = SchoolRecord::failed(school_name, timed_out());
    for field in Field::ALL {
        let run = guarded(school_name, field, extract_field(extractor, field, session));
        let result = match deadline {
            None => run.await,
            Some(at) => match timeout_at(at, run).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("{}: {} at {}", school_name, timed_out(), field.key());
                    break;
                }
            },
        };
        *record.get_mut(field) = result;
    }
    for (field, result) in record.fields() {
        debug!("{}: {} -> {}", school_name, field.key(), result.status());
    }

    match session.close().await {
        Ok(()) => Ok(record),
        Err(source) => {
            error!("{}: session teardown failed: {}", school_name, source);
            Err(ScrapeError::Teardown { source, record: Box::new(record) })
        }
    }
}

async fn guarded<F>(school: &str, field: Field, fut: F) -> ExtractionResult
where
    F: Future<Output = FieldResult>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!("{}: {} failed: {}", school, field.key(), e);
            ExtractionResult::error(e.to_string())
        }
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            error!("{}: {} panicked: {}", school, field.key(), msg);
            ExtractionResult::error(format!("extractor panicked: {}", msg))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, ParseError};
    use crate::fetcher::testing::StaticFetcher;
    use serde_json::json;

    struct Flaky {
        profile: SiteProfile,
    }

    #[async_trait]
    impl SiteExtractor for Flaky {
        fn profile(&self) -> &SiteProfile {
            &self.profile
        }
        async fn tuition_fees(&self, f: &dyn PageFetcher) -> FieldResult {
            f.get("https://flaky.test/missing").await?;
            Ok(ExtractionResult::success(json!({})))
        }
        async fn curriculum(&self, _: &dyn PageFetcher) -> FieldResult {
            panic!("selector exploded");
        }
        async fn enrollment_process(&self, _: &dyn PageFetcher) -> FieldResult {
            Err(ParseError::Structure("no steps".into()).into())
        }
        async fn scholarships(&self, _: &dyn PageFetcher) -> FieldResult {
            Ok(ExtractionResult::skipped("no scholarship page"))
        }
        async fn contact_info(&self, f: &dyn PageFetcher) -> FieldResult {
            let html = f.get("https://flaky.test/contact").await?;
            Ok(ExtractionResult::success(json!({ "emails": patterns::emails(&html) })))
        }
    }

    fn flaky() -> Flaky {
        Flaky { profile: SiteProfile::new("Flaky", "FLK", "https://flaky.test/") }
    }

    #[tokio::test]
    async fn field_failures_are_isolated_and_session_closed_once() {
        let fetcher = StaticFetcher::new().page("https://flaky.test/contact", "<p>hi@flaky.test</p>");
        let rec = scrape_school(&flaky(), "Flaky School", &fetcher, None).await.unwrap();

        assert!(rec.tuition_fees.is_error());
        assert!(rec.curriculum.message().unwrap().contains("selector exploded"));
        assert!(rec.enrollment_process.is_error());
        assert_eq!(rec.scholarships.status(), "skipped");
        assert_eq!(rec.contact_info.data().unwrap()["emails"][0], "hi@flaky.test");
        assert_eq!(fetcher.close_count(), 1);
    }

    #[tokio::test]
    async fn teardown_failure_surfaces_with_record() {
        let fetcher = StaticFetcher::new().fail_close();
        let err = scrape_school(&flaky(), "Flaky School", &fetcher, None).await.unwrap_err();

        assert_eq!(fetcher.close_count(), 1);
        let ScrapeError::Teardown { source, record } = err;
        assert!(matches!(source, FetchError::BrowserStart(_)));
        assert!(record.tuition_fees.is_error());
    }

    #[tokio::test]
    async fn deadline_keeps_finished_fields() {
        let fetcher = StaticFetcher::new()
            .page("https://flaky.test/contact", "<p>hi@flaky.test</p>")
            .delay(Duration::from_millis(300));
        let rec = scrape_school(&flaky(), "Flaky School", &fetcher, Some(Duration::from_secs(1)))
            .await
            .unwrap();

        // Two 300ms fetches fit well inside the limit.
        assert!(rec.tuition_fees.is_error());
        assert_eq!(rec.scholarships.status(), "skipped");
        assert_eq!(rec.contact_info.status(), "success");
        assert_eq!(fetcher.close_count(), 1);
    }

    #[tokio::test]
    async fn deadline_cuts_off_remaining_fields() {
        let fetcher = StaticFetcher::new().delay(Duration::from_millis(1500));
        let rec = scrape_school(&flaky(), "Flaky School", &fetcher, Some(Duration::from_secs(1)))
            .await
            .unwrap();

        for (_, result) in rec.fields() {
            assert_eq!(result.message(), Some("timed out after 1s"));
        }
        assert_eq!(fetcher.close_count(), 1);
    }

    #[test]
    fn profile_joins_paths() {
        let p = SiteProfile::new("X", "X", "https://x.org/");
        assert_eq!(p.url("/contact"), "https://x.org/contact");
    }
}

//! Pipeline orchestrator: catalog → dispatch → per-school extraction.
//!
//! Each school is one unit of work with its own session. Units run
//! concurrently up to `pipeline.concurrency`; within a unit the five fields
//! run in order. Once a unit overruns `pipeline.unit_timeout_secs` its
//! unfinished fields become errors; finished ones are kept.

use crate::config::PipelineConfig;
use crate::extract::scrape_school;
use crate::fetcher::SessionFactory;
use crate::models::{SchoolDescriptor, SchoolRecord};
use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub struct Pipeline {
    registry: Arc<Registry>,
    sessions: Arc<dyn SessionFactory>,
    config: PipelineConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    pub schools: usize,
    pub fields_ok: usize,
    pub field_errors: usize,
    pub teardown_failures: usize,
}

impl Pipeline {
    pub fn new(registry: Arc<Registry>, sessions: Arc<dyn SessionFactory>, config: PipelineConfig) -> Self {
        Self { registry, sessions, config }
    }

    /// Scrape `schools`, returning records in input order.
    pub async fn run(&self, schools: &[SchoolDescriptor]) -> (Vec<SchoolRecord>, PipelineStats) {
        let mut stats = PipelineStats::default();
        if schools.is_empty() {
            info!("No schools selected");
            return (Vec::new(), stats);
        }

        info!("=== Scraping {} schools (concurrency {}) ===", schools.len(), self.config.concurrency);

        let sem = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let unit_timeout = Duration::from_secs(self.config.unit_timeout_secs);
        let mut handles = Vec::new();

        for school in schools {
            let dispatch = self.registry.resolve_school(school, self.config.unmatched);
            if let Some(notice) = &dispatch.notice {
                warn!("{}", notice);
            }

            let name = school.name.clone();
            let extractor = dispatch.extractor;
            let sessions = Arc::clone(&self.sessions);
            let sem = Arc::clone(&sem);

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await.ok();
                let session = sessions.open();

                match scrape_school(extractor.as_ref(), &name, session.as_ref(), Some(unit_timeout)).await {
                    Ok(record) => (record, false),
                    Err(e) => {
                        error!("{}", e);
                        (e.into_record(), true)
                    }
                }
            });

            handles.push((school.name.clone(), handle));
        }

        let mut records = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let record = match handle.await {
                Ok((record, teardown_failed)) => {
                    if teardown_failed {
                        stats.teardown_failures += 1;
                    }
                    record
                }
                Err(e) => {
                    error!("Task panic for {}: {}", name, e);
                    SchoolRecord::failed(&name, format!("task failed: {}", e))
                }
            };
            let errors = record.error_count();
            stats.field_errors += errors;
            stats.fields_ok += record.fields().count() - errors;
            records.push(record);
        }
        stats.schools = records.len();

        info!(
            "=== Done: {} schools | {} fields ok | {} field errors | {} teardown failures ===",
            stats.schools, stats.fields_ok, stats.field_errors, stats.teardown_failures
        );
        (records, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Unmatched;
    use crate::fetcher::testing::StaticFetcher;
    use crate::models::UrlSource;

    fn config(unit_timeout_secs: u64) -> PipelineConfig {
        PipelineConfig { concurrency: 2, unit_timeout_secs, unmatched: Unmatched::Generic }
    }

    fn school(name: &str, contact: &str) -> SchoolDescriptor {
        let mut s = SchoolDescriptor::new(name);
        s.extractor = Some("generic".into());
        s.contact = UrlSource::One(contact.into());
        s
    }

    #[test]
    fn empty_selection_is_empty_result() {
        let fetcher = StaticFetcher::new();
        let pipeline = Pipeline::new(Arc::new(Registry::builtin()), Arc::new(fetcher.clone()), config(5));
        let (records, stats) = tokio_test::block_on(pipeline.run(&[]));
        assert!(records.is_empty());
        assert_eq!(stats, PipelineStats::default());
        assert_eq!(fetcher.close_count(), 0);
    }

    #[tokio::test]
    async fn records_keep_input_order_and_sessions_close() {
        let fetcher = StaticFetcher::new()
            .page("https://a.test/contact", "<p>Email: a@a.test</p>")
            .page("https://b.test/contact", "<p>Email: b@b.test</p>");
        let pipeline = Pipeline::new(Arc::new(Registry::builtin()), Arc::new(fetcher.clone()), config(5));
        let schools = vec![
            school("Alpha Academy", "https://a.test/contact"),
            school("Beta Academy", "https://b.test/contact"),
        ];

        let (records, stats) = pipeline.run(&schools).await;

        assert_eq!(records.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), ["Alpha Academy", "Beta Academy"]);
        assert_eq!(records[0].contact_info.status(), "success");
        assert_eq!(stats.schools, 2);
        assert_eq!(stats.field_errors, 0);
        assert_eq!(fetcher.close_count(), 2);
    }

    #[tokio::test]
    async fn overrunning_unit_keeps_finished_fields_and_closes_once() {
        let mut slow = school("Slow School", "");
        slow.contact = UrlSource::None;
        slow.school_fee = UrlSource::One("https://slow.test/fees".into());
        slow.enrollment = UrlSource::One("https://slow.test/apply".into());
        let fetcher = StaticFetcher::new()
            .page("https://slow.test/fees", "<table><tr><td>Tuition</td><td>PHP 100,000</td></tr></table>")
            .page("https://slow.test/apply", "<ol><li>Apply online</li></ol>")
            .delay(Duration::from_millis(600));
        let pipeline = Pipeline::new(Arc::new(Registry::builtin()), Arc::new(fetcher.clone()), config(1));

        let (records, stats) = pipeline.run(&[slow]).await;

        let rec = &records[0];
        assert_eq!(rec.tuition_fees.status(), "success");
        assert_eq!(rec.curriculum.status(), "skipped");
        assert_eq!(rec.enrollment_process.message(), Some("timed out after 1s"));
        assert_eq!(rec.contact_info.message(), Some("timed out after 1s"));
        assert_eq!(stats.field_errors, 3);
        assert_eq!(stats.teardown_failures, 0);
        assert_eq!(fetcher.close_count(), 1);
    }

    #[tokio::test]
    async fn teardown_failure_keeps_record_and_is_counted() {
        let fetcher = StaticFetcher::new().page("https://a.test/contact", "<p>Email: a@a.test</p>").fail_close();
        let pipeline = Pipeline::new(Arc::new(Registry::builtin()), Arc::new(fetcher.clone()), config(5));

        let (records, stats) = pipeline.run(&[school("Alpha Academy", "https://a.test/contact")]).await;

        assert_eq!(records[0].contact_info.status(), "success");
        assert_eq!(stats.teardown_failures, 1);
    }
}

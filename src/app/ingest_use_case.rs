use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use uuid::Uuid;

use crate::app::ports::{ApiPage, PageSourcePort};
use crate::config::ApiConfig;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::ingestion::{append_page, raw_archive, Checkpoint};
use crate::pipeline::storage::StorageLayout;

/// Pacing and retry behaviour of an ingestion run
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub request_delay: Duration,
    pub retry_delay: Duration,
    /// `None` retries a failing page forever
    pub max_attempts: Option<u32>,
    /// Upper bound on pages fetched by one run
    pub max_pages: Option<u32>,
}

impl IngestOptions {
    pub fn from_config(config: &ApiConfig, max_pages: Option<u32>) -> Self {
        Self {
            request_delay: config.request_delay(),
            retry_delay: config.retry_delay(),
            max_attempts: config.max_attempts,
            max_pages,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub run_id: Uuid,
    pub total_pages: u32,
    pub start_page: u32,
    pub pages_fetched: u32,
    pub records_fetched: usize,
    pub rows_appended: usize,
    pub rows_skipped: usize,
    pub partitions: BTreeSet<String>,
    /// Every page has been ingested and the checkpoint was removed
    pub completed: bool,
}

/// Use case for pulling API pages into the raw and bronze layers
pub struct IngestUseCase {
    source: Box<dyn PageSourcePort>,
    layout: StorageLayout,
    options: IngestOptions,
}

impl IngestUseCase {
    pub fn new(source: Box<dyn PageSourcePort>, layout: StorageLayout, options: IngestOptions) -> Self {
        Self {
            source,
            layout,
            options,
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(self.layout.checkpoint_path())
    }

    /// Page count derived from the first page: total records over page size, rounded up
    pub fn page_count(first: &ApiPage) -> u32 {
        let per_page = first.results.len() as u64;
        if per_page == 0 {
            return 0;
        }
        u32::try_from(first.count.div_ceil(per_page)).unwrap_or(u32::MAX)
    }

    /// Fetch from the checkpoint onwards. Pages are processed strictly in order and the
    /// checkpoint advances after each one.
    pub async fn run(&self) -> Result<IngestSummary> {
        let checkpoint = self.checkpoint();
        let start_page = checkpoint.start_page()?;
        let mut summary = IngestSummary {
            run_id: Uuid::new_v4(),
            start_page,
            ..IngestSummary::default()
        };
        info!(run_id = %summary.run_id, start_page, "Starting ingestion");

        let first = self.fetch_with_retry(Checkpoint::FIRST_PAGE).await?;
        summary.total_pages = Self::page_count(&first);
        if summary.total_pages == 0 || start_page > summary.total_pages {
            info!(
                run_id = %summary.run_id,
                total_pages = summary.total_pages,
                "Nothing left to ingest"
            );
            checkpoint.clear()?;
            summary.completed = true;
            return Ok(summary);
        }

        let last_page = match self.options.max_pages {
            Some(limit) => summary
                .total_pages
                .min(start_page.saturating_add(limit.max(1)) - 1),
            None => summary.total_pages,
        };
        info!(
            run_id = %summary.run_id,
            total_pages = summary.total_pages,
            last_page,
            "Page range resolved"
        );

        let mut first = Some(first);
        for page in start_page..=last_page {
            let data = match first.take().filter(|_| page == Checkpoint::FIRST_PAGE) {
                Some(data) => data,
                None => self.fetch_with_retry(page).await?,
            };
            self.ingest_page(page, &data, &mut summary)?;
            checkpoint.save(page + 1)?;

            if page < last_page && !self.options.request_delay.is_zero() {
                tokio::time::sleep(self.options.request_delay).await;
            }
        }

        if last_page == summary.total_pages {
            checkpoint.clear()?;
            summary.completed = true;
        }
        info!(
            run_id = %summary.run_id,
            pages = summary.pages_fetched,
            records = summary.records_fetched,
            appended = summary.rows_appended,
            skipped = summary.rows_skipped,
            completed = summary.completed,
            "Ingestion finished"
        );
        Ok(summary)
    }

    fn ingest_page(&self, page: u32, data: &ApiPage, summary: &mut IngestSummary) -> Result<()> {
        let started = Instant::now();
        let archive = raw_archive::write_page(&self.layout.raw_dir(), page, &data.raw)?;
        let stats = append_page(&self.layout.bronze_dir(), page, &data.results)?;

        if stats.missing_partition_columns {
            warn!(page, "Page has no ano/mes columns, bronze append skipped");
        }
        if stats.rows_skipped > 0 {
            metrics::ingest::rows_skipped(stats.rows_skipped);
            warn!(page, rows = stats.rows_skipped, "Rows without a partition key skipped");
        }
        metrics::ingest::page_fetched(data.results.len());
        metrics::ingest::page_duration(started.elapsed().as_secs_f64());
        info!(
            page,
            total_pages = summary.total_pages,
            records = data.results.len(),
            partitions = stats.partitions.len(),
            archive = %archive.display(),
            "Page ingested"
        );

        summary.pages_fetched += 1;
        summary.records_fetched += data.results.len();
        summary.rows_appended += stats.rows_appended;
        summary.rows_skipped += stats.rows_skipped;
        summary.partitions.extend(stats.partitions.into_keys());
        Ok(())
    }

    async fn fetch_with_retry(&self, page: u32) -> Result<ApiPage> {
        let mut attempt = 1;
        loop {
            match self.source.fetch_page(page).await {
                Ok(data) => return Ok(data),
                Err(e) => {
                    metrics::ingest::page_failed();
                    if self.options.max_attempts.is_some_and(|max| attempt >= max) {
                        warn!(page, attempt, error = %e, "Giving up on page");
                        return Err(e);
                    }
                    warn!(
                        page,
                        attempt,
                        error = %e,
                        retry_in_ms = self.options.retry_delay.as_millis() as u64,
                        "Page fetch failed, retrying"
                    );
                    tokio::time::sleep(self.options.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(count: u64, results: usize) -> ApiPage {
        let results: Vec<_> = (0..results).map(|i| json!({"id": i})).collect();
        ApiPage::from_json(json!({"count": count, "next": null, "results": results})).unwrap()
    }

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(IngestUseCase::page_count(&page(250, 100)), 3);
        assert_eq!(IngestUseCase::page_count(&page(200, 100)), 2);
        assert_eq!(IngestUseCase::page_count(&page(7, 7)), 1);
    }

    #[test]
    fn test_empty_first_page_has_no_pages() {
        assert_eq!(IngestUseCase::page_count(&page(0, 0)), 0);
        assert_eq!(IngestUseCase::page_count(&page(10, 0)), 0);
    }
}

// src/services/fetcher.rs

//! Paginated ranking fetcher.
//!
//! Walks offset/limit listings (the ranking search and collection contents).
//! The cursor advances by the number of items actually returned, so a short
//! final page ends the walk cleanly.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::{CollectionSubject, Config, Item, QueryConfig};
use crate::services::CatalogApi;
use crate::utils::{RetryPolicy, pause};

/// Service fetching the complete ranked item list.
pub struct RankingFetcher<'a> {
    api: &'a dyn CatalogApi,
    policy: RetryPolicy,
    request_delay: Duration,
}

impl<'a> RankingFetcher<'a> {
    pub fn new(api: &'a dyn CatalogApi, policy: RetryPolicy, request_delay: Duration) -> Self {
        Self {
            api,
            policy,
            request_delay,
        }
    }

    pub fn from_config(api: &'a dyn CatalogApi, config: &Config) -> Self {
        Self::new(
            api,
            RetryPolicy::from_config(&config.retry),
            config.retry.request_delay(),
        )
    }

    /// Fetch every page matching `query`, deduplicated by id.
    ///
    /// Fatal errors abort the walk; nothing partial is returned.
    pub async fn fetch_all(&self, query: &QueryConfig) -> Result<Vec<Item>> {
        let api = self.api;
        let raw = self
            .walk("search", query.page_size, move |offset, limit| async move {
                let page = api.search_subjects(query, offset, limit).await?;
                Ok::<_, AppError>(page.data.map(|data| (data, page.total)))
            })
            .await?;

        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(raw.len());
        for subject in raw {
            if subject.id == 0 {
                log::warn!("Skipping search result without an id");
                continue;
            }
            if seen.insert(subject.id) {
                items.push(Item::from(subject));
            } else {
                log::debug!("Duplicate subject {} dropped", subject.id);
            }
        }

        log::info!("Fetched {} unique items", items.len());
        Ok(items)
    }

    /// Fetch every subject listed in a collection.
    ///
    /// A missing collection yields an empty list.
    pub async fn fetch_collection_subjects(
        &self,
        collection_id: u64,
        subject_type: u32,
        page_size: usize,
    ) -> Result<Vec<CollectionSubject>> {
        let api = self.api;
        let label = format!("collection {collection_id}");
        self.walk(&label, page_size, move |offset, limit| async move {
            let page = api
                .list_collection_subjects(collection_id, subject_type, offset, limit)
                .await?;
            Ok::<_, AppError>(page.and_then(|p| p.data.map(|data| (data, p.total))))
        })
        .await
    }

    /// Drive an offset/limit cursor until the listing is exhausted.
    ///
    /// `fetch` returns the page items and the server-reported total, or
    /// `None` when the server has no more data. The walk stops on an empty
    /// or missing page, or once the cursor reaches the total.
    async fn walk<T, F, Fut>(&self, label: &str, page_size: usize, mut fetch: F) -> Result<Vec<T>>
    where
        F: FnMut(usize, usize) -> Fut,
        Fut: Future<Output = Result<Option<(Vec<T>, usize)>>>,
    {
        let limit = page_size.max(1);
        let mut collected = Vec::new();
        let mut offset = 0;
        let mut page_no = 1;

        loop {
            if page_no > 1 {
                pause(self.request_delay).await;
            }

            let operation = format!("{label} offset={offset}");
            let page = self.policy.run(&operation, || fetch(offset, limit)).await?;

            let Some((data, total)) = page else {
                log::info!("{}: no more data after {} items", label, collected.len());
                break;
            };
            if data.is_empty() {
                log::info!("{}: empty page at offset {}, stopping", label, offset);
                break;
            }

            let returned = data.len();
            collected.extend(data);
            offset += returned;
            log::info!(
                "{}: page {} returned {} items, {} collected (server total {})",
                label,
                page_no,
                returned,
                collected.len(),
                total
            );

            if offset >= total {
                break;
            }
            page_no += 1;
        }

        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stub::{Failure, StubCatalog, subject};

    fn corpus(n: u64) -> Vec<crate::models::RawSubject> {
        (1..=n).map(|id| subject(id, 3.0, 9500 + id as u32, false)).collect()
    }

    fn fetcher(api: &StubCatalog) -> RankingFetcher<'_> {
        RankingFetcher::new(api, RetryPolicy::new(3, Duration::ZERO), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_three_pages_for_120_items() {
        let api = StubCatalog::new(corpus(120));
        let items = fetcher(&api).fetch_all(&QueryConfig::default()).await.unwrap();

        assert_eq!(items.len(), 120);
        assert_eq!(api.search_offsets(), vec![0, 50, 100]);
    }

    #[tokio::test]
    async fn test_stops_on_empty_page_before_total() {
        // Server claims more than it serves
        let api = StubCatalog::new(corpus(60)).with_total(500);
        let items = fetcher(&api).fetch_all(&QueryConfig::default()).await.unwrap();

        assert_eq!(items.len(), 60);
        assert_eq!(api.search_offsets(), vec![0, 50, 60]);
    }

    #[tokio::test]
    async fn test_cursor_follows_returned_count() {
        let api = StubCatalog::new(corpus(25));
        let query = QueryConfig {
            page_size: 10,
            ..QueryConfig::default()
        };
        fetcher(&api).fetch_all(&query).await.unwrap();

        assert_eq!(api.search_offsets(), vec![0, 10, 20]);
    }

    #[tokio::test]
    async fn test_duplicates_are_dropped() {
        let mut subjects = corpus(3);
        subjects.push(subject(2, 1.0, 9999, false));
        let api = StubCatalog::new(subjects);

        let items = fetcher(&api).fetch_all(&QueryConfig::default()).await.unwrap();
        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_transient_page_failure_is_retried() {
        let api = StubCatalog::new(corpus(70));
        api.fail_searches([Failure::Status(502), Failure::RateLimited]);

        let items = fetcher(&api).fetch_all(&QueryConfig::default()).await.unwrap();
        assert_eq!(items.len(), 70);
        assert_eq!(api.search_offsets(), vec![0, 0, 0, 50]);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_fetch() {
        let api = StubCatalog::new(corpus(70));
        api.fail_searches([Failure::Auth]);

        let result = fetcher(&api).fetch_all(&QueryConfig::default()).await;
        assert!(matches!(result, Err(AppError::Auth)));
        assert_eq!(api.search_offsets(), vec![0]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_propagate() {
        let api = StubCatalog::new(corpus(70));
        api.fail_searches([Failure::Status(500); 3]);

        let result = fetcher(&api).fetch_all(&QueryConfig::default()).await;
        assert!(matches!(
            result,
            Err(AppError::ExhaustedRetries { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_collection_walk() {
        use crate::models::{CollectionInfo, CollectionSubject};

        let subjects: Vec<CollectionSubject> = (1..=7)
            .map(|id| CollectionSubject {
                id,
                comment: format!("{id} -"),
                ..CollectionSubject::default()
            })
            .collect();
        let info = CollectionInfo {
            id: 74044,
            ..CollectionInfo::default()
        };
        let api = StubCatalog::default().with_collection(info, subjects);

        let listed = fetcher(&api)
            .fetch_collection_subjects(74044, 2, 3)
            .await
            .unwrap();
        assert_eq!(listed.len(), 7);

        let missing = fetcher(&api).fetch_collection_subjects(1, 2, 3).await.unwrap();
        assert!(missing.is_empty());
    }
}

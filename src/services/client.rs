// src/services/client.rs

//! Remote catalog API.
//!
//! Every method performs exactly one HTTP attempt and maps status codes onto
//! [`AppError`]; retrying is the caller's business (see [`RetryPolicy`]).
//!
//! [`RetryPolicy`]: crate::utils::RetryPolicy

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{
    ApiConfig, CollectionEntry, CollectionInfo, CollectionPage, Credentials, QueryConfig,
    SearchPage,
};
use crate::utils::http::{create_async_client, endpoint};

/// Operations the pipeline needs from the catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// One page of the ranked subject search.
    async fn search_subjects(
        &self,
        query: &QueryConfig,
        offset: usize,
        limit: usize,
    ) -> Result<SearchPage>;

    /// Collection metadata, `None` if it does not exist.
    async fn get_collection(&self, collection_id: u64) -> Result<Option<CollectionInfo>>;

    /// One page of a collection's subjects, `None` if the collection does not exist.
    async fn list_collection_subjects(
        &self,
        collection_id: u64,
        subject_type: u32,
        offset: usize,
        limit: usize,
    ) -> Result<Option<CollectionPage>>;

    /// Create or replace one subject's entry in a collection.
    async fn upsert_collection_subject(
        &self,
        collection_id: u64,
        subject_id: u64,
        entry: &CollectionEntry,
    ) -> Result<()>;

    /// Replace a collection's title and description.
    async fn update_collection_info(
        &self,
        collection_id: u64,
        title: &str,
        description: &str,
    ) -> Result<()>;
}

/// Request body for the subject search endpoint.
pub fn search_body(query: &QueryConfig) -> Value {
    let mut rank = vec![format!(">{}", query.min_rank)];
    if let Some(max_rank) = query.max_rank {
        rank.push(format!("<={max_rank}"));
    }

    json!({
        "keyword": "",
        "sort": "rank",
        "filter": {
            "type": [query.subject_type],
            "rank": rank,
            "nsfw": query.include_restricted,
        }
    })
}

/// reqwest-backed implementation of [`CatalogApi`].
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    /// Build a client; the token is attached to every request.
    pub fn new(config: &ApiConfig, credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config, credentials)?,
            base_url: config.base_url.clone(),
        })
    }

    /// Map a non-success status onto the error taxonomy.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status {
            StatusCode::UNAUTHORIZED => Err(AppError::Auth),
            StatusCode::TOO_MANY_REQUESTS => Err(AppError::RateLimited),
            _ => {
                let body = response.text().await.unwrap_or_default();
                log::debug!("Request failed with {}: {}", status, body);
                Err(AppError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn search_subjects(
        &self,
        query: &QueryConfig,
        offset: usize,
        limit: usize,
    ) -> Result<SearchPage> {
        let mut url = endpoint(&self.base_url, "/v0/search/subjects")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());

        log::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(&search_body(query))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_collection(&self, collection_id: u64) -> Result<Option<CollectionInfo>> {
        let url = endpoint(&self.base_url, &format!("/v0/indices/{collection_id}"))?;

        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }

    async fn list_collection_subjects(
        &self,
        collection_id: u64,
        subject_type: u32,
        offset: usize,
        limit: usize,
    ) -> Result<Option<CollectionPage>> {
        let mut url = endpoint(
            &self.base_url,
            &format!("/v0/indices/{collection_id}/subjects"),
        )?;
        url.query_pairs_mut()
            .append_pair("type", &subject_type.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());

        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }

    async fn upsert_collection_subject(
        &self,
        collection_id: u64,
        subject_id: u64,
        entry: &CollectionEntry,
    ) -> Result<()> {
        let url = endpoint(
            &self.base_url,
            &format!("/v0/indices/{collection_id}/subjects/{subject_id}"),
        )?;

        log::debug!("PUT {} sort={} comment={:?}", url, entry.sort, entry.comment);
        let response = self.client.put(url).json(entry).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_collection_info(
        &self,
        collection_id: u64,
        title: &str,
        description: &str,
    ) -> Result<()> {
        let url = endpoint(&self.base_url, &format!("/v0/indices/{collection_id}"))?;

        log::debug!("PUT {} ({} chars of description)", url, description.len());
        let response = self
            .client
            .put(url)
            .json(&json!({ "title": title, "description": description }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_body_open_window() {
        let body = search_body(&QueryConfig::default());
        assert_eq!(body["sort"], "rank");
        assert_eq!(body["filter"]["type"], json!([2]));
        assert_eq!(body["filter"]["rank"], json!([">9500"]));
        assert_eq!(body["filter"]["nsfw"], true);
    }

    #[test]
    fn test_search_body_bounded_window() {
        let query = QueryConfig {
            max_rank: Some(9800),
            include_restricted: false,
            ..QueryConfig::default()
        };
        let body = search_body(&query);
        assert_eq!(body["filter"]["rank"], json!([">9500", "<=9800"]));
        assert_eq!(body["filter"]["nsfw"], false);
    }
}

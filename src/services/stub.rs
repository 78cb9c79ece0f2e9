// src/services/stub.rs

//! In-memory [`CatalogApi`] used by unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{
    CollectionEntry, CollectionInfo, CollectionPage, CollectionSubject, QueryConfig, Rating,
    RawSubject, SearchPage,
};
use crate::services::CatalogApi;

/// Scripted failure, turned into an [`AppError`] when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Auth,
    RateLimited,
    Status(u16),
}

impl From<Failure> for AppError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Auth => AppError::Auth,
            Failure::RateLimited => AppError::RateLimited,
            Failure::Status(status) => AppError::Status {
                status,
                body: "stub".into(),
            },
        }
    }
}

/// Recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Search { offset: usize, limit: usize },
    GetCollection(u64),
    ListSubjects { collection_id: u64, offset: usize },
    Upsert { collection_id: u64, subject_id: u64 },
    UpdateInfo(u64),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    entries: BTreeMap<(u64, u64), CollectionEntry>,
    infos: HashMap<u64, CollectionInfo>,
    search_failures: VecDeque<Failure>,
    upsert_failures: HashMap<u64, VecDeque<Failure>>,
    always_failing: HashMap<u64, Failure>,
}

/// Stub remote with last-write-wins collection state.
#[derive(Default)]
pub struct StubCatalog {
    corpus: Vec<RawSubject>,
    total_override: Option<usize>,
    collection_subjects: HashMap<u64, Vec<CollectionSubject>>,
    state: Mutex<State>,
}

impl StubCatalog {
    pub fn new(corpus: Vec<RawSubject>) -> Self {
        Self {
            corpus,
            ..Self::default()
        }
    }

    /// Report a different `total` than the corpus size.
    pub fn with_total(mut self, total: usize) -> Self {
        self.total_override = Some(total);
        self
    }

    pub fn with_collection(mut self, info: CollectionInfo, subjects: Vec<CollectionSubject>) -> Self {
        self.collection_subjects.insert(info.id, subjects);
        self.state.lock().unwrap().infos.insert(info.id, info);
        self
    }

    /// Fail the next search calls, in order.
    pub fn fail_searches(&self, failures: impl IntoIterator<Item = Failure>) {
        self.state.lock().unwrap().search_failures.extend(failures);
    }

    /// Fail the next upserts of `subject_id`, in order.
    pub fn fail_upserts(&self, subject_id: u64, failures: impl IntoIterator<Item = Failure>) {
        self.state
            .lock()
            .unwrap()
            .upsert_failures
            .entry(subject_id)
            .or_default()
            .extend(failures);
    }

    /// Fail every upsert of `subject_id`.
    pub fn fail_upserts_always(&self, subject_id: u64, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .always_failing
            .insert(subject_id, failure);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn search_offsets(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Search { offset, .. } => Some(offset),
                _ => None,
            })
            .collect()
    }

    pub fn upserted_ids(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upsert { subject_id, .. } => Some(subject_id),
                _ => None,
            })
            .collect()
    }

    /// Current remote state of a collection.
    pub fn entries(&self, collection_id: u64) -> BTreeMap<u64, CollectionEntry> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|((cid, _), _)| *cid == collection_id)
            .map(|((_, sid), entry)| (*sid, entry.clone()))
            .collect()
    }

    pub fn collection_info(&self, collection_id: u64) -> Option<CollectionInfo> {
        self.state.lock().unwrap().infos.get(&collection_id).cloned()
    }
}

#[async_trait]
impl CatalogApi for StubCatalog {
    async fn search_subjects(
        &self,
        _query: &QueryConfig,
        offset: usize,
        limit: usize,
    ) -> Result<SearchPage> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Search { offset, limit });
        if let Some(failure) = state.search_failures.pop_front() {
            return Err(failure.into());
        }

        let data: Vec<RawSubject> = self.corpus.iter().skip(offset).take(limit).cloned().collect();
        Ok(SearchPage {
            data: Some(data),
            total: self.total_override.unwrap_or(self.corpus.len()),
        })
    }

    async fn get_collection(&self, collection_id: u64) -> Result<Option<CollectionInfo>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetCollection(collection_id));
        Ok(state.infos.get(&collection_id).cloned())
    }

    async fn list_collection_subjects(
        &self,
        collection_id: u64,
        _subject_type: u32,
        offset: usize,
        limit: usize,
    ) -> Result<Option<CollectionPage>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListSubjects {
            collection_id,
            offset,
        });

        Ok(self.collection_subjects.get(&collection_id).map(|all| CollectionPage {
            data: Some(all.iter().skip(offset).take(limit).cloned().collect()),
            total: all.len(),
        }))
    }

    async fn upsert_collection_subject(
        &self,
        collection_id: u64,
        subject_id: u64,
        entry: &CollectionEntry,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Upsert {
            collection_id,
            subject_id,
        });

        if let Some(failure) = state.always_failing.get(&subject_id) {
            return Err((*failure).into());
        }
        if let Some(failure) = state
            .upsert_failures
            .get_mut(&subject_id)
            .and_then(|queue| queue.pop_front())
        {
            return Err(failure.into());
        }

        state
            .entries
            .insert((collection_id, subject_id), entry.clone());
        Ok(())
    }

    async fn update_collection_info(
        &self,
        collection_id: u64,
        title: &str,
        description: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UpdateInfo(collection_id));

        let info = state.infos.entry(collection_id).or_default();
        info.id = collection_id;
        info.title = title.to_string();
        info.desc = description.to_string();
        Ok(())
    }
}

/// Search result fixture.
pub fn subject(id: u64, score: f64, rank: u32, nsfw: bool) -> RawSubject {
    RawSubject {
        id,
        name: format!("Subject {id}"),
        name_cn: String::new(),
        rating: Rating {
            score: Some(score),
            rank: Some(rank),
            total: Some(100),
        },
        nsfw,
        ..RawSubject::default()
    }
}

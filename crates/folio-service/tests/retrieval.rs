use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use folio_cache::{BookCache, BookCacheConfig, InMemoryStore, KeyValueStore};
use folio_callbacks::RecordingCallback;
use folio_core::{
    BookId, CachedBook, Character, ContentSource, EnrichedBook, Enricher, EventSink, FolioError,
    MinimalMetadata, NarrativePointOfView, PipelineEvent, RawMetadata, RawSourceData, Relation,
    RetrievalStage, NOT_FOUND_SENTINEL,
};
use folio_service::BookService;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ScriptedSource {
    results: Mutex<VecDeque<Result<RawSourceData, FolioError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn push(&self, result: Result<RawSourceData, FolioError>) -> &Self {
        self.results.lock().unwrap().push_back(result);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    async fn fetch(&self, _id: &BookId) -> Result<RawSourceData, FolioError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FolioError::Source("ScriptedSource exhausted".into())))
    }
}

#[derive(Default)]
struct ScriptedEnricher {
    metadata: Mutex<VecDeque<Result<MinimalMetadata, FolioError>>>,
    books: Mutex<VecDeque<Result<EnrichedBook, FolioError>>>,
    metadata_calls: AtomicUsize,
    analysis_calls: AtomicUsize,
    seen_metadata: Mutex<Vec<MinimalMetadata>>,
}

impl ScriptedEnricher {
    fn push_metadata(&self, result: Result<MinimalMetadata, FolioError>) -> &Self {
        self.metadata.lock().unwrap().push_back(result);
        self
    }

    fn push_book(&self, result: Result<EnrichedBook, FolioError>) -> &Self {
        self.books.lock().unwrap().push_back(result);
        self
    }

    fn calls(&self) -> (usize, usize) {
        (
            self.metadata_calls.load(Ordering::SeqCst),
            self.analysis_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl Enricher for ScriptedEnricher {
    async fn extract_minimal_metadata(
        &self,
        _raw: &RawMetadata,
    ) -> Result<MinimalMetadata, FolioError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FolioError::Parsing("no metadata scripted".into())))
    }

    async fn analyze(
        &self,
        metadata: &MinimalMetadata,
        _content: &str,
    ) -> Result<EnrichedBook, FolioError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_metadata.lock().unwrap().push(metadata.clone());
        self.books
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FolioError::Parsing("no book scripted".into())))
    }
}

/// Reads succeed (always empty), writes fail.
struct ReadOnlyStore;

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, FolioError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), FolioError> {
        Err(FolioError::Cache("READONLY".into()))
    }
}

struct DownStore;

#[async_trait]
impl KeyValueStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, FolioError> {
        Err(FolioError::Cache("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), FolioError> {
        Err(FolioError::Cache("connection refused".into()))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn raw() -> RawSourceData {
    RawSourceData {
        content: "To Sherlock Holmes she is always *the* woman.".into(),
        metadata: RawMetadata::new("<title>The Adventures of Sherlock Holmes</title>"),
    }
}

fn metadata() -> MinimalMetadata {
    MinimalMetadata {
        title: "The Adventures of Sherlock Holmes".into(),
        authors: vec!["Arthur Conan Doyle".into()],
        cover_url: "https://www.gutenberg.org/cache/epub/1661/pg1661.cover.medium.jpg".into(),
    }
}

fn book() -> EnrichedBook {
    EnrichedBook {
        title: "The Adventures of Sherlock Holmes".into(),
        authors: vec!["Arthur Conan Doyle".into()],
        cover_url: "https://www.gutenberg.org/cache/epub/1661/pg1661.cover.medium.jpg".into(),
        year: 1892,
        summary: "Twelve cases of the consulting detective.".into(),
        genres: vec!["Detective fiction".into()],
        main_characters: vec![Character {
            id: "holmes".into(),
            label: "Sherlock Holmes".into(),
        }],
        central_theme: "Reason".into(),
        central_conflict: "Holmes against crime".into(),
        location: "London".into(),
        historical_context: "Victorian era".into(),
        setting_environment: "Foggy streets".into(),
        writing_style: "Episodic".into(),
        narrative_point_of_view: NarrativePointOfView::FirstPerson,
        moral_of_story: "Observation reveals truth".into(),
        characters: vec![
            Character {
                id: "holmes".into(),
                label: "Sherlock Holmes".into(),
            },
            Character {
                id: "watson".into(),
                label: "John Watson".into(),
            },
        ],
        relations: vec![Relation {
            source: "watson".into(),
            target: "holmes".into(),
        }],
        quotes: vec![],
    }
}

fn absent(id: &str) -> FolioError {
    FolioError::SourceStatus {
        status: 404,
        url: format!("https://www.gutenberg.org/files/{id}/{id}-0.txt"),
    }
}

struct Harness {
    service: BookService,
    store: Arc<dyn KeyValueStore>,
    source: Arc<ScriptedSource>,
    enricher: Arc<ScriptedEnricher>,
    recorder: RecordingCallback,
}

fn harness_with_store(store: Arc<dyn KeyValueStore>) -> Harness {
    let recorder = RecordingCallback::new();
    let sink = EventSink::new("BookService", Arc::new(recorder.clone()));
    let source = Arc::new(ScriptedSource::default());
    let enricher = Arc::new(ScriptedEnricher::default());
    let cache = BookCache::new(
        store.clone(),
        BookCacheConfig::default(),
        sink.scoped("BookCache"),
    );
    let service = BookService::new(cache, source.clone(), enricher.clone(), sink);
    Harness {
        service,
        store,
        source,
        enricher,
        recorder,
    }
}

fn harness() -> Harness {
    harness_with_store(Arc::new(InMemoryStore::new()))
}

fn script_success(h: &Harness) {
    h.source.push(Ok(raw()));
    h.enricher.push_metadata(Ok(metadata())).push_book(Ok(book()));
}

async fn cached(h: &Harness, key: &str) -> Option<String> {
    h.store.get(key).await.unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fresh_lookup_enriches_and_caches() {
    let h = harness();
    script_success(&h);

    let result = h.service.get_book_by_id("1661").await.unwrap();

    assert!(!result.title.is_empty());
    assert_eq!(result, book());
    let stored = cached(&h, "book:1661").await.expect("positive entry");
    assert_eq!(
        CachedBook::decode(&stored).unwrap(),
        CachedBook::Present(book())
    );
    assert_eq!(h.enricher.seen_metadata.lock().unwrap()[0], metadata());
}

#[tokio::test]
async fn negative_entry_short_circuits() {
    let h = harness();
    h.store
        .set("book:42", NOT_FOUND_SENTINEL, 86_400)
        .await
        .unwrap();

    let err = h.service.get_book_by_id("42").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(h.source.calls(), 0);
    assert_eq!(h.enricher.calls(), (0, 0));
}

#[tokio::test]
async fn absent_source_caches_sentinel() {
    let h = harness();
    h.source.push(Err(absent("999999")));

    let err = h.service.get_book_by_id("999999").await.unwrap_err();

    assert!(matches!(err, FolioError::NotFound(ref id) if id == "999999"));
    assert_eq!(
        cached(&h, "book:999999").await.as_deref(),
        Some(NOT_FOUND_SENTINEL)
    );
    assert_eq!(h.enricher.calls(), (0, 0));
}

#[tokio::test]
async fn gone_status_is_also_absence() {
    let h = harness();
    h.source.push(Err(FolioError::SourceStatus {
        status: 410,
        url: "https://www.gutenberg.org/files/3/3-0.txt".into(),
    }));

    let err = h.service.get_book_by_id("3").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(
        cached(&h, "book:3").await.as_deref(),
        Some(NOT_FOUND_SENTINEL)
    );
}

#[tokio::test]
async fn timeout_is_internal_and_not_cached() {
    let h = harness();
    h.source
        .push(Err(FolioError::Timeout("request timed out".into())));

    let err = h.service.get_book_by_id("77").await.unwrap_err();

    assert!(matches!(err, FolioError::Timeout(_)));
    assert!(cached(&h, "book:77").await.is_none());
}

#[tokio::test]
async fn server_error_is_internal_and_not_cached() {
    let h = harness();
    h.source.push(Err(FolioError::SourceStatus {
        status: 503,
        url: "https://www.gutenberg.org/files/8/8-0.txt".into(),
    }));

    let err = h.service.get_book_by_id("8").await.unwrap_err();

    assert!(matches!(err, FolioError::SourceStatus { status: 503, .. }));
    assert!(cached(&h, "book:8").await.is_none());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_lookup_is_served_from_cache() {
    let h = harness();
    script_success(&h);

    let first = h.service.get_book_by_id("1661").await.unwrap();
    let second = h.service.get_book_by_id("1661").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.enricher.calls(), (1, 1));
}

#[tokio::test]
async fn not_found_is_remembered_within_ttl() {
    let h = harness();
    h.source.push(Err(absent("5")));

    assert!(h.service.get_book_by_id("5").await.unwrap_err().is_not_found());
    assert!(h.service.get_book_by_id("5").await.unwrap_err().is_not_found());

    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.enricher.calls(), (0, 0));
}

#[tokio::test]
async fn transient_failure_is_retried_on_next_request() {
    let h = harness();
    h.source.push(Err(FolioError::Source("connection reset".into())));
    script_success(&h);

    assert!(h.service.get_book_by_id("1661").await.is_err());
    let book = h.service.get_book_by_id("1661").await.unwrap();

    assert_eq!(book.title, "The Adventures of Sherlock Holmes");
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn metadata_parse_failure_writes_nothing() {
    let h = harness();
    h.source.push(Ok(raw()));
    h.enricher
        .push_metadata(Err(FolioError::Parsing("no structured result".into())));

    let err = h.service.get_book_by_id("1661").await.unwrap_err();

    assert!(matches!(err, FolioError::Parsing(_)));
    assert!(!err.is_not_found());
    assert!(cached(&h, "book:1661").await.is_none());
    assert_eq!(h.enricher.calls(), (1, 0));
}

#[tokio::test]
async fn analysis_parse_failure_writes_nothing() {
    let h = harness();
    h.source.push(Ok(raw()));
    h.enricher
        .push_metadata(Ok(metadata()))
        .push_book(Err(FolioError::Parsing("no structured result".into())));

    let err = h.service.get_book_by_id("1661").await.unwrap_err();

    assert!(matches!(err, FolioError::Parsing(_)));
    assert!(cached(&h, "book:1661").await.is_none());
}

#[tokio::test]
async fn cache_outage_propagates_without_fetching() {
    let h = harness_with_store(Arc::new(DownStore));
    script_success(&h);

    let err = h.service.get_book_by_id("1661").await.unwrap_err();

    assert!(matches!(err, FolioError::Cache(_)));
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test]
async fn failed_negative_write_propagates() {
    let h = harness_with_store(Arc::new(ReadOnlyStore));
    h.source.push(Err(absent("9")));

    let err = h.service.get_book_by_id("9").await.unwrap_err();

    assert!(matches!(err, FolioError::Cache(_)));
}

#[tokio::test]
async fn empty_identifier_is_rejected() {
    let h = harness();

    let err = h.service.get_book_by_id("").await.unwrap_err();

    assert!(matches!(err, FolioError::Validation(_)));
    assert_eq!(h.source.calls(), 0);
    assert!(h.recorder.events().await.is_empty());
}

#[tokio::test]
async fn dangling_relations_pass_through() {
    let h = harness();
    let mut odd = book();
    odd.relations.push(Relation {
        source: "holmes".into(),
        target: "moriarty".into(),
    });
    h.source.push(Ok(raw()));
    h.enricher.push_metadata(Ok(metadata())).push_book(Ok(odd.clone()));

    let result = h.service.get_book_by_id("1661").await.unwrap();

    assert_eq!(result.relations, odd.relations);
    let events = h.recorder.events_from("BookService").await;
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::DanglingRelations { count: 1, .. })));
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lookup_events_report_outcome() {
    let h = harness();
    script_success(&h);

    h.service.get_book_by_id("1661").await.unwrap();
    h.service.get_book_by_id("1661").await.unwrap();

    let finished: Vec<bool> = h
        .recorder
        .events_from("BookService")
        .await
        .into_iter()
        .filter_map(|e| match e {
            PipelineEvent::LookupFinished { from_cache, .. } => Some(from_cache),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![false, true]);

    let cache_events = h.recorder.events_from("BookCache").await;
    assert!(matches!(cache_events[0], PipelineEvent::CacheMiss { .. }));
    assert!(matches!(
        cache_events[1],
        PipelineEvent::CacheWrite {
            negative: false,
            ..
        }
    ));
    assert!(matches!(cache_events[2], PipelineEvent::CacheHit { .. }));
}

#[tokio::test]
async fn failures_are_tagged_with_stage() {
    let h = harness();
    h.source.push(Err(absent("1")));
    h.service.get_book_by_id("1").await.unwrap_err();
    h.service.get_book_by_id("1").await.unwrap_err();

    let stages: Vec<(RetrievalStage, bool)> = h
        .recorder
        .events_from("BookService")
        .await
        .into_iter()
        .filter_map(|e| match e {
            PipelineEvent::LookupFailed {
                stage, not_found, ..
            } => Some((stage, not_found)),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            (RetrievalStage::Fetching, true),
            (RetrievalStage::CacheCheck, true)
        ]
    );
}

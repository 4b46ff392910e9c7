use std::sync::Arc;

use folio_cache::BookCache;
use folio_core::{
    BookId, CachedBook, ContentSource, EnrichedBook, Enricher, EventSink, FolioError,
    PipelineEvent, RetrievalStage,
};
use uuid::Uuid;

use crate::classify::is_content_absent;

type StageError = (RetrievalStage, FolioError);

struct Retrieved {
    book: EnrichedBook,
    from_cache: bool,
}

/// Retrieval orchestrator: cache lookup, source fetch, two-stage enrichment,
/// negative caching and failure classification.
///
/// Steps within one request run strictly in order. Concurrent requests for
/// the same uncached book are not de-duplicated; each enriches independently
/// and the last cache write wins.
pub struct BookService {
    cache: BookCache,
    source: Arc<dyn ContentSource>,
    enricher: Arc<dyn Enricher>,
    events: EventSink,
}

impl BookService {
    pub fn new(
        cache: BookCache,
        source: Arc<dyn ContentSource>,
        enricher: Arc<dyn Enricher>,
        events: EventSink,
    ) -> Self {
        Self {
            cache,
            source,
            enricher,
            events,
        }
    }

    /// Return the enriched record for `id`.
    ///
    /// Fails with [`FolioError::NotFound`] when the book is confirmed absent,
    /// either from a cached negative entry or because the source reported it
    /// missing (in which case the absence is cached). Every other failure is
    /// returned as-is and leaves the cache untouched.
    pub async fn get_book_by_id(&self, id: &str) -> Result<EnrichedBook, FolioError> {
        let id = BookId::new(id)?;
        let run_id = Uuid::new_v4().to_string();
        self.events
            .emit(PipelineEvent::LookupStarted {
                run_id: run_id.clone(),
                book_id: id.to_string(),
            })
            .await;

        match self.retrieve(&id).await {
            Ok(Retrieved { book, from_cache }) => {
                self.events
                    .emit(PipelineEvent::LookupFinished {
                        run_id,
                        book_id: id.to_string(),
                        from_cache,
                    })
                    .await;
                Ok(book)
            }
            Err((stage, error)) => {
                self.events
                    .emit(PipelineEvent::LookupFailed {
                        run_id,
                        book_id: id.to_string(),
                        stage,
                        not_found: error.is_not_found(),
                        error: error.to_string(),
                    })
                    .await;
                Err(error)
            }
        }
    }

    async fn retrieve(&self, id: &BookId) -> Result<Retrieved, StageError> {
        match self.cache.get(id).await.map_err(at(RetrievalStage::CacheCheck))? {
            Some(CachedBook::Absent) => {
                return Err((RetrievalStage::CacheCheck, not_found(id)));
            }
            Some(CachedBook::Present(book)) => {
                return Ok(Retrieved {
                    book,
                    from_cache: true,
                });
            }
            None => {}
        }

        let raw = match self.source.fetch(id).await {
            Ok(raw) => raw,
            Err(e) if is_content_absent(&e) => {
                self.cache
                    .put_not_found(id)
                    .await
                    .map_err(at(RetrievalStage::Persisting))?;
                return Err((RetrievalStage::Fetching, not_found(id)));
            }
            Err(e) => return Err((RetrievalStage::Fetching, e)),
        };

        let metadata = self
            .enricher
            .extract_minimal_metadata(&raw.metadata)
            .await
            .map_err(at(RetrievalStage::Enriching))?;
        let book = self
            .enricher
            .analyze(&metadata, &raw.content)
            .await
            .map_err(at(RetrievalStage::Enriching))?;

        let dangling = book.dangling_relations().len();
        if dangling > 0 {
            self.events
                .emit(PipelineEvent::DanglingRelations {
                    book_id: id.to_string(),
                    count: dangling,
                })
                .await;
        }

        self.cache
            .put_book(id, &book)
            .await
            .map_err(at(RetrievalStage::Persisting))?;

        Ok(Retrieved {
            book,
            from_cache: false,
        })
    }
}

fn at(stage: RetrievalStage) -> impl FnOnce(FolioError) -> StageError {
    move |e| (stage, e)
}

fn not_found(id: &BookId) -> FolioError {
    FolioError::NotFound(id.to_string())
}

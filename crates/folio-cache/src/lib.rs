mod book_cache;
mod in_memory;

pub use book_cache::{BookCache, BookCacheConfig};
pub use in_memory::InMemoryStore;

// Re-export the backend trait so callers need only this crate.
pub use folio_core::KeyValueStore;

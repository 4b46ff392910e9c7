//! Cache-first book retrieval.
//!
//! [`BookService`] sequences one request as:
//!
//! ```text
//! cache check ─┬─ hit (book)      → return it
//!              ├─ hit (absent)    → NotFound, nothing fetched
//!              └─ miss → fetch ─┬─ absent    → store NOT_FOUND → NotFound
//!                               ├─ other err → propagate, nothing stored
//!                               └─ ok → metadata → analysis → store → return
//! ```
//!
//! Only this crate decides which failures mean "the book does not exist";
//! the gateways report raw errors.

mod classify;
mod service;

pub use classify::is_content_absent;
pub use service::BookService;

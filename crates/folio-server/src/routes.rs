use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use folio::core::{EnrichedBook, FolioError};
use folio::service::BookService;
use serde::Serialize;

#[derive(Clone)]
pub struct AppState {
    pub books: Arc<BookService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/books/{id}", get(get_book))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EnrichedBook>, ApiError> {
    let book = state.books.get_book_by_id(&id).await?;
    Ok(Json(book))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps pipeline failures onto HTTP statuses. Internal details never reach the client.
#[derive(Debug)]
pub struct ApiError(FolioError);

impl From<FolioError> for ApiError {
    fn from(error: FolioError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            FolioError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Book with ID {id} was not found"),
            ),
            FolioError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

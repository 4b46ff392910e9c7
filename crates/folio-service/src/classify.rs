use folio_core::FolioError;

/// Whether a content-source failure confirms that the book does not exist.
///
/// Only an explicit "missing" status counts. Timeouts, network errors and
/// server errors are transient and must not be memoized as absence.
pub fn is_content_absent(error: &FolioError) -> bool {
    matches!(
        error,
        FolioError::SourceStatus {
            status: 404 | 410,
            ..
        }
    )
}

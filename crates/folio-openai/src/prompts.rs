use folio_core::{MinimalMetadata, RawMetadata};

/// First character of the book text sent for analysis.
pub const CONTENT_WINDOW_START: usize = 1000;
/// End (exclusive) of the book text sent for analysis.
pub const CONTENT_WINDOW_END: usize = 5000;
/// Characters of raw metadata sent for metadata extraction.
pub const METADATA_WINDOW: usize = 5000;

pub(crate) const METADATA_SYSTEM: &str = "You extract basic book metadata from the HTML of a \
catalog page. Report only the title, the authors and a cover image URL, looking in <title>, \
<meta> tags, headers and structured data.";

pub(crate) const ANALYSIS_SYSTEM: &str = "You are a literary analyst producing structured \
information about books. From the supplied text, extract a summary, the characters and the \
relationships and interactions between them, and notable quotes.";

pub(crate) fn metadata_request(raw: &RawMetadata) -> String {
    format!(
        "Extract the book title, authors and cover URL from this HTML content. HTML content: {}",
        content_window(raw.as_str(), 0, METADATA_WINDOW)
    )
}

pub(crate) fn analysis_request(metadata: &MinimalMetadata, content: &str) -> String {
    let metadata_json = serde_json::to_string(metadata).unwrap_or_default();
    format!(
        "Analyze this book content and provide detailed information about it, filling every \
         requested field. Book metadata: {metadata_json}. Book content: {}",
        content_window(content, CONTENT_WINDOW_START, CONTENT_WINDOW_END)
    )
}

/// Characters `[start, end)` of `text`, clamped to its length.
pub fn content_window(text: &str, start: usize, end: usize) -> &str {
    if end <= start {
        return "";
    }
    let mut indices = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));
    let Some(from) = indices.nth(start) else {
        return "";
    };
    let to = indices.nth(end - start - 1).unwrap_or(text.len());
    &text[from..to]
}

pub mod backend;
pub use backend::{
    FakeBackend, HttpBackend, ProviderBackend, ProviderRequest, ProviderResponse, TextResponse,
};

mod structured_output;
pub use structured_output::{extract_json, json_schema_format, parse_structured};

pub mod add_openapi;
pub mod list_sources;
pub mod sync;

mod catalog;
mod category;

pub use catalog::{ContentCatalog, ContentInstance};
pub use category::{ContentCategory, ContentPayload, UsageMetric};

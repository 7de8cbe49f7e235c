//! Wire models shared by the HTTP surface.

pub mod query;
pub mod template;

pub use query::{QueryMetadata, QueryRequest, QueryResult, Row, TemplateQueryRequest};
pub use template::{
    MessageResponse, Statistics, TemplateDefinition, TemplateList, TemplateSummary,
};

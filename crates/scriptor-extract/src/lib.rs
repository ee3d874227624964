//! Structured metadata extraction from LaTeX papers: title, abstract, year,
//! citations, equations, first table and a sample of the body text.

pub mod batch;
pub mod error;
pub mod metadata;

pub use batch::extract_dir;
pub use error::ExtractError;
pub use metadata::{PaperMetadata, TextSample, extract_metadata};

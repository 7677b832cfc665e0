//! Complaint corpus: reading, cleaning, filtering and sampling.

pub mod category;
pub mod filter;
pub mod normalizer;
pub mod record;
pub mod sampling;

pub use category::{ProductCategory, PRODUCT_MAP};
pub use filter::{filter_records, preprocess, FilterReport};
pub use normalizer::{clean_optional, clean_text, word_count};
pub use record::{read_processed, read_raw_complaints, write_processed, ComplaintRecord, ProcessedComplaint};
pub use sampling::stratified_sample;

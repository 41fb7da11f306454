//! Text normalisation shared by every source: canonical links, ISO dates and keyword matching.

pub mod date;
pub mod keywords;
pub mod link;

pub use date::normalize_date;
pub use keywords::match_keywords;
pub use link::canonicalize_link;

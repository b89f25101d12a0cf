//! Phrase search: running queries and turning hits into line fragments.

pub mod executor;
pub mod fragment;
pub mod highlight;
pub mod history;

pub use executor::{search, search_reader, DocumentMatch};
pub use fragment::{locate, Fragment, Fragments};
pub use highlight::matched_tokens;
pub use history::SearchHistory;

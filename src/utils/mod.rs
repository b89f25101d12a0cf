//! Utility functions shared across the crate.
//!
//! ## Modules
//!
//! - [`app_data`] - Settings, project binding and index directory layout
//! - [`encoding`] - Variable-length integer encoding (varint)
//! - [`filter`] - Hidden/binary detection and the [`FilterPolicy`]
//! - [`progress`] - Status spinner that compiles away without the `progress` feature
//! - [`tokenizer`] - Word tokens with positions and byte offsets
//!
//! ```no_run
//! use phrasedex::utils::{analyze, is_binary};
//!
//! let tokens = analyze("hello world");
//! assert_eq!(tokens[1].start, 6);
//! assert!(!is_binary(b"plain text"));
//! ```

pub mod app_data;
pub mod encoding;
pub mod filter;
pub mod progress;
pub mod tokenizer;

pub use app_data::*;
pub use encoding::*;
pub use filter::*;
pub use tokenizer::*;

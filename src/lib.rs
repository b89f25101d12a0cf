//! # phrasedex - phrase search over project folders
//!
//! phrasedex keeps a full-text index in step with the files of a project and
//! answers multi-word phrase queries with the exact lines that contain every
//! word of the phrase.
//!
//! ## Architecture
//!
//! - [`index`] - On-disk store, the file walker and the incremental synchronizer
//! - [`query`] - Phrase search, hit highlighting and line fragments
//! - [`command`] - Background operations with periodic status reporting
//! - [`output`] - The presenter interface and a terminal implementation
//! - [`utils`] - Settings, path filtering, tokenizer and encoding helpers
//! - [`error`] - Error type shared by all of the above
//!
//! ## Quick Start
//!
//! ```no_run
//! use phrasedex::index::sync_index;
//! use phrasedex::output::TerminalPresenter;
//! use phrasedex::query::search;
//! use phrasedex::utils::{Project, Settings};
//! use std::path::Path;
//!
//! let project = Project::discover(Path::new("."))?;
//! let settings = Settings::load(Some(&project.root))?;
//! sync_index(&project, &settings, &TerminalPresenter::new(true, true))?;
//!
//! for document in search(&project, "hello world")? {
//!     for fragment in document.fragments() {
//!         println!("{}:{}: {}", document.path.display(), fragment.line_number(), fragment.as_str());
//!     }
//! }
//! # Ok::<(), phrasedex::error::Error>(())
//! ```
//!
//! ## Incremental updates
//!
//! A sync compares the stored modification times with the filesystem and
//! only deletes and re-adds what changed. Fragments are rebuilt from the
//! offsets kept in the index, so results never need a second tokenizer pass.

pub mod command;
pub mod error;
pub mod index;
pub mod output;
pub mod query;
pub mod utils;

pub use error::{Error, Result};

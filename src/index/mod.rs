//! The index: on-disk store, writer and reader, plus the file walker and the
//! incremental synchronizer that keep it in step with the filesystem.

pub mod build;
pub mod reader;
pub mod stats;
pub mod store;
pub mod sync;
pub mod types;
pub mod walk;
pub mod writer;

pub use build::{reset_index, sync_index, update_single, FileUpdate};
pub use reader::IndexReader;
pub use store::IndexService;
pub use sync::{apply_plan, plan_reset, plan_sync, ApplyReport, SyncPlan};
pub use types::*;
pub use walk::{project_files, ProjectFiles};
pub use writer::IndexWriter;

//! Incremental synchronization of an index with the filesystem.
//!
//! A run is split into a pure planning step, which compares what the index
//! stores with what is on disk, and an apply step that performs the deletes
//! and then the adds through an [`IndexService`].

use crate::error::Result;
use crate::index::store::IndexService;
use crate::index::types::{mtime_of, IndexedDocument};
use crate::index::walk::project_files;
use crate::utils::FilterPolicy;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Paths to delete and paths to (re-)add
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub stale: BTreeSet<PathBuf>,
    pub fresh: BTreeSet<PathBuf>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.stale.is_empty() && self.fresh.is_empty()
    }

    /// Number of index operations the plan performs
    pub fn len(&self) -> usize {
        self.stale.len() + self.fresh.len()
    }
}

/// What an apply step did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub deleted: usize,
    pub added: usize,
    /// Fresh paths that disappeared or became unreadable before they were read
    pub vanished: usize,
}

/// Compare the stored documents with the current state of `folders`
pub fn plan_sync<'a, P, I>(folders: &[P], policy: &FilterPolicy, stored: I) -> SyncPlan
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a IndexedDocument>,
{
    let mut plan = SyncPlan::default();
    let mut indexed = BTreeSet::new();

    for doc in stored {
        indexed.insert(doc.path.clone());

        if !policy.admits(folders, &doc.path) {
            log::debug!("stale: {}", doc.path.display());
            plan.stale.insert(doc.path.clone());
            continue;
        }

        let mtime = match fs::metadata(&doc.path) {
            Ok(metadata) => mtime_of(&metadata),
            Err(_) => {
                plan.stale.insert(doc.path.clone());
                continue;
            }
        };

        if mtime > doc.mtime {
            log::debug!("modified: {}", doc.path.display());
            plan.stale.insert(doc.path.clone());
            plan.fresh.insert(doc.path.clone());
        }
    }

    for path in project_files(folders, policy) {
        if !indexed.contains(&path) {
            plan.fresh.insert(path);
        }
    }

    plan
}

/// Plan for a rebuild from scratch: add every file, delete nothing
pub fn plan_reset<P: AsRef<Path>>(folders: &[P], policy: &FilterPolicy) -> SyncPlan {
    SyncPlan {
        stale: BTreeSet::new(),
        fresh: project_files(folders, policy).collect(),
    }
}

/// Delete every stale path, then add every fresh one.
///
/// `on_step` is called once per processed path. Changes already flushed by
/// the service stay committed if a later step fails.
pub fn apply_plan<S, F>(plan: &SyncPlan, service: &mut S, mut on_step: F) -> Result<ApplyReport>
where
    S: IndexService,
    F: FnMut(&Path),
{
    let mut report = ApplyReport::default();

    for path in &plan.stale {
        if service.delete_by_key(path)? {
            report.deleted += 1;
        }
        on_step(path);
    }

    for path in &plan.fresh {
        match read_document(path) {
            Ok((content, mtime)) => {
                service.add_document(path.clone(), content, mtime)?;
                report.added += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("{} vanished before it could be indexed", path.display());
                report.vanished += 1;
            }
            Err(e) => {
                log::warn!("could not read {}: {}", path.display(), e);
                report.vanished += 1;
            }
        }
        on_step(path);
    }

    Ok(report)
}

/// Read a file's text and mtime, the mtime first so a torn capture is
/// picked up again by the next run
pub fn read_document(path: &Path) -> io::Result<(String, u64)> {
    let mtime = mtime_of(&fs::metadata(path)?);
    let bytes = fs::read(path)?;
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };
    Ok((content, mtime))
}

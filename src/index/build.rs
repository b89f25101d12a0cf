use crate::error::Result;
use crate::index::store::{index_exists, IndexService};
use crate::index::sync::{apply_plan, plan_reset, plan_sync, read_document, ApplyReport, SyncPlan};
use crate::index::types::{mtime_of, Schema};
use crate::index::writer::IndexWriter;
use crate::output::Presenter;
use crate::utils::{Project, Settings};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Emit a status update every this many processed paths
const STATUS_EVERY: usize = 256;

/// Outcome of [`update_single`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileUpdate {
    /// Stored mtime matches the file, nothing written
    Unchanged,
    /// The file was (re-)indexed
    Indexed,
    /// The file is gone or excluded and its document was deleted
    Removed,
    /// The file is excluded and was not indexed to begin with
    Ignored,
}

fn status(presenter: &dyn Presenter, text: &str) {
    if let Err(e) = presenter.show_progress(text) {
        log::debug!("status update failed: {}", e);
    }
}

fn schema_for(settings: &Settings) -> Schema {
    Schema {
        store_content: settings.store_content,
    }
}

/// Rebuild the project's index from scratch
pub fn reset_index(
    project: &Project,
    settings: &Settings,
    presenter: &dyn Presenter,
) -> Result<ApplyReport> {
    let start = Instant::now();
    let index_path = project.index_dir()?;
    let policy = settings.filter_policy()?;

    let mut writer = IndexWriter::create(&index_path, &project.root, schema_for(settings))?
        .with_ram_limit(settings.ram_limit_bytes());

    status(presenter, &format!("Discovering files in {}...", project.name));
    let plan = plan_reset(&project.folders, &policy);

    let report = run_plan(&plan, &mut writer, presenter)?;
    log::info!(
        "indexed {}: {} files in {:.2?} ({} vanished)",
        project.root.display(),
        report.added,
        start.elapsed(),
        report.vanished
    );
    Ok(report)
}

/// Bring the project's index up to date, building it if none exists yet
pub fn sync_index(
    project: &Project,
    settings: &Settings,
    presenter: &dyn Presenter,
) -> Result<ApplyReport> {
    let index_path = project.index_dir()?;
    if !index_exists(&index_path) {
        return reset_index(project, settings, presenter);
    }

    let start = Instant::now();
    let writer = IndexWriter::open(&index_path)?;
    if writer.schema() != schema_for(settings) {
        log::info!("stored fields changed, rebuilding {}", project.root.display());
        drop(writer);
        return reset_index(project, settings, presenter);
    }
    let mut writer = writer.with_ram_limit(settings.ram_limit_bytes());
    let policy = settings.filter_policy()?;

    status(presenter, &format!("Scanning {}...", project.name));
    let plan = plan_sync(&project.folders, &policy, writer.stored_documents());

    let report = run_plan(&plan, &mut writer, presenter)?;
    log::info!(
        "synced {}: {} deleted, {} added, {} vanished in {:.2?}",
        project.root.display(),
        report.deleted,
        report.added,
        report.vanished,
        start.elapsed()
    );
    Ok(report)
}

fn run_plan(
    plan: &SyncPlan,
    writer: &mut IndexWriter,
    presenter: &dyn Presenter,
) -> Result<ApplyReport> {
    let total = plan.len();
    let mut done = 0usize;
    status(presenter, &format!("Indexing: 0/{}", total));

    let report = apply_plan(plan, writer, |_| {
        done += 1;
        if done % STATUS_EVERY == 0 {
            status(presenter, &format!("Indexing: {}/{}", done, total));
        }
    })?;

    status(presenter, "Committing...");
    writer.commit()?;
    Ok(report)
}

/// Re-index one file after it was saved, moved or deleted
pub fn update_single(
    project: &Project,
    path: &Path,
    settings: &Settings,
    presenter: &dyn Presenter,
) -> Result<FileUpdate> {
    let path = resolve(project, path);
    let mut writer =
        IndexWriter::open(&project.index_dir()?)?.with_ram_limit(settings.ram_limit_bytes());
    let policy = settings.filter_policy()?;

    status(presenter, &format!("Updating {}...", path.display()));

    let outcome = if !policy.admits(&project.folders, &path) {
        remove(&mut writer, &path)?
    } else {
        let stored = writer.get(&path).map(|doc| doc.mtime);
        let current = fs::metadata(&path).map(|m| mtime_of(&m)).ok();

        if stored.is_some() && stored == current {
            FileUpdate::Unchanged
        } else {
            match read_document(&path) {
                Ok((content, mtime)) => {
                    writer.delete_by_key(&path)?;
                    writer.add_document(path.clone(), content, mtime)?;
                    writer.commit()?;
                    FileUpdate::Indexed
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => remove(&mut writer, &path)?,
                Err(e) => return Err(e.into()),
            }
        }
    };

    log::debug!("{}: {:?}", path.display(), outcome);
    Ok(outcome)
}

fn remove(writer: &mut IndexWriter, path: &Path) -> Result<FileUpdate> {
    if writer.delete_by_key(path)? {
        writer.commit()?;
        Ok(FileUpdate::Removed)
    } else {
        Ok(FileUpdate::Ignored)
    }
}

/// Absolute, canonical form of `path` when it still exists
fn resolve(project: &Project, path: &Path) -> PathBuf {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| project.root.join(path))
    };

    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    // Deleted file: canonicalize the parent so the key still matches
    match (path.parent().and_then(|p| p.canonicalize().ok()), path.file_name()) {
        (Some(parent), Some(name)) => parent.join(name),
        _ => path,
    }
}

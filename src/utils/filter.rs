//! Path classification shared by the file walker and the synchronizer.
//!
//! A [`FilterPolicy`] is a plain value: it is built once per operation from
//! the loaded settings and never mutated while a walk or sync is running.

use crate::error::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of leading bytes sampled when classifying a file as binary
pub const BINARY_SAMPLE_SIZE: usize = 1024;

/// Which directories and files take part in indexing
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    skip_directories: BTreeSet<String>,
    skip_files: BTreeSet<String>,
    skip_extensions: BTreeSet<String>,
    include_hidden: bool,
    /// `skip_files` compiled as globs, so `*.min.js` works next to exact names
    file_globs: GlobSet,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            skip_directories: BTreeSet::new(),
            skip_files: BTreeSet::new(),
            skip_extensions: BTreeSet::new(),
            include_hidden: false,
            file_globs: GlobSet::empty(),
        }
    }
}

impl FilterPolicy {
    pub fn new<D, F, E>(skip_directories: D, skip_files: F, skip_extensions: E) -> Result<Self>
    where
        D: IntoIterator,
        D::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let skip_files: BTreeSet<String> = skip_files.into_iter().map(Into::into).collect();

        let mut builder = GlobSetBuilder::new();
        for pattern in &skip_files {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            skip_directories: skip_directories.into_iter().map(Into::into).collect(),
            file_globs: builder.build()?,
            skip_files,
            skip_extensions: skip_extensions
                .into_iter()
                .map(|e| normalize_extension(&e.into()))
                .collect(),
            include_hidden: false,
        })
    }

    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn skip_directories(&self) -> &BTreeSet<String> {
        &self.skip_directories
    }

    pub fn skip_files(&self) -> &BTreeSet<String> {
        &self.skip_files
    }

    pub fn skip_extensions(&self) -> &BTreeSet<String> {
        &self.skip_extensions
    }

    pub fn include_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Whether the walker may descend into `dir`
    pub fn accepts_dir(&self, dir: &Path) -> bool {
        let Some(name) = dir.file_name() else {
            return true;
        };

        if self.skip_directories.contains(name.to_string_lossy().as_ref()) {
            return false;
        }

        self.include_hidden || !is_hidden(dir)
    }

    /// Whether `path` should be indexed as a document.
    ///
    /// Name checks run first; the metadata lookup and the binary sample only
    /// happen for files that survive them.
    pub fn accepts_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };

        if self.skips_file_name(name) {
            return false;
        }

        if !self.include_hidden && is_hidden(path) {
            return false;
        }

        if !path.is_file() {
            return false;
        }

        // Unreadable files are treated like binary ones
        !is_binary_file(path).unwrap_or(true)
    }

    /// Re-check a previously indexed path against this policy.
    ///
    /// Unlike [`accepts_file`](Self::accepts_file), every directory between
    /// one of the project folders and the file is checked as well, so a
    /// newly skipped directory evicts documents that were indexed under it.
    pub fn admits(&self, folders: &[impl AsRef<Path>], path: &Path) -> bool {
        let Some(folder) = folders
            .iter()
            .map(AsRef::as_ref)
            .find(|folder| path.starts_with(folder))
        else {
            return false;
        };

        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == folder || !current.starts_with(folder) {
                break;
            }
            if !self.accepts_dir(current) {
                return false;
            }
            dir = current.parent();
        }

        self.accepts_file(path)
    }

    fn skips_file_name(&self, name: &OsStr) -> bool {
        let name_str = name.to_string_lossy();
        if self.skip_files.contains(name_str.as_ref()) || self.file_globs.is_match(name) {
            return true;
        }

        Path::new(name)
            .extension()
            .map(|ext| {
                self.skip_extensions
                    .contains(&normalize_extension(&ext.to_string_lossy()))
            })
            .unwrap_or(false)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

/// A path is hidden when its name starts with a dot or the platform marks it hidden
pub fn is_hidden(path: &Path) -> bool {
    let dotted = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false);

    dotted || has_hidden_attribute(path)
}

#[cfg(windows)]
fn has_hidden_attribute(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    std::fs::metadata(path)
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn has_hidden_attribute(_path: &Path) -> bool {
    false
}

/// Bytes that may appear in a text file
#[inline]
fn is_text_byte(byte: u8) -> bool {
    matches!(byte, 7 | 8 | 9 | 10 | 12 | 13 | 27) || (byte >= 0x20 && byte != 0x7f)
}

/// Check a content sample for bytes outside the text set
pub fn is_binary(content: &[u8]) -> bool {
    let sample = &content[..content.len().min(BINARY_SAMPLE_SIZE)];
    sample.iter().any(|&b| !is_text_byte(b))
}

/// Sample the head of a file and classify it
pub fn is_binary_file(path: &Path) -> io::Result<bool> {
    let mut sample = Vec::with_capacity(BINARY_SAMPLE_SIZE);
    File::open(path)?
        .take(BINARY_SAMPLE_SIZE as u64)
        .read_to_end(&mut sample)?;
    Ok(is_binary(&sample))
}

use crate::utils::FilterPolicy;
use ignore::{Walk, WalkBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lazy depth-first enumeration of the indexable files under a set of folders.
///
/// Directories rejected by the policy are pruned before the walker descends
/// into them. Every call to [`project_files`] walks the filesystem again.
pub struct ProjectFiles {
    folders: std::vec::IntoIter<PathBuf>,
    current: Option<Walk>,
    policy: Arc<FilterPolicy>,
}

/// Walk `folders` and yield every file the policy accepts
pub fn project_files<P: AsRef<Path>>(folders: &[P], policy: &FilterPolicy) -> ProjectFiles {
    ProjectFiles {
        folders: folders
            .iter()
            .map(|f| f.as_ref().to_path_buf())
            .collect::<Vec<_>>()
            .into_iter(),
        current: None,
        policy: Arc::new(policy.clone()),
    }
}

impl ProjectFiles {
    fn walk(&self, folder: &Path) -> Walk {
        let policy = Arc::clone(&self.policy);

        // Only the policy decides: no ignore files, no built-in hidden filter
        WalkBuilder::new(folder)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                entry.depth() == 0 || !is_dir || policy.accepts_dir(entry.path())
            })
            .build()
    }
}

impl Iterator for ProjectFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if self.current.is_none() {
                let folder = self.folders.next()?;
                log::debug!("walking {}", folder.display());
                self.current = Some(self.walk(&folder));
            }

            let walk = self.current.as_mut()?;
            match walk.next() {
                Some(Ok(entry)) => {
                    let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
                    if is_file && self.policy.accepts_file(entry.path()) {
                        return Some(entry.into_path());
                    }
                }
                Some(Err(e)) => log::debug!("skipping unreadable entry: {}", e),
                None => self.current = None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;

    fn collect(folders: &[&Path], policy: &FilterPolicy) -> BTreeSet<PathBuf> {
        project_files(folders, policy).collect()
    }

    #[test]
    fn test_skips_directories_hidden_and_binary() {
        let dir = tempfile::Builder::new().prefix("walk").tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("src/nested/lib.rs"), "pub fn f() {}").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(root.join(".git/HEAD"), "ref").unwrap();
        fs::write(root.join(".env"), "SECRET=1").unwrap();
        fs::write(root.join("logo.png"), "not really").unwrap();
        fs::write(root.join("blob.dat"), b"\x00\x01\x02").unwrap();
        fs::write(root.join("Cargo.lock"), "lock").unwrap();

        let policy = FilterPolicy::new(["node_modules"], ["Cargo.lock"], ["png"]).unwrap();
        let files = collect(&[root], &policy);

        let expected: BTreeSet<PathBuf> = [root.join("src/main.rs"), root.join("src/nested/lib.rs")]
            .into_iter()
            .collect();
        assert_eq!(files, expected);
    }

    #[test]
    fn test_include_hidden() {
        let dir = tempfile::Builder::new().prefix("walk").tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".config")).unwrap();
        fs::write(root.join(".config/app.toml"), "a = 1").unwrap();

        let policy = FilterPolicy::default().with_hidden(true);
        assert!(collect(&[root], &policy).contains(&root.join(".config/app.toml")));
        assert!(collect(&[root], &FilterPolicy::default()).is_empty());
    }

    #[test]
    fn test_multiple_folders_and_rewalk() {
        let a = tempfile::Builder::new().prefix("walk").tempdir().unwrap();
        let b = tempfile::Builder::new().prefix("walk").tempdir().unwrap();
        fs::write(a.path().join("one.txt"), "one").unwrap();
        fs::write(b.path().join("two.txt"), "two").unwrap();

        let policy = FilterPolicy::default();
        assert_eq!(collect(&[a.path(), b.path()], &policy).len(), 2);

        fs::write(b.path().join("three.txt"), "three").unwrap();
        assert_eq!(collect(&[a.path(), b.path()], &policy).len(), 3);
    }

    #[test]
    fn test_missing_folder_yields_nothing() {
        let dir = tempfile::Builder::new().prefix("walk").tempdir().unwrap();
        let files = collect(&[dir.path().join("gone").as_path()], &FilterPolicy::default());
        assert!(files.is_empty());
    }
}

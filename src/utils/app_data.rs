use crate::error::{Error, Result};
use crate::utils::filter::FilterPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "phrasedex";
const CONFIG_FILE: &str = "config.json";

/// Per-project settings file, read from the project root
pub const PROJECT_CONFIG_FILE: &str = ".phrasedex.json";

/// Suffix appended to a project's name to form its index directory
pub const INDEX_DIR_TAG: &str = ".phrasedex";

/// Overrides the platform data directory (used by tests and portable installs)
pub const DATA_DIR_ENV: &str = "PHRASEDEX_DATA_DIR";

/// Indexing and search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory names that are never descended into
    #[serde(default = "default_skip_folders")]
    pub skip_folders: Vec<String>,

    /// File names (or globs over the file name) that are never indexed
    #[serde(default = "default_skip_files")]
    pub skip_files: Vec<String>,

    /// Extensions that are never indexed, with or without the leading dot
    #[serde(default = "default_skip_file_extensions")]
    pub skip_file_extensions: Vec<String>,

    /// Index hidden files and folders too
    #[serde(default)]
    pub include_hidden: bool,

    /// Duplicate raw text into the index so hits can be highlighted without
    /// re-reading the file
    #[serde(default)]
    pub store_content: bool,

    /// Writer memory budget; pending documents are flushed once it is exceeded
    #[serde(default = "default_ram_limit_mb")]
    pub ram_limit_mb: usize,

    /// Number of phrases kept in the search history
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Interval at which a running operation re-announces its status
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

fn default_skip_folders() -> Vec<String> {
    ["node_modules", "target", "__pycache__", "venv", "build", "dist"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_skip_files() -> Vec<String> {
    ["Cargo.lock", "package-lock.json", "yarn.lock", "*.min.js"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_skip_file_extensions() -> Vec<String> {
    [
        "png", "jpg", "jpeg", "gif", "ico", "pdf", "zip", "gz", "tar", "exe", "dll", "so",
        "dylib", "o", "a", "pyc", "class", "jar",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_ram_limit_mb() -> usize {
    256
}

fn default_history_size() -> usize {
    50
}

fn default_status_interval_ms() -> u64 {
    1000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            skip_folders: default_skip_folders(),
            skip_files: default_skip_files(),
            skip_file_extensions: default_skip_file_extensions(),
            include_hidden: false,
            store_content: false,
            ram_limit_mb: default_ram_limit_mb(),
            history_size: default_history_size(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

impl Settings {
    /// Load settings with priority: environment > project file > app config > defaults
    pub fn load(project_root: Option<&Path>) -> Result<Self> {
        let mut merged = Value::Object(Default::default());

        let app_config = get_config_path()?;
        if app_config.exists() {
            overlay(&mut merged, read_json(&app_config)?);
        }

        if let Some(root) = project_root {
            let project_config = root.join(PROJECT_CONFIG_FILE);
            if project_config.exists() {
                overlay(&mut merged, read_json(&project_config)?);
            }
        }

        let mut settings: Settings = serde_json::from_value(merged)?;
        settings.apply_env();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("PHRASEDEX_RAM_LIMIT_MB") {
            if let Ok(mb) = val.parse() {
                self.ram_limit_mb = mb;
            }
        }

        if let Ok(val) = std::env::var("PHRASEDEX_STORE_CONTENT") {
            if let Ok(store) = val.parse() {
                self.store_content = store;
            }
        }
    }

    /// Save settings to the app data directory
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;
        fs::write(&config_path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Build the path filter for one operation
    pub fn filter_policy(&self) -> Result<FilterPolicy> {
        Ok(FilterPolicy::new(
            self.skip_folders.iter().cloned(),
            self.skip_files.iter().cloned(),
            self.skip_file_extensions.iter().cloned(),
        )?
        .with_hidden(self.include_hidden))
    }

    /// Writer flush threshold in bytes
    pub fn ram_limit_bytes(&self) -> usize {
        self.ram_limit_mb.max(1) * 1024 * 1024
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Copy the top-level keys of `layer` over `base`
fn overlay(base: &mut Value, layer: Value) {
    if let (Value::Object(base), Value::Object(layer)) = (base, layer) {
        base.extend(layer);
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory for storing indexes
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) => Some(PathBuf::from(dir)),
        None => dirs::data_local_dir().map(|d| d.join(APP_NAME)),
    };

    let app_dir = base.ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not determine app data directory",
        ))
    })?;

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Get the index directory for a specific project root
pub fn get_index_dir(root_path: &Path) -> Result<PathBuf> {
    let indexes_dir = get_app_data_dir()?.join("indexes");
    fs::create_dir_all(&indexes_dir)?;

    Ok(indexes_dir.join(format!("{}{}", hash_path(root_path), INDEX_DIR_TAG)))
}

/// Hash a path to create a unique folder name
/// Format: first 16 chars of dir name + hash
fn hash_path(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let path_str = canonical.to_string_lossy();

    let sanitized: String = project_name(&canonical)
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(16)
        .collect();

    let mut hasher = DefaultHasher::new();
    path_str.hash(&mut hasher);
    let hash = hasher.finish();

    format!("{}-{:016x}", sanitized, hash)
}

fn project_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string())
}

/// A bound project: its identity root plus the folders that get indexed
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub root: PathBuf,
    pub folders: Vec<PathBuf>,
}

impl Project {
    /// Bind a project rooted at `root`, indexing the root itself
    pub fn new(root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|_| Error::NotAProject(root.to_path_buf()))?;

        if !root.is_dir() {
            return Err(Error::NotAProject(root));
        }

        Ok(Self {
            name: project_name(&root),
            folders: vec![root.clone()],
            root,
        })
    }

    /// Discover the project containing `start`
    pub fn discover(start: &Path) -> Result<Self> {
        let root = find_codebase_root(start)?;
        Self::new(&root)
    }

    /// Replace the indexed folders; paths that do not resolve are dropped
    pub fn with_folders<I, P>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.folders = folders
            .into_iter()
            .filter_map(|f| f.as_ref().canonicalize().ok())
            .filter(|f| f.is_dir())
            .collect();
        self
    }

    pub fn index_dir(&self) -> Result<PathBuf> {
        get_index_dir(&self.root)
    }
}

/// Find the root of a project starting from a given path
/// Walks up the directory tree looking for:
/// 1. A .git directory (git repo root)
/// 2. A previously indexed root (stored in our app data)
///
/// Falls back to `start` itself when it is a directory.
pub fn find_codebase_root(start_path: &Path) -> Result<PathBuf> {
    let start = start_path
        .canonicalize()
        .map_err(|_| Error::NotAProject(start_path.to_path_buf()))?;
    let start = if start.is_file() {
        start
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::NotAProject(start.clone()))?
    } else {
        start
    };

    for dir in start.ancestors() {
        if dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }
    }

    for dir in start.ancestors() {
        if is_indexed(dir)? {
            return Ok(dir.to_path_buf());
        }
    }

    Ok(start)
}

/// Check if a path has an existing index
pub fn is_indexed(root_path: &Path) -> Result<bool> {
    let index_dir = get_index_dir(root_path)?;
    Ok(index_dir.join("meta.json").exists())
}

/// List all indexed projects
pub fn list_indexed_codebases() -> Result<Vec<IndexLocation>> {
    let indexes_dir = get_app_data_dir()?.join("indexes");

    if !indexes_dir.exists() {
        return Ok(Vec::new());
    }

    let mut codebases = Vec::new();

    for entry in fs::read_dir(&indexes_dir)? {
        let path = entry?.path();
        let meta_path = path.join("meta.json");
        if !path.is_dir() || !meta_path.exists() {
            continue;
        }

        // Read the meta.json to get the root path
        if let Ok(meta) = read_json(&meta_path) {
            if let Some(root) = meta.get("project_root").and_then(|v| v.as_str()) {
                codebases.push(IndexLocation {
                    root_path: PathBuf::from(root),
                    index_dir: path,
                });
            }
        }
    }

    codebases.sort_by(|a, b| a.root_path.cmp(&b.root_path));
    Ok(codebases)
}

/// Remove an index for a project
pub fn remove_index(root_path: &Path) -> Result<()> {
    let index_dir = get_index_dir(root_path)?;
    if index_dir.exists() {
        fs::remove_dir_all(&index_dir)?;
    }
    Ok(())
}

/// Information about an indexed project
#[derive(Debug, Clone)]
pub struct IndexLocation {
    pub root_path: PathBuf,
    pub index_dir: PathBuf,
}

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::utils::{list_indexed_codebases, Project};
use std::collections::HashMap;
use std::path::Path;

/// Display index statistics
pub fn show_stats(root_path: &Path) -> Result<()> {
    // Auto-detect project root
    let project = Project::discover(root_path)?;
    let index_path = project.index_dir()?;
    let reader = IndexReader::open(&index_path)?;

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Project root:     {}", reader.meta.project_root.display());
    println!("Index location:   {}", index_path.display());
    println!("Index version:    {}", reader.meta.version);
    println!("Generation:       {}", reader.meta.generation);
    println!("Document count:   {}", reader.meta.doc_count);
    println!("Distinct tokens:  {}", reader.token_count());
    println!(
        "Stored content:   {}",
        if reader.meta.schema.store_content { "yes" } else { "no" }
    );

    // Count by extension
    let mut ext_counts: HashMap<String, usize> = HashMap::new();
    for doc in reader.documents() {
        let ext = doc
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "(none)".to_string());
        *ext_counts.entry(ext).or_insert(0) += 1;
    }

    if !ext_counts.is_empty() {
        println!();
        println!("Files by extension:");
        let mut sorted: Vec<_> = ext_counts.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        for (ext, count) in sorted.iter().take(15) {
            println!("  {:15} {}", ext, count);
        }

        if sorted.len() > 15 {
            println!("  ... and {} more", sorted.len() - 15);
        }
    }

    // Index size
    if let Ok(size) = dir_size(&index_path) {
        println!();
        println!("Index size:       {}", format_size(size));
    }

    // Timestamps
    println!();
    println!(
        "Created:          {}",
        format_timestamp(reader.meta.created_at)
    );
    println!(
        "Updated:          {}",
        format_timestamp(reader.meta.updated_at)
    );

    Ok(())
}

/// List all indexed projects
pub fn list_indexes() -> Result<()> {
    let projects = list_indexed_codebases()?;

    if projects.is_empty() {
        println!("No indexed projects found.");
        return Ok(());
    }

    println!("Indexed Projects");
    println!("================");
    println!();

    for project in projects {
        let status = if project.root_path.exists() { "" } else { " [missing]" };
        println!("  {}{}", project.root_path.display(), status);
        println!("    Index: {}", project.index_dir.display());
        println!();
    }

    Ok(())
}

/// Calculate directory size recursively
fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut size = 0;
    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() {
                size += entry.metadata()?.len();
            } else if path.is_dir() {
                size += dir_size(&path)?;
            }
        }
    }
    Ok(size)
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format unix timestamp
fn format_timestamp(ts: u64) -> String {
    use std::time::{Duration, UNIX_EPOCH};
    let datetime = UNIX_EPOCH + Duration::from_secs(ts);
    format!("{:?}", datetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_dir_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a"), [0u8; 10]).unwrap();
        std::fs::write(dir.path().join("sub/b"), [0u8; 5]).unwrap();
        assert_eq!(dir_size(dir.path()).unwrap(), 15);
    }
}

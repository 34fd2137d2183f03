//! Import command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::import;
use crate::store::CatalogStore;

pub fn run(store: &mut CatalogStore, config: &Config, paths: Vec<PathBuf>) -> Result<()> {
    let files = if paths.is_empty() {
        discover(&config.data_dir())?
    } else {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                files.extend(discover(&path)?);
            } else {
                files.push(path);
            }
        }
        files
    };

    if files.is_empty() {
        println!("No course files found. Check import.data_dir in your configuration.");
        return Ok(());
    }

    for file in &files {
        let summary = import::import_file(store, file)?;
        println!(
            "{}: {} courses for {} semester {}{}",
            file.display(),
            summary.courses,
            summary.year,
            summary.semester,
            if summary.replaced {
                " (replaced previous import)"
            } else {
                ""
            },
        );
    }

    println!("Imported {} files", files.len());
    Ok(())
}

/// Find every .json file directly under a directory, sorted by name so
/// terms import in chronological order.
fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("*.json");
    let pattern = pattern.to_string_lossy();

    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("bad glob pattern {pattern}"))?
        .filter_map(Result::ok)
        .collect();
    files.sort();
    Ok(files)
}
